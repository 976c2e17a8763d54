use crate::helper::feed_helpers::FeedSynchronizer;
use crate::helper::InFlightSet;
use crate::models::api_operations::{ApiError, FeedApi};
use crate::models::{CommentRequest, Notification, Viewer};
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommentError {
    #[error("Comment cannot be empty.")]
    EmptyText,
    #[error("Your comment is still being posted.")]
    InFlight,
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl CommentError {
    pub fn user_message(&self) -> String {
        match self {
            CommentError::Api(e) => e.user_message().to_string(),
            other => other.to_string(),
        }
    }
}

/// Posts comments. Nothing is inserted locally: after the server
/// acknowledges, the feed is refreshed and the server's ordering is shown.
pub struct CommentEngine {
    api: Arc<dyn FeedApi>,
    feed: Arc<FeedSynchronizer>,
    in_flight: InFlightSet,
}

impl CommentEngine {
    pub fn new(api: Arc<dyn FeedApi>, feed: Arc<FeedSynchronizer>) -> Self {
        Self { api, feed, in_flight: InFlightSet::default() }
    }

    /// Blank text fails locally without touching the network. On failure the
    /// feed is left as it was.
    pub async fn submit(&self, post_id: &str, user_id: &str, user_name: &str, text: &str) -> Result<(), CommentError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CommentError::EmptyText);
        }
        let guard = self.in_flight.try_begin(post_id).ok_or(CommentError::InFlight)?;

        let request = CommentRequest {
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            comment_text: text.to_string(),
        };
        if let Err(e) = self.api.comment(post_id, &request).await {
            log::error!("Failed to post comment on {}: {}", post_id, e);
            return Err(e.into());
        }
        drop(guard);

        log::info!("User {} commented on post {}", user_id, post_id);
        let _ = self.feed.refresh().await;
        Ok(())
    }

    pub fn is_in_flight(&self, post_id: &str) -> bool {
        self.in_flight.contains(post_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentBoxState {
    pub draft: String,
    pub submitting: bool,
    pub comments_visible: bool,
    pub error: Option<Notification>,
}

/// Re-enables the input when dropped, so a submission that is cancelled
/// mid-request leaves the box usable with the draft intact.
struct SubmittingGuard<'a> {
    state: &'a Mutex<CommentBoxState>,
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().submitting = false;
    }
}

/// The comment input under one post card.
pub struct CommentBox {
    post_id: String,
    state: Mutex<CommentBoxState>,
}

impl CommentBox {
    pub fn new(post_id: impl Into<String>) -> Self {
        Self { post_id: post_id.into(), state: Mutex::new(CommentBoxState::default()) }
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        self.state.lock().draft = text.into();
    }

    pub fn state(&self) -> CommentBoxState {
        self.state.lock().clone()
    }

    /// Whether the submit control is enabled.
    pub fn can_submit(&self) -> bool {
        let state = self.state.lock();
        !state.submitting && !state.draft.trim().is_empty()
    }

    pub fn toggle_comments(&self) {
        let mut state = self.state.lock();
        state.comments_visible = !state.comments_visible;
    }

    pub fn dismiss_error(&self) {
        self.state.lock().error = None;
    }

    /// Submits the current draft. On success the input is cleared and the
    /// comment list opened; on failure the draft is kept for a retry.
    pub async fn submit(&self, engine: &CommentEngine, viewer: &Viewer) -> Result<(), CommentError> {
        let draft = {
            let mut state = self.state.lock();
            if state.submitting {
                return Err(CommentError::InFlight);
            }
            if state.draft.trim().is_empty() {
                state.error = Some(Notification::error(CommentError::EmptyText.to_string()));
                return Err(CommentError::EmptyText);
            }
            state.submitting = true;
            state.error = None;
            state.draft.clone()
        };

        let submitting = SubmittingGuard { state: &self.state };
        let result = engine
            .submit(&self.post_id, &viewer.user_id, &viewer.user_name, &draft)
            .await;
        drop(submitting);

        let mut state = self.state.lock();
        match &result {
            Ok(()) => {
                // Keep anything typed while the request was out.
                if state.draft == draft {
                    state.draft.clear();
                }
                state.comments_visible = true;
            }
            Err(e) => state.error = Some(Notification::error(e.user_message())),
        }
        result
    }
}
