use crate::helper::feed_helpers::FeedSynchronizer;
use crate::helper::media_helpers::MediaPipeline;
use crate::helper::InFlightSet;
use crate::models::api_operations::{ApiError, FeedApi};
use crate::models::{Notification, Post, Viewer};
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

const NEW_POST_KEY: &str = "<new>";

#[derive(Error, Debug)]
pub enum PostError {
    #[error("Please add text or media.")]
    Empty,
    #[error("This post is already being saved.")]
    InFlight,
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl PostError {
    pub fn user_message(&self) -> String {
        match self {
            PostError::Api(e) => e.user_message().to_string(),
            other => other.to_string(),
        }
    }
}

/// Create, edit and delete. Each successful mutation is followed by a feed
/// refresh; the server's response is never spliced into the local list.
pub struct PostComposer {
    api: Arc<dyn FeedApi>,
    feed: Arc<FeedSynchronizer>,
    in_flight: InFlightSet,
    alert: Mutex<Option<Notification>>,
}

impl PostComposer {
    pub fn new(api: Arc<dyn FeedApi>, feed: Arc<FeedSynchronizer>) -> Self {
        Self { api, feed, in_flight: InFlightSet::default(), alert: Mutex::new(None) }
    }

    fn record<T>(&self, result: Result<T, PostError>) -> Result<T, PostError> {
        *self.alert.lock() = result.as_ref().err().map(|e| Notification::error(e.user_message()));
        result
    }

    /// Publishes a post as `viewer`. Staged media is handed over and every
    /// preview revoked before the request goes out, so a failed upload
    /// leaks nothing; the user re-picks files to retry.
    pub async fn create(&self, viewer: &Viewer, content: &str, media: &mut MediaPipeline) -> Result<Post, PostError> {
        if content.trim().is_empty() && media.is_empty() {
            return self.record(Err(PostError::Empty));
        }
        let guard = match self.in_flight.try_begin(NEW_POST_KEY) {
            Some(guard) => guard,
            None => return self.record(Err(PostError::InFlight)),
        };

        let files = media.take_for_submission();
        let result = self.api.create_post(&viewer.user_id, content.trim(), files).await;
        drop(guard);

        match result {
            Ok(post) => {
                let _ = self.feed.refresh().await;
                self.record(Ok(post))
            }
            Err(e) => {
                log::error!("Failed to create post for user {}: {}", viewer.user_id, e);
                self.record(Err(e.into()))
            }
        }
    }

    /// Replaces the text, and the media list when new files are staged.
    pub async fn update(&self, post_id: &str, content: &str, media: &mut MediaPipeline) -> Result<Post, PostError> {
        if content.trim().is_empty() && media.is_empty() {
            return self.record(Err(PostError::Empty));
        }
        let guard = match self.in_flight.try_begin(post_id) {
            Some(guard) => guard,
            None => return self.record(Err(PostError::InFlight)),
        };

        let files = media.take_for_submission();
        let result = self.api.update_post(post_id, content.trim(), files).await;
        drop(guard);

        match result {
            Ok(post) => {
                log::info!("Updated post {}", post_id);
                let _ = self.feed.refresh().await;
                self.record(Ok(post))
            }
            Err(e) => {
                log::error!("Failed to update post {}: {}", post_id, e);
                self.record(Err(e.into()))
            }
        }
    }

    pub async fn delete(&self, post_id: &str) -> Result<(), PostError> {
        let guard = match self.in_flight.try_begin(post_id) {
            Some(guard) => guard,
            None => return self.record(Err(PostError::InFlight)),
        };
        let result = self.api.delete_post(post_id).await;
        drop(guard);

        match result {
            Ok(()) => {
                log::info!("Deleted post {}", post_id);
                let _ = self.feed.refresh().await;
                self.record(Ok(()))
            }
            Err(e) => {
                log::error!("Failed to delete post {}: {}", post_id, e);
                self.record(Err(e.into()))
            }
        }
    }

    pub fn alert(&self) -> Option<Notification> {
        self.alert.lock().clone()
    }

    pub fn dismiss_alert(&self) {
        *self.alert.lock() = None;
    }
}
