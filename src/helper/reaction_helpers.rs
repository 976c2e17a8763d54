use crate::helper::feed_helpers::FeedSynchronizer;
use crate::helper::InFlightSet;
use crate::models::api_operations::{ApiError, FeedApi};
use crate::models::{Notification, Post, ReactionSummary};
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

/// The palette offered on every post card.
pub const REACTION_OPTIONS: [&str; 6] = ["👍", "😂", "❤️", "😮", "😢", "😡"];

#[derive(Error, Debug)]
pub enum ReactionError {
    #[error("Please pick a reaction.")]
    EmptySymbol,
    #[error("A reaction for this post is already being saved.")]
    InFlight,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Counts users per symbol. Since each user holds at most one entry in
/// `post.reactions`, the counts always add up to the number of reacting users.
pub fn summarize(post: &Post) -> ReactionSummary {
    let mut summary = ReactionSummary::default();
    for symbol in post.reactions.values() {
        *summary.counts.entry(symbol.clone()).or_insert(0) += 1;
    }
    summary
}

/// Sends reactions and reconciles through a feed refresh. The server's
/// reaction map is the only source of counts; nothing is patched locally.
pub struct ReactionAggregator {
    api: Arc<dyn FeedApi>,
    feed: Arc<FeedSynchronizer>,
    in_flight: InFlightSet,
    alert: Mutex<Option<Notification>>,
}

impl ReactionAggregator {
    pub fn new(api: Arc<dyn FeedApi>, feed: Arc<FeedSynchronizer>) -> Self {
        Self {
            api,
            feed,
            in_flight: InFlightSet::default(),
            alert: Mutex::new(None),
        }
    }

    /// Records `symbol` as `user_id`'s reaction to `post_id`, replacing any
    /// earlier one, then refreshes the feed exactly once whether the
    /// mutation succeeded or not.
    pub async fn react(&self, post_id: &str, user_id: &str, symbol: &str) -> Result<(), ReactionError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(ReactionError::EmptySymbol);
        }
        let guard = self.in_flight.try_begin(post_id).ok_or(ReactionError::InFlight)?;
        let result = self.api.react(post_id, user_id, symbol).await;
        drop(guard);

        match &result {
            Ok(()) => {
                log::info!("User {} reacted {} to post {}", user_id, symbol, post_id);
                *self.alert.lock() = None;
            }
            Err(e) => {
                log::error!("Failed to react to post {}: {}", post_id, e);
                *self.alert.lock() = Some(Notification::error(e.user_message()));
            }
        }

        // A failed refresh already records its own alert on the feed.
        let _ = self.feed.refresh().await;
        result.map_err(ReactionError::from)
    }

    pub fn is_in_flight(&self, post_id: &str) -> bool {
        self.in_flight.contains(post_id)
    }

    pub fn alert(&self) -> Option<Notification> {
        self.alert.lock().clone()
    }

    pub fn dismiss_alert(&self) {
        *self.alert.lock() = None;
    }
}
