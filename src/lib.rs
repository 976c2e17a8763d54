use std::sync::Arc;

use crate::config::Config;
use crate::helper::comment_helpers::CommentEngine;
use crate::helper::feed_helpers::{FeedScope, FeedSynchronizer};
use crate::helper::media_helpers::{MediaPipeline, PreviewStore};
use crate::helper::post_helpers::PostComposer;
use crate::helper::reaction_helpers::ReactionAggregator;
use crate::helper::search_helpers::SearchDispatcher;
use crate::middleware::{CredentialSource, RequestGateway};
use crate::models::api_operations::{ApiError, FeedApi, HttpFeedApi};
use url::Url;

/// The feed engine's components wired around one canonical post list.
pub struct AppState {
    pub config: Config,
    pub api: Arc<dyn FeedApi>,
    pub feed: Arc<FeedSynchronizer>,
    pub reactions: ReactionAggregator,
    pub comments: CommentEngine,
    pub posts: PostComposer,
    pub search: SearchDispatcher,
    pub previews: Arc<PreviewStore>,
}

impl AppState {
    /// Builds the HTTP-backed engine from configuration.
    pub fn connect(
        config: Config,
        scope: FeedScope,
        credentials: Arc<dyn CredentialSource>,
    ) -> Result<Self, ApiError> {
        let base_url = config.base_url()?;
        let gateway = RequestGateway::new(base_url.clone(), config.request_timeout(), credentials)?;
        let api: Arc<dyn FeedApi> = Arc::new(HttpFeedApi::new(gateway));
        Ok(Self::with_api(config, scope, api, base_url))
    }

    /// Builds the engine over any `FeedApi`.
    pub fn with_api(config: Config, scope: FeedScope, api: Arc<dyn FeedApi>, media_origin: Url) -> Self {
        let feed = Arc::new(FeedSynchronizer::new(api.clone(), scope, media_origin));
        Self {
            reactions: ReactionAggregator::new(api.clone(), feed.clone()),
            comments: CommentEngine::new(api.clone(), feed.clone()),
            posts: PostComposer::new(api.clone(), feed.clone()),
            search: SearchDispatcher::new(api.clone(), config.search_debounce()),
            previews: PreviewStore::new(),
            feed,
            api,
            config,
        }
    }

    /// A fresh attachment pipeline for one compose or edit form.
    pub fn media_pipeline(&self) -> MediaPipeline {
        MediaPipeline::with_limit(self.previews.clone(), self.config.max_upload_bytes())
    }
}

pub mod config;
pub mod helper;
pub mod middleware;
pub mod models;
