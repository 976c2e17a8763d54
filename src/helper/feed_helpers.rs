use crate::helper::{reaction_helpers, sanitization_helpers};
use crate::middleware::resolve_media_url;
use crate::models::api_operations::{ApiError, FeedApi};
use crate::models::{CommentView, MediaView, Notification, Post, PostView, Viewer};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use url::Url;

pub const EMPTY_FEED_MESSAGE: &str = "No posts yet. Be the first to share something!";

/// Which collection the feed shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedScope {
    All,
    ByAuthor(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedView {
    /// Nothing has been fetched successfully yet.
    NotLoaded,
    Empty { message: &'static str },
    Posts(Vec<PostView>),
}

#[derive(Default)]
struct FeedState {
    posts: Arc<Vec<Post>>,
    loaded: bool,
    alert: Option<Notification>,
}

/// Owns the canonical post list. Every mutation elsewhere in the engine
/// ends with `refresh()`, which replaces the list wholesale with what the
/// server returns.
pub struct FeedSynchronizer {
    api: Arc<dyn FeedApi>,
    scope: FeedScope,
    media_origin: Url,
    state: RwLock<FeedState>,
    generation: AtomicU64,
    refreshes: AtomicU64,
}

impl FeedSynchronizer {
    pub fn new(api: Arc<dyn FeedApi>, scope: FeedScope, media_origin: Url) -> Self {
        Self {
            api,
            scope,
            media_origin,
            state: RwLock::new(FeedState::default()),
            generation: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
        }
    }

    /// Re-fetches the collection and swaps it in.
    ///
    /// On failure the previous posts stay visible and an alert is recorded.
    /// When a newer refresh was started meanwhile, this response is dropped
    /// so an older snapshot can never overwrite a newer one.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.refreshes.fetch_add(1, Ordering::SeqCst);

        let result = match &self.scope {
            FeedScope::All => self.api.list_posts().await,
            FeedScope::ByAuthor(user_id) => self.api.list_posts_by_user(user_id).await,
        };
        let is_current = self.generation.load(Ordering::SeqCst) == generation;

        match result {
            Ok(posts) => {
                if !is_current {
                    log::debug!("Discarding feed snapshot from superseded refresh #{}", generation);
                    return Ok(());
                }
                log::info!("Feed refreshed: {} post(s)", posts.len());
                let mut state = self.state.write();
                state.posts = Arc::new(posts);
                state.loaded = true;
                state.alert = None;
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to fetch posts: {}", e);
                if is_current {
                    self.state.write().alert = Some(Notification::error(e.user_message()));
                }
                Err(e)
            }
        }
    }

    /// Current snapshot. Cheap: clones an `Arc`.
    pub fn posts(&self) -> Arc<Vec<Post>> {
        self.state.read().posts.clone()
    }

    pub fn find_post(&self, post_id: &str) -> Option<Post> {
        self.state.read().posts.iter().find(|p| p.id == post_id).cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.state.read().loaded
    }

    pub fn alert(&self) -> Option<Notification> {
        self.state.read().alert.clone()
    }

    pub fn dismiss_alert(&self) {
        self.state.write().alert = None;
    }

    /// Number of times `refresh()` has been called.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn view(&self, viewer: &Viewer) -> FeedView {
        let state = self.state.read();
        if !state.loaded {
            return FeedView::NotLoaded;
        }
        if state.posts.is_empty() {
            return FeedView::Empty { message: EMPTY_FEED_MESSAGE };
        }
        FeedView::Posts(
            state
                .posts
                .iter()
                .map(|post| build_post_view(post, viewer, &self.media_origin))
                .collect(),
        )
    }
}

pub fn build_post_view(post: &Post, viewer: &Viewer, media_origin: &Url) -> PostView {
    PostView {
        id: post.id.clone(),
        author_id: post.author_id.clone(),
        author_name: if post.author_name.is_empty() {
            "Anonymous".to_string()
        } else {
            sanitization_helpers::strip_all_html(&post.author_name)
        },
        content: post
            .content
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .map(sanitization_helpers::strip_all_html),
        media: post
            .media_items
            .iter()
            .map(|m| MediaView { url: resolve_media_url(media_origin, &m.url), kind: m.kind })
            .collect(),
        reaction_summary: reaction_helpers::summarize(post),
        my_reaction: post.reactions.get(&viewer.user_id).cloned(),
        comments: post
            .comments
            .iter()
            .map(|c| CommentView {
                user_name: sanitization_helpers::strip_all_html(&c.user_name),
                text: sanitization_helpers::strip_all_html(&c.text),
                posted_at: c.posted_at,
            })
            .collect(),
        created_at: post.created_at,
        is_own: post.author_id == viewer.user_id,
    }
}
