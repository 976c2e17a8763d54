#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use skillshare_client::config::Config;
use skillshare_client::helper::feed_helpers::FeedScope;
use skillshare_client::models::api_operations::{ApiError, FeedApi};
use skillshare_client::models::{
    Comment, CommentRequest, LocalFile, MediaKind, MediaRef, Post, UserSummary, Viewer,
};
use skillshare_client::AppState;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// In-memory stand-in for the remote API. Mutations behave like the real
/// server (last reaction wins, comments appended) and every call is counted.
#[derive(Default)]
pub struct MockFeedApi {
    pub posts: Mutex<Vec<Post>>,
    pub users: Mutex<Vec<UserSummary>>,
    pub list_calls: AtomicUsize,
    pub react_calls: AtomicUsize,
    pub comment_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub search_queries: Mutex<Vec<String>>,
    pub search_delays: Mutex<HashMap<String, Duration>>,
    pub react_delay: Mutex<Option<Duration>>,
    pub comment_delay: Mutex<Option<Duration>>,
    pub uploaded: Mutex<Vec<LocalFile>>,
    pub fail_mutations: AtomicBool,
    pub fail_list: AtomicBool,
    pub fail_search: AtomicBool,
}

fn server_error() -> ApiError {
    ApiError::Status { status: 500, body: "boom".to_string() }
}

impl MockFeedApi {
    pub fn with_posts(posts: Vec<Post>) -> Arc<Self> {
        let api = Self::default();
        *api.posts.lock() = posts;
        Arc::new(api)
    }

    pub fn network_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
            + self.react_calls.load(Ordering::SeqCst)
            + self.comment_calls.load(Ordering::SeqCst)
            + self.create_calls.load(Ordering::SeqCst)
            + self.update_calls.load(Ordering::SeqCst)
            + self.delete_calls.load(Ordering::SeqCst)
            + self.search_queries.lock().len()
    }

    fn check_mutation(&self) -> Result<(), ApiError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            Err(server_error())
        } else {
            Ok(())
        }
    }

    fn media_refs(files: &[LocalFile]) -> Vec<MediaRef> {
        files
            .iter()
            .map(|f| MediaRef {
                url: format!("/media/{}", f.name),
                kind: MediaKind::from_mime(&f.mime_type).unwrap_or(MediaKind::Image),
            })
            .collect()
    }
}

#[async_trait]
impl FeedApi for MockFeedApi {
    async fn list_posts(&self) -> Result<Vec<Post>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(server_error());
        }
        Ok(self.posts.lock().clone())
    }

    async fn list_posts_by_user(&self, user_id: &str) -> Result<Vec<Post>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .posts
            .lock()
            .iter()
            .filter(|p| p.author_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_post(&self, user_id: &str, content: &str, media: Vec<LocalFile>) -> Result<Post, ApiError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.uploaded.lock().extend(media.iter().cloned());
        self.check_mutation()?;

        let mut posts = self.posts.lock();
        let mut post = sample_post(&format!("p{}", posts.len() + 1), user_id);
        post.content = Some(content.to_string());
        post.media_items = Self::media_refs(&media);
        posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, post_id: &str, content: &str, media: Vec<LocalFile>) -> Result<Post, ApiError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check_mutation()?;

        let mut posts = self.posts.lock();
        let post = posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or(ApiError::Status { status: 404, body: String::new() })?;
        post.content = Some(content.to_string());
        if !media.is_empty() {
            post.media_items = Self::media_refs(&media);
        }
        Ok(post.clone())
    }

    async fn delete_post(&self, post_id: &str) -> Result<(), ApiError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check_mutation()?;
        self.posts.lock().retain(|p| p.id != post_id);
        Ok(())
    }

    async fn react(&self, post_id: &str, user_id: &str, symbol: &str) -> Result<(), ApiError> {
        self.react_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.react_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_mutation()?;

        let mut posts = self.posts.lock();
        if let Some(post) = posts.iter_mut().find(|p| p.id == post_id) {
            post.reactions.insert(user_id.to_string(), symbol.to_string());
        }
        Ok(())
    }

    async fn comment(&self, post_id: &str, comment: &CommentRequest) -> Result<(), ApiError> {
        self.comment_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.comment_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_mutation()?;

        let mut posts = self.posts.lock();
        if let Some(post) = posts.iter_mut().find(|p| p.id == post_id) {
            post.comments.push(Comment {
                user_id: comment.user_id.clone(),
                user_name: comment.user_name.clone(),
                text: comment.comment_text.clone(),
                posted_at: None,
            });
        }
        Ok(())
    }

    async fn search_users(&self, name: &str) -> Result<Vec<UserSummary>, ApiError> {
        self.search_queries.lock().push(name.to_string());
        let delay = self.search_delays.lock().get(name).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(server_error());
        }
        let needle = name.to_lowercase();
        Ok(self
            .users
            .lock()
            .iter()
            .filter(|u| u.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}

pub fn sample_post(id: &str, author_id: &str) -> Post {
    Post {
        id: id.to_string(),
        author_id: author_id.to_string(),
        author_name: format!("user {}", author_id),
        content: Some(format!("post {}", id)),
        media_items: Vec::new(),
        reactions: BTreeMap::new(),
        comments: Vec::new(),
        created_at: None,
    }
}

pub fn user(id: &str, name: &str) -> UserSummary {
    UserSummary { id: id.to_string(), name: name.to_string(), profile_pic: None }
}

pub fn viewer() -> Viewer {
    Viewer { user_id: "u1".to_string(), user_name: "Ana".to_string() }
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "API_BASE_URL" => Some("http://localhost:8080".to_string()),
        _ => None,
    })
    .expect("test config")
}

pub fn app(api: Arc<MockFeedApi>) -> AppState {
    AppState::with_api(
        test_config(),
        FeedScope::All,
        api,
        Url::parse("http://localhost:8080").expect("origin"),
    )
}
