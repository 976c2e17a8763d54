use crate::middleware::RequestGateway;
use crate::models::{CommentRequest, LocalFile, Post, UserSummary};
use async_trait::async_trait;
use thiserror::Error;

pub mod posts_api_operations;
pub mod users_api_operations;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Server responded with {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Could not decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("No session token available")]
    MissingCredential,
}

impl ApiError {
    /// The message shown to the user. Transport details stay in the log.
    pub fn user_message(&self) -> &'static str {
        match self {
            ApiError::MissingCredential => "You are signed out. Please sign in again.",
            ApiError::Status { status: 404, .. } => "That post no longer exists. Please refresh.",
            _ => "Something went wrong. Please try again.",
        }
    }
}

/// Everything the feed engine needs from the remote API.
///
/// The HTTP implementation is `HttpFeedApi`; tests plug in an in-memory one.
#[async_trait]
pub trait FeedApi: Send + Sync {
    async fn list_posts(&self) -> Result<Vec<Post>, ApiError>;
    async fn list_posts_by_user(&self, user_id: &str) -> Result<Vec<Post>, ApiError>;
    async fn create_post(&self, user_id: &str, content: &str, media: Vec<LocalFile>) -> Result<Post, ApiError>;
    async fn update_post(&self, post_id: &str, content: &str, media: Vec<LocalFile>) -> Result<Post, ApiError>;
    async fn delete_post(&self, post_id: &str) -> Result<(), ApiError>;
    async fn react(&self, post_id: &str, user_id: &str, symbol: &str) -> Result<(), ApiError>;
    async fn comment(&self, post_id: &str, comment: &CommentRequest) -> Result<(), ApiError>;
    async fn search_users(&self, name: &str) -> Result<Vec<UserSummary>, ApiError>;
}

pub struct HttpFeedApi {
    gateway: RequestGateway,
}

impl HttpFeedApi {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl FeedApi for HttpFeedApi {
    async fn list_posts(&self) -> Result<Vec<Post>, ApiError> {
        posts_api_operations::list_posts(&self.gateway).await
    }

    async fn list_posts_by_user(&self, user_id: &str) -> Result<Vec<Post>, ApiError> {
        posts_api_operations::list_posts_by_user(&self.gateway, user_id).await
    }

    async fn create_post(&self, user_id: &str, content: &str, media: Vec<LocalFile>) -> Result<Post, ApiError> {
        posts_api_operations::create_post(&self.gateway, user_id, content, media).await
    }

    async fn update_post(&self, post_id: &str, content: &str, media: Vec<LocalFile>) -> Result<Post, ApiError> {
        posts_api_operations::update_post(&self.gateway, post_id, content, media).await
    }

    async fn delete_post(&self, post_id: &str) -> Result<(), ApiError> {
        posts_api_operations::delete_post(&self.gateway, post_id).await
    }

    async fn react(&self, post_id: &str, user_id: &str, symbol: &str) -> Result<(), ApiError> {
        posts_api_operations::react(&self.gateway, post_id, user_id, symbol).await
    }

    async fn comment(&self, post_id: &str, comment: &CommentRequest) -> Result<(), ApiError> {
        posts_api_operations::comment(&self.gateway, post_id, comment).await
    }

    async fn search_users(&self, name: &str) -> Result<Vec<UserSummary>, ApiError> {
        users_api_operations::search_users(&self.gateway, name).await
    }
}

/// Turns a non-2xx response into `ApiError::Status`, keeping the body for the log.
pub(crate) async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(ApiError::Status { status: status.as_u16(), body })
}

/// Reads a JSON body. Decoding goes through `serde_json` so a malformed
/// payload surfaces as `Decode` rather than a transport error.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let bytes = ensure_success(response).await?.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
