use crate::models::api_operations::ApiError;
use reqwest::{Client, Method, RequestBuilder};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Supplies the bearer token for authenticated requests.
///
/// The token is read on every request and never written by the engine, so
/// the session store that owns it can rotate or clear it at any time.
pub trait CredentialSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// A fixed token, mostly for tests and one-shot CLI runs.
pub struct StaticCredential(String);

impl StaticCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl CredentialSource for StaticCredential {
    fn bearer_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Reads the token from an environment variable at call time.
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialSource for EnvCredential {
    fn bearer_token(&self) -> Option<String> {
        match env::var(&self.var) {
            Ok(token) if !token.trim().is_empty() => Some(token.trim().to_string()),
            _ => {
                log::warn!("{} is not set. Authenticated requests will be refused locally.", self.var);
                None
            }
        }
    }
}

/// Builds every request against the fixed API origin and attaches
/// `Authorization: Bearer <token>`.
#[derive(Clone)]
pub struct RequestGateway {
    client: Client,
    base_url: Url,
    credentials: Arc<dyn CredentialSource>,
}

impl RequestGateway {
    pub fn new(
        base_url: Url,
        timeout: Duration,
        credentials: Arc<dyn CredentialSource>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url, credentials })
    }

    /// Starts an authenticated request for the given path segments, e.g.
    /// `["api", "posts", id, "react"]`. Segments are percent-encoded.
    ///
    /// Fails with `MissingCredential` before any I/O when no token is available.
    pub fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let token = self
            .credentials
            .bearer_token()
            .ok_or(ApiError::MissingCredential)?;

        let mut target = self.base_url.clone();
        target
            .path_segments_mut()
            .map_err(|_| ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        log::debug!("{} {}", method, target);
        Ok(self.client.request(method, target).bearer_auth(token))
    }
}

/// Resolves a server-relative media path against the API origin. Absolute
/// URLs pass through unchanged.
pub fn resolve_media_url(base_url: &Url, path: &str) -> String {
    match base_url.join(path) {
        Ok(url) => url.to_string(),
        Err(e) => {
            log::warn!("Could not resolve media path '{}': {}", path, e);
            path.to_string()
        }
    }
}
