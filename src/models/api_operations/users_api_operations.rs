use crate::middleware::RequestGateway;
use crate::models::api_operations::{read_json, ApiError};
use crate::models::UserSummary;
use reqwest::Method;

/// Case-insensitive substring search over user names.
pub async fn search_users(gateway: &RequestGateway, name: &str) -> Result<Vec<UserSummary>, ApiError> {
    let response = gateway
        .request(Method::GET, &["api", "auth", "search"])?
        .query(&[("name", name)])
        .send()
        .await?;
    read_json(response).await
}
