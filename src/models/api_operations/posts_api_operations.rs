use crate::middleware::RequestGateway;
use crate::models::api_operations::{ensure_success, read_json, ApiError};
use crate::models::{CommentRequest, LocalFile, Post};
use reqwest::multipart::{Form, Part};
use reqwest::Method;

fn media_part(file: LocalFile) -> Result<Part, ApiError> {
    let part = Part::bytes(file.bytes.to_vec())
        .file_name(file.name)
        .mime_str(&file.mime_type)?;
    Ok(part)
}

/// Appends every file under the repeated `media` field.
fn with_media(mut form: Form, media: Vec<LocalFile>) -> Result<Form, ApiError> {
    for file in media {
        form = form.part("media", media_part(file)?);
    }
    Ok(form)
}

pub async fn list_posts(gateway: &RequestGateway) -> Result<Vec<Post>, ApiError> {
    let response = gateway.request(Method::GET, &["api", "posts"])?.send().await?;
    read_json(response).await
}

pub async fn list_posts_by_user(gateway: &RequestGateway, user_id: &str) -> Result<Vec<Post>, ApiError> {
    let response = gateway
        .request(Method::GET, &["api", "posts", "user", user_id])?
        .send()
        .await?;
    read_json(response).await
}

pub async fn create_post(
    gateway: &RequestGateway,
    user_id: &str,
    content: &str,
    media: Vec<LocalFile>,
) -> Result<Post, ApiError> {
    let file_count = media.len();
    let form = Form::new()
        .text("userId", user_id.to_string())
        .text("content", content.to_string());
    let form = with_media(form, media)?;

    let response = gateway
        .request(Method::POST, &["api", "posts", "create"])?
        .multipart(form)
        .send()
        .await?;
    let post: Post = read_json(response).await?;
    log::info!("Created post {} with {} media file(s)", post.id, file_count);
    Ok(post)
}

/// Replaces the post's text. When `media` is non-empty the server replaces
/// the whole media list as well; an empty `media` keeps the existing files.
pub async fn update_post(
    gateway: &RequestGateway,
    post_id: &str,
    content: &str,
    media: Vec<LocalFile>,
) -> Result<Post, ApiError> {
    let form = with_media(Form::new().text("content", content.to_string()), media)?;

    let response = gateway
        .request(Method::PUT, &["api", "posts", post_id])?
        .multipart(form)
        .send()
        .await?;
    read_json(response).await
}

pub async fn delete_post(gateway: &RequestGateway, post_id: &str) -> Result<(), ApiError> {
    let response = gateway
        .request(Method::DELETE, &["api", "posts", post_id])?
        .send()
        .await?;
    ensure_success(response).await?;
    Ok(())
}

/// The response body (the updated post) is not read. Callers re-fetch the
/// feed instead.
pub async fn react(gateway: &RequestGateway, post_id: &str, user_id: &str, symbol: &str) -> Result<(), ApiError> {
    let response = gateway
        .request(Method::PUT, &["api", "posts", post_id, "react"])?
        .query(&[("userId", user_id), ("reaction", symbol)])
        .send()
        .await?;
    ensure_success(response).await?;
    Ok(())
}

pub async fn comment(gateway: &RequestGateway, post_id: &str, comment: &CommentRequest) -> Result<(), ApiError> {
    let response = gateway
        .request(Method::POST, &["api", "posts", post_id, "comment"])?
        .json(comment)
        .send()
        .await?;
    ensure_success(response).await?;
    Ok(())
}
