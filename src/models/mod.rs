use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classifies a MIME type by its top-level type. Anything that is not
    /// `image/*` or `video/*` has no kind.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        match mime_type.split('/').next() {
            Some("image") => Some(MediaKind::Image),
            Some("video") => Some(MediaKind::Video),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub url: String, // server-relative, e.g. "/media/3f2a.png"
    pub kind: MediaKind,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(rename = "commentText")]
    pub text: String,
    #[serde(rename = "commentedAt", default)]
    pub posted_at: Option<DateTime<Utc>>,
}

/// A post as the server reports it.
///
/// `reactions` maps user id to that user's single reaction symbol, so a user
/// can never be counted twice. `comments` are kept in server order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(from = "PostWire", into = "PostWire")]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub content: Option<String>,
    pub media_items: Vec<MediaRef>,
    pub reactions: BTreeMap<String, String>,
    pub comments: Vec<Comment>,
    pub created_at: Option<DateTime<Utc>>,
}

// --- Wire format ---
// The API ships media as two parallel arrays and omits empty collections.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostWire {
    id: String,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    media_urls: Option<Vec<String>>,
    #[serde(default)]
    media_types: Option<Vec<String>>,
    #[serde(default)]
    reactions: Option<BTreeMap<String, String>>,
    #[serde(default)]
    comments: Option<Vec<Comment>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl From<PostWire> for Post {
    fn from(wire: PostWire) -> Self {
        let media_types = wire.media_types.unwrap_or_default();
        let media_items = wire
            .media_urls
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, url)| {
                // The server writes "video" for mp4/webm and "image" for everything else.
                let kind = match media_types.get(i).map(String::as_str) {
                    Some("video") => MediaKind::Video,
                    _ => MediaKind::Image,
                };
                MediaRef { url, kind }
            })
            .collect();

        Post {
            id: wire.id,
            author_id: wire.user_id,
            author_name: wire.user_name.unwrap_or_default(),
            content: wire.content,
            media_items,
            reactions: wire.reactions.unwrap_or_default(),
            comments: wire.comments.unwrap_or_default(),
            created_at: wire.created_at,
        }
    }
}

impl From<Post> for PostWire {
    fn from(post: Post) -> Self {
        let (media_urls, media_types) = post
            .media_items
            .into_iter()
            .map(|m| (m.url, m.kind.as_str().to_string()))
            .unzip();

        PostWire {
            id: post.id,
            user_id: post.author_id,
            user_name: Some(post.author_name),
            content: post.content,
            media_urls: Some(media_urls),
            media_types: Some(media_types),
            reactions: Some(post.reactions),
            comments: Some(post.comments),
            created_at: post.created_at,
        }
    }
}

/// A file picked by the user, held in memory until it is uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: bytes::Bytes,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<bytes::Bytes>) -> Self {
        Self { name: name.into(), mime_type: mime_type.into(), bytes: bytes.into() }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// One row of a user search result.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub profile_pic: Option<String>,
}

/// Body of `POST /api/posts/{id}/comment`.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub user_id: String,
    pub user_name: String,
    pub comment_text: String,
}

/// The signed-in user on whose behalf the engine acts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: String,
    pub user_name: String,
}

/// Count of users per reaction symbol. Derived from `Post::reactions`,
/// never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReactionSummary {
    pub counts: BTreeMap<String, usize>,
}

impl ReactionSummary {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn count_for(&self, symbol: &str) -> usize {
        self.counts.get(symbol).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

/// An inline, dismissible alert shown next to the control that produced it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn error(message: impl Into<String>) -> Self {
        Self { message: message.into(), kind: NotificationKind::Error }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { message: message.into(), kind: NotificationKind::Success }
    }
}

/// A comment ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentView {
    pub user_name: String,
    pub text: String,
    pub posted_at: Option<DateTime<Utc>>,
}

/// A media item with its URL resolved against the API origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaView {
    pub url: String,
    pub kind: MediaKind,
}

/// Everything a post card needs to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostView {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub content: Option<String>,
    pub media: Vec<MediaView>,
    pub reaction_summary: ReactionSummary,
    pub my_reaction: Option<String>,
    pub comments: Vec<CommentView>,
    pub created_at: Option<DateTime<Utc>>,
    pub is_own: bool, // edit/delete controls are only offered to the author
}

pub mod api_operations;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_reads_parallel_media_arrays() {
        let json = r#"{
            "id": "p1",
            "userId": "u1",
            "content": "hello",
            "mediaUrls": ["/media/a.png", "/media/b.mp4", "/media/c.gif"],
            "mediaTypes": ["image", "video"],
            "reactions": {"u2": "👍", "u3": "😂"},
            "comments": [{"userId": "u2", "userName": "Bo", "commentText": "nice", "commentedAt": "2024-05-01T10:00:00.000+00:00"}],
            "createdAt": "2024-05-01T09:00:00Z"
        }"#;

        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.author_id, "u1");
        assert_eq!(post.author_name, "");
        assert_eq!(post.media_items.len(), 3);
        assert_eq!(post.media_items[1].kind, MediaKind::Video);
        // No type recorded for the third file: the server default is image.
        assert_eq!(post.media_items[2].kind, MediaKind::Image);
        assert_eq!(post.reactions.len(), 2);
        assert_eq!(post.comments[0].text, "nice");
        assert!(post.comments[0].posted_at.is_some());
    }

    #[test]
    fn post_tolerates_missing_collections() {
        let post: Post = serde_json::from_str(r#"{"id": "p9", "userId": "u1"}"#).unwrap();
        assert!(post.media_items.is_empty());
        assert!(post.reactions.is_empty());
        assert!(post.comments.is_empty());
        assert!(post.content.is_none());
        assert!(post.created_at.is_none());
    }

    #[test]
    fn post_serializes_back_to_wire_names() {
        let post = Post {
            id: "p1".to_string(),
            author_id: "u1".to_string(),
            author_name: "Ana".to_string(),
            content: None,
            media_items: vec![MediaRef { url: "/media/x.webm".to_string(), kind: MediaKind::Video }],
            reactions: BTreeMap::new(),
            comments: Vec::new(),
            created_at: None,
        };

        let value = serde_json::to_value(&post).unwrap();
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["mediaUrls"][0], "/media/x.webm");
        assert_eq!(value["mediaTypes"][0], "video");
    }

    #[test]
    fn media_kind_from_mime() {
        assert_eq!(MediaKind::from_mime("image/png"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_mime("video/webm"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_mime("application/pdf"), None);
    }

    #[test]
    fn notification_kind_serializes_lowercase() {
        let done = serde_json::to_value(Notification::success("Posted p1")).unwrap();
        assert_eq!(done["kind"], "success");
        assert_eq!(Notification::error("boom").kind, NotificationKind::Error);
    }
}
