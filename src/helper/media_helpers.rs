use crate::models::{LocalFile, MediaKind};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub const MAX_POST_MEDIA_BYTES: u64 = 10 * 1024 * 1024;

/// MIME types a post may carry, with the extension each is stored under.
const ALLOWED_MEDIA: [(&str, &str); 5] = [
    ("image/gif", "gif"),
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("video/mp4", "mp4"),
    ("video/webm", "webm"),
];

pub fn is_allowed_mime(mime_type: &str) -> bool {
    ALLOWED_MEDIA.iter().any(|(mime, _)| *mime == mime_type)
}

/// Guesses a MIME type from a file extension, for files loaded from disk.
pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    let ext = if ext == "jpeg" { "jpg".to_string() } else { ext };
    ALLOWED_MEDIA
        .iter()
        .find(|(_, known)| *known == ext)
        .map(|(mime, _)| *mime)
}

/// Reads a file from disk into a `LocalFile`. Unknown extensions get
/// `application/octet-stream` and will be rejected when staged.
pub async fn load_local_file(path: &Path) -> std::io::Result<LocalFile> {
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.tmp".to_string());
    let mime_type = mime_from_extension(path).unwrap_or("application/octet-stream");
    Ok(LocalFile::new(name, mime_type, bytes))
}

// ====================================================================
// ====================== PREVIEW RESOURCES ===========================
// ====================================================================

/// Issues short-lived `preview:` URLs that grant read access to the bytes
/// of a file that has not been uploaded yet.
///
/// Revoking is idempotent: revoking an unknown or already revoked URL is a
/// no-op that returns `false`.
#[derive(Default)]
pub struct PreviewStore {
    live: Mutex<HashMap<String, Bytes>>,
    created: AtomicU64,
    revoked: AtomicU64,
}

impl PreviewStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn create(&self, file: &LocalFile) -> String {
        let url = format!("preview:{}", Uuid::new_v4());
        self.live.lock().insert(url.clone(), file.bytes.clone());
        self.created.fetch_add(1, Ordering::Relaxed);
        url
    }

    pub fn revoke(&self, url: &str) -> bool {
        let removed = self.live.lock().remove(url).is_some();
        if removed {
            self.revoked.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Bytes behind a live preview URL, for rendering.
    pub fn read(&self, url: &str) -> Option<Bytes> {
        self.live.lock().get(url).cloned()
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.live.lock().contains_key(url)
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    pub fn created_count(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    pub fn revoked_count(&self) -> u64 {
        self.revoked.load(Ordering::Relaxed)
    }
}

// ====================================================================
// ====================== ATTACHMENT STAGING ==========================
// ====================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    #[error("Unsupported file type: '{0}'. Please choose a JPEG, PNG or GIF image, or an MP4 or WebM video.")]
    UnsupportedType(String),
    #[error("File is too large. Maximum size is {}.", format_size_limit(.max_bytes))]
    TooLarge { size: u64, max_bytes: u64 },
}

/// Renders a byte limit in the largest unit that divides it evenly.
fn format_size_limit(bytes: &u64) -> String {
    let bytes = *bytes;
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else if bytes >= KIB && bytes % KIB == 0 {
        format!("{}KB", bytes / KIB)
    } else {
        format!("{} bytes", bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub file_name: String,
    pub reason: RejectionReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentId(Uuid);

/// A validated file waiting to be submitted, together with its preview URL.
#[derive(Debug)]
pub struct PendingAttachment {
    pub id: AttachmentId,
    pub file: LocalFile,
    pub kind: MediaKind,
    pub size: u64,
    pub preview_url: String,
}

#[derive(Debug, Default)]
pub struct StageOutcome {
    pub accepted: Vec<AttachmentId>,
    pub rejected: Vec<Rejection>,
}

/// Validates picked files and owns their preview URLs until the attachment
/// is removed, the post is submitted, or the pipeline is dropped.
pub struct MediaPipeline {
    previews: Arc<PreviewStore>,
    pending: Vec<PendingAttachment>,
    max_bytes: u64,
}

impl MediaPipeline {
    pub fn new(previews: Arc<PreviewStore>) -> Self {
        Self::with_limit(previews, MAX_POST_MEDIA_BYTES)
    }

    pub fn with_limit(previews: Arc<PreviewStore>, max_bytes: u64) -> Self {
        Self { previews, pending: Vec::new(), max_bytes }
    }

    fn validate(&self, file: &LocalFile) -> Result<MediaKind, RejectionReason> {
        if !is_allowed_mime(&file.mime_type) {
            return Err(RejectionReason::UnsupportedType(file.mime_type.clone()));
        }
        if file.size() > self.max_bytes {
            return Err(RejectionReason::TooLarge {
                size: file.size(),
                max_bytes: self.max_bytes,
            });
        }
        MediaKind::from_mime(&file.mime_type)
            .ok_or_else(|| RejectionReason::UnsupportedType(file.mime_type.clone()))
    }

    /// Validates each file. Accepted files get a preview URL right away;
    /// rejected ones never touch the preview store.
    pub fn stage(&mut self, files: Vec<LocalFile>) -> StageOutcome {
        let mut outcome = StageOutcome::default();
        for file in files {
            match self.validate(&file) {
                Ok(kind) => {
                    let id = AttachmentId(Uuid::new_v4());
                    let preview_url = self.previews.create(&file);
                    let size = file.size();
                    self.pending.push(PendingAttachment { id, file, kind, size, preview_url });
                    outcome.accepted.push(id);
                }
                Err(reason) => outcome.rejected.push(Rejection { file_name: file.name, reason }),
            }
        }
        outcome
    }

    /// Removes an attachment and revokes its preview. Unknown ids are ignored.
    pub fn unstage(&mut self, id: AttachmentId) -> bool {
        match self.pending.iter().position(|a| a.id == id) {
            Some(index) => {
                let attachment = self.pending.remove(index);
                self.previews.revoke(&attachment.preview_url);
                true
            }
            None => false,
        }
    }

    pub fn pending(&self) -> &[PendingAttachment] {
        &self.pending
    }

    pub fn get(&self, id: AttachmentId) -> Option<&PendingAttachment> {
        self.pending.iter().find(|a| a.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Hands the raw files over for upload and revokes every preview. The
    /// previews are gone whether or not the upload later succeeds.
    pub fn take_for_submission(&mut self) -> Vec<LocalFile> {
        self.pending
            .drain(..)
            .map(|attachment| {
                self.previews.revoke(&attachment.preview_url);
                attachment.file
            })
            .collect()
    }

    /// Drops every pending attachment without uploading it.
    pub fn clear(&mut self) {
        for attachment in self.pending.drain(..) {
            self.previews.revoke(&attachment.preview_url);
        }
    }
}

impl Drop for MediaPipeline {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: usize = 1024 * 1024;

    fn file(name: &str, mime: &str, size: usize) -> LocalFile {
        LocalFile::new(name, mime, vec![0u8; size])
    }

    #[test]
    fn pdf_is_rejected_without_a_preview() {
        let store = PreviewStore::new();
        let mut pipeline = MediaPipeline::new(store.clone());

        let outcome = pipeline.stage(vec![file("notes.pdf", "application/pdf", 1024)]);

        assert!(outcome.accepted.is_empty());
        assert_eq!(
            outcome.rejected[0].reason,
            RejectionReason::UnsupportedType("application/pdf".to_string())
        );
        assert_eq!(store.created_count(), 0);
        assert!(pipeline.is_empty());
    }

    #[test]
    fn size_limit_is_enforced() {
        let store = PreviewStore::new();
        let mut pipeline = MediaPipeline::new(store.clone());

        let big = pipeline.stage(vec![file("big.png", "image/png", 15 * MIB)]);
        assert!(matches!(big.rejected[0].reason, RejectionReason::TooLarge { max_bytes, .. } if max_bytes == 10 * MIB as u64));
        assert_eq!(big.rejected[0].reason.to_string(), "File is too large. Maximum size is 10MB.");
        assert_eq!(store.created_count(), 0);

        let ok = pipeline.stage(vec![file("ok.jpg", "image/jpeg", 5 * MIB)]);
        assert_eq!(ok.accepted.len(), 1);
        assert!(ok.rejected.is_empty());
        assert_eq!(store.created_count(), 1);
        assert_eq!(store.live_count(), 1);

        let staged = pipeline.get(ok.accepted[0]).unwrap();
        assert_eq!(staged.kind, MediaKind::Image);
        assert_eq!(staged.size, (5 * MIB) as u64);
        assert!(store.is_live(&staged.preview_url));
    }

    #[test]
    fn small_limits_are_reported_in_smaller_units() {
        let mut pipeline = MediaPipeline::with_limit(PreviewStore::new(), 512 * 1024);
        let outcome = pipeline.stage(vec![file("a.png", "image/png", MIB)]);
        assert_eq!(outcome.rejected[0].reason.to_string(), "File is too large. Maximum size is 512KB.");

        let mut pipeline = MediaPipeline::with_limit(PreviewStore::new(), 1000);
        let outcome = pipeline.stage(vec![file("b.png", "image/png", 2000)]);
        assert_eq!(outcome.rejected[0].reason.to_string(), "File is too large. Maximum size is 1000 bytes.");
    }

    #[test]
    fn mixed_batch_keeps_valid_files() {
        let mut pipeline = MediaPipeline::new(PreviewStore::new());
        let outcome = pipeline.stage(vec![
            file("a.mp4", "video/mp4", 10),
            file("b.exe", "application/x-msdownload", 10),
            file("c.webm", "video/webm", 10),
        ]);

        assert_eq!(outcome.accepted.len(), 2);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].file_name, "b.exe");
        assert!(pipeline.pending().iter().all(|a| a.kind == MediaKind::Video));
    }

    #[test]
    fn unstage_twice_revokes_once() {
        let store = PreviewStore::new();
        let mut pipeline = MediaPipeline::new(store.clone());
        let id = pipeline.stage(vec![file("a.gif", "image/gif", 10)]).accepted[0];
        let url = pipeline.get(id).unwrap().preview_url.clone();

        assert!(pipeline.unstage(id));
        assert!(!pipeline.unstage(id));

        assert_eq!(store.revoked_count(), 1);
        assert!(!store.is_live(&url));
        assert!(!store.revoke(&url));
    }

    #[test]
    fn submission_revokes_every_preview() {
        let store = PreviewStore::new();
        let mut pipeline = MediaPipeline::new(store.clone());
        pipeline.stage(vec![file("a.png", "image/png", 10), file("b.png", "image/png", 20)]);

        let files = pipeline.take_for_submission();

        assert_eq!(files.len(), 2);
        assert_eq!(files[1].size(), 20);
        assert_eq!(store.live_count(), 0);
        assert_eq!(store.revoked_count(), 2);
        assert!(pipeline.is_empty());
    }

    #[test]
    fn dropping_the_pipeline_revokes_leftovers() {
        let store = PreviewStore::new();
        {
            let mut pipeline = MediaPipeline::new(store.clone());
            pipeline.stage(vec![file("a.png", "image/png", 10)]);
            assert_eq!(store.live_count(), 1);
        }
        assert_eq!(store.live_count(), 0);
        assert_eq!(store.revoked_count(), 1);
    }

    #[test]
    fn preview_url_reads_file_bytes() {
        let store = PreviewStore::new();
        let url = store.create(&LocalFile::new("a.png", "image/png", b"PNGDATA".to_vec()));
        assert_eq!(store.read(&url).unwrap().as_ref(), b"PNGDATA");
        store.revoke(&url);
        assert!(store.read(&url).is_none());
    }

    #[test]
    fn extensions_map_to_allowed_mime_types() {
        assert_eq!(mime_from_extension(Path::new("cat.JPEG")), Some("image/jpeg"));
        assert_eq!(mime_from_extension(Path::new("clip.webm")), Some("video/webm"));
        assert_eq!(mime_from_extension(Path::new("doc.pdf")), None);
        assert_eq!(mime_from_extension(Path::new("noext")), None);
    }

    #[tokio::test]
    async fn loads_files_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, b"fake png").unwrap();

        let loaded = load_local_file(&path).await.unwrap();
        assert_eq!(loaded.name, "photo.png");
        assert_eq!(loaded.mime_type, "image/png");
        assert_eq!(loaded.size(), 8);
    }
}
