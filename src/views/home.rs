//! The signed-in user's own file list: upload, share toggle, download.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

use super::copy_status::CopyStatus;
use super::ViewError;
use crate::api::types::{StorageFile, StorageFileResponse, ToggleSharingResponse};
use crate::api::ApiClient;
use crate::clipboard::Clipboard;
use crate::download;
use crate::fetch::Fetch;
use crate::mutation::{Method, Mutation, RequestBody};

pub const MY_FILES_ENDPOINT: &str = "/storages/me/files";

/// Public link for a server-issued share path: the first `/files` segment is
/// dropped and the share domain prefixed.
pub fn public_share_link(domain: &str, share_link: &str) -> String {
    format!("{}{}", domain, share_link.replacen("/files", "", 1))
}

/// What a share toggle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// `true` when this call turned sharing on.
    pub sharing: bool,
    /// Public link, only when sharing was turned on.
    pub link: Option<String>,
    /// Whether the link reached the clipboard.
    pub copied: bool,
}

/// The signed-in user's storage.
pub struct HomeView {
    client: Arc<ApiClient>,
    files: Fetch<StorageFileResponse>,
    upload: Mutation,
    toggle: Mutation<(), ToggleSharingResponse>,
    copy_status: CopyStatus,
    clipboard: Arc<dyn Clipboard>,
    share_domain: String,
    cancel: CancellationToken,
}

impl HomeView {
    /// Build the view and load the file list.
    pub async fn mount(
        client: Arc<ApiClient>,
        clipboard: Arc<dyn Clipboard>,
        share_domain: &str,
        parent: &CancellationToken,
    ) -> Self {
        let cancel = parent.child_token();
        let files: Fetch<StorageFileResponse> =
            Fetch::mount(Arc::clone(&client), MY_FILES_ENDPOINT, cancel.child_token()).await;
        Self {
            upload: Mutation::new(Arc::clone(&client), cancel.child_token()),
            toggle: Mutation::new(Arc::clone(&client), cancel.child_token()),
            copy_status: CopyStatus::new(cancel.child_token()),
            client,
            files,
            clipboard,
            share_domain: share_domain.to_string(),
            cancel,
        }
    }

    /// The listing binding for `/storages/me/files`.
    pub fn files(&self) -> &Fetch<StorageFileResponse> {
        &self.files
    }

    /// Whether an upload is in flight.
    pub fn uploading(&self) -> bool {
        self.upload.loading()
    }

    /// Whether `file_id`'s row shows the copied marker.
    pub fn is_copied(&self, file_id: &str) -> bool {
        self.copy_status.is_copied(file_id)
    }

    /// Token cancelled when the view is dropped.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fetch the listing again.
    pub async fn reload(&self) -> Result<(), ViewError> {
        Ok(self.files.reload().await?)
    }

    fn file(&self, file_id: &str) -> Result<StorageFile, ViewError> {
        self.files
            .data()
            .and_then(|listing| listing.find(file_id).cloned())
            .ok_or_else(|| ViewError::FileNotFound(file_id.to_string()))
    }

    /// Upload `path` into the loaded storage, then reload the list.
    ///
    /// Without a loaded `storageId` nothing is sent.
    pub async fn upload(&self, path: &Path) -> Result<(), ViewError> {
        let storage_id = self
            .files
            .data()
            .and_then(|listing| listing.storage_id)
            .ok_or(ViewError::MissingStorage)?;

        let io_error = |source| ViewError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = tokio::fs::File::open(path).await.map_err(io_error)?;
        let size = file.metadata().await.map_err(io_error)?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        log::info!("Uploading {} ({} bytes)", file_name, size);

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let form = Form::new().part("file", Part::stream_with_length(body, size).file_name(file_name));
        let endpoint = format!("/storages/{}/files", urlencoding::encode(&storage_id));
        let uploaded = self
            .upload
            .mutate(&endpoint, Method::Post, Some(RequestBody::Multipart(form)))
            .await;

        let reloaded = self.files.reload().await;
        if uploaded.is_none() {
            return Err(ViewError::from_binding(self.upload.error()));
        }
        Ok(reloaded?)
    }

    /// Flip sharing on `file_id`.
    ///
    /// When the server turns sharing on, the public link goes to the clipboard
    /// and the row shows "copied" for two seconds. The list is reloaded
    /// afterwards whatever the server answered.
    pub async fn toggle_sharing(&self, file_id: &str) -> Result<ToggleOutcome, ViewError> {
        let endpoint = format!("/files/{}/toggle-sharing", urlencoding::encode(file_id));
        let toggled = self.toggle.mutate(&endpoint, Method::Patch, None).await;

        let outcome = toggled.map(|resp| {
            if !resp.toggle_result {
                return ToggleOutcome {
                    sharing: false,
                    link: None,
                    copied: false,
                };
            }
            let link = public_share_link(&self.share_domain, &resp.share_link);
            let copied = match self.clipboard.write_text(&link) {
                Ok(()) => {
                    self.copy_status.mark_copied(file_id);
                    true
                }
                Err(e) => {
                    log::warn!("Could not copy share link: {}", e);
                    false
                }
            };
            ToggleOutcome {
                sharing: true,
                link: Some(link),
                copied,
            }
        });

        if let Err(e) = self.files.reload().await {
            log::warn!("Reload after share toggle failed: {}", e);
        }

        outcome.ok_or_else(|| ViewError::from_binding(self.toggle.error()))
    }

    /// Download one of the listed files into `dest_dir`.
    pub async fn download(&self, file_id: &str, dest_dir: &Path) -> Result<PathBuf, ViewError> {
        let file = self.file(file_id)?;
        let url = self.client.url(&file.download_link);
        Ok(download::download(&self.client, &url, &file.name, dest_dir).await?)
    }
}

impl Drop for HomeView {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::clipboard::mock::RecordingClipboard;
    use crate::views::test_support::{client_for, file_json, listing};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_listing(server: &MockServer, storage_id: Option<&str>, reloads: u64) {
        Mock::given(method("GET"))
            .and(path(MY_FILES_ENDPOINT))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(listing(storage_id, vec![file_json("abc123", "a.txt", false)])),
            )
            .expect(reloads)
            .mount(server)
            .await;
    }

    async fn mount_toggle(server: &MockServer, toggle_result: bool) {
        Mock::given(method("PATCH"))
            .and(path("/files/abc123/toggle-sharing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "shareLink": "/files/abc123/share", "toggleResult": toggle_result }
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[test]
    fn test_public_share_link() {
        assert_eq!(
            public_share_link("filejy.kr", "/files/abc123/share"),
            "filejy.kr/abc123/share"
        );
        assert_eq!(
            public_share_link("filejy.kr", "/files/share/users/u-1"),
            "filejy.kr/share/users/u-1"
        );
        assert_eq!(public_share_link("filejy.kr", "/share/x"), "filejy.kr/share/x");
    }

    #[tokio::test]
    async fn test_toggle_on_copies_link_and_reloads() {
        let server = MockServer::start().await;
        mount_listing(&server, Some("s-1"), 2).await;
        mount_toggle(&server, true).await;

        let clipboard = Arc::new(RecordingClipboard::default());
        let view = HomeView::mount(
            client_for(&server),
            clipboard.clone(),
            "filejy.kr",
            &CancellationToken::new(),
        )
        .await;

        let outcome = view.toggle_sharing("abc123").await.unwrap();
        assert_eq!(
            outcome,
            ToggleOutcome {
                sharing: true,
                link: Some("filejy.kr/abc123/share".into()),
                copied: true,
            }
        );
        assert_eq!(clipboard.written(), vec!["filejy.kr/abc123/share".to_string()]);
        assert!(view.is_copied("abc123"));
    }

    #[tokio::test]
    async fn test_toggle_off_leaves_clipboard_untouched() {
        let server = MockServer::start().await;
        mount_listing(&server, Some("s-1"), 2).await;
        mount_toggle(&server, false).await;

        let clipboard = Arc::new(RecordingClipboard::default());
        let view = HomeView::mount(
            client_for(&server),
            clipboard.clone(),
            "filejy.kr",
            &CancellationToken::new(),
        )
        .await;

        let outcome = view.toggle_sharing("abc123").await.unwrap();
        assert!(!outcome.sharing);
        assert!(outcome.link.is_none());
        assert!(clipboard.written().is_empty());
        assert!(!view.is_copied("abc123"));
    }

    #[tokio::test]
    async fn test_toggle_failure_still_reloads() {
        let server = MockServer::start().await;
        mount_listing(&server, Some("s-1"), 2).await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "toggle broke"})))
            .expect(1)
            .mount(&server)
            .await;

        let clipboard = Arc::new(RecordingClipboard::default());
        let view = HomeView::mount(
            client_for(&server),
            clipboard.clone(),
            "filejy.kr",
            &CancellationToken::new(),
        )
        .await;

        let err = view.toggle_sharing("abc123").await.unwrap_err();
        assert_eq!(err.to_string(), "toggle broke");
        assert!(clipboard.written().is_empty());
    }

    #[tokio::test]
    async fn test_clipboard_failure_is_not_fatal() {
        let server = MockServer::start().await;
        mount_listing(&server, Some("s-1"), 2).await;
        mount_toggle(&server, true).await;

        let view = HomeView::mount(
            client_for(&server),
            Arc::new(RecordingClipboard::failing()),
            "filejy.kr",
            &CancellationToken::new(),
        )
        .await;

        let outcome = view.toggle_sharing("abc123").await.unwrap();
        assert!(outcome.sharing);
        assert!(!outcome.copied);
        assert_eq!(outcome.link.as_deref(), Some("filejy.kr/abc123/share"));
        assert!(!view.is_copied("abc123"));
    }

    #[tokio::test]
    async fn test_upload_blocked_without_storage_id() {
        let server = MockServer::start().await;
        mount_listing(&server, None, 1).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"hi").unwrap();

        let view = HomeView::mount(
            client_for(&server),
            Arc::new(RecordingClipboard::default()),
            "filejy.kr",
            &CancellationToken::new(),
        )
        .await;
        let err = view.upload(&file).await.unwrap_err();
        assert!(matches!(err, ViewError::MissingStorage));
    }

    #[tokio::test]
    async fn test_upload_posts_multipart_then_reloads() {
        let server = MockServer::start().await;
        mount_listing(&server, Some("s-1"), 2).await;
        Mock::given(method("POST"))
            .and(path("/storages/s-1/files"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": null})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("photo.png");
        std::fs::write(&file, b"png-bytes").unwrap();

        let view = HomeView::mount(
            client_for(&server),
            Arc::new(RecordingClipboard::default()),
            "filejy.kr",
            &CancellationToken::new(),
        )
        .await;
        view.upload(&file).await.unwrap();
        assert!(!view.uploading());

        let requests = server.received_requests().await.unwrap();
        let post = requests.iter().find(|r| r.method.as_str() == "POST").unwrap();
        let body = String::from_utf8_lossy(&post.body);
        assert!(body.contains("name=\"file\""));
        assert!(body.contains("filename=\"photo.png\""));
        assert!(body.contains("png-bytes"));
    }

    #[tokio::test]
    async fn test_upload_streams_whole_file() {
        let server = MockServer::start().await;
        mount_listing(&server, Some("s-1"), 2).await;
        Mock::given(method("POST"))
            .and(path("/storages/s-1/files"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": null})))
            .expect(1)
            .mount(&server)
            .await;

        let contents: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("large.bin");
        std::fs::write(&file, &contents).unwrap();

        let view = HomeView::mount(
            client_for(&server),
            Arc::new(RecordingClipboard::default()),
            "filejy.kr",
            &CancellationToken::new(),
        )
        .await;
        view.upload(&file).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let post = requests.iter().find(|r| r.method.as_str() == "POST").unwrap();
        assert!(post
            .body
            .windows(contents.len())
            .any(|window| window == contents.as_slice()));
    }

    #[tokio::test]
    async fn test_upload_of_missing_file_sends_nothing() {
        let server = MockServer::start().await;
        mount_listing(&server, Some("s-1"), 1).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let view = HomeView::mount(
            client_for(&server),
            Arc::new(RecordingClipboard::default()),
            "filejy.kr",
            &CancellationToken::new(),
        )
        .await;
        let err = view.upload(&dir.path().join("gone.txt")).await.unwrap_err();
        assert!(matches!(err, ViewError::Io { .. }));
    }

    #[tokio::test]
    async fn test_upload_failure_surfaces_server_message() {
        let server = MockServer::start().await;
        mount_listing(&server, Some("s-1"), 2).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(413).set_body_json(json!({"message": "File too large"})))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("big.bin");
        std::fs::write(&file, b"0000").unwrap();

        let view = HomeView::mount(
            client_for(&server),
            Arc::new(RecordingClipboard::default()),
            "filejy.kr",
            &CancellationToken::new(),
        )
        .await;
        let err = view.upload(&file).await.unwrap_err();
        assert_eq!(err.to_string(), "File too large");
    }

    #[tokio::test]
    async fn test_download_of_listed_file() {
        let server = MockServer::start().await;
        mount_listing(&server, Some("s-1"), 1).await;
        Mock::given(method("GET"))
            .and(path("/files/abc123/download"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"contents".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let view = HomeView::mount(
            client_for(&server),
            Arc::new(RecordingClipboard::default()),
            "filejy.kr",
            &CancellationToken::new(),
        )
        .await;

        let saved = view.download("abc123", dir.path()).await.unwrap();
        assert_eq!(saved, dir.path().join("a.txt"));
        assert_eq!(std::fs::read(saved).unwrap(), b"contents");

        let err = view.download("missing", dir.path()).await.unwrap_err();
        assert!(matches!(err, ViewError::FileNotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_unauthenticated_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let view = HomeView::mount(
            client_for(&server),
            Arc::new(RecordingClipboard::default()),
            "filejy.kr",
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(
            view.files().error(),
            Some(ApiError::Unauthenticated { status: 401 })
        );
    }

    #[tokio::test]
    async fn test_drop_cancels_view_scope() {
        let server = MockServer::start().await;
        mount_listing(&server, Some("s-1"), 1).await;

        let parent = CancellationToken::new();
        let view = HomeView::mount(
            client_for(&server),
            Arc::new(RecordingClipboard::default()),
            "filejy.kr",
            &parent,
        )
        .await;
        let scope = view.cancel_token().clone();
        drop(view);

        assert!(scope.is_cancelled());
        assert!(!parent.is_cancelled());
    }
}
