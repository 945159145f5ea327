//! Read-only view of the files another user is sharing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::ViewError;
use crate::api::types::StorageFileResponse;
use crate::api::ApiClient;
use crate::download;
use crate::fetch::Fetch;

/// Listing endpoint for `user_id`'s shared files.
pub fn shared_files_endpoint(user_id: &str) -> String {
    format!("/files/share/users/{}", urlencoding::encode(user_id))
}

/// Files one user shares, as seen by anyone with the link.
pub struct ShareView {
    client: Arc<ApiClient>,
    files: Fetch<StorageFileResponse>,
    cancel: CancellationToken,
}

impl ShareView {
    /// Build the view and load `user_id`'s shared files. A failed load is
    /// left in [`ShareView::files`].
    pub async fn mount(client: Arc<ApiClient>, user_id: &str, parent: &CancellationToken) -> Self {
        let cancel = parent.child_token();
        let files: Fetch<StorageFileResponse> = Fetch::mount(
            Arc::clone(&client),
            shared_files_endpoint(user_id),
            cancel.child_token(),
        )
        .await;
        Self {
            client,
            files,
            cancel,
        }
    }

    /// The listing binding.
    pub fn files(&self) -> &Fetch<StorageFileResponse> {
        &self.files
    }

    /// Download one of the shared files into `dest_dir`.
    pub async fn download(&self, file_id: &str, dest_dir: &Path) -> Result<PathBuf, ViewError> {
        let file = self
            .files
            .data()
            .and_then(|listing| listing.find(file_id).cloned())
            .ok_or_else(|| ViewError::FileNotFound(file_id.to_string()))?;
        let url = self.client.url(&file.download_link);
        Ok(download::download(&self.client, &url, &file.name, dest_dir).await?)
    }
}

impl Drop for ShareView {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::test_support::{client_for, file_json, listing};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_endpoint_encodes_user_id() {
        assert_eq!(shared_files_endpoint("u-1"), "/files/share/users/u-1");
        assert_eq!(shared_files_endpoint("a/b"), "/files/share/users/a%2Fb");
    }

    #[tokio::test]
    async fn test_lists_and_downloads_shared_files() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/share/users/u-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing(
                Some("s-9"),
                vec![file_json("f-1", "shared.pdf", true)],
            )))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/f-1/download"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let view = ShareView::mount(client_for(&server), "u-9", &CancellationToken::new()).await;
        let files = view.files().data().unwrap();
        assert_eq!(files.storage_files.len(), 1);
        assert!(files.storage_files[0].is_sharing);

        let dir = tempfile::tempdir().unwrap();
        let saved = view.download("f-1", dir.path()).await.unwrap();
        assert_eq!(std::fs::read(saved).unwrap(), b"%PDF");
    }

    #[tokio::test]
    async fn test_download_failure_saves_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/share/users/u-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing(
                Some("s-9"),
                vec![file_json("f-1", "shared.pdf", true)],
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/f-1/download"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let view = ShareView::mount(client_for(&server), "u-9", &CancellationToken::new()).await;
        let dir = tempfile::tempdir().unwrap();
        let err = view.download("f-1", dir.path()).await.unwrap_err();
        assert!(matches!(err, ViewError::Download(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
