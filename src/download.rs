//! Authenticated file download.
//!
//! The body is streamed into a temp file next to the destination and then
//! persisted under the suggested name. An existing file is never replaced:
//! a taken name becomes `name (1).ext`, `name (2).ext` and so on. The temp
//! file is removed on every path that does not end in a successful persist.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::api::{ApiClient, ApiError};

/// Name used when the server-supplied name has no usable file component.
const FALLBACK_FILE_NAME: &str = "download";

/// Numbered alternatives tried before a download gives up on a name.
const MAX_NAME_ATTEMPTS: u32 = 100;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Failed to save {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No free file name left for {path}")]
    NameTaken { path: PathBuf },
}

impl DownloadError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> DownloadError + '_ {
        move |source| DownloadError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Last path component of `name`, so a server-supplied name cannot escape `dest_dir`.
pub fn safe_file_name(name: &str) -> &str {
    match name.rsplit(['/', '\\']).next() {
        Some(last) if !last.is_empty() && last != "." && last != ".." => last,
        _ => FALLBACK_FILE_NAME,
    }
}

/// `name` for attempt 0, then `stem (n).ext`.
fn numbered_name(name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{} ({}).{}", stem, attempt, ext),
        _ => format!("{} ({})", name, attempt),
    }
}

/// Download `url` with the session credential into `dest_dir`.
///
/// Returns the path the file was saved to, which differs from the suggested
/// name when that one is taken. A non-success status returns an error before
/// anything touches the filesystem.
pub async fn download(
    client: &ApiClient,
    url: &str,
    suggested_name: &str,
    dest_dir: &Path,
) -> Result<PathBuf, DownloadError> {
    let mut resp = client
        .authenticated_get_absolute(url)
        .await
        .map_err(ApiError::from)?;

    let status = resp.status();
    if !status.is_success() {
        if let Some(err) = ApiError::unauthenticated(status) {
            return Err(err.into());
        }
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: format!("Download failed with HTTP status {}", status.as_u16()),
        }
        .into());
    }

    let name = safe_file_name(suggested_name);
    let mut temp = tempfile::NamedTempFile::new_in(dest_dir).map_err(DownloadError::io(dest_dir))?;
    let std_file = temp.as_file().try_clone().map_err(DownloadError::io(temp.path()))?;
    let mut file = tokio::fs::File::from_std(std_file);

    let mut written: u64 = 0;
    while let Some(chunk) = resp.chunk().await.map_err(ApiError::from)? {
        file.write_all(&chunk)
            .await
            .map_err(DownloadError::io(temp.path()))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(DownloadError::io(temp.path()))?;
    drop(file);

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let target = dest_dir.join(numbered_name(name, attempt));
        match temp.persist_noclobber(&target) {
            Ok(_) => {
                log::info!("Downloaded {} ({} bytes) to {}", url, written, target.display());
                return Ok(target);
            }
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                log::debug!("{} exists, trying another name", target.display());
                temp = e.file;
            }
            Err(e) => {
                return Err(DownloadError::Io {
                    path: target,
                    source: e.error,
                })
            }
        }
    }

    Err(DownloadError::NameTaken {
        path: dest_dir.join(name),
    })
}
