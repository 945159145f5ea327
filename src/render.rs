//! Plain-text rendering of file listings for the terminal.

use crate::api::types::{StorageFile, StorageFileResponse};

pub const EMPTY_HOME: &str = "No files yet. Upload one with `filejy upload <path>`.";
pub const EMPTY_SHARED: &str = "This user is not sharing any files.";

/// Date part of an ISO-8601 timestamp, or the input if it has none.
fn date_part(timestamp: &str) -> &str {
    timestamp.split('T').next().unwrap_or(timestamp)
}

fn sharing_marker(file: &StorageFile, copied: bool) -> &'static str {
    match (copied, file.is_sharing) {
        (true, _) => "copied!",
        (false, true) => "shared",
        (false, false) => "",
    }
}

pub fn file_row(file: &StorageFile, copied: bool) -> String {
    format!(
        "{:<24}  {:<28}  {:>10}  {:>10}  {}",
        file.id,
        file.name,
        date_part(&file.created_time),
        file.file_size,
        sharing_marker(file, copied)
    )
    .trim_end()
    .to_string()
}

/// One line per file. `copied` says which rows show the copied marker.
pub fn file_table(listing: &StorageFileResponse, copied: impl Fn(&str) -> bool, empty: &str) -> String {
    if listing.storage_files.is_empty() {
        return empty.to_string();
    }
    listing
        .storage_files
        .iter()
        .map(|file| file_row(file, copied(&file.id)))
        .collect::<Vec<_>>()
        .join("\n")
}
