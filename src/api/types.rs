//! Request and response payloads for the filejy backend API.
//!
//! All structs use camelCase serialization to match the API's JSON format.
//! Responses arrive wrapped in [`super::envelope::ResponseEnvelope`].

use serde::{Deserialize, Serialize};

/// A single file record in a storage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageFile {
    pub id: String,
    pub name: String,
    pub created_time: String,
    pub last_modified_time: String,
    /// Human-readable size as formatted by the server.
    pub file_size: String,
    /// Path relative to the API base URL.
    pub download_link: String,
    pub is_sharing: bool,
}

/// Payload of GET /storages/me/files and GET /files/share/users/{userId}.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageFileResponse {
    /// Needed to build the upload endpoint. Upload is blocked without it.
    #[serde(default)]
    pub storage_id: Option<String>,
    #[serde(default)]
    pub storage_files: Vec<StorageFile>,
}

impl StorageFileResponse {
    pub fn find(&self, file_id: &str) -> Option<&StorageFile> {
        self.storage_files.iter().find(|f| f.id == file_id)
    }
}

/// Payload of PATCH /files/{fileId}/toggle-sharing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleSharingResponse {
    pub share_link: String,
    /// `true` when sharing was turned on by this call.
    pub toggle_result: bool,
}

/// Body of POST /users/sign-in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Payload of POST /users/sign-in.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub auth_scheme: String,
    pub access_token: String,
    pub access_token_exp: String,
    pub refresh_token: String,
    pub refresh_token_exp: String,
    pub username: String,
}

impl SignInResponse {
    /// Value sent in the `Authorization` header: `"<scheme> <token>"`.
    pub fn credential(&self) -> String {
        format!("{} {}", self.auth_scheme, self.access_token)
    }
}

/// Body of POST /users.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignedUpUser {
    pub username: String,
}

/// Payload of POST /users.
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpResponse {
    pub user: SignedUpUser,
}
