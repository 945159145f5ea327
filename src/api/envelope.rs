//! The response envelope every backend response is wrapped in.
//!
//! Both the read path (`Fetch`) and the write path (`Mutation`) unwrap
//! payloads through [`decode`], so the envelope shape lives in one place.

use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::error::ApiError;

/// `{ data: T, message?: string, statusCode?: number }`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope<T> {
    pub data: T,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
}

/// Body of a failed response. Only `message` is read.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Read a successful response and return only the envelope's `data`.
pub async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let bytes = resp.bytes().await?;
    decode_slice(&bytes)
}

pub fn decode_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    let envelope: ResponseEnvelope<T> = serde_json::from_slice(bytes)?;
    if let Some(ref message) = envelope.message {
        log::debug!(
            "Envelope message: {} (statusCode {:?})",
            message,
            envelope.status_code
        );
    }
    Ok(envelope.data)
}

/// Server-supplied `message` of an error body, if the body is JSON and has one.
pub fn error_message(bytes: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(bytes)
        .ok()
        .and_then(|body| body.message)
        .filter(|m| !m.is_empty())
}
