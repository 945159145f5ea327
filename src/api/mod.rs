//! API access layer for the filejy backend.
//!
//! Provides the HTTP client with credential injection, the session and its
//! keychain persistence, the shared response envelope, and the request and
//! response types of the backend API.

pub mod auth;
pub mod client;
pub mod envelope;
pub mod error;
pub mod types;

pub use client::ApiClient;
pub use error::ApiError;
