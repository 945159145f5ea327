//! Client library for the filejy personal cloud storage.
//!
//! `fetch` and `mutation` are the read and write bindings over the backend
//! API, `download` saves files, and `views` holds the screens the CLI drives.

pub mod api;
pub mod clipboard;
pub mod config;
pub mod download;
pub mod fetch;
pub mod mutation;
pub mod render;
pub mod views;
