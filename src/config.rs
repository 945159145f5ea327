//! Runtime configuration resolved from the environment.
//!
//! Precedence for the API base URL: `--api-url` > `FILEJY_API_URL` >
//! `VITE_API_URL` > `http://localhost:8080`. Empty values are skipped.

use std::path::PathBuf;

use crate::api::auth::DEFAULT_SERVICE_NAME;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_SHARE_DOMAIN: &str = "filejy.kr";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: String,
    /// Prefixed to share paths to form the public link.
    pub share_domain: String,
    pub keychain_service: String,
    pub download_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let first = |keys: &[&str], default: &str| {
            keys.iter()
                .filter_map(|key| lookup(key))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            api_base_url: normalize_url(&first(&["FILEJY_API_URL", "VITE_API_URL"], DEFAULT_API_URL)),
            share_domain: first(&["FILEJY_SHARE_DOMAIN"], DEFAULT_SHARE_DOMAIN),
            keychain_service: first(&["FILEJY_KEYCHAIN_SERVICE"], DEFAULT_SERVICE_NAME),
            download_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    /// Apply a command-line override of the base URL.
    pub fn with_api_url(mut self, api_url: Option<&str>) -> Self {
        if let Some(url) = api_url.map(str::trim).filter(|u| !u.is_empty()) {
            self.api_base_url = normalize_url(url);
        }
        self
    }
}

fn normalize_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
