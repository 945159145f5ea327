//! HTTP client with credential header injection.
//!
//! Every authenticated request carries `Authorization: <scheme> <token>` read
//! from the injected [`Session`] at send time.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};

use super::auth::Session;

/// HTTP client wrapper for filejy API communication.
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<Session>,
}

impl ApiClient {
    /// Create a new API client with the given base URL and session.
    pub fn new(base_url: &str, session: Arc<Session>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Session whose credential every request carries.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Join a path relative to the API base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.session.credential().await {
            Some(credential) => builder.header(AUTHORIZATION, credential.as_str()),
            None => builder,
        }
    }

    /// Send an authenticated GET request to a relative API path.
    pub async fn authenticated_get(&self, path: &str) -> Result<Response, reqwest::Error> {
        self.authenticated_get_absolute(&self.url(path)).await
    }

    /// Send an authenticated GET request to an absolute URL (used for downloads).
    pub async fn authenticated_get_absolute(&self, url: &str) -> Result<Response, reqwest::Error> {
        log::debug!("GET {}", url);
        self.authorize(self.client.get(url)).await.send().await
    }

    /// Send an authenticated request whose body, if any, is an already
    /// serialized JSON string. `Content-Type: application/json` is always set.
    pub async fn authenticated_json(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<Response, reqwest::Error> {
        let url = self.url(path);
        log::debug!("{} {} (json)", method, url);

        let mut builder = self
            .client
            .request(method, &url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            builder = builder.body(body);
        }

        self.authorize(builder).await.send().await
    }

    /// Send an authenticated multipart request. No `Content-Type` is set here;
    /// reqwest attaches it together with the boundary.
    pub async fn authenticated_multipart(
        &self,
        method: Method,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<Response, reqwest::Error> {
        let url = self.url(path);
        log::debug!("{} {} (multipart)", method, url);

        let builder = self.client.request(method, &url).multipart(form);
        self.authorize(builder).await.send().await
    }
}
