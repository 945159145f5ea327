//! Authenticated write binding.
//!
//! [`Mutation::mutate`] returns `None` on every failure path. The binding's
//! [`Mutation::error`] is what callers check to tell failures apart.
//! There is no concurrency guard: overlapping calls are allowed and settle
//! in whatever order the server answers.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use reqwest::multipart::Form;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::api::error::MUTATION_FAILED;
use crate::api::{envelope, ApiClient, ApiError};
use crate::fetch::lock;

/// HTTP methods a mutation may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Post,
    Put,
    Patch,
    Delete,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// How a request body is serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    #[default]
    Json,
    MultipartFormData,
}

impl ContentType {
    /// MIME type named by this content type.
    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::MultipartFormData => "multipart/form-data",
        }
    }
}

/// Body of a mutation. The variant picks the serialization.
pub enum RequestBody<Req> {
    /// Serialized to a JSON string, sent with `Content-Type: application/json`.
    Json(Req),
    /// Passed through as-is; the transport sets the boundary header.
    Multipart(Form),
}

impl<Req> RequestBody<Req> {
    pub fn content_type(&self) -> ContentType {
        match self {
            RequestBody::Json(_) => ContentType::Json,
            RequestBody::Multipart(_) => ContentType::MultipartFormData,
        }
    }
}

/// Snapshot of a mutation's last call.
#[derive(Debug, Clone)]
pub struct MutationState<Resp> {
    pub data: Option<Resp>,
    pub loading: bool,
    pub error: Option<ApiError>,
}

impl<Resp> Default for MutationState<Resp> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

/// Payload type for endpoints that answer with an empty or ignored `data`.
pub type NoPayload = Option<serde_json::Value>;

/// Write binding. `Req` is the JSON request type, `Resp` the envelope payload.
pub struct Mutation<Req = (), Resp = NoPayload> {
    client: Arc<ApiClient>,
    state: Arc<Mutex<MutationState<Resp>>>,
    cancel: CancellationToken,
    _request: PhantomData<fn(Req)>,
}

impl<Req, Resp> Mutation<Req, Resp>
where
    Req: Serialize,
    Resp: DeserializeOwned + Clone,
{
    /// Idle binding whose calls stop once `cancel` fires.
    pub fn new(client: Arc<ApiClient>, cancel: CancellationToken) -> Self {
        Self {
            client,
            state: Arc::new(Mutex::new(MutationState::default())),
            cancel,
            _request: PhantomData,
        }
    }

    /// Send `body` to `endpoint` and return the envelope's `data`.
    pub async fn mutate(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<RequestBody<Req>>,
    ) -> Option<Resp> {
        {
            let mut state = lock(&self.state);
            state.loading = true;
            state.error = None;
        }
        let state = Arc::clone(&self.state);
        let _loading = scopeguard::guard((), move |_| lock(&state).loading = false);

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            outcome = send_mutation::<Req, Resp>(&self.client, endpoint, method, body) => outcome,
        };
        if self.cancel.is_cancelled() {
            return None;
        }

        let mut state = lock(&self.state);
        match outcome {
            Ok(data) => {
                state.data = Some(data.clone());
                Some(data)
            }
            Err(err) => {
                log::warn!("{:?} {} failed: {}", method, endpoint, err);
                state.error = Some(err);
                None
            }
        }
    }

    /// Payload of the last successful call.
    pub fn data(&self) -> Option<Resp> {
        lock(&self.state).data.clone()
    }

    pub fn loading(&self) -> bool {
        lock(&self.state).loading
    }

    /// Failure of the last call. `None` after a success or a cancelled call.
    pub fn error(&self) -> Option<ApiError> {
        lock(&self.state).error.clone()
    }
}

async fn send_mutation<Req, Resp>(
    client: &ApiClient,
    endpoint: &str,
    method: Method,
    body: Option<RequestBody<Req>>,
) -> Result<Resp, ApiError>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    let resp = match body {
        Some(RequestBody::Multipart(form)) => {
            client
                .authenticated_multipart(method.into(), endpoint, form)
                .await?
        }
        Some(RequestBody::Json(request)) => {
            let json = serde_json::to_string(&request)?;
            client
                .authenticated_json(method.into(), endpoint, Some(json))
                .await?
        }
        None => client.authenticated_json(method.into(), endpoint, None).await?,
    };

    let status = resp.status();
    if !status.is_success() {
        if let Some(err) = ApiError::unauthenticated(status) {
            return Err(err);
        }
        let bytes = resp.bytes().await?;
        let message = envelope::error_message(&bytes).unwrap_or_else(|| MUTATION_FAILED.to_string());
        return Err(ApiError::Status {
            status: status.as_u16(),
            message,
        });
    }

    envelope::decode(resp).await
}
