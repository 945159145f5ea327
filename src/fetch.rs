//! Authenticated read binding.
//!
//! A [`Fetch`] ties an endpoint to the last payload it returned, a loading
//! flag and the last failure. Reloads are not de-duplicated: when several
//! are in flight, whichever response resolves last is what `data` holds.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::api::error::FETCH_FAILED;
use crate::api::{envelope, ApiClient, ApiError};

#[derive(Debug)]
struct FetchState<T> {
    data: Option<T>,
    loading: bool,
    error: Option<ApiError>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

pub(crate) fn lock<S>(mutex: &Mutex<S>) -> MutexGuard<'_, S> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read binding for one endpoint, shared by reference across a view.
pub struct Fetch<T> {
    client: Arc<ApiClient>,
    endpoint: Mutex<String>,
    state: Arc<Mutex<FetchState<T>>>,
    cancel: CancellationToken,
}

impl<T: DeserializeOwned + Clone> Fetch<T> {
    /// Create an idle binding. Nothing is requested until [`Fetch::reload`].
    pub fn new(client: Arc<ApiClient>, endpoint: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            client,
            endpoint: Mutex::new(endpoint.into()),
            state: Arc::new(Mutex::new(FetchState::default())),
            cancel,
        }
    }

    /// Create a binding and perform the first fetch.
    ///
    /// A failed first fetch is left in [`Fetch::error`] for the caller to render.
    pub async fn mount(
        client: Arc<ApiClient>,
        endpoint: impl Into<String>,
        cancel: CancellationToken,
    ) -> Self {
        let binding = Self::new(client, endpoint, cancel);
        if let Err(e) = binding.reload().await {
            log::warn!("Initial fetch of {} failed: {}", binding.endpoint(), e);
        }
        binding
    }

    /// Endpoint the next reload will request.
    pub fn endpoint(&self) -> String {
        lock(&self.endpoint).clone()
    }

    /// Point the binding at another endpoint. Re-fetches only if it changed.
    pub async fn set_endpoint(&self, endpoint: impl Into<String>) -> Result<(), ApiError> {
        let endpoint = endpoint.into();
        {
            let mut current = lock(&self.endpoint);
            if *current == endpoint {
                return Ok(());
            }
            *current = endpoint;
        }
        self.reload().await
    }

    /// Fetch the endpoint again.
    ///
    /// On failure `data` keeps its previous value. `loading` is cleared on
    /// every exit path. Once the binding is cancelled nothing else is written.
    pub async fn reload(&self) -> Result<(), ApiError> {
        let endpoint = self.endpoint();
        {
            let mut state = lock(&self.state);
            state.loading = true;
            state.error = None;
        }
        let state = Arc::clone(&self.state);
        let _loading = scopeguard::guard((), move |_| lock(&state).loading = false);

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ApiError::Cancelled),
            outcome = fetch_payload::<T>(&self.client, &endpoint) => outcome,
        };
        if self.cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        let mut state = lock(&self.state);
        match outcome {
            Ok(data) => {
                state.data = Some(data);
                Ok(())
            }
            Err(err) => {
                log::warn!("Fetch {} failed: {}", endpoint, err);
                state.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Payload of the last successful fetch.
    pub fn data(&self) -> Option<T> {
        lock(&self.state).data.clone()
    }

    /// Whether a reload is in flight.
    pub fn loading(&self) -> bool {
        lock(&self.state).loading
    }

    /// Failure of the last reload; cleared when the next one starts.
    pub fn error(&self) -> Option<ApiError> {
        lock(&self.state).error.clone()
    }
}

/// GET `endpoint` and unwrap the envelope. 401/403 short-circuit before the
/// body is read.
async fn fetch_payload<T: DeserializeOwned>(client: &ApiClient, endpoint: &str) -> Result<T, ApiError> {
    let resp = client.authenticated_get(endpoint).await?;
    let status = resp.status();

    if !status.is_success() {
        if let Some(err) = ApiError::unauthenticated(status) {
            return Err(err);
        }
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: FETCH_FAILED.to_string(),
        });
    }

    envelope::decode(resp).await
}
