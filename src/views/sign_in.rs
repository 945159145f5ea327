//! Email sign-in. A successful sign-in becomes the session credential.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::ViewError;
use crate::api::types::{SignInRequest, SignInResponse};
use crate::api::ApiClient;
use crate::mutation::{Method, Mutation, RequestBody};

pub const SIGN_IN_ENDPOINT: &str = "/users/sign-in";

const WRONG_CREDENTIALS: &str = "Wrong email or password";

/// Input of the sign-in form.
#[derive(Debug, Clone, Default)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

impl SignInForm {
    /// Reject a blank email or empty password before anything is sent.
    pub fn validate(&self) -> Result<(), ViewError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(ViewError::Validation(
                "Email and password are required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Sign-in screen. Writes the session credential on success.
pub struct SignInView {
    client: Arc<ApiClient>,
    mutation: Mutation<SignInRequest, SignInResponse>,
}

impl SignInView {
    /// Build the view under a child of `parent`.
    pub fn new(client: Arc<ApiClient>, parent: &CancellationToken) -> Self {
        Self {
            mutation: Mutation::new(Arc::clone(&client), parent.child_token()),
            client,
        }
    }

    /// Whether a sign-in request is in flight.
    pub fn loading(&self) -> bool {
        self.mutation.loading()
    }

    /// Sign in and store `"<scheme> <token>"` as the session credential.
    pub async fn submit(&self, form: &SignInForm) -> Result<SignInResponse, ViewError> {
        form.validate()?;

        let request = SignInRequest {
            email: form.email.trim().to_string(),
            password: form.password.clone(),
        };
        let signed_in = self
            .mutation
            .mutate(SIGN_IN_ENDPOINT, Method::Post, Some(RequestBody::Json(request)))
            .await
            .ok_or_else(|| match self.mutation.error() {
                // 401/403 here is a rejected password, not an expired session.
                Some(e) if e.is_unauthenticated() => {
                    ViewError::Validation(WRONG_CREDENTIALS.to_string())
                }
                other => ViewError::from_binding(other),
            })?;

        self.client.session().sign_in(signed_in.credential()).await?;
        log::info!("Signed in as {}", signed_in.username);
        Ok(signed_in)
    }
}
