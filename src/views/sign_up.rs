//! Account registration.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::ViewError;
use crate::api::types::{SignUpRequest, SignUpResponse};
use crate::api::ApiClient;
use crate::mutation::{Method, Mutation, RequestBody};

pub const SIGN_UP_ENDPOINT: &str = "/users";

const FIELDS_REQUIRED: &str = "All fields are required";
const PASSWORD_MISMATCH: &str = "Passwords do not match";

#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub email: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignUpForm {
    /// All fields filled and both passwords equal.
    pub fn validate(&self) -> Result<(), ViewError> {
        if self.email.trim().is_empty() || self.username.trim().is_empty() || self.password.is_empty() {
            return Err(ViewError::Validation(FIELDS_REQUIRED.to_string()));
        }
        if self.password != self.confirm_password {
            return Err(ViewError::Validation(PASSWORD_MISMATCH.to_string()));
        }
        Ok(())
    }
}

/// Registration screen.
pub struct SignUpView {
    mutation: Mutation<SignUpRequest, SignUpResponse>,
}

impl SignUpView {
    pub fn new(client: Arc<ApiClient>, parent: &CancellationToken) -> Self {
        Self {
            mutation: Mutation::new(client, parent.child_token()),
        }
    }

    pub fn loading(&self) -> bool {
        self.mutation.loading()
    }

    /// Validate locally, then register. Returns the created username.
    pub async fn submit(&self, form: &SignUpForm) -> Result<String, ViewError> {
        form.validate()?;

        let request = SignUpRequest {
            email: form.email.trim().to_string(),
            username: form.username.trim().to_string(),
            password: form.password.clone(),
        };
        let created = self
            .mutation
            .mutate(SIGN_UP_ENDPOINT, Method::Post, Some(RequestBody::Json(request)))
            .await
            .ok_or_else(|| ViewError::from_binding(self.mutation.error()))?;

        log::info!("Registered {}", created.user.username);
        Ok(created.user.username)
    }
}
