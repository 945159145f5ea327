//! Session credential and its persistence.
//!
//! The bearer credential (`"<scheme> <token>"`) lives in a [`Session`] that is
//! handed to the [`super::client::ApiClient`]. Persistence goes through
//! [`CredentialStore`]; in production that is the OS keychain via `keyring`.

use std::sync::Arc;

use keyring::Entry;
use thiserror::Error;
use tokio::sync::RwLock;
use zeroize::Zeroizing;

/// Keychain service name used when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "kr.filejy.cli";

/// Keychain username under which the credential is stored.
const CREDENTIAL_KEY: &str = "access_token";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Keychain operation failed: {0}")]
    OperationFailed(String),
}

impl From<keyring::Error> for CredentialError {
    fn from(err: keyring::Error) -> Self {
        CredentialError::OperationFailed(err.to_string())
    }
}

/// Where the credential survives between runs.
pub trait CredentialStore: Send + Sync {
    /// Returns `None` if nothing was stored (never signed in or signed out).
    fn load(&self) -> Result<Option<String>, CredentialError>;
    fn store(&self, credential: &str) -> Result<(), CredentialError>;
    /// Idempotent.
    fn clear(&self) -> Result<(), CredentialError>;
}

/// OS keychain backed store.
pub struct KeychainStore {
    service: String,
}

impl KeychainStore {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry, CredentialError> {
        Ok(Entry::new(&self.service, CREDENTIAL_KEY)?)
    }
}

impl CredentialStore for KeychainStore {
    fn load(&self) -> Result<Option<String>, CredentialError> {
        match self.entry()?.get_password() {
            Ok(credential) => Ok(Some(credential)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CredentialError::from(e)),
        }
    }

    fn store(&self, credential: &str) -> Result<(), CredentialError> {
        self.entry()?.set_password(credential)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        match self.entry()?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(CredentialError::from(e)),
        }
    }
}

/// Process-local store. Nothing outlives the process.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    slot: std::sync::Mutex<Option<String>>,
}

#[cfg(test)]
impl MemoryStore {
    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.slot().clone())
    }

    fn store(&self, credential: &str) -> Result<(), CredentialError> {
        *self.slot() = Some(credential.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        *self.slot() = None;
        Ok(())
    }
}

/// The signed-in identity every authenticated call reads from.
///
/// Written only by sign-in and sign-out. The in-memory copy is zeroed on drop.
pub struct Session {
    credential: RwLock<Option<Zeroizing<String>>>,
    store: Arc<dyn CredentialStore>,
}

impl Session {
    /// Build a session from whatever the store holds.
    pub fn restore(store: Arc<dyn CredentialStore>) -> Result<Self, CredentialError> {
        let credential = store.load()?.map(Zeroizing::new);
        if credential.is_some() {
            log::debug!("Restored stored credential");
        }
        Ok(Self {
            credential: RwLock::new(credential),
            store,
        })
    }

    /// Signed-out session that persists into `store` on sign-in.
    pub fn signed_out(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            credential: RwLock::new(None),
            store,
        }
    }

    /// Session over a [`MemoryStore`], optionally pre-signed-in.
    #[cfg(test)]
    pub fn in_memory(credential: Option<&str>) -> Self {
        Self {
            credential: RwLock::new(credential.map(|c| Zeroizing::new(c.to_string()))),
            store: Arc::new(MemoryStore::default()),
        }
    }

    /// Current credential, if signed in.
    pub async fn credential(&self) -> Option<Zeroizing<String>> {
        self.credential.read().await.clone()
    }

    pub async fn is_signed_in(&self) -> bool {
        self.credential.read().await.is_some()
    }

    /// Record a fresh credential and persist it.
    pub async fn sign_in(&self, credential: String) -> Result<(), CredentialError> {
        self.store.store(&credential)?;
        *self.credential.write().await = Some(Zeroizing::new(credential));
        Ok(())
    }

    /// Drop the credential from memory and from the store.
    pub async fn sign_out(&self) -> Result<(), CredentialError> {
        *self.credential.write().await = None;
        self.store.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_restore_reads_store() {
        let store = Arc::new(MemoryStore::default());
        store.store("Bearer persisted").unwrap();

        let session = Session::restore(store).unwrap();
        assert_eq!(
            session.credential().await.as_deref().map(String::as_str),
            Some("Bearer persisted")
        );
    }

    #[tokio::test]
    async fn test_sign_in_persists_and_sign_out_clears() {
        let store = Arc::new(MemoryStore::default());
        let session = Session::restore(store.clone()).unwrap();
        assert!(!session.is_signed_in().await);

        session.sign_in("Bearer t0k".to_string()).await.unwrap();
        assert!(session.is_signed_in().await);
        assert_eq!(store.load().unwrap().as_deref(), Some("Bearer t0k"));

        session.sign_out().await.unwrap();
        assert!(!session.is_signed_in().await);
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_memory_store_clear_is_idempotent() {
        let store = MemoryStore::default();
        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
