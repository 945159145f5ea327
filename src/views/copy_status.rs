//! Per-row "link copied" flags.
//!
//! A flag set at `T` reads true for `[T, T + COPIED_FOR)` and false afterwards.
//! Reset timers run as tasks scoped to the owning view's cancellation token.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::fetch::lock;

/// How long a row shows "copied".
pub const COPIED_FOR: Duration = Duration::from_millis(2000);

pub struct CopyStatus {
    /// file id -> when the flag was set
    flags: Arc<Mutex<HashMap<String, Instant>>>,
    cancel: CancellationToken,
}

impl CopyStatus {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            flags: Arc::new(Mutex::new(HashMap::new())),
            cancel,
        }
    }

    /// Set the flag for `file_id`. Must be called within a tokio runtime.
    pub fn mark_copied(&self, file_id: &str) {
        let set_at = Instant::now();
        lock(&self.flags).insert(file_id.to_string(), set_at);

        let flags = Arc::clone(&self.flags);
        let cancel = self.cancel.clone();
        let file_id = file_id.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep_until(set_at + COPIED_FOR) => {
                    let mut flags = lock(&flags);
                    // A newer copy of the same row owns the entry now.
                    if flags.get(&file_id) == Some(&set_at) {
                        flags.remove(&file_id);
                    }
                }
            }
        });
    }

    /// True until exactly [`COPIED_FOR`] after the last copy of `file_id`.
    pub fn is_copied(&self, file_id: &str) -> bool {
        lock(&self.flags)
            .get(file_id)
            .is_some_and(|set_at| Instant::now() < *set_at + COPIED_FOR)
    }
}
