//! System clipboard access behind a trait so views can be tested without one.
//!
//! On Linux the selection is served by whoever owns the clipboard handle, so
//! a copied text only outlives the write while a handle stays open. Each write
//! there parks a handle on its own thread until another program takes the
//! clipboard or [`LINUX_HOLD`] passes; [`SystemClipboard::settle`] lets the
//! caller wait for those threads before the process exits.

use std::sync::{mpsc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::fetch::lock;

/// How long a Linux write keeps serving the copied text.
pub const LINUX_HOLD: Duration = Duration::from_secs(60);

const SETTLE_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
#[error("Clipboard unavailable: {0}")]
pub struct ClipboardError(String);

impl From<arboard::Error> for ClipboardError {
    fn from(err: arboard::Error) -> Self {
        ClipboardError(err.to_string())
    }
}

/// Somewhere a share link can be put for pasting.
pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// The desktop clipboard. On headless systems every write fails and the
/// caller falls back to printing the text.
#[derive(Default)]
pub struct SystemClipboard {
    holders: Mutex<Vec<JoinHandle<()>>>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a copied text is still being served by this process.
    pub fn holding(&self) -> bool {
        lock(&self.holders).iter().any(|h| !h.is_finished())
    }

    /// Wait until every held text has been taken over or timed out, or
    /// until `cancel` fires. Threads still holding on cancel are left to end
    /// with the process.
    pub async fn settle(&self, cancel: &CancellationToken) {
        while self.holding() {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(SETTLE_POLL) => {}
            }
        }
        lock(&self.holders).clear();
    }

    /// Run `serve` on a dedicated thread. It reports through the sender once
    /// the text is on the clipboard, then keeps it served until it returns.
    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    fn spawn_holder<F>(&self, serve: F) -> Result<(), ClipboardError>
    where
        F: FnOnce(mpsc::Sender<Result<(), ClipboardError>>) + Send + 'static,
    {
        let (ready_tx, ready_rx) = mpsc::channel();
        let holder = std::thread::Builder::new()
            .name("clipboard".to_string())
            .spawn(move || serve(ready_tx))
            .map_err(|e| ClipboardError(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                lock(&self.holders).push(holder);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = holder.join();
                Err(e)
            }
            Err(_) => {
                let _ = holder.join();
                Err(ClipboardError("clipboard thread exited early".to_string()))
            }
        }
    }
}

impl Clipboard for SystemClipboard {
    #[cfg(target_os = "linux")]
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        use arboard::SetExtLinux;

        let text = text.to_owned();
        self.spawn_holder(move |ready| {
            let mut clipboard = match arboard::Clipboard::new() {
                Ok(clipboard) => clipboard,
                Err(e) => {
                    let _ = ready.send(Err(e.into()));
                    return;
                }
            };
            if let Err(e) = clipboard.set_text(text.clone()) {
                let _ = ready.send(Err(e.into()));
                return;
            }
            let _ = ready.send(Ok(()));

            let deadline = std::time::Instant::now() + LINUX_HOLD;
            if let Err(e) = clipboard.set().wait_until(deadline).text(text) {
                log::warn!("Clipboard hold ended early: {}", e);
            }
        })
    }

    #[cfg(not(target_os = "linux"))]
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard = arboard::Clipboard::new()?;
        clipboard.set_text(text.to_owned())?;
        Ok(())
    }
}
