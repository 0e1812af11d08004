//! Shared stop signals for one solver run.
//!
//! Two one-way latches: `found` (some worker saw the winning word) and `quit`
//! (the strategist confirmed the answer; everyone wraps up). Neither is ever
//! reset, and `found` is always set before `quit`.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use cemantix_common::SourceId;

#[derive(Debug)]
struct Latches {
    found: watch::Sender<Option<SourceId>>,
    quit: watch::Sender<bool>,
}

#[derive(Debug, Clone)]
pub struct Coordinator {
    inner: Arc<Latches>,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    pub fn new() -> Self {
        let (found, _) = watch::channel(None);
        let (quit, _) = watch::channel(false);
        Self {
            inner: Arc::new(Latches { found, quit }),
        }
    }

    /// Latch `found` for `source`. Only the first caller gets `true`.
    pub fn signal_found(&self, source: SourceId) -> bool {
        let first = self.inner.found.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(source);
            true
        });
        if first {
            info!(source = %source, "Winning word found");
        }
        first
    }

    /// Latch `quit`. Sets `found` first (as the strategist) if nobody has.
    pub fn signal_quit(&self) {
        self.signal_found(SourceId::STRATEGIST);
        let first = self.inner.quit.send_if_modified(|q| !std::mem::replace(q, true));
        if first {
            info!("Quit signalled");
        }
    }

    pub fn is_found(&self) -> bool {
        self.inner.found.borrow().is_some()
    }

    pub fn is_quit(&self) -> bool {
        *self.inner.quit.borrow()
    }

    /// The worker whose signal set `found`.
    pub fn found_by(&self) -> Option<SourceId> {
        *self.inner.found.borrow()
    }

    /// Resolve once `quit` is set.
    pub async fn wait_quit(&self) {
        let mut rx = self.inner.quit.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|q| *q).await;
    }
}
