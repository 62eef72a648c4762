//! Expiry Timers
//!
//! One-shot background tasks that delete EXPIRE entries when their lifetime
//! runs out.

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Sleep;
use tracing::{debug, warn};

// == Expiry Timer ==
/// A pending deletion for one entry.
///
/// `id` ties the timer to the entry it was scheduled for, so a firing timer
/// can tell whether it is still the registered one.
#[derive(Debug)]
pub(crate) struct ExpiryTimer {
    pub(crate) id: u64,
    handle: JoinHandle<()>,
}

impl ExpiryTimer {
    /// Aborts the task. A timer that already fired is unaffected.
    pub(crate) fn cancel(self) {
        self.handle.abort();
    }
}

/// Runs `on_fire` once `delay` has elapsed.
///
/// Returns None when called outside a tokio runtime, or inside one built
/// without the time driver; expired entries are then only removed when a
/// read observes them.
pub(crate) fn schedule<F>(id: u64, delay: Duration, on_fire: F) -> Option<ExpiryTimer>
where
    F: FnOnce() + Send + 'static,
{
    let Ok(runtime) = Handle::try_current() else {
        debug!("No tokio runtime, timer {} falls back to lazy expiry", id);
        return None;
    };

    let Some(sleep) = start_sleep(&runtime, delay) else {
        warn!("Tokio runtime has timers disabled, timer {} falls back to lazy expiry", id);
        return None;
    };

    let handle = runtime.spawn(async move {
        sleep.await;
        on_fire();
    });
    Some(ExpiryTimer { id, handle })
}

/// Builds the sleep up front so a runtime without `enable_time` is caught
/// here rather than inside the spawned task.
fn start_sleep(runtime: &Handle, delay: Duration) -> Option<Sleep> {
    let _guard = runtime.enter();
    panic::catch_unwind(AssertUnwindSafe(|| tokio::time::sleep(delay))).ok()
}
