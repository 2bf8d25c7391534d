//! # Debounce
//!
//! Trailing debounce for edit-driven remote checks. Each edit calls
//! [`Debouncer::schedule`]; the returned ticket's [`DebounceTicket::settled`]
//! resolves after the quiet period and reports whether it is still the most
//! recent schedule. Only the last ticket of a burst fires.
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use bridge_core::debounce::Debouncer;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let debouncer = Debouncer::new(Duration::from_millis(10));
//! let first = debouncer.schedule();
//! let second = debouncer.schedule();
//! assert!(!first.settled().await);
//! assert!(second.settled().await);
//! # });
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    latest: Arc<AtomicU64>,
}

/// One scheduled firing
#[derive(Debug)]
pub struct DebounceTicket {
    seq: u64,
    deadline: Instant,
    latest: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Start a new quiet period, superseding every earlier ticket
    pub fn schedule(&self) -> DebounceTicket {
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        DebounceTicket {
            seq,
            deadline: Instant::now() + self.delay,
            latest: Arc::clone(&self.latest),
        }
    }

    /// Supersede every outstanding ticket without starting a new one
    pub fn cancel(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }
}

impl DebounceTicket {
    /// True while no later schedule or cancel has happened
    pub fn is_latest(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.seq
    }

    /// Wait until the quiet period that started at scheduling time has
    /// passed; true if this ticket should fire
    pub async fn settled(self) -> bool {
        tokio::time::sleep_until(self.deadline).await;
        self.is_latest()
    }
}
