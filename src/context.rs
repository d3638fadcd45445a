//! Cancellation Contexts
//!
//! Every store operation takes a [`Context`]. A context can carry a cancel
//! signal, a deadline, both, or neither ([`Context::background`]).
//!
//! ```text
//!   Context::with_cancel() ──> (Context, CancelHandle)
//!          │                            │
//!          │ with_timeout / with_deadline│ cancel() or drop
//!          ▼                            ▼
//!   derived Context  ◄──── shares the same watch channel
//! ```
//!
//! The signal is a `tokio::sync::watch` channel, the same primitive the
//! sweeper has always used for shutdown. Dropping the [`CancelHandle`] counts
//! as cancellation, so a context never outlives the code that can cancel it.

use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;

/// Why a context is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Done {
    /// The context's [`CancelHandle`] was triggered or dropped.
    #[error("context cancelled")]
    Cancelled,

    /// The context's deadline has passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// A cancellation signal and optional deadline passed to store operations.
///
/// Contexts are cheap to clone. Derived contexts keep the parent's signal and
/// take the earlier of the two deadlines.
///
/// # Example
///
/// ```
/// use memkv::Context;
/// use std::time::Duration;
///
/// let (ctx, handle) = Context::with_cancel();
/// let bounded = ctx.with_timeout(Duration::from_secs(5));
/// assert!(bounded.check().is_ok());
///
/// handle.cancel();
/// assert!(bounded.is_done());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    signal: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never done.
    pub fn background() -> Self {
        Self::default()
    }

    /// Creates a cancellable root context and the handle that cancels it.
    pub fn with_cancel() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            signal: Some(rx),
            deadline: None,
        };
        (ctx, CancelHandle { tx })
    }

    /// Derives a context that is also done once `timeout` has elapsed.
    ///
    /// A timeout too large to represent leaves the deadline unchanged.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.clone(),
        }
    }

    /// Derives a context that is also done at `deadline`.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        };
        Self {
            signal: self.signal.clone(),
            deadline: Some(deadline),
        }
    }

    /// The instant at which this context expires, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns why the context is done, or `None` while it is still live.
    ///
    /// Cancellation takes precedence over an elapsed deadline.
    pub fn err(&self) -> Option<Done> {
        if let Some(rx) = &self.signal {
            // A closed channel means the handle was dropped.
            if *rx.borrow() || rx.has_changed().is_err() {
                return Some(Done::Cancelled);
            }
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Done::DeadlineExceeded),
            _ => None,
        }
    }

    /// Returns `true` once the context is cancelled or past its deadline.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Fails with the cause if the context is done.
    #[inline]
    pub fn check(&self) -> Result<(), Done> {
        match self.err() {
            Some(done) => Err(done),
            None => Ok(()),
        }
    }

    /// Waits until the context is done and returns the cause.
    ///
    /// Never resolves for [`Context::background`].
    pub async fn done(&self) -> Done {
        if let Some(done) = self.err() {
            return done;
        }

        let signal = async {
            match &self.signal {
                Some(rx) => {
                    let mut rx = rx.clone();
                    // Err means the sender is gone, which also cancels.
                    let _ = rx.wait_for(|cancelled| *cancelled).await;
                }
                None => std::future::pending::<()>().await,
            }
        };

        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at.into()).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = signal => Done::Cancelled,
            _ = deadline => Done::DeadlineExceeded,
        }
    }
}

/// Cancels the [`Context`] it was created with, and every context derived
/// from it.
///
/// Dropping the handle cancels as well.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Signals cancellation.
    ///
    /// Returns `true` only for the call that actually cancelled; repeated
    /// calls are no-ops returning `false`.
    pub fn cancel(&self) -> bool {
        self.tx.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        })
    }

    /// Returns `true` if [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}
