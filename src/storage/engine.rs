//! Thread-Safe Store with Expiry Support
//!
//! This module implements the key-value store at the heart of memkv: one
//! `HashMap` of serialized entries behind one `RwLock`, with an optional
//! deadline per entry.
//!
//! ## Design Decisions
//!
//! 1. **Single RwLock**: Many concurrent readers, exclusive writers. No per-key locking.
//! 2. **Lazy + Active Expiry**: Reads hide expired entries; the sweeper removes them.
//! 3. **Opaque Payloads**: Values are encoded before the write lock and decoded
//!    after the read lock is released. `Bytes` makes the copy-out a refcount bump.
//! 4. **Inclusive Deadlines**: An entry is still valid at exactly its deadline.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Store                              │
//! │   get / get_all / contains / time_to_live   (read lock)     │
//! │   set / add / insert / delete / sweep       (write lock)    │
//! │  ┌───────────────────────────────────────────────────────┐  │
//! │  │         RwLock<HashMap<String, Entry>>                │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! └───────────────────────────▲─────────────────────────────────┘
//!                             │ write lock, once per interval
//!                      ┌──────┴───────┐
//!                      │ExpirySweeper │
//!                      └──────────────┘
//! ```
//!
//! Lock acquisition itself is not cancellable. Mutations re-check the context
//! right after acquiring the write lock, but a caller can still wait on a
//! contended lock after its context is done.

use crate::codec::{Collection, Marshal, Unmarshal};
use crate::context::Context;
use crate::storage::clock::{Clock, SystemClock};
use crate::storage::error::{Result, StoreError};
use crate::storage::expiry::{ExpiryConfig, ExpirySweeper};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing::trace;
use uuid::Uuid;

/// A stored payload with optional expiry time.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    /// The serialized value
    payload: Bytes,
    /// When this entry expires (None = never expires)
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(payload: Bytes, expires_at: Option<Instant>) -> Self {
        Self {
            payload,
            expires_at,
        }
    }

    /// Checks if this entry is still valid at `now`.
    ///
    /// Valid up to and including the deadline itself.
    #[inline]
    fn is_valid_at(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| deadline >= now)
    }
}

/// State shared between the [`Store`] facade and its sweeper task.
pub(crate) struct StoreInner {
    data: RwLock<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,

    get_count: AtomicU64,
    hit_count: AtomicU64,
    set_count: AtomicU64,
    del_count: AtomicU64,
    sweep_count: AtomicU64,
    reclaimed_count: AtomicU64,
}

impl StoreInner {
    pub(crate) fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            clock,
            get_count: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            sweep_count: AtomicU64::new(0),
            reclaimed_count: AtomicU64::new(0),
        }
    }

    // Every mutation is a whole-entry insert or remove, so a poisoned map is
    // still consistent.
    #[inline]
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copies out the payload for `key` if it is present and valid.
    fn lookup(&self, key: &str) -> Option<Bytes> {
        let data = self.read();
        let now = self.clock.now();
        data.get(key)
            .filter(|entry| entry.is_valid_at(now))
            .map(|entry| entry.payload.clone())
    }

    /// Removes entries that are expired as of the start of the run.
    ///
    /// Stops removing as soon as `ctx` is done; whatever is left waits for
    /// the next run. Returns the number of entries removed.
    pub(crate) fn sweep(&self, ctx: &Context) -> u64 {
        self.sweep_count.fetch_add(1, Ordering::Relaxed);

        let mut data = self.write();
        let now = self.clock.now();
        let before = data.len();
        let mut aborted = false;

        data.retain(|_, entry| {
            if aborted {
                return true;
            }
            if ctx.is_done() {
                aborted = true;
                return true;
            }
            entry.is_valid_at(now)
        });

        let reclaimed = (before - data.len()) as u64;
        drop(data);

        if aborted {
            trace!(reclaimed, "Sweep budget exhausted, deferring remaining entries");
        }
        self.reclaimed_count.fetch_add(reclaimed, Ordering::Relaxed);
        reclaimed
    }

    #[cfg(test)]
    pub(crate) fn is_resident(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }
}

/// An in-process key-value store with per-entry expiry.
///
/// Values go in and out through the [`Marshal`] and [`Unmarshal`] traits; the
/// store itself only ever holds bytes. Every store runs its own background
/// expiry sweeper, started on construction and stopped by
/// [`close`](Store::close) or on drop.
///
/// # Thread Safety
///
/// Wrap the store in an `Arc` to share it. All operations are thread-safe.
///
/// # Example
///
/// ```
/// use memkv::{Context, Store};
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), memkv::StoreError> {
/// let store = Store::new();
/// let ctx = Context::background();
///
/// store.set(&ctx, "name", "Ariz")?;
///
/// let mut name = String::new();
/// assert!(store.get(&ctx, "name", &mut name)?);
/// assert_eq!(name, "Ariz");
///
/// store.set_with_timeout(&ctx, "session", "abc123", Duration::from_secs(60))?;
///
/// store.close()?;
/// # Ok(())
/// # }
/// ```
pub struct Store {
    inner: Arc<StoreInner>,
    sweeper: ExpirySweeper,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("clock", &self.inner.clock)
            .field("closed", &self.sweeper.is_stopped())
            .field("get_count", &self.inner.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.inner.set_count.load(Ordering::Relaxed))
            .finish()
    }
}

// No Default: construction spawns the sweeper task.
#[allow(clippy::new_without_default)]
impl Store {
    /// Creates a store with the default sweep schedule (every second, 1ms budget).
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime, which the sweeper task
    /// needs to be spawned on. Use [`try_new`](Store::try_new) to get an
    /// error instead.
    pub fn new() -> Self {
        Self::with_config(ExpiryConfig::default())
    }

    /// Creates a store with a custom sweep schedule.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn with_config(config: ExpiryConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a store that takes "now" from `clock`, for both reads and sweeps.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn with_clock(config: ExpiryConfig, clock: Arc<dyn Clock>) -> Self {
        Self::spawn(&Handle::current(), config, clock)
    }

    /// Like [`new`](Store::new), but fails with [`StoreError::NoRuntime`]
    /// instead of panicking when no Tokio runtime is available.
    pub fn try_new() -> Result<Self> {
        Self::try_with_clock(ExpiryConfig::default(), Arc::new(SystemClock))
    }

    /// Like [`with_clock`](Store::with_clock), but fails with
    /// [`StoreError::NoRuntime`] outside of a Tokio runtime.
    pub fn try_with_clock(config: ExpiryConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| StoreError::NoRuntime)?;
        Ok(Self::spawn(&runtime, config, clock))
    }

    fn spawn(runtime: &Handle, config: ExpiryConfig, clock: Arc<dyn Clock>) -> Self {
        let inner = Arc::new(StoreInner::new(clock));
        let sweeper = ExpirySweeper::start(runtime, Arc::clone(&inner), config);
        Self { inner, sweeper }
    }

    /// Decodes the value for `key` into `value`.
    ///
    /// Returns `Ok(false)` if the key doesn't exist or has expired; `value` is
    /// left untouched. A [`StoreError::Decode`] means the key was found but
    /// its payload could not be decoded.
    pub fn get<V>(&self, ctx: &Context, key: &str, value: &mut V) -> Result<bool>
    where
        V: Unmarshal + ?Sized,
    {
        ctx.check()?;
        self.inner.get_count.fetch_add(1, Ordering::Relaxed);

        let Some(payload) = self.inner.lookup(key) else {
            return Ok(false);
        };
        self.inner.hit_count.fetch_add(1, Ordering::Relaxed);

        value.unmarshal(&payload).map_err(StoreError::Decode)?;
        Ok(true)
    }

    /// Like [`get`](Store::get), but decodes into a fresh `V`.
    pub fn get_value<V>(&self, ctx: &Context, key: &str) -> Result<Option<V>>
    where
        V: Unmarshal + Default,
    {
        let mut value = V::default();
        Ok(self.get(ctx, key, &mut value)?.then_some(value))
    }

    /// Decodes every live entry into a fresh slot of `items`.
    ///
    /// Expired entries are skipped. Stops at the first decode error; items
    /// already added stay in the collection.
    pub fn get_all<C>(&self, ctx: &Context, items: &mut C) -> Result<()>
    where
        C: Collection + ?Sized,
    {
        ctx.check()?;

        let payloads: Vec<Bytes> = {
            let data = self.inner.read();
            let now = self.inner.clock.now();
            data.values()
                .filter(|entry| entry.is_valid_at(now))
                .map(|entry| entry.payload.clone())
                .collect()
        };

        for payload in payloads {
            items
                .new_item()
                .unmarshal(&payload)
                .map_err(StoreError::Decode)?;
        }
        Ok(())
    }

    /// Sets `key` to `value` without expiry.
    ///
    /// Overwrites any existing entry, including its deadline.
    pub fn set<V>(&self, ctx: &Context, key: impl Into<String>, value: &V) -> Result<()>
    where
        V: Marshal + ?Sized,
    {
        self.put(ctx, key.into(), value, None)
    }

    /// Sets `key` to `value`, expiring `timeout` from now.
    ///
    /// The lifespan starts at the call, not when the lock is acquired. A
    /// timeout too large to represent never expires.
    pub fn set_with_timeout<V>(
        &self,
        ctx: &Context,
        key: impl Into<String>,
        value: &V,
        timeout: Duration,
    ) -> Result<()>
    where
        V: Marshal + ?Sized,
    {
        let deadline = self.inner.clock.now().checked_add(timeout);
        self.put(ctx, key.into(), value, deadline)
    }

    /// Sets `key` to `value`, expiring after `deadline`.
    pub fn set_with_deadline<V>(
        &self,
        ctx: &Context,
        key: impl Into<String>,
        value: &V,
        deadline: Instant,
    ) -> Result<()>
    where
        V: Marshal + ?Sized,
    {
        self.put(ctx, key.into(), value, Some(deadline))
    }

    fn put<V>(&self, ctx: &Context, key: String, value: &V, expires_at: Option<Instant>) -> Result<()>
    where
        V: Marshal + ?Sized,
    {
        ctx.check()?;
        let payload = value.marshal().map_err(StoreError::Encode)?;
        ctx.check()?;

        let mut data = self.inner.write();
        ctx.check()?;

        data.insert(key, Entry::new(payload, expires_at));
        self.inner.set_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Stores `value` under a freshly generated UUIDv4 key and returns the key.
    ///
    /// Fails with [`StoreError::KeyExists`] on the (astronomically unlikely)
    /// collision with a live entry.
    pub fn add<V>(&self, ctx: &Context, value: &V) -> Result<String>
    where
        V: Marshal + ?Sized,
    {
        let key = Uuid::new_v4().to_string();
        self.insert(ctx, key.clone(), value)?;
        Ok(key)
    }

    /// Stores `value` under `key` only if no live entry holds it.
    ///
    /// An expired entry still resident under `key` counts as absent and is
    /// replaced. Fails with [`StoreError::KeyExists`] otherwise, leaving the
    /// map unchanged.
    pub fn insert<V>(&self, ctx: &Context, key: impl Into<String>, value: &V) -> Result<()>
    where
        V: Marshal + ?Sized,
    {
        ctx.check()?;
        let payload = value.marshal().map_err(StoreError::Encode)?;
        let key = key.into();
        ctx.check()?;

        let mut data = self.inner.write();
        ctx.check()?;

        let now = self.inner.clock.now();
        if data.get(&key).is_some_and(|entry| entry.is_valid_at(now)) {
            return Err(StoreError::KeyExists);
        }

        data.insert(key, Entry::new(payload, None));
        self.inner.set_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Deletes `key`.
    ///
    /// Fails with [`StoreError::NoSuchKey`] if the key doesn't exist or has
    /// already expired. An expired entry is still removed from the map.
    ///
    /// This is a logical delete, not a physical one: whether an expired entry
    /// was still resident (the sweeper may not have reached it yet) never
    /// changes the result.
    pub fn delete(&self, ctx: &Context, key: &str) -> Result<()> {
        ctx.check()?;

        let mut data = self.inner.write();
        ctx.check()?;

        let now = self.inner.clock.now();
        match data.remove(key) {
            Some(entry) if entry.is_valid_at(now) => {
                self.inner.del_count.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            _ => Err(StoreError::NoSuchKey),
        }
    }

    /// Checks if `key` exists and has not expired.
    pub fn contains(&self, ctx: &Context, key: &str) -> Result<bool> {
        ctx.check()?;

        let data = self.inner.read();
        let now = self.inner.clock.now();
        Ok(data.get(key).is_some_and(|entry| entry.is_valid_at(now)))
    }

    /// Returns the remaining lifetime of `key`.
    ///
    /// `Ok(None)` means the entry never expires. Fails with
    /// [`StoreError::NoSuchKey`] if the key doesn't exist or has expired.
    pub fn time_to_live(&self, ctx: &Context, key: &str) -> Result<Option<Duration>> {
        ctx.check()?;

        let data = self.inner.read();
        let now = self.inner.clock.now();
        match data.get(key) {
            Some(entry) if entry.is_valid_at(now) => Ok(entry
                .expires_at
                .map(|deadline| deadline.saturating_duration_since(now))),
            _ => Err(StoreError::NoSuchKey),
        }
    }

    /// Runs one reclamation pass now, the same pass the sweeper runs.
    ///
    /// The pass stops early once `ctx` is done. Returns the number of expired
    /// entries removed.
    pub fn sweep(&self, ctx: &Context) -> u64 {
        self.inner.sweep(ctx)
    }

    /// Stops the background sweeper.
    ///
    /// Does not wait for the task to exit. Calling it again is a no-op. The
    /// store stays usable; expired entries are then only hidden on read, not
    /// reclaimed, unless [`sweep`](Store::sweep) is called by hand.
    pub fn close(&self) -> Result<()> {
        self.sweeper.stop();
        Ok(())
    }

    /// Returns `true` once [`close`](Store::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.sweeper.is_stopped()
    }

    /// Returns operation statistics.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            get_ops: self.inner.get_count.load(Ordering::Relaxed),
            hits: self.inner.hit_count.load(Ordering::Relaxed),
            set_ops: self.inner.set_count.load(Ordering::Relaxed),
            del_ops: self.inner.del_count.load(Ordering::Relaxed),
            sweeps: self.inner.sweep_count.load(Ordering::Relaxed),
            reclaimed: self.inner.reclaimed_count.load(Ordering::Relaxed),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_resident(&self, key: &str) -> bool {
        self.inner.is_resident(key)
    }
}

/// Store statistics.
///
/// Counters use relaxed ordering and are approximate under concurrency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Total GET operations
    pub get_ops: u64,
    /// GET operations that found a live entry
    pub hits: u64,
    /// Successful SET/ADD/INSERT operations
    pub set_ops: u64,
    /// Successful DELETE operations
    pub del_ops: u64,
    /// Sweep runs, background and manual
    pub sweeps: u64,
    /// Expired entries removed by sweeps
    pub reclaimed: u64,
}
