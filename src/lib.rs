//! # memkv - An In-Process Key-Value Store with Expiry
//!
//! memkv associates string keys with serialized values and an optional
//! expiration deadline. It lives entirely inside one process: no persistence,
//! no network protocol, no replication.
//!
//! ## Features
//!
//! - **Concurrent**: One `RwLock`-guarded map, safe to share across threads
//! - **TTL Support**: Entries can expire after a timeout or at a deadline
//! - **Cancellable**: Every operation takes a [`Context`]
//! - **Codec-Agnostic**: Values are bytes produced by [`Marshal`] and consumed by [`Unmarshal`]
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                               memkv                                     │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────────────────────┐  │
//! │  │   Caller    │───>│   Codec     │───>│           Store             │  │
//! │  │  (Context)  │    │ Marshal /   │    │ RwLock<HashMap<String,      │  │
//! │  │             │    │ Unmarshal   │    │             Entry>>         │  │
//! │  └─────────────┘    └─────────────┘    └──────────────▲──────────────┘  │
//! │                                                       │                 │
//! │                     ┌─────────────────────────────────┴───────────────┐ │
//! │                     │           ExpirySweeper                         │ │
//! │                     │      (Background Tokio Task)                    │ │
//! │                     └─────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use memkv::{Context, Json, Store};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), memkv::StoreError> {
//!     let store = Store::new();
//!     let ctx = Context::background();
//!
//!     store.set(&ctx, "greeting", "hello")?;
//!     store.set_with_timeout(&ctx, "scores", &Json(vec![3, 1, 4]), Duration::from_secs(30))?;
//!
//!     let scores: Option<Json<Vec<u32>>> = store.get_value(&ctx, "scores")?;
//!     assert_eq!(scores.map(Json::into_inner), Some(vec![3, 1, 4]));
//!
//!     let id = store.add(&ctx, "generated")?;
//!     store.delete(&ctx, &id)?;
//!
//!     store.close()
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: The store, its clock, errors and expiry sweeper
//! - [`codec`]: Value serialization traits and adapters
//! - [`context`]: Cancellation signals and deadlines
//!
//! ## Lazy + Active Expiry
//!
//! Entries with a deadline are expired in two ways:
//! 1. **Lazy**: Every read checks the deadline and treats expired entries as missing
//! 2. **Active**: A background task periodically removes expired entries
//!
//! An entry is still valid at exactly its deadline and expired strictly after.

pub mod codec;
pub mod context;
pub mod storage;

// Re-export commonly used types for convenience
#[cfg(feature = "json")]
pub use codec::Json;
pub use codec::{BoxError, Collection, Marshal, Unmarshal};
pub use context::{CancelHandle, Context, Done};
pub use storage::{
    Clock, ExpiryConfig, ManualClock, Store, StoreError, StoreStats, SystemClock,
};

/// Version of memkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
