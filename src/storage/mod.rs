//! Storage Module
//!
//! This module provides the core storage functionality for memkv: a
//! thread-safe key-value map with TTL support and a background expiry
//! sweeper.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Store                              │
//! │  ┌───────────────────────────────┐   ┌──────────────────┐   │
//! │  │ RwLock<HashMap<String,Entry>> │◄──│  Clock (now)     │   │
//! │  └───────────────────────────────┘   └──────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │
//!              ┌─────────────┴─────────────┐
//!              │     ExpirySweeper         │
//!              │  (Background Tokio Task)  │
//!              └───────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **RwLock**: Multiple concurrent readers, exclusive writers
//! - **TTL Support**: Entries can carry an absolute deadline
//! - **Lazy Expiry**: Expired entries read as misses
//! - **Active Expiry**: Background sweeper reclaims expired entries
//! - **Pluggable Clock**: Deterministic expiry in tests
//!
//! ## Example
//!
//! ```
//! use memkv::storage::{ExpiryConfig, Store};
//! use memkv::Context;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), memkv::StoreError> {
//! let store = Store::with_config(
//!     ExpiryConfig::default().with_interval(Duration::from_millis(500)),
//! );
//! let ctx = Context::background();
//!
//! store.set(&ctx, "name", "Ariz")?;
//! assert_eq!(store.get_value::<String>(&ctx, "name")?, Some("Ariz".into()));
//!
//! store.set_with_timeout(&ctx, "session", "token123", Duration::from_secs(3600))?;
//! store.delete(&ctx, "name")?;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod engine;
pub mod error;
pub mod expiry;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Store, StoreStats};
pub use error::{Result, StoreError};
pub use expiry::ExpiryConfig;
