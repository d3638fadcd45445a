//! Session cache demo
//!
//! Stores JSON sessions with a short TTL, shows lazy expiry and the
//! background sweeper reclaiming them, then closes the store.
//!
//! ```text
//! RUST_LOG=memkv=debug cargo run --example session_cache
//! ```

use memkv::{Context, ExpiryConfig, Json, Store, StoreError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Session {
    user: String,
    roles: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("memkv v{}", memkv::VERSION);

    let store = Arc::new(Store::with_config(
        ExpiryConfig::default().with_interval(Duration::from_millis(200)),
    ));
    let ctx = Context::background();

    // Writers on separate threads, one session each
    let writers: Vec<_> = ["ariz", "noor", "tomas"]
        .into_iter()
        .map(|user| {
            let store = Arc::clone(&store);
            tokio::task::spawn_blocking(move || -> Result<String, StoreError> {
                let session = Json(Session {
                    user: user.to_string(),
                    roles: vec!["reader".into()],
                });
                store.add(&Context::background(), &session)
            })
        })
        .collect();

    let mut ids = Vec::new();
    for writer in writers {
        ids.push(writer.await??);
    }
    info!(sessions = ids.len(), "Sessions created");

    // Only sessions are stored so far; get_all decodes every live entry.
    let mut sessions: Vec<Json<Session>> = Vec::new();
    store.get_all(&ctx, &mut sessions)?;
    for Json(session) in &sessions {
        info!(user = %session.user, roles = ?session.roles, "Live session");
    }

    store.set_with_timeout(&ctx, "otp", "493021", Duration::from_millis(100))?;

    tokio::time::sleep(Duration::from_millis(150)).await;
    match store.get_value::<String>(&ctx, "otp")? {
        Some(code) => warn!(%code, "One-time code outlived its TTL"),
        None => info!("One-time code expired"),
    }

    if let Err(err) = store.delete(&ctx, "otp") {
        info!(%err, "Delete after expiry");
    }

    // Give the sweeper a full interval
    tokio::time::sleep(Duration::from_millis(300)).await;
    info!(stats = ?store.stats(), "Store statistics");

    store.close()?;
    Ok(())
}
