#![allow(dead_code)]
use std::{future::Future, time::Duration};

use tracing_subscriber::EnvFilter;

/// Install a log subscriber controlled by `RUST_LOG`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "execreg=info".into()))
        .with_test_writer()
        .try_init();
}

/// Run `future`, failing the test if it takes longer than `secs` seconds.
pub async fn within<F: Future>(secs: u64, future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(secs), future)
        .await
        .expect("test step timed out")
}
