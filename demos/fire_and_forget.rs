//! # Example: fire_and_forget
//!
//! Starts background work with [`Supervisor::supervise_detached`] and routes failures
//! to an observer callback instead of the caller.
//!
//! ## Flow
//! ```text
//! main ──► supervise_detached("audit", op, on_error) ──► returns at once
//!                      │
//!                      └─► (background) op() → Err("sink down") ─► on_error(Failed)
//! main ──► supervise_detached("heartbeat", loop) ──► runs until shutdown
//! main ──► shutdown() ──► heartbeat cancelled (observer not called)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example fire_and_forget
//! ```

use std::{sync::Arc, time::Duration};

use retryvisor::{
    DetachedFailure, LogWriter, Subscribe, Supervisor, SupervisorConfig, TaskError,
};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // 1. At most 2 detached tasks run at once, 2s shutdown grace
    let cfg = SupervisorConfig {
        max_detached: 2,
        grace: Duration::from_secs(2),
        ..SupervisorConfig::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let sup = Supervisor::builder(cfg).with_subscribers(subs).build();

    // 2. Failures are forwarded to a channel
    let (fail_tx, mut fail_rx) = mpsc::unbounded_channel::<String>();

    let tx = fail_tx.clone();
    sup.supervise_detached(
        "audit",
        async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Err::<(), _>(TaskError::fail("sink down"))
        },
        Some(Box::new(move |f: DetachedFailure<TaskError>| {
            let _ = tx.send(f.to_string());
        })),
    );

    // 3. A long-running task; it is cancelled on shutdown, which is not a failure
    let tx = fail_tx;
    sup.supervise_detached(
        "heartbeat",
        async {
            for tick in 1u64.. {
                println!("[heartbeat] tick {tick}");
                tokio::time::sleep(Duration::from_millis(150)).await;
            }
            Ok::<(), TaskError>(())
        },
        Some(Box::new(move |f: DetachedFailure<TaskError>| {
            let _ = tx.send(f.to_string());
        })),
    );
    println!("[main] spawned {} detached task(s)", sup.detached_count());

    // 4. The caller keeps going; the failure shows up on the channel
    if let Some(msg) = fail_rx.recv().await {
        println!("[main] observer: {msg}");
    }

    // 5. Shut down: heartbeat is cancelled within grace
    sup.shutdown().await?;
    println!("[main] done.");
    Ok(())
}
