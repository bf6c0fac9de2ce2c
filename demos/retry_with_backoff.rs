//! # Example: retry_with_backoff
//!
//! Demonstrates how a [`Supervisor`] retries a flaky call according to its
//! [`RetryPolicy`] and [`BackoffPolicy`], and how [`LogWriter`] reports every step.
//!
//! The call fails twice before succeeding; the delay doubles between attempts and
//! equal jitter is applied.
//!
//! ## Flow
//! ```text
//! Retry::run()
//!   ├─► publish(AttemptStarting, attempt=1)
//!   ├─► op() → Err("boom #1")
//!   ├─► publish(AttemptFailed)
//!   ├─► publish(BackoffScheduled{delay≈100ms})
//!   ├─► sleep(delay)
//!   ├─► attempt=2
//!   │     ├─► op() → Err("boom #2")
//!   │     ├─► publish(BackoffScheduled{delay≈200ms})
//!   │     └─► sleep(delay)
//!   └─► attempt=3 → Ok(42) ─► publish(AttemptSucceeded)
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example retry_with_backoff
//! ```

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use retryvisor::{
    BackoffPolicy, JitterPolicy, LogWriter, RetryPolicy, Subscribe, Supervisor,
    SupervisorConfig, TaskError,
};
use tracing_subscriber::EnvFilter;

static CALLS: AtomicU32 = AtomicU32::new(0);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // 1. Backoff: 100ms doubling up to 2s, with equal jitter
    let backoff = BackoffPolicy::exponential(Duration::from_millis(100), Duration::from_secs(2))
        .with_jitter(JitterPolicy::Equal);

    // 2. Configure runtime: 4 attempts, 1s per-attempt timeout
    let cfg = SupervisorConfig {
        retry: RetryPolicy::default()
            .with_max_attempts(4)
            .with_backoff(backoff),
        timeout: Duration::from_secs(1),
        grace: Duration::from_secs(5),
        ..SupervisorConfig::default()
    };

    // 3. Create supervisor with the log subscriber
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let sup = Supervisor::builder(cfg).with_subscribers(subs).build();

    // 4. Run a call that fails 2 times before succeeding
    let value = sup
        .retry("flaky")
        .run(|| async {
            let attempt = CALLS.fetch_add(1, Ordering::Relaxed) + 1;
            println!("[flaky] attempt {attempt}");
            if attempt <= 2 {
                Err(TaskError::fail(format!("boom #{attempt}")))
            } else {
                Ok(42)
            }
        })
        .await?;
    println!("[main] flaky returned {value}");

    // 5. A fatal error is not retried
    let err = sup
        .retry("misconfigured")
        .run_if(
            || async { Err::<(), _>(TaskError::fatal("missing endpoint")) },
            TaskError::is_retryable,
        )
        .await
        .expect_err("fatal errors stop the call");
    println!("[main] misconfigured: {err} ({})", err.as_label());

    // 6. Let the log subscriber drain, then shut down
    tokio::time::sleep(Duration::from_millis(50)).await;
    sup.shutdown().await?;
    println!("[main] done.");
    Ok(())
}
