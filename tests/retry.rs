use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};
use std::time::Duration;

use futures::future::BoxFuture;
use retryvisor::{
    BackoffPolicy, EventKind, Executor, Retry, RetryError, RetryPolicy, Supervisor,
    SupervisorConfig, TaskError, retry,
};
use tokio::{task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;

/// Records every sleep requested by the retry loop.
#[derive(Default)]
struct RecordingExecutor {
    sleeps: std::sync::Mutex<Vec<Duration>>,
}

impl RecordingExecutor {
    fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Executor for RecordingExecutor {
    fn spawn(&self, fut: BoxFuture<'static, ()>) -> JoinHandle<()> {
        tokio::spawn(fut)
    }

    fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()> {
        self.sleeps.lock().unwrap().push(delay);
        Box::pin(tokio::time::sleep(delay))
    }
}

fn recorded(policy: RetryPolicy) -> (Retry, Arc<RecordingExecutor>) {
    let exec = Arc::new(RecordingExecutor::default());
    let retry = Retry::new("op")
        .with_policy(policy)
        .with_executor(exec.clone());
    (retry, exec)
}

#[tokio::test(start_paused = true)]
async fn succeeds_on_kth_invocation() {
    for n in 1..=4u32 {
        for k in 1..=n {
            let (retry, exec) = recorded(RetryPolicy::fixed(n, Duration::from_millis(5)));
            let calls = AtomicU32::new(0);

            let value = retry
                .run(|| async {
                    let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if call < k {
                        Err(TaskError::fail(format!("fail #{call}")))
                    } else {
                        Ok(call * 10)
                    }
                })
                .await
                .expect("succeeds within budget");

            assert_eq!(value, k * 10);
            assert_eq!(calls.load(Ordering::SeqCst), k);
            assert_eq!(exec.sleeps().len() as u32, k - 1);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn always_boom_is_exhausted_after_three_calls_and_two_delays() {
    let (retry, exec) = recorded(RetryPolicy::fixed(3, Duration::from_millis(200)));
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let err = retry
        .run(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<u32, _>(TaskError::fail("boom"))
        })
        .await
        .expect_err("never succeeds");

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(exec.sleeps(), vec![Duration::from_millis(200); 2]);
    assert_eq!(start.elapsed(), Duration::from_millis(400));
    match err {
        RetryError::Exhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert_eq!(last.into_source(), Some(TaskError::fail("boom")));
        }
        other => panic!("expected exhaustion, got {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn free_function_honors_cancellation_between_attempts() {
    let token = CancellationToken::new();
    let policy = RetryPolicy::fixed(3, Duration::from_secs(10));
    let calls = AtomicU32::new(0);

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        canceller.cancel();
    });

    let err = retry(&policy, &token, || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Err::<(), _>("boom")
    })
    .await
    .expect_err("cancelled");

    assert!(err.is_cancelled());
    assert_eq!(calls.load(Ordering::SeqCst), 1, "no second attempt");
}

#[tokio::test(start_paused = true)]
async fn exponential_backoff_grows_and_caps() {
    let policy = RetryPolicy::default()
        .with_max_attempts(5)
        .with_backoff(BackoffPolicy::exponential(
            Duration::from_millis(100),
            Duration::from_millis(300),
        ));
    let (retry, exec) = recorded(policy);

    let _ = retry
        .run(|| async { Err::<(), _>(TaskError::fail("down")) })
        .await;

    assert_eq!(
        exec.sleeps(),
        vec![
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(300),
            Duration::from_millis(300),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn supervised_retry_publishes_lifecycle_events() {
    let cfg = SupervisorConfig {
        retry: RetryPolicy::fixed(2, Duration::from_millis(10)),
        ..SupervisorConfig::default()
    };
    let sup = Supervisor::builder(cfg).build();
    let mut rx = sup.subscribe();

    let _ = sup
        .retry("fetch")
        .run(|| async { Err::<(), _>(TaskError::fail("down")) })
        .await;

    let mut kinds = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        assert_eq!(ev.task.as_deref(), Some("fetch"));
        kinds.push(ev.kind);
    }
    assert_eq!(
        kinds,
        vec![
            EventKind::AttemptStarting,
            EventKind::AttemptFailed,
            EventKind::BackoffScheduled,
            EventKind::AttemptStarting,
            EventKind::AttemptFailed,
            EventKind::RetryExhausted,
        ]
    );
}
