use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use organizer_core::services::retry::{RetryPolicy, RetryingOracle};
use organizer_core::{
    CancellationToken, LabelingOracle, OracleError, OracleErrorKind, OracleRequest,
};

fn request() -> OracleRequest {
    OracleRequest {
        file_name: "a.txt".into(),
        context: "name: a.txt\n".into(),
        labels: "Documents, Other".into(),
        hierarchical: false,
    }
}

/// Fails with the given errors in order, then answers "Documents".
fn scripted(
    errors: Vec<OracleError>,
    calls: Arc<AtomicUsize>,
) -> impl Fn(&OracleRequest) -> Result<String, OracleError> + Send + Sync {
    let errors = Mutex::new(errors.into_iter());
    move |_: &OracleRequest| {
        calls.fetch_add(1, Ordering::SeqCst);
        match errors.lock().unwrap().next() {
            Some(err) => Err(err),
            None => Ok("Documents".to_string()),
        }
    }
}

fn recording_sleeper() -> (Arc<Mutex<Vec<Duration>>>, impl Fn(Duration) + Send + Sync + 'static) {
    let waits = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&waits);
    (waits, move |d: Duration| sink.lock().unwrap().push(d))
}

#[test]
fn transient_errors_are_retried_with_exponential_backoff() {
    let calls = Arc::new(AtomicUsize::new(0));
    let inner = scripted(
        vec![OracleError::network("reset"), OracleError::unknown("500")],
        Arc::clone(&calls),
    );
    let (waits, sleeper) = recording_sleeper();
    let oracle = RetryingOracle::new(inner, RetryPolicy::default()).with_sleeper(sleeper);

    assert_eq!(oracle.request(&request()).unwrap(), "Documents");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(*waits.lock().unwrap(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
}

#[test]
fn gives_up_after_configured_retries() {
    let calls = Arc::new(AtomicUsize::new(0));
    let inner = scripted(vec![OracleError::network("down"); 5], Arc::clone(&calls));
    let oracle = RetryingOracle::new(inner, RetryPolicy::immediate(2)).with_sleeper(|_| {});

    let err = oracle.request(&request()).unwrap_err();
    assert_eq!(err.kind, OracleErrorKind::Network);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn auth_errors_are_not_retried() {
    let calls = Arc::new(AtomicUsize::new(0));
    let inner = scripted(vec![OracleError::auth("bad key")], Arc::clone(&calls));
    let oracle = RetryingOracle::new(inner, RetryPolicy::default()).with_sleeper(|_| {});

    let err = oracle.request(&request()).unwrap_err();
    assert_eq!(err.kind, OracleErrorKind::Auth);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn rate_limits_honour_retry_after() {
    let calls = Arc::new(AtomicUsize::new(0));
    let inner = scripted(
        vec![
            OracleError::rate_limited("slow down", Some(Duration::from_secs(7))),
            OracleError::unknown("RESOURCE_EXHAUSTED: quota"),
        ],
        Arc::clone(&calls),
    );
    let (waits, sleeper) = recording_sleeper();
    let oracle = RetryingOracle::new(inner, RetryPolicy::default()).with_sleeper(sleeper);

    assert_eq!(oracle.request(&request()).unwrap(), "Documents");
    // Second failure is recognized as a rate limit from its message alone.
    assert_eq!(*waits.lock().unwrap(), vec![Duration::from_secs(7), Duration::from_secs(20)]);
}

#[test]
fn backoff_is_capped() {
    let policy = RetryPolicy::default();
    let err = OracleError::network("x");
    assert_eq!(policy.delay_for(&err, 1), Duration::from_secs(1));
    assert_eq!(policy.delay_for(&err, 7), Duration::from_secs(60));

    let limited = OracleError::rate_limited("x", None);
    assert_eq!(policy.delay_for(&limited, 1), Duration::from_secs(10));
    assert_eq!(policy.delay_for(&limited, 10), Duration::from_secs(120));
}

#[test]
fn cancellation_stops_retrying() {
    let calls = Arc::new(AtomicUsize::new(0));
    let inner = scripted(vec![OracleError::network("down"); 5], Arc::clone(&calls));
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let oracle = RetryingOracle::new(inner, RetryPolicy::immediate(5))
        .with_cancellation(cancel)
        .with_sleeper(move |_| token.cancel());

    let err = oracle.request(&request()).unwrap_err();
    assert_eq!(err.kind, OracleErrorKind::Unknown);
    assert_eq!(err.message, "cancelled");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
