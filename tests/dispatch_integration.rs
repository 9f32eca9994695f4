//! Dispatcher integration tests
//!
//! These drive the full dispatch path through an in-memory transport, so no
//! collector or network access is needed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use promptline::config::ReportingConfig;
use promptline::dispatch::{
    ConcurrencyGate, EventDispatcher, EventTransport, TransportError, TransportResponse,
};
use promptline::event::{CallOptions, EventBuilder, EventRecord};
use promptline::ratelimit::StatusLogThrottle;

const VALID_CHAIN_ID: &str = "9f1c7d2e-3b4a-4c5d-8e6f-7a8b9c0d1e2f";

#[derive(Clone)]
enum Reply {
    Status(u16, &'static str),
    NetworkError,
}

/// In-memory transport recording every call
struct MockTransport {
    reply: Reply,
    delay: Duration,
    /// Sends block until a permit is added, when set
    release: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
    requests: Mutex<Vec<(String, Value)>>,
}

impl MockTransport {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            delay: Duration::ZERO,
            release: None,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn held(mut self, release: Arc<Semaphore>) -> Self {
        self.release = Some(release);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventTransport for MockTransport {
    async fn post_json(&self, url: &str, body: String) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);

        let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
        self.requests.lock().unwrap().push((url.to_string(), parsed));

        if let Some(release) = &self.release {
            release.acquire().await.unwrap().forget();
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);

        match &self.reply {
            Reply::Status(status, body) => Ok(TransportResponse::new(*status, *body)),
            Reply::NetworkError => Err(TransportError::Other("connection reset".to_string())),
        }
    }
}

struct TestEnvironment {
    transport: Arc<MockTransport>,
    gate: Arc<ConcurrencyGate>,
    dispatcher: Arc<EventDispatcher>,
}

fn reporting(debug: bool) -> ReportingConfig {
    ReportingConfig {
        api_prefix: "http://collector.test/api".to_string(),
        url: None,
        debug,
    }
}

fn create_test_environment(transport: MockTransport, capacity: usize, max_pending: usize) -> TestEnvironment {
    create_test_environment_with(transport, capacity, max_pending, false)
}

fn create_test_environment_with(
    transport: MockTransport,
    capacity: usize,
    max_pending: usize,
    debug: bool,
) -> TestEnvironment {
    let transport = Arc::new(transport);
    let gate = Arc::new(ConcurrencyGate::new(capacity, max_pending));
    let dispatcher = Arc::new(EventDispatcher::new(
        transport.clone(),
        gate.clone(),
        Arc::new(StatusLogThrottle::new()),
        reporting(debug),
    ));
    TestEnvironment {
        transport,
        gate,
        dispatcher,
    }
}

fn event() -> EventRecord {
    let options = CallOptions {
        api_key: Some("test-key".to_string()),
        chain_id: Some(VALID_CHAIN_ID.to_string()),
        ..CallOptions::default()
    };
    EventBuilder::new(&options).api_name("chat.completions").build()
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    while !condition() {
        tokio::task::yield_now().await;
    }
}

// =============================================================================
// Validation
// =============================================================================

mod validation_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_api_key_sends_nothing() {
        let env = create_test_environment(MockTransport::new(Reply::Status(200, "{}")), 25, 1000);

        let mut event = event();
        event.api_key = None;

        assert_eq!(env.dispatcher.dispatch(&event).await, None);
        assert_eq!(env.transport.calls(), 0);
        assert_eq!(env.dispatcher.stats().skipped, 1);
        assert_eq!(env.dispatcher.stats().logs_emitted, 0);
    }

    #[tokio::test]
    async fn test_invalid_chain_id_sends_nothing() {
        let env = create_test_environment(MockTransport::new(Reply::Status(200, "{}")), 25, 1000);

        let mut event = event();
        event.chain_id = Some("chain-1".to_string());

        assert_eq!(env.dispatcher.dispatch(&event).await, None);
        assert_eq!(env.transport.calls(), 0);
        assert_eq!(env.dispatcher.stats().invalid_chain_id, 1);
        assert_eq!(env.dispatcher.stats().attempted, 0);
    }

    #[tokio::test]
    async fn test_absent_chain_id_is_fine() {
        let env = create_test_environment(MockTransport::new(Reply::Status(200, "{}")), 25, 1000);

        let mut event = event();
        event.chain_id = None;

        assert_eq!(env.dispatcher.dispatch(&event).await, Some(json!({})));
        assert_eq!(env.transport.calls(), 1);
    }
}

// =============================================================================
// Sending and classification
// =============================================================================

mod send_tests {
    use super::*;

    #[tokio::test]
    async fn test_success_returns_decoded_reply() {
        let env = create_test_environment(
            MockTransport::new(Reply::Status(200, r#"{"id": "evt-42"}"#)),
            25,
            1000,
        );

        let reply = env.dispatcher.dispatch(&event()).await;
        assert_eq!(reply, Some(json!({"id": "evt-42"})));

        let requests = env.transport.requests.lock().unwrap();
        let (url, body) = &requests[0];
        assert_eq!(url, "http://collector.test/api/event");
        assert_eq!(body["apiKey"], "test-key");
        assert_eq!(body["chainId"], VALID_CHAIN_ID);
        assert_eq!(body["apiName"], "chat.completions");

        let stats = env.dispatcher.stats();
        assert_eq!(stats.sent, 1);
        assert_eq!(stats.failed, 0);
    }

    #[tokio::test]
    async fn test_client_error_is_swallowed_and_logged() {
        let env = create_test_environment(
            MockTransport::new(Reply::Status(400, r#"{"error": "bad payload"}"#)),
            25,
            1000,
        );

        assert_eq!(env.dispatcher.dispatch(&event()).await, None);
        assert_eq!(env.dispatcher.dispatch(&event()).await, None);

        let stats = env.dispatcher.stats();
        assert_eq!(stats.failed, 2);
        // 400 has no throttle bucket
        assert_eq!(stats.logs_emitted, 2);
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_a_failure() {
        let env = create_test_environment(MockTransport::new(Reply::Status(200, "OK")), 25, 1000);

        assert_eq!(env.dispatcher.dispatch(&event()).await, None);
        let stats = env.dispatcher.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.sent, 0);
        // status 200 is outside the client error range
        assert_eq!(stats.logs_emitted, 0);
    }

    #[tokio::test]
    async fn test_server_errors_are_not_logged() {
        let env = create_test_environment(
            MockTransport::new(Reply::Status(503, r#"{"error": "down"}"#)),
            25,
            1000,
        );

        assert_eq!(env.dispatcher.dispatch(&event()).await, None);
        assert_eq!(env.dispatcher.stats().logs_emitted, 0);
    }

    #[tokio::test]
    async fn test_network_error_is_swallowed() {
        let env = create_test_environment(MockTransport::new(Reply::NetworkError), 25, 1000);

        assert_eq!(env.dispatcher.dispatch(&event()).await, None);
        let stats = env.dispatcher.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.logs_emitted, 0);
    }

    #[tokio::test]
    async fn test_debug_logs_every_failure() {
        let env =
            create_test_environment_with(MockTransport::new(Reply::NetworkError), 25, 1000, true);

        for _ in 0..3 {
            assert_eq!(env.dispatcher.dispatch(&event()).await, None);
        }
        assert_eq!(env.dispatcher.stats().logs_emitted, 3);
    }

    #[tokio::test]
    async fn test_spawn_dispatch() {
        let env = create_test_environment(
            MockTransport::new(Reply::Status(201, r#"{"ok": true}"#)),
            25,
            1000,
        );

        let handle = env.dispatcher.spawn_dispatch(event());
        assert_eq!(handle.await.unwrap(), Some(json!({"ok": true})));
    }
}

// =============================================================================
// Log throttling
// =============================================================================

mod throttle_tests {
    use super::*;

    #[tokio::test]
    async fn test_repeated_429_logged_once_per_second() {
        let env = create_test_environment(
            MockTransport::new(Reply::Status(429, r#"{"error": "slow down"}"#)),
            25,
            1000,
        );

        env.dispatcher.dispatch(&event()).await;
        env.dispatcher.dispatch(&event()).await;

        let stats = env.dispatcher.stats();
        assert_eq!(stats.logs_emitted, 1);
        assert_eq!(stats.logs_suppressed, 1);

        tokio::time::sleep(Duration::from_millis(1_050)).await;
        env.dispatcher.dispatch(&event()).await;

        let stats = env.dispatcher.stats();
        assert_eq!(stats.logs_emitted, 2);
        assert_eq!(stats.logs_suppressed, 1);
    }

    #[tokio::test]
    async fn test_499_has_its_own_bucket() {
        let throttle = Arc::new(StatusLogThrottle::new());
        let gate = Arc::new(ConcurrencyGate::new(25, 1000));

        let too_many = EventDispatcher::new(
            Arc::new(MockTransport::new(Reply::Status(429, "{}"))),
            gate.clone(),
            throttle.clone(),
            reporting(false),
        );
        let closed = EventDispatcher::new(
            Arc::new(MockTransport::new(Reply::Status(499, "{}"))),
            gate,
            throttle,
            reporting(false),
        );

        too_many.dispatch(&event()).await;
        closed.dispatch(&event()).await;
        closed.dispatch(&event()).await;

        assert_eq!(too_many.stats().logs_emitted, 1);
        assert_eq!(closed.stats().logs_emitted, 1);
        assert_eq!(closed.stats().logs_suppressed, 1);
    }
}

// =============================================================================
// Concurrency and backpressure
// =============================================================================

mod concurrency_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_sends_bounded_by_capacity() {
        let env = create_test_environment(
            MockTransport::new(Reply::Status(200, "{}")).with_delay(Duration::from_millis(10)),
            3,
            1000,
        );

        let handles: Vec<_> = (0..20)
            .map(|_| env.dispatcher.spawn_dispatch(event()))
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Some(json!({})));
        }

        assert!(env.transport.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(env.transport.calls(), 20);
        assert_eq!(env.dispatcher.stats().sent, 20);
        assert_eq!(env.gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_full_queue_fails_fast_with_429() {
        let release = Arc::new(Semaphore::new(0));
        let env = create_test_environment(
            MockTransport::new(Reply::Status(200, "{}")).held(release.clone()),
            1,
            1,
        );

        // Occupies the only slot
        let first = env.dispatcher.spawn_dispatch(event());
        wait_until(|| env.gate.in_flight() == 1).await;

        // Waits in the queue
        let second = env.dispatcher.spawn_dispatch(event());
        wait_until(|| env.gate.queue_depth() == 1).await;

        // Queue is full: rejected without a network call
        assert_eq!(env.dispatcher.dispatch(&event()).await, None);
        assert_eq!(env.transport.calls(), 1);

        let stats = env.dispatcher.stats();
        assert_eq!(stats.overloaded, 1);
        assert_eq!(stats.logs_emitted, 1);

        release.add_permits(2);
        assert_eq!(first.await.unwrap(), Some(json!({})));
        assert_eq!(second.await.unwrap(), Some(json!({})));
        assert_eq!(env.transport.calls(), 2);
        assert_eq!(env.gate.queue_depth(), 0);
    }

    #[tokio::test]
    async fn test_slot_released_after_failure() {
        let env = create_test_environment(MockTransport::new(Reply::NetworkError), 1, 10);

        for _ in 0..5 {
            assert_eq!(env.dispatcher.dispatch(&event()).await, None);
        }
        assert_eq!(env.gate.in_flight(), 0);
        assert_eq!(env.transport.calls(), 5);
    }
}
