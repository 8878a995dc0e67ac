//! Scriptable in-process transport for exercising the dispatcher without a
//! network.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use smol::Timer;
use smol::future;

use crate::outcome::RawResponse;
use crate::template::RequestTemplate;
use crate::transport::{Transport, TransportError};

pub struct MockTransport {
    default_body: Vec<u8>,
    scripted: Mutex<VecDeque<Vec<u8>>>,
    seen: Mutex<Vec<RequestTemplate>>,
    calls: AtomicUsize,
    fail_after: Option<usize>,
    delay: Option<Duration>,
    hang: bool,
    batch: bool,
}

impl MockTransport {
    fn base(default_body: Vec<u8>) -> Self {
        Self {
            default_body,
            scripted: Mutex::new(VecDeque::new()),
            seen: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            fail_after: None,
            delay: None,
            hang: false,
            batch: false,
        }
    }

    /// Answers every request with status 200 and `body`.
    pub fn ok_with_body(body: &[u8]) -> Self {
        Self::base(body.to_vec())
    }

    /// Answers the nth request with the nth body, then falls back to an
    /// empty body. Pair with [`batching`](Self::batching) for per-index
    /// determinism.
    pub fn scripted_bodies(bodies: &[&str]) -> Self {
        let mock = Self::base(Vec::new());
        mock.scripted
            .lock()
            .unwrap()
            .extend(bodies.iter().map(|b| b.as_bytes().to_vec()));
        mock
    }

    /// Never completes a request.
    pub fn hanging() -> Self {
        let mut mock = Self::base(Vec::new());
        mock.hang = true;
        mock
    }

    /// Report batch support, routing cycles through `send_many`.
    pub fn batching(mut self) -> Self {
        self.batch = true;
        self
    }

    /// Succeed for the first `successes` requests of the session, then fail
    /// every later one.
    pub fn failing_after(mut self, successes: usize) -> Self {
        self.fail_after = Some(successes);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every request handed to the transport, in arrival order.
    pub fn seen(&self) -> Vec<RequestTemplate> {
        self.seen.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    fn supports_batch(&self) -> bool {
        self.batch
    }

    async fn send_one(&self, request: RequestTemplate) -> Result<RawResponse, TransportError> {
        self.seen.lock().unwrap().push(request);

        if self.hang {
            future::pending::<()>().await;
        }
        if let Some(delay) = self.delay {
            Timer::after(delay).await;
        }

        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|successes| call >= successes) {
            return Err(TransportError::Request(
                "mock transport refused this request".into(),
            ));
        }

        let body = self
            .scripted
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_body.clone());

        Ok(RawResponse {
            status: 200,
            headers: vec![("Content-Type".into(), "text/plain".into())],
            body,
        })
    }
}
