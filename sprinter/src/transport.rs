use std::future::Future;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::outcome::RawResponse;
use crate::template::RequestTemplate;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(#[from] std::io::Error),

    #[error("TLS connection failed: {0}")]
    Tls(std::io::Error),

    #[error("invalid server name: {0}")]
    InvalidServerName(String),

    #[error("no TLS client configuration for https destination")]
    MissingTlsConfig,

    #[error("HTTP/2 handshake failed: {0}")]
    Handshake(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("response body collection failed: {0}")]
    Body(String),

    #[error("malformed request template: {0}")]
    MalformedTemplate(String),
}

/// One slot of an ordered batch result. `elapsed` is the individual time
/// from the batch release to this response's own arrival.
#[derive(Debug)]
pub struct BatchItem {
    pub result: Result<RawResponse, TransportError>,
    pub elapsed: Duration,
}

/// The host-supplied HTTP client.
///
/// Implementations that can concentrate a whole request set into as few
/// network packets as possible (multiplexed streams on one connection)
/// should override [`send_many`](Transport::send_many) and report
/// `supports_batch() == true`; the dispatcher then prefers the batch
/// strategy. Otherwise only [`send_one`](Transport::send_one) is used, from
/// barrier-synchronized workers.
pub trait Transport: Send + Sync + 'static {
    fn send_one(
        &self,
        request: RequestTemplate,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;

    fn supports_batch(&self) -> bool {
        false
    }

    /// Order-preserving batch submission. The default is a sequential
    /// fallback with individual timing; it satisfies the contract but not
    /// the skew goal, so it is only used when `supports_batch()` says so.
    fn send_many(
        &self,
        requests: Vec<RequestTemplate>,
    ) -> impl Future<Output = Vec<BatchItem>> + Send {
        async move {
            let mut items = Vec::with_capacity(requests.len());
            for request in requests {
                let sent = Instant::now();
                let result = self.send_one(request).await;
                items.push(BatchItem {
                    result,
                    elapsed: sent.elapsed(),
                });
            }
            items
        }
    }
}
