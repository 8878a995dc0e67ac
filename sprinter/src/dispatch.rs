use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures::channel::oneshot;
use smol::Timer;
use smol::future;
use smol::lock::Barrier;
use tracing::debug;

use crate::outcome::ResponseOutcome;
use crate::template::RequestTemplate;
use crate::transport::Transport;

/// Bounded waits for one dispatch cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurstConfig {
    /// How long a barrier worker waits for the full rendezvous to assemble
    /// before giving up on this cycle without transmitting.
    pub barrier_timeout: Duration,
    /// How long the collector waits on each individual result slot.
    pub collect_timeout: Duration,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            barrier_timeout: Duration::from_secs(10),
            collect_timeout: Duration::from_secs(30),
        }
    }
}

/// Transmits a request set with minimal inter-request start-time skew and
/// turns the in-flight results into a finalized, index-aligned outcome
/// sequence.
///
/// Every copy is normalized before transmission: connection management is
/// left to the multiplexed transport, content-encoding negotiation is
/// pinned to `identity`, and caches are bypassed so each response is fresh.
pub struct BurstDispatcher<T: Transport> {
    transport: Arc<T>,
    config: BurstConfig,
}

impl<T: Transport> BurstDispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, BurstConfig::default())
    }

    pub fn with_config(transport: T, config: BurstConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            config,
        }
    }

    pub fn config(&self) -> &BurstConfig {
        &self.config
    }

    /// Runs one dispatch cycle. The returned sequence always has exactly
    /// one outcome per request, in request order; transport failures,
    /// barrier-assembly timeouts and collection timeouts all land as
    /// error-valued outcomes in their own slot.
    pub async fn dispatch(&self, requests: &[RequestTemplate]) -> Vec<ResponseOutcome> {
        if requests.is_empty() {
            return Vec::new();
        }

        let prepared: Vec<RequestTemplate> = requests.iter().map(normalize).collect();

        if self.transport.supports_batch() {
            debug!(requests = prepared.len(), "dispatching as one batch");
            self.batch_burst(prepared).await
        } else {
            debug!(requests = prepared.len(), "dispatching via rendezvous barrier");
            self.barrier_burst(prepared).await
        }
    }

    async fn batch_burst(&self, prepared: Vec<RequestTemplate>) -> Vec<ResponseOutcome> {
        self.transport
            .send_many(prepared)
            .await
            .into_iter()
            .map(|item| match item.result {
                Ok(raw) => ResponseOutcome::from_response(&raw, item.elapsed),
                Err(err) => ResponseOutcome::from_error(err.to_string(), item.elapsed),
            })
            .collect()
    }

    async fn barrier_burst(&self, prepared: Vec<RequestTemplate>) -> Vec<ResponseOutcome> {
        let count = prepared.len();
        // One-shot rendezvous, rebuilt every cycle: the set size may differ
        // next time.
        let barrier = Arc::new(Barrier::new(count));
        let broken = Arc::new(AtomicBool::new(false));
        let mut receivers = Vec::with_capacity(count);

        for request in prepared {
            let (sender, receiver) = oneshot::channel();
            let transport = Arc::clone(&self.transport);
            let barrier = Arc::clone(&barrier);
            let broken = Arc::clone(&broken);
            let barrier_timeout = self.config.barrier_timeout;
            smol::spawn(async move {
                let outcome = worker(transport, barrier, broken, barrier_timeout, request).await;
                let _ = sender.send(outcome);
            })
            .detach();
            receivers.push(receiver);
        }

        collect(receivers, self.config.collect_timeout).await
    }
}

/// Blocks on the shared rendezvous, then transmits. A worker that fails to
/// assemble in time marks the rendezvous as broken and never fires; the
/// barrier still counts its dropped wait as an arrival, so siblings released
/// afterwards check the flag and refuse to transmit too. Elapsed time runs
/// from the worker's own release to its response's arrival.
async fn worker<T: Transport>(
    transport: Arc<T>,
    barrier: Arc<Barrier>,
    broken: Arc<AtomicBool>,
    barrier_timeout: Duration,
    request: RequestTemplate,
) -> ResponseOutcome {
    let assembled = future::or(
        async {
            barrier.wait().await;
            true
        },
        async {
            Timer::after(barrier_timeout).await;
            false
        },
    )
    .await;

    if !assembled {
        broken.store(true, Ordering::SeqCst);
        return ResponseOutcome::from_error(
            "rendezvous barrier did not assemble in time",
            Duration::ZERO,
        );
    }
    if broken.load(Ordering::SeqCst) {
        return ResponseOutcome::from_error(
            "rendezvous barrier broke before release",
            Duration::ZERO,
        );
    }

    let released = Instant::now();
    match transport.send_one(request).await {
        Ok(raw) => ResponseOutcome::from_response(&raw, released.elapsed()),
        Err(err) => ResponseOutcome::from_error(err.to_string(), released.elapsed()),
    }
}

/// Finalizes the in-flight results. Each slot is awaited under its own
/// bounded wait, so one stuck request cannot hold up the rest indefinitely,
/// and every slot is filled no matter what.
async fn collect(
    receivers: Vec<oneshot::Receiver<ResponseOutcome>>,
    collect_timeout: Duration,
) -> Vec<ResponseOutcome> {
    let mut outcomes = Vec::with_capacity(receivers.len());
    for receiver in receivers {
        let outcome = future::or(
            async {
                match receiver.await {
                    Ok(outcome) => outcome,
                    Err(_) => ResponseOutcome::from_error(
                        "worker task dropped before reporting a result",
                        Duration::ZERO,
                    ),
                }
            },
            async {
                Timer::after(collect_timeout).await;
                ResponseOutcome::from_error("timed out waiting for response", collect_timeout)
            },
        )
        .await;
        outcomes.push(outcome);
    }
    outcomes
}

fn normalize(template: &RequestTemplate) -> RequestTemplate {
    template
        .without_header("Connection")
        .with_header("Accept-Encoding", "identity")
        .with_header("Cache-Control", "no-cache")
}
