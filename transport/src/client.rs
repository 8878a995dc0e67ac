use std::sync::Arc;
use std::time::{Duration, Instant};

use async_compat::CompatExt;
use bytes::Bytes;
use futures::future::join_all;
use futures_rustls::TlsConnector;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::client::conn::http2::{self, SendRequest};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use smol::net::TcpStream;
use sprinter::{
    BatchItem, Destination, RawResponse, RequestTemplate, Scheme, Transport, TransportError,
};
use tracing::debug;

use crate::executor::SmolExecutor;

/// HTTP/2 transport for burst dispatch.
///
/// `send_many` drives every request of a cycle as concurrent streams on a
/// single connection, so the whole burst leaves in as few network packets
/// as the peer's flow control allows. `send_one` opens its own connection
/// per call, which is what barrier-synchronized workers want: one
/// independent sender each, released together.
pub struct H2Transport {
    client_config: Option<Arc<rustls::ClientConfig>>,
    batch: bool,
}

impl H2Transport {
    /// Transport able to reach both `https` (via the given rustls config)
    /// and plain `http` destinations. Batch submission is on by default.
    pub fn new(client_config: Arc<rustls::ClientConfig>) -> Self {
        Self {
            client_config: Some(client_config),
            batch: true,
        }
    }

    /// Cleartext-only transport (h2c with prior knowledge).
    pub fn plaintext() -> Self {
        Self {
            client_config: None,
            batch: true,
        }
    }

    /// Toggles native batch submission; with batching off the dispatcher
    /// falls back to barrier-synchronized single sends.
    pub fn with_batching(mut self, enabled: bool) -> Self {
        self.batch = enabled;
        self
    }

    async fn open(
        &self,
        destination: &Destination,
    ) -> Result<SendRequest<Full<Bytes>>, TransportError> {
        let tcp = TcpStream::connect((destination.host.as_str(), destination.port)).await?;

        match destination.scheme {
            Scheme::Https => {
                let config = self
                    .client_config
                    .clone()
                    .ok_or(TransportError::MissingTlsConfig)?;
                let server_name = ServerName::try_from(destination.host.clone())
                    .map_err(|_| TransportError::InvalidServerName(destination.host.clone()))?;
                let stream = TlsConnector::from(config)
                    .connect(server_name, tcp)
                    .await
                    .map_err(TransportError::Tls)?;
                self.handshake(TokioIo::new(stream.compat())).await
            }
            Scheme::Http => self.handshake(TokioIo::new(tcp.compat())).await,
        }
    }

    async fn handshake<IO>(&self, io: IO) -> Result<SendRequest<Full<Bytes>>, TransportError>
    where
        IO: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
    {
        let (sender, conn) = http2::handshake(SmolExecutor, io)
            .await
            .map_err(|err| TransportError::Handshake(err.to_string()))?;

        // The connection future multiplexes all streams; it runs until the
        // last sender handle is dropped.
        smol::spawn(async move {
            if let Err(err) = conn.await {
                debug!("connection task ended: {err}");
            }
        })
        .detach();

        Ok(sender)
    }
}

impl Transport for H2Transport {
    fn supports_batch(&self) -> bool {
        self.batch
    }

    async fn send_one(&self, request: RequestTemplate) -> Result<RawResponse, TransportError> {
        let req = build_request(&request)?;
        let mut sender = self.open(request.destination()).await?;
        let res = sender
            .send_request(req)
            .await
            .map_err(|err| TransportError::Request(err.to_string()))?;
        collect_response(res).await
    }

    async fn send_many(&self, requests: Vec<RequestTemplate>) -> Vec<BatchItem> {
        let Some(first) = requests.first() else {
            return Vec::new();
        };

        let sender = match self.open(first.destination()).await {
            Ok(sender) => sender,
            Err(err) => {
                // no connection, no survivors: every slot gets the failure
                let message = err.to_string();
                return requests
                    .iter()
                    .map(|_| BatchItem {
                        result: Err(TransportError::Request(message.clone())),
                        elapsed: Duration::ZERO,
                    })
                    .collect();
            }
        };

        let built: Vec<Result<hyper::Request<Full<Bytes>>, TransportError>> =
            requests.iter().map(build_request).collect();

        let released = Instant::now();
        join_all(built.into_iter().map(|req| {
            let mut sender = sender.clone();
            async move {
                let result = match req {
                    Ok(req) => match sender.send_request(req).await {
                        Ok(res) => collect_response(res).await,
                        Err(err) => Err(TransportError::Request(err.to_string())),
                    },
                    Err(err) => Err(err),
                };
                BatchItem {
                    result,
                    elapsed: released.elapsed(),
                }
            }
        }))
        .await
    }
}

/// Rebuilds a hyper request from the template's raw bytes. Host and
/// connection management travel as h2 pseudo-headers and frames, and the
/// content length is derived from the body, so those header lines are
/// dropped here.
fn build_request(template: &RequestTemplate) -> Result<hyper::Request<Full<Bytes>>, TransportError> {
    let (head, body) = split_head(template.raw());
    let head = std::str::from_utf8(head)
        .map_err(|_| TransportError::MalformedTemplate("request head is not valid UTF-8".into()))?;

    let mut lines = head.lines();
    let request_line = lines
        .next()
        .ok_or_else(|| TransportError::MalformedTemplate("empty request head".into()))?;
    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| TransportError::MalformedTemplate("missing method".into()))?;
    let target = parts
        .next()
        .ok_or_else(|| TransportError::MalformedTemplate("missing request target".into()))?;

    let method = hyper::Method::from_bytes(method.as_bytes())
        .map_err(|err| TransportError::MalformedTemplate(format!("bad method: {err}")))?;

    let destination = template.destination();
    let uri: hyper::Uri = if target.starts_with('/') {
        format!(
            "{}://{}:{}{}",
            destination.scheme, destination.host, destination.port, target
        )
    } else {
        target.to_owned()
    }
    .parse()
    .map_err(|err| TransportError::MalformedTemplate(format!("bad request target: {err}")))?;

    let mut builder = hyper::Request::builder().method(method).uri(uri);
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if name.eq_ignore_ascii_case("host")
            || name.eq_ignore_ascii_case("connection")
            || name.eq_ignore_ascii_case("content-length")
            || name.eq_ignore_ascii_case("transfer-encoding")
        {
            continue;
        }
        builder = builder.header(name, value.trim());
    }

    builder
        .body(Full::new(Bytes::copy_from_slice(body)))
        .map_err(|err| TransportError::MalformedTemplate(err.to_string()))
}

fn split_head(raw: &[u8]) -> (&[u8], &[u8]) {
    if let Some(idx) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
        (&raw[..idx], &raw[idx + 4..])
    } else if let Some(idx) = raw.windows(2).position(|w| w == b"\n\n") {
        (&raw[..idx], &raw[idx + 2..])
    } else {
        (raw, &[])
    }
}

async fn collect_response(res: hyper::Response<Incoming>) -> Result<RawResponse, TransportError> {
    let status = res.status().as_u16();
    let headers = res
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_owned(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let body = res
        .into_body()
        .collect()
        .await
        .map_err(|err| TransportError::Body(err.to_string()))?
        .to_bytes()
        .to_vec();

    Ok(RawResponse {
        status,
        headers,
        body,
    })
}
