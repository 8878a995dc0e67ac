use std::sync::Arc;

use async_compat::CompatExt;
use axum::Router;
use futures_rustls::TlsAcceptor;
use hyper::{Request, body::Incoming};
use hyper_util::rt::TokioIo;
use smol::io::{AsyncRead, AsyncWrite};
use thiserror::Error;
use tower::Service;

use crate::executor::SmolExecutor;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("TLS handshake failed: {0}")]
    TlsHandshake(std::io::Error),

    #[error("failed to serve connection: {0}")]
    Serve(Box<dyn std::error::Error + Send + Sync>),
}

/// Serves the router over one TLS connection.
pub async fn serve_connection<IO>(
    app: Router,
    server_config: Arc<rustls::ServerConfig>,
    cnx: IO,
) -> Result<(), ServeError>
where
    IO: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let stream = TlsAcceptor::from(server_config)
        .accept(cnx)
        .await
        .map_err(ServeError::TlsHandshake)?;
    serve_plain(app, stream).await
}

/// Serves the router over one cleartext connection; the protocol version is
/// sniffed, so h2c prior knowledge works.
pub async fn serve_plain<IO>(app: Router, cnx: IO) -> Result<(), ServeError>
where
    IO: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let stream = TokioIo::new(cnx.compat());

    let hyper_service = hyper::service::service_fn(move |request: Request<Incoming>| {
        app.clone().call(request)
    });

    hyper_util::server::conn::auto::Builder::new(SmolExecutor)
        .serve_connection_with_upgrades(stream, hyper_service)
        .await
        .map_err(ServeError::Serve)?;

    Ok(())
}
