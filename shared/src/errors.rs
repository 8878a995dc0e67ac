use thiserror::Error;

#[derive(Error, Debug)]
pub enum CertificateError {
    #[error("Certificate generation failed: {0}")]
    Generation(#[from] rcgen::Error),
}

#[derive(Error, Debug)]
pub enum TlsConfigError {
    #[error("Certificate error: {0}")]
    Certificate(#[from] CertificateError),

    #[error("TLS error: {0}")]
    Rustls(#[from] rustls::Error),
}
