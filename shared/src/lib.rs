mod errors;
mod logging;
mod testing;

pub use errors::{CertificateError, TlsConfigError};
pub use logging::{init_logging, init_test_logging};
pub use testing::{TestTlsConfig, create_test_tls_config};
