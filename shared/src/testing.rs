use std::sync::Arc;

use chrono::Datelike;
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair, SanType};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};

use crate::errors::{CertificateError, TlsConfigError};

/// Matching client/server rustls configs built around one throwaway
/// self-signed certificate, for loopback tests. Both sides offer h2.
pub struct TestTlsConfig {
    pub server_config: Arc<rustls::ServerConfig>,
    pub client_config: Arc<rustls::ClientConfig>,
}

pub fn create_test_tls_config() -> Result<TestTlsConfig, TlsConfigError> {
    let (cert, key) = generate_localhost_cert()?;

    let crypto_provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());

    let mut server_config = rustls::ServerConfig::builder_with_provider(crypto_provider.clone())
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(vec![cert.clone()], key)?;
    server_config.alpn_protocols = vec![b"h2".to_vec()];

    let mut root_store = rustls::RootCertStore::empty();
    root_store.add(cert)?;

    let mut client_config = rustls::ClientConfig::builder_with_provider(crypto_provider)
        .with_safe_default_protocol_versions()?
        .with_root_certificates(root_store)
        .with_no_client_auth();
    client_config.alpn_protocols = vec![b"h2".to_vec()];

    Ok(TestTlsConfig {
        server_config: Arc::new(server_config),
        client_config: Arc::new(client_config),
    })
}

fn generate_localhost_cert()
-> Result<(CertificateDer<'static>, PrivateKeyDer<'static>), CertificateError> {
    let key_pair = KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256)?;

    let mut params = CertificateParams::default();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, "localhost");
    params.distinguished_name = dn;
    params.subject_alt_names = vec![
        SanType::DnsName("localhost".try_into()?),
        SanType::IpAddress(std::net::Ipv4Addr::LOCALHOST.into()),
        SanType::IpAddress(std::net::Ipv6Addr::LOCALHOST.into()),
    ];

    let now = chrono::Utc::now();
    let expiry = now + chrono::Duration::days(365);
    params.not_before = rcgen::date_time_ymd(now.year(), now.month() as u8, now.day() as u8);
    params.not_after =
        rcgen::date_time_ymd(expiry.year(), expiry.month() as u8, expiry.day() as u8);

    let cert = params.self_signed(&key_pair)?;
    let key = PrivateKeyDer::Pkcs8(key_pair.serialize_der().into());

    Ok((CertificateDer::from(cert.der().to_vec()), key))
}
