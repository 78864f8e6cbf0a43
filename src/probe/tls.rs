//! Fingerprinted TLS handshake
//!
//! `HelloConnector` wraps an already-open raw connection with a BoringSSL
//! handshake whose ClientHello follows a `FingerprintDescriptor` instead of
//! the stack's native shape. BoringSSL is the one mainstream TLS engine that
//! exposes enough ClientHello control for this (cipher order, group order,
//! signature algorithms, GREASE) while still doing the real cryptography.

use boring::ssl::{SslConnector, SslMethod, SslVerifyMode, SslVersion};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_boring::SslStream;
use tracing::debug;

use crate::error::{GuiseError, Result};
use crate::probe::fingerprint::FingerprintDescriptor;

/// TLS connector shaped by one fingerprint descriptor
pub struct HelloConnector {
    descriptor: &'static FingerprintDescriptor,
    allow_untrusted_certificates: bool,
}

impl HelloConnector {
    pub fn new(descriptor: &'static FingerprintDescriptor, allow_untrusted_certificates: bool) -> Self {
        Self {
            descriptor,
            allow_untrusted_certificates,
        }
    }

    pub fn descriptor(&self) -> &'static FingerprintDescriptor {
        self.descriptor
    }

    /// Perform one TLS handshake over `stream` for `server_name`.
    ///
    /// Exactly one handshake round-trip is attempted; retry policy belongs
    /// to the caller. Certificate-chain and hostname verification are
    /// skipped only when `allow_untrusted_certificates` was set.
    pub async fn handshake<S>(&self, stream: S, server_name: &str) -> Result<SslStream<S>>
    where
        S: AsyncRead + AsyncWrite + Unpin + std::fmt::Debug,
    {
        let connector = self.build_connector()?;
        let mut config = connector
            .configure()
            .map_err(|e| GuiseError::Handshake(e.to_string()))?;
        if self.allow_untrusted_certificates {
            config.set_verify_hostname(false);
        }

        debug!(
            "TLS handshake with {} fingerprint to {}",
            self.descriptor.id, server_name
        );

        tokio_boring::connect(config, server_name, stream)
            .await
            .map_err(|e| GuiseError::Handshake(e.to_string()))
    }

    /// Build the BoringSSL connector for this descriptor
    fn build_connector(&self) -> Result<SslConnector> {
        let err = |e: boring::error::ErrorStack| GuiseError::Handshake(e.to_string());

        let mut builder = SslConnector::builder(SslMethod::tls_client()).map_err(err)?;

        builder
            .set_min_proto_version(Some(SslVersion::TLS1_2))
            .map_err(err)?;
        builder
            .set_max_proto_version(Some(SslVersion::TLS1_3))
            .map_err(err)?;

        builder.set_grease_enabled(self.descriptor.grease);
        builder
            .set_cipher_list(&self.descriptor.cipher_suites.join(":"))
            .map_err(err)?;
        builder
            .set_curves_list(&self.descriptor.groups.join(":"))
            .map_err(err)?;
        builder
            .set_sigalgs_list(&self.descriptor.signature_algorithms.join(":"))
            .map_err(err)?;
        builder
            .set_alpn_protos(&alpn_wire_format(self.descriptor.alpn))
            .map_err(err)?;

        if self.allow_untrusted_certificates {
            builder.set_verify(SslVerifyMode::NONE);
        }

        Ok(builder.build())
    }
}

/// Encode ALPN protocol names into the length-prefixed wire format
fn alpn_wire_format(protocols: &[&str]) -> Vec<u8> {
    let mut wire = Vec::new();
    for proto in protocols {
        wire.push(proto.len() as u8);
        wire.extend_from_slice(proto.as_bytes());
    }
    wire
}
