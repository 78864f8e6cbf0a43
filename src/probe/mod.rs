//! Probe pipeline
//!
//! This module provides the pieces one probe is composed of:
//! - Proxy pool with uniform-random selection
//! - Dialer for HTTP CONNECT and SOCKS5 tunnels
//! - Browser fingerprint catalogue
//! - Fingerprinted TLS handshake
//! - The end-to-end HTTP probe client

pub mod client;
pub mod dial;
pub mod fingerprint;
pub mod pool;
pub mod tls;

pub use client::Prober;
pub use dial::ProxyDialer;
pub use fingerprint::{FingerprintDescriptor, FingerprintProfile};
pub use pool::ProxyPool;
pub use tls::HelloConnector;
