//! Proxy dialer: opens a TCP connection to a destination through one proxy
//!
//! Supports HTTP CONNECT and SOCKS5 endpoints, distinguished by the scheme
//! carried on the endpoint. The whole dial (TCP connect plus proxy
//! handshake) runs under one connect timeout.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_socks::tcp::Socks5Stream;
use tracing::debug;

use crate::error::{GuiseError, Result};
use crate::models::{ProxyEndpoint, ProxyScheme};

/// Dialer bound to one proxy endpoint
pub struct ProxyDialer {
    endpoint: Arc<ProxyEndpoint>,
    connect_timeout: Duration,
}

impl ProxyDialer {
    pub fn new(endpoint: Arc<ProxyEndpoint>, connect_timeout: Duration) -> Self {
        Self {
            endpoint,
            connect_timeout,
        }
    }

    /// Open a TCP connection to `host:port` through the bound proxy.
    ///
    /// Fails with `DialTimeout` if the dial exceeds the connect timeout;
    /// it never hangs past it.
    pub async fn dial(&self, host: &str, port: u16) -> Result<TcpStream> {
        tokio::time::timeout(self.connect_timeout, self.dial_proxy(host, port))
            .await
            .map_err(|_| GuiseError::DialTimeout)?
    }

    async fn dial_proxy(&self, host: &str, port: u16) -> Result<TcpStream> {
        debug!("Dialing {}:{} through {}", host, port, self.endpoint);
        match self.endpoint.scheme {
            ProxyScheme::Http => self.connect_via_http(host, port).await,
            ProxyScheme::Socks5 => self.connect_via_socks5(host, port).await,
        }
    }

    /// Tunnel through an HTTP proxy with the CONNECT method
    async fn connect_via_http(&self, target_host: &str, target_port: u16) -> Result<TcpStream> {
        let mut stream = TcpStream::connect(self.endpoint.addr())
            .await
            .map_err(|e| GuiseError::ProxyUnreachable(format!("TCP connect failed: {}", e)))?;

        let request = self.build_connect_request(target_host, target_port);
        stream
            .write_all(request.as_bytes())
            .await
            .map_err(|e| GuiseError::ProxyUnreachable(format!("Failed to send CONNECT: {}", e)))?;

        let mut response = vec![0u8; 1024];
        let n = stream.read(&mut response).await.map_err(|e| {
            GuiseError::ProxyUnreachable(format!("Failed to read CONNECT response: {}", e))
        })?;
        if n == 0 {
            return Err(GuiseError::ProxyProtocol("empty CONNECT response".into()));
        }

        let response_str = String::from_utf8_lossy(&response[..n]);
        let status_line = response_str.lines().next().unwrap_or("").to_string();

        if !status_line.starts_with("HTTP/") {
            return Err(GuiseError::ProxyProtocol(format!(
                "non-HTTP CONNECT response: {}",
                status_line
            )));
        }

        let code = status_line
            .split_whitespace()
            .nth(1)
            .and_then(|c| c.parse::<u16>().ok())
            .ok_or_else(|| {
                GuiseError::ProxyProtocol(format!("unparseable status line: {}", status_line))
            })?;

        match code {
            200 => {
                debug!("HTTP CONNECT tunnel established");
                Ok(stream)
            }
            407 => Err(GuiseError::ProxyAuth(status_line)),
            _ => Err(GuiseError::ProxyUnreachable(format!(
                "CONNECT refused: {}",
                status_line
            ))),
        }
    }

    /// Build the HTTP CONNECT request, with Basic auth when credentials exist
    fn build_connect_request(&self, target_host: &str, target_port: u16) -> String {
        let authority = format_connect_authority(target_host, target_port);
        let mut request = format!("CONNECT {} HTTP/1.1\r\nHost: {}\r\n", authority, authority);

        if let Some(username) = &self.endpoint.username {
            let password = self.endpoint.password.as_deref().unwrap_or("");
            let credentials = format!("{}:{}", username, password);
            request.push_str(&format!(
                "Proxy-Authorization: Basic {}\r\n",
                BASE64.encode(credentials.as_bytes())
            ));
        }

        request.push_str("\r\n");
        request
    }

    /// Tunnel through a SOCKS5 proxy
    async fn connect_via_socks5(&self, target_host: &str, target_port: u16) -> Result<TcpStream> {
        let socket = TcpStream::connect(self.endpoint.addr())
            .await
            .map_err(|e| GuiseError::ProxyUnreachable(format!("TCP connect failed: {}", e)))?;

        let stream = match (&self.endpoint.username, &self.endpoint.password) {
            (Some(username), Some(password)) => Socks5Stream::connect_with_password_and_socket(
                socket,
                (target_host, target_port),
                username,
                password,
            )
            .await,
            _ => Socks5Stream::connect_with_socket(socket, (target_host, target_port)).await,
        }
        .map_err(map_socks_error)?;

        debug!("SOCKS5 tunnel established");
        Ok(stream.into_inner())
    }
}

/// Map tokio-socks failures onto the dial error taxonomy
fn map_socks_error(err: tokio_socks::Error) -> GuiseError {
    use tokio_socks::Error as Socks;
    match err {
        Socks::PasswordAuthFailure(_) | Socks::NoAcceptableAuthMethods => {
            GuiseError::ProxyAuth(err.to_string())
        }
        Socks::InvalidResponseVersion | Socks::UnknownAuthMethod => {
            GuiseError::ProxyProtocol(err.to_string())
        }
        other => GuiseError::ProxyUnreachable(other.to_string()),
    }
}

fn format_connect_authority(host: &str, port: u16) -> String {
    if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
