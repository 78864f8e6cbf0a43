//! End-to-end probe: select a proxy, dial through it, perform the
//! fingerprinted handshake, and issue exactly one GET.
//!
//! The probe honors the negotiated ALPN protocol: HTTP/2 when the server
//! picks `h2`, HTTP/1.1 otherwise, so the fingerprint can keep advertising
//! what the mimicked browser advertises.

use bytes::Bytes;
use http::{header, Method, StatusCode};
use http_body_util::{BodyExt, Empty};
use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::ProbeConfig;
use crate::error::{GuiseError, Result};
use crate::models::ProbeResult;
use crate::probe::dial::ProxyDialer;
use crate::probe::fingerprint::{self, FingerprintDescriptor, FingerprintProfile};
use crate::probe::pool::ProxyPool;
use crate::probe::tls::HelloConnector;

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,\
                      image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// One-request HTTP probe over a fingerprinted, proxy-tunneled transport
pub struct Prober {
    pool: Arc<ProxyPool>,
    config: ProbeConfig,
}

impl Prober {
    pub fn new(pool: Arc<ProxyPool>, config: ProbeConfig) -> Self {
        Self { pool, config }
    }

    /// Issue one probe against `target` with the requested profile.
    ///
    /// Fully sequential from the caller's view: selection, dial, handshake,
    /// request, and the bounded body read all complete (or fail) before this
    /// returns. The whole probe sits under the end-to-end request timeout.
    #[instrument(skip(self, target), fields(target = %target))]
    pub async fn probe(&self, target: &Url, profile: FingerprintProfile) -> Result<ProbeResult> {
        let start = Instant::now();
        match tokio::time::timeout(
            self.config.request_timeout(),
            self.probe_once(target, profile, start),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(GuiseError::RequestTimeout),
        }
    }

    async fn probe_once(
        &self,
        target: &Url,
        profile: FingerprintProfile,
        start: Instant,
    ) -> Result<ProbeResult> {
        if target.scheme() != "https" {
            return Err(GuiseError::InvalidTarget(format!(
                "probe targets must be https, got {}",
                target.scheme()
            )));
        }
        let host = target
            .host_str()
            .ok_or_else(|| GuiseError::InvalidTarget("missing host".into()))?
            .to_string();
        let port = target.port().unwrap_or(443);

        let endpoint = self.pool.select()?;
        let descriptor = fingerprint::resolve(profile);
        info!("Probing via {} as {}", endpoint, descriptor.id);

        let dialer = ProxyDialer::new(endpoint.clone(), self.config.connect_timeout());
        let raw = dialer.dial(&host, port).await?;

        let connector =
            HelloConnector::new(descriptor, self.config.allow_untrusted_certificates);
        let tls = connector.handshake(raw, &host).await?;

        let host_header = if port == 443 {
            host.clone()
        } else {
            format!("{}:{}", host, port)
        };

        let negotiated_h2 = tls
            .ssl()
            .selected_alpn_protocol()
            .map(|proto| proto == b"h2")
            .unwrap_or(false);

        let (status, body) = if negotiated_h2 {
            self.exchange_h2(tls, target, descriptor).await?
        } else {
            self.exchange_http1(tls, target, &host_header, descriptor).await?
        };

        Ok(ProbeResult {
            status: status.as_u16(),
            body_prefix: String::from_utf8_lossy(&body).into_owned(),
            proxy: endpoint.to_string(),
            fingerprint: descriptor.id,
            protocol: if negotiated_h2 { "h2" } else { "http/1.1" },
            elapsed_ms: start.elapsed().as_millis(),
        })
    }

    /// HTTP/1.1 exchange over the established connection
    async fn exchange_http1<S>(
        &self,
        tls: S,
        target: &Url,
        host: &str,
        descriptor: &'static FingerprintDescriptor,
    ) -> Result<(StatusCode, Vec<u8>)>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let io = TokioIo::new(tls);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| GuiseError::Request(format!("HTTP handshake failed: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!("Connection ended: {}", e);
            }
        });

        let path_and_query = match target.query() {
            Some(q) => format!("{}?{}", target.path(), q),
            None => target.path().to_string(),
        };

        let request = browser_request(descriptor)
            .uri(path_and_query)
            .header(header::HOST, host)
            .body(Empty::<Bytes>::new())
            .map_err(|e| GuiseError::Request(format!("Failed to build request: {}", e)))?;

        let response = sender.send_request(request).await?;
        let status = response.status();
        let body = read_body_prefix(response.into_body(), self.config.body_cap).await;
        Ok((status, body))
    }

    /// HTTP/2 exchange, used when ALPN negotiated `h2`
    async fn exchange_h2<S>(
        &self,
        tls: S,
        target: &Url,
        descriptor: &'static FingerprintDescriptor,
    ) -> Result<(StatusCode, Vec<u8>)>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let io = TokioIo::new(tls);
        let (mut sender, conn) = hyper::client::conn::http2::handshake(TokioExecutor::new(), io)
            .await
            .map_err(|e| GuiseError::Request(format!("HTTP/2 handshake failed: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!("Connection ended: {}", e);
            }
        });

        let request = browser_request(descriptor)
            .uri(target.as_str())
            .body(Empty::<Bytes>::new())
            .map_err(|e| GuiseError::Request(format!("Failed to build request: {}", e)))?;

        let response = sender.send_request(request).await?;
        let status = response.status();
        let body = read_body_prefix(response.into_body(), self.config.body_cap).await;
        Ok((status, body))
    }
}

/// GET request skeleton with the static browser-like header set
fn browser_request(descriptor: &'static FingerprintDescriptor) -> http::request::Builder {
    Request::builder()
        .method(Method::GET)
        .header(header::USER_AGENT, descriptor.user_agent)
        .header(header::ACCEPT, ACCEPT)
        .header(header::ACCEPT_LANGUAGE, ACCEPT_LANGUAGE)
}

/// Read at most `cap` body bytes, then stop.
///
/// The remainder of a large or streaming body is never awaited; dropping the
/// body (and with it the connection) discards it.
async fn read_body_prefix(mut body: Incoming, cap: usize) -> Vec<u8> {
    let mut collected: Vec<u8> = Vec::new();
    while collected.len() < cap {
        match body.frame().await {
            Some(Ok(frame)) => {
                if let Some(data) = frame.data_ref() {
                    collected.extend_from_slice(data);
                }
            }
            Some(Err(_)) | None => break,
        }
    }
    collected.truncate(cap);
    collected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProxyEndpoint;

    use boring::pkey::PKey;
    use boring::ssl::{SslAcceptor, SslMethod};
    use boring::x509::X509;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Minimal HTTPS server with a self-signed certificate. Answers every
    /// request with a 200 and `body_len` bytes of filler, then closes.
    async fn spawn_tls_server(body_len: usize, respond: bool) -> SocketAddr {
        let cert = rcgen::generate_simple_self_signed(vec!["127.0.0.1".to_string()]).unwrap();
        let cert_pem = cert.cert.pem();
        let key_pem = cert.key_pair.serialize_pem();

        let mut acceptor = SslAcceptor::mozilla_intermediate(SslMethod::tls()).unwrap();
        acceptor
            .set_private_key(&PKey::private_key_from_pem(key_pem.as_bytes()).unwrap())
            .unwrap();
        acceptor
            .set_certificate(&X509::from_pem(cert_pem.as_bytes()).unwrap())
            .unwrap();
        let acceptor = Arc::new(acceptor.build());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let (tcp, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                let acceptor = acceptor.clone();
                tokio::spawn(async move {
                    let mut tls = match tokio_boring::accept(&acceptor, tcp).await {
                        Ok(tls) => tls,
                        Err(_) => return,
                    };

                    // Read the request head.
                    let mut head = Vec::new();
                    let mut buf = [0u8; 1024];
                    loop {
                        let n = match tls.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => n,
                        };
                        head.extend_from_slice(&buf[..n]);
                        if head.windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }

                    if !respond {
                        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
                        return;
                    }

                    let header = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\
                         Content-Length: {}\r\nConnection: close\r\n\r\n",
                        body_len
                    );
                    let _ = tls.write_all(header.as_bytes()).await;
                    let _ = tls.write_all(&vec![b'a'; body_len]).await;
                    let _ = tls.shutdown().await;
                });
            }
        });

        addr
    }

    /// Minimal HTTP CONNECT forward proxy that tunnels to whatever authority
    /// the client asks for.
    async fn spawn_connect_proxy() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let (mut client, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 2048];
                    let n = match client.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => n,
                    };
                    let req = String::from_utf8_lossy(&buf[..n]).to_string();
                    let Some(authority) = req.split_whitespace().nth(1) else {
                        return;
                    };
                    let Ok(mut upstream) = TcpStream::connect(authority).await else {
                        return;
                    };
                    if client
                        .write_all(b"HTTP/1.1 200 Connection Established\r\n\r\n")
                        .await
                        .is_err()
                    {
                        return;
                    }
                    let _ = tokio::io::copy_bidirectional(&mut client, &mut upstream).await;
                });
            }
        });

        addr
    }

    fn prober_for(proxy_addr: SocketAddr, config: ProbeConfig) -> Prober {
        let pool = Arc::new(ProxyPool::new(vec![ProxyEndpoint::parse(
            &proxy_addr.to_string(),
        )
        .unwrap()]));
        Prober::new(pool, config)
    }

    #[tokio::test]
    async fn test_probe_returns_bounded_body_prefix() {
        // Serve far more than the cap; the probe must not retain it all.
        let server_addr = spawn_tls_server(64 * 1024, true).await;
        let proxy_addr = spawn_connect_proxy().await;

        let config = ProbeConfig {
            allow_untrusted_certificates: true,
            ..ProbeConfig::default()
        };
        let prober = prober_for(proxy_addr, config);

        let target = Url::parse(&format!("https://{}/", server_addr)).unwrap();
        let result = prober
            .probe(&target, FingerprintProfile::Chrome)
            .await
            .unwrap();

        assert_eq!(result.status, 200);
        assert_eq!(result.body_prefix.len(), 2048);
        assert_eq!(result.fingerprint, "chrome_120");
        assert_eq!(result.protocol, "http/1.1");
        assert!(!result.contains_challenge_markers());
    }

    #[tokio::test]
    async fn test_probe_small_body_arrives_whole() {
        let server_addr = spawn_tls_server(10, true).await;
        let proxy_addr = spawn_connect_proxy().await;

        let config = ProbeConfig {
            allow_untrusted_certificates: true,
            ..ProbeConfig::default()
        };
        let prober = prober_for(proxy_addr, config);

        let target = Url::parse(&format!("https://{}/", server_addr)).unwrap();
        let result = prober
            .probe(&target, FingerprintProfile::Safari)
            .await
            .unwrap();

        assert_eq!(result.status, 200);
        assert_eq!(result.body_prefix, "a".repeat(10));
        assert_eq!(result.fingerprint, "safari_17");
    }

    #[tokio::test]
    async fn test_probe_rejects_non_https_target() {
        let proxy_addr = spawn_connect_proxy().await;
        let prober = prober_for(proxy_addr, ProbeConfig::default());

        let target = Url::parse("http://example.com/").unwrap();
        let err = prober
            .probe(&target, FingerprintProfile::Chrome)
            .await
            .unwrap_err();
        assert!(matches!(err, GuiseError::InvalidTarget(_)));
    }

    #[tokio::test]
    async fn test_probe_empty_pool_is_fatal() {
        let prober = Prober::new(Arc::new(ProxyPool::new(Vec::new())), ProbeConfig::default());
        let target = Url::parse("https://example.com/").unwrap();
        let err = prober
            .probe(&target, FingerprintProfile::Chrome)
            .await
            .unwrap_err();
        assert!(matches!(err, GuiseError::EmptyPool));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_probe_stalled_response_times_out() {
        let server_addr = spawn_tls_server(0, false).await;
        let proxy_addr = spawn_connect_proxy().await;

        let config = ProbeConfig {
            request_timeout: 1,
            allow_untrusted_certificates: true,
            ..ProbeConfig::default()
        };
        let prober = prober_for(proxy_addr, config);

        let target = Url::parse(&format!("https://{}/", server_addr)).unwrap();
        let err = prober
            .probe(&target, FingerprintProfile::Firefox)
            .await
            .unwrap_err();
        assert!(matches!(err, GuiseError::RequestTimeout));
    }
}
