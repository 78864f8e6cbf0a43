use serde::Serialize;

/// Outcome of one probe, surfaced to the caller for logging/inspection
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    /// HTTP status code returned by the target
    pub status: u16,
    /// Response body prefix, truncated to the configured cap
    pub body_prefix: String,
    /// Proxy the probe was tunneled through (credentials omitted)
    pub proxy: String,
    /// Fingerprint descriptor the handshake used
    pub fingerprint: &'static str,
    /// Negotiated application protocol ("h2" or "http/1.1")
    pub protocol: &'static str,
    /// Wall-clock time for the whole probe
    pub elapsed_ms: u128,
}

impl ProbeResult {
    /// Heuristic scan of the body prefix for anti-bot interstitial markers
    pub fn contains_challenge_markers(&self) -> bool {
        let body = self.body_prefix.to_lowercase();
        body.contains("captcha") || body.contains("challenge")
    }
}
