//! Browser fingerprint catalogue
//!
//! Each descriptor pins the outward-observable handshake shape of one real
//! browser build: TLS 1.2 cipher order (the TLS 1.3 trio is fixed by
//! BoringSSL and always offered first), supported groups, signature
//! algorithms, ALPN, and whether GREASE values are injected. Descriptors are
//! static data; the crate never builds one at runtime.

use rand::seq::SliceRandom;

/// Requested browser identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FingerprintProfile {
    Chrome,
    Firefox,
    Safari,
    #[default]
    Random,
}

impl FingerprintProfile {
    /// Parse a requested profile name.
    ///
    /// Case-insensitive; anything that is not a known browser name —
    /// including the empty string and "random" — selects `Random`. Unknown
    /// input is deliberately not an error.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "chrome" => Self::Chrome,
            "firefox" => Self::Firefox,
            "safari" => Self::Safari,
            _ => Self::Random,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chrome => "chrome",
            Self::Firefox => "firefox",
            Self::Safari => "safari",
            Self::Random => "random",
        }
    }
}

impl std::fmt::Display for FingerprintProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One versioned handshake shape
#[derive(Debug)]
pub struct FingerprintDescriptor {
    pub id: &'static str,
    /// TLS 1.2 cipher suites in ClientHello order, OpenSSL names
    pub cipher_suites: &'static [&'static str],
    /// Supported groups (curves) in preference order
    pub groups: &'static [&'static str],
    /// Signature algorithms in preference order
    pub signature_algorithms: &'static [&'static str],
    /// Advertised ALPN protocols
    pub alpn: &'static [&'static str],
    /// Whether GREASE values are injected (RFC 8701)
    pub grease: bool,
    /// Matching User-Agent header for the HTTP layer
    pub user_agent: &'static str,
}

pub static CHROME_120: FingerprintDescriptor = FingerprintDescriptor {
    id: "chrome_120",
    cipher_suites: &[
        "ECDHE-ECDSA-AES128-GCM-SHA256",
        "ECDHE-RSA-AES128-GCM-SHA256",
        "ECDHE-ECDSA-AES256-GCM-SHA384",
        "ECDHE-RSA-AES256-GCM-SHA384",
        "ECDHE-ECDSA-CHACHA20-POLY1305",
        "ECDHE-RSA-CHACHA20-POLY1305",
        "ECDHE-RSA-AES128-SHA",
        "ECDHE-RSA-AES256-SHA",
        "AES128-GCM-SHA256",
        "AES256-GCM-SHA384",
        "AES128-SHA",
        "AES256-SHA",
    ],
    groups: &["X25519", "P-256", "P-384"],
    signature_algorithms: &[
        "ECDSA+SHA256",
        "RSA-PSS+SHA256",
        "RSA+SHA256",
        "ECDSA+SHA384",
        "RSA-PSS+SHA384",
        "RSA+SHA384",
        "RSA-PSS+SHA512",
        "RSA+SHA512",
    ],
    alpn: &["h2", "http/1.1"],
    grease: true,
    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
};

pub static FIREFOX_121: FingerprintDescriptor = FingerprintDescriptor {
    id: "firefox_121",
    cipher_suites: &[
        "ECDHE-ECDSA-AES128-GCM-SHA256",
        "ECDHE-RSA-AES128-GCM-SHA256",
        "ECDHE-ECDSA-CHACHA20-POLY1305",
        "ECDHE-RSA-CHACHA20-POLY1305",
        "ECDHE-ECDSA-AES256-GCM-SHA384",
        "ECDHE-RSA-AES256-GCM-SHA384",
        "ECDHE-ECDSA-AES256-SHA",
        "ECDHE-ECDSA-AES128-SHA",
        "ECDHE-RSA-AES128-SHA",
        "ECDHE-RSA-AES256-SHA",
        "AES128-GCM-SHA256",
        "AES256-GCM-SHA384",
        "AES128-SHA",
        "AES256-SHA",
    ],
    groups: &["X25519", "P-256", "P-384", "P-521"],
    signature_algorithms: &[
        "ECDSA+SHA256",
        "ECDSA+SHA384",
        "ECDSA+SHA512",
        "ed25519",
        "RSA-PSS+SHA256",
        "RSA-PSS+SHA384",
        "RSA-PSS+SHA512",
        "RSA+SHA256",
        "RSA+SHA384",
        "RSA+SHA512",
    ],
    alpn: &["h2", "http/1.1"],
    grease: false,
    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) \
                 Gecko/20100101 Firefox/121.0",
};

pub static SAFARI_17: FingerprintDescriptor = FingerprintDescriptor {
    id: "safari_17",
    cipher_suites: &[
        "ECDHE-ECDSA-AES256-GCM-SHA384",
        "ECDHE-ECDSA-AES128-GCM-SHA256",
        "ECDHE-RSA-AES256-GCM-SHA384",
        "ECDHE-RSA-AES128-GCM-SHA256",
        "ECDHE-ECDSA-CHACHA20-POLY1305",
        "ECDHE-RSA-CHACHA20-POLY1305",
        "ECDHE-ECDSA-AES256-SHA",
        "ECDHE-ECDSA-AES128-SHA",
        "ECDHE-RSA-AES256-SHA",
        "ECDHE-RSA-AES128-SHA",
        "AES256-GCM-SHA384",
        "AES128-GCM-SHA256",
        "AES256-SHA",
        "AES128-SHA",
    ],
    groups: &["X25519", "P-256", "P-384", "P-521"],
    signature_algorithms: &[
        "ECDSA+SHA256",
        "RSA-PSS+SHA256",
        "RSA+SHA256",
        "ECDSA+SHA384",
        "RSA-PSS+SHA384",
        "RSA+SHA384",
        "RSA-PSS+SHA512",
        "RSA+SHA512",
    ],
    alpn: &["h2", "http/1.1"],
    grease: true,
    user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_2) AppleWebKit/605.1.15 \
                 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
};

/// The concrete descriptors `Random` draws from
static CATALOGUE: [&FingerprintDescriptor; 3] = [&CHROME_120, &FIREFOX_121, &SAFARI_17];

/// Resolve a profile to one concrete descriptor.
///
/// Total: `Random` picks uniformly among the catalogue, the browser
/// variants map to their fixed descriptor.
pub fn resolve(profile: FingerprintProfile) -> &'static FingerprintDescriptor {
    match profile {
        FingerprintProfile::Chrome => &CHROME_120,
        FingerprintProfile::Firefox => &FIREFOX_121,
        FingerprintProfile::Safari => &SAFARI_17,
        FingerprintProfile::Random => CATALOGUE
            .choose(&mut rand::thread_rng())
            .copied()
            .expect("catalogue is non-empty"),
    }
}

/// Resolve a requested profile name directly
pub fn resolve_name(name: &str) -> &'static FingerprintDescriptor {
    resolve(FingerprintProfile::from_str(name))
}
