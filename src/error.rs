use thiserror::Error;

/// Unified error type for the Guise probe client
#[derive(Error, Debug)]
pub enum GuiseError {
    // Pool errors
    #[error("Proxy pool is empty")]
    EmptyPool,

    #[error("Invalid proxy line: {0}")]
    ProxyParse(String),

    // Dial errors
    #[error("Proxy unreachable: {0}")]
    ProxyUnreachable(String),

    #[error("Proxy rejected credentials: {0}")]
    ProxyAuth(String),

    #[error("Malformed proxy handshake: {0}")]
    ProxyProtocol(String),

    #[error("Proxy dial timed out")]
    DialTimeout,

    // TLS errors
    #[error("TLS handshake failed: {0}")]
    Handshake(String),

    // Request errors
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Request timed out")]
    RequestTimeout,

    #[error("Invalid target URL: {0}")]
    InvalidTarget(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Guise operations
pub type Result<T> = std::result::Result<T, GuiseError>;

impl GuiseError {
    /// Check whether this error should abort the whole run.
    ///
    /// Everything else aborts only the current probe; the caller decides
    /// whether to try again with a different proxy or profile.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GuiseError::EmptyPool | GuiseError::InvalidConfig(_) | GuiseError::InvalidTarget(_)
        )
    }

    /// Check whether this error happened before any bytes reached the target
    pub fn is_dial_error(&self) -> bool {
        matches!(
            self,
            GuiseError::ProxyUnreachable(_)
                | GuiseError::ProxyAuth(_)
                | GuiseError::ProxyProtocol(_)
                | GuiseError::DialTimeout
        )
    }
}

// Convert from hyper errors
impl From<hyper::Error> for GuiseError {
    fn from(err: hyper::Error) -> Self {
        GuiseError::Request(err.to_string())
    }
}

// Convert from URL parse errors
impl From<url::ParseError> for GuiseError {
    fn from(err: url::ParseError) -> Self {
        GuiseError::InvalidTarget(err.to_string())
    }
}
