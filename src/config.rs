use crate::error::{GuiseError, Result};
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Per-probe transport configuration
    pub probe: ProbeConfig,
    /// Run orchestration (target, request count, pacing)
    pub run: RunConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Timeout for the proxy dial (TCP connect + proxy handshake), seconds
    pub connect_timeout: u64,
    /// End-to-end timeout for one probe, seconds
    pub request_timeout: u64,
    /// Maximum number of response-body bytes retained per probe
    pub body_cap: usize,
    /// Skip certificate-chain and hostname verification during the
    /// fingerprinted handshake. Off by default; probes against targets with
    /// self-signed or mismatched certificates need it on.
    pub allow_untrusted_certificates: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            connect_timeout: 10,
            request_timeout: 20,
            body_cap: 2048,
            allow_untrusted_certificates: false,
        }
    }
}

impl ProbeConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Target URL each probe requests
    pub target_url: String,
    /// Path to the proxy list file (one `user:pass@host:port` per line)
    pub proxy_file: String,
    /// Number of probes to issue
    pub requests: u32,
    /// Requested fingerprint profile (chrome, firefox, safari, random)
    pub profile: String,
    /// Pause between consecutive probes, milliseconds
    pub pause_ms: u64,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            probe: ProbeConfig {
                connect_timeout: get_env_or("GUISE_CONNECT_TIMEOUT", "10")
                    .parse()
                    .map_err(|_| {
                        GuiseError::InvalidConfig(
                            "GUISE_CONNECT_TIMEOUT must be a number of seconds".into(),
                        )
                    })?,
                request_timeout: get_env_or("GUISE_REQUEST_TIMEOUT", "20")
                    .parse()
                    .map_err(|_| {
                        GuiseError::InvalidConfig(
                            "GUISE_REQUEST_TIMEOUT must be a number of seconds".into(),
                        )
                    })?,
                body_cap: get_env_or("GUISE_BODY_CAP", "2048").parse().map_err(|_| {
                    GuiseError::InvalidConfig("GUISE_BODY_CAP must be a byte count".into())
                })?,
                allow_untrusted_certificates: get_env_or("GUISE_ALLOW_UNTRUSTED_CERTS", "false")
                    .parse()
                    .unwrap_or(false),
            },
            run: RunConfig {
                target_url: get_env_or("GUISE_TARGET_URL", "https://httpbin.org/get"),
                proxy_file: get_env_or("GUISE_PROXY_FILE", "proxies.txt"),
                requests: get_env_or("GUISE_REQUESTS", "1").parse().map_err(|_| {
                    GuiseError::InvalidConfig("GUISE_REQUESTS must be a number".into())
                })?,
                profile: get_env_or("GUISE_TLS_PROFILE", "random"),
                pause_ms: get_env_or("GUISE_PAUSE_MS", "1000").parse().unwrap_or(1000),
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "pretty"),
            },
        })
    }
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const CONFIG_ENV_KEYS: &[&str] = &[
        "GUISE_CONNECT_TIMEOUT",
        "GUISE_REQUEST_TIMEOUT",
        "GUISE_BODY_CAP",
        "GUISE_ALLOW_UNTRUSTED_CERTS",
        "GUISE_TARGET_URL",
        "GUISE_PROXY_FILE",
        "GUISE_REQUESTS",
        "GUISE_TLS_PROFILE",
        "GUISE_PAUSE_MS",
        "LOG_LEVEL",
        "LOG_FORMAT",
    ];

    struct EnvGuard {
        saved: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(keys: &[&str]) -> Self {
            let saved = keys
                .iter()
                .map(|&key| {
                    let old = env::var(key).ok();
                    env::remove_var(key);
                    (key.to_string(), old)
                })
                .collect();

            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.saved.drain(..) {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }

    #[test]
    fn test_config_from_env_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        let config = Config::from_env().unwrap();

        assert_eq!(config.probe.connect_timeout, 10);
        assert_eq!(config.probe.request_timeout, 20);
        assert_eq!(config.probe.body_cap, 2048);
        assert!(!config.probe.allow_untrusted_certificates);

        assert_eq!(config.run.target_url, "https://httpbin.org/get");
        assert_eq!(config.run.proxy_file, "proxies.txt");
        assert_eq!(config.run.requests, 1);
        assert_eq!(config.run.profile, "random");
        assert_eq!(config.run.pause_ms, 1000);
    }

    #[test]
    fn test_config_from_env_overrides() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("GUISE_CONNECT_TIMEOUT", "5");
        env::set_var("GUISE_BODY_CAP", "512");
        env::set_var("GUISE_ALLOW_UNTRUSTED_CERTS", "true");
        env::set_var("GUISE_TARGET_URL", "https://example.com/");
        env::set_var("GUISE_REQUESTS", "25");
        env::set_var("GUISE_TLS_PROFILE", "firefox");

        let config = Config::from_env().unwrap();

        assert_eq!(config.probe.connect_timeout, 5);
        assert_eq!(config.probe.body_cap, 512);
        assert!(config.probe.allow_untrusted_certificates);
        assert_eq!(config.run.target_url, "https://example.com/");
        assert_eq!(config.run.requests, 25);
        assert_eq!(config.run.profile, "firefox");
    }

    #[test]
    fn test_config_from_env_invalid_numbers() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("GUISE_REQUESTS", "many");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, GuiseError::InvalidConfig(_)));
        env::remove_var("GUISE_REQUESTS");

        env::set_var("GUISE_BODY_CAP", "-1");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, GuiseError::InvalidConfig(_)));
    }

    #[test]
    fn test_timeout_durations() {
        let probe = ProbeConfig::default();
        assert_eq!(probe.connect_timeout(), Duration::from_secs(10));
        assert_eq!(probe.request_timeout(), Duration::from_secs(20));
    }
}
