//! Immutable proxy pool with uniform-random selection

use rand::seq::SliceRandom;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use crate::error::{GuiseError, Result};
use crate::models::ProxyEndpoint;

/// Fixed set of upstream proxies, built once at startup.
///
/// Selection is uniform and memoryless; repeated picks across probes are
/// expected. The pool itself is never mutated after construction, so
/// `select` is safe to call from concurrent probes.
#[derive(Debug, Clone)]
pub struct ProxyPool {
    endpoints: Vec<Arc<ProxyEndpoint>>,
}

impl ProxyPool {
    pub fn new(endpoints: Vec<ProxyEndpoint>) -> Self {
        Self {
            endpoints: endpoints.into_iter().map(Arc::new).collect(),
        }
    }

    /// Build a pool from proxy-list lines.
    ///
    /// Blank lines are ignored; unparseable lines are skipped with a warning
    /// rather than failing the whole load.
    pub fn from_lines<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut endpoints = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            match ProxyEndpoint::parse(line) {
                Ok(ep) => endpoints.push(Arc::new(ep)),
                Err(e) => warn!("Skipping proxy line: {}", e),
            }
        }
        Self { endpoints }
    }

    /// Load a pool from a UTF-8 proxy list file, one proxy per line
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path.as_ref()).await?;
        Ok(Self::from_lines(contents.lines()))
    }

    /// Pick one proxy uniformly at random.
    ///
    /// The RNG is thread-local; there is no shared cursor to race on.
    pub fn select(&self) -> Result<Arc<ProxyEndpoint>> {
        self.endpoints
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(GuiseError::EmptyPool)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
