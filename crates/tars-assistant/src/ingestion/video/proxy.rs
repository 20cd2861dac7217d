//! Egress proxy pool for transcript retries

use rand::seq::SliceRandom;

use crate::http::ProxyEndpoint;

/// Candidate proxies, tried in random order
#[derive(Debug, Clone, Default)]
pub struct ProxyPool {
    proxies: Vec<ProxyEndpoint>,
}

impl ProxyPool {
    /// Build from configured URLs, ignoring blanks and duplicates
    pub fn from_urls<S: AsRef<str>>(urls: &[S]) -> Self {
        let mut proxies: Vec<ProxyEndpoint> = Vec::new();
        for url in urls {
            let url = url.as_ref().trim();
            if url.is_empty() || proxies.iter().any(|p| p.url() == url) {
                continue;
            }
            proxies.push(ProxyEndpoint::new(url));
        }
        Self { proxies }
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Every proxy exactly once, in a fresh random order
    pub fn shuffled(&self) -> Vec<ProxyEndpoint> {
        let mut order = self.proxies.clone();
        order.shuffle(&mut rand::thread_rng());
        order
    }

    /// One random proxy
    pub fn pick(&self) -> Option<ProxyEndpoint> {
        self.proxies.choose(&mut rand::thread_rng()).cloned()
    }
}
