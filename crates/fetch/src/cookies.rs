use std::collections::HashMap;

use url::Url;

/// Which responses may set cookies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CookiePolicy {
    /// Accept cookies from every response
    #[default]
    AcceptAll,
    /// Only the main document's domain may introduce new cookies
    OnlyFromMainDocumentDomain,
}

/// Cookie storage consulted by network jobs
pub trait CookieStore {
    /// The `Cookie` header to send to a URL, if any cookie applies
    fn get_cookie_header(&mut self, url: &Url) -> Option<String>;

    /// Store the cookies carried by one `Set-Cookie` header
    fn set_cookies_from_header(&mut self, url: &Url, value: &str);

    /// Drop any precomputed header for the URL's host
    fn clear_cache_for_host(&mut self, url: &Url);
}

/// Minimal in-memory jar keyed by host, holding `name=value` pairs only
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: HashMap<String, Vec<(String, String)>>,
    header_cache: HashMap<String, String>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cookie_count(&self, host: &str) -> usize {
        self.cookies.get(host).map(Vec::len).unwrap_or(0)
    }

    /// Whether a header for this host is currently cached
    pub fn has_cached_header(&self, host: &str) -> bool {
        self.header_cache.contains_key(host)
    }
}

impl CookieStore for CookieJar {
    fn get_cookie_header(&mut self, url: &Url) -> Option<String> {
        let host = url.host_str()?;
        if let Some(cached) = self.header_cache.get(host) {
            return Some(cached.clone());
        }

        let pairs = self.cookies.get(host).filter(|pairs| !pairs.is_empty())?;
        let header = pairs
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        self.header_cache.insert(host.to_string(), header.clone());
        Some(header)
    }

    fn set_cookies_from_header(&mut self, url: &Url, value: &str) {
        let Some(host) = url.host_str() else {
            return;
        };
        let Some((name, value)) = value.split(';').next().and_then(|pair| pair.split_once('=')) else {
            log::debug!("Ignoring malformed Set-Cookie for {}", host);
            return;
        };
        let (name, value) = (name.trim().to_string(), value.trim().to_string());
        if name.is_empty() {
            return;
        }

        let pairs = self.cookies.entry(host.to_string()).or_default();
        match pairs.iter_mut().find(|(existing, _)| *existing == name) {
            Some(pair) => pair.1 = value,
            None => pairs.push((name, value)),
        }
    }

    fn clear_cache_for_host(&mut self, url: &Url) {
        if let Some(host) = url.host_str() {
            self.header_cache.remove(host);
        }
    }
}
