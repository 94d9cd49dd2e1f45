use std::collections::HashMap;

use url::Url;

use crate::error::NetworkError;

/// Common HTTP methods understood by the fetch pipeline
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    HEAD,
    OPTIONS,
    CONNECT,
    TRACE,
    PATCH,
}

impl Method {
    /// Methods that survive a redirect unchanged
    pub fn is_safe_for_redirect(&self) -> bool {
        matches!(self, Method::GET | Method::HEAD)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::GET => write!(f, "GET"),
            Method::POST => write!(f, "POST"),
            Method::PUT => write!(f, "PUT"),
            Method::DELETE => write!(f, "DELETE"),
            Method::HEAD => write!(f, "HEAD"),
            Method::OPTIONS => write!(f, "OPTIONS"),
            Method::CONNECT => write!(f, "CONNECT"),
            Method::TRACE => write!(f, "TRACE"),
            Method::PATCH => write!(f, "PATCH"),
        }
    }
}

/// What the fetched resource is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetType {
    /// Top-level document
    MainFrame,
    /// Document loaded into a child frame
    SubFrame,
    /// Stylesheets, scripts, images and other subresources
    #[default]
    Subresource,
    /// Script-driven request; HTTP error statuses are left for the script to inspect
    XmlHttpRequest,
}

/// A request as issued by a resource consumer
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method
    method: Method,

    /// Target URL
    url: Url,

    /// Request headers
    headers: HashMap<String, String>,

    /// Request body
    body: Option<Vec<u8>>,

    /// What the resource is loaded for
    target_type: TargetType,

    /// Set on restarts so the embedder does not route the load elsewhere
    must_handle_internally: bool,

    /// URL of the document the cookie policy is evaluated against
    first_party_for_cookies: Option<Url>,

    /// Opaque value carried through to the transport
    token: u64,
}

impl Request {
    /// Create a new request with the specified method and URL
    pub fn new(method: Method, url: &str) -> Result<Self, NetworkError> {
        let url = Url::parse(url)?;
        Ok(Self::from_url(method, url))
    }

    /// Create a new request from an already parsed URL
    pub fn from_url(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
            body: None,
            target_type: TargetType::default(),
            must_handle_internally: false,
            first_party_for_cookies: None,
            token: 0,
        }
    }

    /// Set the request body
    pub fn with_body<T: AsRef<[u8]>>(mut self, body: T) -> Self {
        self.body = Some(body.as_ref().to_vec());
        self
    }

    /// Add a header to the request
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    /// Set what the resource is loaded for
    pub fn with_target_type(mut self, target_type: TargetType) -> Self {
        self.target_type = target_type;
        self
    }

    /// Set the first-party URL used by the cookie policy
    pub fn with_first_party_for_cookies(mut self, url: Url) -> Self {
        self.first_party_for_cookies = Some(url);
        self
    }

    /// Attach an opaque correlation token
    pub fn with_token(mut self, token: u64) -> Self {
        self.token = token;
        self
    }

    /// Replace a header, matching the name case-insensitively
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.remove_header(name);
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Remove a header, matching the name case-insensitively
    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
    }

    pub fn set_url(&mut self, url: Url) {
        self.url = url;
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    pub fn set_body(&mut self, body: Option<Vec<u8>>) {
        self.body = body;
    }

    pub fn set_must_handle_internally(&mut self, value: bool) {
        self.must_handle_internally = value;
    }

    /// Rewrite a redirected request so it is safe to replay against the new target.
    ///
    /// Anything other than GET/HEAD becomes a body-less GET.
    pub fn redirected_to(&self, url: Url) -> Request {
        let mut next = self.clone();
        next.url = url;
        next.must_handle_internally = true;

        if !next.method.is_safe_for_redirect() {
            next.method = Method::GET;
            next.body = None;
            next.remove_header("Content-Length");
            next.remove_header("Content-Type");
        }

        next
    }

    // Getters

    /// Get the request method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the request URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the request headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Get a specific header value
    pub fn header(&self, name: &str) -> Option<&String> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Get the request body
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn target_type(&self) -> TargetType {
        self.target_type
    }

    /// Whether HTTP error statuses are left to the calling script
    pub fn is_script_driven(&self) -> bool {
        self.target_type == TargetType::XmlHttpRequest
    }

    pub fn must_handle_internally(&self) -> bool {
        self.must_handle_internally
    }

    pub fn first_party_for_cookies(&self) -> Option<&Url> {
        self.first_party_for_cookies.as_ref()
    }

    pub fn token(&self) -> u64 {
        self.token
    }
}
