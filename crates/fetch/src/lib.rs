pub mod consumer;
pub mod cookies;
pub mod credentials;
mod deferred;
pub mod error;
pub mod headers;
pub mod http_transport;
pub mod job;
pub mod manager;
pub mod request;
pub mod response;
pub mod scheduler;
pub mod synthetic;
pub mod transport;

/// Re-export common types for easier usage
pub use consumer::{ConsumerId, LoadControl, ResourceConsumer, SharedConsumer};
pub use cookies::{CookieJar, CookiePolicy, CookieStore};
pub use credentials::{AuthScheme, Credential, CredentialPersistence, CredentialStore, ProtectionSpace, ServerType};
pub use error::{HeaderParseError, NetworkError};
pub use http_transport::HttpTransportFactory;
pub use job::{JobPhase, JobState, NetworkJob, Resolution};
pub use manager::NetworkManager;
pub use request::{Method, Request, TargetType};
pub use response::Response;
pub use transport::{EventSink, JobId, TransportEvent, TransportFactory, TransportRequest, TransportStream};

/// Redirects followed before a load fails with `TooManyRedirects`
pub const REDIRECT_MAXIMUM: u32 = 10;

/// Bytes of deferred data delivered per scheduler turn
pub const DEFERRED_DATA_BUDGET: usize = 32 * 1024;

/// Central networking configuration
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    /// Redirect hops allowed before the load fails
    pub max_redirects: u32,
    /// Deferred data delivered per turn before yielding
    pub deferred_data_budget: usize,
    /// Serve the diagnostic `about:` pages (config, build, memory)
    pub debug_pages: bool,
    /// Which responses may set cookies
    pub cookie_policy: CookiePolicy,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_redirects: REDIRECT_MAXIMUM,
            deferred_data_budget: DEFERRED_DATA_BUDGET,
            debug_pages: cfg!(debug_assertions),
            cookie_policy: CookiePolicy::AcceptAll,
        }
    }
}
