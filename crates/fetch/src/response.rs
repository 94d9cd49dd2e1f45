use std::collections::HashMap;

use url::Url;

/// HTTP response status code categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    /// 1xx - Informational
    Informational,
    /// 2xx - Success
    Success,
    /// 3xx - Redirection
    Redirection,
    /// 4xx - Client Error
    ClientError,
    /// 5xx - Server Error
    ServerError,
    /// Unknown status code
    Unknown,
}

/// Interim 1xx statuses, which never become the response
pub fn is_informational(status: i32) -> bool {
    (100..200).contains(&status)
}

/// Statuses that send the job down the redirect path. 304 is a cache answer, not a redirect.
pub fn is_redirect(status: i32) -> bool {
    (300..400).contains(&status) && status != 304
}

/// Statuses that carry an authentication challenge
pub fn is_unauthorized(status: i32) -> bool {
    status == 401 || status == 407
}

/// Error classification for an extended status.
///
/// Transport failures are always errors. HTTP 4xx/5xx are errors unless the
/// request is script-driven, in which case the script inspects the status.
pub fn is_error(status: i32, script_driven: bool) -> bool {
    status < 0 || (!script_driven && (400..600).contains(&status))
}

/// Response metadata handed to the consumer before any body bytes
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code
    status: u16,

    /// Reason phrase
    status_text: String,

    /// Response headers
    headers: HashMap<String, String>,

    /// Resolved MIME type
    mime_type: Option<String>,

    /// Character encoding from Content-Type
    text_encoding: Option<String>,

    /// Filename offered for downloads
    suggested_filename: Option<String>,

    /// Content-Length when the server sent one
    expected_content_length: Option<u64>,

    /// URL this response belongs to
    url: Url,

    /// Whether the transport flagged the content as WML
    is_wml: bool,
}

impl Response {
    /// Creates an empty response for a URL
    pub fn new(url: Url) -> Self {
        Self {
            status: 0,
            status_text: String::new(),
            headers: HashMap::new(),
            mime_type: None,
            text_encoding: None,
            suggested_filename: None,
            expected_content_length: None,
            url,
            is_wml: false,
        }
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    pub fn set_status_text(&mut self, text: &str) {
        self.status_text = text.to_string();
    }

    /// Set a header, replacing any existing value with the same name
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
        self.headers.insert(name.to_string(), value.to_string());
    }

    pub fn set_mime_type(&mut self, mime_type: Option<String>) {
        self.mime_type = mime_type;
    }

    pub fn set_text_encoding(&mut self, encoding: Option<String>) {
        self.text_encoding = encoding;
    }

    pub fn set_suggested_filename(&mut self, filename: Option<String>) {
        self.suggested_filename = filename;
    }

    pub fn set_expected_content_length(&mut self, length: Option<u64>) {
        self.expected_content_length = length;
    }

    pub fn set_is_wml(&mut self, is_wml: bool) {
        self.is_wml = is_wml;
    }

    /// Get the HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Get the HTTP status category
    pub fn status_category(&self) -> StatusCategory {
        match self.status {
            100..=199 => StatusCategory::Informational,
            200..=299 => StatusCategory::Success,
            300..=399 => StatusCategory::Redirection,
            400..=499 => StatusCategory::ClientError,
            500..=599 => StatusCategory::ServerError,
            _ => StatusCategory::Unknown,
        }
    }

    /// Check if the response was successful (2xx status code)
    pub fn is_success(&self) -> bool {
        self.status_category() == StatusCategory::Success
    }

    /// Get all response headers
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

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn text_encoding(&self) -> Option<&str> {
        self.text_encoding.as_deref()
    }

    pub fn suggested_filename(&self) -> Option<&str> {
        self.suggested_filename.as_deref()
    }

    pub fn expected_content_length(&self) -> Option<u64> {
        self.expected_content_length
    }

    /// Get the URL of the response
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_wml(&self) -> bool {
        self.is_wml
    }
}
