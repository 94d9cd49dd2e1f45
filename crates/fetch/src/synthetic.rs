//! Sources answered without a transport: `data:` URLs and built-in `about:` pages.

use base64::{engine::general_purpose, Engine as _};
use percent_encoding::percent_decode_str;
use url::Url;

use crate::transport::TransportEvent;

const DEFAULT_DATA_CONTENT_TYPE: &str = "text/plain;charset=US-ASCII";

/// A decoded `data:` URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Decode a `data:` URL. Undecodable base64 yields an empty body.
pub fn decode_data_url(url: &Url) -> DataUrl {
    let raw = url.as_str();
    let payload = raw.get("data:".len()..).unwrap_or_default();

    let (content_type, data, is_base64) = match payload.find(',') {
        Some(0) => (DEFAULT_DATA_CONTENT_TYPE.to_string(), &payload[1..], false),
        Some(index) => {
            let header = payload[..index].to_ascii_lowercase();
            let mut is_base64 = false;
            let params: Vec<&str> = header
                .split(';')
                .filter(|part| {
                    let base64 = part.trim() == "base64";
                    is_base64 |= base64;
                    !base64
                })
                .collect();
            let content_type = params.join(";");
            let content_type = if content_type.trim().is_empty() {
                DEFAULT_DATA_CONTENT_TYPE.to_string()
            } else {
                content_type
            };
            (content_type, &payload[index + 1..], is_base64)
        }
        None => (DEFAULT_DATA_CONTENT_TYPE.to_string(), payload, false),
    };

    let mut body: Vec<u8> = percent_decode_str(data).collect();

    if is_base64 {
        body.retain(|b| !b.is_ascii_whitespace());
        body = general_purpose::STANDARD
            .decode(&body)
            .or_else(|_| {
                let unpadded: Vec<u8> = body.iter().copied().filter(|&b| b != b'=').collect();
                general_purpose::STANDARD_NO_PAD.decode(unpadded)
            })
            .unwrap_or_default();
    }

    DataUrl { content_type, body }
}

/// The event stream a transport would have produced for a `data:` URL
pub fn data_url_events(url: &Url) -> Vec<TransportEvent> {
    let decoded = decode_data_url(url);
    let status = if decoded.body.is_empty() { 404 } else { 200 };
    vec![
        TransportEvent::open(status, ""),
        TransportEvent::header("Content-Type", &decoded.content_type),
        TransportEvent::header("Content-Length", &decoded.body.len().to_string()),
        TransportEvent::data(decoded.body),
        TransportEvent::Done,
    ]
}

/// Counters shown on `about:memory`
#[derive(Debug, Clone, Copy, Default)]
pub struct AboutStats {
    pub jobs: usize,
    pub credentials: usize,
    pub scheduled_tasks: usize,
}

fn about_target(url: &Url) -> &str {
    url.as_str().get("about:".len()..).unwrap_or_default()
}

/// Whether an `about:` URL is answered internally
pub fn is_about_handled(url: &Url, debug_pages: bool) -> bool {
    let what = about_target(url).to_ascii_lowercase();
    match what.as_str() {
        "" | "blank" | "credits" | "version" => true,
        "config" | "build" | "memory" => debug_pages,
        _ => false,
    }
}

/// Render an internal `about:` page, or `None` when it is not one of ours
pub fn about_page(url: &Url, debug_pages: bool, stats: AboutStats) -> Option<String> {
    if !is_about_handled(url, debug_pages) {
        return None;
    }

    let page = match about_target(url).to_ascii_lowercase().as_str() {
        "" | "blank" => String::new(),
        "credits" => "<html><head><title>Open Source Credits</title>\
             <meta name=\"viewport\" content=\"width=device-width, user-scalable=no\"></head>\
             <body><p>Citadel fetch pipeline, built on tokio, reqwest and url.</p></body></html>"
            .to_string(),
        "version" => format!(
            "<html><head><meta name=\"viewport\" content=\"width=device-width, user-scalable=no\"></head>\
             <body>{} {}</body></html>",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ),
        "config" => format!(
            "<html><head><title>Configuration</title></head><body><pre>{:#?}</pre></body></html>",
            stats
        ),
        "build" => format!(
            "<html><head><title>Build Information</title></head><body><pre>{} {}\n{}</pre></body></html>",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_DESCRIPTION")
        ),
        "memory" => format!(
            "<html><head><title>Memory</title></head><body>\
             <p>Network jobs: {}</p><p>Stored credentials: {}</p><p>Scheduled tasks: {}</p>\
             </body></html>",
            stats.jobs, stats.credentials, stats.scheduled_tasks
        ),
        _ => return None,
    };
    Some(page)
}

/// The event stream for an internal `about:` page
pub fn about_events(page: String) -> Vec<TransportEvent> {
    vec![
        TransportEvent::open(200, ""),
        TransportEvent::header("Content-Length", &page.len().to_string()),
        TransportEvent::header("Content-Type", "text/html"),
        TransportEvent::data(page.into_bytes()),
        TransportEvent::Done,
    ]
}
