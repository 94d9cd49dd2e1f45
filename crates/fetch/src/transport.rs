//! The boundary between network jobs and whatever moves the bytes.
//!
//! A [`TransportFactory`] opens one [`TransportStream`] per job. The stream
//! reports its lifecycle as [`TransportEvent`]s through an [`EventSink`],
//! which may be used from any thread; the events are only ever handled on
//! the cooperative thread that drives the `NetworkManager`.

use std::fmt;

use bytes::Bytes;
use tokio::sync::mpsc::UnboundedSender;

use crate::credentials::{AuthChallenge, AuthScheme, ServerType};
use crate::error::NetworkError;
use crate::headers::decode_header_bytes;
use crate::request::Request;

/// Native transport status codes. Zero is success, negative values are failures below HTTP.
pub mod status {
    pub const SUCCESS: i32 = 0;
    pub const NETWORK_ERROR: i32 = -1;
    pub const DNS_ERROR: i32 = -2;
    pub const CONNECT_ERROR: i32 = -3;
    pub const TLS_ERROR: i32 = -4;
    pub const TIMEOUT: i32 = -5;
    pub const TOO_MANY_REDIRECTS: i32 = -6;
}

/// Pseudo-header carrying an FTP reply line ("530 Login incorrect")
pub const FTP_STATUS_HEADER: &str = "x-ftp-status";

/// Pseudo-header carrying the transport's content-sniffed MIME type
pub const SNIFFED_MIME_TYPE_HEADER: &str = "x-sniffed-mime-type";

/// Registry key of a network job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// One lifecycle notification from a transport stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Open { status: i32, message: String },
    WmlOverride,
    Header { key: String, value: String },
    Data(Bytes),
    DataSent { sent: u64, total: u64 },
    Done,
}

impl TransportEvent {
    pub fn open(status: i32, message: &str) -> Self {
        TransportEvent::Open {
            status,
            message: message.to_string(),
        }
    }

    pub fn header(key: &str, value: &str) -> Self {
        TransportEvent::Header {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    /// Build a header event from raw bytes.
    ///
    /// `Location` is tried as UTF-8 first since some servers send it that
    /// way; everything else is taken as Latin-1.
    pub fn header_bytes(key: &str, raw: &[u8]) -> Self {
        let value = if key.eq_ignore_ascii_case("location") {
            decode_header_bytes(raw)
        } else {
            raw.iter().map(|&b| b as char).collect()
        };
        TransportEvent::Header {
            key: key.to_string(),
            value,
        }
    }

    pub fn data(bytes: impl Into<Bytes>) -> Self {
        TransportEvent::Data(bytes.into())
    }
}

/// How an attached credential must be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    HttpBasic,
    HttpDigest,
    HttpNtlm,
    Ftp,
}

/// Credential the transport should present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedCredential {
    pub user: String,
    pub password: String,
    pub auth_type: AuthType,
}

impl AttachedCredential {
    /// Map a challenge onto the transport's auth type. Default-scheme HTTP spaces send nothing.
    pub fn from_challenge(challenge: &AuthChallenge) -> Option<Self> {
        let space = &challenge.protection_space;
        let auth_type = match (space.server_type, space.scheme) {
            (ServerType::Http, AuthScheme::Basic) => AuthType::HttpBasic,
            (ServerType::Http, AuthScheme::Digest) => AuthType::HttpDigest,
            (ServerType::Http, AuthScheme::Ntlm) => AuthType::HttpNtlm,
            (ServerType::Http, AuthScheme::Default) => return None,
            (ServerType::Ftp, _) => AuthType::Ftp,
        };
        Some(Self {
            user: challenge.credential.user.clone(),
            password: challenge.credential.password.clone(),
            auth_type,
        })
    }
}

/// The outbound request as the transport sees it
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub request: Request,
    pub credential: Option<AttachedCredential>,
    pub cookie: Option<String>,
}

/// Sending half of the manager's event channel, bound to one job
#[derive(Debug, Clone)]
pub struct EventSink {
    job: JobId,
    tx: UnboundedSender<(JobId, TransportEvent)>,
}

impl EventSink {
    pub(crate) fn new(job: JobId, tx: UnboundedSender<(JobId, TransportEvent)>) -> Self {
        Self { job, tx }
    }

    pub fn job(&self) -> JobId {
        self.job
    }

    pub fn send(&self, event: TransportEvent) {
        if self.tx.send((self.job, event)).is_err() {
            log::trace!("Network manager gone, dropping event for {}", self.job);
        }
    }

    pub fn open(&self, status: i32, message: &str) {
        self.send(TransportEvent::open(status, message));
    }

    pub fn header(&self, key: &str, value: &str) {
        self.send(TransportEvent::header(key, value));
    }

    pub fn data(&self, bytes: impl Into<Bytes>) {
        self.send(TransportEvent::data(bytes));
    }

    pub fn data_sent(&self, sent: u64, total: u64) {
        self.send(TransportEvent::DataSent { sent, total });
    }

    pub fn done(&self) {
        self.send(TransportEvent::Done);
    }
}

/// A running connection or local loader
pub trait TransportStream {
    /// Stop producing events. Called at most once.
    fn cancel(&mut self);

    /// Hold off reading from the network until unpaused. Events already
    /// produced still arrive.
    fn pause(&mut self, _paused: bool) {}
}

/// Opens transport streams for jobs
pub trait TransportFactory {
    fn open(&self, request: &TransportRequest, sink: EventSink) -> Result<Box<dyn TransportStream>, NetworkError>;
}
