use std::rc::Rc;

use url::Url;

use crate::consumer::{ConsumerId, LoadControl, ResourceConsumer, ResourceHandle};
use crate::cookies::{CookiePolicy, CookieStore};
use crate::credentials::{
    parse_challenge, AuthChallenge, AuthScheme, CredentialStore, ProtectionSpace, ServerType,
};
use crate::deferred::{DeferredDelivery, DeferredQueue, DrainOutcome};
use crate::error::{HeaderParseError, NetworkError};
use crate::headers::{extract_charset, extract_mime_type, filename_from_content_disposition, mime_type_for_path};
use crate::request::Request;
use crate::response::{is_error, is_informational, is_redirect, is_unauthorized, Response};
use crate::scheduler::{Scheduler, TaskKind};
use crate::transport::{
    status, EventSink, JobId, TransportEvent, TransportFactory, TransportRequest, TransportStream,
    FTP_STATUS_HEADER, SNIFFED_MIME_TYPE_HEADER,
};
use crate::NetworkConfig;

const FTP_DIRECTORY_MIME_TYPE: &str = "application/x-ftp-directory";

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Cancelled,
    Done,
}

/// How a job ended, or is about to end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Success,
    /// Handed off to a job for the redirect target
    Redirecting,
    /// Handed off to a job carrying a credential
    Authenticating,
    Failed,
}

/// Where a job is in its fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Created,
    Opening,
    HeadersReceived,
    StreamingData,
    Resolved(Resolution),
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Network,
    Local,
    Data,
    About,
    Ftp,
}

impl Source {
    fn for_url(url: &Url) -> Self {
        match url.scheme() {
            "file" | "local" => Source::Local,
            "data" => Source::Data,
            "about" => Source::About,
            "ftp" => Source::Ftp,
            _ => Source::Network,
        }
    }
}

/// Services a job may touch while handling one event
pub(crate) struct JobContext<'a> {
    pub config: &'a NetworkConfig,
    pub credentials: &'a mut CredentialStore,
    pub cookies: &'a mut dyn CookieStore,
    pub scheduler: &'a mut Scheduler,
    pub restarts: &'a mut Vec<Restart>,
    pub completed: &'a mut Vec<JobId>,
}

/// A request handed back to the manager to be started as a fresh job
pub(crate) struct Restart {
    pub handle: ResourceHandle,
    pub request: Request,
    pub transport: Rc<dyn TransportFactory>,
    pub defer_count: u32,
    pub redirect_count: u32,
}

/// State machine for one fetch attempt
pub struct NetworkJob {
    id: JobId,
    handle: Option<ResourceHandle>,
    request: Request,
    response: Response,
    transport: Rc<dyn TransportFactory>,
    stream: Option<Box<dyn TransportStream>>,
    synthetic: Option<Vec<TransportEvent>>,
    source: Source,
    script_driven: bool,
    ftp_directory: bool,

    running: bool,
    cancelled: bool,
    status_received: bool,
    data_received: bool,
    response_sent: bool,

    // The native status. HTTP statuses pass through unchanged; transport
    // failures stay negative here while the response shows 404.
    extended_status: i32,

    redirect_count: u32,
    defer_count: u32,
    deferred: DeferredQueue,
    calling_client: bool,

    content_type: Option<String>,
    content_disposition: Option<String>,
    abandoned_realm: Option<String>,
    resolution: Option<Resolution>,
}

impl NetworkJob {
    pub(crate) fn new(
        id: JobId,
        handle: ResourceHandle,
        request: Request,
        transport: Rc<dyn TransportFactory>,
        defer_count: u32,
        redirect_count: u32,
    ) -> Self {
        let url = request.url().clone();
        let source = Source::for_url(&url);
        Self {
            id,
            handle: Some(handle),
            script_driven: request.is_script_driven(),
            request,
            response: Response::new(url),
            transport,
            stream: None,
            synthetic: None,
            source,
            ftp_directory: source == Source::Ftp,
            running: true,
            cancelled: false,
            status_received: false,
            data_received: false,
            response_sent: false,
            extended_status: 0,
            redirect_count,
            defer_count,
            deferred: DeferredQueue::new(),
            calling_client: false,
            content_type: None,
            content_disposition: None,
            abandoned_realm: None,
            resolution: None,
        }
    }

    /// Open the transport stream for the outbound request
    pub(crate) fn initialize(&mut self, request: &TransportRequest, sink: EventSink) -> Result<(), NetworkError> {
        let stream = self.transport.open(request, sink)?;
        self.stream = Some(stream);
        Ok(())
    }

    /// Arrange for a synthetic event stream to be played on a later turn
    pub(crate) fn load_later(&mut self, cx: &mut JobContext<'_>, events: Vec<TransportEvent>) {
        self.synthetic = Some(events);
        cx.scheduler.schedule(self.id, TaskKind::LoadSynthetic);
    }

    pub(crate) fn into_handle(self) -> Option<ResourceHandle> {
        self.handle
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// The consumer this job still reports to. `None` once detached.
    pub fn consumer_id(&self) -> Option<ConsumerId> {
        self.handle.as_ref().map(|h| h.id)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn is_deferring_loading(&self) -> bool {
        self.defer_count > 0
    }

    pub fn defer_count(&self) -> u32 {
        self.defer_count
    }

    pub fn redirect_count(&self) -> u32 {
        self.redirect_count
    }

    pub fn extended_status(&self) -> i32 {
        self.extended_status
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn state(&self) -> JobState {
        if self.cancelled {
            JobState::Cancelled
        } else if self.running {
            JobState::Running
        } else {
            JobState::Done
        }
    }

    pub fn phase(&self) -> JobPhase {
        if !self.running {
            return JobPhase::Done;
        }
        if let Some(resolution) = self.resolution {
            return JobPhase::Resolved(resolution);
        }
        if self.data_received {
            JobPhase::StreamingData
        } else if self.status_received {
            JobPhase::HeadersReceived
        } else if self.stream.is_some() || self.synthetic.is_some() {
            JobPhase::Opening
        } else {
            JobPhase::Created
        }
    }

    pub fn has_deferred_data(&self) -> bool {
        self.deferred.has_deferred_data()
    }

    fn client_is_ok(&self) -> bool {
        !self.cancelled && self.handle.is_some()
    }

    fn should_defer_loading(&self) -> bool {
        self.is_deferring_loading() || self.deferred.has_deferred_data()
    }

    /// Entry point for everything the transport reports
    pub(crate) fn handle_event(&mut self, cx: &mut JobContext<'_>, event: TransportEvent) {
        if !self.running {
            log::trace!("{} is finished, dropping {:?}", self.id, event);
            return;
        }

        if self.should_defer_loading() {
            match event {
                TransportEvent::Open { status, message } => self.deferred.defer_open(status, &message),
                TransportEvent::WmlOverride => self.deferred.defer_wml_override(),
                TransportEvent::Header { key, value } => self.deferred.defer_header(&key, &value),
                TransportEvent::Data(bytes) => self.deferred.defer_data(bytes),
                TransportEvent::DataSent { sent, total } => self.deferred.defer_data_sent(sent, total),
                TransportEvent::Done => self.deferred.defer_done(),
            }
            return;
        }

        match event {
            TransportEvent::Open { status, message } => self.handle_open(cx, status, &message),
            TransportEvent::WmlOverride => self.handle_wml_override(cx),
            TransportEvent::Header { key, value } => self.handle_header(cx, &key, &value),
            TransportEvent::Data(bytes) => self.handle_data(cx, &bytes),
            TransportEvent::DataSent { sent, total } => self.handle_data_sent(cx, sent, total),
            TransportEvent::Done => self.handle_done(cx),
        }
    }

    /// Play the pending `data:`/`about:` events, unless cancelled meanwhile
    pub(crate) fn load_synthetic(&mut self, cx: &mut JobContext<'_>) {
        let Some(events) = self.synthetic.take() else {
            return;
        };
        for event in events {
            self.handle_event(cx, event);
        }
    }

    pub(crate) fn process_deferred(&mut self, cx: &mut JobContext<'_>) {
        let budget = cx.config.deferred_data_budget;
        let mut queue = std::mem::take(&mut self.deferred);
        let outcome = queue.process(self, cx, budget);
        if self.cancelled {
            queue.clear();
        }
        self.deferred = queue;

        if outcome == DrainOutcome::BudgetExhausted {
            cx.scheduler.schedule(self.id, TaskKind::ProcessDeferred);
        }
    }

    /// Throttle the transport itself. Unlike deferral this does not touch
    /// delivery of events that already arrived.
    pub(crate) fn pause_load(&mut self, paused: bool) -> bool {
        match self.stream.as_mut() {
            Some(stream) => {
                stream.pause(paused);
                true
            }
            None => false,
        }
    }

    pub(crate) fn update_defer_count(&mut self, cx: &mut JobContext<'_>, delta: i32) {
        let count = i64::from(self.defer_count) + i64::from(delta);
        debug_assert!(count >= 0, "defer count of {} went negative", self.id);
        self.defer_count = u32::try_from(count.max(0)).unwrap_or(u32::MAX);

        if !self.is_deferring_loading() {
            cx.scheduler.schedule(self.id, TaskKind::ProcessDeferred);
        }
    }

    /// Cancel the fetch. Safe to call more than once.
    pub(crate) fn cancel(&mut self, cx: &mut JobContext<'_>) {
        if self.cancelled {
            return;
        }
        log::debug!("Cancelling {} ({})", self.id, self.response.url());
        self.cancelled = true;
        self.deferred.clear();
        cx.scheduler.cancel(self.id, TaskKind::ProcessDeferred);

        if self.synthetic.take().is_some() {
            cx.scheduler.cancel(self.id, TaskKind::LoadSynthetic);
        }
        if let Some(mut stream) = self.stream.take() {
            stream.cancel();
        }

        if self.running {
            self.handle_done(cx);
        }
    }

    /// Run one consumer callback and apply whatever it asked for
    fn call_client<F>(&mut self, cx: &mut JobContext<'_>, callback: F)
    where
        F: FnOnce(&mut dyn ResourceConsumer, &mut LoadControl),
    {
        if !self.client_is_ok() {
            return;
        }
        let Some(client) = self.handle.as_ref().map(|h| Rc::clone(&h.client)) else {
            return;
        };

        debug_assert!(!self.calling_client, "{} re-entered its client", self.id);
        let mut ctl = LoadControl::new();
        self.calling_client = true;
        callback(&mut *client.borrow_mut(), &mut ctl);
        self.calling_client = false;

        if ctl.defer_delta() != 0 {
            self.update_defer_count(cx, ctl.defer_delta());
        }
        if ctl.cancel_requested() {
            self.cancel(cx);
        }
    }

    fn handle_open(&mut self, _cx: &mut JobContext<'_>, status: i32, message: &str) {
        // out of order, duplicate or after cancel; a 401 may be followed by the transport's own retry
        if (self.status_received && self.extended_status != 401) || self.response_sent || self.cancelled {
            return;
        }
        if is_informational(status) {
            return;
        }

        self.status_received = true;
        self.extended_status = status;

        let http_status = match status {
            0 => 200,
            s if s < 0 => 404,
            s => s,
        };
        self.response.set_status(u16::try_from(http_status).unwrap_or(500));
        self.response.set_status_text(message);
        log::trace!("{} opened with status {}", self.id, status);
    }

    fn handle_wml_override(&mut self, _cx: &mut JobContext<'_>) {
        self.response.set_is_wml(true);
    }

    fn handle_header(&mut self, cx: &mut JobContext<'_>, key: &str, value: &str) {
        if !self.status_received || self.response_sent || self.cancelled {
            return;
        }

        let lower = key.to_ascii_lowercase();
        match lower.as_str() {
            "content-type" => self.content_type = Some(value.to_string()),
            "content-disposition" => self.content_disposition = Some(value.to_string()),
            "set-cookie" => self.handle_set_cookie(cx, value),
            // proxy challenges would need a protection space keyed on the proxy
            "www-authenticate" => self.handle_auth_header(cx, value),
            FTP_STATUS_HEADER => self.handle_ftp_header(cx, value),
            _ => {}
        }

        self.response.set_header(key, value);
    }

    fn handle_set_cookie(&mut self, cx: &mut JobContext<'_>, value: &str) {
        let url = self.response.url().clone();
        let enabled = self
            .handle
            .as_ref()
            .map(|h| h.client.borrow().cookies_enabled())
            .unwrap_or(false);

        if enabled && self.cookie_policy_allows(cx, &url) {
            cx.cookies.set_cookies_from_header(&url, value);
        }
        cx.cookies.clear_cache_for_host(&url);
    }

    fn cookie_policy_allows(&self, cx: &mut JobContext<'_>, url: &Url) -> bool {
        if cx.config.cookie_policy != CookiePolicy::OnlyFromMainDocumentDomain {
            return true;
        }
        match self.request.first_party_for_cookies() {
            Some(first_party) if first_party.host_str() != url.host_str() => {
                cx.cookies.get_cookie_header(url).is_some()
            }
            _ => true,
        }
    }

    fn handle_auth_header(&mut self, cx: &mut JobContext<'_>, value: &str) {
        // a credential is already attached; a second challenge means it was wrong
        if self.handle.as_ref().map_or(true, |h| h.challenge.is_some()) {
            return;
        }

        let challenge = match parse_challenge(value) {
            Ok(challenge) => challenge,
            Err(e) => {
                log::debug!("Ignoring challenge '{}' for {}: {}", value, self.response.url(), e);
                return;
            }
        };

        if challenge.scheme != AuthScheme::Ntlm && !is_unauthorized(self.extended_status) {
            return;
        }

        self.send_request_with_credentials(cx, ServerType::Http, challenge.scheme, &challenge.realm);
    }

    fn handle_ftp_header(&mut self, cx: &mut JobContext<'_>, value: &str) {
        let Some((code, _)) = value.split_once(' ') else {
            return;
        };
        match code.trim().parse::<u16>() {
            Ok(213) => self.ftp_directory = false,
            Ok(530) => {
                self.purge_credentials(cx);
                self.send_request_with_credentials(cx, ServerType::Ftp, AuthScheme::Default, "ftp");
            }
            Ok(230) => self.store_credentials(cx),
            _ => {}
        }
    }

    /// Find a credential for the protection space, from the store or the
    /// user, and restart the request with it attached.
    fn send_request_with_credentials(
        &mut self,
        cx: &mut JobContext<'_>,
        server_type: ServerType,
        scheme: AuthScheme,
        realm: &str,
    ) -> bool {
        let Some(client) = self.handle.as_ref().map(|h| Rc::clone(&h.client)) else {
            return false;
        };
        let url = self.response.url().clone();
        let Some(space) = ProtectionSpace::for_url(&url, server_type, scheme, realm) else {
            return false;
        };

        let challenge = match cx.credentials.get(&space).cloned() {
            Some(credential) => AuthChallenge {
                protection_space: space,
                credential,
                stored: true,
            },
            None => {
                let prompted = client.borrow_mut().authentication_challenge(realm);
                match prompted.filter(|c| !c.is_empty()) {
                    Some(credential) => AuthChallenge {
                        protection_space: space,
                        credential,
                        stored: false,
                    },
                    None => {
                        log::debug!("Authentication for realm \"{}\" at {} abandoned", realm, url);
                        self.abandoned_realm = Some(realm.to_string());
                        return false;
                    }
                }
            }
        };

        if let Some(handle) = self.handle.as_mut() {
            handle.challenge = Some(challenge);
        }

        let mut request = self.request.clone();
        request.set_url(url);
        request.set_must_handle_internally(true);

        if !self.offer_request(cx, &mut request) {
            return false;
        }

        log::debug!("{} retrying {} with credentials for realm \"{}\"", self.id, request.url(), realm);
        self.resolution = Some(Resolution::Authenticating);
        self.hand_off(cx, request, self.redirect_count);
        true
    }

    fn handle_data(&mut self, cx: &mut JobContext<'_>, data: &[u8]) {
        if (self.source != Source::Local && !self.status_received) || self.cancelled {
            return;
        }
        if data.is_empty() || is_redirect(self.extended_status) {
            return;
        }

        self.data_received = true;
        self.send_response_if_needed(cx);
        self.call_client(cx, |client, ctl| client.did_receive_data(ctl, data));
    }

    fn handle_data_sent(&mut self, cx: &mut JobContext<'_>, sent: u64, total: u64) {
        if self.cancelled {
            return;
        }
        self.call_client(cx, |client, ctl| client.did_send_data(ctl, sent, total));
    }

    fn handle_done(&mut self, cx: &mut JobContext<'_>) {
        if !self.running {
            return;
        }
        self.running = false;

        if !self.cancelled {
            if !self.status_received {
                // the connection failed before it produced a status
                self.handle_open(cx, status::NETWORK_ERROR, "");
            }

            if !is_error(self.extended_status, self.script_driven) {
                self.store_credentials(cx);
            } else if is_unauthorized(self.extended_status) {
                self.purge_credentials(cx);
            }

            let redirect = is_redirect(self.extended_status);
            let too_many = redirect && self.redirect_count >= cx.config.max_redirects;
            if !redirect || too_many || !self.handle_redirect(cx) {
                if too_many {
                    self.extended_status = status::TOO_MANY_REDIRECTS;
                }
                self.send_response_if_needed(cx);
                self.finish();
            }
        }

        cx.completed.push(self.id);
        self.handle = None;
    }

    /// Report the single terminal outcome to the consumer
    fn finish(&mut self) {
        if !self.client_is_ok() {
            return;
        }
        let Some(client) = self.handle.as_ref().map(|h| Rc::clone(&h.client)) else {
            return;
        };

        if is_error(self.extended_status, self.script_driven) && !self.data_received {
            let error = self.classify_failure();
            log::debug!("{} failed: {}", self.id, error);
            self.resolution = Some(Resolution::Failed);
            client.borrow_mut().did_fail(&error);
        } else {
            log::debug!("{} finished loading {}", self.id, self.response.url());
            self.resolution = Some(Resolution::Success);
            client.borrow_mut().did_finish_loading();
        }
    }

    fn classify_failure(&self) -> NetworkError {
        let url = self.response.url().to_string();
        match self.extended_status {
            status::TOO_MANY_REDIRECTS => NetworkError::TooManyRedirects { url },
            code if code < 0 => NetworkError::TransportFailure { code, url },
            code => match &self.abandoned_realm {
                Some(realm) if is_unauthorized(code) => NetworkError::AuthenticationAbandoned {
                    url,
                    realm: realm.clone(),
                },
                _ => NetworkError::HttpError {
                    status: self.response.status(),
                    url,
                    status_text: self.response.status_text().to_string(),
                },
            },
        }
    }

    fn redirect_target(&self) -> Result<Url, HeaderParseError> {
        let location = self
            .response
            .header("Location")
            .ok_or(HeaderParseError::MissingLocation)?;
        self.response
            .url()
            .join(location)
            .map_err(|e| HeaderParseError::InvalidLocation(e.to_string()))
    }

    fn handle_redirect(&mut self, cx: &mut JobContext<'_>) -> bool {
        if self.handle.is_none() {
            return false;
        }

        let target = match self.redirect_target() {
            Ok(url) => url,
            Err(e) => {
                log::debug!("Not following redirect from {}: {}", self.response.url(), e);
                return false;
            }
        };

        let mut request = self.request.redirected_to(target);

        // the new target has to negotiate its own credentials
        if let Some(handle) = self.handle.as_mut() {
            handle.challenge = None;
        }

        if !self.offer_request(cx, &mut request) {
            return false;
        }

        log::debug!(
            "{} redirecting {} -> {} ({} of {})",
            self.id,
            self.response.url(),
            request.url(),
            self.redirect_count + 1,
            cx.config.max_redirects
        );
        self.resolution = Some(Resolution::Redirecting);
        self.hand_off(cx, request, self.redirect_count + 1);
        true
    }

    /// Let the consumer inspect or veto a request about to be restarted
    fn offer_request(&mut self, cx: &mut JobContext<'_>, request: &mut Request) -> bool {
        let prior = self.response.clone();
        self.call_client(cx, |client, ctl| client.will_send_request(ctl, request, &prior));
        !self.cancelled
    }

    /// Pass the consumer on to a fresh job. This job keeps running detached until its transport is done.
    fn hand_off(&mut self, cx: &mut JobContext<'_>, request: Request, redirect_count: u32) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        cx.restarts.push(Restart {
            handle,
            request,
            transport: Rc::clone(&self.transport),
            defer_count: self.defer_count,
            redirect_count,
        });

        // nobody is left to lift a deferral on the detached job
        if self.defer_count > 0 {
            self.defer_count = 0;
            cx.scheduler.schedule(self.id, TaskKind::ProcessDeferred);
        }
    }

    // Delivering the response can run script that cancels the job.
    fn send_response_if_needed(&mut self, cx: &mut JobContext<'_>) {
        if self.response_sent {
            return;
        }
        self.response_sent = true;

        if is_error(self.extended_status, self.script_driven) && !self.data_received {
            return;
        }

        let url = self.response.url().clone();
        let url_filename = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .map(str::to_string);

        let listing = (self.source == Source::Ftp && self.ftp_directory).then(|| FTP_DIRECTORY_MIME_TYPE.to_string());
        let mime_type = listing
            .or_else(|| self.response.header(SNIFFED_MIME_TYPE_HEADER).cloned())
            .or_else(|| self.content_type.as_deref().and_then(extract_mime_type))
            .or_else(|| mime_type_for_path(url.path()));
        self.response.set_mime_type(mime_type);

        self.response
            .set_text_encoding(self.content_type.as_deref().and_then(extract_charset));

        let content_length = self
            .response
            .header("Content-Length")
            .and_then(|value| value.trim().parse::<u64>().ok());
        self.response.set_expected_content_length(content_length);

        if !matches!(self.source, Source::Data | Source::About) {
            let filename = self
                .content_disposition
                .as_deref()
                .and_then(filename_from_content_disposition)
                .or(url_filename);
            self.response.set_suggested_filename(filename);
        }

        if matches!(self.source, Source::Local | Source::Data | Source::About) {
            self.response.set_header("Cache-Control", "no-cache");
        }

        let response = self.response.clone();
        self.call_client(cx, |client, ctl| client.did_receive_response(ctl, &response));
    }

    fn store_credentials(&mut self, cx: &mut JobContext<'_>) {
        let Some(challenge) = self.handle.as_mut().and_then(|h| h.challenge.as_mut()) else {
            return;
        };
        if challenge.stored {
            return;
        }
        cx.credentials
            .set(challenge.protection_space.clone(), challenge.credential.clone());
        challenge.stored = true;
    }

    fn purge_credentials(&mut self, cx: &mut JobContext<'_>) {
        let Some(challenge) = self.handle.as_mut().and_then(|h| h.challenge.as_mut()) else {
            return;
        };
        cx.credentials.remove(&challenge.protection_space);
        challenge.stored = false;
    }
}

impl<'a> DeferredDelivery<JobContext<'a>> for NetworkJob {
    fn is_deferring_loading(&self) -> bool {
        NetworkJob::is_deferring_loading(self)
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    fn handle_open(&mut self, cx: &mut JobContext<'a>, status: i32, message: &str) {
        NetworkJob::handle_open(self, cx, status, message);
    }

    fn handle_wml_override(&mut self, cx: &mut JobContext<'a>) {
        NetworkJob::handle_wml_override(self, cx);
    }

    fn handle_header(&mut self, cx: &mut JobContext<'a>, key: &str, value: &str) {
        NetworkJob::handle_header(self, cx, key, value);
    }

    fn handle_data(&mut self, cx: &mut JobContext<'a>, data: &[u8]) {
        NetworkJob::handle_data(self, cx, data);
    }

    fn handle_data_sent(&mut self, cx: &mut JobContext<'a>, sent: u64, total: u64) {
        NetworkJob::handle_data_sent(self, cx, sent, total);
    }

    fn handle_done(&mut self, cx: &mut JobContext<'a>) {
        NetworkJob::handle_done(self, cx);
    }
}
