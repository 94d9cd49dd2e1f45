#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use citadel_fetch::{
    ConsumerId, Credential, EventSink, JobId, LoadControl, Method, NetworkError, NetworkManager, Request,
    ResourceConsumer, Response, TransportEvent, TransportFactory, TransportRequest, TransportStream,
};

/// What a consumer observed, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen {
    WillSend(String),
    Response(u16),
    Data(Vec<u8>),
    Sent(u64, u64),
    Finished,
    Failed(Failure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Transport(i32),
    Http(u16),
    TooManyRedirects,
    AuthenticationAbandoned,
    Unavailable,
    Other,
}

impl From<&NetworkError> for Failure {
    fn from(error: &NetworkError) -> Self {
        match error {
            NetworkError::TransportFailure { code, .. } => Failure::Transport(*code),
            NetworkError::HttpError { status, .. } => Failure::Http(*status),
            NetworkError::TooManyRedirects { .. } => Failure::TooManyRedirects,
            NetworkError::AuthenticationAbandoned { .. } => Failure::AuthenticationAbandoned,
            NetworkError::TransportUnavailable(_) => Failure::Unavailable,
            _ => Failure::Other,
        }
    }
}

/// Consumer that records every callback and can be told how to react
pub struct RecordingConsumer {
    pub seen: Vec<Seen>,
    pub responses: Vec<Response>,
    pub prompts: Vec<String>,
    pub answer: Option<Credential>,
    pub cookies_enabled: bool,
    pub cancel_on_response: bool,
    pub cancel_on_data: bool,
    pub defer_on_response: bool,
    pub veto_requests: bool,
}

impl Default for RecordingConsumer {
    fn default() -> Self {
        Self {
            seen: Vec::new(),
            responses: Vec::new(),
            prompts: Vec::new(),
            answer: None,
            cookies_enabled: true,
            cancel_on_response: false,
            cancel_on_data: false,
            defer_on_response: false,
            veto_requests: false,
        }
    }
}

impl RecordingConsumer {
    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn body(&self) -> Vec<u8> {
        self.seen
            .iter()
            .filter_map(|seen| match seen {
                Seen::Data(bytes) => Some(bytes.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    pub fn terminal_count(&self) -> usize {
        self.seen
            .iter()
            .filter(|seen| matches!(seen, Seen::Finished | Seen::Failed(_)))
            .count()
    }

    pub fn last(&self) -> Option<&Seen> {
        self.seen.last()
    }
}

impl ResourceConsumer for RecordingConsumer {
    fn will_send_request(&mut self, ctl: &mut LoadControl, request: &mut Request, _prior: &Response) {
        self.seen.push(Seen::WillSend(request.url().to_string()));
        if self.veto_requests {
            ctl.cancel();
        }
    }

    fn did_receive_response(&mut self, ctl: &mut LoadControl, response: &Response) {
        self.seen.push(Seen::Response(response.status()));
        self.responses.push(response.clone());
        if self.cancel_on_response {
            ctl.cancel();
        }
        if self.defer_on_response {
            ctl.set_defers_loading(true);
        }
    }

    fn did_receive_data(&mut self, ctl: &mut LoadControl, data: &[u8]) {
        self.seen.push(Seen::Data(data.to_vec()));
        if self.cancel_on_data {
            ctl.cancel();
        }
    }

    fn did_send_data(&mut self, _ctl: &mut LoadControl, sent: u64, total: u64) {
        self.seen.push(Seen::Sent(sent, total));
    }

    fn did_finish_loading(&mut self) {
        self.seen.push(Seen::Finished);
    }

    fn did_fail(&mut self, error: &NetworkError) {
        self.seen.push(Seen::Failed(Failure::from(error)));
    }

    fn authentication_challenge(&mut self, realm: &str) -> Option<Credential> {
        self.prompts.push(realm.to_string());
        self.answer.clone()
    }

    fn cookies_enabled(&self) -> bool {
        self.cookies_enabled
    }
}

/// One stream the mock transport opened
pub struct Opened {
    pub request: TransportRequest,
    pub sink: EventSink,
    pub cancelled: Rc<Cell<bool>>,
    pub paused: Rc<Cell<bool>>,
}

impl Opened {
    pub fn job(&self) -> JobId {
        self.sink.job()
    }
}

struct MockStream {
    cancelled: Rc<Cell<bool>>,
    paused: Rc<Cell<bool>>,
}

impl TransportStream for MockStream {
    fn cancel(&mut self) {
        self.cancelled.set(true);
    }

    fn pause(&mut self, paused: bool) {
        self.paused.set(paused);
    }
}

/// Transport that records what it was asked to open and produces nothing by itself
#[derive(Default)]
pub struct MockTransport {
    pub opened: RefCell<Vec<Opened>>,
    /// Refuse every open once this many streams exist
    pub fail_after: Cell<Option<usize>>,
}

impl MockTransport {
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.opened.borrow().len()
    }

    pub fn job(&self, index: usize) -> JobId {
        self.opened.borrow()[index].job()
    }

    pub fn last_job(&self) -> JobId {
        self.opened.borrow().last().map(Opened::job).expect("nothing opened")
    }

    pub fn request(&self, index: usize) -> TransportRequest {
        self.opened.borrow()[index].request.clone()
    }

    pub fn was_cancelled(&self, index: usize) -> bool {
        self.opened.borrow()[index].cancelled.get()
    }

    pub fn is_paused(&self, index: usize) -> bool {
        self.opened.borrow()[index].paused.get()
    }
}

impl TransportFactory for MockTransport {
    fn open(&self, request: &TransportRequest, sink: EventSink) -> Result<Box<dyn TransportStream>, NetworkError> {
        if let Some(limit) = self.fail_after.get() {
            if self.count() >= limit {
                return Err(NetworkError::TransportUnavailable("mock refused".to_string()));
            }
        }
        let cancelled = Rc::new(Cell::new(false));
        let paused = Rc::new(Cell::new(false));
        self.opened.borrow_mut().push(Opened {
            request: request.clone(),
            sink,
            cancelled: cancelled.clone(),
            paused: paused.clone(),
        });
        Ok(Box::new(MockStream { cancelled, paused }))
    }
}

pub fn get(url: &str) -> Request {
    Request::new(Method::GET, url).expect("valid url")
}

/// Start a job for consumer #1 on the mock transport
pub fn start(
    manager: &mut NetworkManager,
    transport: &Rc<MockTransport>,
    consumer: &Rc<RefCell<RecordingConsumer>>,
    request: Request,
) -> JobId {
    let factory: Rc<dyn TransportFactory> = transport.clone();
    manager
        .start_job(ConsumerId(1), consumer.clone(), request, factory, false)
        .expect("job starts")
}

pub fn feed(manager: &mut NetworkManager, job: JobId, events: Vec<TransportEvent>) {
    for event in events {
        manager.dispatch(job, event);
    }
}

/// A complete successful exchange
pub fn ok_html(body: &str) -> Vec<TransportEvent> {
    vec![
        TransportEvent::open(200, "OK"),
        TransportEvent::header("Content-Type", "text/html; charset=utf-8"),
        TransportEvent::header("Content-Length", &body.len().to_string()),
        TransportEvent::data(body.as_bytes().to_vec()),
        TransportEvent::Done,
    ]
}

pub fn redirect(status: i32, location: &str) -> Vec<TransportEvent> {
    vec![
        TransportEvent::open(status, "Redirect"),
        TransportEvent::header("Location", location),
        TransportEvent::data(&b"moved"[..]),
        TransportEvent::Done,
    ]
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
