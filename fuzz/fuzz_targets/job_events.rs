#![no_main]

use std::cell::RefCell;
use std::rc::Rc;

use arbitrary::Arbitrary;
use citadel_fetch::{
    ConsumerId, Credential, CredentialPersistence, EventSink, LoadControl, Method, NetworkError, NetworkManager,
    Request, ResourceConsumer, Response, TransportEvent, TransportFactory, TransportRequest, TransportStream,
};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Step {
    Open(i16),
    Header(u8, String),
    Data(Vec<u8>),
    DataSent(u16, u16),
    Wml,
    Done,
    Defer(bool),
    Tick,
    Stop,
}

#[derive(Arbitrary, Debug)]
struct Input {
    url_id: u8,
    cancel_on_data: bool,
    answer: bool,
    steps: Vec<Step>,
}

const HEADER_NAMES: [&str; 8] = [
    "Content-Type",
    "Location",
    "WWW-Authenticate",
    "Set-Cookie",
    "Content-Disposition",
    "x-ftp-status",
    "Content-Length",
    "X-Other",
];

const URLS: [&str; 5] = [
    "https://example.com/a/b.html",
    "ftp://ftp.example/pub/",
    "file:///tmp/x.txt",
    "data:,inline",
    "about:blank",
];

#[derive(Default)]
struct Consumer {
    terminal: usize,
    after_terminal: bool,
    cancel_on_data: bool,
    answer: bool,
}

impl Consumer {
    fn event(&mut self) {
        if self.terminal > 0 {
            self.after_terminal = true;
        }
    }
}

impl ResourceConsumer for Consumer {
    fn did_receive_response(&mut self, _: &mut LoadControl, _: &Response) {
        self.event();
    }
    fn did_receive_data(&mut self, ctl: &mut LoadControl, _: &[u8]) {
        self.event();
        if self.cancel_on_data {
            ctl.cancel();
        }
    }
    fn did_finish_loading(&mut self) {
        self.event();
        self.terminal += 1;
    }
    fn did_fail(&mut self, _: &NetworkError) {
        self.event();
        self.terminal += 1;
    }
    fn authentication_challenge(&mut self, _: &str) -> Option<Credential> {
        self.answer
            .then(|| Credential::new("user", "pass", CredentialPersistence::ForSession))
    }
}

struct Stream;

impl TransportStream for Stream {
    fn cancel(&mut self) {}
}

#[derive(Default)]
struct Transport {
    sinks: RefCell<Vec<EventSink>>,
}

impl TransportFactory for Transport {
    fn open(&self, _: &TransportRequest, sink: EventSink) -> Result<Box<dyn TransportStream>, NetworkError> {
        self.sinks.borrow_mut().push(sink);
        Ok(Box::new(Stream))
    }
}

fuzz_target!(|input: Input| {
    if input.steps.len() > 256 {
        return;
    }

    let mut manager = NetworkManager::new();
    let transport = Rc::new(Transport::default());
    let consumer = Rc::new(RefCell::new(Consumer {
        cancel_on_data: input.cancel_on_data,
        answer: input.answer,
        ..Consumer::default()
    }));
    let url = URLS[usize::from(input.url_id) % URLS.len()];
    let Ok(request) = Request::new(Method::GET, url) else {
        return;
    };
    let factory: Rc<dyn TransportFactory> = transport.clone();
    if manager
        .start_job(ConsumerId(1), consumer.clone(), request, factory, false)
        .is_err()
    {
        return;
    }

    let mut defers = 0u32;
    for step in input.steps {
        // events always go to the newest stream, as after a redirect
        let newest = transport.sinks.borrow().last().map(EventSink::job);
        let Some(job) = newest else {
            manager.tick();
            continue;
        };
        match step {
            Step::Open(status) => manager.dispatch(job, TransportEvent::open(i32::from(status), "")),
            Step::Header(name, value) => {
                let name = HEADER_NAMES[usize::from(name) % HEADER_NAMES.len()];
                manager.dispatch(job, TransportEvent::header(name, &value));
            }
            Step::Data(bytes) => manager.dispatch(job, TransportEvent::data(bytes)),
            Step::DataSent(sent, total) => manager.dispatch(
                job,
                TransportEvent::DataSent {
                    sent: u64::from(sent),
                    total: u64::from(total),
                },
            ),
            Step::Wml => manager.dispatch(job, TransportEvent::WmlOverride),
            Step::Done => manager.dispatch(job, TransportEvent::Done),
            Step::Defer(true) => {
                manager.set_defers_loading(ConsumerId(1), true);
                defers += 1;
            }
            Step::Defer(false) => {
                if defers > 0 {
                    manager.set_defers_loading(ConsumerId(1), false);
                    defers -= 1;
                }
            }
            Step::Tick => {
                manager.tick();
            }
            Step::Stop => {
                manager.stop_job(ConsumerId(1));
            }
        }
    }
    manager.run_until_idle();

    let consumer = consumer.borrow();
    assert!(consumer.terminal <= 1);
    assert!(!consumer.after_terminal);
});
