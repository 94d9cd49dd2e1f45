//! HTTP(S) transport on reqwest.
//!
//! Each stream is a tokio task that performs one exchange and reports it
//! through its [`EventSink`]. Redirects are not followed here; the job does
//! that itself so the consumer can see and veto every hop.

use reqwest::{redirect, Client};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::NetworkError;
use crate::transport::{status, AuthType, EventSink, TransportEvent, TransportFactory, TransportRequest, TransportStream};

pub struct HttpTransportFactory {
    client: Client,
    runtime: Handle,
}

impl HttpTransportFactory {
    /// Create a factory whose streams run on `runtime`
    pub fn new(runtime: Handle) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .user_agent(concat!("citadel-fetch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, runtime })
    }

    /// Create a factory on the runtime of the calling context
    pub fn current() -> Result<Self, NetworkError> {
        let runtime = Handle::try_current().map_err(|e| NetworkError::TransportUnavailable(e.to_string()))?;
        Self::new(runtime)
    }

    pub(crate) fn build_request(&self, request: &TransportRequest) -> Result<reqwest::Request, NetworkError> {
        let outbound = &request.request;
        let method = reqwest::Method::from_bytes(outbound.method().to_string().as_bytes())
            .map_err(|e| NetworkError::TransportUnavailable(e.to_string()))?;

        let mut builder = self.client.request(method, outbound.url().clone());
        for (name, value) in outbound.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(cookie) = &request.cookie {
            builder = builder.header(reqwest::header::COOKIE, cookie.as_str());
        }

        if let Some(credential) = &request.credential {
            match credential.auth_type {
                AuthType::HttpBasic => {
                    builder = builder.basic_auth(&credential.user, Some(&credential.password));
                }
                other => log::warn!("{:?} credentials are not supported over HTTP, sending none", other),
            }
        }

        if let Some(body) = outbound.body() {
            builder = builder.body(body.to_vec());
        }

        Ok(builder.build()?)
    }
}

impl TransportFactory for HttpTransportFactory {
    fn open(&self, request: &TransportRequest, sink: EventSink) -> Result<Box<dyn TransportStream>, NetworkError> {
        let scheme = request.request.url().scheme();
        if scheme != "http" && scheme != "https" {
            return Err(NetworkError::TransportUnavailable(format!(
                "no transport for {} URLs",
                scheme
            )));
        }

        let built = self.build_request(request)?;
        let client = self.client.clone();
        let (paused, paused_rx) = watch::channel(false);
        let task = self.runtime.spawn(exchange(client, built, sink, paused_rx));
        Ok(Box::new(HttpStream { task, paused }))
    }
}

struct HttpStream {
    task: JoinHandle<()>,
    paused: watch::Sender<bool>,
}

impl TransportStream for HttpStream {
    fn cancel(&mut self) {
        self.task.abort();
    }

    fn pause(&mut self, paused: bool) {
        self.paused.send_replace(paused);
    }
}

async fn wait_while_paused(paused: &mut watch::Receiver<bool>) {
    while *paused.borrow_and_update() {
        if paused.changed().await.is_err() {
            return;
        }
    }
}

async fn exchange(client: Client, request: reqwest::Request, sink: EventSink, mut paused: watch::Receiver<bool>) {
    let upload = request
        .body()
        .and_then(|body| body.as_bytes())
        .map(|bytes| bytes.len() as u64);
    let url = request.url().clone();

    match client.execute(request).await {
        Ok(mut response) => {
            if let Some(total) = upload {
                sink.data_sent(total, total);
            }

            let code = response.status();
            sink.open(i32::from(code.as_u16()), code.canonical_reason().unwrap_or(""));
            for (name, value) in response.headers() {
                sink.send(TransportEvent::header_bytes(name.as_str(), value.as_bytes()));
            }

            loop {
                wait_while_paused(&mut paused).await;
                match response.chunk().await {
                    Ok(Some(chunk)) => sink.data(chunk),
                    Ok(None) => break,
                    Err(e) => {
                        log::debug!("Body of {} cut short: {}", url, e);
                        break;
                    }
                }
            }
        }
        Err(e) => {
            log::debug!("Request to {} failed: {}", url, e);
            sink.open(failure_status(&e), &e.to_string());
        }
    }

    sink.done();
}

fn failure_status(error: &reqwest::Error) -> i32 {
    if error.is_timeout() {
        status::TIMEOUT
    } else if error.is_connect() {
        status::CONNECT_ERROR
    } else {
        status::NETWORK_ERROR
    }
}
