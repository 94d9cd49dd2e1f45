//! Registry of live network jobs and the cooperative loop that drives them.

use std::collections::BTreeMap;
use std::rc::Rc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::consumer::{ConsumerId, ResourceHandle, SharedConsumer};
use crate::cookies::{CookieJar, CookieStore};
use crate::credentials::CredentialStore;
use crate::error::NetworkError;
use crate::job::{JobContext, JobPhase, JobState, NetworkJob, Restart};
use crate::request::Request;
use crate::scheduler::{Scheduler, TaskKind};
use crate::synthetic::{about_events, about_page, data_url_events, AboutStats};
use crate::transport::{AttachedCredential, EventSink, JobId, TransportEvent, TransportFactory, TransportRequest};
use crate::NetworkConfig;

// A job that could not be started, with the handle it would have owned
struct StartFailure {
    error: NetworkError,
    handle: Option<ResourceHandle>,
}

/// Owns every network job and the services they share.
///
/// Everything happens on the thread that owns the manager. Transports hand
/// their events to an [`EventSink`]; they are picked up by [`tick`](Self::tick),
/// [`run_until_idle`](Self::run_until_idle) or [`run`](Self::run).
pub struct NetworkManager {
    config: NetworkConfig,
    jobs: BTreeMap<JobId, NetworkJob>,
    next_job_id: u64,
    credentials: CredentialStore,
    cookies: Box<dyn CookieStore>,
    scheduler: Scheduler,
    completed: Vec<JobId>,
    events_tx: UnboundedSender<(JobId, TransportEvent)>,
    events_rx: UnboundedReceiver<(JobId, TransportEvent)>,
}

impl NetworkManager {
    pub fn new() -> Self {
        Self::with_config(NetworkConfig::default())
    }

    pub fn with_config(config: NetworkConfig) -> Self {
        Self::with_services(config, CredentialStore::new(), Box::new(CookieJar::new()))
    }

    pub fn with_services(config: NetworkConfig, credentials: CredentialStore, cookies: Box<dyn CookieStore>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            config,
            jobs: BTreeMap::new(),
            next_job_id: 1,
            credentials,
            cookies,
            scheduler: Scheduler::new(),
            completed: Vec::new(),
            events_tx,
            events_rx,
        }
    }

    /// Start loading `request` for a consumer.
    ///
    /// Fails with [`NetworkError::DuplicateJob`] if the consumer already has
    /// a live job, or with the transport's error if it could not be opened.
    pub fn start_job(
        &mut self,
        consumer: ConsumerId,
        client: SharedConsumer,
        request: Request,
        transport: Rc<dyn TransportFactory>,
        defers_loading: bool,
    ) -> Result<JobId, NetworkError> {
        let handle = ResourceHandle::new(consumer, client);
        self.start_job_with(handle, request, transport, u32::from(defers_loading), 0)
            .map_err(|failure| failure.error)
    }

    fn start_job_with(
        &mut self,
        handle: ResourceHandle,
        request: Request,
        transport: Rc<dyn TransportFactory>,
        defer_count: u32,
        redirect_count: u32,
    ) -> Result<JobId, StartFailure> {
        if self.find_job(handle.id).is_some() {
            return Err(StartFailure {
                error: NetworkError::DuplicateJob(handle.id),
                handle: Some(handle),
            });
        }

        let url = request.url().clone();
        let credential = handle.challenge.as_ref().and_then(AttachedCredential::from_challenge);
        let cookie = if handle.client.borrow().cookies_enabled() {
            self.cookies.get_cookie_header(&url)
        } else {
            None
        };
        let transport_request = TransportRequest {
            request: request.clone(),
            credential,
            cookie,
        };

        let synthetic = match url.scheme() {
            "data" => Some(data_url_events(&url)),
            "about" => about_page(&url, self.config.debug_pages, self.about_stats()).map(about_events),
            _ => None,
        };

        let id = JobId(self.next_job_id);
        self.next_job_id += 1;
        let consumer = handle.id;
        let mut job = NetworkJob::new(id, handle, request, transport, defer_count, redirect_count);

        match synthetic {
            Some(events) => {
                let mut restarts = Vec::new();
                let mut cx = JobContext {
                    config: &self.config,
                    credentials: &mut self.credentials,
                    cookies: self.cookies.as_mut(),
                    scheduler: &mut self.scheduler,
                    restarts: &mut restarts,
                    completed: &mut self.completed,
                };
                job.load_later(&mut cx, events);
            }
            None => {
                let sink = EventSink::new(id, self.events_tx.clone());
                if let Err(error) = job.initialize(&transport_request, sink) {
                    log::debug!("Could not open {} for {}: {}", url, consumer, error);
                    return Err(StartFailure {
                        error,
                        handle: job.into_handle(),
                    });
                }
            }
        }

        log::debug!("Started {} for {}: {} {}", id, consumer, transport_request.request.method(), url);
        self.jobs.insert(id, job);
        Ok(id)
    }

    /// Cancel the consumer's job. Returns false if it has none.
    pub fn stop_job(&mut self, consumer: ConsumerId) -> bool {
        let Some(id) = self.find_job(consumer) else {
            return false;
        };
        self.with_job(id, |job, cx| job.cancel(cx));
        true
    }

    /// Pause or resume delivery for the consumer's job. Calls stack.
    pub fn set_defers_loading(&mut self, consumer: ConsumerId, defers: bool) {
        let Some(id) = self.find_job(consumer) else {
            return;
        };
        let delta = if defers { 1 } else { -1 };
        self.with_job(id, |job, cx| job.update_defer_count(cx, delta));
    }

    /// Pause or resume reading on the transport behind the consumer's job.
    /// Returns false if there is no job or it has no live stream.
    pub fn pause_load(&mut self, consumer: ConsumerId, paused: bool) -> bool {
        let Some(id) = self.find_job(consumer) else {
            return false;
        };
        self.jobs.get_mut(&id).map_or(false, |job| job.pause_load(paused))
    }

    /// Remove a finished job from the registry
    pub(crate) fn delete_job(&mut self, id: JobId) {
        if let Some(job) = self.jobs.remove(&id) {
            debug_assert!(!job.is_running(), "deleting running {}", id);
            self.scheduler.cancel_all(id);
            log::trace!("Deleted {}", id);
        }
    }

    /// Hand one transport event to a job right away
    pub fn dispatch(&mut self, id: JobId, event: TransportEvent) {
        if self.with_job(id, |job, cx| job.handle_event(cx, event)).is_none() {
            log::trace!("Event for unknown {}", id);
        }
    }

    /// A sink that feeds events for `id` into this manager
    pub fn event_sink(&self, id: JobId) -> EventSink {
        EventSink::new(id, self.events_tx.clone())
    }

    /// Run one turn: delete jobs finished on earlier turns, deliver pending
    /// transport events, then run due tasks. Returns whether anything happened.
    pub fn tick(&mut self) -> bool {
        let mut worked = false;

        for id in std::mem::take(&mut self.completed) {
            self.delete_job(id);
            worked = true;
        }

        while let Ok((id, event)) = self.events_rx.try_recv() {
            self.dispatch(id, event);
            worked = true;
        }

        for task in self.scheduler.take_due() {
            worked = true;
            self.with_job(task.job, |job, cx| match task.kind {
                TaskKind::ProcessDeferred => job.process_deferred(cx),
                TaskKind::LoadSynthetic => job.load_synthetic(cx),
            });
        }

        worked
    }

    /// Turn until there is nothing left to do right now. Returns the number of turns that did work.
    pub fn run_until_idle(&mut self) -> usize {
        let mut turns = 0;
        while self.tick() {
            turns += 1;
        }
        turns
    }

    /// Keep turning, waiting for transport events in between, until no job is left
    pub async fn run(&mut self) {
        loop {
            self.run_until_idle();
            if self.jobs.is_empty() {
                break;
            }
            match self.events_rx.recv().await {
                Some((id, event)) => self.dispatch(id, event),
                None => break,
            }
        }
    }

    pub fn has_job(&self, consumer: ConsumerId) -> bool {
        self.find_job(consumer).is_some()
    }

    /// Jobs in the registry, including detached and finished ones not yet deleted
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn job_id(&self, consumer: ConsumerId) -> Option<JobId> {
        self.find_job(consumer)
    }

    pub fn job(&self, id: JobId) -> Option<&NetworkJob> {
        self.jobs.get(&id)
    }

    pub fn job_state(&self, consumer: ConsumerId) -> Option<JobState> {
        self.find_job(consumer).and_then(|id| self.jobs.get(&id)).map(NetworkJob::state)
    }

    pub fn job_phase(&self, consumer: ConsumerId) -> Option<JobPhase> {
        self.find_job(consumer).and_then(|id| self.jobs.get(&id)).map(NetworkJob::phase)
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn credentials_mut(&mut self) -> &mut CredentialStore {
        &mut self.credentials
    }

    pub fn cookies_mut(&mut self) -> &mut dyn CookieStore {
        self.cookies.as_mut()
    }

    fn about_stats(&self) -> AboutStats {
        AboutStats {
            jobs: self.jobs.len(),
            credentials: self.credentials.len(),
            scheduled_tasks: self.scheduler.len(),
        }
    }

    fn find_job(&self, consumer: ConsumerId) -> Option<JobId> {
        self.jobs
            .values()
            .find(|job| job.consumer_id() == Some(consumer))
            .map(NetworkJob::id)
    }

    /// Run `f` against one job with the shared services, then start whatever it handed off
    fn with_job<R, F>(&mut self, id: JobId, f: F) -> Option<R>
    where
        F: FnOnce(&mut NetworkJob, &mut JobContext<'_>) -> R,
    {
        let mut restarts = Vec::new();
        let result = {
            let job = self.jobs.get_mut(&id)?;
            let mut cx = JobContext {
                config: &self.config,
                credentials: &mut self.credentials,
                cookies: self.cookies.as_mut(),
                scheduler: &mut self.scheduler,
                restarts: &mut restarts,
                completed: &mut self.completed,
            };
            f(job, &mut cx)
        };
        self.start_restarts(restarts);
        Some(result)
    }

    fn start_restarts(&mut self, restarts: Vec<Restart>) {
        for restart in restarts {
            let url = restart.request.url().clone();
            let result = self.start_job_with(
                restart.handle,
                restart.request,
                restart.transport,
                restart.defer_count,
                restart.redirect_count,
            );
            match result {
                Ok(id) => log::trace!("Restarted {} as {}", url, id),
                Err(failure) => {
                    log::warn!("Failed to restart {}: {}", url, failure.error);
                    if let Some(handle) = failure.handle {
                        let error = NetworkError::TransportUnavailable(failure.error.to_string());
                        handle.client.borrow_mut().did_fail(&error);
                    }
                }
            }
        }
    }
}

impl Default for NetworkManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::{LoadControl, ResourceConsumer};
    use crate::response::Response;
    use crate::transport::TransportStream;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Log {
        events: Vec<String>,
    }

    impl ResourceConsumer for Log {
        fn did_receive_response(&mut self, _: &mut LoadControl, response: &Response) {
            self.events.push(format!("response {}", response.status()));
        }
        fn did_receive_data(&mut self, _: &mut LoadControl, data: &[u8]) {
            self.events.push(format!("data {}", String::from_utf8_lossy(data)));
        }
        fn did_finish_loading(&mut self) {
            self.events.push("finish".to_string());
        }
        fn did_fail(&mut self, error: &NetworkError) {
            self.events.push(format!("fail {}", error));
        }
    }

    struct Idle;
    impl TransportStream for Idle {
        fn cancel(&mut self) {}
    }

    struct IdleFactory;
    impl TransportFactory for IdleFactory {
        fn open(&self, _: &TransportRequest, _: EventSink) -> Result<Box<dyn TransportStream>, NetworkError> {
            Ok(Box::new(Idle))
        }
    }

    fn start(manager: &mut NetworkManager, consumer: u64, url: &str) -> (Rc<RefCell<Log>>, Result<JobId, NetworkError>) {
        let log = Rc::new(RefCell::new(Log::default()));
        let request = Request::new(crate::request::Method::GET, url).unwrap();
        let result = manager.start_job(ConsumerId(consumer), log.clone(), request, Rc::new(IdleFactory), false);
        (log, result)
    }

    #[test]
    fn test_one_job_per_consumer() {
        let mut manager = NetworkManager::new();
        let (_, first) = start(&mut manager, 1, "https://example.com/");
        assert!(first.is_ok());
        let (_, second) = start(&mut manager, 1, "https://example.com/other");
        assert!(matches!(second, Err(NetworkError::DuplicateJob(ConsumerId(1)))));
        assert_eq!(manager.job_count(), 1);
    }

    #[test]
    fn test_finished_job_is_deleted_on_a_later_turn() {
        let mut manager = NetworkManager::new();
        let (log, id) = start(&mut manager, 1, "https://example.com/");
        let id = id.unwrap();

        manager.dispatch(id, TransportEvent::open(200, "OK"));
        manager.dispatch(id, TransportEvent::data(&b"hi"[..]));
        manager.dispatch(id, TransportEvent::Done);

        assert!(!manager.has_job(ConsumerId(1)));
        assert_eq!(manager.job_count(), 1);
        manager.run_until_idle();
        assert_eq!(manager.job_count(), 0);
        assert_eq!(log.borrow().events, vec!["response 200", "data hi", "finish"]);
    }

    #[test]
    fn test_data_url_loads_on_a_later_turn() {
        let mut manager = NetworkManager::new();
        let (log, id) = start(&mut manager, 1, "data:,hello");
        assert!(id.is_ok());
        assert!(log.borrow().events.is_empty());

        manager.run_until_idle();
        assert_eq!(log.borrow().events, vec!["response 200", "data hello", "finish"]);
    }

    #[test]
    fn test_stop_job_before_synthetic_load() {
        let mut manager = NetworkManager::new();
        let (log, _) = start(&mut manager, 1, "about:blank");
        assert!(manager.stop_job(ConsumerId(1)));
        assert!(!manager.stop_job(ConsumerId(1)));
        manager.run_until_idle();
        assert!(log.borrow().events.is_empty());
        assert_eq!(manager.job_count(), 0);
    }

    #[test]
    fn test_events_from_sink_are_picked_up_by_tick() {
        let mut manager = NetworkManager::new();
        let (log, id) = start(&mut manager, 1, "https://example.com/");
        let sink = manager.event_sink(id.unwrap());
        sink.open(404, "Not Found");
        sink.done();

        assert!(log.borrow().events.is_empty());
        manager.run_until_idle();
        assert_eq!(log.borrow().events.len(), 1);
        assert!(log.borrow().events[0].starts_with("fail"));
    }
}
