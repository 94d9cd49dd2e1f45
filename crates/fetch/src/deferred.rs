//! Per-job buffer for transport events that arrive while delivery is paused.
//!
//! Delivering an event can run script, and script can pause delivery again
//! or cancel the job. [`DeferredQueue::process`] therefore re-checks the
//! job's state after every step and leaves whatever it did not deliver in
//! place for the next pass.

use std::collections::VecDeque;

use bytes::Bytes;

/// The job side of deferred delivery
pub(crate) trait DeferredDelivery<C> {
    fn is_deferring_loading(&self) -> bool;
    fn is_cancelled(&self) -> bool;

    fn handle_open(&mut self, cx: &mut C, status: i32, message: &str);
    fn handle_wml_override(&mut self, cx: &mut C);
    fn handle_header(&mut self, cx: &mut C, key: &str, value: &str);
    fn handle_data(&mut self, cx: &mut C, data: &[u8]);
    fn handle_data_sent(&mut self, cx: &mut C, sent: u64, total: u64);
    fn handle_done(&mut self, cx: &mut C);
}

/// How a drain pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DrainOutcome {
    /// Everything queued was delivered
    Drained,
    /// Delivery was paused again or the job was cancelled
    Stopped,
    /// The per-pass data budget ran out; another pass must be scheduled
    BudgetExhausted,
    /// A pass was already running further up the stack
    Reentered,
}

#[derive(Debug, Default)]
pub struct DeferredQueue {
    open: Option<(i32, String)>,
    wml_override: bool,
    headers: VecDeque<(String, String)>,
    data: VecDeque<Bytes>,
    data_sent: Option<(u64, u64)>,
    done: bool,
    in_process: bool,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn defer_open(&mut self, status: i32, message: &str) {
        self.open = Some((status, message.to_string()));
    }

    pub fn defer_wml_override(&mut self) {
        self.wml_override = true;
    }

    pub fn defer_header(&mut self, key: &str, value: &str) {
        self.headers.push_back((key.to_string(), value.to_string()));
    }

    /// Chunks are kept as separate buffers, never merged
    pub fn defer_data(&mut self, data: Bytes) {
        self.data.push_back(data);
    }

    /// Only the latest upload progress is kept
    pub fn defer_data_sent(&mut self, sent: u64, total: u64) {
        self.data_sent = Some((sent, total));
    }

    pub fn defer_done(&mut self) {
        self.done = true;
    }

    /// Whether anything is waiting. Live events must queue behind it.
    pub fn has_deferred_data(&self) -> bool {
        self.open.is_some()
            || self.wml_override
            || !self.headers.is_empty()
            || !self.data.is_empty()
            || self.data_sent.is_some()
            || self.done
    }

    pub fn buffered_bytes(&self) -> usize {
        self.data.iter().map(Bytes::len).sum()
    }

    pub fn buffered_chunks(&self) -> usize {
        self.data.len()
    }

    /// Throw everything away
    pub fn clear(&mut self) {
        let in_process = self.in_process;
        *self = Self::default();
        self.in_process = in_process;
    }

    /// Deliver queued events in order: open, WML override, headers, at most
    /// `budget` bytes of data, upload progress, then done.
    pub(crate) fn process<C, T: DeferredDelivery<C>>(&mut self, job: &mut T, cx: &mut C, budget: usize) -> DrainOutcome {
        if self.in_process {
            return DrainOutcome::Reentered;
        }
        self.in_process = true;
        let outcome = self.drain(job, cx, budget);
        self.in_process = false;
        outcome
    }

    fn drain<C, T: DeferredDelivery<C>>(&mut self, job: &mut T, cx: &mut C, budget: usize) -> DrainOutcome {
        let stopped = |job: &T| job.is_deferring_loading() || job.is_cancelled();

        if stopped(&*job) {
            return DrainOutcome::Stopped;
        }

        if let Some((status, message)) = self.open.take() {
            job.handle_open(cx, status, &message);
            if stopped(&*job) {
                return DrainOutcome::Stopped;
            }
        }

        if self.wml_override {
            self.wml_override = false;
            job.handle_wml_override(cx);
            if stopped(&*job) {
                return DrainOutcome::Stopped;
            }
        }

        while let Some((key, value)) = self.headers.pop_front() {
            job.handle_header(cx, &key, &value);
            if stopped(&*job) {
                return DrainOutcome::Stopped;
            }
        }

        let mut delivered = 0usize;
        while let Some(chunk) = self.data.pop_front() {
            job.handle_data(cx, &chunk);
            delivered += chunk.len();
            if stopped(&*job) {
                return DrainOutcome::Stopped;
            }
            if delivered >= budget && !self.data.is_empty() {
                return DrainOutcome::BudgetExhausted;
            }
        }

        if let Some((sent, total)) = self.data_sent.take() {
            if total > 0 {
                job.handle_data_sent(cx, sent, total);
                if stopped(&*job) {
                    return DrainOutcome::Stopped;
                }
            }
        }

        if self.done {
            self.done = false;
            job.handle_done(cx);
        }

        DrainOutcome::Drained
    }
}
