use std::collections::VecDeque;

use crate::transport::JobId;

/// Work a job asked to run on a later turn of the cooperative loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Resume draining the job's deferred events
    ProcessDeferred,
    /// Produce the events of a `data:` URL or built-in `about:` page
    LoadSynthetic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Task {
    pub job: JobId,
    pub kind: TaskKind,
}

/// Zero-delay one-shot timers.
///
/// Tasks scheduled while a batch is running are not part of that batch; they
/// run on the next turn.
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: VecDeque<Task>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer unless an identical one is already pending
    pub fn schedule(&mut self, job: JobId, kind: TaskKind) {
        if !self.is_scheduled(job, kind) {
            self.queue.push_back(Task { job, kind });
        }
    }

    pub fn is_scheduled(&self, job: JobId, kind: TaskKind) -> bool {
        self.queue.iter().any(|t| t.job == job && t.kind == kind)
    }

    /// Stop a pending timer. Returns whether one was pending.
    pub fn cancel(&mut self, job: JobId, kind: TaskKind) -> bool {
        let before = self.queue.len();
        self.queue.retain(|t| !(t.job == job && t.kind == kind));
        self.queue.len() != before
    }

    /// Drop every timer belonging to a job
    pub fn cancel_all(&mut self, job: JobId) {
        self.queue.retain(|t| t.job != job);
    }

    /// Take the tasks due on this turn
    pub fn take_due(&mut self) -> Vec<Task> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
