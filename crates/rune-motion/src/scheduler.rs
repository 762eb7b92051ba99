//! Virtual-clock task scheduler.
//!
//! Everything time-based in this crate runs on a clock the host advances
//! explicitly, so behaviour is deterministic and testable:
//! - microtasks run on the next drain, before any timer
//! - timers fire once the clock reaches their due time, earliest first,
//!   ties broken by scheduling order
//! - timers can be cancelled by id until they fire

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Handle for cancelling a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Timer<T> {
    id: TimerId,
    due_ms: f64,
    task: T,
}

/// A fired timer.
#[derive(Debug)]
pub struct DueTask<T> {
    pub id: TimerId,
    pub due_ms: f64,
    pub task: T,
}

#[derive(Debug)]
pub struct Scheduler<T> {
    now_ms: f64,
    next_id: u64,
    timers: Vec<Timer<T>>,
    microtasks: VecDeque<T>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            now_ms: 0.0,
            next_id: 1,
            timers: Vec::new(),
            microtasks: VecDeque::new(),
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds.
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// Queue a task for the next drain.
    pub fn defer(&mut self, task: T) {
        self.microtasks.push_back(task);
    }

    /// Run `task` once `delay_ms` has elapsed. Negative delays fire on the
    /// next timer pass.
    pub fn schedule(&mut self, delay_ms: f64, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            due_ms: self.now_ms + delay_ms.max(0.0),
            task,
        });
        id
    }

    /// Cancel a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    pub fn pop_microtask(&mut self) -> Option<T> {
        self.microtasks.pop_front()
    }

    pub fn pending_microtasks(&self) -> usize {
        self.microtasks.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn is_idle(&self) -> bool {
        self.timers.is_empty() && self.microtasks.is_empty()
    }

    /// Remove the earliest timer due at or before `until_ms` and move the
    /// clock to its due time.
    pub fn pop_due(&mut self, until_ms: f64) -> Option<DueTask<T>> {
        // Timer ids increase with scheduling order, so they break ties.
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= until_ms)
            .min_by(|(_, a), (_, b)| {
                a.due_ms
                    .partial_cmp(&b.due_ms)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.id.0.cmp(&b.id.0))
            })
            .map(|(idx, _)| idx)?;

        let timer = self.timers.remove(idx);
        self.now_ms = self.now_ms.max(timer.due_ms);
        Some(DueTask {
            id: timer.id,
            due_ms: timer.due_ms,
            task: timer.task,
        })
    }

    /// Move the clock forward without firing anything.
    pub fn advance_to(&mut self, time_ms: f64) {
        self.now_ms = self.now_ms.max(time_ms);
    }

    /// Drop every pending timer and microtask.
    pub fn clear(&mut self) {
        self.timers.clear();
        self.microtasks.clear();
    }
}
