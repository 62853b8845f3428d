//! Timer queue for delayed store work.
//!
//! Tasks are plain data: the store decides what each one does when it comes
//! due. Ordering is by due time, then by scheduling order, so two timers set
//! for the same instant fire in the order they were created.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::demo::DemoStep;

/// Handle for cancelling a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Drop a notification once its display time is over.
    ExpireNotification(String),
    /// Run the next step of the scripted demo.
    Demo(DemoStep),
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    next_seq: u64,
    pending: BTreeMap<(DateTime<Utc>, TaskId), Task>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: DateTime<Utc>, task: Task) -> TaskId {
        let id = TaskId(self.next_seq);
        self.next_seq += 1;
        self.pending.insert((due, id), task);
        id
    }

    /// Returns false if the task already fired or was cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let key = self.pending.keys().find(|(_, task_id)| *task_id == id).copied();
        match key {
            Some(key) => self.pending.remove(&key).is_some(),
            None => false,
        }
    }

    /// Remove and return the earliest task due at or before `now`.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<(TaskId, Task)> {
        let (due, _) = *self.pending.keys().next()?;
        if due > now {
            return None;
        }
        self.pending
            .pop_first()
            .map(|((_, id), task)| (id, task))
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.pending.keys().next().map(|(due, _)| *due)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
