#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use batch_golem::queue::{ItemStarter, StateListener};
use batch_golem::types::{
    ExecutionGroup, QueueState, QueueStatus, ScheduleGroupSpec, WorkItemRef,
};

/// Records every id passed to `start`, in call order.
///
/// Clones share the log, so a test can keep one clone and hand the other to
/// the controller.
#[derive(Clone, Default)]
pub struct RecordingStarter {
    started: Arc<Mutex<Vec<String>>>,
}

impl RecordingStarter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    /// Number of times `item_id` was started.
    pub fn count(&self, item_id: &str) -> usize {
        self.started
            .lock()
            .unwrap()
            .iter()
            .filter(|id| id.as_str() == item_id)
            .count()
    }

    pub fn clear(&self) {
        self.started.lock().unwrap().clear();
    }
}

impl ItemStarter for RecordingStarter {
    fn start(&mut self, item_id: &str) {
        self.started.lock().unwrap().push(item_id.to_string());
    }
}

/// Captures every snapshot handed to the state-change listener.
#[derive(Clone, Default)]
pub struct StateLog {
    states: Arc<Mutex<Vec<QueueState>>>,
    calls: Arc<AtomicUsize>,
}

impl StateLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listener(&self) -> StateListener {
        let states = Arc::clone(&self.states);
        let calls = Arc::clone(&self.calls);
        Box::new(move |state: &QueueState| {
            calls.fetch_add(1, Ordering::SeqCst);
            states.lock().unwrap().push(state.clone());
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last(&self) -> Option<QueueState> {
        self.states.lock().unwrap().last().cloned()
    }

    pub fn statuses(&self) -> Vec<QueueStatus> {
        self.states
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.status)
            .collect()
    }
}

/// One sequential group per id, in order.
pub fn sequential_groups(ids: &[&str]) -> Vec<ExecutionGroup> {
    ids.iter().map(|id| ExecutionGroup::sequential(id)).collect()
}

/// `[{sequential: t1}, {parallel: t2, t3}]`
pub fn sequential_then_parallel() -> Vec<ExecutionGroup> {
    vec![
        ExecutionGroup::sequential("t1"),
        ExecutionGroup::parallel(&["t2", "t3"]),
    ]
}

pub fn item(id: &str, title: &str) -> WorkItemRef {
    WorkItemRef::new(id, title)
}

pub fn schedule(parallel: bool, titles: &[&str]) -> ScheduleGroupSpec {
    ScheduleGroupSpec {
        parallel,
        titles: titles.iter().map(|t| t.to_string()).collect(),
    }
}

/// A persisted-looking snapshot with fixed timestamps.
pub fn snapshot(
    status: QueueStatus,
    cursor: usize,
    groups: Vec<ExecutionGroup>,
    completed: &[&str],
) -> QueueState {
    QueueState {
        status,
        cursor,
        groups,
        completed_item_ids: completed.iter().map(|s| s.to_string()).collect(),
        paused_at: match status {
            QueueStatus::Paused => Some("2026-02-10T00:00:00+00:00".to_string()),
            _ => None,
        },
        updated_at: "2026-02-10T00:00:00+00:00".to_string(),
    }
}
