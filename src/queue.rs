use std::collections::HashSet;

use crate::types::{ExecutionGroup, QueueState, QueueStatus};
use crate::{log_debug, log_info};

/// Begins execution of a single item.
///
/// Calls are fire-and-forget: the outcome arrives later through
/// [`QueueController::mark_done`]. After a resume the controller re-issues
/// `start` for every item of the current group that has not finished, so an
/// implementation must tolerate being asked to start an item that is
/// already running.
pub trait ItemStarter {
    fn start(&mut self, item_id: &str);
}

impl<F> ItemStarter for F
where
    F: FnMut(&str),
{
    fn start(&mut self, item_id: &str) {
        self(item_id)
    }
}

/// Invoked with the new snapshot after every state mutation.
pub type StateListener = Box<dyn FnMut(&QueueState) + Send>;

/// Drives a batch of [`ExecutionGroup`]s from the first group to completion.
///
/// Groups run strictly in order: the next group is started only once every
/// item of the current one has reported a terminal outcome. The controller
/// never blocks; between completions it simply does nothing. All methods
/// must be called from one logical thread of control (see
/// [`crate::coordinator`] for the channel-serialized wrapper).
pub struct QueueController<S: ItemStarter> {
    state: QueueState,
    starter: S,
    on_state_change: Option<StateListener>,
    /// Item whose completion triggered the last pause, if any.
    pause_trigger: Option<String>,
}

impl<S: ItemStarter> QueueController<S> {
    /// Build a controller and kick off the current group.
    ///
    /// With no groups the batch is completed on the spot: the listener fires
    /// once and nothing is started. Otherwise `initial_state` (if any) is
    /// restored onto `groups`, and unless that state is paused or completed
    /// the not-yet-completed items of the group under the cursor are started.
    pub fn start(
        groups: Vec<ExecutionGroup>,
        starter: S,
        on_state_change: Option<StateListener>,
        initial_state: Option<QueueState>,
    ) -> Self {
        if groups.is_empty() {
            let mut state = QueueState::fresh(groups);
            state.status = QueueStatus::Completed;
            let mut controller = Self::with_state(state, starter, on_state_change);
            controller.notify();
            return controller;
        }

        let state = match initial_state {
            Some(prior) => restore_state(groups, prior),
            None => QueueState::fresh(groups),
        };
        let mut controller = Self::with_state(state, starter, on_state_change);

        if controller.state.status == QueueStatus::Running {
            controller.start_current_group();
        }

        controller
    }

    fn with_state(state: QueueState, starter: S, on_state_change: Option<StateListener>) -> Self {
        Self {
            state,
            starter,
            on_state_change,
            pause_trigger: None,
        }
    }

    pub fn state(&self) -> &QueueState {
        &self.state
    }

    pub fn snapshot(&self) -> QueueState {
        self.state.clone()
    }

    pub fn is_paused(&self) -> bool {
        self.state.status == QueueStatus::Paused
    }

    pub fn is_completed(&self) -> bool {
        self.state.status == QueueStatus::Completed
    }

    pub fn pause_trigger(&self) -> Option<&str> {
        self.pause_trigger.as_deref()
    }

    /// Stop advancing past the current group.
    ///
    /// Already-started items keep running. `item_id` names the item whose
    /// completion prompted the pause; when it later reports, its completion
    /// is recorded without advancing. Returns `false` (and does nothing) when
    /// already paused or completed.
    pub fn pause(&mut self, item_id: Option<&str>) -> bool {
        if self.state.status != QueueStatus::Running {
            return false;
        }

        self.pause_trigger = item_id.map(str::to_string);
        self.state.status = QueueStatus::Paused;
        let now = now();
        self.state.paused_at = Some(now.clone());
        self.state.updated_at = now;

        log_info!(
            "[queue] Paused at group {}/{} ({} active item(s))",
            self.state.cursor + 1,
            self.state.groups.len(),
            self.state.active_item_ids().len()
        );
        self.notify();
        true
    }

    /// Continue a paused batch.
    ///
    /// Items of the current group that completed while paused are not
    /// restarted; every other item of the group is started again. Returns
    /// `false` (and does nothing) unless paused.
    pub fn resume(&mut self) -> bool {
        if self.state.status != QueueStatus::Paused {
            return false;
        }

        self.state.status = QueueStatus::Running;
        self.state.paused_at = None;
        self.touch();

        log_info!(
            "[queue] Resumed at group {}/{} ({} item(s) left in group)",
            (self.state.cursor + 1).min(self.state.groups.len()),
            self.state.groups.len(),
            self.state.active_item_ids().len()
        );
        self.pause_trigger = None;

        self.notify();
        self.start_current_group();
        true
    }

    /// Record a terminal outcome (success and failure alike) for `item_id`.
    ///
    /// Ids that are not active in the current group are ignored, which covers
    /// duplicate and late notifications. While paused the completion is
    /// recorded but never advances the batch. Returns whether the completion
    /// was recorded.
    pub fn mark_done(&mut self, item_id: &str) -> bool {
        if self.state.status == QueueStatus::Completed {
            log_debug!("[queue] Ignoring {}: batch already completed", item_id);
            return false;
        }

        let active = self.state.active_item_ids();
        if !active.iter().any(|id| id == item_id) {
            log_debug!(
                "[queue] Ignoring {}: not active in group {}",
                item_id,
                self.state.cursor + 1
            );
            return false;
        }

        self.state.completed_item_ids.push(item_id.to_string());
        self.touch();

        if self.state.status == QueueStatus::Paused {
            if self.pause_trigger.as_deref() == Some(item_id) {
                log_debug!("[queue] Pause trigger {} finished", item_id);
            } else {
                log_debug!("[queue] {} finished while paused", item_id);
            }
            self.notify();
            return true;
        }

        if active.len() == 1 {
            self.advance();
        } else {
            log_debug!(
                "[queue] {} finished, {} left in group {}",
                item_id,
                active.len() - 1,
                self.state.cursor + 1
            );
            self.notify();
        }
        true
    }

    fn advance(&mut self) {
        self.state.cursor += 1;
        self.touch();
        self.skip_finished_groups();

        if self.state.cursor >= self.state.groups.len() {
            self.finish();
            return;
        }

        log_debug!(
            "[queue] Advancing to group {}/{}",
            self.state.cursor + 1,
            self.state.groups.len()
        );
        self.notify();
        self.start_active_items();
    }

    /// Start the unfinished items of the group under the cursor. Groups with
    /// nothing left to do (restored state) are skipped without starting
    /// anything.
    fn start_current_group(&mut self) {
        let cursor = self.state.cursor;
        self.skip_finished_groups();

        if self.state.cursor >= self.state.groups.len() {
            self.finish();
            return;
        }

        if self.state.cursor != cursor {
            self.touch();
            self.notify();
        }
        self.start_active_items();
    }

    /// Move the cursor past every group whose items have all completed.
    fn skip_finished_groups(&mut self) {
        let completed: HashSet<&str> = self
            .state
            .completed_item_ids
            .iter()
            .map(String::as_str)
            .collect();

        let skipped = self.state.groups[self.state.cursor.min(self.state.groups.len())..]
            .iter()
            .take_while(|group| group.item_ids.iter().all(|id| completed.contains(id.as_str())))
            .count();

        if skipped > 0 {
            log_debug!("[queue] Skipping {} finished group(s)", skipped);
            self.state.cursor += skipped;
        }
    }

    fn start_active_items(&mut self) {
        for item_id in self.state.active_item_ids() {
            log_debug!("[queue] Starting {}", item_id);
            self.starter.start(&item_id);
        }
    }

    fn finish(&mut self) {
        self.state.status = QueueStatus::Completed;
        self.state.cursor = self.state.groups.len();
        self.state.paused_at = None;
        self.touch();

        log_info!(
            "[queue] Batch completed: {} group(s), {} item(s)",
            self.state.groups.len(),
            self.state.completed_item_ids.len()
        );
        self.notify();
    }

    fn touch(&mut self) {
        self.state.updated_at = now();
    }

    fn notify(&mut self) {
        if let Some(listener) = self.on_state_change.as_mut() {
            listener(&self.state);
        }
    }
}

/// Lay a previously persisted snapshot over the current groups.
///
/// The cursor is clamped into `[0, len]`, completions for ids outside the
/// groups are dropped along with duplicates, and a completed snapshot has its
/// cursor pinned to the end.
fn restore_state(groups: Vec<ExecutionGroup>, prior: QueueState) -> QueueState {
    let known: HashSet<&str> = groups
        .iter()
        .flat_map(|g| g.item_ids.iter().map(String::as_str))
        .collect();

    let mut seen = HashSet::new();
    let completed_item_ids: Vec<String> = prior
        .completed_item_ids
        .into_iter()
        .filter(|id| known.contains(id.as_str()) && seen.insert(id.clone()))
        .collect();

    let cursor = match prior.status {
        QueueStatus::Completed => groups.len(),
        _ => prior.cursor.min(groups.len()),
    };

    let paused_at = match prior.status {
        QueueStatus::Paused => Some(prior.paused_at.unwrap_or_else(now)),
        _ => None,
    };

    QueueState {
        status: prior.status,
        cursor,
        groups,
        completed_item_ids,
        paused_at,
        updated_at: prior.updated_at,
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
