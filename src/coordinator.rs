//! Serializes every interaction with a [`QueueController`] onto one tokio
//! task.
//!
//! Completion events, pause/resume requests and snapshot reads arrive as
//! commands over an mpsc channel and are applied one at a time, so the
//! controller never sees two callbacks at once even on a multi-threaded
//! runtime. State changes are published on a watch channel.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use crate::error::BgError;
use crate::queue::{ItemStarter, QueueController};
use crate::types::{CompletionEvent, ExecutionGroup, ItemOutcome, QueueState, QueueStatus};
use crate::{log_info, log_warn};

// --- Command enum ---

pub enum QueueCommand {
    ReportOutcome {
        event: CompletionEvent,
        reply: oneshot::Sender<bool>,
    },
    Pause {
        item_id: Option<String>,
        reply: oneshot::Sender<bool>,
    },
    Resume {
        reply: oneshot::Sender<bool>,
    },
    GetState {
        reply: oneshot::Sender<QueueState>,
    },
}

// --- QueueHandle ---

#[derive(Clone)]
pub struct QueueHandle {
    sender: mpsc::Sender<QueueCommand>,
    states: watch::Receiver<QueueState>,
}

impl QueueHandle {
    async fn send_command<T>(
        &self,
        command: QueueCommand,
        rx: oneshot::Receiver<T>,
    ) -> Result<T, BgError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| BgError::QueueShutDown)?;
        rx.await.map_err(|_| BgError::QueueShutDown)
    }

    /// Deliver a terminal outcome for one item. Returns whether the queue
    /// recorded it (late and duplicate reports are ignored).
    pub async fn report(&self, event: CompletionEvent) -> Result<bool, BgError> {
        let (reply, rx) = oneshot::channel();
        self.send_command(QueueCommand::ReportOutcome { event, reply }, rx)
            .await
    }

    pub async fn pause(&self, item_id: Option<&str>) -> Result<bool, BgError> {
        let (reply, rx) = oneshot::channel();
        self.send_command(
            QueueCommand::Pause {
                item_id: item_id.map(str::to_string),
                reply,
            },
            rx,
        )
        .await
    }

    pub async fn resume(&self) -> Result<bool, BgError> {
        let (reply, rx) = oneshot::channel();
        self.send_command(QueueCommand::Resume { reply }, rx).await
    }

    pub async fn get_state(&self) -> Result<QueueState, BgError> {
        let (reply, rx) = oneshot::channel();
        self.send_command(QueueCommand::GetState { reply }, rx)
            .await
    }

    /// Latest published snapshot, without a round trip through the actor.
    pub fn latest(&self) -> QueueState {
        self.states.borrow().clone()
    }

    pub fn is_paused(&self) -> bool {
        self.states.borrow().status == QueueStatus::Paused
    }

    pub fn is_completed(&self) -> bool {
        self.states.borrow().status == QueueStatus::Completed
    }

    /// A receiver that yields each state change (the `on_state_change` hook
    /// for callers outside the actor).
    pub fn subscribe(&self) -> watch::Receiver<QueueState> {
        self.states.clone()
    }

    /// Wait until the batch reaches `completed`.
    pub async fn wait_completed(&self) -> Result<QueueState, BgError> {
        let mut states = self.states.clone();
        let state = states
            .wait_for(|s| s.status == QueueStatus::Completed)
            .await
            .map_err(|_| BgError::QueueShutDown)?;
        Ok(state.clone())
    }
}

// --- Actor implementation ---

const CHANNEL_CAPACITY: usize = 32;

fn handle_report<S: ItemStarter>(
    controller: &mut QueueController<S>,
    event: &CompletionEvent,
) -> bool {
    match event.outcome {
        ItemOutcome::Succeeded => log_info!("[{}] Succeeded", event.item_id),
        // Failure still counts as done; the batch does not stall on it
        ItemOutcome::Failed => log_warn!("[{}] Failed", event.item_id),
    }
    controller.mark_done(&event.item_id)
}

async fn run_queue<S: ItemStarter>(
    mut rx: mpsc::Receiver<QueueCommand>,
    mut controller: QueueController<S>,
) -> QueueState {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            QueueCommand::ReportOutcome { event, reply } => {
                let recorded = handle_report(&mut controller, &event);
                let _ = reply.send(recorded);
            }
            QueueCommand::Pause { item_id, reply } => {
                let changed = controller.pause(item_id.as_deref());
                let _ = reply.send(changed);
            }
            QueueCommand::Resume { reply } => {
                let changed = controller.resume();
                let _ = reply.send(changed);
            }
            QueueCommand::GetState { reply } => {
                let _ = reply.send(controller.snapshot());
            }
        }
    }

    controller.snapshot()
}

/// Start a queue over `groups` on its own task.
///
/// The controller is built (and the first group started through `starter`)
/// before this returns. The task ends once every [`QueueHandle`] is dropped
/// and yields the final snapshot.
pub fn spawn_queue<S>(
    groups: Vec<ExecutionGroup>,
    starter: S,
    initial_state: Option<QueueState>,
) -> (QueueHandle, tokio::task::JoinHandle<QueueState>)
where
    S: ItemStarter + Send + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (state_tx, state_rx) = watch::channel(QueueState::fresh(groups.clone()));
    let state_tx = Arc::new(state_tx);

    let publisher = Arc::clone(&state_tx);
    let controller = QueueController::start(
        groups,
        starter,
        Some(Box::new(move |state: &QueueState| {
            publisher.send_replace(state.clone());
        })),
        initial_state,
    );
    // Restored states change nothing on construction, so publish explicitly
    state_tx.send_replace(controller.snapshot());

    let task_handle = tokio::spawn(run_queue(rx, controller));

    (
        QueueHandle {
            sender: tx,
            states: state_rx,
        },
        task_handle,
    )
}
