//! In-process stand-in for the execution subsystem used by `run`.
//!
//! Started item ids flow from the queue through a [`ChannelStarter`] into
//! [`run_dry_executor`], which "runs" each one for a fixed delay and reports
//! its outcome back through the [`QueueHandle`].

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::coordinator::QueueHandle;
use crate::queue::ItemStarter;
use crate::types::CompletionEvent;
use crate::{log_debug, log_info, log_warn};

/// Forwards start requests to an executor over an unbounded channel, so
/// starting never blocks the queue.
pub struct ChannelStarter {
    tx: mpsc::UnboundedSender<String>,
}

impl ItemStarter for ChannelStarter {
    fn start(&mut self, item_id: &str) {
        if self.tx.send(item_id.to_string()).is_err() {
            log_warn!("[{}] Executor is gone; start request dropped", item_id);
        }
    }
}

pub fn channel_starter() -> (ChannelStarter, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelStarter { tx }, rx)
}

#[derive(Debug, Clone, Default)]
pub struct DryRunOptions {
    /// How long each item "runs" before reporting.
    pub delay: Duration,
    /// Items that report failure instead of success.
    pub fail_ids: HashSet<String>,
    /// Pause the queue when this many items have finished, with the last
    /// finisher as the pause trigger.
    pub pause_after: Option<usize>,
}

/// Summary of what the dry-run executor did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DryRunReport {
    pub started: Vec<String>,
    pub finished: Vec<String>,
    pub duplicate_starts: u32,
}

/// Consume start requests until cancelled or the queue goes away.
///
/// A start for an item that is already in flight is suppressed: the queue
/// re-issues starts on resume and leaves deduplication to the executor.
/// Cancelling drops in-flight items without reporting them.
pub async fn run_dry_executor(
    mut started: mpsc::UnboundedReceiver<String>,
    handle: QueueHandle,
    options: DryRunOptions,
    cancel: CancellationToken,
) -> DryRunReport {
    let mut in_flight: HashSet<String> = HashSet::new();
    let mut running: JoinSet<String> = JoinSet::new();
    let mut report = DryRunReport::default();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = started.recv() => {
                let item_id = match next {
                    Some(id) => id,
                    None => break,
                };
                if !in_flight.insert(item_id.clone()) {
                    log_debug!("[{}] Already running; duplicate start suppressed", item_id);
                    report.duplicate_starts += 1;
                    continue;
                }
                log_info!("[{}] Started", item_id);
                report.started.push(item_id.clone());
                let delay = options.delay;
                running.spawn(async move {
                    tokio::time::sleep(delay).await;
                    item_id
                });
            }
            Some(joined) = running.join_next(), if !running.is_empty() => {
                let item_id = match joined {
                    Ok(id) => id,
                    Err(e) => {
                        log_warn!("Dry-run task ended abnormally: {}", e);
                        continue;
                    }
                };
                in_flight.remove(&item_id);
                report.finished.push(item_id.clone());

                if options.pause_after == Some(report.finished.len()) {
                    if let Err(e) = handle.pause(Some(&item_id)).await {
                        log_warn!("Failed to pause queue: {}", e);
                        break;
                    }
                }

                let event = if options.fail_ids.contains(&item_id) {
                    CompletionEvent::failed(&item_id)
                } else {
                    CompletionEvent::succeeded(&item_id)
                };
                if let Err(e) = handle.report(event).await {
                    log_warn!("Failed to report {}: {}", item_id, e);
                    break;
                }
            }
        }
    }

    report
}
