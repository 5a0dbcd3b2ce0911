use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use batch_golem::config;
use batch_golem::coordinator;
use batch_golem::error::BgError;
use batch_golem::executor::{self, DryRunOptions};
use batch_golem::lock;
use batch_golem::log::LogLevel;
use batch_golem::plan::{self, BatchPlan};
use batch_golem::state_file;
use batch_golem::types::{ExecutionGroup, QueueState, QueueStatus};
use batch_golem::{log_info, log_warn};

#[derive(Parser)]
#[command(name = "batch-golem", about = "Grouped batch runner with pause and resume")]
struct Cli {
    /// Project root directory (defaults to current directory)
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Log verbosity level (error, warn, info, debug)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the execution groups assembled from the plan
    Groups,
    /// Show the persisted queue state
    Status,
    /// Drive the batch with the built-in dry-run executor
    Run {
        /// Item IDs that should report failure (can be specified multiple times)
        #[arg(long, action = clap::ArgAction::Append)]
        fail: Vec<String>,
        /// Pause after this many items have finished
        #[arg(long)]
        pause_after: Option<usize>,
        /// Ignore and discard any persisted queue state
        #[arg(long)]
        fresh: bool,
    },
    /// Delete the persisted queue state
    Reset,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.log_level.parse::<LogLevel>() {
        Ok(level) => batch_golem::log::set_log_level(level),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    let root = &cli.root;

    let result = match cli.command {
        Commands::Groups => handle_groups(root),
        Commands::Status => handle_status(root),
        Commands::Run {
            fail,
            pause_after,
            fresh,
        } => handle_run(root, fail, pause_after, fresh).await,
        Commands::Reset => handle_reset(root),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_valid_plan(root: &Path, config: &config::BatchGolemConfig) -> Result<BatchPlan, BgError> {
    let plan = plan::load_plan(&config.plan_path(root))?;
    plan::validate(&plan).map_err(BgError::InvalidPlan)?;
    Ok(plan)
}

fn group_label(group: &ExecutionGroup) -> &'static str {
    if group.parallel {
        "parallel"
    } else {
        "sequential"
    }
}

fn handle_groups(root: &Path) -> Result<(), BgError> {
    let config = config::load_config(root)?;
    let plan = load_valid_plan(root, &config)?;
    let groups = plan.groups();

    if plan.schedule.is_none() {
        println!("No schedule in plan; running items one at a time in creation order.");
    }

    for (index, group) in groups.iter().enumerate() {
        println!(
            "{:>3}. {:<10} {}",
            index + 1,
            group_label(group),
            group.item_ids.join(", ")
        );
    }

    let unmatched = plan.unmatched_titles();
    if !unmatched.is_empty() {
        println!("\nUnmatched schedule titles (skipped):");
        for title in &unmatched {
            println!("  - {}", title);
        }
    }

    let scheduled: usize = groups.iter().map(|g| g.item_ids.len()).sum();
    println!(
        "\n{} group(s), {} of {} item(s) scheduled",
        groups.len(),
        scheduled,
        plan.items.len()
    );

    Ok(())
}

fn handle_status(root: &Path) -> Result<(), BgError> {
    let config = config::load_config(root)?;
    let state = match state_file::load(&config.state_path(root))? {
        Some(s) => s,
        None => {
            println!("No persisted queue state.");
            return Ok(());
        }
    };

    print_state(&state);
    Ok(())
}

fn print_state(state: &QueueState) {
    println!("Status:  {}", state.status);
    println!(
        "Cursor:  {}/{}",
        state.cursor.min(state.groups.len()),
        state.groups.len()
    );
    if let Some(paused_at) = &state.paused_at {
        println!("Paused:  {}", paused_at);
    }
    println!("Updated: {}", state.updated_at);
    println!();

    for (index, group) in state.groups.iter().enumerate() {
        let done = group
            .item_ids
            .iter()
            .filter(|id| state.is_item_completed(id))
            .count();
        let marker = if index == state.cursor && state.status != QueueStatus::Completed {
            ">"
        } else {
            " "
        };
        println!(
            "{} {:>3}. {:<10} {}/{} done  {}",
            marker,
            index + 1,
            group_label(group),
            done,
            group.item_ids.len(),
            group.item_ids.join(", ")
        );
    }

    println!(
        "\n{} of {} item(s) completed",
        state.completed_item_ids.len(),
        state.total_items()
    );
}

async fn handle_run(
    root: &Path,
    fail: Vec<String>,
    pause_after: Option<usize>,
    fresh: bool,
) -> Result<(), BgError> {
    log_info!("--- Batch Golem ---");

    let config = config::load_config(root)?;
    let _lock = lock::try_acquire(&config.runtime_dir(root))?;

    let plan = load_valid_plan(root, &config)?;
    let groups = plan.groups();
    for title in plan.unmatched_titles() {
        log_warn!("[pre] Schedule title '{}' matched no item; skipped", title);
    }

    let state_path = config.state_path(root);
    if fresh {
        state_file::remove(&state_path)?;
    }
    let initial_state = if config.execution.resume && !fresh {
        state_file::restore(&state_path, &groups)?
    } else {
        None
    };

    log_info!(
        "[config] {} group(s), delay={}ms, resume={}",
        groups.len(),
        config.execution.dry_run_delay_ms,
        config.execution.resume
    );

    let (starter, started_rx) = executor::channel_starter();
    let (handle, queue_task) = coordinator::spawn_queue(groups, starter, initial_state);
    let persist_task = tokio::spawn(state_file::persist_changes(
        handle.subscribe(),
        state_path.clone(),
    ));

    if handle.is_paused() {
        handle.resume().await?;
    }

    let cancel = CancellationToken::new();
    let options = DryRunOptions {
        delay: Duration::from_millis(config.execution.dry_run_delay_ms),
        fail_ids: fail.into_iter().collect::<HashSet<_>>(),
        pause_after,
    };
    let executor_task = tokio::spawn(executor::run_dry_executor(
        started_rx,
        handle.clone(),
        options,
        cancel.clone(),
    ));

    let mut states = handle.subscribe();
    tokio::select! {
        _ = states.wait_for(|s| s.status != QueueStatus::Running) => {}
        _ = tokio::signal::ctrl_c() => {
            log_info!("");
            log_info!("[run] Interrupted; pausing queue");
            handle.pause(None).await?;
        }
    }

    cancel.cancel();
    let report = match executor_task.await {
        Ok(r) => r,
        Err(e) => {
            log_warn!("Executor task panicked: {:?}", e);
            Default::default()
        }
    };

    let final_state = handle.get_state().await?;
    drop(states);
    drop(handle);
    if let Err(e) = queue_task.await {
        log_warn!("Queue task panicked: {:?}", e);
    }
    if let Err(e) = persist_task.await {
        log_warn!("Persist task panicked: {:?}", e);
    }
    state_file::save(&state_path, &final_state)?;

    log_info!("");
    log_info!("--- Run Summary ---");
    log_info!("Status: {}", final_state.status);
    log_info!(
        "Items finished this run: {} ({} started, {} duplicate start(s) suppressed)",
        report.finished.len(),
        report.started.len(),
        report.duplicate_starts
    );
    log_info!(
        "Completed overall: {}/{}",
        final_state.completed_item_ids.len(),
        final_state.total_items()
    );
    if final_state.status == QueueStatus::Paused {
        log_info!("Run `batch-golem run` again to resume.");
    }

    Ok(())
}

fn handle_reset(root: &Path) -> Result<(), BgError> {
    let config = config::load_config(root)?;
    let state_path = config.state_path(root);
    state_file::remove(&state_path)?;
    println!("Removed {}", state_path.display());
    Ok(())
}
