use std::path::PathBuf;

/// Errors surfaced by the collaborators around the queue: plan and state
/// files, configuration, the runtime lock, and the coordinator channel.
///
/// The queue controller itself never fails; bad inputs are clamped.
#[derive(Debug, thiserror::Error)]
pub enum BgError {
    #[error("Failed to read {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {}", .path.display(), .source)]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {}", .path.display(), .message)]
    Parse { path: PathBuf, message: String },

    #[error("Plan validation failed:\n{}", bullet_list(.0))]
    InvalidPlan(Vec<String>),

    #[error("Config validation failed:\n{}", bullet_list(.0))]
    InvalidConfig(Vec<String>),

    #[error("{0}")]
    Lock(String),

    #[error(
        "Batch recorded in {} already completed. Run with --fresh or `batch-golem reset` to start it over",
        .path.display()
    )]
    BatchCompleted { path: PathBuf },

    #[error("Queue coordinator shut down")]
    QueueShutDown,
}

impl BgError {
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BgError::Read {
            path: path.into(),
            source,
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BgError::Write {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        BgError::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

fn bullet_list(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| format!("  - {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}
