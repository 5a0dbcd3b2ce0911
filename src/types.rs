use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};

// --- Inputs ---

/// A created work item: the concrete id the executor knows, plus the title
/// the schedule refers to it by.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct WorkItemRef {
    pub id: String,
    pub title: String,
}

impl WorkItemRef {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
        }
    }
}

/// One entry of a title-based schedule. Titles may repeat.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct ScheduleGroupSpec {
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub titles: Vec<String>,
}

// --- Execution groups ---

/// A group of concrete item ids started together (`parallel`) or as a single
/// sequential step.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionGroup {
    pub parallel: bool,
    pub item_ids: Vec<String>,
}

impl ExecutionGroup {
    pub fn sequential(item_id: &str) -> Self {
        Self {
            parallel: false,
            item_ids: vec![item_id.to_string()],
        }
    }

    pub fn parallel(item_ids: &[&str]) -> Self {
        Self {
            parallel: true,
            item_ids: item_ids.iter().map(|id| id.to_string()).collect(),
        }
    }
}

// --- Queue state ---

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    #[default]
    Running,
    Paused,
    Completed,
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueStatus::Running => write!(f, "running"),
            QueueStatus::Paused => write!(f, "paused"),
            QueueStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Snapshot of a batch run. This is the shape handed to state-change
/// listeners and written to disk for resumption.
///
/// `completed_item_ids` has set semantics but keeps insertion order so the
/// persisted file is stable.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueueState {
    pub status: QueueStatus,
    #[serde(deserialize_with = "deserialize_cursor")]
    pub cursor: usize,
    pub groups: Vec<ExecutionGroup>,
    #[serde(default)]
    pub completed_item_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<String>,
    pub updated_at: String,
}

impl QueueState {
    /// A running state positioned at the first group with nothing completed.
    pub fn fresh(groups: Vec<ExecutionGroup>) -> Self {
        Self {
            status: QueueStatus::Running,
            cursor: 0,
            groups,
            completed_item_ids: Vec::new(),
            paused_at: None,
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn is_item_completed(&self, item_id: &str) -> bool {
        self.completed_item_ids.iter().any(|id| id == item_id)
    }

    /// Items of the group under the cursor that have not reported a terminal
    /// outcome yet. Empty once the cursor is past the last group.
    pub fn active_item_ids(&self) -> Vec<String> {
        let group = match self.groups.get(self.cursor) {
            Some(g) => g,
            None => return Vec::new(),
        };

        let completed: HashSet<&str> = self
            .completed_item_ids
            .iter()
            .map(String::as_str)
            .collect();
        group
            .item_ids
            .iter()
            .filter(|id| !completed.contains(id.as_str()))
            .cloned()
            .collect()
    }

    pub fn total_items(&self) -> usize {
        self.groups.iter().map(|g| g.item_ids.len()).sum()
    }
}

/// Accepts any integer cursor; negative values clamp to 0 instead of failing
/// the whole snapshot.
fn deserialize_cursor<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    Ok(usize::try_from(raw.max(0)).unwrap_or(usize::MAX))
}

// --- Completion events ---

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    Succeeded,
    Failed,
}

impl std::fmt::Display for ItemOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemOutcome::Succeeded => write!(f, "succeeded"),
            ItemOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// A terminal outcome reported by the execution subsystem for one item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionEvent {
    pub item_id: String,
    pub outcome: ItemOutcome,
}

impl CompletionEvent {
    pub fn succeeded(item_id: &str) -> Self {
        Self {
            item_id: item_id.to_string(),
            outcome: ItemOutcome::Succeeded,
        }
    }

    pub fn failed(item_id: &str) -> Self {
        Self {
            item_id: item_id.to_string(),
            outcome: ItemOutcome::Failed,
        }
    }
}
