use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::assembler;
use crate::error::BgError;
use crate::types::{ExecutionGroup, ScheduleGroupSpec, WorkItemRef};

/// The batch plan file: created work items plus an optional title-based
/// schedule.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct BatchPlan {
    #[serde(default)]
    pub items: Vec<WorkItemRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Vec<ScheduleGroupSpec>>,
}

impl BatchPlan {
    pub fn groups(&self) -> Vec<ExecutionGroup> {
        assembler::assemble_groups(self.schedule.as_deref(), &self.items)
    }

    /// Schedule titles that matched no remaining item. Empty without a
    /// schedule.
    pub fn unmatched_titles(&self) -> Vec<String> {
        match &self.schedule {
            Some(schedule) => assembler::unmatched_titles(schedule, &self.items),
            None => Vec::new(),
        }
    }
}

pub fn load_plan(path: &Path) -> Result<BatchPlan, BgError> {
    let contents = fs::read_to_string(path).map_err(|e| BgError::read(path, e))?;

    if contents.trim().is_empty() {
        return Ok(BatchPlan::default());
    }

    serde_yaml_ng::from_str(&contents).map_err(|e| BgError::parse(path, e))
}

/// Check the item list. Reports every problem at once.
///
/// Unmatched schedule titles are deliberately not an error: matching is
/// best effort.
pub fn validate(plan: &BatchPlan) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if plan.items.is_empty() {
        errors.push("plan has no items".to_string());
    }

    let mut seen = HashSet::new();
    for (index, item) in plan.items.iter().enumerate() {
        if item.id.trim().is_empty() {
            errors.push(format!("items[{}]: id must not be empty", index));
        } else if !seen.insert(item.id.as_str()) {
            errors.push(format!("items[{}]: duplicate id '{}'", index, item.id));
        }

        if item.title.trim().is_empty() {
            errors.push(format!("items[{}]: title must not be empty", index));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
