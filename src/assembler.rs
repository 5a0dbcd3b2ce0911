use std::collections::{HashMap, VecDeque};

use crate::types::{ExecutionGroup, ScheduleGroupSpec, WorkItemRef};

/// Map a title-based schedule onto concrete item ids.
///
/// Each title claims the first unclaimed id carrying that title, in creation
/// order. Titles with nothing left to claim are dropped, and so are groups
/// that end up empty. Without a schedule every item becomes its own
/// sequential group.
///
/// This is a pure function: it never fails and never invents an id.
pub fn assemble_groups(
    schedule: Option<&[ScheduleGroupSpec]>,
    items: &[WorkItemRef],
) -> Vec<ExecutionGroup> {
    let schedule = match schedule {
        Some(s) => s,
        None => {
            return items
                .iter()
                .map(|item| ExecutionGroup::sequential(&item.id))
                .collect();
        }
    };

    let mut ids_by_title = index_by_title(items);

    schedule
        .iter()
        .map(|spec| ExecutionGroup {
            parallel: spec.parallel,
            item_ids: spec
                .titles
                .iter()
                .filter_map(|title| {
                    ids_by_title
                        .get_mut(title.as_str())?
                        .pop_front()
                        .map(str::to_string)
                })
                .collect(),
        })
        .filter(|group| !group.item_ids.is_empty())
        .collect()
}

/// Titles in the schedule that did not claim an id, in schedule order.
///
/// Runs the same claiming pass as [`assemble_groups`], so a repeated title
/// shows up once per unmatched occurrence.
pub fn unmatched_titles(schedule: &[ScheduleGroupSpec], items: &[WorkItemRef]) -> Vec<String> {
    let mut ids_by_title = index_by_title(items);
    let mut unmatched = Vec::new();

    for title in schedule.iter().flat_map(|spec| spec.titles.iter()) {
        let claimed = ids_by_title
            .get_mut(title.as_str())
            .and_then(|ids| ids.pop_front());
        if claimed.is_none() {
            unmatched.push(title.clone());
        }
    }

    unmatched
}

fn index_by_title(items: &[WorkItemRef]) -> HashMap<&str, VecDeque<&str>> {
    let mut ids_by_title: HashMap<&str, VecDeque<&str>> = HashMap::new();
    for item in items {
        ids_by_title
            .entry(item.title.as_str())
            .or_default()
            .push_back(item.id.as_str());
    }
    ids_by_title
}
