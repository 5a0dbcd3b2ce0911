mod common;

use batch_golem::plan::{load_plan, validate, BatchPlan};
use batch_golem::types::ExecutionGroup;

fn write_plan(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("BATCH.yaml");
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn load_plan_with_schedule() {
    let (_dir, path) = write_plan(
        r#"
items:
  - id: t1
    title: Write lexer
  - id: t2
    title: Write parser
  - id: t3
    title: Write docs
schedule:
  - parallel: false
    titles: [Write lexer]
  - parallel: true
    titles: [Write parser, Write docs]
"#,
    );

    let plan = load_plan(&path).unwrap();
    assert_eq!(plan.items.len(), 3);
    assert_eq!(
        plan.groups(),
        vec![
            ExecutionGroup::sequential("t1"),
            ExecutionGroup::parallel(&["t2", "t3"]),
        ]
    );
    assert!(plan.unmatched_titles().is_empty());
}

#[test]
fn load_plan_without_schedule_falls_back_to_sequential() {
    let (_dir, path) = write_plan(
        r#"
items:
  - id: t1
    title: A
  - id: t2
    title: B
"#,
    );

    let plan = load_plan(&path).unwrap();
    assert!(plan.schedule.is_none());
    assert_eq!(plan.groups(), common::sequential_groups(&["t1", "t2"]));
    assert!(plan.unmatched_titles().is_empty());
}

#[test]
fn schedule_entry_defaults_to_sequential() {
    let (_dir, path) = write_plan(
        r#"
items:
  - id: t1
    title: A
schedule:
  - titles: [A, Missing]
"#,
    );

    let plan = load_plan(&path).unwrap();
    assert_eq!(plan.groups(), vec![ExecutionGroup::sequential("t1")]);
    assert_eq!(plan.unmatched_titles(), vec!["Missing"]);
}

#[test]
fn empty_file_is_an_empty_plan() {
    let (_dir, path) = write_plan("  \n");
    let plan = load_plan(&path).unwrap();
    assert_eq!(plan, BatchPlan::default());
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_plan(&dir.path().join("BATCH.yaml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read"), "{}", err);
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let (_dir, path) = write_plan("items: [unclosed");
    let err = load_plan(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse"), "{}", err);
}

#[test]
fn validate_accepts_well_formed_plan() {
    let plan = BatchPlan {
        items: vec![common::item("t1", "A"), common::item("t2", "A")],
        schedule: None,
    };
    assert!(validate(&plan).is_ok());
}

#[test]
fn validate_reports_every_problem() {
    let plan = BatchPlan {
        items: vec![
            common::item("t1", "A"),
            common::item("t1", "B"),
            common::item(" ", "C"),
            common::item("t4", ""),
        ],
        schedule: None,
    };

    let errors = validate(&plan).unwrap_err();
    assert_eq!(errors.len(), 3);
    assert!(errors[0].contains("duplicate id 't1'"));
    assert!(errors[1].contains("items[2]: id must not be empty"));
    assert!(errors[2].contains("items[3]: title must not be empty"));
}

#[test]
fn validate_rejects_empty_plan() {
    let errors = validate(&BatchPlan::default()).unwrap_err();
    assert_eq!(errors, vec!["plan has no items"]);
}
