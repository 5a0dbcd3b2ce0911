use batch_golem::config::*;
use batch_golem::error::BgError;

#[test]
fn load_config_defaults_when_file_missing() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config(dir.path()).unwrap();

    assert_eq!(config.project.plan_path, "BATCH.yaml");
    assert_eq!(config.project.runtime_dir, ".batch-golem");
    assert!(config.execution.resume);
    assert_eq!(config.execution.dry_run_delay_ms, 0);
    assert_eq!(
        config.state_path(dir.path()),
        dir.path().join(".batch-golem").join("queue-state.json")
    );
}

#[test]
fn partial_config_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        r#"
[execution]
dry_run_delay_ms = 250
"#,
    )
    .unwrap();

    let config = load_config(dir.path()).unwrap();
    assert_eq!(config.execution.dry_run_delay_ms, 250);
    assert!(config.execution.resume);
    assert_eq!(config.project.plan_path, "BATCH.yaml");
}

#[test]
fn custom_paths_parse_from_toml() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        r#"
[project]
plan_path = "plans/release.yaml"
runtime_dir = ".state"

[execution]
resume = false
"#,
    )
    .unwrap();

    let config = load_config(dir.path()).unwrap();
    assert_eq!(config.plan_path(dir.path()), dir.path().join("plans/release.yaml"));
    assert_eq!(config.runtime_dir(dir.path()), dir.path().join(".state"));
    assert!(!config.execution.resume);
}

#[test]
fn invalid_toml_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[project\n").unwrap();

    let err = load_config(dir.path()).unwrap_err();
    assert!(matches!(err, BgError::Parse { .. }), "{}", err);
}

#[test]
fn blank_plan_path_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        r#"
[project]
plan_path = ""
"#,
    )
    .unwrap();

    let err = load_config(dir.path()).unwrap_err();
    assert!(matches!(err, BgError::InvalidConfig(_)));
    assert!(err.to_string().contains("project.plan_path must not be empty"));
}
