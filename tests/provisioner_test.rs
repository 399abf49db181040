//! Run provisioner integration tests
//!
//! Every test provisions into its own scratch base directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use aipim::metadata::{MetadataDocument, Record};
use aipim::study::{
    provision, Provisioner, RunArgs, RunContext, RunStatus, StudyConfig, StudyLayout,
};
use aipim::{Error, LogRegistry};
use serde::Serialize;

fn scratch() -> tempfile::TempDir {
    tempfile::tempdir().expect("tempdir")
}

fn read_log(study_dir: &Path) -> String {
    fs::read_to_string(study_dir.join("aipim.log")).expect("study log")
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_provision_missing_base_dir() {
    let base = scratch();
    let missing = base.path().join("does-not-exist");

    let err = provision(&missing).unwrap_err();
    assert!(matches!(err, Error::NotFound(ref p) if *p == missing));
    assert!(err.to_string().contains("does not exist"));
}

#[test]
fn test_provision_file_base_dir() {
    let base = scratch();
    let file = base.path().join("notes.txt");
    fs::write(&file, "not a directory").unwrap();

    let err = provision(&file).unwrap_err();
    assert!(matches!(err, Error::NotFound(ref p) if *p == file));
}

#[test]
fn test_provision_empty_base_dir_is_current_dir() {
    let provisioner = provision("").unwrap();
    assert_eq!(provisioner.base_dir(), Path::new("."));
    assert_eq!(provisioner.study_dir("s"), Path::new("./s"));
}

#[test]
fn test_provision_non_path_value() {
    let err = StudyConfig::from_json(&serde_json::json!({"base_dir": 42})).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn test_provision_from_config() {
    let base = scratch();
    let text = format!(
        r#"{{"base_dir": {}, "layout": {{"log_file": "study.log"}}}}"#,
        serde_json::to_string(base.path()).unwrap()
    );
    let provisioner = StudyConfig::from_json_str(&text)
        .unwrap()
        .provision()
        .unwrap();

    provisioner
        .run("cfg", RunArgs::new(), |_ctx| Ok::<_, Error>(Record::new()))
        .unwrap();

    assert!(base.path().join("cfg/study.log").is_file());
    assert!(!base.path().join("cfg/aipim.log").exists());
}

// =============================================================================
// Directory provisioning
// =============================================================================

#[test]
fn test_run_creates_study_layout() {
    let base = scratch();
    let provisioner = provision(base.path()).unwrap();

    let outcome = provisioner
        .run_recorded("layout", RunArgs::new(), |ctx: RunContext| {
            assert_eq!(ctx.data_dir, ctx.run_dir().join("data"));
            assert_eq!(ctx.results_dir, ctx.run_dir().join("results"));
            assert!(ctx.data_dir.is_dir());
            assert!(ctx.results_dir.is_dir());
            Ok::<_, Error>(Record::new().with("a", 1))
        })
        .unwrap();

    let study_dir = base.path().join("layout");
    assert!(study_dir.join("selected_data").is_dir());
    assert!(study_dir.join("selected_results").is_dir());
    assert!(study_dir.join("aipim.log").is_file());

    let record = outcome.record;
    assert_eq!(record.status(), RunStatus::Completed);
    assert_eq!(record.run_dir(), study_dir.join(record.timestamp()));
    assert!(record.metadata_path().is_file());
    assert!(record.elapsed().is_some());

    // YYYY-MM-DD_HH-MM-SS
    let ts = record.timestamp();
    assert_eq!(ts.len(), 19);
    assert_eq!(&ts[10..11], "_");
}

#[test]
fn test_selected_dirs_survive_reruns() {
    let base = scratch();
    let provisioner = provision(base.path()).unwrap();
    let study = provisioner.wrap("keep", |_ctx: RunContext| Ok::<_, Error>(Record::new()));

    study.call(RunArgs::new()).unwrap();
    let curated = base.path().join("keep/selected_data/best.csv");
    fs::write(&curated, "x,y\n").unwrap();
    study.call(RunArgs::new()).unwrap();

    assert_eq!(fs::read_to_string(curated).unwrap(), "x,y\n");
}

#[test]
fn test_caller_supplied_dirs_are_not_overridden() {
    let base = scratch();
    let own = scratch();
    let data = own.path().join("my-data");
    let results = own.path().join("my-results");
    let provisioner = provision(base.path()).unwrap();

    let seen: (PathBuf, PathBuf) = provisioner
        .run(
            "supplied",
            RunArgs::new().data_dir(&data).results_dir(&results),
            |ctx: RunContext| Ok::<_, Error>((ctx.data_dir.clone(), ctx.results_dir)),
        )
        .unwrap();

    assert_eq!(seen, (data.clone(), results.clone()));
    // Caller paths are passed through, not created.
    assert!(!data.exists());
    assert!(!results.exists());
}

#[test]
fn test_partial_injection() {
    let base = scratch();
    let own = scratch();
    let provisioner = provision(base.path()).unwrap();

    provisioner
        .run(
            "partial",
            RunArgs::new().data_dir(own.path()),
            |ctx: RunContext| {
                assert_eq!(ctx.data_dir, own.path());
                assert_eq!(ctx.results_dir, ctx.run_dir().join("results"));
                assert!(!ctx.run_dir().join("data").exists());
                Ok::<_, Error>(Record::new())
            },
        )
        .unwrap();
}

#[test]
fn test_invalid_study_name() {
    let base = scratch();
    let provisioner = provision(base.path()).unwrap();
    let result = provisioner.run("../escape", RunArgs::new(), |_ctx| {
        Ok::<_, Error>(Record::new())
    });
    assert!(matches!(result, Err(Error::Configuration(_))));
}

// =============================================================================
// Metadata
// =============================================================================

#[derive(Serialize)]
struct Optimizer {
    name: String,
    lr: f64,
    schedule: Schedule,
}

#[derive(Serialize)]
struct Schedule {
    warmup: u32,
    kind: String,
}

#[derive(Serialize)]
struct TrainResult {
    loss: f64,
    epochs: u32,
    model: String,
    converged: bool,
    history: Vec<f64>,
    optimizer: Optimizer,
    tags: Tags,
}

#[derive(Serialize)]
struct Tags {
    owner: String,
}

#[test]
fn test_structured_result_metadata() {
    let base = scratch();
    let provisioner = provision(base.path()).unwrap();

    let outcome = provisioner
        .run_recorded("structured", RunArgs::new(), |_ctx: RunContext| {
            Ok::<_, Error>(TrainResult {
                loss: 0.125,
                epochs: 12,
                model: "mlp".to_string(),
                converged: true,
                history: vec![1.0, 0.5],
                optimizer: Optimizer {
                    name: "adam".to_string(),
                    lr: 0.001,
                    schedule: Schedule {
                        warmup: 100,
                        kind: "cosine".to_string(),
                    },
                },
                tags: Tags {
                    owner: "lab".to_string(),
                },
            })
        })
        .unwrap();

    let text = fs::read_to_string(outcome.record.metadata_path()).unwrap();
    let written: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        written,
        serde_json::json!({
            "loss": 0.125,
            "epochs": 12,
            "optimizer": {"lr": 0.001, "schedule": {"warmup": 100}}
        })
    );

    // insertion order
    let doc = MetadataDocument::load(outcome.record.metadata_path()).unwrap();
    assert_eq!(doc.names().collect::<Vec<_>>(), ["loss", "epochs", "optimizer"]);
    assert!(text.starts_with("{\n  \"loss\""));
}

#[test]
fn test_output_returned_unchanged() {
    let base = scratch();
    let provisioner = provision(base.path()).unwrap();
    let locals = Record::new().with("x", 1).with("name", "kept");

    let output = provisioner
        .run("unchanged", RunArgs::new(), {
            let locals = locals.clone();
            move |_ctx: RunContext| Ok::<_, Error>(locals)
        })
        .unwrap();

    assert_eq!(output, locals);
}

#[test]
fn test_non_mapping_result_writes_empty_metadata() {
    let base = scratch();
    let provisioner = provision(base.path()).unwrap();

    let outcome = provisioner
        .run_recorded("scalar", RunArgs::new(), |_ctx: RunContext| Ok::<_, Error>(5))
        .unwrap();

    assert_eq!(outcome.output, 5);
    let doc = MetadataDocument::load(outcome.record.metadata_path()).unwrap();
    assert!(doc.is_empty());
}

#[test]
fn test_two_runs_get_distinct_directories() {
    let base = scratch();
    let provisioner = provision(base.path()).unwrap();
    let calls = AtomicUsize::new(0);
    let study = provisioner.wrap("repeat", |_ctx: RunContext| {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok::<_, Error>(Record::new().with("call", n))
    });

    let first = study.call_recorded(RunArgs::new()).unwrap();
    std::thread::sleep(Duration::from_millis(1100));
    let second = study.call_recorded(RunArgs::new()).unwrap();

    assert_ne!(first.record.timestamp(), second.record.timestamp());
    assert_ne!(first.record.metadata_path(), second.record.metadata_path());

    let first_doc = MetadataDocument::load(first.record.metadata_path()).unwrap();
    let second_doc = MetadataDocument::load(second.record.metadata_path()).unwrap();
    assert_eq!(first_doc.get("call"), Some(&serde_json::json!(1)));
    assert_eq!(second_doc.get("call"), Some(&serde_json::json!(2)));

    let runs = provisioner.list_runs("repeat").unwrap();
    assert_eq!(
        runs,
        vec![
            first.record.timestamp().to_string(),
            second.record.timestamp().to_string()
        ]
    );
}

#[test]
fn test_list_runs_ignores_other_entries() {
    let base = scratch();
    let provisioner = provision(base.path()).unwrap();
    assert!(provisioner.list_runs("never-run").unwrap().is_empty());

    provisioner
        .run("listed", RunArgs::new(), |_ctx: RunContext| {
            Ok::<_, Error>(Record::new())
        })
        .unwrap();

    // selected_data, selected_results and aipim.log are not runs
    assert_eq!(provisioner.list_runs("listed").unwrap().len(), 1);
}

#[test]
fn test_list_runs_with_date_only_layout() {
    let base = scratch();
    let layout = StudyLayout {
        timestamp_format: "%Y-%m-%d".to_string(),
        ..StudyLayout::default()
    };
    let provisioner = Provisioner::builder(base.path())
        .layout(layout)
        .build()
        .unwrap();

    let outcome = provisioner
        .run_recorded("daily", RunArgs::new(), |_ctx| Ok::<_, Error>(Record::new()))
        .unwrap();

    assert_eq!(
        provisioner.list_runs("daily").unwrap(),
        vec![outcome.record.timestamp().to_string()]
    );
}

#[test]
fn test_nested_timestamp_layout_rejected() {
    let base = scratch();
    let layout = StudyLayout {
        timestamp_format: "%Y/%m/%d_%H-%M-%S".to_string(),
        ..StudyLayout::default()
    };
    let err = Provisioner::builder(base.path())
        .layout(layout)
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

// =============================================================================
// Logging and failures
// =============================================================================

#[test]
fn test_log_messages() {
    let base = scratch();
    let provisioner = provision(base.path()).unwrap();

    provisioner
        .run("logged", RunArgs::new(), |ctx: RunContext| {
            ctx.log.info("inside");
            fs::write(ctx.results_dir.join("out.bin"), vec![0u8; 2048])?;
            Ok::<_, Error>(Record::new())
        })
        .unwrap();

    let log = read_log(&base.path().join("logged"));
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].ends_with(" - INFO - [aipim] Running 'logged'..."));
    assert!(lines[1].ends_with(" - INFO - inside"));
    assert!(lines[2].contains(" - INFO - [aipim] 'logged' completed in "));
    assert!(lines[3].contains("[aipim] Total size of generated files: "));
    assert!(lines[3].contains("KB."), "{}", lines[3]);
}

#[derive(Debug)]
enum TrainError {
    Diverged(f64),
    Setup(Error),
}

impl From<Error> for TrainError {
    fn from(e: Error) -> Self {
        Self::Setup(e)
    }
}

#[test]
fn test_function_error_propagates_without_metadata() {
    let base = scratch();
    let provisioner = provision(base.path()).unwrap();
    let run_dir = std::cell::RefCell::new(PathBuf::new());

    let result = provisioner.run("failing", RunArgs::new(), |ctx: RunContext| {
        *run_dir.borrow_mut() = ctx.run_dir().to_path_buf();
        Err::<Record, _>(TrainError::Diverged(f64::INFINITY))
    });

    assert!(matches!(result, Err(TrainError::Diverged(v)) if v.is_infinite()));
    assert!(!run_dir.borrow().join("metadata.json").exists());

    let log = read_log(&base.path().join("failing"));
    assert_eq!(log.lines().count(), 1);
}

#[test]
fn test_provisioning_error_converts_into_caller_error() {
    let base = scratch();
    let provisioner = provision(base.path()).unwrap();

    let result = provisioner.run("", RunArgs::new(), |_ctx: RunContext| {
        Ok::<_, TrainError>(Record::new())
    });
    assert!(matches!(result, Err(TrainError::Setup(Error::Configuration(_)))));
}

#[test]
fn test_log_handle_reused_across_runs() {
    let base = scratch();
    let registry = LogRegistry::new();
    let provisioner = Provisioner::builder(base.path())
        .registry(registry.clone())
        .build()
        .unwrap();
    let study = provisioner.wrap("shared", |_ctx: RunContext| Ok::<_, Error>(Record::new()));

    study.call(RunArgs::new()).unwrap();
    study.call(RunArgs::new()).unwrap();

    assert_eq!(registry.len(), 1);
    let log = read_log(&base.path().join("shared"));
    assert_eq!(log.lines().count(), 6);
}
