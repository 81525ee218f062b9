//! End-to-end runs over real temp directories (dry-run, so no external
//! tools are required).

use batchpress::config::{
    Config, LoggingConfig, OptionsConfig, Profile, SelectionConfig, Step, ToolsConfig,
};
use batchpress::runner;
use batchpress::tools::{ProcessInvoker, ToolKind};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn touch(path: &Path, bytes: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

fn step(name: &str, suffix: &str, extensions: &[&str]) -> Step {
    Step {
        name: name.to_string(),
        enabled: true,
        extensions: extensions.iter().map(|s| s.to_string()).collect(),
        suffix: suffix.to_string(),
        profile: "default".to_string(),
        capability: ToolKind::from_name(name),
    }
}

fn dry_run_config(root: &Path) -> Config {
    Config {
        input_dir: root.join("in"),
        output_dir: root.join("out"),
        selection: SelectionConfig {
            extensions: vec!["png".to_string(), "jpg".to_string()],
            exclude: vec!["skipme".to_string()],
        },
        options: OptionsConfig {
            recursive: true,
            preserve_tree: true,
            dry_run: true,
            concurrency: 4,
        },
        logging: LoggingConfig {
            per_step_rows: true,
            log_file: None,
        },
        tools: ToolsConfig::default(),
        steps: vec![step("pngquant", "_q", &["png"]), step("cwebp", "_w", &["jpg"])],
        profiles: HashMap::new(),
    }
}

fn log_rows(config_log: &Path) -> Vec<String> {
    fs::read_to_string(config_log)
        .unwrap()
        .lines()
        .skip(1)
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn dry_run_copies_every_matching_file_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let config = dry_run_config(dir.path());

    touch(&config.input_dir.join("a.png"), b"png-bytes-a");
    touch(&config.input_dir.join("nested/b.PNG"), b"png-bytes-b");
    touch(&config.input_dir.join("c.jpg"), b"jpg-bytes-c");
    touch(&config.input_dir.join("skipme/d.png"), b"excluded");
    touch(&config.input_dir.join("notes.txt"), b"wrong extension");

    let summary = runner::run(config.clone(), Arc::new(ProcessInvoker))
        .await
        .unwrap();
    assert_eq!(summary.files, 3);

    // preserve_tree mirrors the input layout; cwebp forces .webp.
    let out = &config.output_dir;
    assert_eq!(fs::read(out.join("a_q.png")).unwrap(), b"png-bytes-a");
    assert_eq!(fs::read(out.join("nested/b_q.PNG")).unwrap(), b"png-bytes-b");
    assert_eq!(fs::read(out.join("c_w.webp")).unwrap(), b"jpg-bytes-c");
    assert!(!out.join("skipme").exists());

    let rows = log_rows(&summary.log_path);
    // One step row per file plus one ORIGINAL row per file.
    assert_eq!(rows.len(), 6);
    let originals: Vec<_> = rows
        .iter()
        .filter(|r| r.split(',').nth(1) == Some("ORIGINAL"))
        .collect();
    assert_eq!(originals.len(), 3);
    for row in &originals {
        assert_eq!(row.split(',').nth(4), Some("0"), "zero delta: {row}");
    }
}

#[tokio::test]
async fn every_discovered_file_is_processed_exactly_once_under_concurrency() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = dry_run_config(dir.path());
    config.options.concurrency = 8;
    config.options.preserve_tree = false;
    config.steps = vec![step("pngquant", "_q", &["png"])];

    for i in 0..40 {
        touch(
            &config.input_dir.join(format!("d{}/f.png", i)),
            format!("file-{i}").as_bytes(),
        );
    }

    let summary = runner::run(config.clone(), Arc::new(ProcessInvoker))
        .await
        .unwrap();
    assert_eq!(summary.files, 40);

    let rows = log_rows(&summary.log_path);
    let mut originals: Vec<_> = rows
        .iter()
        .filter(|r| r.split(',').nth(1) == Some("ORIGINAL"))
        .map(|r| r.split(',').next().unwrap().to_string())
        .collect();
    assert_eq!(originals.len(), 40, "one terminal row per file");
    originals.sort();
    originals.dedup();
    assert_eq!(originals.len(), 40, "no file processed twice");

    // Flattened outputs keep directory context in the name.
    assert!(config.output_dir.join("d17__f_q.png").exists());
}

#[tokio::test]
async fn rerun_overwrites_outputs_and_appends_rows() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = dry_run_config(dir.path());
    config.steps = vec![step("pngquant", "_q", &["png"])];
    touch(&config.input_dir.join("a.png"), b"v1");

    runner::run(config.clone(), Arc::new(ProcessInvoker))
        .await
        .unwrap();
    touch(&config.input_dir.join("a.png"), b"v2-longer");
    let summary = runner::run(config.clone(), Arc::new(ProcessInvoker))
        .await
        .unwrap();

    // Deterministic naming: same path both runs, second content wins.
    assert_eq!(
        fs::read(config.output_dir.join("a_q.png")).unwrap(),
        b"v2-longer"
    );

    // Append-only log with a single header.
    let content = fs::read_to_string(&summary.log_path).unwrap();
    assert_eq!(content.matches("file,stage").count(), 1);
    assert_eq!(content.lines().count(), 5);
}

#[tokio::test]
async fn missing_input_root_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = dry_run_config(dir.path());
    // No input dir created.
    let result = runner::run(config, Arc::new(ProcessInvoker)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn live_run_with_unknown_tool_completes_with_error_rows() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = dry_run_config(dir.path());
    config.options.dry_run = false;
    config.steps = vec![step("shrinkomatic", "_s", &["png"])];
    touch(&config.input_dir.join("a.png"), b"bytes");

    // The run itself succeeds; the failure is confined to metrics rows.
    let summary = runner::run(config, Arc::new(ProcessInvoker)).await.unwrap();
    let rows = log_rows(&summary.log_path);
    assert_eq!(rows.len(), 2);
    assert!(rows[0].contains(",error,"));
    assert!(rows[0].contains("unknown step"));
    assert!(rows[1].contains(",ORIGINAL,"));
}
