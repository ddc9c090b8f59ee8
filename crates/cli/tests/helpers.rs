use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use ai_file_organizer::commands::sleep_unless_cancelled;
use ai_file_organizer::{canonicalize_or_current, labels_from_args, resolve_config};
use organizer_core::config::AppConfig;
use organizer_core::{CancellationToken, LabelTree, RawLabels};
use tempfile::tempdir;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let pairs: Vec<(String, String)> =
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |name: &str| pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
}

#[test]
fn canonicalize_or_current_handles_dot_and_relative_paths() {
    let original = std::env::current_dir().expect("cwd");
    let tmp = tempdir().expect("tempdir");
    let subdir = tmp.path().join("nested");
    fs::create_dir_all(&subdir).expect("create nested");
    std::env::set_current_dir(tmp.path()).expect("chdir tmp");

    let dot = canonicalize_or_current(".").expect("canonicalize").canonicalize().expect("canon");
    assert_eq!(dot, tmp.path().canonicalize().expect("canon tmp"));

    let nested = canonicalize_or_current("nested").expect("canonicalize nested");
    assert_eq!(nested, subdir.canonicalize().expect("canonicalize subdir"));

    let missing = canonicalize_or_current("not-yet").expect("missing path");
    assert!(missing.is_absolute());
    assert!(missing.ends_with("not-yet"));

    std::env::set_current_dir(original).expect("restore cwd");
}

#[test]
fn labels_from_args_splits_lists_and_paths() {
    assert_eq!(labels_from_args(&[]), None);
    assert_eq!(labels_from_args(&[" , ".to_string()]), None);

    let flat = labels_from_args(&["Documents,Images".to_string(), "Videos".to_string()]);
    assert_eq!(
        flat,
        Some(RawLabels::Flat(vec!["Documents".into(), "Images".into(), "Videos".into()]))
    );

    let args = ["Documents/Work;Documents/Personal".to_string(), "Images".to_string()];
    let nested = labels_from_args(&args).expect("labels");
    let tree = LabelTree::build(nested).expect("tree");
    assert!(tree.is_hierarchical());
    assert_eq!(
        tree.label_paths(),
        vec!["Documents", "Documents/Work", "Documents/Personal", "Images"]
    );
}

#[test]
fn resolve_config_layers_args_over_file_over_env() {
    let dir = tempdir().expect("tempdir");
    let config_path = dir.path().join("config.yaml");
    let yaml = "\
ai:
  provider: local
  model: file-model
labels:
  Documents: [Work]
  Images: []
input_folder: /from/file
dry_run: true
";
    fs::write(&config_path, yaml).expect("write config");

    let lookup = env_from(&[
        ("LABELS", "Music"),
        ("INPUT_FOLDER", "/from/env"),
        ("OUTPUT_FOLDER", "/from/env/out"),
        ("MODEL", "env-model"),
        ("TEMPERATURE", "0.9"),
        ("INTERVAL", "5"),
    ]);
    let overrides = AppConfig { input_folder: Some("/from/cli".into()), ..Default::default() };

    let config = resolve_config(overrides, Some(config_path.as_path()), lookup).expect("resolve");

    assert_eq!(config.input_folder, Some(PathBuf::from("/from/cli")));
    assert_eq!(config.output_folder, Some(PathBuf::from("/from/env/out")));
    assert_eq!(config.ai.provider.as_deref(), Some("local"));
    assert_eq!(config.ai.model.as_deref(), Some("file-model"));
    assert_eq!(config.ai.temperature, Some(0.9));
    assert!(config.dry_run());
    assert_eq!(config.interval().as_secs(), 5);

    let tree = LabelTree::build(config.labels.expect("labels")).expect("tree");
    assert_eq!(tree.label_paths(), vec!["Documents", "Documents/Work", "Images"]);
}

#[test]
fn resolve_config_reads_config_path_from_env() {
    let dir = tempdir().expect("tempdir");
    let config_path = dir.path().join("settings.yml");
    fs::write(&config_path, "labels: [Reports]\nfallback_label: Misc\n").expect("write config");

    let path = config_path.to_string_lossy().to_string();
    let lookup = env_from(&[("CONFIG_PATH", path.as_str())]);
    let config = resolve_config(AppConfig::default(), None, lookup).expect("resolve");

    assert_eq!(config.labels, Some(RawLabels::Flat(vec!["Reports".into()])));
    assert_eq!(config.fallback_label(), "Misc");
}

#[test]
fn resolve_config_without_sources_is_default() {
    let config = resolve_config(AppConfig::default(), None, env_from(&[])).expect("resolve");
    assert_eq!(config, AppConfig::default());
    assert!(!config.continuous());
    assert_eq!(config.interval().as_secs(), 60);
    assert_eq!(config.fallback_label(), "Other");
}

#[test]
fn resolve_config_reports_missing_and_invalid_files() {
    let dir = tempdir().expect("tempdir");
    let missing = dir.path().join("missing.yaml");
    let err =
        resolve_config(AppConfig::default(), Some(missing.as_path()), env_from(&[])).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to load config file"));

    let broken = dir.path().join("broken.yaml");
    fs::write(&broken, "labels: [unclosed\n").expect("write broken");
    assert!(resolve_config(AppConfig::default(), Some(broken.as_path()), env_from(&[])).is_err());

    let err = resolve_config(AppConfig::default(), None, env_from(&[("INTERVAL", "soon")]))
        .unwrap_err();
    assert!(format!("{err:#}").contains("INTERVAL"));
}

#[test]
fn cancelled_wait_returns_early() {
    let cancel = CancellationToken::new();
    assert!(sleep_unless_cancelled(Duration::ZERO, &cancel));

    let trigger = cancel.clone();
    let started = Instant::now();
    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        trigger.cancel();
    });
    assert!(!sleep_unless_cancelled(Duration::from_secs(60), &cancel));
    assert!(started.elapsed() < Duration::from_secs(5));
    handle.join().expect("join");

    assert!(!sleep_unless_cancelled(Duration::from_secs(60), &cancel));
}
