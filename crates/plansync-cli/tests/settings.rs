use std::fs;
use std::path::PathBuf;

use plansync_cli::settings::{Settings, load_settings};
use tempfile::TempDir;

#[test]
fn missing_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let settings = load_settings(&dir.path().join("plansync.toml"));
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.engine_options().error_sample_size, 10);
}

#[test]
fn partial_file_keeps_other_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plansync.toml");
    fs::write(&path, "store_dir = \"/srv/plansync\"\nmax_batch_size = 5000\n").unwrap();

    let settings = load_settings(&path);
    assert_eq!(settings.store_dir, PathBuf::from("/srv/plansync"));
    assert_eq!(settings.max_batch_size, Some(5000));
    assert_eq!(settings.default_log_limit, Settings::default().default_log_limit);

    let options = settings.engine_options();
    assert_eq!(options.max_batch_size, Some(5000));
}

#[test]
fn malformed_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plansync.toml");
    fs::write(&path, "error_sample_size = \"ten\"").unwrap();
    assert_eq!(load_settings(&path), Settings::default());
}
