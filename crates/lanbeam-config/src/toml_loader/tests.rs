//! Tests for TOML config loading and default file creation.

use super::*;
use std::path::Path;

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let result = load_from_path(Path::new("/tmp/nonexistent_lanbeam_config.toml"));
    let err = result.unwrap_err();
    assert!(matches!(err, lanbeam_common::ConfigError::FileNotFound(_)));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[relay]
port = 4100
room = "office"

[client]
display_name = "Brave Heron"
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.relay.port, 4100);
    assert_eq!(config.relay.room, "office");
    assert_eq!(config.client.display_name.as_deref(), Some("Brave Heron"));
    // Defaults preserved
    assert_eq!(config.relay.bind, "0.0.0.0");
    assert_eq!(config.transfer.chunk_size, 16_384);
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, lanbeam_common::ConfigError::ParseError(_)));
}

#[test]
fn load_config_with_invalid_values_still_returns_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[transfer]
chunk_size = 0
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.transfer.chunk_size, 0);
}

#[test]
fn create_default_config_writes_loadable_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    create_default_config(&path).unwrap();
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.relay.port, 3000);
    assert_eq!(config.client.relay_url, "ws://127.0.0.1:3000");
}

#[test]
fn default_config_path_ends_with_lanbeam() {
    if let Ok(path) = default_config_path() {
        assert!(path.ends_with("lanbeam/config.toml"));
    }
}
