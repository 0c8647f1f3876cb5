//! Unit tests for configuration loading.


use std::fs;
use std::str::FromStr;

use rstest::rstest;
use tempfile::TempDir;

use crate::{ConfigError, InterceptorConfig, LogFormat, ServerConfig};

#[test]
fn empty_object_yields_defaults() {
    let config = ServerConfig::from_json_str("{}").expect("defaults are valid");
    assert_eq!(config, ServerConfig::default());
    assert_eq!(config.partitions.len(), 1);
    assert_eq!(config.partitions.first().map(|p| p.suffix.as_str()), Some("ou=system"));
    assert_eq!(config.interceptors.len(), 7);
    assert!(!config.allow_anonymous_writes);
}

#[test]
fn explicit_partitions_replace_defaults() {
    let config = ServerConfig::from_json_str(
        r#"{
            "log_format": "compact",
            "partitions": [
                {"id": "example", "suffix": "dc=example,dc=com", "indexed_attributes": ["cn"]}
            ]
        }"#,
    )
    .expect("valid config");
    assert_eq!(config.log_format, LogFormat::Compact);
    let partition = config.partitions.first().expect("one partition");
    assert_eq!(partition.kind, "memory");
    assert_eq!(partition.indexed_attributes, vec!["cn".to_owned()]);
    assert!(partition.context_entry.is_empty());
}

#[test]
fn rejects_duplicate_partition_ids() {
    let error = ServerConfig::from_json_str(
        r#"{"partitions": [
            {"id": "a", "suffix": "ou=one"},
            {"id": "a", "suffix": "ou=two"}
        ]}"#,
    )
    .expect_err("duplicate ids");
    assert!(matches!(error, ConfigError::DuplicatePartitionId { ref id } if id == "a"));
}

#[test]
fn rejects_duplicate_interceptor_names() {
    let mut config = ServerConfig::default();
    config
        .interceptors
        .push(InterceptorConfig::new("schema", "schema"));
    let error = config.validate().expect_err("duplicate names");
    assert!(matches!(error, ConfigError::DuplicateInterceptorName { .. }));
}

#[test]
fn rejects_empty_partition_list() {
    let error = ServerConfig::from_json_str(r#"{"partitions": []}"#).expect_err("no partitions");
    assert!(matches!(error, ConfigError::NoPartitions));
}

#[test]
fn rejects_blank_identifiers() {
    let error = ServerConfig::from_json_str(r#"{"partitions": [{"id": " ", "suffix": "ou=x"}]}"#)
        .expect_err("blank id");
    assert!(matches!(error, ConfigError::EmptyField { ref field } if field == "partitions[0].id"));
}

#[test]
fn malformed_json_is_a_parse_error() {
    let error = ServerConfig::from_json_str("{ not json").expect_err("malformed");
    assert!(matches!(error, ConfigError::Parse { .. }));
}

#[test]
fn loads_from_file() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("arbor.json");
    fs::write(&path, r#"{"log_filter": "debug"}"#).expect("write config");
    let config = ServerConfig::from_path(&path).expect("load");
    assert_eq!(config.log_filter, "debug");
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = TempDir::new().expect("temp dir");
    let error = ServerConfig::from_path(dir.path().join("absent.json")).expect_err("missing");
    assert!(matches!(error, ConfigError::Read { .. }));
}

#[rstest]
#[case("json", LogFormat::Json)]
#[case("COMPACT", LogFormat::Compact)]
fn log_format_parses_case_insensitively(#[case] text: &str, #[case] expected: LogFormat) {
    assert_eq!(LogFormat::from_str(text).expect("parse"), expected);
}
