//! Integration tests for rule book loading
//!
//! JSON and TOML rule books, legacy casing, and validation reporting

use mule_patcher::config::{load_from_path, ConfigError, ValidationIssue};
use std::fs;
use tempfile::TempDir;

const JSON_BOOK: &str = r#"{
  "replaceProperties": [
    { "key": "app.runtime", "value": "4.9.0" },
    { "key": "mule.maven.plugin.version", "value": "4.3.0" }
  ],
  "replaceDependencies": [
    { "key": "mule-http-connector", "value": "<groupId>org.mule.connectors</groupId><artifactId>mule-http-connector</artifactId><version>1.10.3</version>" }
  ],
  "deleteDependencies": [ { "key": "mule-sockets-connector" } ],
  "replaceRepositories": [],
  "replaceDataWeaveExpressions": [ { "key": "%dw 2.0", "value": "%dw 2.5" } ],
  "replacePolicies": [
    { "key": "rate-limiting", "value": "1.4.0" },
    { "key": "rate-limiting", "value": "1.5.0" }
  ]
}"#;

#[test]
fn test_load_json_book() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, JSON_BOOK).unwrap();

    let book = load_from_path(&path).unwrap();
    assert_eq!(book.replace_properties.len(), 2);
    assert_eq!(book.delete_dependencies.lookup("mule-sockets-connector"), Some(""));
    assert!(book.replace_repositories.is_empty());

    // Duplicates are kept in order; lookups see the last one
    assert_eq!(book.replace_policies.len(), 2);
    assert_eq!(book.replace_policies.lookup("rate-limiting"), Some("1.5.0"));
}

#[test]
fn test_load_json_with_bom() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, format!("\u{feff}{JSON_BOOK}")).unwrap();

    assert!(load_from_path(&path).is_ok());
}

#[test]
fn test_load_toml_book() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rules.toml");
    fs::write(
        &path,
        r#"
[[replaceProperties]]
key = "app.runtime"
value = "4.9.0"

[[replaceRepositories]]
key = "anypoint-exchange-v3"
value = "<id>anypoint-exchange-v3</id><url>https://maven.anypoint.mulesoft.com/api/v3/maven</url>"
"#,
    )
    .unwrap();

    let book = load_from_path(&path).unwrap();
    assert_eq!(book.replace_properties.lookup("app.runtime"), Some("4.9.0"));
    assert_eq!(book.replace_repositories.len(), 1);
    assert!(book.replace_policies.is_empty());
}

#[test]
fn test_validation_collects_every_issue() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        r#"{
  "replaceProperties": [ { "key": " ", "value": "x" } ],
  "replaceDependencies": [ { "key": "a", "value": "" } ],
  "replaceDataWeaveExpressions": [ { "key": "", "value": "y" } ]
}"#,
    )
    .unwrap();

    match load_from_path(&path).unwrap_err() {
        ConfigError::Validation { path: Some(p), source } => {
            assert_eq!(p, path);
            assert_eq!(source.issues.len(), 3);
            assert!(source
                .issues
                .iter()
                .any(|issue| matches!(issue, ValidationIssue::EmptyMarkup { .. })));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_property_key_must_be_element_name() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rules.toml");
    fs::write(
        &path,
        "[[replaceProperties]]\nkey = \"1abc\"\nvalue = \"v\"\n",
    )
    .unwrap();

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(
        &err,
        ConfigError::Validation { source, .. }
            if source.issues == [ValidationIssue::InvalidElementName {
                set: "replaceProperties",
                key: "1abc".into(),
            }]
    ));
    assert!(err.to_string().contains("'1abc'"));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = load_from_path(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.json"));
}
