//! Tests for error types

use evalscope::Error;

fn json_error() -> serde_json::Error {
    serde_json::from_str::<serde_json::Value>("{").unwrap_err()
}

#[test]
fn test_malformed_event_error() {
    let error = Error::MalformedEvent {
        line: 7,
        source: json_error(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("line 7"));
    assert!(error_str.contains("malformed test event"));
    assert!(error_str.contains("aborting"));
    assert!(error.is_decode());
}

#[test]
fn test_malformed_frame_error() {
    let error = Error::MalformedFrame {
        line: 3,
        test: "TestEvalPing".to_string(),
        source: json_error(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("line 3"));
    assert!(error_str.contains("TestEvalPing"));
    assert!(error.is_decode());
}

#[test]
fn test_malformed_record_error() {
    let error = Error::MalformedRecord {
        line: 2,
        source: json_error(),
    };
    assert!(format!("{error}").contains("malformed eval record"));
    assert!(error.is_decode());
}

#[test]
fn test_lookup_error_wraps_source() {
    let error = Error::Lookup {
        name: "TestEvalPing".to_string(),
        result_type: "Exact".to_string(),
        source: Box::new(Error::Io(std::io::Error::other("disk gone"))),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("TestEvalPing (Exact)"));
    assert!(error_str.contains("disk gone"));
    assert!(std::error::Error::source(&error).is_some());
    assert!(!error.is_decode());
}

#[test]
fn test_insert_error() {
    let error = Error::Insert {
        name: "TestEvalPing".to_string(),
        result_type: "Exact".to_string(),
        source: Box::new(Error::InvalidConfig("read-only".to_string())),
    };
    assert!(format!("{error}").starts_with("inserting score for TestEvalPing"));
}

#[test]
fn test_unsupported_schema_error() {
    let error = Error::UnsupportedSchema {
        found: 9,
        supported: 1,
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("unsupported schema version 9"));
    assert!(error_str.contains("supports up to 1"));
    assert!(error_str.contains("--db"));
}

#[test]
fn test_invalid_config_error() {
    let error = Error::InvalidConfig("tolerance must be finite".to_string());
    assert!(format!("{error}").contains("invalid configuration"));
}

#[test]
fn test_notify_error() {
    let error = Error::Notify("giving up after 10 attempts".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("notification failed"));
    assert!(error_str.contains("10 attempts"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "evals.jsonl");
    let error: Error = io_error.into();
    assert!(matches!(error, Error::Io(_)));
    assert!(format!("{error}").contains("IO error"));
}

#[test]
fn test_sqlite_error_conversion() {
    let error: Error = rusqlite::Error::QueryReturnedNoRows.into();
    assert!(matches!(error, Error::Sqlite(_)));
    assert!(format!("{error}").contains("SQLite error"));
}

#[test]
fn test_error_debug() {
    let error = Error::InvalidConfig("x".to_string());
    assert!(format!("{error:?}").contains("InvalidConfig"));
}
