use std::path::PathBuf;

use ropey::Rope;
use serde_json::{json, Map, Value};
use tower_lsp::lsp_types::{DiagnosticSeverity, Position, Range, TextDocumentContentChangeEvent};

use jsonnet_core::token::{ParseDiagnostic, Position as CorePosition, Span};

use crate::server::{
    cli::{cli_analyze, is_safe_path},
    config::ServerConfig,
    notifier::to_lsp_diagnostic,
    text::{apply_incremental_change_rope, line_prefix, text_before, to_core_position, to_lsp_position},
};

fn settings(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {}", other),
    }
}

#[test]
fn test_config_update_sets_lib_paths() {
    let mut config = ServerConfig::default();
    config
        .update(&settings(json!({ "jsonnet.libPaths": ["/lib", "vendor"] })))
        .unwrap();
    assert_eq!(config.lib_paths, vec![PathBuf::from("/lib"), PathBuf::from("vendor")]);
    assert_eq!(config.slow_rebuild_ms, 1000);

    config.update(&settings(json!({ "jsonnet.slowRebuildMs": 250 }))).unwrap();
    assert_eq!(config.slow_threshold().as_millis(), 250);
}

#[test]
fn test_config_update_rejects_unknown_keys_atomically() {
    let mut config = ServerConfig::default();
    let err = config
        .update(&settings(json!({ "jsonnet.libPaths": ["/lib"], "jsonnet.bogus": true })))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "setting \"jsonnet.bogus\" is unknown to the jsonnet language server"
    );
    assert_eq!(config, ServerConfig::default());
}

#[test]
fn test_config_update_rejects_wrong_types() {
    let mut config = ServerConfig::default();
    assert!(config.update(&settings(json!({ "jsonnet.libPaths": "/lib" }))).is_err());
    assert!(config.update(&settings(json!({ "jsonnet.slowRebuildMs": 0 }))).is_err());
    assert!(config.update(&settings(json!({ "jsonnet.slowRebuildMs": "fast" }))).is_err());
    assert_eq!(config, ServerConfig::default());
}

#[test]
fn test_position_round_trip_with_wide_chars() {
    let rope = Rope::from_str("local s = '😀'; s\nx");
    // The emoji occupies two UTF-16 units but one core column.
    let after_emoji = Position::new(0, 13);
    let core = to_core_position(&rope, after_emoji);
    assert_eq!(core, CorePosition::new(1, 13));
    assert_eq!(to_lsp_position(&rope, core), after_emoji);

    assert_eq!(to_core_position(&rope, Position::new(1, 0)), CorePosition::new(2, 1));
    // Lines past the end are handed to the core unchanged.
    assert_eq!(to_core_position(&rope, Position::new(9, 4)), CorePosition::new(10, 5));
}

#[test]
fn test_text_before_and_line_prefix() {
    let rope = Rope::from_str("local o = {a: 1};\no.a");
    let pos = Position::new(1, 2);
    assert_eq!(text_before(&rope, pos), "local o = {a: 1};\no.");
    assert_eq!(line_prefix(&rope, pos), "o.");
}

#[test]
fn test_incremental_changes_apply_in_order() {
    let mut rope = Rope::from_str("local a = 1;\na");
    let change = |range: Range, text: &str| TextDocumentContentChangeEvent {
        range: Some(range),
        range_length: None,
        text: text.to_string(),
    };
    apply_incremental_change_rope(
        &mut rope,
        &change(Range::new(Position::new(0, 10), Position::new(0, 11)), "42"),
    );
    apply_incremental_change_rope(&mut rope, &change(Range::new(Position::new(1, 1), Position::new(1, 1)), " + 1"));
    assert_eq!(rope.to_string(), "local a = 42;\na + 1");

    apply_incremental_change_rope(
        &mut rope,
        &TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: "{}".to_string(),
        },
    );
    assert_eq!(rope.to_string(), "{}");
}

#[test]
fn test_diagnostic_conversion() {
    let rope = Rope::from_str("local a=1;\n");
    let diagnostic = ParseDiagnostic::new(
        "expected expression, found end of file".to_string(),
        Span::from_coords(2, 1, 2, 1),
    );
    let converted = to_lsp_diagnostic(&rope, &diagnostic);
    assert_eq!(converted.range, Range::new(Position::new(1, 0), Position::new(1, 0)));
    assert_eq!(converted.severity, Some(DiagnosticSeverity::ERROR));
    assert_eq!(converted.source.as_deref(), Some("jsonnet"));
    assert_eq!(converted.message, "expected expression, found end of file");
}

#[test]
fn test_is_safe_path() {
    assert!(is_safe_path("config/main.jsonnet"));
    assert!(!is_safe_path(""));
    assert!(!is_safe_path("/etc/passwd"));
    assert!(!is_safe_path("../secret.jsonnet"));
    assert!(!is_safe_path("C:x.jsonnet"));
    assert!(!is_safe_path("a\nb.jsonnet"));
}

#[test]
fn test_cli_without_analyze_flag_does_nothing() {
    let args = vec!["jsonnet-lsp".to_string(), "--stdio".to_string()];
    assert!(cli_analyze(&args).unwrap().is_none());
}

#[test]
fn test_cli_rejects_missing_and_unsafe_paths() {
    let args = vec!["jsonnet-lsp".to_string(), "--analyze".to_string()];
    assert!(cli_analyze(&args).is_err());

    let args = vec![
        "jsonnet-lsp".to_string(),
        "--analyze".to_string(),
        "/etc/passwd".to_string(),
    ];
    let err = cli_analyze(&args).unwrap_err();
    assert!(err.to_string().contains("Unsafe file path"));
}
