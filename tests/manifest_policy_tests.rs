#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Manifest policy tests for the Spyfall client.
//!
//! Guards the Cargo.toml settings the crate relies on: the deny-level
//! clippy lints, the optional WebSocket transport, and the demo wiring.

use std::path::PathBuf;

use toml::{Table, Value};

fn manifest() -> Table {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read '{}': {e}", path.display()));
    toml::from_str(&text).expect("Cargo.toml must be valid TOML")
}

fn table<'a>(parent: &'a Table, key: &str) -> &'a Table {
    parent
        .get(key)
        .and_then(Value::as_table)
        .unwrap_or_else(|| panic!("Cargo.toml is missing the [{key}] table"))
}

fn string_list(value: &Value) -> Vec<&str> {
    value
        .as_array()
        .expect("expected an array")
        .iter()
        .map(|v| v.as_str().expect("expected a string"))
        .collect()
}

#[test]
fn panicking_shortcuts_are_denied() {
    let manifest = manifest();
    let clippy = table(table(&manifest, "lints"), "clippy");
    for lint in [
        "unwrap_used",
        "expect_used",
        "panic",
        "todo",
        "unimplemented",
        "indexing_slicing",
    ] {
        assert_eq!(
            clippy.get(lint).and_then(Value::as_str),
            Some("deny"),
            "clippy::{lint} must be denied"
        );
    }
}

#[test]
fn websocket_transport_is_default_and_optional() {
    let manifest = manifest();
    let features = table(&manifest, "features");
    assert_eq!(string_list(&features["default"]), vec!["transport-websocket"]);

    let enabled = string_list(&features["transport-websocket"]);
    let dependencies = table(&manifest, "dependencies");
    for dep in ["tokio-tungstenite", "futures-util"] {
        assert!(
            enabled.contains(&format!("dep:{dep}").as_str()),
            "transport-websocket must enable {dep}"
        );
        let optional = dependencies[dep]
            .get("optional")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        assert!(optional, "{dep} must be an optional dependency");
    }
}

#[test]
fn core_does_not_pull_the_full_tokio_runtime() {
    let manifest = manifest();
    let tokio = &table(&manifest, "dependencies")["tokio"];
    let features = string_list(&tokio["features"]);
    assert!(!features.contains(&"full"), "library tokio features: {features:?}");
    assert!(features.contains(&"sync") && features.contains(&"time"));
}

#[test]
fn demo_requires_websocket_transport() {
    let manifest = manifest();
    let demos = manifest["example"].as_array().expect("[[example]] entries");
    for demo in demos {
        let path = demo["path"].as_str().expect("example path");
        assert!(path.starts_with("demos/"), "{path} must live under demos/");
        assert!(
            PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(path).is_file(),
            "{path} does not exist"
        );
        assert_eq!(
            string_list(&demo["required-features"]),
            vec!["transport-websocket"]
        );
    }
}
