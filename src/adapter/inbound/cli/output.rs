//! Terminal output for CLI commands.
//!
//! Human-readable lines by default; `--json` switches every call to one JSON
//! object per line for scripting.

use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::OwoColorize;
use serde_json::json;

static JSON: AtomicBool = AtomicBool::new(false);

/// Apply the global `--json` flag.
pub fn configure(json: bool) {
    JSON.store(json, Ordering::Relaxed);
}

#[must_use]
pub fn is_json() -> bool {
    JSON.load(Ordering::Relaxed)
}

fn emit_json_line(kind: &str, payload: serde_json::Value) {
    println!("{}", json!({ "type": kind, "payload": payload }));
}

/// Print a labeled value.
pub fn field(label: &str, value: impl Display) {
    let value = value.to_string();
    if is_json() {
        emit_json_line("field", json!({ "label": label, "value": value }));
        return;
    }
    println!("  {:<12} {}", label.dimmed(), value);
}

pub fn success(message: &str) {
    if is_json() {
        emit_json_line("success", json!({ "message": message }));
        return;
    }
    println!("{} {}", "✓".green(), message);
}

pub fn warning(message: &str) {
    if is_json() {
        emit_json_line("warning", json!({ "message": message }));
        return;
    }
    println!("{} {}", "!".yellow(), message);
}

pub fn error(message: &str) {
    if is_json() {
        emit_json_line("error", json!({ "message": message }));
        return;
    }
    eprintln!("{} {}", "✗".red(), message);
}
