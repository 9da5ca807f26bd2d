use anyhow::Context;
use colored::Colorize;
use std::path::Path;
use stratus_cloud::{Attributes, LocalState, ValidationError, Value};

/// Read desired attributes from a JSON object file
pub fn read_attributes(path: &Path) -> anyhow::Result<LocalState> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let attributes: Attributes = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON object of attributes", path.display()))?;

    Ok(attributes
        .into_iter()
        .fold(LocalState::new(), |state, (name, value)| {
            state.with(name, value)
        }))
}

pub fn print_state(state: &LocalState) {
    match state.id() {
        Some(id) => println!("  {} = {}", "id".bold(), id.cyan()),
        None => println!("  {} = {}", "id".bold(), "(none)".dimmed()),
    }
    for (name, value) in state.attributes() {
        if value.is_null() {
            continue;
        }
        println!("  {} = {}", name, format_value(value));
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) if s.is_empty() => "\"\"".dimmed().to_string(),
        other => other.to_string(),
    }
}

pub fn print_validation_errors(errors: &[ValidationError]) {
    eprintln!("{}", "✗ Invalid configuration".red().bold());
    for error in errors {
        eprintln!("  {}: {}", error.attribute.yellow(), error.reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peer.json");
        std::fs::write(
            &path,
            r#"{"name": "peer", "size": 10, "operations": ["login"], "is_support_smn": true}"#,
        )
        .unwrap();

        let state = read_attributes(&path).unwrap();
        assert!(!state.is_tracked());
        assert_eq!(state.get_str("name"), Some("peer"));
        assert_eq!(state.get_int("size"), Some(10));
        assert_eq!(state.get_bool("is_support_smn"), Some(true));
        assert_eq!(state.get_list("operations").map(|l| l.len()), Some(1));
    }

    #[test]
    fn test_read_attributes_rejects_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        assert!(read_attributes(&path).is_err());
    }
}
