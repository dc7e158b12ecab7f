use anyhow::Context;
use std::path::{Component, Path};

use jsonnet_core::analyze;

const USAGE: &str = "Usage: jsonnet-lsp --analyze [--errors-only] <relative-file-path>
  --analyze <file>     : Full analysis with JSON output
  --errors-only        : Show only errors in simple format";

pub(crate) fn try_cli_analyze() -> anyhow::Result<Option<String>> {
    let args: Vec<String> = std::env::args().collect();
    cli_analyze(&args)
}

/// `args[0]` is the program name.
pub(crate) fn cli_analyze(args: &[String]) -> anyhow::Result<Option<String>> {
    let Some(i) = args.iter().position(|a| a == "--analyze") else {
        return Ok(None);
    };
    let path = args[i + 1..]
        .iter()
        .find(|a| !a.starts_with("--"))
        .ok_or_else(|| anyhow::anyhow!(USAGE))?;
    let errors_only = args.iter().any(|a| a == "--errors-only");

    let content = read_file_content(path)?;
    let analysis = analyze(path, &content);

    if errors_only {
        if analysis.diagnostics.is_empty() {
            return Ok(Some("No errors found".to_string()));
        }
        let errors: Vec<String> = analysis
            .diagnostics
            .iter()
            .map(|d| format!("Line {}:{}: {}", d.span.start.line, d.span.start.column, d.message))
            .collect();
        return Ok(Some(errors.join("\n")));
    }

    let output = serde_json::json!({
        "path": path,
        "valid": analysis.tree.is_some(),
        "diagnostics": analysis.diagnostics,
    });
    Ok(Some(serde_json::to_string_pretty(&output)?))
}

pub(crate) fn is_safe_path(path: &str) -> bool {
    let path = Path::new(path);

    if path.as_os_str().is_empty() || path.is_absolute() {
        return false;
    }
    if path.components().any(|c| c == Component::ParentDir) {
        return false;
    }

    let s = path.to_string_lossy();
    if s.chars().any(|c| matches!(c, '\0' | '\n' | '\r' | '\t')) {
        return false;
    }
    // Windows drive prefix
    !(s.len() >= 2 && s.as_bytes()[1] == b':')
}

pub(crate) fn read_file_content(path: &str) -> anyhow::Result<String> {
    if !is_safe_path(path) {
        anyhow::bail!("Unsafe file path: {}", path);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read file '{}'", path))
}
