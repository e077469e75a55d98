//! Output sink: the `GITHUB_OUTPUT` file when running under a workflow,
//! stdout otherwise.

use crate::error::Result;
use clap::ValueEnum;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Serialization of the path list when printing to stdout. The
/// `GITHUB_OUTPUT` sink always writes both forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// One path per line.
    Text,
    /// A JSON array.
    Json,
}

pub fn write_outputs(
    paths: &[String],
    github_output: Option<&Path>,
    format: Format,
) -> Result<()> {
    info!("{} paths matched", paths.len());
    for path in paths {
        info!("{path}");
    }
    match github_output {
        Some(file) => write_github_output(file, paths),
        None => {
            print!("{}", render(paths, format));
            Ok(())
        }
    }
}

fn render(paths: &[String], format: Format) -> String {
    match format {
        Format::Text => {
            let mut body = paths.join("\n");
            if !paths.is_empty() {
                body.push('\n');
            }
            body
        }
        // Serializing a list of strings cannot fail.
        Format::Json => {
            let mut body = serde_json::to_string(paths).unwrap_or_else(|_| "[]".to_string());
            body.push('\n');
            body
        }
    }
}

/// Appends `paths` (newline-joined, heredoc syntax) and `paths-json` keys
/// in the workflow-command output format.
fn write_github_output(file: &Path, paths: &[String]) -> Result<()> {
    let mut out = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(file)?;
    let joined = paths.join("\n");
    let delimiter = delimiter_for(&joined);
    writeln!(out, "paths<<{delimiter}")?;
    writeln!(out, "{joined}")?;
    writeln!(out, "{delimiter}")?;
    writeln!(out, "paths-json={}", serde_json::to_string(paths)?)?;
    Ok(())
}

/// The heredoc delimiter must not occur in the body; extend it until it
/// doesn't.
fn delimiter_for(body: &str) -> String {
    let mut delimiter = String::from("gcf-EOF");
    while body.contains(&delimiter) {
        delimiter.push('-');
    }
    delimiter
}
