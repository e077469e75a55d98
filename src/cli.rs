use crate::output::Format;
use crate::runner::{FallbackMethod, Inputs, ListMethod};
use crate::template::MissingVarPolicy;
use clap::Parser;

#[derive(Parser)]
#[command(
    name = "glob-changed-files",
    about = "Match changed files against glob patterns and transform them into output paths",
    version
)]
pub struct Cli {
    /// Patterns matched against the changed files; `!` negates, `:name`
    /// binds one path segment, `::name` binds a sub-path
    #[arg(long = "paths", required = true, value_name = "PATTERN")]
    pub paths: Vec<String>,

    /// If any changed file matches these patterns, ignore the diff and
    /// match the whole working tree instead
    #[arg(long = "paths-fallback", value_name = "PATTERN")]
    pub paths_fallback: Vec<String>,

    /// Templates expanded against the extracted path variables; without
    /// any, the matched paths themselves are the output
    #[arg(long = "transform", value_name = "TEMPLATE")]
    pub transform: Vec<String>,

    /// How to expand a template placeholder that has no binding
    #[arg(long, value_enum, default_value_t = MissingVarPolicy::Wildcard)]
    pub missing_var: MissingVarPolicy,

    /// What to produce when falling back from a diff
    #[arg(long, value_enum, default_value_t = FallbackMethod::WorkingTree)]
    pub fallback_method: FallbackMethod,

    /// How to list the changed files of a pull request
    #[arg(long, value_enum, default_value_t = ListMethod::GitDiff)]
    pub list_method: ListMethod,

    /// Fall back to the working tree when a pull request reports more
    /// changed files than this
    #[arg(long, default_value_t = 1000, value_name = "COUNT")]
    pub max_changed_files: usize,

    /// Token used to fetch revisions and query the API
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Output serialization when printing to stdout
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    /// Disable colored log output
    #[arg(long)]
    pub no_color: bool,
}

impl Cli {
    pub fn inputs(&self) -> Inputs {
        Inputs {
            paths: split_lines(&self.paths),
            paths_fallback: split_lines(&self.paths_fallback),
            transform: split_lines(&self.transform),
            missing_var: self.missing_var,
            fallback_method: self.fallback_method,
            list_method: self.list_method,
            max_changed_files: self.max_changed_files,
        }
    }
}

/// Flag values may carry embedded newlines (the action-style multiline
/// form); each line becomes its own entry.
fn split_lines(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|value| value.lines())
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}
