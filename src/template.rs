//! Output-path templates: `:name` / `::name` placeholders expanded against
//! the variable maps extracted by the matching engine.

use crate::matcher::VariableMap;
use clap::ValueEnum;
use regex::Regex;
use std::collections::HashSet;

/// What to do with a placeholder that has no binding in the current map.
/// Both variants are observed dialects; the choice is configuration, not a
/// hard-coded rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MissingVarPolicy {
    /// Substitute `*` and keep the produced path.
    Wildcard,
    /// Discard the whole produced path for this binding.
    Drop,
}

/// Expands the template once per binding, deduplicating the produced paths
/// in insertion order.
pub fn transform(
    template: &str,
    bindings: &[VariableMap],
    policy: MissingVarPolicy,
) -> Vec<String> {
    let placeholder = Regex::new(r"::?([A-Za-z][A-Za-z0-9]*)").unwrap();
    let mut seen = HashSet::new();
    let mut paths = Vec::new();
    for binding in bindings {
        let mut unresolved = false;
        let path = placeholder
            .replace_all(template, |caps: &regex::Captures| match binding.get(&caps[1]) {
                Some(value) => value.clone(),
                None => {
                    unresolved = true;
                    "*".to_string()
                }
            })
            .into_owned();
        if unresolved && policy == MissingVarPolicy::Drop {
            continue;
        }
        if seen.insert(path.clone()) {
            paths.push(path);
        }
    }
    paths
}

/// Expands every placeholder to `*`, producing the whole-pattern wildcard
/// form of the template.
pub fn transform_to_wildcard(template: &str) -> Vec<String> {
    transform(template, &[VariableMap::new()], MissingVarPolicy::Wildcard)
}
