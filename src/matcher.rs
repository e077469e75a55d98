//! Matching engine: applies an ordered pattern list to changed-file paths
//! and accumulates the extracted variable bindings.

use crate::pattern::{compile, CompiledMatcher};
use std::collections::{BTreeMap, HashSet};

/// One full set of variable bindings produced by a single pattern match
/// against a single path. Two maps are equal iff they hold the same
/// key/value pairs.
pub type VariableMap = BTreeMap<String, String>;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct MatchResult {
    /// Paths that satisfied the positive/negative composition, in input
    /// order.
    pub paths: Vec<String>,
    /// Deduplicated variable maps, in first-seen order.
    pub variable_maps: Vec<VariableMap>,
}

/// Matches each path against the patterns in order and collects both the
/// included paths and the variable bindings of positive matches.
///
/// A negative pattern (`!` prefix) that matches a path excludes it for the
/// rest of the pass and discards the bindings accumulated so far for that
/// path. Positive matches after the exclusion still contribute bindings,
/// and bindings are accumulated whether or not the path ends up included;
/// both behaviors are long-standing and relied upon.
pub fn match_groups(patterns: &[String], files: &[String]) -> MatchResult {
    let matchers = compile_list(patterns);
    let mut paths = Vec::new();
    let mut merged = Vec::new();
    for file in files {
        let mut included = false;
        let mut excluded = false;
        let mut pending = Vec::new();
        for matcher in &matchers {
            if matcher.negative() {
                if matcher.is_match(file) {
                    excluded = true;
                    pending.clear();
                }
            } else if let Some(map) = matcher.captures(file) {
                included = true;
                if !map.is_empty() {
                    pending.push(map);
                }
            }
        }
        if included && !excluded {
            paths.push(file.clone());
        }
        merged.append(&mut pending);
    }
    MatchResult {
        paths,
        variable_maps: dedupe(merged),
    }
}

/// True iff at least one path satisfies the positive/negative composition.
/// Short-circuits and extracts no bindings.
pub fn match_any(patterns: &[String], files: &[String]) -> bool {
    let matchers = compile_list(patterns);
    files.iter().any(|file| {
        let mut included = false;
        let mut excluded = false;
        for matcher in &matchers {
            if matcher.negative() {
                if matcher.is_match(file) {
                    excluded = true;
                }
            } else if matcher.is_match(file) {
                included = true;
            }
        }
        included && !excluded
    })
}

/// Keeps the first occurrence of each distinct map, preserving order.
pub fn dedupe(maps: Vec<VariableMap>) -> Vec<VariableMap> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for map in maps {
        if seen.insert(map.clone()) {
            unique.push(map);
        }
    }
    unique
}

/// Blank lines and `#` comments are discarded before compilation.
fn compile_list(patterns: &[String]) -> Vec<CompiledMatcher> {
    patterns
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty() && !p.starts_with('#'))
        .map(compile)
        .collect()
}
