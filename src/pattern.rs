//! Glob pattern compilation with path variable capture.
//!
//! A pattern is a `/`-delimited glob that may bind named path variables:
//! `*` matches within one segment, `**` spans segments, `:name` binds one
//! segment, `::name` binds a sub-path. A leading `!` marks the pattern as
//! negative. Compilation never fails: malformed variable tokens fall back to
//! literal text, and a pattern that still produces an invalid expression is
//! matched as a plain literal.

use crate::matcher::VariableMap;
use regex::Regex;
use std::collections::HashSet;

/// A compiled pattern: polarity plus an anchored capturing regex.
///
/// The capture mechanism is an implementation detail; callers only see
/// [`is_match`](CompiledMatcher::is_match) and
/// [`captures`](CompiledMatcher::captures).
#[derive(Debug)]
pub struct CompiledMatcher {
    negative: bool,
    regex: Regex,
}

impl CompiledMatcher {
    pub fn negative(&self) -> bool {
        self.negative
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// The variable bindings for `path`, or `None` if the path does not
    /// match. A matching pattern without variables yields an empty map.
    pub fn captures(&self, path: &str) -> Option<VariableMap> {
        let caps = self.regex.captures(path)?;
        let mut map = VariableMap::new();
        for name in self.regex.capture_names().flatten() {
            if let Some(m) = caps.name(name) {
                map.insert(name.to_string(), m.as_str().to_string());
            }
        }
        Some(map)
    }
}

pub fn compile(pattern: &str) -> CompiledMatcher {
    let (negative, glob) = match pattern.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, pattern),
    };

    let mut seen = HashSet::new();
    let source = glob
        .split('/')
        .map(|segment| compile_segment(segment, &mut seen))
        .collect::<Vec<_>>()
        .join("/");

    // A pattern with stray regex metacharacters (unbalanced parens and the
    // like) is matched literally instead of failing.
    let regex = Regex::new(&format!("^{source}$")).unwrap_or_else(|_| literal(glob));
    CompiledMatcher { negative, regex }
}

fn compile_segment(segment: &str, seen: &mut HashSet<String>) -> String {
    // Substitution order matters: dots are escaped before `**` introduces
    // one, and `**` must be rewritten before `*`.
    let rewritten = segment
        .replace('.', r"\.")
        .replace("**", ".+?")
        .replace('*', "[^/]+?");

    let var = Regex::new(r"(::?)([A-Za-z][A-Za-z0-9]*)").unwrap();
    var.replace_all(&rewritten, |caps: &regex::Captures| {
        let name = &caps[2];
        let class = if &caps[1] == "::" { ".+?" } else { "[^/]+?" };
        if seen.insert(name.to_string()) {
            format!("(?P<{name}>{class})")
        } else {
            // A repeated variable name within one pattern still has to
            // match, but only the first occurrence binds.
            format!("({class})")
        }
    })
    .into_owned()
}

fn literal(glob: &str) -> Regex {
    Regex::new(&format!("^{}$", regex::escape(glob))).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_colon_matches_one_segment() {
        let matcher = compile("clusters/:cluster/:component/**");
        let map = matcher
            .captures("clusters/staging/cluster-autoscaler/helmfile.yaml")
            .unwrap();
        assert_eq!(map["cluster"], "staging");
        assert_eq!(map["component"], "cluster-autoscaler");
        assert!(!map["cluster"].contains('/'));
    }

    #[test]
    fn double_colon_spans_segments() {
        let matcher = compile("clusters/::directory/kustomization.yaml");
        let map = matcher
            .captures("clusters/staging/app/kustomization.yaml")
            .unwrap();
        assert_eq!(map["directory"], "staging/app");
    }

    #[test]
    fn negative_prefix_is_stripped() {
        let matcher = compile("!**/*.md");
        assert!(matcher.negative());
        assert!(matcher.is_match("docs/README.md"));
    }

    #[test]
    fn dot_is_literal() {
        let matcher = compile("src/main.rs");
        assert!(matcher.is_match("src/main.rs"));
        assert!(!matcher.is_match("src/mainxrs"));
    }

    #[test]
    fn match_is_anchored() {
        let matcher = compile("clusters/:cluster/file.yaml");
        assert!(!matcher.is_match("clusters/staging/extra/file.yaml"));
        assert!(!matcher.is_match("prefix/clusters/staging/file.yaml"));
    }

    #[test]
    fn variable_free_pattern_yields_empty_map() {
        let matcher = compile("src/**/*.ts");
        let map = matcher.captures("src/utils/helper.ts").unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn partial_segment_variable() {
        let matcher = compile(".github/workflows/:workflow.yaml");
        let map = matcher.captures(".github/workflows/ci.yaml").unwrap();
        assert_eq!(map["workflow"], "ci");
    }

    #[test]
    fn empty_variable_name_is_literal() {
        let matcher = compile("a/:/b");
        assert!(matcher.is_match("a/:/b"));
        assert!(!matcher.is_match("a/x/b"));
    }

    #[test]
    fn digit_leading_variable_name_is_literal() {
        let matcher = compile("a/:1x/b");
        assert!(matcher.is_match("a/:1x/b"));
        assert!(!matcher.is_match("a/value/b"));
    }

    #[test]
    fn duplicate_variable_binds_first_occurrence() {
        let matcher = compile("a/:x/:x/b");
        let map = matcher.captures("a/one/two/b").unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["x"], "one");
    }

    #[test]
    fn unbalanced_metacharacters_fall_back_to_literal() {
        let matcher = compile("a/(b/c");
        assert!(matcher.is_match("a/(b/c"));
        assert!(!matcher.is_match("a/b/c"));
    }

    #[test]
    fn case_sensitive() {
        let matcher = compile("Apps/:app/**");
        assert!(matcher.captures("apps/myapp/file.txt").is_none());
    }
}
