//! Change-set resolution and the end-to-end run: decide which files changed,
//! match them against the configured patterns, and produce the output paths.
//!
//! Resolution walks a small state machine: a pull-request event diffs the
//! base and head revisions (or asks the hosting API), a push event diffs
//! exactly its `before`/`after` pair, and everything else, including the
//! degraded cases, matches against the working tree instead. The matching
//! engine never learns which state produced its file list.

use crate::context::{Credentials, Event, PullRequestEvent, PushEvent};
use crate::error::{Error, Result};
use crate::git::SourceControl;
use crate::github::HostApi;
use crate::matcher;
use crate::template::{self, MissingVarPolicy};
use clap::ValueEnum;
use tracing::info;

#[derive(Debug)]
pub struct Inputs {
    pub paths: Vec<String>,
    pub paths_fallback: Vec<String>,
    pub transform: Vec<String>,
    pub missing_var: MissingVarPolicy,
    pub fallback_method: FallbackMethod,
    pub list_method: ListMethod,
    pub max_changed_files: usize,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Outputs {
    pub paths: Vec<String>,
}

/// How to obtain the changed files of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListMethod {
    /// Shallow-fetch the two endpoints and `git diff --name-only`.
    GitDiff,
    /// Enumerate the pull request's files through the hosting API.
    Api,
}

/// What the fallback state produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FallbackMethod {
    /// Match the patterns against all tracked files of the working tree.
    WorkingTree,
    /// Skip the listing and expand the transform templates with `*` for
    /// every placeholder.
    Wildcard,
}

/// Collaborators of one resolution, supplied at the entry point. The API
/// client and the credential are absent when no token was configured;
/// states that need them fail with a configuration error, states that
/// don't run without one.
pub struct Deps<'a> {
    pub git: &'a dyn SourceControl,
    pub api: Option<&'a dyn HostApi>,
    pub credentials: Option<&'a Credentials>,
}

impl<'a> Deps<'a> {
    fn api(&self) -> Result<&'a dyn HostApi> {
        self.api.ok_or(Error::MissingToken)
    }

    fn credentials(&self) -> Result<&'a Credentials> {
        self.credentials.ok_or(Error::MissingToken)
    }
}

enum ChangeSet {
    Diff(Vec<String>),
    WorkingTree,
}

pub fn run(inputs: &Inputs, event: &Event, deps: &Deps) -> Result<Outputs> {
    match resolve_changed_files(inputs, event, deps)? {
        ChangeSet::Diff(files) => {
            if !inputs.paths_fallback.is_empty()
                && matcher::match_any(&inputs.paths_fallback, &files)
            {
                info!("fallback patterns match the changed files, using the working tree");
                return Ok(fall_back(inputs, deps));
            }
            Ok(apply_patterns(inputs, &files))
        }
        ChangeSet::WorkingTree => Ok(fall_back(inputs, deps)),
    }
}

fn resolve_changed_files(inputs: &Inputs, event: &Event, deps: &Deps) -> Result<ChangeSet> {
    match event {
        Event::PullRequest(pr) => resolve_pull_request(inputs, pr, deps),
        Event::Push(push) => resolve_push(push, deps),
        Event::Other => {
            info!("not a pull request or push event, using the working tree");
            Ok(ChangeSet::WorkingTree)
        }
    }
}

fn resolve_pull_request(
    inputs: &Inputs,
    pr: &PullRequestEvent,
    deps: &Deps,
) -> Result<ChangeSet> {
    info!("{} files are changed in the pull request", pr.changed_files);
    if pr.changed_files > inputs.max_changed_files as u64 {
        info!(
            "more than {} changed files, using the working tree",
            inputs.max_changed_files
        );
        return Ok(ChangeSet::WorkingTree);
    }

    let files = match inputs.list_method {
        ListMethod::Api => {
            info!("listing the changed files of pull request #{}", pr.number);
            deps.api()?
                .list_pull_request_files(pr.number, inputs.max_changed_files)?
        }
        ListMethod::GitDiff => {
            let base = match &pr.base_sha {
                Some(sha) => sha.clone(),
                None => deps
                    .api()?
                    .pull_request_base_sha(pr.number)?
                    .ok_or(Error::NoBaseRevision(pr.number))?,
            };
            info!("diffing {base}...{}", pr.head_sha);
            deps.git
                .compare_commits(deps.credentials()?, &base, &pr.head_sha)?
        }
    };
    info!("received a list of {} changed files", files.len());
    Ok(ChangeSet::Diff(files))
}

fn resolve_push(push: &PushEvent, deps: &Deps) -> Result<ChangeSet> {
    if is_zero_sha(&push.before) || is_zero_sha(&push.after) {
        info!("push has no comparable revisions, using the working tree");
        return Ok(ChangeSet::WorkingTree);
    }
    info!("diffing {}...{}", push.before, push.after);
    let files = deps
        .git
        .compare_commits(deps.credentials()?, &push.before, &push.after)?;
    info!("received a list of {} changed files", files.len());
    Ok(ChangeSet::Diff(files))
}

/// A branch create or delete event carries an all-zero revision on one side.
fn is_zero_sha(sha: &str) -> bool {
    !sha.is_empty() && sha.bytes().all(|b| b == b'0')
}

fn fall_back(inputs: &Inputs, deps: &Deps) -> Outputs {
    if inputs.fallback_method == FallbackMethod::Wildcard && !inputs.transform.is_empty() {
        info!("expanding the transform templates to wildcards");
        let paths = inputs
            .transform
            .iter()
            .flat_map(|t| template::transform_to_wildcard(t))
            .collect();
        return Outputs { paths };
    }
    info!("finding the working tree files");
    let files = deps.git.list_tracked_files();
    info!("found {} files in the working tree", files.len());
    apply_patterns(inputs, &files)
}

fn apply_patterns(inputs: &Inputs, files: &[String]) -> Outputs {
    let result = matcher::match_groups(&inputs.paths, files);
    if inputs.transform.is_empty() {
        return Outputs {
            paths: result.paths,
        };
    }
    info!(
        "expanding {} templates against {} variable maps",
        inputs.transform.len(),
        result.variable_maps.len()
    );
    let paths = inputs
        .transform
        .iter()
        .flat_map(|t| template::transform(t, &result.variable_maps, inputs.missing_var))
        .collect();
    Outputs { paths }
}
