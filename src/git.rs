//! Source-control access: a thin layer over the `git` binary, plus the
//! acquisition policy for diffing revisions that may not be present locally.
//!
//! A diff is computed in the existing workspace clone when its `origin`
//! remote already points at the expected repository; otherwise just enough
//! history is fetched into an ephemeral scratch clone. The scratch directory
//! is removed on every exit path, success or failure, by `TempDir`'s drop.

use crate::context::{Context, Credentials};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, warn};

/// The seam between the resolver and source control; tests substitute a
/// double.
pub trait SourceControl {
    /// Changed paths between two revisions.
    fn compare_commits(
        &self,
        credentials: &Credentials,
        base: &str,
        head: &str,
    ) -> Result<Vec<String>>;

    /// All tracked files of the working tree. A failing listing degrades to
    /// an empty list with a warning; it is never fatal.
    fn list_tracked_files(&self) -> Vec<String>;
}

pub struct GitCli {
    repo_url: String,
    server_url: String,
    workspace: PathBuf,
    scratch_root: PathBuf,
}

impl GitCli {
    pub fn new(context: &Context) -> Self {
        Self {
            repo_url: context.repo.url(&context.server_url),
            server_url: context.server_url.clone(),
            workspace: context.workspace.clone(),
            scratch_root: context.runner_temp.clone(),
        }
    }

    fn init_repo(&self, dir: &Path) -> Result<()> {
        git_checked(dir, &["init", "--quiet"]).map(drop)
    }

    fn add_remote(&self, dir: &Path) -> Result<()> {
        git_checked(dir, &["remote", "add", "origin", &self.repo_url]).map(drop)
    }

    /// Configures the fetch credential as an HTTP extra header, scoped to
    /// this clone. The argument list is never logged.
    fn set_auth_header(&self, dir: &Path, credentials: &Credentials) -> Result<()> {
        let key = format!("http.{}/.extraheader", self.server_url.trim_end_matches('/'));
        let value = format!("AUTHORIZATION: basic {}", credentials.basic_auth_value());
        let output = Command::new("git")
            .args(["config", "--local", &key, &value])
            .current_dir(dir)
            .output()
            .map_err(Error::GitSpawn)?;
        let status = output.status.code().unwrap_or(-1);
        if status != 0 {
            return Err(Error::GitCommand {
                command: format!("git config --local {key}"),
                status,
            });
        }
        Ok(())
    }

    fn shallow_fetch(&self, dir: &Path, ref1: &str, ref2: &str) -> Result<()> {
        git_checked(dir, &["fetch", "--quiet", "--depth=1", "origin", ref1, ref2]).map(drop)
    }

    fn diff_name_only(&self, dir: &Path, base: &str, head: &str) -> Result<Vec<String>> {
        let stdout = git_checked(dir, &["diff", "--name-only", base, head])?;
        Ok(lines(&stdout))
    }

    /// The workspace clone qualifies for reuse when its origin URL matches
    /// the expected repository.
    fn reusable_workspace(&self) -> Option<&Path> {
        let output = git(&self.workspace, &["remote", "get-url", "origin"]).ok()?;
        (output.status == 0 && output.stdout.trim() == self.repo_url)
            .then_some(self.workspace.as_path())
    }

    fn diff_in_workspace(&self, base: &str, head: &str) -> Result<Vec<String>> {
        let dir = &self.workspace;
        self.shallow_fetch(dir, base, head)?;
        self.diff_name_only(dir, base, head)
    }

    fn diff_in_scratch_clone(
        &self,
        credentials: &Credentials,
        base: &str,
        head: &str,
    ) -> Result<Vec<String>> {
        let scratch = TempDir::with_prefix_in("glob-changed-files-", &self.scratch_root)?;
        let dir = scratch.path();
        self.init_repo(dir)?;
        self.add_remote(dir)?;
        self.set_auth_header(dir, credentials)?;
        self.shallow_fetch(dir, base, head)?;
        self.diff_name_only(dir, base, head)
    }
}

impl SourceControl for GitCli {
    fn compare_commits(
        &self,
        credentials: &Credentials,
        base: &str,
        head: &str,
    ) -> Result<Vec<String>> {
        if self.reusable_workspace().is_some() {
            debug!(workspace = %self.workspace.display(), "diffing in the existing clone");
            match self.diff_in_workspace(base, head) {
                Ok(paths) => return Ok(paths),
                Err(err) => {
                    warn!("diff in the existing clone failed, using a scratch clone: {err}");
                }
            }
        }
        self.diff_in_scratch_clone(credentials, base, head)
    }

    fn list_tracked_files(&self) -> Vec<String> {
        match git(&self.workspace, &["ls-files"]) {
            Ok(output) if output.status == 0 => lines(&output.stdout),
            Ok(output) => {
                warn!(
                    status = output.status,
                    "failed to list the working tree files, returning no files"
                );
                Vec::new()
            }
            Err(err) => {
                warn!("failed to list the working tree files, returning no files: {err}");
                Vec::new()
            }
        }
    }
}

struct ExecOutput {
    stdout: String,
    status: i32,
}

fn git(dir: &Path, args: &[&str]) -> Result<ExecOutput> {
    debug!(?args, "git");
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(Error::GitSpawn)?;
    Ok(ExecOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        status: output.status.code().unwrap_or(-1),
    })
}

fn git_checked(dir: &Path, args: &[&str]) -> Result<String> {
    let output = git(dir, args)?;
    if output.status != 0 {
        return Err(Error::GitCommand {
            command: format!("git {}", args.join(" ")),
            status: output.status,
        });
    }
    Ok(output.stdout)
}

fn lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Event, Repo};
    use std::fs;

    fn context_in(dir: &Path) -> Context {
        Context {
            repo: Repo {
                owner: "octocat".to_string(),
                name: "sandbox".to_string(),
            },
            event_name: "push".to_string(),
            server_url: "https://github.com".to_string(),
            api_url: "https://api.github.com".to_string(),
            workspace: dir.to_path_buf(),
            runner_temp: dir.to_path_buf(),
            github_output: None,
            event: Event::Other,
        }
    }

    fn git_in(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .status()
            .unwrap();
        assert!(status.success(), "git {args:?} failed");
    }

    #[test]
    fn lines_trims_and_drops_blanks() {
        assert_eq!(
            lines("a.txt\n\nb/c.txt\n"),
            vec!["a.txt".to_string(), "b/c.txt".to_string()]
        );
        assert!(lines("").is_empty());
    }

    #[test]
    fn list_tracked_files_returns_the_index() {
        let tmp = TempDir::new().unwrap();
        git_in(tmp.path(), &["init", "--quiet"]);
        fs::write(tmp.path().join("a.txt"), "a").unwrap();
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/b.txt"), "b").unwrap();
        git_in(tmp.path(), &["add", "-A"]);

        let git = GitCli::new(&context_in(tmp.path()));
        let mut files = git.list_tracked_files();
        files.sort();
        assert_eq!(files, vec!["a.txt".to_string(), "sub/b.txt".to_string()]);
    }

    #[test]
    fn list_tracked_files_degrades_outside_a_repository() {
        let tmp = TempDir::new().unwrap();
        let git = GitCli::new(&context_in(tmp.path()));
        assert!(git.list_tracked_files().is_empty());
    }

    #[test]
    fn workspace_without_matching_remote_is_not_reused() {
        let tmp = TempDir::new().unwrap();
        git_in(tmp.path(), &["init", "--quiet"]);
        git_in(
            tmp.path(),
            &["remote", "add", "origin", "https://github.com/other/repo"],
        );
        let git = GitCli::new(&context_in(tmp.path()));
        assert!(git.reusable_workspace().is_none());
    }

    #[test]
    fn workspace_with_matching_remote_is_reused() {
        let tmp = TempDir::new().unwrap();
        git_in(tmp.path(), &["init", "--quiet"]);
        git_in(
            tmp.path(),
            &["remote", "add", "origin", "https://github.com/octocat/sandbox"],
        );
        let git = GitCli::new(&context_in(tmp.path()));
        assert!(git.reusable_workspace().is_some());
    }
}
