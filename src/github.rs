//! Hosting API access: the few REST calls the resolver needs, with a
//! bounded retry for transient failures.

use crate::context::Repo;
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// The seam between the resolver and the hosting API; tests substitute a
/// double.
pub trait HostApi {
    /// Changed file paths of a pull request, paginated to completion but
    /// never past `max_files`.
    fn list_pull_request_files(&self, number: u64, max_files: usize) -> Result<Vec<String>>;

    /// The parent sha of the pull request's first commit, used as a
    /// merge-base fallback when the event payload carries no base revision.
    fn pull_request_base_sha(&self, number: u64) -> Result<Option<String>>;
}

pub struct GitHubApi {
    client: reqwest::blocking::Client,
    api_url: String,
    owner: String,
    repo: String,
    token: String,
}

const PER_PAGE: usize = 100;
const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(500);

impl GitHubApi {
    pub fn new(api_url: &str, repo: &Repo, token: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("glob-changed-files/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(Error::HttpClient)?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            owner: repo.owner.clone(),
            repo: repo.name.clone(),
            token: token.to_string(),
        })
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_get(url) {
                Err(err) if attempt < MAX_ATTEMPTS && is_transient(&err) => {
                    let delay = BACKOFF_BASE * 2u32.pow(attempt - 1);
                    warn!("retrying in {delay:?}: {err}");
                    std::thread::sleep(delay);
                }
                result => return result,
            }
        }
    }

    fn try_get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .map_err(|source| Error::ApiRequest {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::ApiStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.json().map_err(|source| Error::ApiRequest {
            url: url.to_string(),
            source,
        })
    }
}

fn is_transient(err: &Error) -> bool {
    match err {
        Error::ApiRequest { source, .. } => source.is_timeout() || source.is_connect(),
        Error::ApiStatus { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

#[derive(Deserialize)]
struct PullRequestFile {
    filename: String,
}

#[derive(Deserialize)]
struct CommitListItem {
    parents: Vec<CommitRef>,
}

#[derive(Deserialize)]
struct CommitRef {
    sha: String,
}

impl HostApi for GitHubApi {
    fn list_pull_request_files(&self, number: u64, max_files: usize) -> Result<Vec<String>> {
        let mut files = Vec::new();
        for page in 1.. {
            let url = format!(
                "{}/repos/{}/{}/pulls/{}/files?per_page={}&page={}",
                self.api_url, self.owner, self.repo, number, PER_PAGE, page
            );
            let batch: Vec<PullRequestFile> = self.get_json(&url)?;
            let last_page = batch.len() < PER_PAGE;
            files.extend(batch.into_iter().map(|file| file.filename));
            if last_page || files.len() >= max_files {
                break;
            }
        }
        Ok(files)
    }

    fn pull_request_base_sha(&self, number: u64) -> Result<Option<String>> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}/commits?per_page=1",
            self.api_url, self.owner, self.repo, number
        );
        let commits: Vec<CommitListItem> = self.get_json(&url)?;
        Ok(commits
            .into_iter()
            .next()
            .and_then(|commit| commit.parents.into_iter().next())
            .map(|parent| parent.sha))
    }
}
