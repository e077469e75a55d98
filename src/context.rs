//! Execution context: a one-shot snapshot of the CI environment, the
//! triggering event classified into a closed union, and credential handling
//! at the boundary.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Repo {
    pub owner: String,
    pub name: String,
}

impl Repo {
    pub fn url(&self, server_url: &str) -> String {
        format!("{}/{}/{}", server_url.trim_end_matches('/'), self.owner, self.name)
    }
}

#[derive(Debug)]
pub struct Context {
    pub repo: Repo,
    pub event_name: String,
    pub server_url: String,
    pub api_url: String,
    pub workspace: PathBuf,
    pub runner_temp: PathBuf,
    pub github_output: Option<PathBuf>,
    pub event: Event,
}

/// The triggering event, decided once at startup. Nothing downstream
/// re-inspects the payload.
#[derive(Debug, Clone)]
pub enum Event {
    PullRequest(PullRequestEvent),
    Push(PushEvent),
    Other,
}

#[derive(Debug, Clone)]
pub struct PullRequestEvent {
    pub number: u64,
    /// The platform-reported changed-file count, used for the enumeration
    /// ceiling before any listing happens.
    pub changed_files: u64,
    pub base_sha: Option<String>,
    pub head_sha: String,
}

#[derive(Debug, Clone)]
pub struct PushEvent {
    pub before: String,
    pub after: String,
}

#[derive(Deserialize)]
struct RawPayload {
    pull_request: Option<RawPullRequest>,
    number: Option<u64>,
    before: Option<String>,
    after: Option<String>,
}

#[derive(Deserialize)]
struct RawPullRequest {
    #[serde(default)]
    changed_files: u64,
    base: Option<RawCommitRef>,
    head: RawCommitRef,
}

#[derive(Deserialize)]
struct RawCommitRef {
    sha: String,
}

impl Event {
    fn classify(payload: &str) -> std::result::Result<Event, serde_json::Error> {
        let raw: RawPayload = serde_json::from_str(payload)?;
        Ok(match raw {
            RawPayload {
                pull_request: Some(pr),
                number: Some(number),
                ..
            } => Event::PullRequest(PullRequestEvent {
                number,
                changed_files: pr.changed_files,
                base_sha: pr.base.map(|base| base.sha),
                head_sha: pr.head.sha,
            }),
            RawPayload {
                before: Some(before),
                after: Some(after),
                ..
            } => Event::Push(PushEvent { before, after }),
            _ => Event::Other,
        })
    }
}

impl Context {
    pub fn from_env() -> Result<Self> {
        let repository = require_env("GITHUB_REPOSITORY")?;
        let (owner, name) = repository
            .split_once('/')
            .ok_or_else(|| Error::MalformedRepository(repository.clone()))?;
        let server_url = require_env("GITHUB_SERVER_URL")?;
        let api_url =
            std::env::var("GITHUB_API_URL").unwrap_or_else(|_| default_api_url(&server_url));

        let event_path = PathBuf::from(require_env("GITHUB_EVENT_PATH")?);
        let payload = std::fs::read_to_string(&event_path).map_err(|source| Error::ReadEvent {
            path: event_path.clone(),
            source,
        })?;
        let event = Event::classify(&payload).map_err(|source| Error::ParseEvent {
            path: event_path,
            source,
        })?;

        Ok(Self {
            repo: Repo {
                owner: owner.to_string(),
                name: name.to_string(),
            },
            event_name: require_env("GITHUB_EVENT_NAME")?,
            server_url,
            api_url,
            workspace: PathBuf::from(require_env("GITHUB_WORKSPACE")?),
            runner_temp: PathBuf::from(require_env("RUNNER_TEMP")?),
            github_output: std::env::var_os("GITHUB_OUTPUT").map(PathBuf::from),
            event,
        })
    }
}

fn require_env(name: &'static str) -> Result<String> {
    std::env::var(name).map_err(|_| Error::MissingEnv(name))
}

fn default_api_url(server_url: &str) -> String {
    // GitHub Enterprise Server serves its REST API under /api/v3.
    if server_url.trim_end_matches('/') == "https://github.com" {
        "https://api.github.com".to_string()
    } else {
        format!("{}/api/v3", server_url.trim_end_matches('/'))
    }
}

/// Resolution order: explicit flag, then `GITHUB_TOKEN`, then `INPUT_TOKEN`.
pub fn resolve_token(flag: Option<String>) -> Option<String> {
    flag.or_else(|| std::env::var("GITHUB_TOKEN").ok())
        .or_else(|| std::env::var("INPUT_TOKEN").ok())
        .filter(|token| !token.is_empty())
}

/// The basic-auth header value used for git fetches, derived from the token
/// once at the boundary. `Debug` is redacted so the value cannot reach logs
/// through error chains or field capture.
#[derive(Clone)]
pub struct Credentials(String);

impl Credentials {
    pub fn from_token(token: &str) -> Self {
        use base64::Engine as _;
        Self(base64::engine::general_purpose::STANDARD.encode(format!("x-access-token:{token}")))
    }

    pub fn basic_auth_value(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(***)")
    }
}
