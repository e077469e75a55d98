use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0} is required")]
    MissingEnv(&'static str),

    #[error("GITHUB_REPOSITORY must be of the form owner/repo, got '{0}'")]
    MalformedRepository(String),

    #[error("a token is required to list changed files (set GITHUB_TOKEN or pass --token)")]
    MissingToken,

    #[error("could not determine the base revision of pull request #{0}")]
    NoBaseRevision(u64),

    #[error("failed to read event payload '{path}'")]
    ReadEvent {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse event payload '{path}': {source}")]
    ParseEvent {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{command} exited with status {status}")]
    GitCommand { command: String, status: i32 },

    #[error("failed to run git: {0}")]
    GitSpawn(#[source] std::io::Error),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    ApiRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} returned status {status}")]
    ApiStatus { url: String, status: u16 },

    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
