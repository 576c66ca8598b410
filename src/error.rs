use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("a valid target url has to be provided")]
    MissingUrl,

    #[error("action {0} is outside the action space")]
    InvalidAction(u64),

    #[error("invalid reward table: {0}")]
    RewardTable(#[from] serde_json::Error),

    #[error("environment has been closed")]
    Closed,

    /// Any browser fault other than a failed click or hover.
    #[error("browser driver failure: {0:#}")]
    Driver(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum NarratorError {
    #[error("OPENAI_API_KEY not set in environment")]
    MissingApiKey,

    #[error("request to the language model failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("language model API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("no content in language model response")]
    EmptyResponse,
}
