//! Configuration for the explorer and the narrator service.
//!
//! The explorer reads an optional JSON file first; command-line flags and
//! environment variables then override whatever the file set.

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, EnvError};
use crate::reward::{InfoWeighting, deep_merge};

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TEMPERATURE: f32 = 0.5;
pub const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Visible browser window.
    #[default]
    Human,
    Headless,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    pub url: Option<String>,
    pub keywords: Vec<String>,
    /// Partial reward table, deep-merged onto the defaults.
    pub rewards: Value,
    pub render_mode: RenderMode,
    pub info_weighting: InfoWeighting,
    pub chrome_path: Option<PathBuf>,
}

impl EnvConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rewards(mut self, rewards: Value) -> Self {
        self.rewards = rewards;
        self
    }

    pub fn with_render_mode(mut self, render_mode: RenderMode) -> Self {
        self.render_mode = render_mode;
        self
    }

    pub fn with_info_weighting(mut self, info_weighting: InfoWeighting) -> Self {
        self.info_weighting = info_weighting;
        self
    }

    pub fn target_url(&self) -> Result<&str, EnvError> {
        match self.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(EnvError::MissingUrl),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `~/.config/web-explorer/config.json` or the platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("web-explorer").join("config.json"))
    }
}

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))
}

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Explore a web page with a random agent", long_about = None)]
pub struct ExplorerArgs {
    /// Page every episode starts from.
    #[arg(short, long, env = "WEB_EXPLORER_URL")]
    pub url: Option<String>,

    /// Keyword to count on the page. Repeat or comma-separate.
    #[arg(short, long = "keyword", env = "WEB_EXPLORER_KEYWORDS", value_delimiter = ',')]
    pub keywords: Vec<String>,

    /// Reward overrides as JSON, e.g. '{"LOGS":{"SEVERE":5}}'.
    #[arg(long, value_parser = parse_json)]
    pub rewards: Option<Value>,

    #[arg(long, value_enum, env = "WEB_EXPLORER_RENDER_MODE")]
    pub render_mode: Option<RenderMode>,

    #[arg(long, value_enum)]
    pub info_weighting: Option<InfoWeighting>,

    /// Chrome binary. Auto-detected when unset.
    #[arg(long, env = "CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,

    /// JSON config file. Defaults to the user config directory.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long, default_value_t = 1)]
    pub episodes: usize,

    /// Step cap per episode.
    #[arg(long, default_value_t = 200)]
    pub max_steps: usize,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl ExplorerArgs {
    /// File config (explicit path, else the default path if it exists)
    /// overlaid with the flags given on the command line.
    pub fn resolve(&self) -> Result<EnvConfig, ConfigError> {
        let base = match &self.config {
            Some(path) => EnvConfig::load(path)?,
            None => match EnvConfig::default_path().filter(|p| p.exists()) {
                Some(path) => EnvConfig::load(&path)?,
                None => EnvConfig::default(),
            },
        };
        Ok(self.apply(base))
    }

    pub fn apply(&self, mut config: EnvConfig) -> EnvConfig {
        if self.url.is_some() {
            config.url = self.url.clone();
        }
        if !self.keywords.is_empty() {
            config.keywords = self.keywords.clone();
        }
        if let Some(rewards) = &self.rewards {
            config.rewards = if config.rewards.is_null() {
                rewards.clone()
            } else {
                deep_merge(&config.rewards, rewards)
            };
        }
        if let Some(render_mode) = self.render_mode {
            config.render_mode = render_mode;
        }
        if let Some(info_weighting) = self.info_weighting {
            config.info_weighting = info_weighting;
        }
        if self.chrome_path.is_some() {
            config.chrome_path = self.chrome_path.clone();
        }
        config
    }
}

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Rewrites dungeon events through a language model", long_about = None)]
pub struct NarratorConfig {
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "NARRATOR_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    #[arg(long, env = "NARRATOR_ENDPOINT", default_value = OPENAI_CHAT_COMPLETIONS_URL)]
    pub endpoint: String,

    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// First port tried; the next nine are fallbacks.
    #[arg(short, long, env = "NARRATOR_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn blank_url_counts_as_missing() {
        let config = EnvConfig::new("   ");
        assert!(matches!(config.target_url(), Err(EnvError::MissingUrl)));
        assert!(matches!(
            EnvConfig::default().target_url(),
            Err(EnvError::MissingUrl)
        ));
    }

    #[test]
    fn file_config_fills_unset_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"url":"http://example.test","keywords":["error"],"render_mode":"headless"}}"#
        )
        .unwrap();

        let config = EnvConfig::load(file.path()).unwrap();
        assert_eq!(config.target_url().unwrap(), "http://example.test");
        assert_eq!(config.keywords, vec!["error".to_string()]);
        assert_eq!(config.render_mode, RenderMode::Headless);
        assert_eq!(config.info_weighting, InfoWeighting::InfoCount);
    }

    #[test]
    fn unreadable_file_reports_its_path() {
        let err = EnvConfig::load(Path::new("/nonexistent/web-explorer.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/web-explorer.json"));
    }

    #[test]
    fn flags_override_file_values() {
        let args = ExplorerArgs::try_parse_from([
            "explorer",
            "--url",
            "http://override.test",
            "--keyword",
            "login,error",
            "--rewards",
            r#"{"LOGS":{"SEVERE":5}}"#,
            "--info-weighting",
            "warning-count",
        ])
        .unwrap();

        let file = EnvConfig::new("http://file.test")
            .with_keywords(["ignored"])
            .with_rewards(json!({ "ACTIONS": { "FAIL": -1 } }));
        let config = args.apply(file);

        assert_eq!(config.url.as_deref(), Some("http://override.test"));
        assert_eq!(config.keywords, vec!["login".to_string(), "error".to_string()]);
        assert_eq!(
            config.rewards,
            json!({ "ACTIONS": { "FAIL": -1 }, "LOGS": { "SEVERE": 5 } })
        );
        assert_eq!(config.info_weighting, InfoWeighting::WarningCount);
    }

    #[test]
    fn invalid_reward_json_is_a_usage_error() {
        let result = ExplorerArgs::try_parse_from(["explorer", "--rewards", "{not json"]);
        assert!(result.is_err());
    }
}
