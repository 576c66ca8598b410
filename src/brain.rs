use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::config::NarratorConfig;
use crate::error::NarratorError;

const DUNGEON_TEMPLATE: &str = r#"
A player inside a dungeon performed an action

The dungeon responded with: {event}

This could be said in a more intriguing manner by saying instead:"#;

/// Fill the dungeon prompt with a raw game event.
pub fn render_prompt(event: &str) -> String {
    DUNGEON_TEMPLATE.replace("{event}", event)
}

/// Rewrites dungeon events into more dramatic prose.
#[async_trait]
pub trait Narrate: Send + Sync {
    async fn narrate(&self, event: &str) -> Result<String, NarratorError>;
}

/// Narrator backed by an OpenAI-compatible chat completions endpoint.
pub struct OpenAiNarrator {
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
    endpoint: String,
}

impl OpenAiNarrator {
    pub fn new(config: &NarratorConfig) -> Result<Self, NarratorError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(NarratorError::MissingApiKey)?;

        Ok(Self {
            client: Client::new(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Narrate for OpenAiNarrator {
    async fn narrate(&self, event: &str) -> Result<String, NarratorError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": render_prompt(event) }],
                "temperature": self.temperature,
            }))
            .send()
            .await?;

        let status = response.status();
        let json_resp: Value = response.json().await?;

        if !status.is_success() {
            let message = api_error_message(&json_resp);
            error!(target: "brain", %status, "API error: {}", message);
            return Err(NarratorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let content = first_choice_content(&json_resp).ok_or_else(|| {
            error!(target: "brain", "unexpected response: {}", json_resp);
            NarratorError::EmptyResponse
        })?;
        debug!(target: "brain", event, narration = %content, "narrated");
        Ok(content)
    }
}

fn api_error_message(body: &Value) -> String {
    body["error"]["message"]
        .as_str()
        .unwrap_or("Unknown API error")
        .to_string()
}

fn first_choice_content(body: &Value) -> Option<String> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn prompt_embeds_the_event() {
        let prompt = render_prompt("the door is locked");
        assert!(prompt.contains("The dungeon responded with: the door is locked\n"));
        assert!(prompt.ends_with("saying instead:"));
    }

    #[test]
    fn braces_in_events_are_left_alone() {
        let prompt = render_prompt("a chest marked {event}");
        assert!(prompt.contains("a chest marked {event}"));
    }

    #[test]
    fn reads_first_choice_content() {
        let body = json!({
            "choices": [{ "message": { "role": "assistant", "content": "  The iron door refuses you.  " } }]
        });
        assert_eq!(
            first_choice_content(&body).as_deref(),
            Some("The iron door refuses you.")
        );
        assert_eq!(first_choice_content(&json!({ "choices": [] })), None);
    }

    #[test]
    fn surfaces_api_error_message() {
        let body = json!({ "error": { "message": "Rate limit reached" } });
        assert_eq!(api_error_message(&body), "Rate limit reached");
        assert_eq!(api_error_message(&json!({})), "Unknown API error");
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let mut config = NarratorConfig::try_parse_from(["narrator"]).unwrap();
        config.api_key = Some("  ".to_string());
        assert!(matches!(
            OpenAiNarrator::new(&config),
            Err(NarratorError::MissingApiKey)
        ));

        config.api_key = Some("sk-test".to_string());
        let narrator = OpenAiNarrator::new(&config).unwrap();
        assert_eq!(narrator.model(), "gpt-3.5-turbo");
    }
}
