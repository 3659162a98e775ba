//! Chat-completion client used to guess audio-feature targets for an age.

use std::fmt;

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use crate::{config::Config, types::AudioFeatureTarget, utils};

pub const SYSTEM_PROMPT: &str =
    "You are a smart assistant, knowledgeable in the music tastes of people of all ages.";

pub const AUDIO_FEATURES_KEY: &str = "audio_features";

pub fn audio_features_prompt(age: u32) -> String {
    format!(
        "What would the danceability, energy and valence values be of the songs that a typical {age} year-old user listens to? \
         Give me the results (in JSON) to pass into Spotify's API to generate music recommendations for the user. \
         I want only one set of values. Only return the audio features without the 'JSON' title and any text. \
         Call the field '{AUDIO_FEATURES_KEY}' so I can reference it."
    )
}

#[derive(Debug)]
pub enum ModelError {
    Http(reqwest::Error),
    Status { status: StatusCode, body: String },
    EmptyReply,
    InvalidJson { reply: String, source: serde_json::Error },
    MissingKey { reply: String, key: &'static str },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Http(e) => write!(f, "request to the language model failed: {}", e),
            ModelError::Status { status, body } => {
                write!(f, "language model answered {}: {}", status, body)
            }
            ModelError::EmptyReply => write!(f, "language model returned no content"),
            ModelError::InvalidJson { reply, source } => {
                write!(f, "model reply is not JSON ({}): {}", source, reply)
            }
            ModelError::MissingKey { reply, key } => {
                write!(f, "model reply lacks `{}`: {}", key, reply)
            }
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Http(e) => Some(e),
            ModelError::InvalidJson { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        ModelError::Http(err)
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(http: Client, config: &Config) -> Self {
        OpenAiClient {
            http,
            api_url: config.openai_api_url.trim_end_matches('/').to_string(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
        }
    }

    /// Sends one system/user message pair and returns the first choice's text.
    pub async fn chat_completion(&self, system: &str, user: &str) -> Result<String, ModelError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": system },
                    { "role": "user", "content": user }
                ]
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status { status, body });
        }

        let body: Value = response.json().await?;
        body["choices"][0]["message"]["content"]
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .ok_or(ModelError::EmptyReply)
    }

    pub async fn audio_features_for_age(&self, age: u32) -> Result<AudioFeatureTarget, ModelError> {
        let reply = self
            .chat_completion(SYSTEM_PROMPT, &audio_features_prompt(age))
            .await?;
        parse_audio_features(&reply)
    }
}

/// Reads `audio_features.{danceability,energy,valence}` out of a model reply.
///
/// A surrounding Markdown code fence is tolerated. Nothing is defaulted: a
/// reply that isn't JSON or lacks one of the keys is an error.
pub fn parse_audio_features(reply: &str) -> Result<AudioFeatureTarget, ModelError> {
    let value: Value =
        serde_json::from_str(utils::strip_code_fence(reply)).map_err(|source| {
            ModelError::InvalidJson {
                reply: reply.to_string(),
                source,
            }
        })?;

    let features = value
        .get(AUDIO_FEATURES_KEY)
        .ok_or_else(|| ModelError::MissingKey {
            reply: reply.to_string(),
            key: AUDIO_FEATURES_KEY,
        })?;

    let field = |key: &'static str| {
        features
            .get(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| ModelError::MissingKey {
                reply: reply.to_string(),
                key,
            })
    };

    Ok(AudioFeatureTarget {
        danceability: field("danceability")?,
        energy: field("energy")?,
        valence: field("valence")?,
    })
}
