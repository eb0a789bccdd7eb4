use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, instrument};

use crate::config::ServiceConfig;
use crate::error::ServiceError;

pub const MODEL_ID: &str = "music_v1";
pub const OUTPUT_FORMAT: &str = "mp3_44100_192";

const GENERATE_TIMEOUT: Duration = Duration::from_secs(180);
const PLAN_TIMEOUT: Duration = Duration::from_secs(60);
const SOUND_EFFECT_TIMEOUT: Duration = Duration::from_secs(60);
const ERROR_BODY_LIMIT: usize = 500;

/// Encoded audio returned by a music generator.
#[derive(Clone, Debug)]
pub struct GeneratedAudio {
    pub bytes: Vec<u8>,
    /// File extension matching the encoding, without the dot.
    pub extension: &'static str,
}

#[async_trait]
pub trait MusicGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, length_ms: u64) -> Result<GeneratedAudio, ServiceError>;

    /// Renders audio from a composition plan, optionally with a fixed seed.
    async fn generate_from_plan(
        &self,
        plan: &serde_json::Value,
        seed: Option<u32>,
    ) -> Result<GeneratedAudio, ServiceError>;
}

#[derive(Serialize)]
struct MusicBody<'a> {
    prompt: &'a str,
    music_length_ms: u64,
    model_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    force_instrumental: Option<bool>,
}

#[derive(Serialize)]
struct PlanBody<'a> {
    composition_plan: &'a serde_json::Value,
    model_id: &'a str,
    force_instrumental: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
}

/// A short sound effect described in text.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SoundEffect {
    pub text: String,
    pub duration_seconds: f64,
    #[serde(rename = "loop")]
    pub looping: bool,
    /// How closely the result follows the text, from 0 to 1.
    pub prompt_influence: f64,
}

impl SoundEffect {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            duration_seconds: 2.0,
            looping: false,
            prompt_influence: 0.5,
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = seconds;
        self
    }

    pub fn with_loop(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_prompt_influence(mut self, influence: f64) -> Self {
        self.prompt_influence = influence;
        self
    }
}

/// Client for the ElevenLabs music and sound effect endpoints.
#[derive(Clone)]
pub struct ElevenLabsClient {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl ElevenLabsClient {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn key(&self) -> Result<&str, ServiceError> {
        self.api_key.as_deref().ok_or(ServiceError::MissingApiKey)
    }

    /// Structured composition plan for a prompt. Does not produce audio.
    #[instrument(skip(self, prompt))]
    pub async fn composition_plan(
        &self,
        prompt: &str,
        length_ms: u64,
    ) -> Result<serde_json::Value, ServiceError> {
        let key = self.key()?;
        let body = MusicBody {
            prompt,
            music_length_ms: length_ms,
            model_id: MODEL_ID,
            force_instrumental: None,
        };
        let response = self
            .http
            .post(format!("{}/music/plan", self.api_url))
            .header("xi-api-key", key)
            .json(&body)
            .timeout(PLAN_TIMEOUT)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Sound effect audio for a text description.
    #[instrument(skip(self, effect), fields(duration = effect.duration_seconds))]
    pub async fn generate_sound_effect(
        &self,
        effect: &SoundEffect,
    ) -> Result<GeneratedAudio, ServiceError> {
        let url = format!("{}/sound-generation", self.api_url);
        let request = self.http.post(url);
        self.send_for_audio(request, effect, SOUND_EFFECT_TIMEOUT).await
    }

    fn music_request(&self) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{}/music", self.api_url))
            .query(&[("output_format", OUTPUT_FORMAT)])
    }

    async fn send_for_audio<B: Serialize + ?Sized>(
        &self,
        request: reqwest::RequestBuilder,
        body: &B,
        timeout: Duration,
    ) -> Result<GeneratedAudio, ServiceError> {
        let key = self.key()?;
        let response = request
            .header("xi-api-key", key)
            .json(body)
            .timeout(timeout)
            .send()
            .await?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await?.to_vec();
        info!(bytes = bytes.len(), "received generated audio");
        Ok(GeneratedAudio {
            bytes,
            extension: "mp3",
        })
    }
}

#[async_trait]
impl MusicGenerator for ElevenLabsClient {
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str, length_ms: u64) -> Result<GeneratedAudio, ServiceError> {
        let body = MusicBody {
            prompt,
            music_length_ms: length_ms,
            model_id: MODEL_ID,
            force_instrumental: Some(true),
        };
        self.send_for_audio(self.music_request(), &body, GENERATE_TIMEOUT)
            .await
    }

    #[instrument(skip(self, plan))]
    async fn generate_from_plan(
        &self,
        plan: &serde_json::Value,
        seed: Option<u32>,
    ) -> Result<GeneratedAudio, ServiceError> {
        let body = PlanBody {
            composition_plan: plan,
            model_id: MODEL_ID,
            force_instrumental: true,
            seed,
        };
        self.send_for_audio(self.music_request(), &body, GENERATE_TIMEOUT)
            .await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status == reqwest::StatusCode::OK {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(ServiceError::Api {
        status: status.as_u16(),
        body: text.chars().take(ERROR_BODY_LIMIT).collect(),
    })
}
