//! Speech synthesis over hosted TTS APIs
//!
//! Two engines are supported: ElevenLabs and the OpenAI speech endpoint.
//! `SpeechPipeline` chains them in configured order and falls through to the
//! next engine when one fails, keeping a typed record of every failed
//! attempt instead of swallowing it.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{Config, OpenAiSettings, TtsSettings};
use crate::utils::sanitize_filename;
use crate::voice::VoiceError;

const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io/v1";

/// ElevenLabs synthesis request body
#[derive(Debug, Serialize)]
struct ElevenLabsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceTuning,
}

/// Voice tuning parameters sent to ElevenLabs
#[derive(Debug, Serialize)]
struct VoiceTuning {
    stability: f32,
    similarity_boost: f32,
}

/// OpenAI speech request body
#[derive(Debug, Serialize)]
struct OpenAiSpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
}

/// Trait for speech synthesis backends
#[async_trait::async_trait]
pub trait Synthesizer: Send + Sync {
    /// Converts text to MP3 audio bytes
    async fn synthesize(&self, text: &str) -> Result<Bytes, VoiceError>;

    /// Engine name for logs and failure reports
    fn name(&self) -> &'static str;
}

/// Synthesizes speech through the ElevenLabs API
pub struct ElevenLabsSynthesizer {
    client: reqwest::Client,
    api_key: String,
    voice_id: String,
    model_id: String,
    stability: f32,
    similarity_boost: f32,
}

impl ElevenLabsSynthesizer {
    /// Creates the engine from the TTS section of the config
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::MissingApiKey` when no ElevenLabs key is set.
    pub fn new(settings: &TtsSettings) -> Result<Self, VoiceError> {
        let api_key = settings
            .elevenlabs_api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or(VoiceError::MissingApiKey {
                provider: "ElevenLabs",
            })?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voice_id: settings.voice_id.clone(),
            model_id: settings.model_id.clone(),
            stability: settings.stability,
            similarity_boost: settings.similarity_boost,
        })
    }
}

#[async_trait::async_trait]
impl Synthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Bytes, VoiceError> {
        let url = format!("{}/text-to-speech/{}", ELEVENLABS_BASE_URL, self.voice_id);
        let request = ElevenLabsRequest {
            text,
            model_id: &self.model_id,
            voice_settings: VoiceTuning {
                stability: self.stability,
                similarity_boost: self.similarity_boost,
            },
        };

        debug!(voice_id = %self.voice_id, chars = text.len(), "Requesting ElevenLabs synthesis");

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "ElevenLabs API error");
            return Err(VoiceError::Api {
                provider: "ElevenLabs",
                status: status.as_u16(),
                message: body,
            });
        }

        let audio = response.bytes().await?;
        info!(bytes = audio.len(), "ElevenLabs synthesis complete");
        Ok(audio)
    }

    fn name(&self) -> &'static str {
        "elevenlabs"
    }
}

/// Synthesizes speech through the OpenAI speech endpoint
pub struct OpenAiSynthesizer {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    voice: String,
}

impl OpenAiSynthesizer {
    /// Creates the engine from the OpenAI and TTS sections of the config
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::MissingApiKey` when no OpenAI key is set.
    pub fn new(openai: &OpenAiSettings, tts: &TtsSettings) -> Result<Self, VoiceError> {
        let api_key = openai
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or(VoiceError::MissingApiKey { provider: "OpenAI" })?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: openai.base_url.trim_end_matches('/').to_string(),
            model: tts.openai_model.clone(),
            voice: tts.openai_voice.clone(),
        })
    }
}

#[async_trait::async_trait]
impl Synthesizer for OpenAiSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Bytes, VoiceError> {
        let url = format!("{}/audio/speech", self.base_url);
        let request = OpenAiSpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
        };

        debug!(voice = %self.voice, chars = text.len(), "Requesting OpenAI synthesis");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "OpenAI TTS API error");
            return Err(VoiceError::Api {
                provider: "OpenAI",
                status: status.as_u16(),
                message: body,
            });
        }

        let audio = response.bytes().await?;
        info!(bytes = audio.len(), "OpenAI synthesis complete");
        Ok(audio)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Ordered chain of synthesizers with fall-through on failure
pub struct SpeechPipeline {
    engines: Vec<Box<dyn Synthesizer>>,
    cache_dir: PathBuf,
}

impl SpeechPipeline {
    /// Creates a pipeline with an explicit engine order
    pub fn new(engines: Vec<Box<dyn Synthesizer>>, cache_dir: PathBuf) -> Self {
        Self { engines, cache_dir }
    }

    /// Builds the pipeline from config: ElevenLabs first when its key is
    /// present, then OpenAI
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::MissingApiKey` when neither engine has a key.
    pub fn from_config(config: &Config) -> Result<Self, VoiceError> {
        let mut engines: Vec<Box<dyn Synthesizer>> = Vec::new();

        if config
            .tts
            .elevenlabs_api_key
            .as_deref()
            .is_some_and(|key| !key.is_empty())
        {
            engines.push(Box::new(ElevenLabsSynthesizer::new(&config.tts)?));
        }

        if config
            .openai
            .api_key
            .as_deref()
            .is_some_and(|key| !key.is_empty())
        {
            engines.push(Box::new(OpenAiSynthesizer::new(
                &config.openai,
                &config.tts,
            )?));
        }

        if engines.is_empty() {
            return Err(VoiceError::MissingApiKey {
                provider: "any TTS engine",
            });
        }

        Ok(Self::new(engines, config.tts.cache_dir()))
    }

    /// Engine names in the order they will be tried
    pub fn engine_names(&self) -> Vec<&'static str> {
        self.engines.iter().map(|engine| engine.name()).collect()
    }

    /// Synthesizes text, trying each engine in order
    ///
    /// Returns the audio and the name of the engine that produced it. Each
    /// failed attempt is recorded; when no engine succeeds the full attempt
    /// list is returned in `VoiceError::AllSynthesizersFailed`.
    pub async fn synthesize(&self, text: &str) -> Result<(Bytes, &'static str), VoiceError> {
        let preview: String = text.chars().take(50).collect();
        info!(preview = %preview, "Converting text to speech");

        let mut attempts: Vec<(String, String)> = Vec::new();

        for engine in &self.engines {
            match engine.synthesize(text).await {
                Ok(audio) => {
                    if !attempts.is_empty() {
                        warn!(
                            engine = engine.name(),
                            failed_engines = attempts.len(),
                            "Fell through to a secondary synthesizer"
                        );
                    }
                    return Ok((audio, engine.name()));
                }
                Err(err) => {
                    warn!(engine = engine.name(), error = %err, "Synthesizer failed, trying next");
                    attempts.push((engine.name().to_string(), err.to_string()));
                }
            }
        }

        Err(VoiceError::AllSynthesizersFailed { attempts })
    }

    /// Synthesizes text and writes the MP3 to disk
    ///
    /// With no explicit output path the file lands in the cache directory
    /// under a name derived from the text. Returns the written path and the
    /// engine that produced the audio.
    pub async fn synthesize_to_file(
        &self,
        text: &str,
        out: Option<&Path>,
    ) -> Result<(PathBuf, &'static str), VoiceError> {
        let (audio, engine) = self.synthesize(text).await?;

        let path = match out {
            Some(path) => path.to_path_buf(),
            None => {
                std::fs::create_dir_all(&self.cache_dir)?;
                self.cache_dir
                    .join(format!("{}.mp3", sanitize_filename(text)))
            }
        };

        std::fs::write(&path, &audio)?;
        info!(path = %path.display(), engine, bytes = audio.len(), "Wrote synthesized audio");

        Ok((path, engine))
    }
}
