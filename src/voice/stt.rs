//! Transcription over the Whisper API

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, error, info};

use crate::config::{OpenAiSettings, SttSettings};
use crate::voice::VoiceError;

/// Whisper transcription response body
#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Guesses the MIME type from an audio file name
fn mime_for(file_name: &str) -> &'static str {
    match Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
    {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("m4a") => "audio/mp4",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("webm") => "audio/webm",
        _ => "application/octet-stream",
    }
}

/// Transcribes audio files to text
pub struct Transcriber {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl Transcriber {
    /// Creates a transcriber from the OpenAI and STT sections of the config
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::MissingApiKey` when no OpenAI key is set.
    pub fn new(openai: &OpenAiSettings, stt: &SttSettings) -> Result<Self, VoiceError> {
        let api_key = openai
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or(VoiceError::MissingApiKey { provider: "OpenAI" })?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: openai.base_url.trim_end_matches('/').to_string(),
            model: stt.model.clone(),
        })
    }

    /// Transcribes raw audio bytes
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::EmptyTranscript` when the API recognizes no
    /// speech, `VoiceError::Api` on non-success status.
    pub async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String, VoiceError> {
        debug!(
            audio_bytes = audio.len(),
            model = %self.model,
            "Starting transcription"
        );

        let part = reqwest::multipart::Part::bytes(audio)
            .file_name(file_name.to_string())
            .mime_str(mime_for(file_name))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        debug!(status = %status, "Received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Whisper API error");
            return Err(VoiceError::Api {
                provider: "Whisper",
                status: status.as_u16(),
                message: body,
            });
        }

        let result: WhisperResponse = response.json().await?;
        if result.text.trim().is_empty() {
            return Err(VoiceError::EmptyTranscript);
        }

        let preview: String = result.text.chars().take(50).collect();
        info!(preview = %preview, "Transcription complete");

        Ok(result.text)
    }

    /// Reads an audio file and transcribes it
    pub async fn transcribe_file(&self, path: &Path) -> Result<String, VoiceError> {
        let audio = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        self.transcribe(audio, &file_name).await
    }
}
