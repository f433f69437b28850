//! Voice input and output
//!
//! Speech synthesis and transcription over hosted APIs. Microphone capture
//! and audio playback are out of scope; synthesis lands in MP3 files and
//! transcription reads existing audio files.

pub mod stt;
pub mod tts;

pub use stt::Transcriber;
pub use tts::{ElevenLabsSynthesizer, OpenAiSynthesizer, SpeechPipeline, Synthesizer};

use thiserror::Error;

/// Errors from speech synthesis and transcription
#[derive(Error, Debug)]
pub enum VoiceError {
    /// Required API key is absent from config and environment
    #[error("Missing API key for {provider}")]
    MissingApiKey {
        /// Engine the key is needed for
        provider: &'static str,
    },

    /// HTTP transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading or writing audio files failed
    #[error("Audio file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Non-success status from a voice API
    #[error("{provider} API error (status {status}): {message}")]
    Api {
        /// Engine that rejected the request
        provider: &'static str,
        /// HTTP status code
        status: u16,
        /// Response body excerpt
        message: String,
    },

    /// The transcription came back empty
    #[error("Transcription produced no text")]
    EmptyTranscript,

    /// Every synthesizer in the pipeline failed
    #[error("All synthesizers failed: {}", .attempts.iter().map(|(engine, reason)| format!("{engine}: {reason}")).collect::<Vec<_>>().join("; "))]
    AllSynthesizersFailed {
        /// (engine name, failure reason) per attempted engine, in order
        attempts: Vec<(String, String)>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_display() {
        let err = VoiceError::MissingApiKey {
            provider: "ElevenLabs",
        };
        assert_eq!(err.to_string(), "Missing API key for ElevenLabs");
    }

    #[test]
    fn test_api_error_display() {
        let err = VoiceError::Api {
            provider: "Whisper",
            status: 400,
            message: "bad audio".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Whisper API error (status 400): bad audio"
        );
    }

    #[test]
    fn test_all_failed_lists_attempts_in_order() {
        let err = VoiceError::AllSynthesizersFailed {
            attempts: vec![
                ("elevenlabs".to_string(), "status 401".to_string()),
                ("openai".to_string(), "timeout".to_string()),
            ],
        };
        assert_eq!(
            err.to_string(),
            "All synthesizers failed: elevenlabs: status 401; openai: timeout"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: VoiceError = io.into();
        assert!(matches!(err, VoiceError::Io(_)));
    }
}
