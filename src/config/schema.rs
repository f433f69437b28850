use crate::utils::mask_key;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_assistant_name() -> String {
    "Insurance Assistant".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    500
}

fn default_system_prompt() -> String {
    "You are an insurance support assistant. Your goal is to provide helpful, \
     accurate, and clear information about insurance policies, claims, and \
     procedures. Respond politely and informatively to user queries. If you \
     don't know the answer, acknowledge this and suggest where the user might \
     find the information. Keep responses concise but complete."
        .to_string()
}

fn default_max_retries() -> u32 {
    5
}

fn default_initial_backoff_secs() -> u64 {
    1
}

fn default_backoff_multiplier() -> u32 {
    2
}

fn default_max_backoff_secs() -> u64 {
    60
}

fn default_max_history() -> usize {
    10
}

fn default_save_history() -> bool {
    true
}

fn default_session_id() -> String {
    "default".to_string()
}

fn default_voice_id() -> String {
    // ElevenLabs "Rachel"
    "21m00Tcm4TlvDq8ikWAM".to_string()
}

fn default_tts_model_id() -> String {
    "eleven_monolingual_v1".to_string()
}

fn default_voice_stability() -> f32 {
    0.5
}

fn default_similarity_boost() -> f32 {
    0.5
}

fn default_openai_voice() -> String {
    "alloy".to_string()
}

fn default_openai_tts_model() -> String {
    "tts-1".to_string()
}

fn default_stt_model() -> String {
    "whisper-1".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,

    #[serde(default)]
    pub openai: OpenAiSettings,

    #[serde(default)]
    pub rate_limiting: RateLimitSettings,

    #[serde(default)]
    pub conversation: ConversationSettings,

    #[serde(default)]
    pub tts: TtsSettings,

    #[serde(default)]
    pub stt: SttSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assistant_name: default_assistant_name(),
            openai: OpenAiSettings::default(),
            rate_limiting: RateLimitSettings::default(),
            conversation: ConversationSettings::default(),
            tts: TtsSettings::default(),
            stt: SttSettings::default(),
        }
    }
}

impl Config {
    /// System prompt with the `{assistant_name}` placeholder substituted.
    pub fn system_prompt(&self) -> String {
        self.openai
            .system_prompt
            .replace("{assistant_name}", &self.assistant_name)
    }

    /// Summary safe to log or print: API keys masked, no secrets.
    pub fn safe_summary(&self) -> SafeSummary {
        SafeSummary {
            openai_key: self.openai.api_key.as_deref().map(mask_key),
            elevenlabs_key: self.tts.elevenlabs_api_key.as_deref().map(mask_key),
            model: self.openai.model.clone(),
            session_id: self.conversation.session_id.clone(),
            max_history: self.conversation.max_history,
            save_history: self.conversation.save_history,
        }
    }
}

/// What `keys check` and `config show` display.
#[derive(Debug, Clone)]
pub struct SafeSummary {
    pub openai_key: Option<String>,
    pub elevenlabs_key: Option<String>,
    pub model: String,
    pub session_id: String,
    pub max_history: usize,
    pub save_history: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_prompt: default_system_prompt(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff_secs")]
    pub initial_backoff_secs: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: u32,

    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_secs: default_initial_backoff_secs(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_secs: default_max_backoff_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSettings {
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    #[serde(default = "default_save_history")]
    pub save_history: bool,

    #[serde(default = "default_session_id")]
    pub session_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_dir: Option<PathBuf>,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            save_history: default_save_history(),
            session_id: default_session_id(),
            history_dir: None,
        }
    }
}

impl ConversationSettings {
    /// Configured history directory, default `~/.voxloop/history`.
    pub fn history_dir(&self) -> PathBuf {
        self.history_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .map(|home| home.join(".voxloop").join("history"))
                .unwrap_or_else(|| PathBuf::from("conversation_history"))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevenlabs_api_key: Option<String>,

    #[serde(default = "default_voice_id")]
    pub voice_id: String,

    #[serde(default = "default_tts_model_id")]
    pub model_id: String,

    #[serde(default = "default_voice_stability")]
    pub stability: f32,

    #[serde(default = "default_similarity_boost")]
    pub similarity_boost: f32,

    #[serde(default = "default_openai_voice")]
    pub openai_voice: String,

    #[serde(default = "default_openai_tts_model")]
    pub openai_model: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            elevenlabs_api_key: None,
            voice_id: default_voice_id(),
            model_id: default_tts_model_id(),
            stability: default_voice_stability(),
            similarity_boost: default_similarity_boost(),
            openai_voice: default_openai_voice(),
            openai_model: default_openai_tts_model(),
            cache_dir: None,
        }
    }
}

impl TtsSettings {
    /// Configured synthesis output directory, default `~/.voxloop/tts-cache`.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .map(|home| home.join(".voxloop").join("tts-cache"))
                .unwrap_or_else(|| PathBuf::from("tts_cache"))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttSettings {
    #[serde(default = "default_stt_model")]
    pub model: String,
}

impl Default for SttSettings {
    fn default() -> Self {
        Self {
            model: default_stt_model(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.assistant_name, "Insurance Assistant");
        assert_eq!(config.openai.model, "gpt-4o");
        assert_eq!(config.openai.temperature, 0.7);
        assert_eq!(config.openai.max_tokens, 500);
        assert_eq!(config.rate_limiting.max_retries, 5);
        assert_eq!(config.rate_limiting.initial_backoff_secs, 1);
        assert_eq!(config.rate_limiting.backoff_multiplier, 2);
        assert_eq!(config.rate_limiting.max_backoff_secs, 60);
        assert_eq!(config.conversation.max_history, 10);
        assert!(config.conversation.save_history);
        assert_eq!(config.conversation.session_id, "default");
        assert_eq!(config.stt.model, "whisper-1");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let json = r#"{
            "openai": { "model": "gpt-4o-mini" },
            "conversation": { "max_history": 4 }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.openai.max_tokens, 500);
        assert_eq!(config.conversation.max_history, 4);
        assert!(config.conversation.save_history);
        assert_eq!(config.tts.voice_id, "21m00Tcm4TlvDq8ikWAM");
    }

    #[test]
    fn test_system_prompt_substitution() {
        let mut config = Config::default();
        config.assistant_name = "PolicyPal".to_string();
        config.openai.system_prompt = "You are {assistant_name}.".to_string();

        assert_eq!(config.system_prompt(), "You are PolicyPal.");
    }

    #[test]
    fn test_keys_not_serialized_when_absent() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("api_key"));
        assert!(!json.contains("elevenlabs_api_key"));
    }

    #[test]
    fn test_safe_summary_masks_keys() {
        let mut config = Config::default();
        config.openai.api_key = Some("sk-proj-abcdefghij1234".to_string());

        let summary = config.safe_summary();
        let masked = summary.openai_key.unwrap();
        assert!(!masked.contains("abcdefghij"));
        assert!(masked.starts_with("sk-proj"));
        assert!(masked.ends_with("1234"));
        assert!(summary.elevenlabs_key.is_none());
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.conversation.session_id = "support-42".to_string();
        config.tts.elevenlabs_api_key = Some("el-key".to_string());

        let json = serde_json::to_string_pretty(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.conversation.session_id, "support-42");
        assert_eq!(back.tts.elevenlabs_api_key, Some("el-key".to_string()));
    }
}
