pub mod loader;
pub mod schema;

pub use loader::{get_config_path, load_config, save_config, CliOverrides};
pub use schema::{Config, ConversationSettings, OpenAiSettings, RateLimitSettings, SttSettings, TtsSettings};
