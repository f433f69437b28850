use crate::config::schema::Config;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[cfg(test)]
use std::sync::Mutex;

#[cfg(test)]
static CONFIG_TEST_ENV_LOCK: Mutex<()> = Mutex::new(());

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file contains invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
}

/// CLI flags that override file and environment configuration.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub model: Option<String>,
    pub session: Option<String>,
    pub max_history: Option<usize>,
    pub no_history: bool,
    pub history_dir: Option<PathBuf>,
}

/// Loads the layered configuration: defaults, then the config file, then
/// environment variables, then CLI flags (highest precedence).
pub fn load_config(overrides: &CliOverrides, cli_config_path: Option<PathBuf>) -> Result<Config> {
    tracing::debug!("Loading configuration");

    let mut config = Config::default();

    // Layer 1: config file (~/.voxloop/config.json unless overridden)
    let config_file = cli_config_path.or_else(get_default_config_path);

    if let Some(ref path) = config_file {
        if path.exists() {
            tracing::debug!(config_path = %path.display(), "Loading configuration from file");
            config = merge_config_from_file(config, path)?;
        } else {
            tracing::debug!(config_path = %path.display(), "Config file not found, using defaults");
        }
    }

    // Layer 2: environment variables
    merge_env_variables(&mut config);

    // Layer 3: CLI flags
    apply_cli_overrides(&mut config, overrides);

    let summary = config.safe_summary();
    tracing::debug!(
        openai_key_configured = summary.openai_key.is_some(),
        elevenlabs_key_configured = summary.elevenlabs_key.is_some(),
        model = %summary.model,
        session_id = %summary.session_id,
        max_history = summary.max_history,
        save_history = summary.save_history,
        "Configuration loaded"
    );

    Ok(config)
}

fn get_default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".voxloop").join("config.json"))
}

fn merge_config_from_file(config: Config, path: &PathBuf) -> Result<Config> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(config),
        Err(e) => return Err(e).context("Failed to read metadata for config file"),
    };

    #[cfg(unix)]
    {
        let mode = metadata.permissions().mode() & 0o777;
        if mode != 0o600 {
            tracing::error!(
                "Config file {:?} has permissions {:o}, expected 0600 - skipping for security",
                path,
                mode
            );
            return Ok(config);
        }
    }
    #[cfg(not(unix))]
    let _ = metadata;

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let file_config: Config = serde_json::from_str(&content).map_err(|e| {
        eprintln!("Error: Configuration file contains invalid JSON.");
        eprintln!("Suggestion: Run 'voxloop keys set' to recreate the configuration file.");
        ConfigError::InvalidJson(e)
    })?;

    Ok(file_config)
}

fn merge_env_variables(config: &mut Config) {
    // Empty values are treated as unset
    if let Some(key) = std::env::var("OPENAI_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
    {
        config.openai.api_key = Some(key);
    }

    if let Some(key) = std::env::var("ELEVENLABS_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
    {
        config.tts.elevenlabs_api_key = Some(key);
    }
}

fn apply_cli_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(ref model) = overrides.model {
        tracing::debug!(model = %model, "Applying CLI model override");
        config.openai.model = model.clone();
    }
    if let Some(ref session) = overrides.session {
        config.conversation.session_id = session.clone();
    }
    if let Some(max_history) = overrides.max_history {
        config.conversation.max_history = max_history;
    }
    if overrides.no_history {
        config.conversation.save_history = false;
    }
    if let Some(ref dir) = overrides.history_dir {
        config.conversation.history_dir = Some(dir.clone());
    }
}

pub fn save_config(config: &Config, path: &PathBuf) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let json = serde_json::to_string_pretty(config)?;

    let mut file = fs::File::create(path)
        .with_context(|| format!("Failed to create config file: {:?}", path))?;

    file.write_all(json.as_bytes())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    // Set file permissions to 0600 (owner read/write only)
    #[cfg(unix)]
    {
        let mut permissions = file.metadata()?.permissions();
        permissions.set_mode(0o600);
        fs::set_permissions(path, permissions)
            .with_context(|| format!("Failed to set permissions on config file: {:?}", path))?;
    }

    tracing::info!("Configuration saved to {:?}", path);
    Ok(())
}

pub fn get_config_path() -> Option<PathBuf> {
    get_default_config_path()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    fn clear_env() {
        unsafe {
            env::remove_var("OPENAI_API_KEY");
            env::remove_var("ELEVENLABS_API_KEY");
        }
    }

    #[test]
    fn test_load_config_defaults() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let nonexistent = temp_dir.path().join("nonexistent_config.json");

        let config = load_config(&CliOverrides::default(), Some(nonexistent)).unwrap();
        assert!(config.openai.api_key.is_none());
        assert_eq!(config.openai.model, "gpt-4o");
        assert_eq!(config.conversation.max_history, 10);
    }

    #[test]
    fn test_load_config_from_file() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let mut on_disk = Config::default();
        on_disk.openai.api_key = Some("file-key".to_string());
        on_disk.conversation.max_history = 6;
        save_config(&on_disk, &config_path).unwrap();

        let loaded = load_config(&CliOverrides::default(), Some(config_path)).unwrap();
        assert_eq!(loaded.openai.api_key, Some("file-key".to_string()));
        assert_eq!(loaded.conversation.max_history, 6);
    }

    #[test]
    fn test_load_config_invalid_json() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        fs::write(&config_path, "not valid json").unwrap();
        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&config_path).unwrap().permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&config_path, perms).unwrap();
        }

        let result = load_config(&CliOverrides::default(), Some(config_path));
        assert!(result.is_err());
        let err_msg = format!("{}", result.unwrap_err());
        assert!(err_msg.to_lowercase().contains("json"));
    }

    #[test]
    fn test_wrong_permissions_skips_file() {
        #[cfg(unix)]
        {
            let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
            clear_env();
            let temp_dir = TempDir::new().unwrap();
            let config_path = temp_dir.path().join("config.json");

            let mut on_disk = Config::default();
            on_disk.openai.model = "from-file".to_string();
            fs::write(&config_path, serde_json::to_string(&on_disk).unwrap()).unwrap();
            let mut perms = fs::metadata(&config_path).unwrap().permissions();
            perms.set_mode(0o644);
            fs::set_permissions(&config_path, perms).unwrap();

            let loaded = load_config(&CliOverrides::default(), Some(config_path)).unwrap();
            assert_eq!(loaded.openai.model, "gpt-4o");
        }
    }

    #[test]
    fn test_env_variable_override() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let mut on_disk = Config::default();
        on_disk.openai.api_key = Some("file-key".to_string());
        save_config(&on_disk, &config_path).unwrap();

        unsafe {
            env::set_var("OPENAI_API_KEY", "env-key");
            env::set_var("ELEVENLABS_API_KEY", "env-el-key");
        }

        let loaded = load_config(&CliOverrides::default(), Some(config_path)).unwrap();
        assert_eq!(loaded.openai.api_key, Some("env-key".to_string()));
        assert_eq!(loaded.tts.elevenlabs_api_key, Some("env-el-key".to_string()));

        clear_env();
    }

    #[test]
    fn test_cli_overrides_take_precedence() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let mut on_disk = Config::default();
        on_disk.openai.model = "file-model".to_string();
        save_config(&on_disk, &config_path).unwrap();

        let overrides = CliOverrides {
            model: Some("cli-model".to_string()),
            session: Some("cli-session".to_string()),
            max_history: Some(3),
            no_history: true,
            history_dir: Some(temp_dir.path().join("hist")),
        };

        let loaded = load_config(&overrides, Some(config_path)).unwrap();
        assert_eq!(loaded.openai.model, "cli-model");
        assert_eq!(loaded.conversation.session_id, "cli-session");
        assert_eq!(loaded.conversation.max_history, 3);
        assert!(!loaded.conversation.save_history);
        assert_eq!(
            loaded.conversation.history_dir,
            Some(temp_dir.path().join("hist"))
        );
    }

    #[test]
    fn test_save_config_permissions() {
        #[cfg(unix)]
        {
            let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
            let temp_dir = TempDir::new().unwrap();
            let config_path = temp_dir.path().join("config.json");

            save_config(&Config::default(), &config_path).unwrap();

            let mode = fs::metadata(&config_path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600, "Config file should have 0600 permissions");
        }
    }

    #[test]
    fn test_get_config_path() {
        let path = get_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains(".voxloop"));
        assert!(path.to_string_lossy().contains("config.json"));
    }
}
