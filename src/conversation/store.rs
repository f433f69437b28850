use crate::conversation::types::Message;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failure writing or serializing a session record.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence boundary: maps a session id to a JSON file on disk holding
/// the full ordered message log. Records are overwritten wholesale on every
/// save and never deleted by this layer.
pub struct SessionStore {
    history_dir: PathBuf,
}

impl SessionStore {
    pub fn new(history_dir: PathBuf) -> Self {
        Self { history_dir }
    }

    /// Path of the record for a session id. Path separators in the id are
    /// mapped to `_` so a record never escapes the history directory.
    pub fn record_path(&self, session_id: &str) -> PathBuf {
        let safe: String = session_id
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.history_dir.join(format!("{}.json", safe))
    }

    /// Loads the message log for a session. Fails soft: a missing record is
    /// the normal "no prior history" case, and any I/O or parse failure
    /// degrades to an empty log with a logged warning. Never errors.
    pub fn load(&self, session_id: &str) -> Vec<Message> {
        let file_path = self.record_path(session_id);

        let json = match fs::read_to_string(&file_path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(session_id, "No prior history at {:?}", file_path);
                return Vec::new();
            }
            Err(e) => {
                warn!(session_id, "Failed to read session record {:?}: {}", file_path, e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Message>>(&json) {
            Ok(log) => {
                info!(
                    session_id,
                    "Loaded {} messages from {:?}",
                    log.len(),
                    file_path
                );
                log
            }
            Err(e) => {
                // Left in place; the next save overwrites it wholesale.
                warn!(
                    session_id,
                    "Malformed session record {:?}, starting empty: {}", file_path, e
                );
                Vec::new()
            }
        }
    }

    /// Writes the full ordered log for a session, replacing any prior
    /// content. Creates the history directory on demand.
    pub fn save(&self, session_id: &str, log: &[Message]) -> Result<(), StoreError> {
        self.ensure_history_dir()?;

        let file_path = self.record_path(session_id);
        let json = serde_json::to_string_pretty(log)?;
        fs::write(&file_path, json)?;

        // Set file permissions to 0600 on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&file_path, permissions)?;
        }

        debug!(
            session_id,
            "Saved {} messages to {:?}",
            log.len(),
            file_path
        );
        Ok(())
    }

    fn ensure_history_dir(&self) -> Result<(), StoreError> {
        if !self.history_dir.exists() {
            fs::create_dir_all(&self.history_dir)?;

            // Set directory permissions to 0755 on Unix
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let permissions = fs::Permissions::from_mode(0o755);
                fs::set_permissions(&self.history_dir, permissions)?;
            }

            info!("Created history directory: {:?}", self.history_dir);
        }
        Ok(())
    }
}
