// ABOUTME: On-disk session for the console's bearer token
// ABOUTME: Created by login, read before every command, removed on logout

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One authenticated session. Only the token and who it belongs to; the
/// password is never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Reads and writes the session file.
///
/// Lives at `~/.config/cnpj-etl-console/session.toml` (per-platform config
/// dir), chmod 0600 on Unix since it holds a live token.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn default_path() -> PathBuf {
        match dirs::config_dir() {
            Some(config_dir) => config_dir.join("cnpj-etl-console").join("session.toml"),
            None => PathBuf::from(".cnpj-etl-console").join("session.toml"),
        }
    }

    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file {}", self.path.display()))?;
        let session = toml::from_str(&contents)
            .with_context(|| format!("Session file {} is corrupt; run login again", self.path.display()))?;
        Ok(Some(session))
    }

    pub fn token(&self) -> Result<Option<String>> {
        Ok(self.load()?.map(|session| session.access_token))
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(session).context("Failed to serialize session")?;
        fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write session file {}", self.path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to chmod {}", self.path.display()))?;
        }

        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove session file {}", self.path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_load_clear_round_trip() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.toml"));

        assert!(store.load().unwrap().is_none());
        assert!(store.token().unwrap().is_none());

        let session = Session {
            access_token: "tok-123".to_string(),
            email: Some("admin@example.com".to_string()),
        };
        store.save(&session).unwrap();

        assert_eq!(store.load().unwrap(), Some(session));
        assert_eq!(store.token().unwrap().as_deref(), Some("tok-123"));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // clearing twice is fine
        store.clear().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("session.toml");
        let store = SessionStore::new(path.clone());
        store
            .save(&Session {
                access_token: "tok".to_string(),
                email: None,
            })
            .unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
