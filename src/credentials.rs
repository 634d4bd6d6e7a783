use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::debug;

use crate::domain::{Auth, AuthField};
use crate::error::VibeError;
use crate::paths::{self, create_private_dir, write_private_file};

pub const KEYCHAIN_SERVICE: &str = "vibecontainer";

/// Key/value secret storage keyed by `AuthField::store_key`.
pub trait SecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, VibeError>;
    fn set(&self, key: &str, value: &str) -> Result<(), VibeError>;
    fn delete(&self, key: &str) -> Result<(), VibeError>;

    /// Deletes every known credential. Keeps going past failures and
    /// returns the first one.
    fn clear(&self) -> Result<(), VibeError> {
        let mut first_err = None;
        for field in AuthField::ALL {
            if let Err(err) = self.delete(field.store_key()) {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// The system keychain unless `$VIBECONTAINER_CREDENTIALS_FILE` selects the
/// owner-only JSON file instead.
pub fn open_secret_store() -> Box<dyn SecretStore> {
    match paths::credentials_file_override() {
        Some(path) => {
            debug!(path = %path.display(), "using file secret store");
            Box::new(FileSecretStore::new(path))
        }
        None => {
            debug!(service = KEYCHAIN_SERVICE, "using system keychain");
            Box::new(KeyringSecretStore::new(KEYCHAIN_SERVICE))
        }
    }
}

/// Credentials supplied on the command line. `Some("")` is an explicit
/// request to clear that credential; `None` means "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplicitAuth {
    pub claude_oauth_token: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub codex_auth_json: Option<String>,
    pub openai_api_key: Option<String>,
    pub codex_api_key: Option<String>,
    pub tunnel_token: Option<String>,
}

impl ExplicitAuth {
    pub fn get(&self, field: AuthField) -> Option<&str> {
        let value = match field {
            AuthField::ClaudeOAuthToken => &self.claude_oauth_token,
            AuthField::AnthropicApiKey => &self.anthropic_api_key,
            AuthField::CodexAuthJson => &self.codex_auth_json,
            AuthField::OpenAiApiKey => &self.openai_api_key,
            AuthField::CodexApiKey => &self.codex_api_key,
            AuthField::TunnelToken => &self.tunnel_token,
        };
        value.as_deref()
    }
}

/// Field by field: an explicitly given value wins (even when empty),
/// otherwise the stored one is kept.
pub fn merge_auth(explicit: &ExplicitAuth, stored: &Auth) -> Auth {
    let mut merged = stored.clone();
    for field in AuthField::ALL {
        if let Some(value) = explicit.get(field) {
            merged.set(field, value.to_string());
        }
    }
    merged
}

/// Reads every known credential. Unreadable entries count as absent.
pub fn load_auth(store: &dyn SecretStore) -> Auth {
    let mut auth = Auth::default();
    for field in AuthField::ALL {
        match store.get(field.store_key()) {
            Ok(Some(value)) => auth.set(field, value),
            Ok(None) => {}
            Err(err) => debug!(key = field.store_key(), error = %err, "secret store read failed"),
        }
    }
    auth
}

/// Stores every non-empty credential; empty ones are left untouched.
pub fn save_auth(store: &dyn SecretStore, auth: &Auth) -> Result<(), VibeError> {
    for field in AuthField::ALL {
        let value = auth.get(field);
        if value.is_empty() {
            continue;
        }
        store.set(field.store_key(), value).map_err(|err| {
            VibeError::Process(format!("save {}: {err}", field.label().to_lowercase()))
        })?;
    }
    Ok(())
}

/// One keychain entry per credential under a fixed service name.
#[derive(Debug, Clone)]
pub struct KeyringSecretStore {
    service: String,
}

impl KeyringSecretStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, VibeError> {
        Ok(keyring::Entry::new(&self.service, key)?)
    }
}

impl SecretStore for KeyringSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, VibeError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), VibeError> {
        self.entry(key)?.set_password(value)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), VibeError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Fallback for hosts without a keychain: a single owner-only JSON object on
/// disk.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<Map<String, Value>, VibeError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(VibeError::Structural(format!(
                "secret store {} must contain a JSON object",
                self.path.display()
            ))),
            Err(err) => Err(VibeError::Structural(format!(
                "secret store {} is corrupt: {err}",
                self.path.display()
            ))),
        }
    }

    fn write_all(&self, map: &Map<String, Value>) -> Result<(), VibeError> {
        if let Some(parent) = self.path.parent() {
            create_private_dir(parent)?;
        }
        let mut body = serde_json::to_string_pretty(map)?;
        body.push('\n');
        write_private_file(&self.path, body.as_bytes())
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, VibeError> {
        let map = self.read_all()?;
        Ok(map
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), VibeError> {
        let mut map = self.read_all()?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_all(&map)
    }

    fn delete(&self, key: &str) -> Result<(), VibeError> {
        let mut map = self.read_all()?;
        if map.remove(key).is_some() {
            self.write_all(&map)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), VibeError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    entries: std::cell::RefCell<std::collections::BTreeMap<String, String>>,
}

#[cfg(test)]
impl SecretStore for MemorySecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, VibeError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), VibeError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), VibeError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn explicit_values_override_stored_ones() {
        let stored = Auth {
            openai_api_key: "stored-openai".to_string(),
            tunnel_token: "stored-tunnel".to_string(),
            anthropic_api_key: "stored-ant".to_string(),
            ..Auth::default()
        };
        let explicit = ExplicitAuth {
            openai_api_key: Some("flag-openai".to_string()),
            tunnel_token: Some(String::new()),
            codex_api_key: Some("flag-codex".to_string()),
            ..ExplicitAuth::default()
        };
        let merged = merge_auth(&explicit, &stored);
        assert_eq!(merged.openai_api_key, "flag-openai");
        assert_eq!(merged.tunnel_token, "", "explicit empty clears");
        assert_eq!(merged.anthropic_api_key, "stored-ant");
        assert_eq!(merged.codex_api_key, "flag-codex");
        assert_eq!(merged.claude_oauth_token, "");
    }

    #[test]
    fn nothing_explicit_keeps_stored() {
        let stored = Auth {
            claude_oauth_token: "oauth".to_string(),
            ..Auth::default()
        };
        assert_eq!(merge_auth(&ExplicitAuth::default(), &stored), stored);
    }

    #[test]
    fn save_and_load_round_trip_through_store() {
        let store = MemorySecretStore::default();
        let auth = Auth {
            codex_auth_json: r#"{"OPENAI_API_KEY":"k"}"#.to_string(),
            tunnel_token: "tok".to_string(),
            ..Auth::default()
        };
        save_auth(&store, &auth).unwrap();
        assert_eq!(store.get("tunnel_token").unwrap().as_deref(), Some("tok"));
        assert_eq!(store.get("openai_api_key").unwrap(), None);
        assert_eq!(load_auth(&store), auth);
    }

    #[test]
    fn save_skips_empty_values() {
        let store = MemorySecretStore::default();
        store.set("openai_api_key", "keep-me").unwrap();
        save_auth(&store, &Auth::default()).unwrap();
        assert_eq!(
            store.get("openai_api_key").unwrap().as_deref(),
            Some("keep-me")
        );
    }

    #[test]
    fn clear_deletes_every_known_credential() {
        let store = MemorySecretStore::default();
        store.set("tunnel_token", "tok").unwrap();
        store.set("codex_auth_json", "{}").unwrap();
        store.set("unrelated", "stays").unwrap();
        store.clear().unwrap();
        assert_eq!(load_auth(&store), Auth::default());
        assert_eq!(store.get("unrelated").unwrap().as_deref(), Some("stays"));
    }

    #[test]
    fn keychain_missing_entries_read_as_absent() {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
        let store = KeyringSecretStore::new(KEYCHAIN_SERVICE);
        assert_eq!(store.get("tunnel_token").unwrap(), None);
        store.delete("tunnel_token").unwrap();
        store.clear().unwrap();
        store.set("tunnel_token", "tok").unwrap();
    }

    #[test]
    fn file_store_get_set_delete_clear() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg").join("credentials.json");
        let store = FileSecretStore::new(&path);
        assert_eq!(store.get("tunnel_token").unwrap(), None);
        store.delete("tunnel_token").unwrap();
        store.clear().unwrap();

        store.set("tunnel_token", "abc").unwrap();
        store.set("openai_api_key", "sk-1").unwrap();
        assert_eq!(store.get("tunnel_token").unwrap().as_deref(), Some("abc"));

        store.delete("tunnel_token").unwrap();
        assert_eq!(store.get("tunnel_token").unwrap(), None);
        assert_eq!(store.get("openai_api_key").unwrap().as_deref(), Some("sk-1"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600);
        }

        store.clear().unwrap();
        assert!(!path.exists());
        assert_eq!(load_auth(&store), Auth::default());
    }

    #[test]
    fn corrupt_store_loads_as_empty_auth() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "not json").unwrap();
        let store = FileSecretStore::new(&path);
        assert!(matches!(store.get("tunnel_token"), Err(VibeError::Structural(_))));
        assert_eq!(load_auth(&store), Auth::default());
    }
}
