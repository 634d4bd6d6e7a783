use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::domain::{Defaults, ExposureMode, Provider};
use crate::error::VibeError;
use crate::paths::{create_private_dir, write_private_file};

/// Persists the values a previous `create` used so the next one can start
/// from them.
#[derive(Debug, Clone)]
pub struct DefaultsStore {
    path: PathBuf,
}

impl DefaultsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file yields the built-ins. A file that is not a JSON object is
    /// an error; individual fields that are absent, zero or of the wrong type
    /// fall back to the built-in value.
    pub fn load(&self) -> Result<Defaults, VibeError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Defaults::default()),
            Err(err) => return Err(err.into()),
        };
        let raw: Value = serde_json::from_str(&content).map_err(|err| {
            VibeError::Structural(format!(
                "defaults file {} is corrupt: {err}",
                self.path.display()
            ))
        })?;
        let Some(object) = raw.as_object() else {
            return Err(VibeError::Structural(format!(
                "defaults file {} must contain a JSON object",
                self.path.display()
            )));
        };

        let builtin = Defaults::default();
        let text = |key: &str| object.get(key).and_then(Value::as_str);
        let port = |key: &str, fallback: u16| {
            object
                .get(key)
                .and_then(Value::as_u64)
                .and_then(|value| u16::try_from(value).ok())
                .filter(|value| *value != 0)
                .unwrap_or(fallback)
        };
        let boolean = |key: &str, fallback: bool| {
            object.get(key).and_then(Value::as_bool).unwrap_or(fallback)
        };

        Ok(Defaults {
            provider: text("provider")
                .and_then(|value| value.parse::<Provider>().ok())
                .unwrap_or(builtin.provider),
            read_only_port: port("read_only_port", builtin.read_only_port),
            exposure: text("exposure")
                .and_then(|value| value.parse::<ExposureMode>().ok())
                .unwrap_or(builtin.exposure),
            interactive_port: port("interactive_port", builtin.interactive_port),
            firewall_enable: boolean("firewall_enable", builtin.firewall_enable),
            tunnel_enable: boolean("tunnel_enable", builtin.tunnel_enable),
        })
    }

    pub fn save(&self, defaults: &Defaults) -> Result<(), VibeError> {
        if let Some(parent) = self.path.parent() {
            create_private_dir(parent)?;
        }
        let mut body = serde_json::to_string_pretty(defaults)?;
        body.push('\n');
        write_private_file(&self.path, body.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_returns_builtins() {
        let dir = tempdir().unwrap();
        let store = DefaultsStore::new(dir.path().join("config.json"));
        let defaults = store.load().unwrap();
        assert_eq!(defaults, Defaults::default());
        assert_eq!(defaults.provider, Provider::Codex);
        assert_eq!(defaults.read_only_port, 7681);
        assert_eq!(defaults.interactive_port, 7682);
        assert_eq!(defaults.exposure, ExposureMode::Read);
        assert!(defaults.firewall_enable);
        assert!(defaults.tunnel_enable);
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempdir().unwrap();
        let store = DefaultsStore::new(dir.path().join("nested").join("config.json"));
        let defaults = Defaults {
            provider: Provider::Claude,
            read_only_port: 8000,
            exposure: ExposureMode::Write,
            interactive_port: 8001,
            firewall_enable: false,
            tunnel_enable: false,
        };
        store.save(&defaults).unwrap();
        assert_eq!(store.load().unwrap(), defaults);

        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\n  \"provider\": \"claude\""));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(store.path()).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600);
            let parent = store.path().parent().unwrap();
            let dir_mode = fs::metadata(parent).unwrap().permissions().mode() & 0o777;
            assert_eq!(dir_mode, 0o700);
        }
    }

    #[test]
    fn invalid_and_zero_fields_are_backfilled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"provider":"gemini","read_only_port":0,"interactive_port":70000,"exposure":"admin","firewall_enable":"yes","tunnel_enable":false}"#,
        )
        .unwrap();
        let defaults = DefaultsStore::new(&path).load().unwrap();
        assert_eq!(defaults.provider, Provider::Codex);
        assert_eq!(defaults.read_only_port, 7681);
        assert_eq!(defaults.interactive_port, 7682);
        assert_eq!(defaults.exposure, ExposureMode::Read);
        assert!(defaults.firewall_enable);
        assert!(!defaults.tunnel_enable);
    }

    #[test]
    fn partial_file_keeps_present_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"provider":"base","exposure":"none"}"#).unwrap();
        let defaults = DefaultsStore::new(&path).load().unwrap();
        assert_eq!(defaults.provider, Provider::Base);
        assert_eq!(defaults.exposure, ExposureMode::None);
        assert_eq!(defaults.read_only_port, 7681);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        match DefaultsStore::new(&path).load() {
            Err(VibeError::Structural(message)) => assert!(message.contains("corrupt")),
            other => panic!("unexpected result: {other:?}"),
        }
        fs::write(&path, "[1,2]").unwrap();
        assert!(matches!(
            DefaultsStore::new(&path).load(),
            Err(VibeError::Structural(_))
        ));
    }
}
