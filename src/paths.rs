use dirs::home_dir;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::VibeError;

pub const CONFIG_DIR_ENV: &str = "VIBECONTAINER_CONFIG_DIR";
pub const DATA_DIR_ENV: &str = "VIBECONTAINER_DATA_DIR";
pub const CREDENTIALS_FILE_ENV: &str = "VIBECONTAINER_CREDENTIALS_FILE";

const APP_DIR: &str = "vibecontainer";

pub fn config_dir() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_DIR_ENV) {
        return PathBuf::from(path);
    }
    let mut base = dirs::config_dir()
        .or_else(|| home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.push(APP_DIR);
    base
}

pub fn data_dir() -> PathBuf {
    if let Ok(path) = env::var(DATA_DIR_ENV) {
        return PathBuf::from(path);
    }
    let mut base = dirs::data_dir()
        .or_else(|| home_dir().map(|home| home.join(".local").join("share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.push(APP_DIR);
    base
}

pub fn defaults_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Set to keep secrets in an owner-only JSON file instead of the keychain.
pub fn credentials_file_override() -> Option<PathBuf> {
    env::var(CREDENTIALS_FILE_ENV)
        .ok()
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
}

pub fn runs_dir() -> PathBuf {
    data_dir().join("runs")
}

/// On-disk layout of one stack under the runs root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackPaths {
    pub dir: PathBuf,
    pub compose: PathBuf,
    pub env: PathBuf,
    pub metadata: PathBuf,
}

impl StackPaths {
    pub fn new(runs_dir: &Path, name: &str) -> Self {
        let dir = runs_dir.join(name);
        Self {
            compose: dir.join("compose.yaml"),
            env: dir.join(".env"),
            metadata: dir.join("run.json"),
            dir,
        }
    }
}

pub fn expand_path(input: &str) -> String {
    if let Some(stripped) = input.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            return home.join(stripped).to_string_lossy().to_string();
        }
    }
    input.to_string()
}

/// Expands `~/` and makes the path absolute against the current directory.
/// Symlinks are left as-is.
pub fn resolve_workspace(input: &str) -> Result<String, VibeError> {
    let expanded = expand_path(input.trim());
    let absolute = std::path::absolute(&expanded).map_err(|err| {
        VibeError::validation("workspace", format!("workspace path is invalid: {err}"))
    })?;
    Ok(absolute.to_string_lossy().to_string())
}

pub fn create_private_dir(path: &Path) -> Result<(), VibeError> {
    fs::create_dir_all(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}

/// Writes through a sibling temp file so readers never observe a torn file.
pub fn write_private_file(path: &Path, content: &[u8]) -> Result<(), VibeError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let tmp_path = parent.join(format!(
        ".{}.tmp.{}",
        path.file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| APP_DIR.to_string()),
        std::process::id()
    ));
    fs::write(&tmp_path, content)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}
