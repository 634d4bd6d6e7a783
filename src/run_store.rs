use chrono::Utc;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::compose;
use crate::domain::{CreateOptions, RunMetadata};
use crate::error::VibeError;
use crate::paths::{create_private_dir, write_private_file, StackPaths};

/// Owns `<runs>/<name>/` for every stack. Nothing is cached; each call goes
/// back to disk.
#[derive(Debug, Clone)]
pub struct RunStore {
    root: PathBuf,
}

impl RunStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn paths(&self, name: &str) -> StackPaths {
        StackPaths::new(&self.root, name)
    }

    /// Writes descriptor, env file and metadata, in that order.
    pub fn save(&self, opts: &CreateOptions) -> Result<RunMetadata, VibeError> {
        let artifacts = compose::generate(opts)?;
        let paths = self.paths(&opts.name);
        create_private_dir(&self.root)?;
        create_private_dir(&paths.dir)?;
        write_private_file(&paths.compose, artifacts.compose.as_bytes())?;
        write_private_file(&paths.env, artifacts.env_file.as_bytes())?;

        let now = Utc::now();
        let meta = RunMetadata {
            name: opts.name.clone(),
            workspace: opts.workspace_path.clone(),
            provider: opts.provider,
            created_at: now,
            updated_at: now,
            image: artifacts.image,
        };
        self.write_metadata(&meta)?;
        Ok(meta)
    }

    pub fn touch(&self, name: &str) -> Result<RunMetadata, VibeError> {
        let mut meta = self.load(name)?;
        meta.updated_at = Utc::now();
        self.write_metadata(&meta)?;
        Ok(meta)
    }

    pub fn load(&self, name: &str) -> Result<RunMetadata, VibeError> {
        let path = self.paths(name).metadata;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(VibeError::NotFound(name.to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        serde_json::from_str(&content).map_err(|err| {
            VibeError::Structural(format!("metadata {} is corrupt: {err}", path.display()))
        })
    }

    pub fn exists(&self, name: &str) -> bool {
        self.paths(name).dir.is_dir()
    }

    /// All stacks sorted by name. Directories without metadata are skipped.
    pub fn list(&self) -> Result<Vec<RunMetadata>, VibeError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut stacks = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            match self.load(&name) {
                Ok(meta) => stacks.push(meta),
                Err(VibeError::NotFound(_)) => continue,
                Err(err) => return Err(err),
            }
        }
        stacks.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(stacks)
    }

    pub fn delete(&self, name: &str) -> Result<(), VibeError> {
        match fs::remove_dir_all(self.paths(name).dir) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_metadata(&self, meta: &RunMetadata) -> Result<(), VibeError> {
        let path = self.paths(&meta.name).metadata;
        let mut body = serde_json::to_string_pretty(meta)?;
        body.push('\n');
        write_private_file(&path, body.as_bytes())
    }
}
