use serde::Serialize;
use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VibeError {
    #[error("{reason}")]
    Validation { field: &'static str, reason: String },
    #[error("stack \"{0}\" does not exist")]
    NotFound(String),
    #[error("stack \"{0}\" already exists")]
    AlreadyExists(String),
    #[error("invalid data: {0}")]
    Structural(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("process error: {0}")]
    Process(String),
    #[error("process error: {message}")]
    ProcessDetailed {
        message: String,
        details: ProcessErrorDetails,
    },
    #[error("keychain error: {0}")]
    Keyring(#[from] keyring::Error),
    #[error("{0}")]
    Aborted(String),
    #[error("`{command}` cancelled after {}s", after.as_secs())]
    Cancelled { command: String, after: Duration },
}

impl VibeError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn process_details(&self) -> Option<ProcessErrorDetails> {
        match self {
            Self::ProcessDetailed { details, .. } => Some(details.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProcessErrorDetails {
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_stderr: Option<String>,
}
