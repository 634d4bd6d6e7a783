use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::VibeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Base,
    Claude,
    Codex,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Claude => "claude",
            Self::Codex => "codex",
        }
    }

    /// Credentials that are meaningful for this provider, in env-var order.
    pub fn credentials(&self) -> &'static [AuthField] {
        match self {
            Self::Base => &[],
            Self::Claude => &[AuthField::ClaudeOAuthToken, AuthField::AnthropicApiKey],
            Self::Codex => &[
                AuthField::CodexAuthJson,
                AuthField::OpenAiApiKey,
                AuthField::CodexApiKey,
            ],
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = VibeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base" => Ok(Self::Base),
            "claude" => Ok(Self::Claude),
            "codex" => Ok(Self::Codex),
            _ => Err(VibeError::validation(
                "provider",
                "provider must be one of: base, claude, codex",
            )),
        }
    }
}

/// Which web-terminal ports are published on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExposureMode {
    None,
    Read,
    Write,
}

impl ExposureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Read => "read",
            Self::Write => "write",
        }
    }

    pub fn exposes_read_only(&self) -> bool {
        matches!(self, Self::Read | Self::Write)
    }

    pub fn exposes_interactive(&self) -> bool {
        matches!(self, Self::Write)
    }
}

impl fmt::Display for ExposureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExposureMode {
    type Err = VibeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "none" => Ok(Self::None),
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            _ => Err(VibeError::validation(
                "exposure",
                "exposure must be one of: none, read, write",
            )),
        }
    }
}

/// A single named secret. The table below is the one place that knows how a
/// credential is spelled in the env file, the secret store and the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AuthField {
    ClaudeOAuthToken,
    AnthropicApiKey,
    CodexAuthJson,
    OpenAiApiKey,
    CodexApiKey,
    TunnelToken,
}

impl AuthField {
    pub const ALL: [AuthField; 6] = [
        AuthField::ClaudeOAuthToken,
        AuthField::AnthropicApiKey,
        AuthField::CodexAuthJson,
        AuthField::OpenAiApiKey,
        AuthField::CodexApiKey,
        AuthField::TunnelToken,
    ];

    pub fn env_key(&self) -> &'static str {
        match self {
            Self::ClaudeOAuthToken => "CLAUDE_CODE_OAUTH_TOKEN",
            Self::AnthropicApiKey => "ANTHROPIC_API_KEY",
            Self::CodexAuthJson => "CODEX_AUTH_JSON",
            Self::OpenAiApiKey => "OPENAI_API_KEY",
            Self::CodexApiKey => "CODEX_API_KEY",
            Self::TunnelToken => "TUNNEL_TOKEN",
        }
    }

    pub fn store_key(&self) -> &'static str {
        match self {
            Self::ClaudeOAuthToken => "claude_oauth_token",
            Self::AnthropicApiKey => "anthropic_api_key",
            Self::CodexAuthJson => "codex_auth_json",
            Self::OpenAiApiKey => "openai_api_key",
            Self::CodexApiKey => "codex_api_key",
            Self::TunnelToken => "tunnel_token",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ClaudeOAuthToken => "Claude OAuth Token",
            Self::AnthropicApiKey => "Anthropic API Key",
            Self::CodexAuthJson => "Codex Auth JSON",
            Self::OpenAiApiKey => "OpenAI API Key",
            Self::CodexApiKey => "Codex API Key",
            Self::TunnelToken => "Cloudflare Tunnel Token",
        }
    }
}

/// Secret material. Reaches disk only through the env file or the secret
/// store, never through `run.json`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Auth {
    pub claude_oauth_token: String,
    pub anthropic_api_key: String,
    pub codex_auth_json: String,
    pub openai_api_key: String,
    pub codex_api_key: String,
    pub tunnel_token: String,
}

impl Auth {
    pub fn get(&self, field: AuthField) -> &str {
        match field {
            AuthField::ClaudeOAuthToken => &self.claude_oauth_token,
            AuthField::AnthropicApiKey => &self.anthropic_api_key,
            AuthField::CodexAuthJson => &self.codex_auth_json,
            AuthField::OpenAiApiKey => &self.openai_api_key,
            AuthField::CodexApiKey => &self.codex_api_key,
            AuthField::TunnelToken => &self.tunnel_token,
        }
    }

    pub fn set(&mut self, field: AuthField, value: String) {
        let slot = match field {
            AuthField::ClaudeOAuthToken => &mut self.claude_oauth_token,
            AuthField::AnthropicApiKey => &mut self.anthropic_api_key,
            AuthField::CodexAuthJson => &mut self.codex_auth_json,
            AuthField::OpenAiApiKey => &mut self.openai_api_key,
            AuthField::CodexApiKey => &mut self.codex_api_key,
            AuthField::TunnelToken => &mut self.tunnel_token,
        };
        *slot = value;
    }

    pub fn has(&self, field: AuthField) -> bool {
        !self.get(field).trim().is_empty()
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("Auth");
        for field in AuthField::ALL {
            let shown = if self.has(field) { "<redacted>" } else { "" };
            dbg.field(field.store_key(), &shown);
        }
        dbg.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOptions {
    pub name: String,
    pub workspace_path: String,
    pub provider: Provider,
    pub image: String,
    pub read_only_port: u16,
    pub exposure: ExposureMode,
    pub interactive_port: u16,
    pub ttyd_credential: String,
    pub firewall_enable: bool,
    pub tunnel_enable: bool,
    pub auth: Auth,
}

impl CreateOptions {
    pub fn from_defaults(defaults: &Defaults) -> Self {
        Self {
            name: String::new(),
            workspace_path: String::new(),
            provider: defaults.provider,
            image: String::new(),
            read_only_port: defaults.read_only_port,
            exposure: defaults.exposure,
            interactive_port: defaults.interactive_port,
            ttyd_credential: String::new(),
            firewall_enable: defaults.firewall_enable,
            tunnel_enable: defaults.tunnel_enable,
            auth: Auth::default(),
        }
    }

    pub fn has_workspace(&self) -> bool {
        !self.workspace_path.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    pub provider: Provider,
    pub read_only_port: u16,
    pub exposure: ExposureMode,
    pub interactive_port: u16,
    pub firewall_enable: bool,
    pub tunnel_enable: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            provider: Provider::Codex,
            read_only_port: 7681,
            exposure: ExposureMode::Read,
            interactive_port: 7682,
            firewall_enable: true,
            tunnel_enable: true,
        }
    }
}

impl From<&CreateOptions> for Defaults {
    fn from(opts: &CreateOptions) -> Self {
        Self {
            provider: opts.provider,
            read_only_port: opts.read_only_port,
            exposure: opts.exposure,
            interactive_port: opts.interactive_port,
            firewall_enable: opts.firewall_enable,
            tunnel_enable: opts.tunnel_enable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub name: String,
    pub workspace: String,
    pub provider: Provider,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub image: String,
}

/// One row of `compose ps --format json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "State", default)]
    pub state: String,
    #[serde(rename = "Health", default)]
    pub health: String,
    #[serde(rename = "Project", default)]
    pub project: String,
}
