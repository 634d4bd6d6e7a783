use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::{AuthField, CreateOptions, Provider};
use crate::error::VibeError;

pub const SCHEMA_VERSION: &str = "1";
pub const PRIMARY_SERVICE: &str = "vibecontainer";
pub const TUNNEL_SERVICE: &str = "cloudflared";

pub const MANAGED_LABEL: &str = "com.openhoo.vibecontainer.managed";
pub const STACK_LABEL: &str = "com.openhoo.vibecontainer.stack";
pub const PROVIDER_LABEL: &str = "com.openhoo.vibecontainer.provider";
pub const SERVICE_LABEL: &str = "com.openhoo.vibecontainer.service";
pub const VERSION_LABEL: &str = "com.openhoo.vibecontainer.version";

pub const TTYD_CREDENTIAL_ENV: &str = "TTYD_CREDENTIAL";
pub const READ_ONLY_CONTAINER_PORT: u16 = 7681;
pub const INTERACTIVE_CONTAINER_PORT: u16 = 7682;
pub const WORKSPACE_MOUNT: &str = "/workspace";

const TUNNEL_IMAGE: &str = "cloudflare/cloudflared:2026.2.0";
const HOST_BIND_IP: &str = "127.0.0.1";
const RESTART_POLICY: &str = "unless-stopped";

pub fn default_image(provider: Provider) -> &'static str {
    match provider {
        Provider::Base => "ghcr.io/openhoo/vibecontainer:latest",
        Provider::Claude => "ghcr.io/openhoo/vibecontainer:claude",
        Provider::Codex => "ghcr.io/openhoo/vibecontainer:codex",
    }
}

pub fn resolve_image(opts: &CreateOptions) -> String {
    if opts.image.trim().is_empty() {
        default_image(opts.provider).to_string()
    } else {
        opts.image.clone()
    }
}

#[derive(Debug, Serialize, Default)]
struct ComposeService {
    image: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    container_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    working_dir: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cap_add: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    environment: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    volumes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ports: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    command: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    network_mode: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    restart: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Default)]
struct ComposeFile {
    services: BTreeMap<String, ComposeService>,
}

/// Everything written to a stack directory for one create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub compose: String,
    pub image: String,
    pub env_file: String,
}

pub fn generate(opts: &CreateOptions) -> Result<Artifacts, VibeError> {
    let (compose, image) = compose_yaml(opts)?;
    Ok(Artifacts {
        compose,
        image,
        env_file: env_file(opts),
    })
}

/// Secrets that apply to this request as (env key, literal value). The
/// descriptor and the env file are both derived from this list so every
/// placeholder has a matching line.
fn secret_entries(opts: &CreateOptions) -> Vec<(&'static str, &str)> {
    let mut entries: Vec<(&'static str, &str)> = opts
        .provider
        .credentials()
        .iter()
        .filter(|field| opts.auth.has(**field))
        .map(|field| (field.env_key(), opts.auth.get(*field)))
        .collect();
    if opts.tunnel_enable && opts.auth.has(AuthField::TunnelToken) {
        entries.push((
            AuthField::TunnelToken.env_key(),
            opts.auth.get(AuthField::TunnelToken),
        ));
    }
    if !opts.ttyd_credential.is_empty() {
        entries.push((TTYD_CREDENTIAL_ENV, opts.ttyd_credential.as_str()));
    }
    entries
}

fn placeholder(env_key: &str) -> String {
    format!("${{{env_key}}}")
}

fn flag(value: bool) -> String {
    let text = if value { "1" } else { "0" };
    text.to_string()
}

fn common_labels(opts: &CreateOptions, service: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (MANAGED_LABEL.to_string(), "true".to_string()),
        (STACK_LABEL.to_string(), opts.name.clone()),
        (PROVIDER_LABEL.to_string(), opts.provider.as_str().to_string()),
        (SERVICE_LABEL.to_string(), service.to_string()),
        (VERSION_LABEL.to_string(), SCHEMA_VERSION.to_string()),
    ])
}

/// Renders the compose descriptor and returns it with the resolved image.
pub fn compose_yaml(opts: &CreateOptions) -> Result<(String, String), VibeError> {
    let image = resolve_image(opts);
    let tunnel_key = AuthField::TunnelToken.env_key();

    let mut environment = BTreeMap::from([
        (
            "TMUX_WEB_ENABLE".to_string(),
            flag(opts.exposure.exposes_read_only()),
        ),
        (
            "TMUX_WEB_INTERACTIVE_ENABLE".to_string(),
            flag(opts.exposure.exposes_interactive()),
        ),
        ("FIREWALL_ENABLE".to_string(), flag(opts.firewall_enable)),
    ]);
    for (key, _) in secret_entries(opts) {
        if key == tunnel_key {
            continue;
        }
        environment.insert(key.to_string(), placeholder(key));
    }

    let mut ports = Vec::new();
    if opts.exposure.exposes_read_only() {
        ports.push(format!(
            "{HOST_BIND_IP}:{}:{READ_ONLY_CONTAINER_PORT}",
            opts.read_only_port
        ));
    }
    if opts.exposure.exposes_interactive() {
        ports.push(format!(
            "{HOST_BIND_IP}:{}:{INTERACTIVE_CONTAINER_PORT}",
            opts.interactive_port
        ));
    }

    let mut primary = ComposeService {
        image: image.clone(),
        container_name: format!("{}-{PRIMARY_SERVICE}", opts.name),
        cap_add: vec!["NET_ADMIN".to_string(), "NET_RAW".to_string()],
        environment,
        ports,
        restart: RESTART_POLICY.to_string(),
        labels: common_labels(opts, PRIMARY_SERVICE),
        ..ComposeService::default()
    };
    if opts.has_workspace() {
        primary.working_dir = WORKSPACE_MOUNT.to_string();
        primary.volumes = vec![format!("{}:{WORKSPACE_MOUNT}", opts.workspace_path)];
    }

    let mut compose = ComposeFile::default();
    compose
        .services
        .insert(PRIMARY_SERVICE.to_string(), primary);
    if opts.tunnel_enable {
        compose.services.insert(
            TUNNEL_SERVICE.to_string(),
            ComposeService {
                image: TUNNEL_IMAGE.to_string(),
                container_name: format!("{}-{TUNNEL_SERVICE}", opts.name),
                environment: BTreeMap::from([(tunnel_key.to_string(), placeholder(tunnel_key))]),
                depends_on: vec![PRIMARY_SERVICE.to_string()],
                command: "tunnel run".to_string(),
                network_mode: format!("service:{PRIMARY_SERVICE}"),
                restart: RESTART_POLICY.to_string(),
                labels: common_labels(opts, TUNNEL_SERVICE),
                ..ComposeService::default()
            },
        );
    }

    let body = serde_yaml::to_string(&compose)?;
    Ok((body, image))
}

/// Renders the `.env` file paired with the descriptor. Empty when no secret
/// applies; otherwise sorted `KEY=value` lines ending in a newline.
pub fn env_file(opts: &CreateOptions) -> String {
    let mut lines: Vec<String> = secret_entries(opts)
        .into_iter()
        .map(|(key, value)| format!("{key}={}", escape_env_value(value)))
        .collect();
    if lines.is_empty() {
        return String::new();
    }
    lines.sort();
    let mut content = lines.join("\n");
    content.push('\n');
    content
}

fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || value.chars().any(|ch| {
            ch.is_whitespace()
                || matches!(
                    ch,
                    '\'' | '"'
                        | '$'
                        | '`'
                        | '\\'
                        | '#'
                        | ';'
                        | '&'
                        | '|'
                        | '<'
                        | '>'
                        | '('
                        | ')'
                        | '{'
                        | '}'
                        | '['
                        | ']'
                        | '*'
                        | '?'
                        | '!'
                        | '~'
                )
        })
}

pub fn escape_env_value(value: &str) -> String {
    if needs_quoting(value) {
        shell_single_quote(value)
    } else {
        value.to_string()
    }
}

fn shell_single_quote(value: &str) -> String {
    // foo'bar -> 'foo'\''bar'
    let mut out = String::new();
    out.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(ch);
        }
    }
    out.push('\'');
    out
}
