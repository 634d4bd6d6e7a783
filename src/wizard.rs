use dialoguer::console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password, Select};
use std::collections::BTreeMap;

use crate::domain::{Auth, AuthField, CreateOptions, ExposureMode, Provider};
use crate::error::VibeError;
use crate::validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaudeAuthMethod {
    OAuth,
    ApiKey,
}

impl ClaudeAuthMethod {
    const ALL: [ClaudeAuthMethod; 2] = [ClaudeAuthMethod::OAuth, ClaudeAuthMethod::ApiKey];

    fn credential(self) -> AuthField {
        match self {
            Self::OAuth => AuthField::ClaudeOAuthToken,
            Self::ApiKey => AuthField::AnthropicApiKey,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::OAuth => "OAuth Token",
            Self::ApiKey => "API Key",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodexAuthMethod {
    OpenAi,
    CodexKey,
    AuthJson,
}

impl CodexAuthMethod {
    const ALL: [CodexAuthMethod; 3] = [
        CodexAuthMethod::OpenAi,
        CodexAuthMethod::CodexKey,
        CodexAuthMethod::AuthJson,
    ];

    fn credential(self) -> AuthField {
        match self {
            Self::OpenAi => AuthField::OpenAiApiKey,
            Self::CodexKey => AuthField::CodexApiKey,
            Self::AuthJson => AuthField::CodexAuthJson,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI API Key",
            Self::CodexKey => "Codex API Key",
            Self::AuthJson => "Auth JSON",
        }
    }
}

/// One question the wizard can ask. Order of the variants in
/// `visible_fields` is the order they are asked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Provider,
    ClaudeAuthMethod,
    CodexAuthMethod,
    UseSaved(AuthField),
    NewSecret(AuthField),
    Workspace,
    ExposeTerminal,
    ExposureLevel,
    TunnelEnable,
    Advanced,
    ReadOnlyPort,
    InteractivePort,
    Firewall,
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEdit {
    Name(String),
    Provider(Provider),
    ClaudeAuthMethod(ClaudeAuthMethod),
    CodexAuthMethod(CodexAuthMethod),
    UseSaved(AuthField, bool),
    NewSecret(AuthField, String),
    Workspace(String),
    ExposeTerminal(bool),
    ExposureLevel(ExposureMode),
    TunnelEnable(bool),
    Advanced(bool),
    ReadOnlyPort(u16),
    InteractivePort(u16),
    Firewall(bool),
    Image(String),
}

/// Everything the create form knows. `opts.auth` holds the saved
/// credentials the form was seeded with; replacements live in `entered`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardState {
    opts: CreateOptions,
    use_saved: BTreeMap<AuthField, bool>,
    entered: Auth,
    claude_method: ClaudeAuthMethod,
    codex_method: CodexAuthMethod,
    expose: bool,
    access: ExposureMode,
    advanced: bool,
}

impl WizardState {
    pub fn new(seed: CreateOptions) -> Self {
        let use_saved = AuthField::ALL
            .into_iter()
            .map(|field| (field, seed.auth.has(field)))
            .collect();
        let expose = seed.exposure != ExposureMode::None;
        let access = if expose {
            seed.exposure
        } else {
            ExposureMode::Read
        };
        Self {
            opts: seed,
            use_saved,
            entered: Auth::default(),
            claude_method: ClaudeAuthMethod::OAuth,
            codex_method: CodexAuthMethod::OpenAi,
            expose,
            access,
            advanced: false,
        }
    }

    pub fn options(&self) -> &CreateOptions {
        &self.opts
    }

    pub fn has_saved(&self, field: AuthField) -> bool {
        self.opts.auth.has(field)
    }

    pub fn using_saved(&self, field: AuthField) -> bool {
        self.has_saved(field) && self.use_saved.get(&field).copied().unwrap_or(false)
    }

    pub fn exposure(&self) -> ExposureMode {
        if self.expose {
            self.access
        } else {
            ExposureMode::None
        }
    }

    /// Resolves the credential choices: a declined saved value is replaced by
    /// whatever was typed in its place.
    pub fn into_options(self) -> CreateOptions {
        let exposure = self.exposure();
        let mut opts = self.opts;
        opts.exposure = exposure;
        for field in AuthField::ALL {
            let keep = opts.auth.has(field) && self.use_saved.get(&field).copied().unwrap_or(false);
            if !keep {
                opts.auth.set(field, self.entered.get(field).to_string());
            }
        }
        opts
    }

    pub fn auth_description(&self) -> &'static str {
        match self.opts.provider {
            Provider::Base => "none",
            Provider::Claude => self.claude_method.label(),
            Provider::Codex => self.codex_method.label(),
        }
    }

    fn active_credential(&self) -> Option<AuthField> {
        match self.opts.provider {
            Provider::Base => None,
            Provider::Claude => Some(self.claude_method.credential()),
            Provider::Codex => Some(self.codex_method.credential()),
        }
    }
}

pub fn apply(mut state: WizardState, edit: FieldEdit) -> WizardState {
    match edit {
        FieldEdit::Name(name) => state.opts.name = name.trim().to_string(),
        FieldEdit::Provider(provider) => state.opts.provider = provider,
        FieldEdit::ClaudeAuthMethod(method) => state.claude_method = method,
        FieldEdit::CodexAuthMethod(method) => state.codex_method = method,
        FieldEdit::UseSaved(field, keep) => {
            state.use_saved.insert(field, keep);
        }
        FieldEdit::NewSecret(field, value) => state.entered.set(field, value),
        FieldEdit::Workspace(path) => state.opts.workspace_path = path.trim().to_string(),
        FieldEdit::ExposeTerminal(expose) => state.expose = expose,
        FieldEdit::ExposureLevel(level) => {
            if level != ExposureMode::None {
                state.access = level;
            }
        }
        FieldEdit::TunnelEnable(enabled) => state.opts.tunnel_enable = enabled,
        FieldEdit::Advanced(advanced) => state.advanced = advanced,
        FieldEdit::ReadOnlyPort(port) => state.opts.read_only_port = port,
        FieldEdit::InteractivePort(port) => state.opts.interactive_port = port,
        FieldEdit::Firewall(enabled) => state.opts.firewall_enable = enabled,
        FieldEdit::Image(image) => state.opts.image = image.trim().to_string(),
    }
    state
}

fn secret_fields(state: &WizardState, field: AuthField, out: &mut Vec<Field>) {
    if state.has_saved(field) {
        out.push(Field::UseSaved(field));
    }
    if !state.using_saved(field) {
        out.push(Field::NewSecret(field));
    }
}

/// Visibility of a field depends only on answers to fields listed before it,
/// so a driver can re-project after every edit and keep its position.
pub fn visible_fields(state: &WizardState) -> Vec<Field> {
    let mut fields = vec![Field::Name, Field::Provider];
    match state.opts.provider {
        Provider::Base => {}
        Provider::Claude => fields.push(Field::ClaudeAuthMethod),
        Provider::Codex => fields.push(Field::CodexAuthMethod),
    }
    if let Some(credential) = state.active_credential() {
        secret_fields(state, credential, &mut fields);
    }

    fields.push(Field::Workspace);
    fields.push(Field::ExposeTerminal);
    if state.expose {
        fields.push(Field::ExposureLevel);
    }
    fields.push(Field::TunnelEnable);
    if state.opts.tunnel_enable {
        secret_fields(state, AuthField::TunnelToken, &mut fields);
    }

    fields.push(Field::Advanced);
    if state.advanced {
        fields.push(Field::ReadOnlyPort);
        if state.exposure().exposes_interactive() {
            fields.push(Field::InteractivePort);
        }
        fields.push(Field::Firewall);
        fields.push(Field::Image);
    }
    fields
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn prompt_secret(theme: &ColorfulTheme, field: AuthField) -> Result<String, VibeError> {
    loop {
        let value = Password::with_theme(theme)
            .with_prompt(field.label())
            .allow_empty_password(true)
            .interact()?;
        if !value.trim().is_empty() {
            return Ok(value);
        }
        println!(
            "{}",
            style(format!("{} is required", field.label().to_lowercase())).red()
        );
    }
}

fn prompt_port(theme: &ColorfulTheme, label: &'static str, current: u16) -> Result<u16, VibeError> {
    let port = Input::<u16>::with_theme(theme)
        .with_prompt(label)
        .default(current)
        .validate_with(|value: &u16| validate::port(label, *value).map_err(|err| err.to_string()))
        .interact_text()?;
    Ok(port)
}

/// Asks one question. `None` means the user backed out.
fn prompt_field(
    theme: &ColorfulTheme,
    state: &WizardState,
    field: Field,
) -> Result<Option<FieldEdit>, VibeError> {
    let opts = state.options();
    let edit = match field {
        Field::Name => {
            let name = Input::<String>::with_theme(theme)
                .with_prompt("Stack name")
                .with_initial_text(opts.name.clone())
                .validate_with(|input: &String| {
                    validate::stack_name(input.trim()).map_err(|err| err.to_string())
                })
                .interact_text()?;
            FieldEdit::Name(name)
        }
        Field::Provider => {
            let items = ["Codex (OpenAI)", "Claude (Anthropic)", "Base (Minimal)"];
            let values = [Provider::Codex, Provider::Claude, Provider::Base];
            let current = values
                .iter()
                .position(|p| *p == opts.provider)
                .unwrap_or(0);
            let Some(idx) = Select::with_theme(theme)
                .with_prompt("Provider")
                .items(&items)
                .default(current)
                .interact_opt()?
            else {
                return Ok(None);
            };
            FieldEdit::Provider(values[idx])
        }
        Field::ClaudeAuthMethod => {
            let items: Vec<&str> = ClaudeAuthMethod::ALL.iter().map(|m| m.label()).collect();
            let Some(idx) = Select::with_theme(theme)
                .with_prompt("Claude authentication")
                .items(&items)
                .default(0)
                .interact_opt()?
            else {
                return Ok(None);
            };
            FieldEdit::ClaudeAuthMethod(ClaudeAuthMethod::ALL[idx])
        }
        Field::CodexAuthMethod => {
            let items: Vec<&str> = CodexAuthMethod::ALL.iter().map(|m| m.label()).collect();
            let Some(idx) = Select::with_theme(theme)
                .with_prompt("Codex authentication")
                .items(&items)
                .default(0)
                .interact_opt()?
            else {
                return Ok(None);
            };
            FieldEdit::CodexAuthMethod(CodexAuthMethod::ALL[idx])
        }
        Field::UseSaved(credential) => {
            let Some(keep) = Confirm::with_theme(theme)
                .with_prompt(format!("Use saved {}?", credential.label()))
                .default(true)
                .interact_opt()?
            else {
                return Ok(None);
            };
            FieldEdit::UseSaved(credential, keep)
        }
        Field::NewSecret(credential) => {
            FieldEdit::NewSecret(credential, prompt_secret(theme, credential)?)
        }
        Field::Workspace => {
            println!(
                "{}",
                style("Local directory mounted at /workspace (leave empty to skip)").dim()
            );
            let path = Input::<String>::with_theme(theme)
                .with_prompt("Workspace path")
                .with_initial_text(opts.workspace_path.clone())
                .allow_empty(true)
                .interact_text()?;
            FieldEdit::Workspace(path)
        }
        Field::ExposeTerminal => {
            let Some(expose) = Confirm::with_theme(theme)
                .with_prompt("Expose the tmux session in a web terminal?")
                .default(state.exposure() != ExposureMode::None)
                .interact_opt()?
            else {
                return Ok(None);
            };
            FieldEdit::ExposeTerminal(expose)
        }
        Field::ExposureLevel => {
            let items = ["Read-only (view only)", "Read & Write (interactive)"];
            let values = [ExposureMode::Read, ExposureMode::Write];
            let current = usize::from(state.access == ExposureMode::Write);
            let Some(idx) = Select::with_theme(theme)
                .with_prompt("Terminal access level")
                .items(&items)
                .default(current)
                .interact_opt()?
            else {
                return Ok(None);
            };
            FieldEdit::ExposureLevel(values[idx])
        }
        Field::TunnelEnable => {
            let Some(enabled) = Confirm::with_theme(theme)
                .with_prompt("Enable Cloudflare Tunnel?")
                .default(opts.tunnel_enable)
                .interact_opt()?
            else {
                return Ok(None);
            };
            FieldEdit::TunnelEnable(enabled)
        }
        Field::Advanced => {
            let Some(advanced) = Confirm::with_theme(theme)
                .with_prompt("Customize advanced settings? (ports, firewall, image)")
                .default(false)
                .interact_opt()?
            else {
                return Ok(None);
            };
            FieldEdit::Advanced(advanced)
        }
        Field::ReadOnlyPort => {
            FieldEdit::ReadOnlyPort(prompt_port(theme, "readonly port", opts.read_only_port)?)
        }
        Field::InteractivePort => FieldEdit::InteractivePort(prompt_port(
            theme,
            "interactive port",
            opts.interactive_port,
        )?),
        Field::Firewall => {
            let Some(enabled) = Confirm::with_theme(theme)
                .with_prompt("Enable outbound firewall inside the container?")
                .default(opts.firewall_enable)
                .interact_opt()?
            else {
                return Ok(None);
            };
            FieldEdit::Firewall(enabled)
        }
        Field::Image => {
            let image = Input::<String>::with_theme(theme)
                .with_prompt("Image override (empty for default)")
                .with_initial_text(opts.image.clone())
                .allow_empty(true)
                .interact_text()?;
            FieldEdit::Image(image)
        }
    };
    Ok(Some(edit))
}

pub fn review_lines(opts: &CreateOptions, auth_description: &str) -> Vec<(&'static str, String)> {
    let mut lines = vec![
        ("Stack Name", opts.name.clone()),
        ("Provider", opts.provider.to_string()),
        ("Auth", auth_description.to_string()),
        (
            "Workspace",
            if opts.has_workspace() {
                opts.workspace_path.clone()
            } else {
                "(not mapped)".to_string()
            },
        ),
        ("Tunnel", yes_no(opts.tunnel_enable).to_string()),
        ("Terminal Access", opts.exposure.to_string()),
    ];
    if opts.exposure.exposes_read_only() {
        lines.push(("Read-only Port", opts.read_only_port.to_string()));
    }
    if opts.exposure.exposes_interactive() {
        lines.push(("Interactive Port", opts.interactive_port.to_string()));
    }
    lines.push(("Firewall", yes_no(opts.firewall_enable).to_string()));
    if !opts.image.trim().is_empty() {
        lines.push(("Image", opts.image.clone()));
    }
    lines
}

fn print_review(opts: &CreateOptions, auth_description: &str) {
    let divider = format!("  {}", style("-".repeat(40)).dim());
    println!();
    println!("{}", style("Configuration Review").bold().cyan());
    println!("{divider}");
    for (label, value) in review_lines(opts, auth_description) {
        println!("  {} {value}", style(format!("{:<18}", format!("{label}:"))).bold());
    }
    println!("{divider}");
    println!();
}

/// Walks the create form. Returns `None` when the user cancels at any
/// prompt or declines the final confirmation.
pub fn run_create_wizard(seed: CreateOptions) -> Result<Option<CreateOptions>, VibeError> {
    let theme = ColorfulTheme::default();
    println!("{}", style("Vibecontainer Setup").bold().cyan());

    let mut state = WizardState::new(seed);
    let mut position = 0usize;
    loop {
        let fields = visible_fields(&state);
        let Some(field) = fields.get(position).copied() else {
            break;
        };
        let Some(edit) = prompt_field(&theme, &state, field)? else {
            return Ok(None);
        };
        state = apply(state, edit);
        position += 1;
    }

    let description = state.auth_description();
    let opts = state.into_options();
    print_review(&opts, description);
    if !confirm_with(&theme, "Create this stack?", true)? {
        return Ok(None);
    }
    Ok(Some(opts))
}

fn confirm_with(theme: &ColorfulTheme, prompt: &str, default: bool) -> Result<bool, VibeError> {
    let answer = Confirm::with_theme(theme)
        .with_prompt(prompt)
        .default(default)
        .interact_opt()?;
    Ok(answer.unwrap_or(false))
}

pub fn confirm(prompt: &str, default: bool) -> Result<bool, VibeError> {
    confirm_with(&ColorfulTheme::default(), prompt, default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Defaults;

    fn seed() -> CreateOptions {
        CreateOptions::from_defaults(&Defaults::default())
    }

    fn seeded_with(auth: Auth) -> WizardState {
        let mut opts = seed();
        opts.auth = auth;
        WizardState::new(opts)
    }

    #[test]
    fn codex_without_saved_key_asks_for_new_openai_key() {
        let state = seeded_with(Auth::default());
        let fields = visible_fields(&state);
        assert_eq!(
            &fields[..4],
            &[
                Field::Name,
                Field::Provider,
                Field::CodexAuthMethod,
                Field::NewSecret(AuthField::OpenAiApiKey)
            ]
        );
        assert!(!fields.contains(&Field::UseSaved(AuthField::OpenAiApiKey)));
        assert!(!fields.contains(&Field::ClaudeAuthMethod));
    }

    #[test]
    fn saved_key_is_offered_and_declining_reveals_input() {
        let state = seeded_with(Auth {
            openai_api_key: "sk-saved".to_string(),
            ..Auth::default()
        });
        let fields = visible_fields(&state);
        assert!(fields.contains(&Field::UseSaved(AuthField::OpenAiApiKey)));
        assert!(!fields.contains(&Field::NewSecret(AuthField::OpenAiApiKey)));

        let state = apply(state, FieldEdit::UseSaved(AuthField::OpenAiApiKey, false));
        let fields = visible_fields(&state);
        assert!(fields.contains(&Field::UseSaved(AuthField::OpenAiApiKey)));
        assert!(fields.contains(&Field::NewSecret(AuthField::OpenAiApiKey)));
    }

    #[test]
    fn provider_switch_changes_auth_questions() {
        let state = apply(seeded_with(Auth::default()), FieldEdit::Provider(Provider::Claude));
        let fields = visible_fields(&state);
        assert!(fields.contains(&Field::ClaudeAuthMethod));
        assert!(fields.contains(&Field::NewSecret(AuthField::ClaudeOAuthToken)));
        assert!(!fields.contains(&Field::CodexAuthMethod));

        let state = apply(state, FieldEdit::ClaudeAuthMethod(ClaudeAuthMethod::ApiKey));
        let fields = visible_fields(&state);
        assert!(fields.contains(&Field::NewSecret(AuthField::AnthropicApiKey)));
        assert!(!fields.contains(&Field::NewSecret(AuthField::ClaudeOAuthToken)));
        assert_eq!(state.auth_description(), "API Key");

        let state = apply(state, FieldEdit::Provider(Provider::Base));
        let fields = visible_fields(&state);
        assert!(!fields
            .iter()
            .any(|f| matches!(f, Field::NewSecret(field) if *field != AuthField::TunnelToken)));
        assert_eq!(state.auth_description(), "none");
    }

    #[test]
    fn exposure_and_advanced_gates() {
        let mut opts = seed();
        opts.exposure = ExposureMode::None;
        opts.tunnel_enable = false;
        let state = WizardState::new(opts);
        let fields = visible_fields(&state);
        assert!(!fields.contains(&Field::ExposureLevel));
        assert!(!fields.contains(&Field::ReadOnlyPort));
        assert_eq!(fields.last(), Some(&Field::Advanced));

        let state = apply(state, FieldEdit::ExposeTerminal(true));
        let state = apply(state, FieldEdit::Advanced(true));
        let fields = visible_fields(&state);
        assert!(fields.contains(&Field::ExposureLevel));
        assert!(fields.contains(&Field::ReadOnlyPort));
        assert!(!fields.contains(&Field::InteractivePort));
        assert_eq!(fields.last(), Some(&Field::Image));

        let state = apply(state, FieldEdit::ExposureLevel(ExposureMode::Write));
        assert!(visible_fields(&state).contains(&Field::InteractivePort));
        assert_eq!(state.exposure(), ExposureMode::Write);

        let state = apply(state, FieldEdit::ExposeTerminal(false));
        assert_eq!(state.exposure(), ExposureMode::None);
        assert!(!visible_fields(&state).contains(&Field::InteractivePort));
    }

    #[test]
    fn tunnel_token_questions_follow_tunnel_toggle() {
        let state = seeded_with(Auth {
            tunnel_token: "saved-tunnel".to_string(),
            ..Auth::default()
        });
        assert!(visible_fields(&state).contains(&Field::UseSaved(AuthField::TunnelToken)));
        let state = apply(state, FieldEdit::TunnelEnable(false));
        let fields = visible_fields(&state);
        assert!(!fields.contains(&Field::UseSaved(AuthField::TunnelToken)));
        assert!(!fields.contains(&Field::NewSecret(AuthField::TunnelToken)));
    }

    #[test]
    fn into_options_replaces_declined_saved_values() {
        let state = seeded_with(Auth {
            openai_api_key: "sk-saved".to_string(),
            tunnel_token: "tok-saved".to_string(),
            ..Auth::default()
        });
        let state = apply(state, FieldEdit::Name(" demo ".to_string()));
        let state = apply(state, FieldEdit::UseSaved(AuthField::OpenAiApiKey, false));
        let state = apply(
            state,
            FieldEdit::NewSecret(AuthField::OpenAiApiKey, "sk-new".to_string()),
        );
        let state = apply(state, FieldEdit::ExposeTerminal(false));
        let opts = state.into_options();
        assert_eq!(opts.name, "demo");
        assert_eq!(opts.auth.openai_api_key, "sk-new");
        assert_eq!(opts.auth.tunnel_token, "tok-saved");
        assert_eq!(opts.exposure, ExposureMode::None);
    }

    #[test]
    fn every_visible_prefix_is_stable_under_later_edits() {
        let state = seeded_with(Auth::default());
        let before = visible_fields(&state);
        let position = before
            .iter()
            .position(|f| *f == Field::TunnelEnable)
            .unwrap();
        let state = apply(state, FieldEdit::TunnelEnable(false));
        let after = visible_fields(&state);
        assert_eq!(&before[..=position], &after[..=position]);
    }

    #[test]
    fn review_lists_ports_only_when_exposed() {
        let mut opts = seed();
        opts.name = "demo".to_string();
        opts.exposure = ExposureMode::Write;
        let labels: Vec<&str> = review_lines(&opts, "OpenAI API Key")
            .into_iter()
            .map(|(label, _)| label)
            .collect();
        assert!(labels.contains(&"Read-only Port"));
        assert!(labels.contains(&"Interactive Port"));

        opts.exposure = ExposureMode::None;
        let lines = review_lines(&opts, "none");
        assert!(!lines.iter().any(|(label, _)| label.ends_with("Port")));
        assert!(lines.contains(&("Workspace", "(not mapped)".to_string())));
    }
}
