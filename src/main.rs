mod compose;
mod credentials;
mod defaults;
mod docker;
mod domain;
mod error;
mod paths;
mod run_store;
mod validate;
mod wizard;

use clap::{Args, Parser, Subcommand};
use dialoguer::console::style;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::env;
use std::io::{self, IsTerminal};
use std::process::{Command, Stdio};
use std::time::Instant;
use tracing::{debug, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::credentials::{load_auth, merge_auth, open_secret_store, save_auth, ExplicitAuth, SecretStore};
use crate::defaults::DefaultsStore;
use crate::docker::{Compose, DockerRunner, RealDockerRunner, BULK_TIMEOUT};
use crate::domain::{AuthField, CreateOptions, Defaults, ExposureMode, Provider, RunMetadata, ServiceStatus};
use crate::error::{ProcessErrorDetails, VibeError};
use crate::paths::StackPaths;
use crate::run_store::RunStore;

const LOG_ENV: &str = "VIBECONTAINER_LOG";
const LOCAL_HOST: &str = "127.0.0.1";

#[derive(Parser, Debug)]
#[command(name = "vibecontainer", version, about = "Manage vibecontainer stacks")]
struct Cli {
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create and start a managed stack
    Create(CreateArgs),
    /// List managed stacks
    List,
    /// Show service status for a stack
    Status {
        #[arg(long)]
        name: String,
    },
    /// Start a stack
    Start {
        #[arg(long)]
        name: String,
    },
    /// Stop a stack
    Stop {
        #[arg(long)]
        name: String,
    },
    /// Restart a stack
    Restart {
        #[arg(long)]
        name: String,
    },
    /// Show stack logs
    Logs {
        #[arg(long)]
        name: String,
        #[arg(long)]
        service: Option<String>,
        #[arg(long, short, default_value_t = false)]
        follow: bool,
    },
    /// Remove a stack and delete its run directory
    Remove {
        #[arg(long, required_unless_present = "all", conflicts_with = "all")]
        name: Option<String>,
        #[arg(long, default_value_t = false)]
        all: bool,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Manage stored credentials
    Credentials {
        #[command(subcommand)]
        command: CredentialsCommand,
    },
    /// Inspect the values remembered from the last create
    Defaults {
        #[command(subcommand)]
        command: DefaultsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CredentialsCommand {
    /// List which credentials are stored (without showing values)
    List,
    /// Clear all stored credentials
    Clear,
}

#[derive(Subcommand, Debug)]
enum DefaultsCommand {
    Show,
}

#[derive(Args, Debug, Default)]
struct CreateArgs {
    /// Workspace directory mounted at /workspace
    path: Option<String>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long, value_enum)]
    provider: Option<Provider>,
    #[arg(long)]
    image: Option<String>,
    #[arg(long = "readonly-port")]
    readonly_port: Option<u16>,
    #[arg(long, value_enum)]
    exposure: Option<ExposureMode>,
    #[arg(long)]
    interactive_port: Option<u16>,
    /// Basic auth for the web terminal, as user:password
    #[arg(long)]
    ttyd_credential: Option<String>,
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    firewall_enable: Option<bool>,
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    tunnel_enable: Option<bool>,
    #[arg(long)]
    tunnel_token: Option<String>,
    #[arg(long)]
    claude_oauth_token: Option<String>,
    #[arg(long)]
    anthropic_api_key: Option<String>,
    #[arg(long)]
    codex_auth_json: Option<String>,
    #[arg(long)]
    openai_api_key: Option<String>,
    #[arg(long)]
    codex_api_key: Option<String>,
    /// Skip the wizard and use flags only
    #[arg(long, default_value_t = false)]
    yes: bool,
    /// Don't store the effective credentials for next time
    #[arg(long, default_value_t = false)]
    no_save_auth: bool,
}

impl CreateArgs {
    fn explicit_auth(&self) -> ExplicitAuth {
        ExplicitAuth {
            claude_oauth_token: self.claude_oauth_token.clone(),
            anthropic_api_key: self.anthropic_api_key.clone(),
            codex_auth_json: self.codex_auth_json.clone(),
            openai_api_key: self.openai_api_key.clone(),
            codex_api_key: self.codex_api_key.clone(),
            tunnel_token: self.tunnel_token.clone(),
        }
    }

    /// Stored defaults for everything the caller did not pass explicitly.
    fn options(&self, defaults: &Defaults) -> CreateOptions {
        let mut opts = CreateOptions::from_defaults(defaults);
        if let Some(provider) = self.provider {
            opts.provider = provider;
        }
        if let Some(port) = self.readonly_port {
            opts.read_only_port = port;
        }
        if let Some(exposure) = self.exposure {
            opts.exposure = exposure;
        }
        if let Some(port) = self.interactive_port {
            opts.interactive_port = port;
        }
        if let Some(enabled) = self.firewall_enable {
            opts.firewall_enable = enabled;
        }
        if let Some(enabled) = self.tunnel_enable {
            opts.tunnel_enable = enabled;
        }
        opts.name = self.name.clone().unwrap_or_default().trim().to_string();
        opts.image = self.image.clone().unwrap_or_default();
        opts.ttyd_credential = self.ttyd_credential.clone().unwrap_or_default();
        opts.workspace_path = self.path.clone().unwrap_or_default();
        opts
    }
}

#[derive(Debug, Serialize)]
struct JsonResult<T: Serialize> {
    ok: bool,
    result: Option<T>,
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_details: Option<ProcessErrorDetails>,
}

struct Context {
    json: bool,
    runs: RunStore,
    defaults: DefaultsStore,
    secrets: Box<dyn SecretStore>,
}

fn build_context(cli: &Cli) -> Context {
    let runs = RunStore::new(paths::runs_dir());
    let defaults = DefaultsStore::new(paths::defaults_path());
    debug!(defaults = %defaults.path().display(), "resolved config files");
    Context {
        json: cli.json,
        runs,
        defaults,
        secrets: open_secret_store(),
    }
}

fn init_logging() {
    let filter = env::var(LOG_ENV).unwrap_or_else(|_| "warn".into());
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

fn main() -> Result<(), VibeError> {
    init_logging();
    let cli = Cli::parse();
    let ctx = build_context(&cli);
    let runner = RealDockerRunner::detect();

    let result = match cli.command {
        Commands::Create(args) => handle_create(&ctx, &args, &runner),
        Commands::List => handle_list(&ctx, &runner),
        Commands::Status { name } => handle_status(&ctx, &name, &runner),
        Commands::Start { name } => handle_lifecycle(&ctx, &name, Lifecycle::Start, &runner),
        Commands::Stop { name } => handle_lifecycle(&ctx, &name, Lifecycle::Stop, &runner),
        Commands::Restart { name } => handle_lifecycle(&ctx, &name, Lifecycle::Restart, &runner),
        Commands::Logs {
            name,
            service,
            follow,
        } => handle_logs(&ctx, &name, service.as_deref(), follow, &runner),
        Commands::Remove { name, all, yes } => {
            if all {
                handle_remove_all(&ctx, yes, &runner)
            } else {
                handle_remove(&ctx, name.as_deref().unwrap_or_default(), yes, &runner)
            }
        }
        Commands::Credentials { command } => handle_credentials(&ctx, command),
        Commands::Defaults { command } => handle_defaults(&ctx, command),
    };

    if let Err(err) = result {
        if ctx.json {
            let payload = JsonResult::<serde_json::Value> {
                ok: false,
                result: None,
                error: Some(err.to_string()),
                error_details: err.process_details(),
            };
            print_json(&payload)?;
        } else {
            eprintln!("Error: {err}");
        }
        std::process::exit(1);
    }

    Ok(())
}

fn print_json<T: Serialize>(payload: &T) -> Result<(), VibeError> {
    let text = serde_json::to_string_pretty(payload)?;
    println!("{}", text);
    Ok(())
}

/// JSON envelope in `--json` mode, otherwise the human rendering.
fn output(
    ctx: &Context,
    payload: serde_json::Value,
    human: impl FnOnce(),
) -> Result<(), VibeError> {
    if ctx.json {
        let wrapper = JsonResult {
            ok: true,
            result: Some(payload),
            error: None,
            error_details: None,
        };
        print_json(&wrapper)?;
    } else {
        human();
    }
    Ok(())
}

fn local_url(port: u16) -> String {
    format!("http://{LOCAL_HOST}:{port}")
}

fn require_stack(ctx: &Context, name: &str) -> Result<StackPaths, VibeError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(VibeError::validation("name", "--name is required"));
    }
    validate::stack_name(name)?;
    if !ctx.runs.exists(name) {
        return Err(VibeError::NotFound(name.to_string()));
    }
    Ok(ctx.runs.paths(name))
}

#[derive(Debug, Serialize)]
struct CreateSummary {
    name: String,
    provider: Provider,
    image: String,
    run_dir: String,
    workspace: Option<String>,
    read_only_url: Option<String>,
    interactive_url: Option<String>,
    tunnel_enable: bool,
}

fn handle_create<R: DockerRunner + ?Sized>(
    ctx: &Context,
    args: &CreateArgs,
    runner: &R,
) -> Result<(), VibeError> {
    if !args.yes {
        if ctx.json {
            return Err(VibeError::validation(
                "yes",
                "--json requires --yes for `vibecontainer create`",
            ));
        }
        if !io::stdin().is_terminal() {
            return Err(VibeError::validation(
                "yes",
                "interactive create requires a TTY; re-run with --yes and flags",
            ));
        }
    }

    let stored_defaults = ctx.defaults.load()?;
    let mut opts = args.options(&stored_defaults);
    if opts.has_workspace() {
        opts.workspace_path = paths::resolve_workspace(&opts.workspace_path)?;
    }
    let stored_auth = load_auth(ctx.secrets.as_ref());
    opts.auth = merge_auth(&args.explicit_auth(), &stored_auth);

    if !args.yes {
        let Some(chosen) = wizard::run_create_wizard(opts)? else {
            return Err(VibeError::Aborted("create canceled".to_string()));
        };
        opts = chosen;
        if opts.has_workspace() {
            opts.workspace_path = paths::resolve_workspace(&opts.workspace_path)?;
        }
    }

    create_stack(ctx, opts, !args.no_save_auth, runner)
}

/// Validated options in, running stack out. Nothing touches disk until
/// validation has passed and the name is known to be free.
fn create_stack<R: DockerRunner + ?Sized>(
    ctx: &Context,
    opts: CreateOptions,
    save_credentials: bool,
    runner: &R,
) -> Result<(), VibeError> {
    validate::create_options(&opts)?;
    if ctx.runs.exists(&opts.name) {
        return Err(VibeError::AlreadyExists(opts.name));
    }

    let meta = ctx.runs.save(&opts)?;
    let stack_paths = ctx.runs.paths(&opts.name);
    Compose::new(runner).up(&opts.name, &stack_paths)?;
    if let Err(err) = ctx.runs.touch(&opts.name) {
        warn!(stack = %opts.name, error = %err, "failed to update stack metadata");
    }
    if save_credentials {
        if let Err(err) = save_auth(ctx.secrets.as_ref(), &opts.auth) {
            warn!(error = %err, "failed to save credentials");
        }
    }
    if let Err(err) = ctx.defaults.save(&Defaults::from(&opts)) {
        warn!(error = %err, "failed to save defaults");
    }

    let summary = CreateSummary {
        name: meta.name.clone(),
        provider: meta.provider,
        image: meta.image.clone(),
        run_dir: stack_paths.dir.to_string_lossy().to_string(),
        workspace: opts.has_workspace().then(|| opts.workspace_path.clone()),
        read_only_url: opts
            .exposure
            .exposes_read_only()
            .then(|| local_url(opts.read_only_port)),
        interactive_url: opts
            .exposure
            .exposes_interactive()
            .then(|| local_url(opts.interactive_port)),
        tunnel_enable: opts.tunnel_enable,
    };
    output(ctx, serde_json::to_value(&summary)?, || {
        println!(
            "{} {} ({})",
            style("Created stack").green().bold(),
            summary.name,
            summary.provider
        );
        println!("Run dir: {}", summary.run_dir);
        println!(
            "Workspace: {}",
            summary.workspace.as_deref().unwrap_or("(not mapped)")
        );
        if let Some(url) = &summary.read_only_url {
            println!("Read-only URL: {url}");
        }
        if let Some(url) = &summary.interactive_url {
            println!("Interactive URL: {url}");
        }
        if summary.tunnel_enable {
            println!("Tunnel: enabled (Cloudflare)");
        } else {
            println!("Tunnel: disabled");
        }
    })?;

    if !ctx.json && io::stdin().is_terminal() {
        if let Some(url) = session_url(&opts) {
            offer_browser(&url);
        }
    }
    Ok(())
}

/// The terminal a user most likely wants: interactive when writable.
fn session_url(opts: &CreateOptions) -> Option<String> {
    match opts.exposure {
        ExposureMode::None => None,
        ExposureMode::Read => Some(local_url(opts.read_only_port)),
        ExposureMode::Write => Some(local_url(opts.interactive_port)),
    }
}

fn browser_command(url: &str) -> (&'static str, Vec<String>) {
    if cfg!(target_os = "macos") {
        ("open", vec![url.to_string()])
    } else if cfg!(target_os = "windows") {
        (
            "cmd",
            vec!["/c".to_string(), "start".to_string(), url.to_string()],
        )
    } else {
        ("xdg-open", vec![url.to_string()])
    }
}

fn open_browser(url: &str) -> Result<(), VibeError> {
    let (program, args) = browser_command(url);
    Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    Ok(())
}

fn offer_browser(url: &str) {
    println!("{}", style(format!("URL: {url}")).dim());
    match wizard::confirm("Open tmux session in browser?", true) {
        Ok(true) => {
            if let Err(err) = open_browser(url) {
                warn!(%url, error = %err, "failed to open browser");
            }
        }
        Ok(false) => {}
        Err(err) => debug!(error = %err, "browser prompt failed"),
    }
}

#[derive(Debug, Serialize)]
struct StackRow {
    name: String,
    provider: Provider,
    state: String,
    workspace: String,
    image: String,
    updated_at: String,
}

/// Joins stored stacks with live container states by the stack label.
fn stack_rows(
    metas: Vec<RunMetadata>,
    containers: &[docker::ManagedContainer],
) -> Vec<StackRow> {
    let mut states: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for container in containers {
        if let Some(stack) = container.stack().filter(|s| !s.is_empty()) {
            states.entry(stack).or_default().push(container.state.as_str());
        }
    }
    metas
        .into_iter()
        .map(|meta| {
            let state = match states.get(meta.name.as_str()) {
                Some(found) if !found.is_empty() => {
                    let mut found = found.clone();
                    found.sort_unstable();
                    found.join(",")
                }
                _ => "not-created".to_string(),
            };
            StackRow {
                state,
                provider: meta.provider,
                updated_at: meta.updated_at.format("%Y-%m-%d %H:%M").to_string(),
                workspace: meta.workspace,
                image: meta.image,
                name: meta.name,
            }
        })
        .collect()
}

fn render_table(header: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(idx) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }
    let heading: Vec<String> = header
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:<width$}", h, width = w + 4))
        .collect();
    println!("{}", style(heading.concat().trim_end()).bold().underlined());
    for row in rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<width$}", cell, width = w + 4))
            .collect();
        println!("{}", line.concat().trim_end());
    }
}

fn handle_list<R: DockerRunner + ?Sized>(ctx: &Context, runner: &R) -> Result<(), VibeError> {
    let metas = ctx.runs.list()?;
    let containers = if metas.is_empty() {
        Vec::new()
    } else {
        Compose::new(runner).list_managed_containers()?
    };
    let rows = stack_rows(metas, &containers);
    output(ctx, serde_json::to_value(&rows)?, || {
        if rows.is_empty() {
            println!("No managed stacks found");
            return;
        }
        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                vec![
                    row.name.clone(),
                    row.provider.to_string(),
                    row.state.clone(),
                    row.updated_at.clone(),
                ]
            })
            .collect();
        render_table(&["NAME", "PROVIDER", "STATE", "UPDATED"], &cells);
    })
}

fn handle_status<R: DockerRunner + ?Sized>(
    ctx: &Context,
    name: &str,
    runner: &R,
) -> Result<(), VibeError> {
    let stack_paths = require_stack(ctx, name)?;
    let statuses: Vec<ServiceStatus> = Compose::new(runner).status(name.trim(), &stack_paths)?;
    output(ctx, serde_json::to_value(&statuses)?, || {
        if statuses.is_empty() {
            println!("No services found");
            return;
        }
        let cells: Vec<Vec<String>> = statuses
            .iter()
            .map(|s| {
                let health = if s.health.trim().is_empty() {
                    "-".to_string()
                } else {
                    s.health.trim().to_string()
                };
                vec![s.name.clone(), s.state.clone(), health]
            })
            .collect();
        render_table(&["SERVICE", "STATE", "HEALTH"], &cells);
    })
}

#[derive(Debug, Clone, Copy)]
enum Lifecycle {
    Start,
    Stop,
    Restart,
}

impl Lifecycle {
    fn past_tense(self) -> &'static str {
        match self {
            Self::Start => "Started",
            Self::Stop => "Stopped",
            Self::Restart => "Restarted",
        }
    }
}

fn handle_lifecycle<R: DockerRunner + ?Sized>(
    ctx: &Context,
    name: &str,
    action: Lifecycle,
    runner: &R,
) -> Result<(), VibeError> {
    let stack_paths = require_stack(ctx, name)?;
    let name = name.trim();
    let compose = Compose::new(runner);
    match action {
        Lifecycle::Start => compose.up(name, &stack_paths)?,
        Lifecycle::Stop => compose.stop(name, &stack_paths)?,
        Lifecycle::Restart => compose.restart(name, &stack_paths)?,
    }
    if let Err(err) = ctx.runs.touch(name) {
        warn!(stack = %name, error = %err, "failed to update stack metadata");
    }
    output(ctx, json!({ "name": name }), || {
        println!("{} stack {name}", action.past_tense());
    })
}

fn handle_logs<R: DockerRunner + ?Sized>(
    ctx: &Context,
    name: &str,
    service: Option<&str>,
    follow: bool,
    runner: &R,
) -> Result<(), VibeError> {
    let stack_paths = require_stack(ctx, name)?;
    let name = name.trim();
    let compose = Compose::new(runner);
    if !ctx.json {
        return compose.logs(name, &stack_paths, service, follow);
    }
    if follow {
        return Err(VibeError::validation(
            "follow",
            "--follow streams to the terminal and cannot be combined with --json",
        ));
    }
    let logs = compose.captured_logs(name, &stack_paths, service)?;
    output(ctx, json!({ "name": name, "logs": logs }), || {})
}

fn handle_remove<R: DockerRunner + ?Sized>(
    ctx: &Context,
    name: &str,
    yes: bool,
    runner: &R,
) -> Result<(), VibeError> {
    let stack_paths = require_stack(ctx, name)?;
    let name = name.trim();
    if !yes {
        ensure_interactive(ctx, "remove")?;
        println!(
            "{}",
            style(format!(
                "This will delete stack \"{name}\" and its configuration."
            ))
            .yellow()
        );
        if !wizard::confirm("Remove stack?", false)? {
            return Err(VibeError::Aborted("remove canceled".to_string()));
        }
    }
    Compose::new(runner).down(name, &stack_paths)?;
    ctx.runs.delete(name)?;
    output(ctx, json!({ "removed": [name] }), || {
        println!("Removed stack {name}");
    })
}

/// Best effort: a failing `down` or delete is reported and the loop moves on.
/// All `down` calls share one overall deadline.
fn handle_remove_all<R: DockerRunner + ?Sized>(
    ctx: &Context,
    yes: bool,
    runner: &R,
) -> Result<(), VibeError> {
    let metas = ctx.runs.list()?;
    if metas.is_empty() {
        return output(ctx, json!({ "removed": [], "failed": [] }), || {
            println!("No stacks to remove");
        });
    }
    if !yes {
        ensure_interactive(ctx, "remove")?;
        println!(
            "{}",
            style(format!(
                "This will delete all {} stacks and their configuration.",
                metas.len()
            ))
            .yellow()
        );
        if !wizard::confirm("Remove all stacks?", false)? {
            return Err(VibeError::Aborted("remove canceled".to_string()));
        }
    }

    let deadline = Instant::now() + BULK_TIMEOUT;
    let mut removed = Vec::new();
    let mut failed = Vec::new();
    for meta in metas {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let stack_paths = ctx.runs.paths(&meta.name);
        if let Err(err) = Compose::new(runner)
            .with_timeout(remaining)
            .down(&meta.name, &stack_paths)
        {
            warn!(stack = %meta.name, error = %err, "failed to stop stack");
        }
        match ctx.runs.delete(&meta.name) {
            Ok(()) => {
                if !ctx.json {
                    println!("Removed stack {}", meta.name);
                }
                removed.push(meta.name);
            }
            Err(err) => {
                warn!(stack = %meta.name, error = %err, "failed to delete stack");
                failed.push(meta.name);
            }
        }
    }
    output(ctx, json!({ "removed": removed, "failed": failed }), || {})
}

fn ensure_interactive(ctx: &Context, command: &str) -> Result<(), VibeError> {
    if ctx.json || !io::stdin().is_terminal() {
        return Err(VibeError::validation(
            "yes",
            format!("`vibecontainer {command}` needs confirmation; re-run with --yes"),
        ));
    }
    Ok(())
}

fn handle_credentials(ctx: &Context, command: CredentialsCommand) -> Result<(), VibeError> {
    match command {
        CredentialsCommand::List => {
            let auth = load_auth(ctx.secrets.as_ref());
            let entries: Vec<serde_json::Value> = AuthField::ALL
                .iter()
                .map(|field| {
                    json!({
                        "key": field.store_key(),
                        "label": field.label(),
                        "stored": auth.has(*field),
                    })
                })
                .collect();
            output(ctx, json!(entries), || {
                println!("Stored credentials:");
                for field in AuthField::ALL {
                    let status = if auth.has(field) {
                        style("stored").green()
                    } else {
                        style("not stored").dim()
                    };
                    println!("  {:<26} {status}", format!("{}:", field.label()));
                }
            })
        }
        CredentialsCommand::Clear => {
            ctx.secrets.clear()?;
            output(ctx, json!({ "cleared": true }), || {
                println!("All stored credentials cleared");
            })
        }
    }
}

fn handle_defaults(ctx: &Context, command: DefaultsCommand) -> Result<(), VibeError> {
    match command {
        DefaultsCommand::Show => {
            let defaults = ctx.defaults.load()?;
            output(ctx, serde_json::to_value(&defaults)?, || {
                println!(
                    "{}",
                    style(format!("Defaults file: {}", ctx.defaults.path().display())).dim()
                );
                println!("provider: {}", defaults.provider);
                println!("readonly_port: {}", defaults.read_only_port);
                println!("exposure: {}", defaults.exposure);
                println!("interactive_port: {}", defaults.interactive_port);
                println!("firewall_enable: {}", defaults.firewall_enable);
                println!("tunnel_enable: {}", defaults.tunnel_enable);
            })
        }
    }
}
