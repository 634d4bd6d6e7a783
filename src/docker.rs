use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::compose::{escape_env_value, MANAGED_LABEL, STACK_LABEL};
use crate::domain::ServiceStatus;
use crate::error::{ProcessErrorDetails, VibeError};
use crate::paths::StackPaths;

pub const DOCKER_BIN_ENV: &str = "VIBECONTAINER_DOCKER_BIN";
pub const SHORT_TIMEOUT: Duration = Duration::from_secs(60);
pub const BULK_TIMEOUT: Duration = Duration::from_secs(120);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status_code == 0
    }
}

pub trait DockerRunner {
    /// Runs the orchestrator with `args`. With `capture_output` false the
    /// child inherits the terminal. A `timeout` that elapses kills the child
    /// and yields `io::ErrorKind::TimedOut`.
    fn run(
        &self,
        args: &[String],
        capture_output: bool,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, io::Error>;

    /// How the program is shown in rendered commands and error details.
    fn program_name(&self) -> String {
        "docker".to_string()
    }
}

pub struct RealDockerRunner {
    program: PathBuf,
}

impl RealDockerRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `$VIBECONTAINER_DOCKER_BIN`, else `docker` from PATH. When neither
    /// resolves the bare name is kept so spawning reports `docker_not_found`.
    pub fn detect() -> Self {
        if let Ok(path) = env::var(DOCKER_BIN_ENV) {
            if !path.trim().is_empty() {
                return Self::new(path);
            }
        }
        let program = which::which("docker").unwrap_or_else(|_| PathBuf::from("docker"));
        Self::new(program)
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .map(|handle| handle.join().unwrap_or_default())
        .unwrap_or_default()
}

fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .unwrap_or(if status.success() { 0 } else { 1 })
}

impl DockerRunner for RealDockerRunner {
    fn run(
        &self,
        args: &[String],
        capture_output: bool,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, io::Error> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        if capture_output {
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
        }
        let mut child = cmd.spawn()?;
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match timeout {
            None => child.wait()?,
            Some(limit) => {
                let deadline = Instant::now() + limit;
                loop {
                    if let Some(status) = child.try_wait()? {
                        break status;
                    }
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            format!("no exit after {}s", limit.as_secs()),
                        ));
                    }
                    thread::sleep(POLL_INTERVAL);
                }
            }
        };

        Ok(CommandOutput {
            status_code: exit_code(status),
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }
}

/// Shell-style rendering used in logs and error messages.
pub fn render_docker_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .map(escape_env_value)
        .collect::<Vec<_>>()
        .join(" ")
}

fn docker_spawn_error_details(err: &io::Error, command: &str) -> ProcessErrorDetails {
    if err.kind() == io::ErrorKind::NotFound {
        return ProcessErrorDetails {
            error_code: "docker_not_found".to_string(),
            hint: Some(format!(
                "Install Docker and ensure `docker` is on your PATH, or set {DOCKER_BIN_ENV}."
            )),
            command: Some(command.to_string()),
            raw_stderr: None,
        };
    }
    ProcessErrorDetails {
        error_code: "process_command_failed".to_string(),
        hint: None,
        command: Some(command.to_string()),
        raw_stderr: None,
    }
}

pub fn classify_docker_command_failure(stderr: &str) -> (String, Option<String>) {
    let lower = stderr.to_lowercase();

    if lower.contains("unknown command: docker compose")
        || lower.contains("is not a docker command")
        || lower.contains("unknown flag: --env-file")
        || lower.contains("unknown shorthand flag: 'p' in -p")
    {
        return (
            "docker_compose_unavailable".to_string(),
            Some(
                "Docker Compose v2 is required. Install the compose plugin and retry."
                    .to_string(),
            ),
        );
    }

    if lower.contains("cannot connect to the docker daemon")
        || lower.contains("is the docker daemon running")
        || lower.contains("failed to connect to the docker api")
        || lower.contains("error during connect")
    {
        return (
            "docker_daemon_unreachable".to_string(),
            Some(
                "Docker daemon is unreachable. Start Docker Desktop (or dockerd) and retry."
                    .to_string(),
            ),
        );
    }

    if lower.contains("port is already allocated") || lower.contains("address already in use") {
        return (
            "docker_port_conflict".to_string(),
            Some(
                "A terminal port is already in use. Pick another port or stop the conflicting stack."
                    .to_string(),
            ),
        );
    }

    if lower.contains("denied")
        || lower.contains("unauthorized")
        || lower.contains("authentication")
    {
        return (
            "docker_registry_auth".to_string(),
            Some("Authenticate with `docker login ghcr.io` for private images.".to_string()),
        );
    }

    ("process_command_failed".to_string(), None)
}

pub fn execute_docker<R: DockerRunner + ?Sized>(
    runner: &R,
    args: &[String],
    capture_output: bool,
    timeout: Option<Duration>,
) -> Result<CommandOutput, VibeError> {
    let command = render_docker_command(&runner.program_name(), args);
    debug!(%command, "running orchestrator");
    let cmd_output = runner
        .run(args, capture_output, timeout)
        .map_err(|err| {
            if err.kind() == io::ErrorKind::TimedOut {
                return VibeError::Cancelled {
                    command: command.clone(),
                    after: timeout.unwrap_or_default(),
                };
            }
            let details = docker_spawn_error_details(&err, &command);
            VibeError::ProcessDetailed {
                message: format!("failed to run command `{command}`: {err}"),
                details,
            }
        })?;
    if !cmd_output.success() {
        let stderr = String::from_utf8_lossy(&cmd_output.stderr)
            .trim()
            .to_string();
        let (error_code, hint) = classify_docker_command_failure(&stderr);
        let mut message = format!(
            "command failed with status {} while running `{}`",
            cmd_output.status_code, command
        );
        if !stderr.is_empty() {
            message = format!("{message}: {stderr}");
        }
        if let Some(ref hint_message) = hint {
            message = format!("{message}\nHint: {hint_message}");
        }
        return Err(VibeError::ProcessDetailed {
            message,
            details: ProcessErrorDetails {
                error_code,
                hint,
                command: Some(command),
                raw_stderr: if stderr.is_empty() {
                    None
                } else {
                    Some(stderr)
                },
            },
        });
    }
    Ok(cmd_output)
}

/// Compose `ps` and plain `ps --format '{{json .}}'` print either an array,
/// a single object, or one object per line depending on version. All three
/// are normalized to a list; unparseable lines are dropped.
pub fn parse_compose_ps_output(text: &str) -> Vec<serde_json::Value> {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) => match value {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Null => Vec::new(),
            other => vec![other],
        },
        Err(_) => text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect(),
    }
}

/// Docker renders labels as `k1=v1,k2=v2`. Entries without `=` are skipped.
pub fn parse_label_string(raw: &str) -> BTreeMap<String, String> {
    raw.split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedContainer {
    pub name: String,
    pub state: String,
    pub labels: BTreeMap<String, String>,
}

impl ManagedContainer {
    pub fn stack(&self) -> Option<&str> {
        self.labels.get(STACK_LABEL).map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct PsRow {
    #[serde(rename = "Names", default)]
    names: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Labels", default)]
    labels: String,
}

/// Compose operations scoped to one stack's descriptor and env file.
pub struct Compose<'a, R: DockerRunner + ?Sized> {
    runner: &'a R,
    timeout: Duration,
}

impl<'a, R: DockerRunner + ?Sized> Compose<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self {
            runner,
            timeout: SHORT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn args(stack: &str, paths: &StackPaths, cmd: &[&str]) -> Vec<String> {
        let mut args = vec![
            "compose".to_string(),
            "-p".to_string(),
            stack.to_string(),
            "-f".to_string(),
            paths.compose.to_string_lossy().to_string(),
            "--env-file".to_string(),
            paths.env.to_string_lossy().to_string(),
        ];
        args.extend(cmd.iter().map(|part| part.to_string()));
        args
    }

    fn exec(&self, stack: &str, paths: &StackPaths, cmd: &[&str]) -> Result<CommandOutput, VibeError> {
        let args = Self::args(stack, paths, cmd);
        execute_docker(self.runner, &args, true, Some(self.timeout))
    }

    pub fn up(&self, stack: &str, paths: &StackPaths) -> Result<(), VibeError> {
        self.exec(stack, paths, &["up", "-d"]).map(|_| ())
    }

    pub fn stop(&self, stack: &str, paths: &StackPaths) -> Result<(), VibeError> {
        self.exec(stack, paths, &["stop"]).map(|_| ())
    }

    pub fn restart(&self, stack: &str, paths: &StackPaths) -> Result<(), VibeError> {
        self.exec(stack, paths, &["restart"]).map(|_| ())
    }

    pub fn down(&self, stack: &str, paths: &StackPaths) -> Result<(), VibeError> {
        self.exec(stack, paths, &["down", "--remove-orphans"])
            .map(|_| ())
    }

    fn logs_args(stack: &str, paths: &StackPaths, service: Option<&str>, follow: bool) -> Vec<String> {
        let mut cmd = vec!["logs"];
        if follow {
            cmd.push("--follow");
        }
        if let Some(service) = service.filter(|s| !s.trim().is_empty()) {
            cmd.push(service);
        }
        Self::args(stack, paths, &cmd)
    }

    /// Streams logs straight to the terminal. Following has no deadline.
    pub fn logs(
        &self,
        stack: &str,
        paths: &StackPaths,
        service: Option<&str>,
        follow: bool,
    ) -> Result<(), VibeError> {
        let args = Self::logs_args(stack, paths, service, follow);
        let timeout = if follow { None } else { Some(self.timeout) };
        execute_docker(self.runner, &args, false, timeout).map(|_| ())
    }

    /// Collects the current logs instead of streaming them.
    pub fn captured_logs(
        &self,
        stack: &str,
        paths: &StackPaths,
        service: Option<&str>,
    ) -> Result<String, VibeError> {
        let args = Self::logs_args(stack, paths, service, false);
        let output = execute_docker(self.runner, &args, true, Some(self.timeout))?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    pub fn status(&self, stack: &str, paths: &StackPaths) -> Result<Vec<ServiceStatus>, VibeError> {
        let output = self.exec(stack, paths, &["ps", "--format", "json"])?;
        let text = String::from_utf8_lossy(&output.stdout);
        parse_compose_ps_output(text.trim())
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(VibeError::from))
            .collect()
    }

    /// Every container carrying the managed label, across all stacks.
    pub fn list_managed_containers(&self) -> Result<Vec<ManagedContainer>, VibeError> {
        let args = vec![
            "ps".to_string(),
            "-a".to_string(),
            "--filter".to_string(),
            format!("label={MANAGED_LABEL}=true"),
            "--format".to_string(),
            "{{json .}}".to_string(),
        ];
        let output = execute_docker(self.runner, &args, true, Some(self.timeout))?;
        let text = String::from_utf8_lossy(&output.stdout);
        parse_compose_ps_output(text.trim())
            .into_iter()
            .map(|row| -> Result<ManagedContainer, VibeError> {
                let row: PsRow = serde_json::from_value(row)?;
                Ok(ManagedContainer {
                    name: row.names,
                    state: row.state,
                    labels: parse_label_string(&row.labels),
                })
            })
            .collect()
    }
}
