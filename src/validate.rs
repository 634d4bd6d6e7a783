use regex::Regex;
use serde_json::Value;
use std::fs;
use std::sync::OnceLock;

use crate::domain::{CreateOptions, Provider};
use crate::error::VibeError;

const AUTH_MODES: [&str; 3] = ["apikey", "chatgpt", "chatgptAuthTokens"];
const TOKEN_KEYS: [&str; 3] = ["id_token", "access_token", "refresh_token"];

fn stack_name_re() -> Result<&'static Regex, VibeError> {
    static RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9-]{0,29}[a-z0-9]$"))
        .as_ref()
        .map_err(|err| VibeError::Structural(format!("stack name pattern: {err}")))
}

pub fn stack_name(name: &str) -> Result<(), VibeError> {
    if !stack_name_re()?.is_match(name) {
        return Err(VibeError::validation(
            "name",
            "name must be 2-31 chars, start and end with alphanumeric, and contain only lowercase alphanumeric or hyphens",
        ));
    }
    Ok(())
}

pub fn port(field: &'static str, value: u16) -> Result<(), VibeError> {
    // u16 already caps the upper bound; zero means "unset".
    if value == 0 {
        return Err(VibeError::validation(
            field,
            format!("{field} must be between 1 and 65535"),
        ));
    }
    Ok(())
}

/// Checks a full create request. Rules run in a fixed order and the first
/// failure is returned.
pub fn create_options(opts: &CreateOptions) -> Result<(), VibeError> {
    stack_name(&opts.name)?;

    if opts.has_workspace() {
        let meta = fs::metadata(&opts.workspace_path).map_err(|err| {
            VibeError::validation("workspace", format!("workspace path is invalid: {err}"))
        })?;
        if !meta.is_dir() {
            return Err(VibeError::validation(
                "workspace",
                "workspace path must be a directory",
            ));
        }
    }

    if opts.exposure.exposes_read_only() {
        port("readonly port", opts.read_only_port)?;
    }
    if opts.exposure.exposes_interactive() {
        port("interactive port", opts.interactive_port)?;
        if opts.read_only_port == opts.interactive_port {
            return Err(VibeError::validation(
                "interactive port",
                "readonly and interactive ports must differ",
            ));
        }
    }

    if !opts.ttyd_credential.is_empty()
        && (opts.ttyd_credential.chars().any(char::is_whitespace)
            || !opts.ttyd_credential.contains(':'))
    {
        return Err(VibeError::validation(
            "ttyd credential",
            "ttyd credential must be in user:password format and contain no spaces",
        ));
    }

    if opts.tunnel_enable && opts.auth.tunnel_token.trim().is_empty() {
        return Err(VibeError::validation(
            "tunnel token",
            "tunnel token is required when tunnel is enabled",
        ));
    }

    provider_auth(opts)
}

fn provider_auth(opts: &CreateOptions) -> Result<(), VibeError> {
    let auth = &opts.auth;
    match opts.provider {
        Provider::Base => Ok(()),
        Provider::Claude => {
            if auth.claude_oauth_token.trim().is_empty() && auth.anthropic_api_key.trim().is_empty()
            {
                return Err(VibeError::validation(
                    "auth",
                    "claude requires CLAUDE_CODE_OAUTH_TOKEN or ANTHROPIC_API_KEY",
                ));
            }
            Ok(())
        }
        Provider::Codex => {
            if !auth.codex_auth_json.trim().is_empty() {
                return codex_auth_json(&auth.codex_auth_json);
            }
            if auth.openai_api_key.trim().is_empty() && auth.codex_api_key.trim().is_empty() {
                return Err(VibeError::validation(
                    "auth",
                    "codex requires CODEX_AUTH_JSON or OPENAI_API_KEY or CODEX_API_KEY",
                ));
            }
            Ok(())
        }
    }
}

/// Structural check of a Codex `auth.json` payload.
pub fn codex_auth_json(payload: &str) -> Result<(), VibeError> {
    let parsed: Value = serde_json::from_str(payload)
        .map_err(|err| VibeError::Structural(format!("codex auth json is invalid: {err}")))?;
    let object = match parsed.as_object() {
        Some(object) if !object.is_empty() => object,
        _ => {
            return Err(VibeError::Structural(
                "codex auth json must be a non-empty object".to_string(),
            ))
        }
    };

    if let Some(mode) = object.get("auth_mode") {
        let Some(mode) = mode.as_str() else {
            return Err(VibeError::Structural(
                "codex auth json auth_mode must be a string".to_string(),
            ));
        };
        if !AUTH_MODES.contains(&mode) {
            return Err(VibeError::Structural(format!(
                "codex auth json auth_mode must be one of: {}",
                AUTH_MODES.join(", ")
            )));
        }
    }

    if let Some(key) = object.get("OPENAI_API_KEY").and_then(Value::as_str) {
        if !key.trim().is_empty() {
            return Ok(());
        }
    }

    let Some(tokens) = object.get("tokens").and_then(Value::as_object) else {
        return Err(VibeError::Structural(
            "codex auth json must include OPENAI_API_KEY or tokens object".to_string(),
        ));
    };
    for key in TOKEN_KEYS {
        if !tokens.get(key).is_some_and(Value::is_string) {
            return Err(VibeError::Structural(format!(
                "codex auth json tokens.{key} must be a string"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Auth, ExposureMode};
    use tempfile::tempdir;

    fn base_options(name: &str) -> CreateOptions {
        CreateOptions {
            name: name.to_string(),
            workspace_path: String::new(),
            provider: Provider::Base,
            image: String::new(),
            read_only_port: 7681,
            exposure: ExposureMode::Read,
            interactive_port: 7682,
            ttyd_credential: String::new(),
            firewall_enable: true,
            tunnel_enable: false,
            auth: Auth::default(),
        }
    }

    fn failing_field(opts: &CreateOptions) -> &'static str {
        match create_options(opts) {
            Err(VibeError::Validation { field, .. }) => field,
            Err(VibeError::Structural(_)) => "structural",
            other => panic!("expected a validation failure, got {other:?}"),
        }
    }

    #[test]
    fn accepts_valid_names() {
        let longest = "a".repeat(31);
        for name in ["ab", "a1", "demo-stack", "x-y-z", "0day", longest.as_str()] {
            assert!(create_options(&base_options(name)).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_invalid_names() {
        let too_long = "a".repeat(32);
        for name in [
            "a",
            "",
            "my-stack-",
            "-stack",
            "Upper",
            "under_score",
            "dot.name",
            too_long.as_str(),
        ] {
            assert_eq!(failing_field(&base_options(name)), "name", "{name}");
        }
    }

    #[test]
    fn workspace_must_be_an_existing_directory() {
        let dir = tempdir().unwrap();
        let mut opts = base_options("demo");
        opts.workspace_path = dir.path().join("missing").to_string_lossy().to_string();
        assert_eq!(failing_field(&opts), "workspace");

        let file = dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        opts.workspace_path = file.to_string_lossy().to_string();
        assert_eq!(failing_field(&opts), "workspace");

        opts.workspace_path = dir.path().to_string_lossy().to_string();
        assert!(create_options(&opts).is_ok());
    }

    #[test]
    fn exposure_none_ignores_ports() {
        let mut opts = base_options("demo");
        opts.exposure = ExposureMode::None;
        opts.read_only_port = 0;
        opts.interactive_port = 0;
        assert!(create_options(&opts).is_ok());
    }

    #[test]
    fn exposure_read_requires_read_only_port() {
        let mut opts = base_options("demo");
        opts.read_only_port = 0;
        opts.interactive_port = 0;
        assert_eq!(failing_field(&opts), "readonly port");
    }

    #[test]
    fn exposure_write_requires_distinct_ports() {
        let mut opts = base_options("demo");
        opts.exposure = ExposureMode::Write;
        opts.interactive_port = 0;
        assert_eq!(failing_field(&opts), "interactive port");
        opts.interactive_port = opts.read_only_port;
        assert_eq!(failing_field(&opts), "interactive port");
        opts.interactive_port = 9002;
        assert!(create_options(&opts).is_ok());
    }

    #[test]
    fn ttyd_credential_format() {
        let mut opts = base_options("demo");
        opts.ttyd_credential = "user pass:word".to_string();
        assert_eq!(failing_field(&opts), "ttyd credential");
        opts.ttyd_credential = "userpassword".to_string();
        assert_eq!(failing_field(&opts), "ttyd credential");
        opts.ttyd_credential = "user:password".to_string();
        assert!(create_options(&opts).is_ok());
    }

    #[test]
    fn tunnel_needs_token() {
        let mut opts = base_options("demo");
        opts.tunnel_enable = true;
        opts.auth.tunnel_token = "   ".to_string();
        assert_eq!(failing_field(&opts), "tunnel token");
        opts.auth.tunnel_token = "abc".to_string();
        assert!(create_options(&opts).is_ok());
    }

    #[test]
    fn provider_specific_credentials() {
        let mut opts = base_options("demo");
        assert!(create_options(&opts).is_ok());

        opts.provider = Provider::Claude;
        assert_eq!(failing_field(&opts), "auth");
        opts.auth.anthropic_api_key = "sk-ant".to_string();
        assert!(create_options(&opts).is_ok());
        opts.auth = Auth {
            claude_oauth_token: "oauth".to_string(),
            ..Auth::default()
        };
        assert!(create_options(&opts).is_ok());

        opts.provider = Provider::Codex;
        opts.auth = Auth::default();
        assert_eq!(failing_field(&opts), "auth");
        opts.auth.codex_api_key = "ck".to_string();
        assert!(create_options(&opts).is_ok());
        opts.auth = Auth {
            openai_api_key: "sk-123".to_string(),
            ..Auth::default()
        };
        assert!(create_options(&opts).is_ok());
    }

    #[test]
    fn codex_auth_json_takes_precedence_over_keys() {
        let mut opts = base_options("demo");
        opts.provider = Provider::Codex;
        opts.auth.openai_api_key = "sk-123".to_string();
        opts.auth.codex_auth_json = "{not json".to_string();
        assert_eq!(failing_field(&opts), "structural");
    }

    #[test]
    fn name_is_checked_before_anything_else() {
        let mut opts = base_options("bad_name");
        opts.provider = Provider::Claude;
        opts.tunnel_enable = true;
        assert_eq!(failing_field(&opts), "name");
    }

    #[test]
    fn auth_json_accepts_api_key_shape() {
        assert!(codex_auth_json(r#"{"OPENAI_API_KEY":"sk-1"}"#).is_ok());
        assert!(codex_auth_json(r#"{"auth_mode":"apikey","OPENAI_API_KEY":"sk-1"}"#).is_ok());
    }

    #[test]
    fn auth_json_accepts_token_shape() {
        let payload = r#"{"auth_mode":"chatgpt","tokens":{"id_token":"a","access_token":"b","refresh_token":"c"}}"#;
        assert!(codex_auth_json(payload).is_ok());
    }

    #[test]
    fn auth_json_rejects_bad_payloads() {
        let cases = [
            ("[]", "non-empty object"),
            ("{}", "non-empty object"),
            ("nope", "is invalid"),
            (r#"{"auth_mode":1,"OPENAI_API_KEY":"k"}"#, "must be a string"),
            (r#"{"auth_mode":"magic","OPENAI_API_KEY":"k"}"#, "must be one of"),
            (r#"{"OPENAI_API_KEY":"  "}"#, "tokens object"),
            (
                r#"{"tokens":{"id_token":"a","access_token":2,"refresh_token":"c"}}"#,
                "tokens.access_token",
            ),
            (r#"{"tokens":{"access_token":"b"}}"#, "tokens.id_token"),
        ];
        for (payload, expected) in cases {
            let err = codex_auth_json(payload).expect_err(payload).to_string();
            assert!(err.contains(expected), "{payload}: {err}");
        }
    }
}
