//! Doctor command - verify API credentials and configuration.

use crate::cli::Output;
use crate::config::Settings;
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Blikk Doctor");
    println!();
    println!("Checking API credentials and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("Hosted Services").bold());
    let api_checks = vec![
        check_openai_api_key(),
        check_env_key(
            "DEEPGRAM_API_KEY",
            "Set with: export DEEPGRAM_API_KEY='...'",
        ),
    ];
    for check in &api_checks {
        check.print();
    }
    checks.extend(api_checks);

    println!();

    println!("{}", style("Room Platform").bold());
    let room_checks = check_room_settings(settings);
    for check in &room_checks {
        check.print();
    }
    checks.extend(room_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file();
    config_check.print();
    checks.push(config_check);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before starting the worker.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Blikk is ready to join rooms.");
    }

    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_openai_api_key() -> CheckResult {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if key.starts_with("sk-") && key.len() > 20 => {
            let masked = format!("{}...{}", &key[..7], &key[key.len() - 4..]);
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", masked))
        }
        Ok(key) if key.is_empty() => CheckResult::error(
            "OPENAI_API_KEY",
            "empty",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
        Ok(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        Err(_) => CheckResult::error(
            "OPENAI_API_KEY",
            "not set",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
    }
}

/// Check a generic environment key is present and non-empty.
fn check_env_key(name: &str, hint: &str) -> CheckResult {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => {
            let tail = if value.len() > 4 {
                &value[value.len() - 4..]
            } else {
                ""
            };
            CheckResult::ok(name, &format!("configured (...{})", tail))
        }
        Ok(_) => CheckResult::error(name, "empty", hint),
        Err(_) => CheckResult::error(name, "not set", hint),
    }
}

/// Check the room platform settings.
fn check_room_settings(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    if settings.room.url.is_empty() {
        results.push(CheckResult::error(
            "Room URL",
            "not set",
            "Set LIVEKIT_URL or room.url in the config file",
        ));
    } else {
        results.push(CheckResult::ok("Room URL", &settings.room.url));
    }

    if settings.room.api_key.is_empty() || settings.room.api_secret.is_empty() {
        results.push(CheckResult::error(
            "Room credentials",
            "missing",
            "Set LIVEKIT_API_KEY and LIVEKIT_API_SECRET",
        ));
    } else {
        results.push(CheckResult::ok(
            "Room credentials",
            &format!("api key '{}'", settings.room.api_key),
        ));
    }

    results
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create one at the path shown by: blikk config path",
        )
    }
}
