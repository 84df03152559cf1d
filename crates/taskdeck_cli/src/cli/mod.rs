use clap::{Args, Parser, Subcommand};
use taskdeck_core::config::ConfigOverrides;
use taskdeck_core::error::AppError;

#[derive(Parser, Debug)]
#[command(name = "taskdeck", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and store the session token
    ///
    /// Example: taskdeck login --email ada@example.com --password secret1
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    ///
    /// Example: taskdeck register --user-name ada --email ada@example.com --password secret1 --agree-terms
    Register {
        #[arg(long = "user-name")]
        user_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Accept the terms and conditions
        #[arg(long = "agree-terms")]
        agree_terms: bool,
    },
    /// Forget the stored session token
    Logout,
    /// Show who is signed in
    Whoami,
    /// List tasks
    ///
    /// Example: taskdeck list --search milk --status all --priority high
    List(ListArgs),
    /// Add a new task
    ///
    /// Example: taskdeck add "Buy milk" --due 2025-03-31 --priority high
    Add {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Start date (YYYY-MM-DD)
        #[arg(long, default_value = "")]
        start: String,
        /// Due date (YYYY-MM-DD)
        #[arg(long, default_value = "")]
        due: String,
        /// LOW, MEDIUM, HIGH or URGENT (defaults to LOW)
        #[arg(long)]
        priority: Option<String>,
    },
    /// Toggle a task between completed and pending
    ///
    /// Example: taskdeck done 64f0c2
    Done { id: String },
    /// Change fields of a task
    ///
    /// Example: taskdeck edit 64f0c2 --title "Buy oat milk" --status in_progress
    Edit(EditArgs),
    /// Delete a task
    ///
    /// Example: taskdeck delete 64f0c2 --yes
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Case-insensitive match on title or description
    #[arg(long)]
    pub search: Option<String>,
    /// PENDING, IN_PROGRESS, COMPLETED, CANCELED or ALL (defaults to PENDING)
    #[arg(long)]
    pub status: Option<String>,
    /// LOW, MEDIUM, HIGH, URGENT or ALL
    #[arg(long)]
    pub priority: Option<String>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub priority: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
    /// Start date (YYYY-MM-DD, empty to clear)
    #[arg(long)]
    pub start: Option<String>,
    /// Due date (YYYY-MM-DD, empty to clear)
    #[arg(long)]
    pub due: Option<String>,
}

/// One line typed into the interactive session.
#[derive(Parser, Debug)]
#[command(name = "taskdeck", no_binary_name = true, disable_help_subcommand = true)]
pub struct ReplLine {
    #[command(subcommand)]
    pub command: ReplCommand,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum ReplCommand {
    #[command(flatten)]
    Task(Command),
    /// Filter the current view by text (no argument clears it)
    Search { term: Vec<String> },
    /// Filter the current view by status
    Status { filter: String },
    /// Filter the current view by priority
    Priority { filter: String },
    /// Redraw the current view
    Show,
    /// Re-fetch tasks from the server
    Refresh,
    /// Open or close the action menu of a task
    Menu { id: String },
    /// Delete the task awaiting confirmation
    Confirm,
    /// Keep the task awaiting confirmation
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    ApiUrl,
    CookieTtlDays,
    DesktopNotifications,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let canonical_field = canonicalize_flag_name(key_raw)
        .ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match canonical_field.as_str() {
        "api_url" | "url" => ConfigOverrideTarget::ApiUrl,
        "cookie_ttl_days" | "cookie_ttl" => ConfigOverrideTarget::CookieTtlDays,
        "desktop_notifications" | "notifications" => ConfigOverrideTarget::DesktopNotifications,
        other => return Err(format!("unknown config field '{other}'")),
    };

    if value.is_empty() {
        return Err(format!("override '{canonical_field}' needs a value"));
    }
    Ok(ParsedConfigOverride { target, value })
}

pub fn collect_config_overrides(raw: &[String]) -> Result<ConfigOverrides, AppError> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry).map_err(AppError::invalid_input)?;
        match parsed.target {
            ConfigOverrideTarget::ApiUrl => overrides.api_url = Some(parsed.value),
            ConfigOverrideTarget::CookieTtlDays => {
                let days = parsed
                    .value
                    .parse::<u32>()
                    .ok()
                    .filter(|days| *days > 0)
                    .ok_or_else(|| {
                        AppError::invalid_input("cookie_ttl_days must be a positive number")
                    })?;
                overrides.cookie_ttl_days = Some(days);
            }
            ConfigOverrideTarget::DesktopNotifications => {
                overrides.desktop_notifications = Some(parse_switch(&parsed.value)?);
            }
        }
    }
    Ok(overrides)
}

fn parse_switch(raw: &str) -> Result<bool, AppError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::invalid_input(format!(
            "expected true or false, got '{raw}'"
        ))),
    }
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Splits an interactive line into arguments. Double quotes group words;
/// inside quotes `\"` and `\\` are escapes.
pub fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            quoted = true;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() || quoted {
                args.push(std::mem::take(&mut current));
                quoted = false;
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() || quoted {
        args.push(current);
    }

    Ok(args)
}

pub fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}
