use clap::{Parser, Subcommand};

use std::path::PathBuf;

use crate::domain::evals::EvalType;
use crate::domain::pricing::ProviderClass;
use crate::domain::sessions::TimeFilter;

use super::constants::{
    APP_NAME_LOWER, ENV_API_URL, ENV_CONFIG, ENV_HOST, ENV_PORT, ENV_PRELOAD_DIR,
};

#[derive(Parser)]
#[command(name = APP_NAME_LOWER)]
#[command(version, about = "LLM trace analysis workbench", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Directory of session files loaded when the server starts
    #[arg(long, global = true, env = ENV_PRELOAD_DIR)]
    pub preload_dir: Option<PathBuf>,

    /// Account API base URL
    #[arg(long, global = true, env = ENV_API_URL)]
    pub api_url: Option<String>,
}

/// Parse time filter from CLI string
fn parse_time_filter(s: &str) -> Result<TimeFilter, String> {
    s.parse()
}

/// Parse provider class from CLI string
fn parse_provider(s: &str) -> Result<ProviderClass, String> {
    ProviderClass::parse(s).ok_or_else(|| {
        format!(
            "Invalid provider '{}'. Valid options: openai, gemini, anthropic, other",
            s
        )
    })
}

/// Parse evaluation type from CLI string
fn parse_eval_type(s: &str) -> Result<EvalType, String> {
    s.parse()
}

/// Parse a `key=value` label constraint
fn parse_label(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("Invalid label '{}'. Expected key=value", s)),
    }
}

/// Parse a date bound: RFC 3339 or epoch milliseconds
fn parse_date_bound(s: &str) -> Result<i64, String> {
    if let Ok(ms) = s.parse::<i64>() {
        return Ok(ms);
    }
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.timestamp_millis())
        .map_err(|_| {
            format!(
                "Invalid date '{}'. Expected RFC 3339 or epoch milliseconds",
                s
            )
        })
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the HTTP server (default command)
    Serve,
    /// Check session files and report which ones would be accepted
    Validate {
        /// Session files or directories of *.json files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Aggregate cost, token and latency analytics across session files
    Analyze {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Time window: all, 1h, 24h, 7d, 30d or custom
        #[arg(long, value_parser = parse_time_filter)]
        time_filter: Option<TimeFilter>,

        /// Start of a custom date range (RFC 3339 or epoch ms)
        #[arg(long, value_parser = parse_date_bound)]
        from: Option<i64>,

        /// End of a custom date range (RFC 3339 or epoch ms)
        #[arg(long, value_parser = parse_date_bound)]
        to: Option<i64>,

        /// Label constraint, repeatable
        #[arg(long = "label", value_parser = parse_label)]
        labels: Vec<(String, String)>,

        /// Restrict analytics to one provider class
        #[arg(long, value_parser = parse_provider)]
        provider: Option<ProviderClass>,
    },
    /// Summarize evaluations across session files
    Evals {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Only list failed evaluations
        #[arg(long)]
        failed_only: bool,

        /// Only list evaluations of one type
        #[arg(long = "type", value_parser = parse_eval_type)]
        eval_type: Option<EvalType>,
    },
    /// List system and custom labels found in session files
    Labels {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Store an account API token
    Login {
        #[arg(long)]
        token: String,

        #[arg(long)]
        email: Option<String>,
    },
    /// Forget the stored account token
    Logout,
    /// Manage account API keys
    Keys {
        #[command(subcommand)]
        command: KeysCommands,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum KeysCommands {
    /// List API keys
    List,
    /// Create an API key. The secret is printed once.
    Create { name: String },
    /// Revoke an API key
    Revoke { id: String },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub preload_dir: Option<PathBuf>,
    pub api_url: Option<String>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        host: cli.host,
        port: cli.port,
        config: cli.config,
        preload_dir: cli.preload_dir,
        api_url: cli.api_url,
    };
    (config, cli.command)
}
