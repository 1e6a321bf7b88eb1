//! Core application

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::api::routes::analytics::AnalyticsResponse;
use crate::api::{ApiServer, AppState};
use crate::client::{AccountClient, AuthSession, FileSessionStore, SessionStore};
use crate::core::cli::{self, CliConfig, Commands, KeysCommands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME, DEFAULT_LOG_FILTER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::domain::analytics::aggregate_sessions;
use crate::domain::evals::{EvalType, IssueFilter, build_report, extract_all_evaluations};
use crate::domain::pricing::{PricingTable, ProviderClass};
use crate::domain::sessions::{
    DateRange, FilterSpec, Session, SessionSet, TimeFilter, discover_labels, filter_sessions,
    validate,
};
use crate::utils::file::{collect_json_files, display_name, read_json_file};

pub struct CoreApp {
    pub config: AppConfig,
    pub shutdown: ShutdownService,
    pub state: AppState,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::Serve) | None => {
                let app = Self::init(&cli_config)?;
                Self::start_server(app).await
            }
            Some(Commands::Validate { files }) => Self::validate_command(&files),
            Some(Commands::Analyze {
                files,
                time_filter,
                from,
                to,
                labels,
                provider,
            }) => {
                let config = AppConfig::load(&cli_config)?;
                let filter = build_filter(time_filter, from, to, &labels);
                Self::analyze_command(&config, &files, &filter, provider)
            }
            Some(Commands::Evals {
                files,
                failed_only,
                eval_type,
            }) => Self::evals_command(&files, failed_only, eval_type),
            Some(Commands::Labels { files }) => {
                let sessions = load_sessions(&files)?;
                print_json(&discover_labels(&sessions))
            }
            Some(Commands::Login { token, email }) => {
                let config = AppConfig::load(&cli_config)?;
                Self::login_command(&config, token, email)
            }
            Some(Commands::Logout) => {
                let config = AppConfig::load(&cli_config)?;
                let store = FileSessionStore::new(&config.account.session_file);
                store.clear()?;
                println!("Logged out");
                Ok(())
            }
            Some(Commands::Keys { command }) => {
                let config = AppConfig::load(&cli_config)?;
                Self::keys_command(&config, command).await
            }
        }
    }

    fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        let pricing = PricingTable::with_overrides(&config.pricing.models);
        let sessions = SessionSet::new();

        if let Some(dir) = &config.sessions.preload_dir {
            let count = preload(&sessions, dir)?;
            tracing::info!(dir = %dir.display(), count, "Preloaded sessions");
        }

        Ok(Self {
            state: AppState::new(sessions, pricing),
            shutdown: ShutdownService::new(),
            config,
        })
    }

    fn init_logging() {
        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        // Logs go to stderr so command output on stdout stays parseable
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        app.shutdown.install_signal_handlers();

        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            sessions = app.state.sessions.len(),
            "{} starting",
            APP_NAME
        );

        let Self {
            config,
            shutdown,
            state,
        } = app;
        ApiServer::new(state, config, shutdown).start().await
    }

    // ========================================================================
    // COMMANDS
    // ========================================================================

    fn validate_command(paths: &[PathBuf]) -> Result<()> {
        let results = validate_paths(paths)?;
        print_json(&results)?;

        let failed = results.iter().filter(|r| !r.valid).count();
        if failed > 0 {
            anyhow::bail!("{} of {} files failed validation", failed, results.len());
        }
        Ok(())
    }

    fn analyze_command(
        config: &AppConfig,
        paths: &[PathBuf],
        filter: &FilterSpec,
        provider: Option<ProviderClass>,
    ) -> Result<()> {
        let pricing = PricingTable::with_overrides(&config.pricing.models);
        let sessions = load_sessions(paths)?;
        let selected = filter_sessions(&sessions, filter, Utc::now().timestamp_millis());

        print_json(&AnalyticsResponse {
            session_count: selected.len(),
            summary: aggregate_sessions(&selected, provider, &pricing),
        })
    }

    fn evals_command(
        paths: &[PathBuf],
        failed_only: bool,
        eval_type: Option<EvalType>,
    ) -> Result<()> {
        let sessions = load_sessions(paths)?;
        let records = extract_all_evaluations(&sessions);
        let filter = IssueFilter {
            failed_only,
            eval_type,
        };
        print_json(&build_report(&records, &filter))
    }

    fn login_command(config: &AppConfig, token: String, email: Option<String>) -> Result<()> {
        let token = token.trim().to_string();
        if token.is_empty() {
            anyhow::bail!("Token must not be empty");
        }

        let store = FileSessionStore::new(&config.account.session_file);
        let mut session = AuthSession::new(token);
        session.email = email;
        store.set(&session)?;

        println!("Logged in. Session saved to {}", store.path().display());
        Ok(())
    }

    async fn keys_command(config: &AppConfig, command: KeysCommands) -> Result<()> {
        let store: Arc<dyn SessionStore> =
            Arc::new(FileSessionStore::new(&config.account.session_file));
        let client = AccountClient::new(&config.account.api_url, store)?;

        match command {
            KeysCommands::List => print_json(&client.list_api_keys().await?),
            KeysCommands::Create { name } => {
                let created = client.create_api_key(&name).await?;
                print_json(&created)?;
                if created.secret.is_some() {
                    eprintln!("Store this key now. It will not be shown again.");
                }
                Ok(())
            }
            KeysCommands::Revoke { id } => {
                client.revoke_api_key(&id).await?;
                println!("Revoked API key {}", id);
                Ok(())
            }
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Per-file result of the `validate` command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileValidation {
    file: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn validate_paths(paths: &[PathBuf]) -> Result<Vec<FileValidation>> {
    let files = collect_json_files(paths)?;
    let results = files
        .iter()
        .map(|path| {
            let file = display_name(path);
            match read_json_file(path) {
                Ok(data) => {
                    let validation = validate(&data, &file);
                    FileValidation {
                        file,
                        valid: validation.valid,
                        error: validation.error,
                    }
                }
                Err(e) => FileValidation {
                    file,
                    valid: false,
                    error: Some(format!("{:#}", e)),
                },
            }
        })
        .collect();
    Ok(results)
}

/// Load every accepted session under `paths`. Rejected or unreadable files
/// are logged and skipped.
fn load_sessions(paths: &[PathBuf]) -> Result<Vec<Session>> {
    let files = collect_json_files(paths)?;
    let mut sessions = Vec::with_capacity(files.len());

    for path in &files {
        let loaded = std::fs::read(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))
            .and_then(|bytes| {
                Session::from_slice(display_name(path), &bytes, Utc::now()).map_err(Into::into)
            });
        match loaded {
            Ok(session) => sessions.push(session),
            Err(e) => tracing::warn!(
                file = %path.display(),
                error = %format!("{:#}", e),
                "Skipping session file"
            ),
        }
    }

    tracing::debug!(
        files = files.len(),
        loaded = sessions.len(),
        "Loaded session files"
    );
    Ok(sessions)
}

/// Load a directory of session files into the shared set.
fn preload(set: &SessionSet, dir: &Path) -> Result<usize> {
    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "Preload directory does not exist, skipping");
        return Ok(0);
    }
    let sessions = load_sessions(&[dir.to_path_buf()])?;
    let count = sessions.len();
    for session in sessions {
        set.insert(session);
    }
    Ok(count)
}

/// Session filter built from `analyze` flags. A `--from`/`--to` bound without an
/// explicit time filter selects the custom range.
fn build_filter(
    time_filter: Option<TimeFilter>,
    from: Option<i64>,
    to: Option<i64>,
    labels: &[(String, String)],
) -> FilterSpec {
    let custom_date_range = (from.is_some() || to.is_some()).then(|| DateRange {
        start: from.unwrap_or(i64::MIN),
        end: to.unwrap_or(i64::MAX),
    });
    let time_filter = time_filter.unwrap_or(if custom_date_range.is_some() {
        TimeFilter::Custom
    } else {
        TimeFilter::All
    });

    let mut grouped: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (key, value) in labels {
        grouped.entry(key.clone()).or_default().insert(value.clone());
    }

    FilterSpec {
        labels: grouped,
        time_filter,
        custom_date_range,
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
