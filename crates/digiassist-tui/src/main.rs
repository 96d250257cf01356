// DigiAssist: terminal client for the conversational digital-maturity
// diagnostic.
//
// Startup: config -> logging -> HTTP client -> channels -> app task -> TUI.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info};

use digiassist_app::app::{self, AppState};
use digiassist_core::api::{HttpSessionClient, SessionApi, SessionId};
use digiassist_core::config::{self, LoggingConfig};
use digiassist_tui::tui;

#[derive(Parser, Debug)]
#[command(
    name = "digiassist",
    about = "Conversational digital-maturity diagnostic in the terminal",
    version
)]
struct Cli {
    /// Resume an existing session instead of filling in the intake form
    #[arg(long, conflicts_with = "company")]
    session: Option<String>,
    /// Start a session for an already-registered company
    #[arg(long)]
    company: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config().context("failed to load configuration")?;
    init_tracing(&config.logging)?;
    info!(base_url = %config.api.base_url, "DigiAssist starting up");

    let client = HttpSessionClient::from_config(&config).context("failed to build HTTP client")?;
    let api: Arc<dyn SessionApi> = Arc::new(client);

    let (flow_tx, flow_rx) = mpsc::channel(64);
    let (task_tx, task_rx) = mpsc::channel(16);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    let mut app_state = AppState::new(config, api, flow_tx, task_tx);
    // The app loop pushes the full current view on start, so the updates
    // returned here are not needed.
    if let Some(session_id) = cli.session {
        info!(session = %session_id, "resuming session from command line");
        app_state.open_session(SessionId::new(session_id));
    } else if let Some(company_id) = cli.company {
        info!(company = %company_id, "starting session for registered company");
        app_state.open_company(&company_id);
    }

    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, flow_rx, task_rx, ui_tx, app_state).await {
            error!("Application loop error: {:#}", e);
        }
    });

    if let Err(e) = tui::run(ui_rx, cmd_tx).await {
        error!("TUI error: {:#}", e);
    }

    // The TUI dropped its command sender, which ends the app loop.
    let _ = tokio::time::timeout(Duration::from_secs(5), app_handle).await;

    info!("DigiAssist shut down cleanly");
    Ok(())
}

/// Log to a file under the configured directory; the terminal belongs to
/// the TUI.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join(&logging.dir);
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let log_file = std::fs::File::create(log_dir.join("digiassist.log"))
        .context("failed to create log file")?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
