mod agent_commands;
mod app;
mod history_commands;
mod integration_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
    vigil_agents::Platform,
    vigil_common::JobType,
};

use crate::{
    agent_commands::{Switch, TriggerAction},
    app::App,
    history_commands::HistoryAction,
};

#[derive(Parser)]
#[command(name = "vigil", about = "Vigil, an autonomous prayer-content agent")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in ./ and ~/.config/vigil/).
    #[arg(long, global = true, env = "VIGIL_CONFIG")]
    config: Option<PathBuf>,

    /// Custom data directory (overrides config and the platform default).
    #[arg(long, global = true, env = "VIGIL_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler until Ctrl-C (default when no subcommand is provided).
    Run,
    /// Show track settings and the next scheduled jobs.
    Status,
    /// Enable or disable a track.
    Track {
        job_type: JobType,
        #[arg(value_enum)]
        switch: Switch,
    },
    /// Set how many daily slots a track uses.
    Cadence { job_type: JobType, cadence: u8 },
    /// Run a job immediately, outside the schedule.
    Trigger {
        #[command(subcommand)]
        action: TriggerAction,
    },
    /// Produced kits.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Connect a publishing platform.
    Connect { platform: Platform },
    /// Disconnect a publishing platform.
    Disconnect { platform: Platform },
    /// Show publishing platform connections.
    Integrations,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "vigil starting");

    let app = App::load(cli.config.as_deref(), cli.data_dir.as_deref())?;

    match cli.command {
        None | Some(Commands::Run) => agent_commands::run(&app).await,
        Some(Commands::Status) => agent_commands::status(&app).await,
        Some(Commands::Track { job_type, switch }) => {
            agent_commands::set_track(&app, job_type, switch).await
        },
        Some(Commands::Cadence { job_type, cadence }) => {
            agent_commands::set_cadence(&app, job_type, cadence).await
        },
        Some(Commands::Trigger { action }) => agent_commands::trigger(&app, action).await,
        Some(Commands::History { action }) => {
            history_commands::handle_history(&app, action).await
        },
        Some(Commands::Connect { platform }) => integration_commands::connect(&app, platform).await,
        Some(Commands::Disconnect { platform }) => {
            integration_commands::disconnect(&app, platform).await
        },
        Some(Commands::Integrations) => integration_commands::list(&app).await,
    }
}
