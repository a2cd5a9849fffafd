use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{error, info};
use macro_dash::{
    commands::{instruments, serve, update_market},
    config::DashboardSettings,
    context::AppContext,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "macro-dash")]
#[command(about = "Macro + market + events dashboard and market snapshot updater")]
struct Cli {
    /// Directory holding the JSON data files (overrides DASHBOARD_DATA_DIR)
    #[arg(long = "data-dir", value_name = "PATH", global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch current market data and rewrite the market snapshot
    UpdateMarket,
    /// Serve the dashboard over HTTP
    Serve {
        /// Interface to bind (overrides DASHBOARD_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides DASHBOARD_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Inspect or edit the configured market instruments
    Instruments {
        #[command(subcommand)]
        action: InstrumentAction,
    },
}

#[derive(Subcommand)]
enum InstrumentAction {
    /// List instruments in display order
    List,
    /// Add an instrument
    Add {
        name: String,
        symbol: String,
        /// Display position (lower first; unset goes last)
        #[arg(long, allow_hyphen_values = true)]
        order: Option<i64>,
    },
    /// Remove an instrument by name
    Remove { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli { data_dir, command } = Cli::parse();

    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut settings = DashboardSettings::from_env()?.with_data_dir(data_dir);
    if let Commands::Serve { host, port } = &command {
        if let Some(host) = host {
            settings.host = host.clone();
        }
        if let Some(port) = port {
            settings.port = *port;
        }
    }
    let app_context = AppContext::new(settings);
    info!("Data directory: {}", app_context.settings().data_dir.display());

    match command {
        Commands::UpdateMarket => {
            if let Err(err) = update_market::run(&app_context).await {
                error!("Market snapshot update failed: {:#}", err);
                return Err(err);
            }
        }
        Commands::Serve { .. } => {
            serve::run(&app_context).await?;
        }
        Commands::Instruments { action } => match action {
            InstrumentAction::List => instruments::list(&app_context)?,
            InstrumentAction::Add {
                name,
                symbol,
                order,
            } => instruments::add(&app_context, &name, &symbol, order)?,
            InstrumentAction::Remove { name } => instruments::remove(&app_context, &name)?,
        },
    }

    Ok(())
}
