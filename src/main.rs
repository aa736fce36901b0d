use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use env_logger::Env;

use freeslot_lib::calendar_source::GoogleCalendarSource;
use freeslot_lib::config::{self, Config};
use freeslot_lib::google_api::{self, TokenStore};
use freeslot_lib::render::render_text;
use freeslot_lib::services::{AvailabilityService, ScheduleQuery};

/// Free meeting slots for the week ahead.
#[derive(Parser)]
#[command(name = "freeslot")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file (default: $FREESLOT_CONFIG or ~/.freeslot/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve GET /api/free-schedule
    Serve {
        /// Port to listen on (overrides the config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print free slots for the week ahead
    Show {
        /// Weekday indices, 0 = Sunday
        #[arg(long, default_value = "1,2,3,4,5")]
        days: String,

        /// Hour window as start,end
        #[arg(long, default_value = "8,10")]
        hours: String,

        /// Minimum meeting length in minutes
        #[arg(long, default_value = "0")]
        length: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Sign in to Google Calendar and store the token
    Auth,
    /// Delete the stored token
    Logout,
}

struct Paths {
    token: PathBuf,
    credentials: PathBuf,
}

fn resolve_paths(config: &Config, config_file: &std::path::Path) -> anyhow::Result<Paths> {
    // Relative defaults live next to the config file.
    let dir = match config_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => config::config_dir().map_err(anyhow::Error::msg)?,
    };
    Ok(Paths {
        token: config.token_path(&dir),
        credentials: config.credentials_path(&dir),
    })
}

fn build_service(config: &Config, paths: &Paths) -> anyhow::Result<AvailabilityService> {
    let settings = config.settings().map_err(anyhow::Error::msg)?;
    let source = GoogleCalendarSource::new(
        TokenStore::new(&paths.token),
        paths.credentials.clone(),
        config.calendar_id.clone(),
    )
    .with_interactive_auth(config.interactive_auth)
    .with_save_token(config.save_token);

    log::debug!(
        "Calendar {} in {} ({}), {} day horizon",
        config.calendar_id,
        settings.timezone,
        settings.locale,
        settings.horizon_days
    );
    Ok(AvailabilityService::new(Arc::new(source), settings))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config_file = config::config_path(cli.config.as_deref()).map_err(anyhow::Error::msg)?;
    let config = config::load_config(&config_file).map_err(anyhow::Error::msg)?;
    let paths = resolve_paths(&config, &config_file)?;

    match cli.command {
        Command::Serve { port } => {
            let addr = config.bind_addr(port).map_err(anyhow::Error::msg)?;
            let service = build_service(&config, &paths)?;
            freeslot_lib::api::serve(addr, Arc::new(service))
                .await
                .with_context(|| format!("server on {} failed", addr))?;
        }
        Command::Show {
            days,
            hours,
            length,
            json,
        } => {
            let query = ScheduleQuery::parse(&days, &hours, &length)?;
            let service = build_service(&config, &paths)?;
            let schedule = service.compute_schedule(&query).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&schedule)?);
            } else {
                println!("{}", render_text(&schedule));
            }
        }
        Command::Auth => {
            let credentials = google_api::load_credentials(&paths.credentials)?;
            let token = google_api::auth::run_consent_flow(&credentials).await?;
            let store = TokenStore::new(&paths.token);
            store.save(&token)?;
            println!("Token saved to {}", store.path().display());
        }
        Command::Logout => {
            let store = TokenStore::new(&paths.token);
            if !store.exists() {
                println!("No stored token at {}", store.path().display());
                return Ok(());
            }
            store.delete()?;
            println!("Removed {}", store.path().display());
        }
    }

    Ok(())
}
