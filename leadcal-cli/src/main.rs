mod app;
mod commands;
mod logging;
mod loopback;
mod render;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::App;

#[derive(Parser)]
#[command(name = "leadcal")]
#[command(about = "Connect the leadcal CRM to Google Calendar and keep it in sync")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in to the leadcal backend
    Login {
        /// Account email (prompted for when omitted)
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Forget the stored backend session
    Logout,
    /// Show the signed-in user and the Google Calendar connection
    Status,
    /// Connect a Google Calendar account through the browser
    Connect,
    /// Pull changes from the selected calendars
    Sync,
    /// List Google calendars, or change which ones are synced
    Calendars {
        /// Calendar ids to sync (replaces the current selection)
        #[arg(long, num_args = 1..)]
        select: Option<Vec<String>>,

        /// Calendar id new events are created in
        #[arg(long)]
        default: Option<String>,
    },
    /// Show events cached by previous syncs
    Events,
    /// Revoke Google access and delete all synced data
    Disconnect,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_subscriber();

    let cli = Cli::parse();
    let app = App::load()?;

    match cli.command {
        Commands::Login { email } => commands::login::run(&app, email).await,
        Commands::Logout => commands::logout::run(&app).await,
        Commands::Status => commands::status::run(&app).await,
        Commands::Connect => commands::connect::run(&app).await,
        Commands::Sync => commands::sync::run(&app).await,
        Commands::Calendars { select, default } => {
            commands::calendars::run(&app, select, default).await
        }
        Commands::Events => commands::events::run(&app).await,
        Commands::Disconnect => commands::disconnect::run(&app).await,
    }
}
