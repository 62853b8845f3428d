mod app;
mod cli;
mod console;
mod format;
mod logging;
mod render;

use anyhow::Result;
use bloodbridge_core::models::NewRequest;
use bloodbridge_core::Config;
use clap::Parser;
use tracing::{info, warn};

use crate::app::{Action, App, HOSPITAL_COORDINATES};
use crate::cli::{Cli, Command};

fn into_action(command: Command) -> Option<Action> {
    let action = match command {
        Command::Status => Action::Status,
        Command::Role { role } => Action::Role(role),
        Command::OnboardDonor(args) => Action::OnboardDonor {
            name: args.name,
            phone: args.phone,
            blood_group: args.blood_group,
            location: args.location,
        },
        Command::EditProfile(args) => Action::EditProfile {
            name: args.name,
            phone: args.phone,
            blood_group: args.blood_group,
            location: args.location,
        },
        Command::OnboardAdmin(args) => Action::OnboardAdmin {
            name: args.name,
            hospital: args.hospital,
            admin_id: args.admin_id,
        },
        Command::Broadcast(args) => Action::Broadcast(NewRequest {
            blood_type: args.blood_type,
            units: args.units,
            hospital: args.hospital,
            location: args.location,
            coordinates: HOSPITAL_COORDINATES,
            urgency: args.urgency,
        }),
        Command::Accept { id } => Action::Accept(id),
        Command::Decline { id } => Action::Decline(id),
        Command::Advance { id } => Action::Advance(id),
        Command::Dismiss { id } => Action::Dismiss(id),
        Command::Reset => Action::Reset,
        Command::Demo | Command::Console => return None,
    };
    Some(action)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let (mut config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    config.apply_env();
    if let Some(dir) = cli.data_dir.clone() {
        config.data_dir = Some(dir);
    }
    if let Some(file) = cli.log_file.clone() {
        config.log_file = Some(file);
    }
    if cli.no_persist {
        config.persist = false;
    }

    // Held until exit so buffered file logs are flushed
    let _log_guard = logging::init_tracing(&cli.verbosity, config.log_file.as_deref())?;
    if let Some(e) = config_error {
        warn!(error = %e, "Failed to load config, using defaults");
    }
    info!(persist = config.persist, "Blood Bridge starting");

    let mut app = App::open(&config)?;
    app.store_mut().subscribe(render::print_event);

    match cli.command {
        Command::Demo => console::run_demo(&mut app).await?,
        Command::Console => console::run(&mut app).await?,
        command => {
            if let Some(action) = into_action(command) {
                if let Some(output) = app.execute(action)? {
                    println!("{}", output);
                }
            }
        }
    }

    Ok(())
}
