//! Command line definitions for the `bloodbridge` binary.

use std::path::PathBuf;

use bloodbridge_core::models::{BloodGroup, Role, Urgency};
use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};

#[derive(Parser)]
#[command(
    name = "bloodbridge",
    version,
    about = "Blood Bridge - emergency blood donation coordination demo",
    long_about = "Drive the Blood Bridge demo store from the terminal.\n\n\
                  State is kept in a local snapshot between runs, so a request\n\
                  broadcast as admin can be accepted as donor in the next command."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Directory holding the state snapshot.
    #[arg(long = "data-dir", value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Keep state in memory only for this run.
    #[arg(long = "no-persist", global = true)]
    pub no_persist: bool,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show role, profile, requests, inventory and notifications.
    Status,

    /// Sign in as donor or admin.
    Role {
        #[arg(value_name = "ROLE")]
        role: Role,
    },

    /// Complete donor verification.
    OnboardDonor(OnboardDonorArgs),

    /// Change a verified donor's name, phone, blood group or location.
    EditProfile(EditProfileArgs),

    /// Complete hospital admin verification.
    OnboardAdmin(OnboardAdminArgs),

    /// Broadcast an emergency request (admin).
    Broadcast(BroadcastArgs),

    /// Accept a pending request as the signed-in donor.
    Accept { id: String },

    /// Decline a pending request.
    Decline { id: String },

    /// Move an accepted request to its next stage (admin).
    Advance { id: String },

    /// Dismiss a notification.
    Dismiss { id: String },

    /// Run the scripted end-to-end demo in real time.
    Demo,

    /// Interactive session: type commands while timers keep running.
    Console,

    /// Sign out and restore seed requests.
    Reset,
}

#[derive(Args)]
pub struct OnboardDonorArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub phone: String,

    #[arg(long = "blood-group", value_name = "GROUP")]
    pub blood_group: BloodGroup,

    #[arg(long)]
    pub location: Option<String>,
}

#[derive(Args)]
pub struct EditProfileArgs {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,

    #[arg(long = "blood-group", value_name = "GROUP")]
    pub blood_group: Option<BloodGroup>,

    #[arg(long)]
    pub location: Option<String>,
}

#[derive(Args)]
pub struct OnboardAdminArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub hospital: String,

    #[arg(long = "admin-id", value_name = "ID")]
    pub admin_id: String,
}

#[derive(Args)]
pub struct BroadcastArgs {
    #[arg(long = "blood-type", value_name = "GROUP")]
    pub blood_type: BloodGroup,

    #[arg(long, default_value_t = 1)]
    pub units: u32,

    #[arg(long, default_value = "")]
    pub hospital: String,

    #[arg(long, default_value = "")]
    pub location: String,

    #[arg(long, default_value = "Normal")]
    pub urgency: Urgency,
}
