//! Command dispatch: bridges CLI args -> dashboard operations -> output formatting.

pub mod auth;
pub mod bots;
pub mod config_cmd;
pub mod settings;
pub mod util;
pub mod version;

use botdesk_core::Dashboard;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    dashboard: &Dashboard,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Auth(args) => auth::handle(dashboard, args, global).await,
        Command::Bots(args) => bots::handle(dashboard, args, global).await,
        // Local commands are handled before dispatch
        Command::Config(_) | Command::Settings(_) | Command::Version(_) | Command::Completions(_) => {
            unreachable!()
        }
    }
}
