//! Shared helpers for command handlers.

use std::future::Future;
use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use botdesk_core::{Dashboard, EntityId};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, global: &GlobalOpts) -> Result<bool, CliError> {
    if global.yes {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Await `fut` behind a spinner when stderr is an interactive terminal.
pub async fn with_spinner<T>(message: &str, global: &GlobalOpts, fut: impl Future<Output = T>) -> T {
    if global.quiet || !std::io::stderr().is_terminal() {
        return fut.await;
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(Duration::from_millis(80));
    let out = fut.await;
    spinner.finish_and_clear();
    out
}

/// Print pending notifications to stderr and mark them read.
pub fn flush_notifications(dashboard: &Dashboard, global: &GlobalOpts) {
    let center = dashboard.notifications();
    output::print_notifications(
        &center.snapshot(),
        global.quiet,
        output::should_color(global.color),
    );
    center.mark_all_read();
}

/// Parse bot IDs from positional arguments, rejecting blanks.
pub fn parse_ids(raw: &[String]) -> Result<Vec<EntityId>, CliError> {
    raw.iter()
        .map(|id| {
            let id = id.trim();
            if id.is_empty() {
                Err(CliError::Validation {
                    field: "id".into(),
                    reason: "bot IDs cannot be empty".into(),
                })
            } else {
                Ok(EntityId::from(id))
            }
        })
        .collect()
}

/// Parse a humantime duration flag such as `300ms` or `5m`.
pub fn parse_duration(field: &str, raw: &str) -> Result<Duration, CliError> {
    humantime::parse_duration(raw).map_err(|e| CliError::Validation {
        field: field.into(),
        reason: format!("'{raw}' is not a duration: {e}"),
    })
}
