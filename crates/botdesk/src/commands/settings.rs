//! Settings command handlers.

use serde::Serialize;

use botdesk_core::{AppSettings, SettingsStore};

use crate::cli::{GlobalOpts, SettingsArgs, SettingsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SettingsView {
    items_per_page: u32,
    debounce_delay: String,
}

impl From<&AppSettings> for SettingsView {
    fn from(s: &AppSettings) -> Self {
        Self {
            items_per_page: s.items_per_page,
            debounce_delay: humantime::format_duration(s.debounce_delay).to_string(),
        }
    }
}

fn print_settings(settings: &AppSettings, global: &GlobalOpts) -> Result<(), CliError> {
    let view = SettingsView::from(settings);
    let out = output::render_single(
        global.output,
        &view,
        |v| {
            output::key_values(&[
                ("Items per page", v.items_per_page.to_string()),
                ("Debounce delay", v.debounce_delay.clone()),
            ])
        },
        |v| format!("{}\n{}", v.items_per_page, v.debounce_delay),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub fn handle(
    settings: &SettingsStore,
    args: SettingsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let updated = match args.command {
        SettingsCommand::Show => settings.get(),
        SettingsCommand::Set {
            items_per_page,
            debounce,
        } => {
            let delay = debounce
                .as_deref()
                .map(|raw| util::parse_duration("debounce", raw))
                .transpose()?;
            settings.update(|s| {
                if let Some(n) = items_per_page {
                    s.items_per_page = n;
                }
                if let Some(d) = delay {
                    s.debounce_delay = d;
                }
            })?
        }
        SettingsCommand::Reset => settings.reset()?,
    };
    print_settings(&updated, global)
}
