//! Deployment version handlers.

use chrono::Utc;
use serde::Serialize;

use botdesk_core::{Dashboard, VersionInfo};

use crate::cli::{GlobalOpts, VersionArgs, VersionCommand};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VersionReport {
    running: String,
    deployed: String,
    build_time: Option<String>,
    update_available: bool,
}

fn report(deployed: &VersionInfo) -> VersionReport {
    let running = VersionInfo::current().version;
    VersionReport {
        update_available: running != deployed.version,
        deployed: deployed.version.clone(),
        build_time: deployed.build_time.map(|t| t.to_rfc3339()),
        running,
    }
}

fn print_report(report: &VersionReport, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(
        global.output,
        report,
        |r| {
            output::key_values(&[
                ("Running", r.running.clone()),
                ("Deployed", r.deployed.clone()),
                ("Built", r.build_time.clone().unwrap_or_else(|| "-".into())),
                (
                    "Status",
                    if r.update_available {
                        "update available".into()
                    } else {
                        "up to date".into()
                    },
                ),
            ])
        },
        |r| r.deployed.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn manifest(version: Option<String>) -> VersionInfo {
    VersionInfo {
        version: version.unwrap_or_else(|| VersionInfo::current().version),
        build_time: Some(Utc::now()),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: VersionArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        VersionCommand::Check => {
            let dashboard = config::build_dashboard(global)?;
            let result = util::with_spinner(
                "Checking deployment",
                global,
                dashboard.check_version(),
            )
            .await;
            dashboard.shutdown().await;
            print_report(&report(&result?), global)
        }

        VersionCommand::Watch { interval, once } => {
            let interval = util::parse_duration("interval", &interval)?;
            if interval.is_zero() {
                return Err(CliError::Validation {
                    field: "interval".into(),
                    reason: "must be greater than zero".into(),
                });
            }
            let dashboard = config::build_dashboard_with(global, |client| {
                client.version_poll_interval = interval;
            })?;
            let result = watch(&dashboard, once, global).await;
            dashboard.shutdown().await;
            result
        }

        VersionCommand::Manifest { out, set_version } => {
            let rendered = output::render_json(&manifest(set_version), false)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, format!("{rendered}\n"))?;
                    if !global.quiet {
                        eprintln!("Wrote {}", path.display());
                    }
                }
                None => output::print_output(&rendered, global.quiet),
            }
            Ok(())
        }
    }
}

/// Print update banners until interrupted, or until the first one with `--once`.
async fn watch(dashboard: &Dashboard, once: bool, global: &GlobalOpts) -> Result<(), CliError> {
    let mut changes = dashboard.notifications().subscribe();
    dashboard.start_version_watch().await;
    if !global.quiet {
        eprintln!(
            "Watching {}version.json (Ctrl-C to stop)",
            dashboard.config().base_url
        );
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                util::flush_notifications(dashboard, global);
                if once && dashboard.update_available().await.is_some() {
                    break;
                }
            }
        }
    }
    Ok(())
}
