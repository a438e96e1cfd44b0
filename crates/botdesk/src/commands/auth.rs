//! Auth command handlers.

use dialoguer::Input;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use botdesk_core::{AuthUser, Dashboard, LoginReason, RegisterRequest};

use crate::cli::{AuthArgs, AuthCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserView<'a> {
    id: &'a str,
    email: &'a str,
    name: String,
    role: &'a str,
    is_verified: bool,
}

impl<'a> From<&'a AuthUser> for UserView<'a> {
    fn from(u: &'a AuthUser) -> Self {
        Self {
            id: u.id.as_str(),
            email: &u.email,
            name: u.display_name(),
            role: &u.role,
            is_verified: u.is_verified,
        }
    }
}

fn user_detail(u: &UserView<'_>) -> String {
    output::key_values(&[
        ("Email", u.email.to_owned()),
        ("Name", u.name.clone()),
        ("Role", u.role.to_owned()),
        ("Verified", u.is_verified.to_string()),
        ("ID", u.id.to_owned()),
    ])
}

fn print_user(user: &AuthUser, global: &GlobalOpts) -> Result<(), CliError> {
    let view = UserView::from(user);
    let out = output::render_single(global.output, &view, user_detail, |u| u.email.to_owned())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Password from `BOTDESK_PASSWORD`, else an interactive prompt.
fn read_password(prompt: &str) -> Result<SecretString, CliError> {
    if let Some(pw) = botdesk_config::password_from_env() {
        return Ok(pw);
    }
    let pw = rpassword::prompt_password(prompt).map_err(util::prompt_err)?;
    if pw.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "password cannot be empty".into(),
        });
    }
    Ok(SecretString::from(pw))
}

fn resolve_email(flag: Option<String>, global: &GlobalOpts) -> Result<String, CliError> {
    if let Some(email) = flag {
        return Ok(email);
    }
    let cfg = config::load_config()?;
    let (_, profile) = config::active_profile(global, &cfg)?;
    if let Some(email) = profile.email {
        return Ok(email);
    }
    Input::new()
        .with_prompt("Email")
        .interact_text()
        .map_err(util::prompt_err)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    dashboard: &Dashboard,
    args: AuthArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        AuthCommand::Login { email } => {
            let email = resolve_email(email, global)?;
            let password = read_password("Password: ")?;
            let user =
                util::with_spinner("Logging in", global, dashboard.login(&email, &password)).await?;
            if !global.quiet {
                eprintln!("Logged in as {}", user.display_name());
            }
            Ok(())
        }

        AuthCommand::Register {
            email,
            first_name,
            last_name,
        } => {
            let password = read_password("Choose a password: ")?;
            let request = RegisterRequest {
                email,
                password: password.expose_secret().to_owned(),
                first_name,
                last_name,
            };
            let user = dashboard.register(&request).await?;
            if !global.quiet {
                eprintln!("Registered and logged in as {}", user.display_name());
            }
            Ok(())
        }

        AuthCommand::Logout => {
            let was_logged_in = dashboard.current_user().is_some();
            dashboard.logout()?;
            if !global.quiet {
                eprintln!(
                    "{}",
                    if was_logged_in {
                        "Logged out"
                    } else {
                        "No session to log out of"
                    }
                );
            }
            Ok(())
        }

        AuthCommand::Whoami => {
            let user = util::with_spinner("Checking session", global, dashboard.auto_login())
                .await?
                .ok_or(CliError::LoginRequired {
                    reason: LoginReason::Unauthorized,
                })?;
            print_user(&user, global)
        }
    }
}
