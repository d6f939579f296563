//! Canvass CLI - a command-line client for the Canvass campaign platform.
//!
//! Every invocation restores the stored session, runs one command and exits.
//! An expired session is cleared so the next command asks for a login.

mod cli;
mod commands;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use canvass_core::engagement::{EngagementAction, EngagementError};
use canvass_core::points::WithdrawalError;
use canvass_core::{ApiError, Config, SessionManager};

use cli::{Cli, Command};

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes buffered log lines when dropped.
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();
    guard
}

/// The API error behind a command failure, if there is one.
fn api_error(err: &anyhow::Error) -> Option<&ApiError> {
    if let Some(WithdrawalError::Api(e)) = err.downcast_ref::<WithdrawalError>() {
        return Some(e);
    }
    if let Some(EngagementError::Rejected { source, .. }) = err.downcast_ref::<EngagementError>() {
        return Some(source);
    }
    err.chain().find_map(|cause| cause.downcast_ref::<ApiError>())
}

fn user_message(err: &anyhow::Error) -> String {
    if let Some(WithdrawalError::Invalid(message)) = err.downcast_ref::<WithdrawalError>() {
        return message.clone();
    }
    match api_error(err) {
        Some(e) => e.user_message(),
        None => format!("{:#}", err),
    }
}

/// Whether a failure means the stored session is no longer valid.
///
/// A 401 from `login` or `register` only rejects the credentials just
/// entered, so the stored session is left alone.
fn should_invalidate(command: &Command, err: &anyhow::Error) -> bool {
    let signs_in = matches!(command, Command::Login { .. } | Command::Register(_));
    !signs_in && api_error(err).map(ApiError::is_unauthorized).unwrap_or(false)
}

fn failure_message(command: &Command, err: &anyhow::Error) -> String {
    let unauthorized = api_error(err).map(ApiError::is_unauthorized).unwrap_or(false);
    match command {
        Command::Login { .. } | Command::Register(_) if unauthorized => "Invalid email or password.".to_string(),
        _ => user_message(err),
    }
}

async fn run(manager: &SessionManager, config: &mut Config, command: &Command) -> Result<()> {
    match command {
        Command::Login { email } => commands::login(manager, config, email.clone()).await,
        Command::Register(args) => commands::register(manager, config, args.clone()).await,
        Command::Logout => commands::logout(manager).await,
        Command::Whoami => commands::whoami(manager).await,
        Command::Campaigns { scope, sort } => commands::campaigns(manager, *scope, *sort).await,
        Command::Like { id } => commands::engage(manager, id, EngagementAction::Like).await,
        Command::Share { id } => commands::engage(manager, id, EngagementAction::Share).await,
        Command::Points => commands::points(manager).await,
        Command::Withdraw { amount, phone, network } => {
            commands::withdraw(manager, *amount, phone.clone(), network.clone()).await
        }
        Command::Regions => commands::regions(manager).await,
        Command::Constituencies { region } => commands::constituencies(manager, region).await,
        Command::Profile { command } => commands::profile(manager, command.clone()).await,
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing();
    info!("Canvass CLI starting");

    let mut config = Config::load().context("Failed to load configuration")?;
    let client_config = config.client_config()?;
    let manager = SessionManager::new(&client_config, config.session_store()?)?;
    let restored = manager.restore();
    debug!(restored, base_url = %client_config.base_url(), "Session restored");

    if let Err(err) = run(&manager, &mut config, &cli.command).await {
        if should_invalidate(&cli.command, &err) {
            manager.invalidate();
            eprintln!("Your session has expired. Run `canvass login` to continue.");
        } else {
            debug!(error = ?err, "Command failed");
            eprintln!("Error: {}", failure_message(&cli.command, &err));
        }
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_found_through_wrappers() {
        let direct = anyhow::Error::from(ApiError::Unauthorized);
        assert!(api_error(&direct).map(ApiError::is_unauthorized).unwrap_or(false));

        let withdrawal = anyhow::Error::from(WithdrawalError::Api(ApiError::Unauthorized));
        assert!(api_error(&withdrawal).map(ApiError::is_unauthorized).unwrap_or(false));

        let engagement = anyhow::Error::from(EngagementError::Rejected {
            action: EngagementAction::Like,
            source: ApiError::Unauthorized,
        });
        assert!(api_error(&engagement).map(ApiError::is_unauthorized).unwrap_or(false));

        let other = anyhow::anyhow!("Not logged in");
        assert!(api_error(&other).is_none());
    }

    #[test]
    fn test_user_message_prefers_local_validation() {
        let err = anyhow::Error::from(WithdrawalError::Invalid("Maximum withdrawal amount is ₵10.70".to_string()));
        assert_eq!(user_message(&err), "Maximum withdrawal amount is ₵10.70");

        let err = anyhow::Error::from(ApiError::RateLimited);
        assert_eq!(user_message(&err), "Server is busy. Please wait a moment and try again.");
    }

    #[test]
    fn test_rejected_sign_in_keeps_stored_session() {
        let unauthorized = anyhow::Error::from(ApiError::Unauthorized);
        let login = Command::Login { email: None };

        assert!(!should_invalidate(&login, &unauthorized));
        assert_eq!(failure_message(&login, &unauthorized), "Invalid email or password.");

        assert!(should_invalidate(&Command::Points, &unauthorized));
        let rejected_like = anyhow::Error::from(EngagementError::Rejected {
            action: EngagementAction::Like,
            source: ApiError::Unauthorized,
        });
        assert!(should_invalidate(&Command::Like { id: "7".to_string() }, &rejected_like));

        let server_error = anyhow::Error::from(ApiError::ServerError("boom".to_string()));
        assert!(!should_invalidate(&Command::Points, &server_error));
    }
}
