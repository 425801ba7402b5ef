//! cas-sso command line entry point.
//!
//! Thin wrapper around the cas-sso library:
//! 1. Parses command-line arguments
//! 2. Initializes logging (stderr, `RUST_LOG`, default `info`)
//! 3. Builds the client configuration
//! 4. Runs one CAS operation and prints the result

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod cli;

use anyhow::{Context, Result, bail};
use cas_sso::{CasClient, Mode};
use cli::{Cli, Command};
use serde::Serialize;
use std::io::Read;
use std::path::Path;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut body = Vec::new();
        std::io::stdin()
            .read_to_end(&mut body)
            .context("failed to read stdin")?;
        return Ok(body);
    }
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::from_args();

    // Offline commands need no server configuration
    match &cli.command {
        Command::Ticket { url } => {
            let Some(ticket) = CasClient::ticket_from_url(url) else {
                bail!("no ticket parameter in {url}");
            };
            println!("{ticket}");
            return Ok(());
        }
        Command::ParseLogout { input } => {
            let body = read_input(input)?;
            let notification = CasClient::parse_logout_request(&body)
                .context("not a CAS logout request")?;
            return print_json(&notification);
        }
        _ => {}
    }

    let config = cli.client_config()?;
    tracing::debug!(
        "CAS provider {} for service {} (protocol {})",
        config.endpoints.provider(),
        config.endpoints.service(),
        config.default_version
    );

    if let Some(options) = cli.command.login_options() {
        println!("{}", config.endpoints.login_form_url(options));
        return Ok(());
    }
    if !cli.command.needs_network() {
        println!("{}", config.endpoints.logout_url());
        return Ok(());
    }

    let client = match cli.backend.as_deref() {
        Some(backend) => CasClient::with_backend(config, backend, Mode::NonBlocking)?,
        None => CasClient::new(config, Mode::NonBlocking)?,
    };
    tracing::debug!("Using HTTP backend {}", client.backend());

    match cli.command {
        Command::Validate {
            ticket,
            renew,
            pgt_url,
            proxy,
        } => {
            let mut call = if proxy {
                client.proxy_validate(ticket)
            } else {
                client.validate(ticket)
            }
            .renew(renew);
            if let Some(pgt_url) = pgt_url {
                call = call.pgt_url(pgt_url);
            }

            match call.send_async().await {
                Ok(result) => print_json(&result),
                Err(err) if err.is_authentication_failure() => {
                    tracing::warn!("Ticket rejected");
                    Err(err.into())
                }
                Err(err) => Err(err.into()),
            }
        }
        Command::Proxy {
            pgt,
            target_service,
        } => print_json(&client.proxy(pgt, target_service).send_async().await?),
        Command::Login {
            username,
            password,
            remember,
            fields,
        } => {
            let login = fields.into_iter().fold(
                client.login(username, password).remember(remember),
                |login, (name, value)| login.extra(name, value),
            );
            let outcome = login.send_async().await?;
            print_json(&outcome)?;
            if !outcome.success {
                bail!("login rejected with HTTP status {}", outcome.status);
            }
            Ok(())
        }
        Command::Logout => {
            if client.logout().send_async().await? {
                tracing::info!("Logged out");
                Ok(())
            } else {
                bail!("CAS did not confirm the logout")
            }
        }
        Command::LoginUrl { .. }
        | Command::LogoutUrl
        | Command::Ticket { .. }
        | Command::ParseLogout { .. } => Ok(()),
    }
}
