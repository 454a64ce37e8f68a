// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SSH Tunnel Manager Contributors

// SSH Tunnel Launcher - CLI
// Script filter printing the tunnel action list for the launcher host

mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ssh_tunnel_launcher_common::{build_response, Invocation, OsProbe, Response};

use config::CliConfig;

/// Printed if the document itself cannot be serialized
const FALLBACK_DOCUMENT: &str =
    r#"{"items":[{"title":"error","subtitle":"failed to serialize output","valid":false,"icon":{"path":""},"autocomplete":""}]}"#;

#[derive(Parser, Debug)]
#[command(name = "ssh-tunnel-launcher")]
#[command(about = "SSH tunnel actions for launcher hosts", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding one definition file per tunnel
    #[arg(short = 'd', long)]
    tunnels_dir: Option<PathBuf>,

    /// Settings file (default: <config dir>/ssh-tunnel-launcher/launcher.toml)
    #[arg(short = 's', long)]
    settings: Option<PathBuf>,

    /// Launcher query; `create <name>` prompts for a new tunnel, anything else lists
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    query: Vec<String>,
}

fn main() {
    // stdout carries the document, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .init();

    let response = match Cli::try_parse() {
        Ok(cli) => run(cli).unwrap_or_else(|e| {
            error!("{:#}", e);
            Response::error(format!("{:#}", e))
        }),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let message = e.to_string();
            Response::error(message.lines().next().unwrap_or("invalid arguments").trim())
        }
    };

    print_response(&response);
}

fn run(cli: Cli) -> Result<Response> {
    let mut config = match &cli.settings {
        Some(path) => CliConfig::load_from(path)?,
        None => CliConfig::load()?,
    };
    if let Some(dir) = cli.tunnels_dir {
        config.launcher.tunnels_dir = dir;
    }

    let invocation = Invocation::from_query(&cli.query);
    debug!("Invocation: {:?}", invocation);

    let probe = OsProbe::new(config.launcher.extra_path.clone());
    Ok(build_response(&invocation, &config.launcher, &probe))
}

fn print_response(response: &Response) {
    match response.to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            println!("{}", FALLBACK_DOCUMENT);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use ssh_tunnel_launcher_common::Mode;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_create_query() {
        let cli = Cli::try_parse_from(["ssh-tunnel-launcher", "create", "staging"]).unwrap();
        assert_eq!(
            Invocation::from_query(&cli.query),
            Invocation::create("staging")
        );
    }

    #[test]
    fn test_parse_list_with_overrides() {
        let cli = Cli::try_parse_from([
            "ssh-tunnel-launcher",
            "--tunnels-dir",
            "/tmp/tunnels",
            "db",
        ])
        .unwrap();
        assert_eq!(cli.tunnels_dir, Some(PathBuf::from("/tmp/tunnels")));
        assert_eq!(Invocation::from_query(&cli.query).mode, Mode::List);
    }

    #[test]
    fn test_query_may_start_with_hyphen() {
        let cli = Cli::try_parse_from(["ssh-tunnel-launcher", "db", "-x"]).unwrap();
        assert_eq!(cli.query, vec!["db", "-x"]);
    }

    #[test]
    fn test_run_create_mode_with_settings_file() {
        let temp_dir = TempDir::new().unwrap();
        let settings = temp_dir.path().join("launcher.toml");
        fs::write(&settings, "tunnels_dir = \"/nonexistent\"\n").unwrap();

        let cli = Cli::try_parse_from([
            "ssh-tunnel-launcher",
            "--settings",
            settings.to_str().unwrap(),
            "create",
            "web",
        ])
        .unwrap();

        let response = run(cli).unwrap();
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.variables["filename"], "web");
    }

    #[test]
    fn test_run_rejects_broken_settings() {
        let temp_dir = TempDir::new().unwrap();
        let settings = temp_dir.path().join("launcher.toml");
        fs::write(&settings, "extra_path = 42\n").unwrap();

        let cli = Cli::try_parse_from([
            "ssh-tunnel-launcher",
            "--settings",
            settings.to_str().unwrap(),
        ])
        .unwrap();

        assert!(run(cli).is_err());
    }
}
