//! Countdown timer CLI
//!
//! Pick minutes and seconds, start the countdown, and get a desktop
//! notification when time is up. The countdown itself lives in a daemon
//! (`countdown daemon`); every other command talks to it over a Unix socket.

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tokio::time::{interval, Duration, MissedTickBehavior};

use countdown::cli::{Cli, Commands, Display, IpcClient, StartArgs};
use countdown::config::CountdownConfig;
use countdown::daemon::run_daemon;
use countdown::input::parse_duration;

/// Refresh period of `countdown watch`.
const WATCH_INTERVAL_MS: u64 = 1000;

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    init_tracing(&cli);

    if let Err(e) = execute(cli).await {
        Display::show_error(&e.to_string());
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` wins; otherwise the daemon logs at info, other commands at
/// warn, and `--verbose` lowers either to debug.
fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = match (&cli.command, cli.verbose) {
        (_, true) => "debug",
        (Some(Commands::Daemon), false) => "info",
        _ => "warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = fmt().with_env_filter(filter).with_target(false);
    if matches!(cli.command, Some(Commands::Daemon)) {
        builder.init();
    } else {
        builder.without_time().init();
    }
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    let socket = cli.socket;

    match cli.command {
        Some(Commands::Start(args)) => {
            validate_start(&args)?;
            let response = connect(socket)?.start(&args).await?;
            Display::show_start_success(&response);
        }
        Some(Commands::Set(args)) => {
            parse_duration(&args.minutes, &args.seconds)?;
            let response = connect(socket)?.set(&args).await?;
            Display::show_set_success(&response);
        }
        Some(Commands::Stop) => {
            let response = connect(socket)?.stop().await?;
            Display::show_stop_success(&response);
        }
        Some(Commands::Status) => {
            let response = connect(socket)?.status().await?;
            Display::show_status(&response);
        }
        Some(Commands::Watch) => {
            watch(&connect(socket)?).await?;
        }
        Some(Commands::Daemon) => {
            let config = CountdownConfig::load_default()?;
            let socket_path = match socket {
                Some(path) => path,
                None => config.socket_path()?,
            };
            run_daemon(config, &socket_path).await?;
        }
        Some(Commands::Completions { shell }) => {
            generate_completions(shell);
        }
        None => {
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

/// Rejects bad input before contacting the daemon.
fn validate_start(args: &StartArgs) -> Result<()> {
    if args.has_duration() {
        parse_duration(
            args.minutes.as_deref().unwrap_or("0"),
            args.seconds.as_deref().unwrap_or("0"),
        )?;
    }
    Ok(())
}

/// Creates a client for `--socket`, the configured socket, or the default.
fn connect(socket: Option<PathBuf>) -> Result<IpcClient> {
    let socket_path = match socket {
        Some(path) => path,
        None => CountdownConfig::load_default()?.socket_path()?,
    };
    Ok(IpcClient::with_socket_path(socket_path))
}

/// Redraws the remaining time until the countdown is no longer running.
async fn watch(client: &IpcClient) -> Result<()> {
    let mut ticker = interval(Duration::from_millis(WATCH_INTERVAL_MS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let response = client.status().await?;
        let Some(data) = response.data else {
            anyhow::bail!("Daemonからの応答にデータがありません");
        };

        Display::show_watch_frame(&data);

        match data.state.as_deref() {
            Some("running") => continue,
            Some("completed") => {
                println!("\n⏰ 時間です！");
                return Ok(());
            }
            _ => {
                println!();
                return Ok(());
            }
        }
    }
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::parse_from(["countdown"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_validate_start_without_duration() {
        assert!(validate_start(&StartArgs::default()).is_ok());
    }

    #[test]
    fn test_validate_start_rejects_text() {
        let args = StartArgs {
            minutes: Some("abc".to_string()),
            seconds: None,
        };
        let error = validate_start(&args).unwrap_err();
        assert!(error.to_string().contains("分"));
    }

    #[test]
    fn test_validate_start_rejects_zero() {
        let args = StartArgs {
            minutes: Some("0".to_string()),
            seconds: Some("0".to_string()),
        };
        assert!(validate_start(&args).is_err());
    }

    #[test]
    fn test_connect_uses_socket_override() {
        let client = connect(Some(PathBuf::from("/tmp/override.sock"))).unwrap();
        assert_eq!(client.socket_path(), PathBuf::from("/tmp/override.sock").as_path());
    }
}
