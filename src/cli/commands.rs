//! Command definitions for the countdown CLI.
//!
//! Uses clap derive macro for argument parsing. Durations are taken as text
//! and validated by [`crate::input::parse_duration`], so the CLI and the
//! daemon report the same messages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// ============================================================================
// CLI Structure
// ============================================================================

/// Countdown timer CLI
#[derive(Parser, Debug)]
#[command(
    name = "countdown",
    version,
    about = "シンプルなカウントダウンタイマー",
    long_about = "分と秒を指定してカウントダウンを開始し、時間になるとデスクトップ通知でお知らせします。\n\
                  タイマーは 'countdown daemon' で起動したバックグラウンドプロセスが管理します。",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path of the daemon socket
    #[arg(long, global = true, value_name = "PATH")]
    pub socket: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start a countdown
    Start(StartArgs),

    /// Select a duration without starting
    Set(SetArgs),

    /// Stop the running countdown
    Stop,

    /// Show the current countdown
    Status,

    /// Follow the countdown until it ends
    Watch,

    /// Run the countdown daemon in the foreground
    Daemon,

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Arguments
// ============================================================================

/// Arguments for the start command.
///
/// Without either option the duration selected earlier is started.
#[derive(Args, Debug, Clone, Default)]
pub struct StartArgs {
    /// Minutes (0-60)
    #[arg(short, long, allow_hyphen_values = true)]
    pub minutes: Option<String>,

    /// Seconds (0-59)
    #[arg(short, long, allow_hyphen_values = true)]
    pub seconds: Option<String>,
}

impl StartArgs {
    /// Returns true if a duration was given on the command line.
    pub fn has_duration(&self) -> bool {
        self.minutes.is_some() || self.seconds.is_some()
    }
}

/// Arguments for the set command.
#[derive(Args, Debug, Clone)]
pub struct SetArgs {
    /// Minutes (0-60)
    #[arg(allow_hyphen_values = true)]
    pub minutes: String,

    /// Seconds (0-59)
    #[arg(default_value = "0", allow_hyphen_values = true)]
    pub seconds: String,
}

// ============================================================================
// Tests
// ============================================================================
