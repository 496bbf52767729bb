//! # timetrack
//!
//! A terminal tracker for time spent on user-defined activities. timetrack
//! combines a fast CLI for quick actions with a TUI dashboard for watching
//! timers tick live.
//!
//! ## Features
//!
//! *   **Active/Inactive sets**: keep a short working list and park the rest
//!     in the archive without losing their statistics.
//! *   **Incompatible groups**: tasks sharing a group (e.g. `movement`)
//!     cannot run at the same time; starting one asks before stopping the
//!     others.
//! *   **Daily & weekly totals**: time is bucketed per UTC calendar day and
//!     rolled up into Monday-based weeks. Buckets older than 7 days are
//!     pruned when a timer stops.
//! *   **Data Persistence**: the whole state is one JSON blob in the
//!     standard XDG data directory, re-polled periodically by the TUI.
//!
//! ## Usage
//!
//! ```bash
//! timetrack                       # TUI dashboard
//! timetrack add "Read" --group focus
//! timetrack activate Read
//! timetrack start Read
//! timetrack stop Read
//! timetrack stats Read
//! timetrack list --all
//! timetrack export
//! ```
//!
//! ### TUI Key Bindings
//!
//! *   `q`: Quit
//! *   `j`/`k` or arrows: Move selection
//! *   `Tab`/`v`: Switch between Active and Inactive views
//! *   `s`/`Space`: Start/stop the selected task's timer
//! *   `Enter`: Activate/deactivate the selected task
//! *   `a`: Add a task (name, then optional group)
//! *   `d`: Delete the selected task (inactive only, confirmed)
//! *   `g`: Per-task statistics
//! *   `e`: Export JSON
//!
//! ## Data Storage
//!
//! State lives in your local data directory:
//! *   Linux: `~/.local/share/timetrack/tracker.json`
//! *   macOS: `~/Library/Application Support/timetrack/tracker.json`
//! *   Windows: `%APPDATA%\timetrack\tracker.json`
//!
//! Override with the `TIMETRACK_DB` environment variable.

use std::io;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::EnvFilter;

use timetrack::commands::*;
use timetrack::tui::run_tui;

#[derive(Parser)]
#[command(name = "timetrack")]
#[command(about = "Terminal activity time tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task (starts in the inactive archive)
    Add {
        /// Task name (quoted if it has spaces)
        name: String,
        /// Incompatible group; tasks sharing it cannot run together
        #[arg(short, long)]
        group: Option<String>,
    },
    /// List tasks
    List {
        /// Include the inactive archive
        #[arg(short, long)]
        all: bool,
    },
    /// Move a task into the working list
    Activate {
        /// Task name or id prefix
        task: String,
    },
    /// Move a task into the archive (stops its timer)
    Deactivate {
        /// Task name or id prefix
        task: String,
    },
    /// Start a task's timer
    Start {
        /// Task name or id prefix
        task: String,
    },
    /// Stop a task's timer
    Stop {
        /// Task name or id prefix
        task: String,
    },
    /// Delete an inactive task and its statistics
    Delete {
        /// Task name or id prefix
        task: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Show daily and weekly totals for a task
    Stats {
        /// Task name or id prefix
        task: String,
    },
    /// Export tasks and daily statistics as JSON
    Export {
        /// Output path (defaults to time-tracker-export-<date>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive TUI
    Ui,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Add { name, group }) => {
            let mut tracker = open_tracker();
            cmd_add(&mut tracker, name, group, false);
        }
        Some(Commands::List { all }) => {
            let tracker = open_tracker();
            cmd_list(&tracker, all);
        }
        Some(Commands::Activate { task }) => {
            let mut tracker = open_tracker();
            cmd_activate(&mut tracker, &task, false);
        }
        Some(Commands::Deactivate { task }) => {
            let mut tracker = open_tracker();
            cmd_deactivate(&mut tracker, &task, false);
        }
        Some(Commands::Start { task }) => {
            let mut tracker = open_tracker();
            cmd_start(&mut tracker, &task, &StdinPrompt, false);
        }
        Some(Commands::Stop { task }) => {
            let mut tracker = open_tracker();
            cmd_stop(&mut tracker, &task, false);
        }
        Some(Commands::Delete { task, force }) => {
            let mut tracker = open_tracker();
            cmd_delete(&mut tracker, &task, force, &StdinPrompt, false);
        }
        Some(Commands::Stats { task }) => {
            let tracker = open_tracker();
            cmd_stats(&tracker, &task);
        }
        Some(Commands::Export { output }) => {
            let tracker = open_tracker();
            cmd_export(&tracker, output, false);
        }
        Some(Commands::Completions { shell }) => {
            let shell_enum = match shell.as_str() {
                "bash" => Shell::Bash,
                "zsh" => Shell::Zsh,
                "fish" => Shell::Fish,
                "powershell" => Shell::PowerShell,
                "elvish" => Shell::Elvish,
                _ => {
                    eprintln!("Unsupported shell: {}", shell);
                    return;
                }
            };
            let mut cmd = Cli::command();
            generate(shell_enum, &mut cmd, "timetrack", &mut io::stdout());
        }
        Some(Commands::Ui) | None => {
            let tracker = open_tracker();
            if let Err(e) = run_tui(tracker) {
                eprintln!("Error running TUI: {}", e);
            }
        }
    }
}
