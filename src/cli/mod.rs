// src/cli/mod.rs — CLI definition (clap derive)

pub mod profiles;
pub mod rank;
pub mod run;
pub mod status;
pub mod sweep;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "scrimmage",
    about = "Sparring gym for a scripted sales agent: run it against adversarial counter-agents, score the calls, keep the wins",
    version
)]
pub struct Cli {
    /// Config file path (defaults to ~/.scrimmage/config.toml)
    #[arg(long)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one session against a single counter-agent profile
    Run {
        /// Profile name or id (first seeded profile when omitted)
        #[arg(short, long)]
        profile: Option<String>,

        /// Script file overriding the built-in playbook
        #[arg(long)]
        script: Option<String>,

        /// Print the full transcript after scoring
        #[arg(long)]
        transcript: bool,
    },
    /// Run a batch sweep: many sessions in concurrent groups
    Sweep {
        /// Total sessions to run
        #[arg(short, long, default_value = "30")]
        total: u32,

        /// Profile names to rotate through (all seeded profiles when omitted;
        /// repeat the flag for several)
        #[arg(short, long)]
        profile: Vec<String>,

        /// Script file overriding the built-in playbook
        #[arg(long)]
        script: Option<String>,

        /// Rank the winners once the sweep completes
        #[arg(long)]
        rank: bool,
    },
    /// Pick and explain the top sessions of a completed sweep
    Rank {
        /// Sweep id (shown by `sweep` and `status`)
        sweep_id: String,
    },
    /// Show budget state and recent sweeps
    Status {
        /// Show row counts as well
        #[arg(long)]
        verbose: bool,
    },
    /// List counter-agent profiles
    Profiles {
        /// Insert any missing built-in profiles first
        #[arg(long)]
        seed: bool,
    },
}
