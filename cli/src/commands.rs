//! CLI command definitions

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for thinktank
#[derive(Parser, Debug)]
#[command(name = "thinktank")]
#[command(author, version, about = "Think tank - several models debate a goal until they converge")]
#[command(long_about = r#"
thinktank runs a panel of language models through structured rounds:

1. Draft:       every participant proposes a solution
2. Critique:    every participant reviews all drafts
3. Synthesis:   proposals are merged into one
4. Convergence: every participant votes on the synthesis
5. Refinement:  blocking concerns are addressed, then back to 3

With --beadify the agreed synthesis is broken into atomic tasks.

Configuration files are loaded from (in priority order):
1. THINKTANK_* environment variables
2. --config <path>     Explicit config file
3. ./thinktank.toml    Project-level config
4. ~/.config/thinktank/config.toml   Global config

Example:
  thinktank "Design a rate limiter for a public API"
  thinktank --max-rounds 1 --threshold 0.9 "Pick a queue for order events"
  thinktank --beadify --epic tt-12 --spec-dir specs/ "Add SSO to the admin console"
"#)]
pub struct Cli {
    /// The goal to deliberate on
    #[arg(required_unless_present = "show_config")]
    pub goal: Option<String>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Maximum refinement cycles (overrides config)
    #[arg(long, value_name = "N")]
    pub max_rounds: Option<usize>,

    /// Agreement ratio required for consensus, 0.0-1.0 (overrides config)
    #[arg(long, value_name = "F")]
    pub threshold: Option<f64>,

    /// Break the final synthesis into atomic tasks
    #[arg(long)]
    pub beadify: bool,

    /// Parent epic for generated tracker commands
    #[arg(long, value_name = "ID", requires = "beadify")]
    pub epic: Option<String>,

    /// Write one Markdown spec per task into this directory
    #[arg(long, value_name = "DIR", requires = "beadify")]
    pub spec_dir: Option<PathBuf>,

    /// Append every deliberation event to this JSONL file
    #[arg(long, value_name = "PATH")]
    pub event_log: Option<PathBuf>,

    /// Write tracing output to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}
