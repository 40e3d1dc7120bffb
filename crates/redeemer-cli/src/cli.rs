//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "redeemer",
    version,
    about = "Run the redemption worker once or on an interval, reporting JSON events on stdout",
    after_help = "Examples:\n  redeemer --once\n  redeemer --check\n  redeemer --interval 15\n\n\
                  Before first use, run: npx tsx src/redeem.ts --setup"
)]
pub struct Cli {
    /// Run every N minutes until interrupted
    #[arg(long, value_name = "MINUTES")]
    pub interval: Option<u64>,

    /// Run once and exit (the default when --interval is not given)
    #[arg(long)]
    pub once: bool,

    /// Only report redeemable positions, don't redeem
    #[arg(long)]
    pub check: bool,

    /// Directory holding the worker (src/redeem.ts, .encrypted_keys, .env)
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub worker_dir: PathBuf,

    /// Debug-level logs on stderr
    #[arg(short, long)]
    pub verbose: bool,
}
