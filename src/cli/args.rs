use clap::{Parser, Subcommand, ValueEnum};
use rendezvous::barrier::DEFAULT_GATE_LOCK_NAME;
use rendezvous::exclusive::DEFAULT_SERIALIZATION_LOCK_NAME;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "rendezvous",
    version,
    about = "Cross-process rendezvous barrier and serialized execution through named locks",
    long_about = None
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Lock namespace directory (default: platform cache directory)
    #[arg(long, value_name = "DIR", global = true)]
    pub lock_dir: Option<PathBuf>,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short = 'q', long, conflicts_with = "verbose", global = true)]
    pub quiet: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct BarrierArgs {
    /// Identifier of this instance
    #[arg(long, value_name = "ID")]
    pub name: String,

    /// Identifier of a peer instance (repeatable, may include this instance)
    #[arg(long = "peer", value_name = "ID")]
    pub peers: Vec<String>,

    /// Time between peer scans (e.g., "500ms", "3s")
    #[arg(long, value_name = "DURATION", default_value = "3s")]
    pub poll_interval: String,

    /// Random extra delay added to each poll, up to this much
    #[arg(long, value_name = "DURATION", default_value = "0ms")]
    pub poll_jitter: String,

    /// Gate lock shared by all participants of the deployment
    #[arg(long, value_name = "NAME", default_value = DEFAULT_GATE_LOCK_NAME)]
    pub gate: String,

    /// How instance identifiers become lock names
    #[arg(long, value_enum, default_value_t = Normalize::Escape)]
    pub normalize: Normalize,

    /// Stay visible to peers this long after passing (default: twice the poll interval)
    #[arg(long, value_name = "DURATION")]
    pub linger: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalize {
    /// Drop '(', ')' and '.'
    Escape,
    /// Replace illegal characters and append a hash of the identifier
    Hashed,
    /// Use identifiers as lock names unchanged
    Verbatim,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Wait until every peer has reached the barrier
    Wait {
        #[command(flatten)]
        barrier: BarrierArgs,
    },

    /// Pass the barrier, then run COMMAND while holding the serialization lock
    Run {
        #[command(flatten)]
        barrier: BarrierArgs,

        /// Lock serializing COMMAND across instances
        #[arg(long, value_name = "NAME", default_value = DEFAULT_SERIALIZATION_LOCK_NAME)]
        serialize_lock: String,

        /// Single-instance deployment: run COMMAND without coordination
        #[arg(long)]
        standalone: bool,

        /// Command to run, after `--`
        #[arg(required = true, last = true, value_name = "COMMAND")]
        command: Vec<String>,
    },

    /// Report whether a named lock is present (or claimed)
    Probe {
        /// Lock name, as it appears in the namespace
        #[arg(value_name = "NAME")]
        name: String,

        /// Report the claim instead of presence
        #[arg(long)]
        claim: bool,
    },
}
