mod args;
mod probe_command;
mod run_command;
mod wait_command;

use rendezvous::{LockNamespace, Result};
pub use args::{Args, BarrierArgs, Command, Normalize};

/// Dispatch the parsed command, returning the process exit code.
pub fn run(args: Args) -> Result<i32> {
    let namespace = match &args.lock_dir {
        Some(dir) => LockNamespace::new(dir)?,
        None => LockNamespace::user_default()?,
    };

    match args.command {
        Command::Wait { barrier } => {
            wait_command::execute_wait(&namespace, &barrier, args.quiet).map(|_| 0)
        }
        Command::Run {
            barrier,
            serialize_lock,
            standalone,
            command,
        } => run_command::execute_run(
            &namespace,
            &barrier,
            &serialize_lock,
            standalone,
            &command,
        ),
        Command::Probe { name, claim } => {
            probe_command::execute_probe(&namespace, &name, claim).map(|_| 0)
        }
    }
}
