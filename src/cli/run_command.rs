use crate::cli::wait_command::{linger, linger_after_pass, register};
use crate::cli::BarrierArgs;
use rendezvous::{run_serialized, Coordination, LockName, LockNamespace, RendezvousError, Result};
use std::process::{Command, ExitStatus};
use tracing::debug;

pub fn execute_run(
    namespace: &LockNamespace,
    args: &BarrierArgs,
    serialize_lock: &str,
    standalone: bool,
    command: &[String],
) -> Result<i32> {
    let serialize_lock = LockName::new(serialize_lock)?;
    let (program, program_args) = command
        .split_first()
        .ok_or_else(|| RendezvousError::Other("No command given".to_string()))?;

    let run_command = || -> Result<ExitStatus> {
        debug!("Running {} {:?}", program, program_args);
        Command::new(program)
            .args(program_args)
            .status()
            .map_err(|e| RendezvousError::CommandFailed {
                command: program.clone(),
                source: e,
            })
    };

    let status = if standalone {
        run_serialized(Coordination::Standalone, &serialize_lock, run_command)??
    } else {
        let participant = register(namespace, args)?;
        let linger = linger(args)?;
        let status = run_serialized(
            Coordination::Barrier(participant),
            &serialize_lock,
            run_command,
        )??;
        linger_after_pass(participant, linger);
        status
    };

    // Killed by a signal: no code to forward
    Ok(status.code().unwrap_or(1))
}
