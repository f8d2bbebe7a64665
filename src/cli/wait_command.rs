use crate::cli::{BarrierArgs, Normalize};
use rendezvous::lock::{self, HashedNormalizer, InstanceIdEscaper, LockName, NameNormalizer};
use rendezvous::topology::Membership;
use rendezvous::utils::parse_duration;
use rendezvous::{
    BarrierConfig, BarrierRegistry, LockNamespace, Participant, RendezvousError, Result,
};
use std::thread;
use std::time::Duration;
use tracing::debug;

pub fn execute_wait(namespace: &LockNamespace, args: &BarrierArgs, quiet: bool) -> Result<()> {
    let participant = register(namespace, args)?;
    let linger = linger(args)?;

    participant.wait()?;

    if !quiet {
        println!("Barrier passed: {}", participant.name());
    }

    linger_after_pass(participant, linger);
    Ok(())
}

/// Resolve membership from the arguments and register this process.
pub fn register(namespace: &LockNamespace, args: &BarrierArgs) -> Result<&'static Participant> {
    let normalizer: Box<dyn NameNormalizer> = match args.normalize {
        Normalize::Escape => Box::new(InstanceIdEscaper),
        Normalize::Hashed => Box::new(HashedNormalizer),
        Normalize::Verbatim => Box::new(lock::Verbatim),
    };

    let membership = Membership::resolve(
        &*normalizer,
        &args.name,
        args.peers.iter().map(String::as_str),
    )?;

    let config = BarrierConfig::new(parse_duration(&args.poll_interval)?)
        .with_jitter(parse_duration(&args.poll_jitter)?)
        .with_gate_name(LockName::new(args.gate.as_str())?);

    BarrierRegistry::global().get_instance(
        namespace,
        &membership.current,
        membership.peers,
        config,
    )
}

pub fn linger(args: &BarrierArgs) -> Result<Duration> {
    match &args.linger {
        Some(s) => parse_duration(s),
        None => parse_duration(&args.poll_interval)?
            .checked_mul(2)
            .ok_or_else(|| RendezvousError::InvalidDuration {
                input: args.poll_interval.clone(),
                message: "twice the poll interval is too large to linger".to_string(),
            }),
    }
}

/// Peers still scanning only see this process while it runs, so stay around
/// long enough for their next scan.
pub fn linger_after_pass(participant: &Participant, linger: Duration) {
    if linger.is_zero() {
        return;
    }
    debug!("Participant {} lingering for {:?}", participant.name(), linger);
    thread::sleep(linger);
}
