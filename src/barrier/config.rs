use crate::lock::LockName;
use rand::Rng;
use std::time::Duration;

/// How long a participant sleeps between two scans of its peers.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Gate serializing peer scans; shared by every participant of a deployment.
pub const DEFAULT_GATE_LOCK_NAME: &str = "rendezvous-barrier-gate";

/// Tuning for [`crate::barrier::Participant::wait`].
///
/// `poll_interval` trades latency for load on the gate: a participant notices a
/// late peer at most one interval after the peer registers. Zero busy-polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarrierConfig {
    pub poll_interval: Duration,
    /// Upper bound of a random delay added to every sleep, so participants
    /// started together don't hit the gate in lockstep.
    pub poll_jitter: Duration,
    pub gate_name: LockName,
}

impl BarrierConfig {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..Self::default()
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.poll_jitter = jitter;
        self
    }

    pub fn with_gate_name(mut self, gate_name: LockName) -> Self {
        self.gate_name = gate_name;
        self
    }

    pub(crate) fn next_delay(&self) -> Duration {
        let jitter_ms = self.poll_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.poll_interval;
        }
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms));
        self.poll_interval + jitter
    }
}

impl Default for BarrierConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_jitter: Duration::ZERO,
            gate_name: LockName::well_known(DEFAULT_GATE_LOCK_NAME),
        }
    }
}
