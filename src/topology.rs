//! Turning role-instance identifiers into barrier membership.

use crate::error::{RendezvousError, Result};
use crate::lock::{LockName, NameNormalizer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

const DEPLOYMENT_PREFIX: &str = "deployment(";
const WEB_SUFFIX: &str = "_Web";

/// A role instance identifier of the form `deployment(<id>).<role>.<index>`,
/// optionally followed by `_Web`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceId {
    pub deployment_id: u64,
    pub role: String,
    pub index: u32,
    pub web: bool,
}

impl InstanceId {
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| RendezvousError::invalid_name(raw, reason);

        let rest = raw
            .strip_prefix(DEPLOYMENT_PREFIX)
            .ok_or_else(|| invalid("expected 'deployment(<id>).<role>.<index>'"))?;
        let (deployment, rest) = rest
            .split_once(").")
            .ok_or_else(|| invalid("unterminated deployment id"))?;
        let deployment_id: u64 = deployment
            .parse()
            .map_err(|_| invalid("deployment id is not a number"))?;

        let (rest, web) = match rest.strip_suffix(WEB_SUFFIX) {
            Some(stripped) => (stripped, true),
            None => (rest, false),
        };
        let (role, index) = rest
            .rsplit_once('.')
            .ok_or_else(|| invalid("missing instance index"))?;
        if role.is_empty() {
            return Err(invalid("role name is empty"));
        }
        let index: u32 = index
            .parse()
            .map_err(|_| invalid("instance index is not a number"))?;

        Ok(InstanceId {
            deployment_id,
            role: role.to_string(),
            index,
            web,
        })
    }

    pub fn same_deployment(&self, other: &InstanceId) -> bool {
        self.deployment_id == other.deployment_id && self.role == other.role
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "deployment({}).{}.{}",
            self.deployment_id, self.role, self.index
        )?;
        if self.web {
            f.write_str(WEB_SUFFIX)?;
        }
        Ok(())
    }
}

/// The current participant's name and the names of all its peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub current: LockName,
    pub peers: BTreeSet<LockName>,
}

impl Membership {
    /// Normalize `current` and every identifier in `all` (which may or may not
    /// list `current`), dropping the current one from the peers.
    ///
    /// Fails if two distinct identifiers normalize to the same lock name.
    pub fn resolve<'a, N, I>(normalizer: &N, current: &str, all: I) -> Result<Self>
    where
        N: NameNormalizer + ?Sized,
        I: IntoIterator<Item = &'a str>,
    {
        let current_name = normalizer.normalize(current)?;

        let mut seen: BTreeMap<LockName, &str> = BTreeMap::new();
        seen.insert(current_name.clone(), current);

        let mut peers = BTreeSet::new();
        for raw in all {
            let name = normalizer.normalize(raw)?;
            match seen.get(&name) {
                Some(&first) if first == raw => continue,
                Some(&first) => {
                    return Err(RendezvousError::NameCollision {
                        name: name.to_string(),
                        first: first.to_string(),
                        second: raw.to_string(),
                    })
                }
                None => {
                    seen.insert(name.clone(), raw);
                    peers.insert(name);
                }
            }
        }

        Ok(Membership {
            current: current_name,
            peers,
        })
    }
}
