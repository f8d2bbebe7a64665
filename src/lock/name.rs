use crate::error::{RendezvousError, Result};
use sha2::{Digest, Sha256};
use std::fmt;

const MAX_NAME_LEN: usize = 128;

/// A validated name in the shared lock namespace.
///
/// Names map directly onto file names inside the namespace directory, so only
/// ASCII alphanumerics, `_`, `-` and `.` are accepted, and a name may not start
/// with a dot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LockName(String);

impl LockName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate(&name)?;
        Ok(LockName(name))
    }

    /// Names baked into the crate; validity is checked by the unit tests below.
    pub(crate) fn well_known(name: &'static str) -> Self {
        debug_assert!(validate(name).is_ok(), "invalid well-known lock name");
        LockName(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LockName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for LockName {
    type Err = RendezvousError;

    fn from_str(s: &str) -> Result<Self> {
        LockName::new(s)
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.'
}

fn validate(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RendezvousError::invalid_name(name, "name is empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(RendezvousError::invalid_name(
            name,
            format!("longer than {} bytes", MAX_NAME_LEN),
        ));
    }
    if name.starts_with('.') {
        return Err(RendezvousError::invalid_name(name, "must not start with '.'"));
    }
    if let Some(bad) = name.chars().find(|c| !is_allowed(*c)) {
        return Err(RendezvousError::invalid_name(
            name,
            format!("character {:?} is not allowed", bad),
        ));
    }
    Ok(())
}

/// Maps a raw role/instance identifier onto a [`LockName`].
///
/// Implementations must be collision-free for the identifiers of one
/// deployment; [`crate::topology::Membership::resolve`] rejects collisions it
/// can see.
pub trait NameNormalizer: Send + Sync {
    fn normalize(&self, raw: &str) -> Result<LockName>;
}

impl<F> NameNormalizer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn normalize(&self, raw: &str) -> Result<LockName> {
        LockName::new(self(raw))
    }
}

/// Drops `(`, `)` and `.` from the identifier.
///
/// `deployment(400).WebRole.2` becomes `deployment400WebRole2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceIdEscaper;

impl NameNormalizer for InstanceIdEscaper {
    fn normalize(&self, raw: &str) -> Result<LockName> {
        let escaped: String = raw
            .chars()
            .filter(|c| !matches!(c, '(' | ')' | '.'))
            .collect();
        LockName::new(escaped)
    }
}

/// Replaces illegal characters with `_` and appends a short SHA-256 of the raw
/// identifier, so identifiers that only differ in punctuation stay distinct.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashedNormalizer;

impl NameNormalizer for HashedNormalizer {
    fn normalize(&self, raw: &str) -> Result<LockName> {
        if raw.is_empty() {
            return Err(RendezvousError::invalid_name(raw, "identifier is empty"));
        }

        let mut readable: String = raw
            .chars()
            .map(|c| if is_allowed(c) { c } else { '_' })
            .collect();
        if readable.starts_with('.') {
            readable.replace_range(..1, "_");
        }
        // Leave room for "-" + 8 hex chars
        readable.truncate(MAX_NAME_LEN - 9);

        let mut hasher = Sha256::new();
        hasher.update(raw.as_bytes());
        let hash = format!("{:x}", hasher.finalize());

        LockName::new(format!("{}-{}", readable, &hash[..8]))
    }
}

/// Accepts identifiers that are already valid lock names.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl NameNormalizer for Verbatim {
    fn normalize(&self, raw: &str) -> Result<LockName> {
        LockName::new(raw)
    }
}
