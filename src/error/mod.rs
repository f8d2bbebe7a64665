mod types;

pub use types::{RendezvousError, Result};

// Re-export for convenience
pub use RendezvousError as Error;
