//! Newtype wrappers and type aliases for domain concepts.
//!
//! Newtypes for identifiers (PIDs) prevent silent type confusion. Type
//! aliases for quantities (ticks) provide self-documenting code without the
//! boilerplate of implementing arithmetic traits.

use std::fmt;

/// Process identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(pub u64);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Simulated time in scheduler ticks.
pub type Tick = u64;

/// Upper bound on the number of simulated CPU cores.
pub const MAX_CORES: usize = 9;
