use std::{fmt, hash};

/// Position of a call in the total order issued by a
/// [`Sequencer`](crate::Sequencer). Higher ids happened later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, hash::Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallId(u64);

impl CallId {
    pub fn value(&self) -> u64 {
        self.0
    }

    /// True when `next` is the id issued right after this one.
    pub fn precedes(&self, next: CallId) -> bool {
        self.0.checked_add(1) == Some(next.0)
    }
}

impl From<u64> for CallId {
    fn from(value: u64) -> Self {
        CallId(value)
    }
}

impl From<CallId> for u64 {
    fn from(value: CallId) -> Self {
        value.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
