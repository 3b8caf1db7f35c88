use std::{cell::Cell, rc::Rc};

use crate::CallId;

#[derive(Debug, Default)]
struct Counters {
    calls: Cell<u64>,
    spies: Cell<u64>,
}

/// Issues the total order of calls across every spy sharing it.
///
/// Clones share the same counters. No spy operation ever rewinds them; a
/// fresh sequence starts only with a fresh [`Tracker`](crate::Tracker) or
/// [`Sequencer::new`].
#[derive(Debug, Clone, Default)]
pub struct Sequencer(Rc<Counters>);

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next call id. The first id issued is 1.
    pub fn next_call_id(&self) -> CallId {
        let next = self.0.calls.get() + 1;
        self.0.calls.set(next);
        CallId::from(next)
    }

    /// Most recently issued call id, if any.
    pub fn last_call_id(&self) -> Option<CallId> {
        match self.0.calls.get() {
            0 => None,
            n => Some(CallId::from(n)),
        }
    }

    pub(crate) fn next_spy_id(&self) -> u64 {
        let next = self.0.spies.get() + 1;
        self.0.spies.set(next);
        next
    }
}
