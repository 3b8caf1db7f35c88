use crate::{Call, Error, Value};

/// Calls of one spy plus the per-call aggregates, kept index-aligned.
#[derive(Debug, Default)]
pub(crate) struct History {
    calls: Vec<Call>,
    args: Vec<Vec<Value>>,
    return_values: Vec<Value>,
    exceptions: Vec<Option<Error>>,
    this_values: Vec<Value>,
}

impl History {
    /// Append a call, keeping the history ordered by call id. A reentrant
    /// call completes before its outer call and is therefore slotted in
    /// ahead of it.
    pub fn push(&mut self, call: Call) {
        let index = self
            .calls
            .partition_point(|existing| existing.call_id() < call.call_id());
        self.args.insert(index, call.args().to_vec());
        self.return_values.insert(index, call.return_value());
        self.exceptions.insert(index, call.exception().cloned());
        self.this_values.insert(index, call.this_value().clone());
        self.calls.insert(index, call);
    }

    pub fn clear(&mut self) {
        self.calls.clear();
        self.args.clear();
        self.return_values.clear();
        self.exceptions.clear();
        self.this_values.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// The call at `index`; negative indexes count from the end.
    pub fn get(&self, index: isize) -> Option<&Call> {
        let index = if index < 0 {
            self.calls.len().checked_sub(index.unsigned_abs())?
        } else {
            index as usize
        };
        self.calls.get(index)
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn args(&self) -> &[Vec<Value>] {
        &self.args
    }

    pub fn return_values(&self) -> &[Value] {
        &self.return_values
    }

    pub fn exceptions(&self) -> &[Option<Error>] {
        &self.exceptions
    }

    pub fn this_values(&self) -> &[Value] {
        &self.this_values
    }
}
