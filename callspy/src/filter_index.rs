use crate::{Spy, Value, equality::Equality, matcher::prefix_matches};

/// Filtered views created by `with_args` on one spy, in creation order.
///
/// Keys are the argument prefixes as passed to `with_args`, compared by
/// value. Matchers in a key compare by identity.
#[derive(Debug, Default)]
pub(crate) struct ArgFilterIndex {
    entries: Vec<(Vec<Value>, Spy)>,
}

impl ArgFilterIndex {
    pub fn find(&self, key: &[Value], equality: &dyn Equality) -> Option<Spy> {
        self.entries
            .iter()
            .find(|(existing, _)| same_key(existing, key, equality))
            .map(|(_, view)| view.clone())
    }

    pub fn insert(&mut self, key: Vec<Value>, view: Spy) {
        self.entries.push((key, view));
    }

    /// Views whose effective prefix matches `args`.
    pub fn matching(&self, args: &[Value], equality: &dyn Equality) -> Vec<Spy> {
        self.entries
            .iter()
            .filter(|(_, view)| prefix_matches(view.prefix(), args, equality))
            .map(|(_, view)| view.clone())
            .collect()
    }

    pub fn views(&self) -> Vec<Spy> {
        self.entries.iter().map(|(_, view)| view.clone()).collect()
    }
}

fn same_key(a: &[Value], b: &[Value], equality: &dyn Equality) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|pair| match pair {
            (Value::Matcher(x), Value::Matcher(y)) => x.ptr_eq(y),
            (Value::Matcher(_), _) | (_, Value::Matcher(_)) => false,
            (x, y) => equality.deep_equal(x, y),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Matcher, Object, Tracker, args, equality::StructuralEquality};

    #[test]
    fn keys_compare_by_value() {
        let tracker = Tracker::new();
        let view = tracker.spy();
        let mut index = ArgFilterIndex::default();
        index.insert(args![Object::new().with("a", 1)], view.clone());

        let found = index.find(&args![Object::new().with("a", 1)], &StructuralEquality);
        assert!(found.unwrap().ptr_eq(&view));
        assert!(index.find(&args![Object::new()], &StructuralEquality).is_none());
        assert!(index.find(&args![Object::new().with("a", 1), 2], &StructuralEquality).is_none());
    }

    #[test]
    fn matcher_keys_compare_by_identity() {
        let tracker = Tracker::new();
        let matcher = Matcher::any();
        let mut index = ArgFilterIndex::default();
        index.insert(args![&matcher], tracker.spy());

        assert!(index.find(&args![&matcher], &StructuralEquality).is_some());
        assert!(index.find(&args![Matcher::any()], &StructuralEquality).is_none());
        assert!(index.find(&args![1], &StructuralEquality).is_none());
        assert_eq!(index.views().len(), 1);
    }
}
