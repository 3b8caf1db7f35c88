use std::collections::HashSet;

use crate::{Object, Value};

/// Deep comparison capability used by every call query.
///
/// `deep_equal` backs `called_with`, `returned_with` and filtered view
/// lookups; `matches` backs `called_with_match` and [`Matcher::partial`].
/// Implementations may be swapped through [`Config::with_equality`].
///
/// [`Matcher::partial`]: crate::Matcher::partial
/// [`Config::with_equality`]: crate::Config::with_equality
pub trait Equality {
    /// Full structural equality. Matchers in `expected` run their predicate.
    fn deep_equal(&self, expected: &Value, actual: &Value) -> bool;

    /// Partial match of `actual` against `pattern`.
    fn matches(&self, pattern: &Value, actual: &Value) -> bool;
}

/// Default [`Equality`] engine.
///
/// - matchers anywhere in the expected graph run their predicate
/// - primitives compare by value, `NaN` equals `NaN`
/// - arrays compare by length and element-wise
/// - objects compare by class, key set and values
/// - functions and symbols compare by identity
///
/// Cyclic graphs terminate: a pair of nodes already under comparison is
/// assumed equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralEquality;

type Visited = HashSet<(usize, usize)>;

impl Equality for StructuralEquality {
    fn deep_equal(&self, expected: &Value, actual: &Value) -> bool {
        deep_equal(expected, actual, &mut Visited::new())
    }

    fn matches(&self, pattern: &Value, actual: &Value) -> bool {
        matches(pattern, actual, &mut Visited::new())
    }
}

/// Returns `Some(true)` when the pair is already being compared further up.
fn enter(expected: &Value, actual: &Value, visited: &mut Visited) -> Option<bool> {
    let pair = (expected.address()?, actual.address()?);
    Some(!visited.insert(pair))
}

fn deep_equal(expected: &Value, actual: &Value, visited: &mut Visited) -> bool {
    if let Value::Matcher(matcher) = expected {
        return matcher.test(actual);
    }
    if Value::same(expected, actual) {
        return true;
    }
    if enter(expected, actual, visited) == Some(true) {
        return true;
    }
    match (expected, actual) {
        (Value::Array(e), Value::Array(a)) => {
            let (e, a) = (e.to_vec(), a.to_vec());
            e.len() == a.len()
                && e.iter()
                    .zip(&a)
                    .all(|(e, a)| deep_equal(e, a, visited))
        }
        (Value::Object(e), Value::Object(a)) => objects_equal(e, a, visited),
        _ => false,
    }
}

fn objects_equal(expected: &Object, actual: &Object, visited: &mut Visited) -> bool {
    if expected.class_name() != actual.class_name() || expected.len() != actual.len() {
        return false;
    }
    let actual_entries = actual.entries();
    expected.entries().iter().all(|(key, e)| {
        actual_entries
            .iter()
            .find(|(k, _)| k == key)
            .is_some_and(|(_, a)| deep_equal(e, a, visited))
    })
}

fn matches(pattern: &Value, actual: &Value, visited: &mut Visited) -> bool {
    match (pattern, actual) {
        (Value::Matcher(matcher), _) => matcher.test(actual),
        (Value::String(p), Value::String(a)) => a.contains(&**p),
        (Value::String(_), _) => false,
        (Value::Array(p), Value::Array(a)) => {
            if enter(pattern, actual, visited) == Some(true) {
                return true;
            }
            let (p, a) = (p.to_vec(), a.to_vec());
            p.len() == a.len()
                && p.iter().zip(&a).all(|(p, a)| matches(p, a, visited))
        }
        (Value::Array(_), _) => false,
        (Value::Object(p), _) => {
            let properties = match actual {
                Value::Object(object) => object.clone(),
                Value::Function(function) => function.properties().clone(),
                _ => return false,
            };
            if enter(pattern, actual, visited) == Some(true) {
                return true;
            }
            p.entries().iter().all(|(key, expected)| {
                properties
                    .get(key)
                    .is_some_and(|value| matches(expected, &value, visited))
            })
        }
        _ => deep_equal(pattern, actual, visited),
    }
}
