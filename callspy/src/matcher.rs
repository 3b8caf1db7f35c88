//! Predicate-bearing values used in place of literals during comparisons.

use std::{fmt, rc::Rc};

use crate::{
    Function, Value,
    equality::{Equality, StructuralEquality},
    format::{DefaultFormatter, ValueFormatter},
};

type Predicate = dyn Fn(&Value) -> bool;

struct MatcherData {
    description: String,
    predicate: Box<Predicate>,
}

/// A value that answers `test(actual)` instead of being compared literally.
///
/// Anywhere an expected argument, receiver or return value is accepted, a
/// `Matcher` may stand in for it: comparisons run its predicate against the
/// actual value. This includes matchers nested inside expected objects and
/// arrays.
///
/// # Example
///
/// ```rust
/// use callspy::{Matcher, Value};
///
/// let string = Matcher::type_of("string");
/// assert!(string.test(&Value::from("abc")));
/// assert!(!string.test(&Value::from(1)));
///
/// let even = Matcher::new("even", |v| v.as_number().is_some_and(|n| n % 2.0 == 0.0));
/// assert!(even.test(&Value::from(4)));
/// ```
#[derive(Clone)]
pub struct Matcher(Rc<MatcherData>);

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Matcher").field(&self.0.description).finish()
    }
}

impl Matcher {
    /// A matcher from a custom predicate. `description` is what formatted
    /// output shows in place of the matcher.
    pub fn new<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + 'static,
    {
        Self(Rc::new(MatcherData {
            description: description.into(),
            predicate: Box::new(predicate),
        }))
    }

    /// Run the predicate against `actual`.
    #[inline]
    pub fn test(&self, actual: &Value) -> bool {
        (self.0.predicate)(actual)
    }

    pub fn description(&self) -> &str {
        &self.0.description
    }

    /// Requires the very same reference (or the same primitive).
    pub fn same(expected: impl Into<Value>) -> Self {
        let expected = expected.into();
        let description = format!("same({})", DefaultFormatter.format(&expected));
        Matcher::new(description, move |actual| Value::same(&expected, actual))
    }

    /// Accepts anything, including `undefined`.
    pub fn any() -> Self {
        Matcher::new("any", |_| true)
    }

    pub fn defined() -> Self {
        Matcher::new("defined", |actual| {
            !matches!(actual, Value::Undefined | Value::Null)
        })
    }

    pub fn truthy() -> Self {
        Matcher::new("truthy", Value::is_truthy)
    }

    /// Accepts values whose runtime type name is `type_name`
    /// (`"string"`, `"number"`, `"function"`, ...).
    pub fn type_of(type_name: &str) -> Self {
        let type_name = type_name.to_owned();
        Matcher::new(format!("typeOf(\"{type_name}\")"), move |actual| {
            actual.type_name() == type_name
        })
    }

    /// Accepts callables.
    pub fn func() -> Self {
        Matcher::type_of("function")
    }

    /// Deep partial match with the default equality engine: objects match
    /// when they contain the expected properties, strings when they contain
    /// the expected substring.
    pub fn partial(expected: impl Into<Value>) -> Self {
        Matcher::partial_with(expected.into(), Rc::new(StructuralEquality))
    }

    pub(crate) fn partial_with(expected: Value, equality: Rc<dyn Equality>) -> Self {
        let description = format!("match({})", DefaultFormatter.format(&expected));
        Matcher::new(description, move |actual| {
            equality.matches(&expected, actual)
        })
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Matcher) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// How an expected value takes part in a comparison, classified once per
/// comparison.
#[derive(Debug, Clone, Copy)]
pub enum Expected<'a> {
    /// Compared with the equality engine.
    Literal(&'a Value),
    /// Evaluated as a predicate.
    Matcher(&'a Matcher),
    /// Compared by callable identity.
    Callable(&'a Function),
}

impl<'a> Expected<'a> {
    pub fn classify(expected: &'a Value) -> Self {
        match expected {
            Value::Matcher(matcher) => Expected::Matcher(matcher),
            Value::Function(function) => Expected::Callable(function),
            literal => Expected::Literal(literal),
        }
    }

    /// True if `actual` satisfies this expectation.
    pub fn accepts(&self, actual: &Value, equality: &dyn Equality) -> bool {
        match self {
            Expected::Matcher(matcher) => matcher.test(actual),
            Expected::Callable(function) => actual
                .as_function()
                .is_some_and(|candidate| candidate.ptr_eq(function)),
            Expected::Literal(literal) => equality.deep_equal(literal, actual),
        }
    }
}

/// Positional prefix comparison shared by filtered views: the prefix may not
/// be longer than the arguments and every prefix position must be accepted.
pub(crate) fn prefix_matches(prefix: &[Value], args: &[Value], equality: &dyn Equality) -> bool {
    prefix.len() <= args.len()
        && prefix
            .iter()
            .zip(args)
            .all(|(expected, actual)| Expected::classify(expected).accepts(actual, equality))
}
