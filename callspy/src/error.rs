use std::borrow::Cow;

use crate::{
    PropertyKey, Value,
    format::{DefaultFormatter, ValueFormatter},
};

/// The single error type for all callspy operations.
///
/// Every fallible API returns `callspy::Result<T>` (alias for
/// `Result<T, callspy::Error>`). Exceptions raised by tracked callables travel
/// through the same type as [`Error::Thrown`], so a wrapped closure, a spy
/// and a callback helper all propagate failures with `?`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    TypeError(String),

    #[error("{name} cannot {action} since it was not yet invoked.")]
    NotInvokedYet { name: String, action: String },

    #[error("{name} expected argument at position {position} to be a Function, but was {actual}")]
    NotCallable {
        name: String,
        position: usize,
        actual: &'static str,
    },

    #[error("{}", no_callback_message(.name, .property, .received))]
    NoMatchingCallback {
        name: String,
        property: Option<String>,
        received: Vec<String>,
    },

    #[error(
        "Cannot reset {name} while invoking it. Move the call to reset_history outside of the callback."
    )]
    InvalidReset { name: String },

    #[error("Not enough arguments: {required} required but only {present} present")]
    NotEnoughArguments { required: usize, present: usize },

    #[error("{}", describe_thrown(.0))]
    Thrown(Value),
}

impl Error {
    /// Raise an arbitrary value, the way user code throws.
    pub fn throw(value: impl Into<Value>) -> Self {
        Error::Thrown(value.into())
    }

    /// Shorthand for throwing an error-like object with `name` and `message`.
    pub fn throw_error(name: &str, message: &str) -> Self {
        Error::Thrown(Value::error(name, message))
    }

    pub(crate) fn no_callback(
        name: String,
        property: Option<&PropertyKey>,
        received: Vec<String>,
    ) -> Self {
        Error::NoMatchingCallback {
            name,
            property: property.map(ToString::to_string),
            received,
        }
    }

    /// The exception type name, as matched by `threw("TypeError")` and shown in
    /// rendered calls.
    pub fn name(&self) -> Cow<'_, str> {
        match self {
            Error::InvalidArgument(_) => Cow::Borrowed("InvalidArgumentException"),
            Error::TypeError(_) | Error::NotCallable { .. } => Cow::Borrowed("TypeError"),
            Error::NotInvokedYet { .. } => Cow::Borrowed("NotInvokedYet"),
            Error::NoMatchingCallback { .. } => Cow::Borrowed("NoMatchingCallback"),
            Error::InvalidReset { .. } => Cow::Borrowed("InvalidResetException"),
            Error::NotEnoughArguments { .. } => Cow::Borrowed("NotEnoughArguments"),
            Error::Thrown(value) => thrown_name(value),
        }
    }

    /// The human readable part of the exception, empty when a thrown value
    /// carries no message.
    pub fn message(&self) -> String {
        match self {
            Error::Thrown(value) => value
                .as_object()
                .and_then(|object| object.get("message"))
                .and_then(|message| message.as_str().map(str::to_owned))
                .unwrap_or_default(),
            other => other.to_string(),
        }
    }

    /// The raised value when the error came from user code.
    pub fn thrown_value(&self) -> Option<&Value> {
        match self {
            Error::Thrown(value) => Some(value),
            _ => None,
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidArgument(a), Self::InvalidArgument(b)) => a == b,
            (Self::TypeError(a), Self::TypeError(b)) => a == b,
            (
                Self::NotInvokedYet { name: n1, action: a1 },
                Self::NotInvokedYet { name: n2, action: a2 },
            ) => n1 == n2 && a1 == a2,
            (
                Self::NotCallable {
                    name: n1,
                    position: p1,
                    actual: a1,
                },
                Self::NotCallable {
                    name: n2,
                    position: p2,
                    actual: a2,
                },
            ) => n1 == n2 && p1 == p2 && a1 == a2,
            (
                Self::NoMatchingCallback {
                    name: n1,
                    property: p1,
                    received: r1,
                },
                Self::NoMatchingCallback {
                    name: n2,
                    property: p2,
                    received: r2,
                },
            ) => n1 == n2 && p1 == p2 && r1 == r2,
            (Self::InvalidReset { name: a }, Self::InvalidReset { name: b }) => a == b,
            (
                Self::NotEnoughArguments {
                    required: r1,
                    present: p1,
                },
                Self::NotEnoughArguments {
                    required: r2,
                    present: p2,
                },
            ) => r1 == r2 && p1 == p2,
            (Self::Thrown(a), Self::Thrown(b)) => Value::same(a, b),
            _ => false,
        }
    }
}

fn thrown_name(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Object(object) => object
            .get("name")
            .and_then(|name| name.as_str().map(|s| Cow::Owned(s.to_owned())))
            .or_else(|| object.class_name().map(|class| Cow::Owned(class.to_owned())))
            .unwrap_or(Cow::Borrowed("Error")),
        Value::String(s) => Cow::Borrowed(&**s),
        other => Cow::Borrowed(other.type_name()),
    }
}

fn describe_thrown(value: &Value) -> String {
    match value.as_object().and_then(|object| object.get("message")) {
        Some(Value::String(message)) => format!("{}: {}", thrown_name(value), message),
        _ => DefaultFormatter.format(value),
    }
}

fn no_callback_message(name: &str, property: &Option<String>, received: &[String]) -> String {
    let mut message = match property {
        Some(property) => format!("{name} cannot yield to '{property}' since no callback was passed."),
        None => format!("{name} cannot yield since no callback was passed."),
    };
    if !received.is_empty() {
        message.push_str(&format!(" Received [{}]", received.join(", ")));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Object;

    #[test]
    fn not_invoked_yet_names_the_spy() {
        let err = Error::NotInvokedYet {
            name: "someMethod".into(),
            action: "call arg".into(),
        };
        assert_eq!(
            err.to_string(),
            "someMethod cannot call arg since it was not yet invoked."
        );
    }

    #[test]
    fn no_callback_without_arguments_has_no_received_suffix() {
        let err = Error::no_callback("spy".into(), None, vec![]);
        assert_eq!(err.to_string(), "spy cannot yield since no callback was passed.");
    }

    #[test]
    fn no_callback_lists_received_arguments() {
        let key = PropertyKey::from("success");
        let err = Error::no_callback(
            "somethingAwesome".into(),
            Some(&key),
            vec!["23".into(), "42".into()],
        );
        assert_eq!(
            err.to_string(),
            "somethingAwesome cannot yield to 'success' since no callback was passed. Received [23, 42]"
        );
    }

    #[test]
    fn thrown_error_object_reports_name_and_message() {
        let err = Error::throw_error("TypeError", "Oh noes!");
        assert_eq!(err.name(), "TypeError");
        assert_eq!(err.message(), "Oh noes!");
        assert_eq!(err.to_string(), "TypeError: Oh noes!");
    }

    #[test]
    fn thrown_instance_without_name_uses_class() {
        let err = Error::throw(Object::with_class("CustomError"));
        assert_eq!(err.name(), "CustomError");
        assert_eq!(err.message(), "");
    }

    #[test]
    fn thrown_values_compare_by_identity() {
        let value = Value::from(Object::new());
        let a = Error::throw(value.clone());
        let b = Error::throw(value);
        let c = Error::throw(Object::new());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn library_errors_have_taxonomy_names() {
        assert_eq!(Error::TypeError("x".into()).name(), "TypeError");
        assert_eq!(
            Error::InvalidReset { name: "spy".into() }.name(),
            "InvalidResetException"
        );
        assert_eq!(
            Error::InvalidArgument("x".into()).name(),
            "InvalidArgumentException"
        );
    }
}
