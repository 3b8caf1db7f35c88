use std::{collections::HashSet, fmt::Write};

use crate::{Object, PropertyKey, Value};

/// Renders values for call rendering and error messages.
///
/// Implementations must not fail or panic, whatever the object graph looks
/// like.
pub trait ValueFormatter {
    fn format(&self, value: &Value) -> String;
}

/// Default [`ValueFormatter`]: `'str'`, `42`, `[1, 2]`, `{ id: 42 }`,
/// `[Function: name]`, `[Circular]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFormatter;

impl ValueFormatter for DefaultFormatter {
    fn format(&self, value: &Value) -> String {
        let mut out = String::new();
        write_value(&mut out, value, &mut HashSet::new());
        out
    }
}

/// Formats each value and joins them with `", "`.
pub(crate) fn join(formatter: &dyn ValueFormatter, values: &[Value]) -> String {
    values
        .iter()
        .map(|value| formatter.format(value))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_owned()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned()
    } else if n == 0.0 {
        "0".to_owned()
    } else if (1e-6..1e21).contains(&n.abs()) {
        n.to_string()
    } else {
        let exp = format!("{n:e}");
        match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
            _ => exp,
        }
    }
}

fn write_value(out: &mut String, value: &Value, seen: &mut HashSet<usize>) {
    if let Some(address) = value.address() {
        if !seen.insert(address) {
            out.push_str("[Circular]");
            return;
        }
    }
    match value {
        Value::Undefined => out.push_str("undefined"),
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&number(*n)),
        Value::String(s) => {
            let _ = write!(out, "'{s}'");
        }
        Value::Symbol(symbol) => {
            let _ = write!(out, "{symbol}");
        }
        Value::Function(function) => match function.name() {
            Some(name) => {
                let _ = write!(out, "[Function: {name}]");
            }
            None => out.push_str("[Function (anonymous)]"),
        },
        Value::Matcher(matcher) => out.push_str(matcher.description()),
        Value::Array(array) => {
            out.push('[');
            for (i, item) in array.to_vec().iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item, seen);
            }
            out.push(']');
        }
        Value::Object(object) => write_object(out, object, seen),
    }
    if let Some(address) = value.address() {
        seen.remove(&address);
    }
}

fn write_object(out: &mut String, object: &Object, seen: &mut HashSet<usize>) {
    if let Some(class) = object.class_name().filter(|class| *class != "Object") {
        out.push_str(class);
        out.push(' ');
    }
    let entries = object.entries();
    if entries.is_empty() {
        out.push_str("{}");
        return;
    }
    out.push_str("{ ");
    for (i, (key, value)) in entries.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        match key {
            PropertyKey::String(name) => out.push_str(name),
            PropertyKey::Symbol(symbol) => {
                let _ = write!(out, "[{symbol}]");
            }
        }
        out.push_str(": ");
        write_value(out, value, seen);
    }
    out.push_str(" }");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Array, Function, Matcher, Symbol};

    fn fmt(value: impl Into<Value>) -> String {
        DefaultFormatter.format(&value.into())
    }

    #[test]
    fn primitives() {
        assert_eq!(fmt(Value::Undefined), "undefined");
        assert_eq!(fmt(Value::Null), "null");
        assert_eq!(fmt(true), "true");
        assert_eq!(fmt(42), "42");
        assert_eq!(fmt(1.5), "1.5");
        assert_eq!(fmt(-0.0), "0");
        assert_eq!(fmt(f64::NAN), "NaN");
        assert_eq!(fmt(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(fmt("Hey"), "'Hey'");
        assert_eq!(fmt(Symbol::new("apple pie")), "Symbol(apple pie)");
    }

    #[test]
    fn extreme_magnitudes_use_exponents() {
        assert_eq!(fmt(1e21), "1e+21");
        assert_eq!(fmt(1.5e300), "1.5e+300");
        assert_eq!(fmt(-2e25), "-2e+25");
        assert_eq!(fmt(1e20), "100000000000000000000");
        assert_eq!(fmt(0.000001), "0.000001");
        assert_eq!(fmt(1.5e-7), "1.5e-7");
    }

    #[test]
    fn containers() {
        assert_eq!(fmt(vec![1.into(), "a".into()]), "[1, 'a']");
        assert_eq!(fmt(Object::new()), "{}");
        assert_eq!(fmt(Object::new().with("id", 42)), "{ id: 42 }");
        assert_eq!(
            fmt(Object::with_class("Point").with("x", 1)),
            "Point { x: 1 }"
        );
        let key = Symbol::new("k");
        assert_eq!(fmt(Object::new().with(&key, 1)), "{ [Symbol(k)]: 1 }");
    }

    #[test]
    fn functions_and_matchers() {
        assert_eq!(fmt(Function::named("doIt", |_| Ok(Value::Undefined))), "[Function: doIt]");
        assert_eq!(fmt(Function::noop()), "[Function (anonymous)]");
        assert_eq!(fmt(Matcher::any()), "any");
    }

    #[test]
    fn cycles_render_as_circular() {
        let object = Object::new();
        object.set("me", &object);
        assert_eq!(fmt(&object), "{ me: [Circular] }");

        let array = Array::new(vec![1.into()]);
        array.push(&array);
        assert_eq!(fmt(&array), "[1, [Circular]]");
    }

    #[test]
    fn shared_but_acyclic_references_render_twice() {
        let inner = Object::new().with("a", 1);
        let outer = Array::new(vec![(&inner).into(), (&inner).into()]);
        assert_eq!(fmt(outer), "[{ a: 1 }, { a: 1 }]");
    }

    #[test]
    fn join_separates_with_commas() {
        assert_eq!(join(&DefaultFormatter, &[42.into(), "Hey".into()]), "42, 'Hey'");
        assert_eq!(join(&DefaultFormatter, &[]), "");
    }
}
