use std::{
    cell::{Ref, RefCell},
    fmt,
    rc::Rc,
};

use crate::{
    Function, Matcher,
    format::{DefaultFormatter, ValueFormatter},
};

/// A dynamically typed value passed to, returned from, or thrown by a tracked
/// callable.
///
/// Primitive variants are compared by value. `Array`, `Object`, `Function`,
/// `Symbol` and `Matcher` are reference types: cloning a `Value` clones the
/// reference, so a recorded call keeps the very object the caller passed and
/// observes any later mutation of it.
///
/// # Example
///
/// ```rust
/// use callspy::{Object, Value};
///
/// let payload = Object::new().with("id", 42);
/// let value = Value::from(payload.clone());
///
/// assert_eq!(value.type_name(), "object");
/// assert!(Value::same(&value, &Value::from(payload)));
/// assert!(!Value::same(&value, &Value::from(Object::new().with("id", 42))));
/// ```
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Symbol(Symbol),
    Array(Array),
    Object(Object),
    Function(Function),
    Matcher(Matcher),
}

impl Value {
    /// Build an error-like object carrying `name` and `message`, with `name`
    /// doubling as its class.
    pub fn error(name: &str, message: &str) -> Self {
        Value::Object(
            Object::with_class(name)
                .with("name", name)
                .with("message", message),
        )
    }

    /// Runtime type name, as shown in "but was number" style messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Array(_) | Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::Matcher(_) => "matcher",
        }
    }

    /// Identity comparison: reference equality for reference types,
    /// SameValueZero for primitives.
    pub fn same(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
            (Value::String(x), Value::String(y)) => x == y,
            (Value::Symbol(x), Value::Symbol(y)) => x == y,
            (Value::Array(x), Value::Array(y)) => x.ptr_eq(y),
            (Value::Object(x), Value::Object(y)) => x.ptr_eq(y),
            (Value::Function(x), Value::Function(y)) => x.ptr_eq(y),
            (Value::Matcher(x), Value::Matcher(y)) => x.ptr_eq(y),
            _ => false,
        }
    }

    #[inline]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    #[inline]
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// True for values a constructor may hand back in place of the fresh
    /// instance.
    #[inline]
    pub fn is_object_like(&self) -> bool {
        matches!(
            self,
            Value::Object(_) | Value::Array(_) | Value::Function(_)
        )
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_matcher(&self) -> Option<&Matcher> {
        match self {
            Value::Matcher(matcher) => Some(matcher),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Address of the shared allocation behind a reference type, used for
    /// cycle detection while walking object graphs.
    pub(crate) fn address(&self) -> Option<usize> {
        match self {
            Value::Array(array) => Some(Rc::as_ptr(&array.0) as *const () as usize),
            Value::Object(object) => Some(Rc::as_ptr(&object.0) as *const () as usize),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&DefaultFormatter.format(self))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&DefaultFormatter.format(self))
    }
}

// ==================== Symbol ====================

/// A unique property key or value, compared by identity.
#[derive(Clone)]
pub struct Symbol(Rc<str>);

impl Symbol {
    pub fn new(description: &str) -> Self {
        Self(Rc::from(description))
    }

    pub fn description(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

/// An own-property key: a string or a [`Symbol`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKey {
    String(Rc<str>),
    Symbol(Symbol),
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => f.write_str(s),
            PropertyKey::Symbol(symbol) => write!(f, "{symbol}"),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::String(Rc::from(s))
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        PropertyKey::String(Rc::from(s))
    }
}

impl From<Symbol> for PropertyKey {
    fn from(symbol: Symbol) -> Self {
        PropertyKey::Symbol(symbol)
    }
}

impl From<&Symbol> for PropertyKey {
    fn from(symbol: &Symbol) -> Self {
        PropertyKey::Symbol(symbol.clone())
    }
}

impl From<&PropertyKey> for PropertyKey {
    fn from(key: &PropertyKey) -> Self {
        key.clone()
    }
}

// ==================== Array ====================

/// A shared, mutable sequence of values.
#[derive(Clone, Default)]
pub struct Array(Rc<RefCell<Vec<Value>>>);

impl Array {
    pub fn new(values: Vec<Value>) -> Self {
        Self(Rc::new(RefCell::new(values)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    pub fn push(&self, value: impl Into<Value>) {
        self.0.borrow_mut().push(value.into());
    }

    /// Borrow the elements. Do not hold the guard across calls that may
    /// mutate this array.
    pub fn borrow(&self) -> Ref<'_, Vec<Value>> {
        self.0.borrow()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Array) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&DefaultFormatter.format(&Value::Array(self.clone())))
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Array::new(iter.into_iter().collect())
    }
}

// ==================== Object ====================

struct ObjectData {
    class: Option<Rc<str>>,
    properties: RefCell<Vec<(PropertyKey, Value)>>,
}

/// A shared, mutable bag of own properties in insertion order, optionally
/// tagged with a class name (constructor instances, error values).
#[derive(Clone)]
pub struct Object(Rc<ObjectData>);

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl Object {
    pub fn new() -> Self {
        Self(Rc::new(ObjectData {
            class: None,
            properties: RefCell::new(Vec::new()),
        }))
    }

    pub fn with_class(class: &str) -> Self {
        Self(Rc::new(ObjectData {
            class: Some(Rc::from(class)),
            properties: RefCell::new(Vec::new()),
        }))
    }

    /// Builder-style property insertion.
    pub fn with(self, key: impl Into<PropertyKey>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn class_name(&self) -> Option<&str> {
        self.0.class.as_deref()
    }

    pub fn get(&self, key: impl Into<PropertyKey>) -> Option<Value> {
        let key = key.into();
        self.0
            .properties
            .borrow()
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
    }

    pub fn has_own(&self, key: impl Into<PropertyKey>) -> bool {
        let key = key.into();
        self.0.properties.borrow().iter().any(|(k, _)| *k == key)
    }

    /// Insert or overwrite a property, keeping the original position of an
    /// existing key.
    pub fn set(&self, key: impl Into<PropertyKey>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        let mut properties = self.0.properties.borrow_mut();
        match properties.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => properties.push((key, value)),
        }
    }

    pub fn remove(&self, key: impl Into<PropertyKey>) -> Option<Value> {
        let key = key.into();
        let mut properties = self.0.properties.borrow_mut();
        let index = properties.iter().position(|(k, _)| *k == key)?;
        Some(properties.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.0.properties.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.properties.borrow().is_empty()
    }

    pub fn keys(&self) -> Vec<PropertyKey> {
        self.0
            .properties
            .borrow()
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Snapshot of all own properties.
    pub fn entries(&self) -> Vec<(PropertyKey, Value)> {
        self.0.properties.borrow().clone()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&DefaultFormatter.format(&Value::Object(self.clone())))
    }
}

// ==================== Conversions ====================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! impl_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Number(n as f64)
                }
            }
        )*
    };
}

impl_from_number!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Undefined
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Undefined, Into::into)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::Array(Array::new(values))
    }
}

impl From<&Value> for Value {
    fn from(value: &Value) -> Self {
        value.clone()
    }
}

macro_rules! impl_from_reference {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Value {
                fn from(value: $variant) -> Self {
                    Value::$variant(value)
                }
            }

            impl From<&$variant> for Value {
                fn from(value: &$variant) -> Self {
                    Value::$variant(value.clone())
                }
            }
        )*
    };
}

impl_from_reference!(Symbol, Array, Object, Function, Matcher);

impl From<PropertyKey> for Value {
    fn from(key: PropertyKey) -> Self {
        match key {
            PropertyKey::String(s) => Value::String(s),
            PropertyKey::Symbol(symbol) => Value::Symbol(symbol),
        }
    }
}
