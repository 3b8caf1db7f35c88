use std::{cell::RefCell, fmt, rc::Rc};

use crate::{Object, PropertyKey, Result, Value};

type Body = dyn Fn(Invocation<'_>) -> Result<Value>;

/// The receiver, arguments and call form of a single invocation, as seen by a
/// callable's body.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub this: &'a Value,
    pub args: &'a [Value],
    /// True when invoked through [`Function::construct`].
    pub constructing: bool,
}

impl Invocation<'_> {
    /// The argument at `index`, or `undefined` when fewer were passed.
    pub fn arg(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or_default()
    }
}

struct FunctionData {
    name: RefCell<Option<String>>,
    length: usize,
    properties: Object,
    body: Box<Body>,
}

/// A reference-counted callable value.
///
/// Carries a name, an arity and own properties next to its body so that a
/// tracked wrapper can mirror all three. Clones share the same callable and
/// compare equal under [`Function::ptr_eq`].
///
/// # Example
///
/// ```rust
/// use callspy::{Function, Value};
///
/// let add = Function::builder()
///     .name("add")
///     .length(2)
///     .build(|inv| {
///         let a = inv.arg(0).as_number().unwrap_or_default();
///         let b = inv.arg(1).as_number().unwrap_or_default();
///         Ok(Value::from(a + b))
///     });
///
/// let sum = add.call(&Value::Undefined, &[1.into(), 2.into()]).unwrap();
/// assert_eq!(sum.as_number(), Some(3.0));
/// assert_eq!(add.length(), 2);
/// ```
#[derive(Clone)]
pub struct Function(Rc<FunctionData>);

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name())
            .field("length", &self.0.length)
            .finish_non_exhaustive()
    }
}

impl Function {
    /// An anonymous callable with arity 0.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(Invocation<'_>) -> Result<Value> + 'static,
    {
        FunctionBuilder::default().build(body)
    }

    /// A named callable with arity 0.
    pub fn named<F>(name: &str, body: F) -> Self
    where
        F: Fn(Invocation<'_>) -> Result<Value> + 'static,
    {
        FunctionBuilder::default().name(name).build(body)
    }

    /// A callable that ignores its input and returns `undefined`.
    pub fn noop() -> Self {
        Function::new(|_| Ok(Value::Undefined))
    }

    pub fn builder() -> FunctionBuilder {
        FunctionBuilder::default()
    }

    /// The declared or inferred name. Empty names count as absent.
    pub fn name(&self) -> Option<String> {
        self.0
            .name
            .borrow()
            .as_ref()
            .filter(|name| !name.is_empty())
            .cloned()
    }

    pub(crate) fn set_name(&self, name: &str) {
        *self.0.name.borrow_mut() = Some(name.to_owned());
    }

    /// Declared arity.
    pub fn length(&self) -> usize {
        self.0.length
    }

    /// Own enumerable properties attached to the callable.
    pub fn properties(&self) -> &Object {
        &self.0.properties
    }

    /// Plain call with an explicit receiver.
    pub fn call(&self, this: &Value, args: &[Value]) -> Result<Value> {
        self.invoke(Invocation {
            this,
            args,
            constructing: false,
        })
    }

    /// Constructor call: the body receives a fresh instance as `this` and the
    /// instance is the result unless the body returns an object of its own.
    pub fn construct(&self, args: &[Value]) -> Result<Value> {
        let class = self.name().unwrap_or_else(|| "Object".to_owned());
        let instance = Value::Object(Object::with_class(&class));
        let returned = self.invoke(Invocation {
            this: &instance,
            args,
            constructing: true,
        })?;
        Ok(if returned.is_object_like() {
            returned
        } else {
            instance
        })
    }

    pub(crate) fn invoke(&self, invocation: Invocation<'_>) -> Result<Value> {
        (self.0.body)(invocation)
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Builder for [`Function`] values with a name, arity or own properties.
#[derive(Debug, Default)]
pub struct FunctionBuilder {
    name: Option<String>,
    length: usize,
    properties: Vec<(PropertyKey, Value)>,
}

impl FunctionBuilder {
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }

    pub fn length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    pub fn property(mut self, key: impl Into<PropertyKey>, value: impl Into<Value>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    pub fn build<F>(self, body: F) -> Function
    where
        F: Fn(Invocation<'_>) -> Result<Value> + 'static,
    {
        let properties = Object::new();
        for (key, value) in self.properties {
            properties.set(key, value);
        }
        Function(Rc::new(FunctionData {
            name: RefCell::new(self.name),
            length: self.length,
            properties,
            body: Box::new(body),
        }))
    }
}
