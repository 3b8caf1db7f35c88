use std::{fmt, rc::Rc};

use crate::{
    Config, Error, Function, Invocation, Object, PropertyKey, Result, Sequencer, Spy, Value,
};

/// Creates spies that share one call order.
///
/// The tracker owns the [`Sequencer`] behind every call id and the
/// [`Config`] every spy consults. Spies from the same tracker can be
/// compared with `called_before`, `called_immediately_after` and friends;
/// spies from different trackers live in unrelated orders.
///
/// # Example
///
/// ```rust
/// use callspy::{Object, Tracker, Value, args};
///
/// let tracker = Tracker::new();
/// let first = tracker.spy();
/// let second = tracker.spy();
///
/// first.call(args![]).unwrap();
/// second.call(args![]).unwrap();
/// assert!(first.called_immediately_before(&second));
///
/// // Replace a method for the duration of a test
/// let api = Object::new().with("save", callspy::Function::noop());
/// let installed = tracker.spy_method(&api, "save").unwrap();
/// api.get("save").unwrap().as_function().unwrap().call(&Value::Undefined, &[]).unwrap();
/// assert!(installed.spy().called_once());
/// installed.restore();
/// ```
#[derive(Clone, Default)]
pub struct Tracker {
    sequencer: Sequencer,
    config: Rc<Config>,
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("last_call_id", &self.sequencer.last_call_id())
            .field("config", &self.config)
            .finish()
    }
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            sequencer: Sequencer::new(),
            config: Rc::new(config),
        }
    }

    /// An anonymous spy around a function that returns `undefined`.
    pub fn spy(&self) -> Spy {
        self.wrap(Function::noop())
    }

    /// An anonymous spy around `body`.
    pub fn spy_fn<F>(&self, body: F) -> Spy
    where
        F: Fn(Invocation<'_>) -> Result<Value> + 'static,
    {
        self.wrap(Function::new(body))
    }

    /// A spy around an existing function. The spy reports the function's
    /// name and arity, and [`Spy::as_function`] mirrors its own properties.
    pub fn wrap(&self, function: Function) -> Spy {
        Spy::new(function, self.sequencer.clone(), Rc::clone(&self.config))
    }

    /// Replace the function stored under `key` with a spy around it.
    ///
    /// The spy is named after the property. The returned [`Installation`]
    /// puts the original back on [`restore`](Installation::restore) or when
    /// dropped.
    ///
    /// Fails with [`Error::InvalidArgument`] when the property is missing or
    /// not a function.
    pub fn spy_method(&self, object: &Object, key: impl Into<PropertyKey>) -> Result<Installation> {
        let key = key.into();
        let original = match object.get(&key) {
            Some(Value::Function(original)) => original,
            Some(other) => {
                return Err(Error::InvalidArgument(format!(
                    "Attempted to wrap {} property {key} as function",
                    other.type_name()
                )));
            }
            None => {
                return Err(Error::InvalidArgument(format!(
                    "Attempted to wrap undefined property {key} as function"
                )));
            }
        };

        let spy = self.wrap(original.clone()).named(&key.to_string());
        object.set(&key, &spy);
        tracing::debug!(spy = %spy.id(), property = %key, "method replaced");
        Ok(Installation {
            spy,
            object: object.clone(),
            key,
            original: Some(original),
        })
    }

    /// The sequencer issuing call ids for every spy of this tracker.
    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// A spy installed in place of an object's method.
///
/// Restores the original function on [`restore`](Self::restore) or drop.
#[derive(Debug)]
pub struct Installation {
    spy: Spy,
    object: Object,
    key: PropertyKey,
    original: Option<Function>,
}

impl Installation {
    pub fn spy(&self) -> &Spy {
        &self.spy
    }

    /// Put the original function back.
    pub fn restore(mut self) {
        self.put_back();
    }

    fn put_back(&mut self) {
        if let Some(original) = self.original.take() {
            self.object.set(&self.key, original);
            tracing::debug!(spy = %self.spy.id(), property = %self.key, "method restored");
        }
    }
}

impl Drop for Installation {
    fn drop(&mut self) {
        self.put_back();
    }
}
