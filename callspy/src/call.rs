use std::{
    fmt,
    panic::Location,
    rc::{Rc, Weak},
};

use crate::{
    CallId, Config, Error, PropertyKey, Result, Value,
    equality::Equality,
    format,
    matcher::Expected,
    spy::SpyState,
};

struct CallData {
    call_id: CallId,
    this_value: Value,
    args: Vec<Value>,
    outcome: Result<Value>,
    constructing: bool,
    call_site: Option<&'static Location<'static>>,
    owner: Option<Weak<SpyState>>,
    config: Rc<Config>,
}

/// A record of a single invocation of a tracked function.
///
/// Immutable once built. Clones share the record: the same `Call` is visible
/// through the parent spy and every filtered view that matched it.
///
/// # Example
///
/// ```rust
/// use callspy::{Tracker, args};
///
/// let tracker = Tracker::new();
/// let spy = tracker.spy();
/// spy.call(args![42, "Hey"]).unwrap();
///
/// let call = spy.first_call().unwrap();
/// assert!(call.called_with(&args![42]));
/// assert!(!call.called_with_exactly(&args![42]));
/// assert_eq!(call.last_arg().as_str(), Some("Hey"));
/// ```
#[derive(Clone)]
pub struct Call(Rc<CallData>);

impl Call {
    pub fn builder() -> CallBuilder {
        CallBuilder::default()
    }

    // ==================== Recorded data ====================

    /// Position in the total order of calls.
    #[inline]
    pub fn call_id(&self) -> CallId {
        self.0.call_id
    }

    /// The receiver. For constructor calls, the instance handed to the body.
    #[inline]
    pub fn this_value(&self) -> &Value {
        &self.0.this_value
    }

    #[inline]
    pub fn args(&self) -> &[Value] {
        &self.0.args
    }

    pub fn first_arg(&self) -> Value {
        self.0.args.first().cloned().unwrap_or_default()
    }

    pub fn last_arg(&self) -> Value {
        self.0.args.last().cloned().unwrap_or_default()
    }

    /// The last argument when it is a function, else `undefined`.
    pub fn callback(&self) -> Value {
        match self.0.args.last() {
            Some(last @ Value::Function(_)) => last.clone(),
            _ => Value::Undefined,
        }
    }

    /// The returned value, `undefined` when the call threw.
    pub fn return_value(&self) -> Value {
        self.0.outcome.as_ref().cloned().unwrap_or_default()
    }

    pub fn exception(&self) -> Option<&Error> {
        self.0.outcome.as_ref().err()
    }

    /// Where the tracked function was called from, when captured.
    pub fn call_site(&self) -> Option<&'static Location<'static>> {
        self.0.call_site
    }

    pub fn called_with_new(&self) -> bool {
        self.0.constructing
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Call) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Display name of the owning spy, or the configured fallback.
    pub fn name(&self) -> String {
        self.0
            .owner
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|owner| owner.display_name())
            .unwrap_or_else(|| self.0.config.default_name().to_owned())
    }

    #[inline]
    fn equality(&self) -> &dyn Equality {
        self.0.config.equality()
    }

    // ==================== Argument queries ====================

    /// True if the receiver is `expected`, or satisfies it when `expected`
    /// is a matcher.
    pub fn called_on(&self, expected: &Value) -> bool {
        match expected {
            Value::Matcher(matcher) => matcher.test(&self.0.this_value),
            other => Value::same(other, &self.0.this_value),
        }
    }

    /// True if every expected position deep-equals (or satisfies) the actual
    /// argument there. Extra actual arguments are ignored.
    pub fn called_with(&self, expected: &[Value]) -> bool {
        let equality = self.equality();
        expected.iter().enumerate().all(|(i, e)| {
            let actual = self.0.args.get(i).unwrap_or(&Value::Undefined);
            Expected::classify(e).accepts(actual, equality)
        })
    }

    /// Like [`called_with`](Self::called_with) with every literal compared as
    /// a deep partial match.
    pub fn called_with_match(&self, expected: &[Value]) -> bool {
        let equality = self.equality();
        expected.iter().enumerate().all(|(i, e)| {
            let actual = self.0.args.get(i).unwrap_or(&Value::Undefined);
            equality.matches(e, actual)
        })
    }

    pub fn not_called_with(&self, expected: &[Value]) -> bool {
        !self.called_with(expected)
    }

    pub fn not_called_with_match(&self, expected: &[Value]) -> bool {
        !self.called_with_match(expected)
    }

    /// Like [`called_with`](Self::called_with) but the argument count must
    /// match too.
    pub fn called_with_exactly(&self, expected: &[Value]) -> bool {
        self.0.args.len() == expected.len() && self.called_with(expected)
    }

    // ==================== Outcome queries ====================

    pub fn threw(&self) -> bool {
        self.0.outcome.is_err()
    }

    /// A string matches the exception's type name or a thrown string; any
    /// other value matches the thrown value by identity or deep equality.
    pub fn threw_with(&self, expected: impl Into<Value>) -> bool {
        let Err(error) = &self.0.outcome else {
            return false;
        };
        match expected.into() {
            Value::String(name) => {
                error.name() == *name
                    || error.thrown_value().and_then(Value::as_str) == Some(&*name)
            }
            expected => error.thrown_value().is_some_and(|thrown| {
                Value::same(&expected, thrown) || self.equality().deep_equal(&expected, thrown)
            }),
        }
    }

    pub fn returned(&self) -> bool {
        self.0.outcome.is_ok()
    }

    /// Deep equality against the return value. Use [`Matcher::same`] to
    /// require the very same reference.
    ///
    /// [`Matcher::same`]: crate::Matcher::same
    pub fn returned_with(&self, expected: impl Into<Value>) -> bool {
        self.equality()
            .deep_equal(&expected.into(), &self.return_value())
    }

    // ==================== Ordering ====================

    pub fn called_before(&self, other: &Call) -> bool {
        self.call_id() < other.call_id()
    }

    pub fn called_after(&self, other: &Call) -> bool {
        self.call_id() > other.call_id()
    }

    /// True when no other call happened between this one and `other`.
    pub fn called_immediately_before(&self, other: &Call) -> bool {
        self.call_id().precedes(other.call_id())
    }

    pub fn called_immediately_after(&self, other: &Call) -> bool {
        other.call_id().precedes(self.call_id())
    }

    // ==================== Callback helpers ====================

    /// Invoke the argument at `index` with no arguments.
    ///
    /// Fails with [`Error::TypeError`] when `index` is not a non-negative
    /// integer and with [`Error::NotCallable`] when the argument there is
    /// not a function. Errors raised by the callback propagate unchanged.
    pub fn call_arg(&self, index: impl Into<Value>) -> Result<Value> {
        self.call_arg_on_with(index, &Value::Undefined, &[])
    }

    pub fn call_arg_on(&self, index: impl Into<Value>, this: &Value) -> Result<Value> {
        self.call_arg_on_with(index, this, &[])
    }

    pub fn call_arg_with(&self, index: impl Into<Value>, args: &[Value]) -> Result<Value> {
        self.call_arg_on_with(index, &Value::Undefined, args)
    }

    pub fn call_arg_on_with(
        &self,
        index: impl Into<Value>,
        this: &Value,
        args: &[Value],
    ) -> Result<Value> {
        let position = arg_position(&index.into())?;
        match self.0.args.get(position) {
            Some(Value::Function(callback)) => callback.call(this, args),
            other => Err(Error::NotCallable {
                name: self.name(),
                position,
                actual: other.unwrap_or(&Value::Undefined).type_name(),
            }),
        }
    }

    /// Invoke the first function argument with `args`.
    pub fn r#yield(&self, args: &[Value]) -> Result<Value> {
        self.yield_on(&Value::Undefined, args)
    }

    /// Alias of [`yield`](Self::yield).
    pub fn invoke_callback(&self, args: &[Value]) -> Result<Value> {
        self.yield_on(&Value::Undefined, args)
    }

    pub fn yield_on(&self, this: &Value, args: &[Value]) -> Result<Value> {
        match self.0.args.iter().find_map(Value::as_function) {
            Some(callback) => callback.call(this, args),
            None => Err(Error::no_callback(self.name(), None, self.received())),
        }
    }

    /// Invoke the function stored under `property` on the first argument that
    /// carries one.
    pub fn yield_to(&self, property: impl Into<PropertyKey>, args: &[Value]) -> Result<Value> {
        self.yield_to_on(property, &Value::Undefined, args)
    }

    pub fn yield_to_on(
        &self,
        property: impl Into<PropertyKey>,
        this: &Value,
        args: &[Value],
    ) -> Result<Value> {
        let property = property.into();
        let callback = self.0.args.iter().find_map(|arg| {
            let properties = match arg {
                Value::Object(object) => object,
                Value::Function(function) => function.properties(),
                _ => return None,
            };
            match properties.get(&property) {
                Some(Value::Function(callback)) => Some(callback),
                _ => None,
            }
        });
        match callback {
            Some(callback) => callback.call(this, args),
            None => Err(Error::no_callback(
                self.name(),
                Some(&property),
                self.received(),
            )),
        }
    }

    fn received(&self) -> Vec<String> {
        let formatter = self.0.config.formatter();
        self.0.args.iter().map(|arg| formatter.format(arg)).collect()
    }
}

/// Interpret a dynamic value as an argument position.
pub(crate) fn arg_position(index: &Value) -> Result<usize> {
    match index {
        Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= usize::MAX as f64 => {
            Ok(*n as usize)
        }
        _ => Err(Error::TypeError("argument index is not a number.".into())),
    }
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("call_id", &self.0.call_id)
            .field("this_value", &self.0.this_value)
            .field("args", &self.0.args)
            .field("outcome", &self.0.outcome)
            .field("constructing", &self.0.constructing)
            .finish_non_exhaustive()
    }
}

/// `name(args)[ => ret][ !Name(message)][ at file:line:col]`
impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatter = self.0.config.formatter();
        write!(f, "{}({})", self.name(), format::join(formatter, &self.0.args))?;
        match &self.0.outcome {
            Ok(Value::Undefined) => {}
            Ok(value) => write!(f, " => {}", formatter.format(value))?,
            Err(error) => {
                write!(f, " !{}", error.name())?;
                let message = error.message();
                if !message.is_empty() {
                    write!(f, "({message})")?;
                }
            }
        }
        if let Some(site) = self.0.call_site {
            write!(f, " at {}:{}:{}", site.file(), site.line(), site.column())?;
        }
        Ok(())
    }
}

/// Builder for [`Call`] records.
///
/// A call id is mandatory: [`build`](Self::build) fails with
/// [`Error::InvalidArgument`] without one.
pub struct CallBuilder {
    call_id: Option<CallId>,
    this_value: Value,
    args: Vec<Value>,
    outcome: Result<Value>,
    constructing: bool,
    call_site: Option<&'static Location<'static>>,
    owner: Option<Weak<SpyState>>,
    config: Option<Rc<Config>>,
}

impl Default for CallBuilder {
    fn default() -> Self {
        Self {
            call_id: None,
            this_value: Value::Undefined,
            args: Vec::new(),
            outcome: Ok(Value::Undefined),
            constructing: false,
            call_site: None,
            owner: None,
            config: None,
        }
    }
}

impl CallBuilder {
    pub fn call_id(mut self, call_id: impl Into<CallId>) -> Self {
        self.call_id = Some(call_id.into());
        self
    }

    pub fn this_value(mut self, this_value: impl Into<Value>) -> Self {
        self.this_value = this_value.into();
        self
    }

    pub fn args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    /// The terminal outcome: the returned value or the raised error.
    pub fn outcome(mut self, outcome: Result<Value>) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn constructing(mut self, constructing: bool) -> Self {
        self.constructing = constructing;
        self
    }

    pub fn call_site(mut self, call_site: &'static Location<'static>) -> Self {
        self.call_site = Some(call_site);
        self
    }

    pub(crate) fn owner(mut self, owner: Weak<SpyState>) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn config(mut self, config: Rc<Config>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<Call> {
        let call_id = self
            .call_id
            .ok_or_else(|| Error::InvalidArgument("Call id is not a number".into()))?;
        Ok(Call(Rc::new(CallData {
            call_id,
            this_value: self.this_value,
            args: self.args,
            outcome: self.outcome,
            constructing: self.constructing,
            call_site: self.call_site,
            owner: self.owner,
            config: self.config.unwrap_or_default(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Function, Matcher, Object, Symbol, args};

    fn call(id: u64, args: Vec<Value>) -> Call {
        Call::builder().call_id(id).args(args).build().unwrap()
    }

    fn returning(id: u64, value: impl Into<Value>) -> Call {
        Call::builder()
            .call_id(id)
            .outcome(Ok(value.into()))
            .build()
            .unwrap()
    }

    fn throwing(id: u64, error: Error) -> Call {
        Call::builder().call_id(id).outcome(Err(error)).build().unwrap()
    }

    #[test]
    fn build_requires_call_id() {
        let err = Call::builder().args(args![1]).build().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(err.name(), "InvalidArgumentException");
    }

    #[test]
    fn called_on_uses_identity_or_matcher() {
        let receiver = Object::new();
        let call = Call::builder()
            .call_id(1u64)
            .this_value(&receiver)
            .build()
            .unwrap();
        assert!(call.called_on(&Value::from(&receiver)));
        assert!(!call.called_on(&Value::from(Object::new())));
        assert!(call.called_on(&Matcher::type_of("object").into()));
        assert!(!call.called_on(&Matcher::type_of("string").into()));
    }

    #[test]
    fn called_with_ignores_extra_arguments() {
        let call = call(1, args![42, "Hey"]);
        assert!(call.called_with(&args![42]));
        assert!(call.called_with(&args![42, "Hey"]));
        assert!(call.called_with(&[]));
        assert!(!call.called_with(&args![42, "Hey", 1]));
        assert!(call.not_called_with(&args![43]));
    }

    #[test]
    fn called_with_compares_missing_positions_with_undefined() {
        let call = call(1, args![1]);
        assert!(call.called_with(&[1.into(), Value::Undefined]));
        assert!(!call.called_with_exactly(&[1.into(), Value::Undefined]));
    }

    #[test]
    fn called_with_uses_deep_equality_and_matchers() {
        let call = call(1, args![Object::new().with("a", 1), "text"]);
        assert!(call.called_with(&args![Object::new().with("a", 1)]));
        assert!(call.called_with(&args![Matcher::any(), Matcher::type_of("string")]));
        assert!(!call.called_with(&args![Object::new()]));
    }

    #[test]
    fn called_with_compares_functions_by_identity() {
        let f = Function::noop();
        let call = call(1, args![&f]);
        assert!(call.called_with(&args![&f]));
        assert!(!call.called_with(&args![Function::noop()]));
    }

    #[test]
    fn called_with_match_is_partial() {
        let call = call(1, args![Object::new().with("a", 1).with("b", 2), "hello world"]);
        assert!(call.called_with_match(&args![Object::new().with("a", 1), "world"]));
        assert!(!call.called_with(&args![Object::new().with("a", 1)]));
        assert!(call.not_called_with_match(&args![Object::new().with("c", 1)]));
    }

    #[test]
    fn called_with_exactly_requires_same_length() {
        let call = call(1, args![42]);
        assert!(call.called_with_exactly(&args![42]));
        assert!(!call.called_with_exactly(&args![42, 43]));
        assert!(!call.called_with_exactly(&[]));
    }

    #[test]
    fn accessors_for_first_last_and_callback() {
        let f = Function::noop();
        let trailing = call(1, args![1, 2, &f]);
        assert!(Value::same(&trailing.first_arg(), &1.into()));
        assert!(trailing.callback().as_function().unwrap().ptr_eq(&f));

        let leading = call(2, args![&f, 2]);
        assert!(leading.callback().is_undefined());
        assert_eq!(leading.last_arg().as_number(), Some(2.0));

        let empty = call(3, vec![]);
        assert!(empty.first_arg().is_undefined());
        assert!(empty.last_arg().is_undefined());
    }

    #[test]
    fn ordering_follows_call_ids() {
        let a = call(1, vec![]);
        let b = call(2, vec![]);
        let c = call(4, vec![]);
        assert!(a.called_before(&b));
        assert!(c.called_after(&b));
        assert!(a.called_immediately_before(&b));
        assert!(b.called_immediately_after(&a));
        assert!(!b.called_immediately_before(&c));
        assert!(!a.called_immediately_after(&b));
    }

    #[test]
    fn call_arg_invokes_callable_with_receiver_and_args() {
        let receiver = Value::from(Object::new());
        let expected = receiver.clone();
        let callback = Function::new(move |inv| {
            assert!(Value::same(inv.this, &expected));
            Ok(inv.arg(0))
        });
        let call = call(1, args![1, callback]);

        let result = call.call_arg_on_with(1, &receiver, &args!["x"]).unwrap();
        assert_eq!(result.as_str(), Some("x"));
    }

    #[test]
    fn call_arg_rejects_non_integer_index() {
        let call = call(1, args![Function::noop()]);
        assert!(matches!(call.call_arg("0"), Err(Error::TypeError(_))));
        assert!(matches!(call.call_arg(0.5), Err(Error::TypeError(_))));
        assert!(matches!(call.call_arg(-1), Err(Error::TypeError(_))));
    }

    #[test]
    fn call_arg_reports_position_and_actual_type() {
        let call = call(1, args![1]);
        let err = call.call_arg(0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "spy expected argument at position 0 to be a Function, but was number"
        );
        let err = call.call_arg(3).unwrap_err();
        assert!(err.to_string().ends_with("but was undefined"));
    }

    #[test]
    fn call_arg_propagates_callback_errors() {
        let failing = Function::new(|_| Err(Error::throw("boom")));
        let call = call(1, args![failing]);
        assert_eq!(call.call_arg(0).unwrap_err(), Error::throw("boom"));
    }

    #[test]
    fn yield_invokes_first_function() {
        let first = Function::new(|inv| Ok(inv.arg(0)));
        let second = Function::new(|_| Ok("second".into()));
        let call = call(1, args![1, first, second]);
        assert_eq!(call.r#yield(&args!["a"]).unwrap().as_str(), Some("a"));
        assert_eq!(call.invoke_callback(&args!["b"]).unwrap().as_str(), Some("b"));
    }

    #[test]
    fn yield_without_callback_reports_received_arguments() {
        let call = call(1, args![23, 42]);
        assert_eq!(
            call.r#yield(&[]).unwrap_err().to_string(),
            "spy cannot yield since no callback was passed. Received [23, 42]"
        );
    }

    #[test]
    fn yield_to_finds_named_property() {
        let handler = Object::new().with(
            "success",
            Function::new(|inv| Ok(inv.arg(0))),
        );
        let call = call(1, args![1, Object::new().with("success", 2), handler]);
        assert_eq!(call.yield_to("success", &args![7]).unwrap().as_number(), Some(7.0));
    }

    #[test]
    fn yield_to_symbol_without_callback() {
        let key = Symbol::new("apple pie");
        let call = call(1, args![23, 42]);
        assert_eq!(
            call.yield_to(&key, &[]).unwrap_err().to_string(),
            "spy cannot yield to 'Symbol(apple pie)' since no callback was passed. Received [23, 42]"
        );
    }

    #[test]
    fn threw_with_matches_name_value_or_string() {
        let error = Value::error("TypeError", "Oh noes!");
        let call = throwing(1, Error::throw(error.clone()));
        assert!(call.threw());
        assert!(!call.returned());
        assert!(call.threw_with("TypeError"));
        assert!(call.threw_with(error));
        assert!(!call.threw_with("RangeError"));
        assert!(call.return_value().is_undefined());

        let string = throwing(2, Error::throw("oops"));
        assert!(string.threw_with("oops"));

        let ok = returning(3, 1);
        assert!(!ok.threw());
        assert!(!ok.threw_with("TypeError"));
    }

    #[test]
    fn returned_with_uses_deep_equality_unless_same_is_requested() {
        let object = Object::new().with("a", 1);
        let call = returning(1, &object);
        assert!(call.returned());
        assert!(call.returned_with(Object::new().with("a", 1)));
        assert!(call.returned_with(Matcher::same(&object)));
        assert!(!call.returned_with(Matcher::same(Object::new().with("a", 1))));
    }

    #[test]
    fn renders_arguments_and_return_value() {
        let call = Call::builder()
            .call_id(1u64)
            .args(args![42, "Hey"])
            .outcome(Ok(42.into()))
            .build()
            .unwrap();
        assert_eq!(call.to_string(), "spy(42, 'Hey') => 42");
    }

    #[test]
    fn renders_exception_name_and_message() {
        let call = throwing(1, Error::throw_error("TypeError", "Oh noes!"));
        assert_eq!(call.to_string(), "spy() !TypeError(Oh noes!)");
    }

    #[test]
    fn renders_call_site() {
        let site = Location::caller();
        let call = Call::builder().call_id(1u64).call_site(site).build().unwrap();
        assert_eq!(
            call.to_string(),
            format!("spy() at {}:{}:{}", site.file(), site.line(), site.column())
        );
    }
}
