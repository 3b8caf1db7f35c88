use std::{
    cell::{Cell, OnceCell, RefCell},
    fmt,
    panic::Location,
    rc::{Rc, Weak},
};

use crate::{
    Call, CallId, Config, Error, Function, Invocation, Object, PropertyKey, Result, Sequencer,
    Value, filter_index::ArgFilterIndex, format, history::History, matcher::prefix_matches,
};

pub(crate) struct SpyState {
    id: u64,
    name: RefCell<Option<String>>,
    func: Function,
    sequencer: Sequencer,
    config: Rc<Config>,
    /// Effective argument prefix of a filtered view. Empty for a root spy.
    prefix: Vec<Value>,
    parent: Option<Weak<SpyState>>,
    history: RefCell<History>,
    fakes: RefCell<ArgFilterIndex>,
    depth: Cell<usize>,
    proxy: OnceCell<Function>,
}

impl SpyState {
    /// Explicit name, then the wrapped function's name, then the configured
    /// fallback. Filtered views answer with their parent's name.
    pub(crate) fn display_name(&self) -> String {
        if let Some(parent) = self.parent.as_ref().and_then(Weak::upgrade) {
            return parent.display_name();
        }
        self.name
            .borrow()
            .clone()
            .or_else(|| self.func.name())
            .unwrap_or_else(|| self.config.default_name().to_owned())
    }
}

/// Marks a spy as executing for as long as it lives.
struct Invoking<'a>(&'a Cell<usize>);

impl<'a> Invoking<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for Invoking<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

/// A tracked function: forwards every invocation to the wrapped callable and
/// records it.
///
/// `Spy` is a cheap handle; clones observe the same history. Spies are
/// created through a [`Tracker`](crate::Tracker), which supplies the shared
/// [`Sequencer`] that orders calls across all of them.
///
/// # Example
///
/// ```rust
/// use callspy::{Tracker, args};
///
/// let tracker = Tracker::new();
/// let spy = tracker.spy().named("save");
///
/// spy.call(args![1]).unwrap();
/// spy.call(args![1, 2]).unwrap();
///
/// assert!(spy.called_twice());
/// assert!(spy.always_called_with(&args![1]));
/// assert_eq!(spy.with_args(args![1, 2]).call_count(), 1);
/// ```
#[derive(Clone)]
pub struct Spy(Rc<SpyState>);

impl fmt::Debug for Spy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spy")
            .field("id", &self.id())
            .field("name", &self.display_name())
            .field("call_count", &self.call_count())
            .finish_non_exhaustive()
    }
}

impl Spy {
    pub(crate) fn new(func: Function, sequencer: Sequencer, config: Rc<Config>) -> Self {
        Spy::from_parts(func, sequencer, config, Vec::new(), None)
    }

    fn from_parts(
        func: Function,
        sequencer: Sequencer,
        config: Rc<Config>,
        prefix: Vec<Value>,
        parent: Option<Weak<SpyState>>,
    ) -> Self {
        Spy(Rc::new(SpyState {
            id: sequencer.next_spy_id(),
            name: RefCell::new(None),
            func,
            sequencer,
            config,
            prefix,
            parent,
            history: RefCell::default(),
            fakes: RefCell::default(),
            depth: Cell::new(0),
            proxy: OnceCell::new(),
        }))
    }

    // ==================== Identity ====================

    /// Unique id of the form `spy#N`.
    pub fn id(&self) -> String {
        format!("spy#{}", self.0.id)
    }

    /// Set the display name. Returns the same spy.
    pub fn named(&self, name: &str) -> Spy {
        *self.0.name.borrow_mut() = Some(name.to_owned());
        if let Some(proxy) = self.0.proxy.get() {
            proxy.set_name(name);
        }
        self.clone()
    }

    pub fn display_name(&self) -> String {
        self.0.display_name()
    }

    /// Arity of the wrapped function.
    pub fn length(&self) -> usize {
        self.0.func.length()
    }

    /// Argument prefix this spy filters on. Empty unless created by
    /// [`with_args`](Self::with_args).
    pub fn prefix(&self) -> &[Value] {
        &self.0.prefix
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Spy) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// A [`Function`] that dispatches through this spy, so the spy can be
    /// handed out wherever a callable is expected. It carries the wrapped
    /// function's name, arity and own properties.
    ///
    /// The function holds the spy weakly: once every `Spy` handle is gone,
    /// calling it fails with [`Error::TypeError`].
    pub fn as_function(&self) -> Function {
        self.0
            .proxy
            .get_or_init(|| {
                let func = &self.0.func;
                let mut builder = Function::builder().length(func.length());
                if let Some(name) = self.0.name.borrow().clone().or_else(|| func.name()) {
                    builder = builder.name(&name);
                }
                for (key, value) in func.properties().entries() {
                    builder = builder.property(key, value);
                }
                let state = Rc::downgrade(&self.0);
                builder.build(move |inv| match state.upgrade() {
                    Some(state) => Spy(state).invoke(
                        inv.this.clone(),
                        inv.args.to_vec(),
                        inv.constructing,
                        None,
                    ),
                    None => Err(Error::TypeError(
                        "tracked function is no longer alive".into(),
                    )),
                })
            })
            .clone()
    }

    // ==================== Invocation ====================

    /// Call with an `undefined` receiver.
    #[track_caller]
    pub fn call(&self, args: Vec<Value>) -> Result<Value> {
        let site = Location::caller();
        self.invoke(Value::Undefined, args, false, Some(site))
    }

    #[track_caller]
    pub fn call_on(&self, this: &Value, args: Vec<Value>) -> Result<Value> {
        let site = Location::caller();
        self.invoke(this.clone(), args, false, Some(site))
    }

    /// Constructor call. The wrapped function receives a fresh instance as
    /// its receiver; the instance is the result unless the function returns
    /// an object or function of its own.
    #[track_caller]
    pub fn construct(&self, args: Vec<Value>) -> Result<Value> {
        let site = Location::caller();
        let class = self.0.func.name().unwrap_or_else(|| "Object".to_owned());
        let instance = Value::Object(Object::with_class(&class));
        self.invoke(instance, args, true, Some(site))
    }

    fn invoke(
        &self,
        this: Value,
        args: Vec<Value>,
        constructing: bool,
        site: Option<&'static Location<'static>>,
    ) -> Result<Value> {
        let call_id = self.0.sequencer.next_call_id();
        let outcome = {
            let _invoking = Invoking::enter(&self.0.depth);
            self.0.func.invoke(Invocation {
                this: &this,
                args: &args,
                constructing,
            })
        };
        let outcome = match outcome {
            Ok(returned) if constructing && !returned.is_object_like() => Ok(this.clone()),
            other => other,
        };

        let mut builder = Call::builder()
            .call_id(call_id)
            .this_value(this)
            .args(args)
            .outcome(outcome.clone())
            .constructing(constructing)
            .owner(Rc::downgrade(&self.0))
            .config(Rc::clone(&self.0.config));
        if let Some(site) = site.filter(|_| self.0.config.capture_call_site()) {
            builder = builder.call_site(site);
        }
        let call = builder.build()?;

        tracing::trace!(
            spy = %self.id(),
            call_id = %call_id,
            args = call.args().len(),
            threw = call.threw(),
            "call recorded"
        );
        self.record(call);
        outcome
    }

    /// Append to this history, then to every filtered view that matches.
    fn record(&self, call: Call) {
        self.0.history.borrow_mut().push(call.clone());
        let views = self.matching_fakes(call.args());
        for view in views {
            view.record(call.clone());
        }
    }

    // ==================== Counters ====================

    pub fn call_count(&self) -> usize {
        self.0.history.borrow().len()
    }

    pub fn called(&self) -> bool {
        self.call_count() > 0
    }

    pub fn not_called(&self) -> bool {
        self.call_count() == 0
    }

    pub fn called_once(&self) -> bool {
        self.call_count() == 1
    }

    pub fn called_twice(&self) -> bool {
        self.call_count() == 2
    }

    pub fn called_thrice(&self) -> bool {
        self.call_count() == 3
    }

    // ==================== Access ====================

    /// Snapshot of all recorded calls in call id order.
    pub fn calls(&self) -> Vec<Call> {
        self.0.history.borrow().calls().to_vec()
    }

    /// The call at `index`. Negative indexes count from the end.
    pub fn get_call(&self, index: isize) -> Option<Call> {
        self.0.history.borrow().get(index).cloned()
    }

    pub fn first_call(&self) -> Option<Call> {
        self.get_call(0)
    }

    pub fn second_call(&self) -> Option<Call> {
        self.get_call(1)
    }

    pub fn third_call(&self) -> Option<Call> {
        self.get_call(2)
    }

    pub fn last_call(&self) -> Option<Call> {
        self.get_call(-1)
    }

    pub fn args(&self) -> Vec<Vec<Value>> {
        self.0.history.borrow().args().to_vec()
    }

    pub fn return_values(&self) -> Vec<Value> {
        self.0.history.borrow().return_values().to_vec()
    }

    pub fn exceptions(&self) -> Vec<Option<Error>> {
        self.0.history.borrow().exceptions().to_vec()
    }

    pub fn this_values(&self) -> Vec<Value> {
        self.0.history.borrow().this_values().to_vec()
    }

    pub fn call_ids(&self) -> Vec<CallId> {
        self.0
            .history
            .borrow()
            .calls()
            .iter()
            .map(Call::call_id)
            .collect()
    }

    fn first_call_id(&self) -> Option<CallId> {
        self.first_call().map(|call| call.call_id())
    }

    fn last_call_id(&self) -> Option<CallId> {
        self.last_call().map(|call| call.call_id())
    }

    // ==================== Aggregates ====================

    fn any(&self, predicate: impl Fn(&Call) -> bool) -> bool {
        self.calls().iter().any(predicate)
    }

    fn always(&self, predicate: impl Fn(&Call) -> bool) -> bool {
        let calls = self.calls();
        !calls.is_empty() && calls.iter().all(predicate)
    }

    fn once(&self, predicate: impl Fn(&Call) -> bool) -> bool {
        let calls = self.calls();
        calls.len() == 1 && calls.iter().all(predicate)
    }

    pub fn called_on(&self, this: &Value) -> bool {
        self.any(|call| call.called_on(this))
    }

    pub fn always_called_on(&self, this: &Value) -> bool {
        self.always(|call| call.called_on(this))
    }

    pub fn called_with(&self, expected: &[Value]) -> bool {
        self.any(|call| call.called_with(expected))
    }

    pub fn always_called_with(&self, expected: &[Value]) -> bool {
        self.always(|call| call.called_with(expected))
    }

    pub fn never_called_with(&self, expected: &[Value]) -> bool {
        !self.called_with(expected)
    }

    pub fn called_with_match(&self, expected: &[Value]) -> bool {
        self.any(|call| call.called_with_match(expected))
    }

    pub fn always_called_with_match(&self, expected: &[Value]) -> bool {
        self.always(|call| call.called_with_match(expected))
    }

    pub fn never_called_with_match(&self, expected: &[Value]) -> bool {
        !self.called_with_match(expected)
    }

    pub fn called_with_exactly(&self, expected: &[Value]) -> bool {
        self.any(|call| call.called_with_exactly(expected))
    }

    pub fn always_called_with_exactly(&self, expected: &[Value]) -> bool {
        self.always(|call| call.called_with_exactly(expected))
    }

    /// Called exactly once, and that call matched.
    pub fn called_once_with(&self, expected: &[Value]) -> bool {
        self.once(|call| call.called_with(expected))
    }

    pub fn called_once_with_exactly(&self, expected: &[Value]) -> bool {
        self.once(|call| call.called_with_exactly(expected))
    }

    pub fn called_once_with_match(&self, expected: &[Value]) -> bool {
        self.once(|call| call.called_with_match(expected))
    }

    pub fn called_with_new(&self) -> bool {
        self.any(Call::called_with_new)
    }

    pub fn always_called_with_new(&self) -> bool {
        self.always(Call::called_with_new)
    }

    pub fn threw(&self) -> bool {
        self.any(Call::threw)
    }

    /// See [`Call::threw_with`].
    pub fn threw_with(&self, expected: impl Into<Value>) -> bool {
        let expected = expected.into();
        self.any(|call| call.threw_with(&expected))
    }

    pub fn always_threw(&self) -> bool {
        self.always(Call::threw)
    }

    pub fn always_threw_with(&self, expected: impl Into<Value>) -> bool {
        let expected = expected.into();
        self.always(|call| call.threw_with(&expected))
    }

    pub fn returned(&self) -> bool {
        self.any(Call::returned)
    }

    pub fn returned_with(&self, expected: impl Into<Value>) -> bool {
        let expected = expected.into();
        self.any(|call| call.returned_with(&expected))
    }

    pub fn always_returned(&self) -> bool {
        self.always(Call::returned)
    }

    pub fn always_returned_with(&self, expected: impl Into<Value>) -> bool {
        let expected = expected.into();
        self.always(|call| call.returned_with(&expected))
    }

    // ==================== Ordering ====================

    /// True if this spy's first call happened before `other`'s last call.
    /// Also true when only this spy was called.
    pub fn called_before(&self, other: &Spy) -> bool {
        let Some(first) = self.first_call_id() else {
            return false;
        };
        match other.last_call_id() {
            Some(last) => first < last,
            None => true,
        }
    }

    /// True if this spy's last call happened after `other`'s first call.
    pub fn called_after(&self, other: &Spy) -> bool {
        match (self.last_call_id(), other.first_call_id()) {
            (Some(last), Some(first)) => last > first,
            _ => false,
        }
    }

    /// True if this spy's last call came right before `other`'s last call.
    pub fn called_immediately_before(&self, other: &Spy) -> bool {
        match (self.last_call_id(), other.last_call_id()) {
            (Some(mine), Some(theirs)) => mine.precedes(theirs),
            _ => false,
        }
    }

    pub fn called_immediately_after(&self, other: &Spy) -> bool {
        other.called_immediately_before(self)
    }

    // ==================== Callback helpers ====================

    /// Run `helper` against every recorded call, collecting the results in
    /// call order. Fails with [`Error::NotInvokedYet`] when nothing was
    /// recorded.
    fn each_call<F>(&self, action: &str, helper: F) -> Result<Vec<Value>>
    where
        F: Fn(&Call) -> Result<Value>,
    {
        let calls = self.calls();
        if calls.is_empty() {
            return Err(Error::NotInvokedYet {
                name: self.display_name(),
                action: action.to_owned(),
            });
        }
        calls.iter().map(helper).collect()
    }

    /// Invoke the argument at `index` of every call. See [`Call::call_arg`].
    pub fn call_arg(&self, index: impl Into<Value>) -> Result<Vec<Value>> {
        let index = index.into();
        self.each_call("call arg", |call| call.call_arg(&index))
    }

    pub fn call_arg_on(&self, index: impl Into<Value>, this: &Value) -> Result<Vec<Value>> {
        let index = index.into();
        self.each_call("call arg", |call| call.call_arg_on(&index, this))
    }

    pub fn call_arg_with(&self, index: impl Into<Value>, args: &[Value]) -> Result<Vec<Value>> {
        let index = index.into();
        self.each_call("call arg", |call| call.call_arg_with(&index, args))
    }

    pub fn call_arg_on_with(
        &self,
        index: impl Into<Value>,
        this: &Value,
        args: &[Value],
    ) -> Result<Vec<Value>> {
        let index = index.into();
        self.each_call("call arg", |call| call.call_arg_on_with(&index, this, args))
    }

    /// Invoke the first function argument of every call.
    pub fn r#yield(&self, args: &[Value]) -> Result<Vec<Value>> {
        self.each_call("yield", |call| call.r#yield(args))
    }

    /// Alias of [`yield`](Self::yield).
    pub fn invoke_callback(&self, args: &[Value]) -> Result<Vec<Value>> {
        self.r#yield(args)
    }

    pub fn yield_on(&self, this: &Value, args: &[Value]) -> Result<Vec<Value>> {
        self.each_call("yield", |call| call.yield_on(this, args))
    }

    pub fn yield_to(&self, property: impl Into<PropertyKey>, args: &[Value]) -> Result<Vec<Value>> {
        self.yield_to_on(property, &Value::Undefined, args)
    }

    pub fn yield_to_on(
        &self,
        property: impl Into<PropertyKey>,
        this: &Value,
        args: &[Value],
    ) -> Result<Vec<Value>> {
        let property = property.into();
        let action = format!("yield to '{property}'");
        self.each_call(&action, |call| call.yield_to_on(&property, this, args))
    }

    /// The error that re-raises argument `index` of the last call.
    ///
    /// # Example
    ///
    /// ```rust
    /// use callspy::{Tracker, Value, args};
    ///
    /// let spy = Tracker::new().spy();
    /// spy.call(args![true, Value::error("TypeError", "catpants")]).unwrap();
    ///
    /// let err = spy.throw_arg(1);
    /// assert_eq!(err.name(), "TypeError");
    /// assert_eq!(err.message(), "catpants");
    /// ```
    pub fn throw_arg(&self, index: usize) -> Error {
        let Some(call) = self.last_call() else {
            return Error::NotInvokedYet {
                name: self.display_name(),
                action: "throw arg".into(),
            };
        };
        match call.args().get(index) {
            Some(value) => Error::Thrown(value.clone()),
            None => Error::NotEnoughArguments {
                required: index,
                present: call.args().len(),
            },
        }
    }

    // ==================== Filtered views ====================

    /// The filtered view for calls whose arguments start with `args`.
    ///
    /// Views are cached: asking again with deep-equal arguments returns the
    /// same spy. A new view starts with every already recorded call that
    /// matches, keeping its call id.
    pub fn with_args(&self, args: Vec<Value>) -> Spy {
        let config = Rc::clone(&self.0.config);
        if let Some(view) = self.0.fakes.borrow().find(&args, config.equality()) {
            return view;
        }

        let mut prefix = self.0.prefix.clone();
        prefix.extend(args.iter().cloned());
        let view = Spy::from_parts(
            self.0.func.clone(),
            self.0.sequencer.clone(),
            Rc::clone(&config),
            prefix,
            Some(Rc::downgrade(&self.0)),
        );

        let seeded: Vec<Call> = self
            .calls()
            .into_iter()
            .filter(|call| prefix_matches(view.prefix(), call.args(), config.equality()))
            .collect();
        let seeded_count = seeded.len();
        {
            let mut history = view.0.history.borrow_mut();
            for call in seeded {
                history.push(call);
            }
        }

        tracing::debug!(
            spy = %self.id(),
            view = %view.id(),
            prefix = view.prefix().len(),
            seeded = seeded_count,
            "filtered view created"
        );
        self.0.fakes.borrow_mut().insert(args, view.clone());
        view
    }

    /// Every cached view of this spy whose prefix matches `args`, in
    /// creation order.
    pub fn matching_fakes(&self, args: &[Value]) -> Vec<Spy> {
        self.0
            .fakes
            .borrow()
            .matching(args, self.0.config.equality())
    }

    /// Clear the recorded history of this spy and of all its filtered views.
    /// Views stay cached. Fails with [`Error::InvalidReset`] when called from
    /// inside this spy's own invocation.
    pub fn reset_history(&self) -> Result<Spy> {
        if self.0.depth.get() > 0 {
            tracing::warn!(spy = %self.id(), "reset rejected while invoking");
            return Err(Error::InvalidReset {
                name: self.display_name(),
            });
        }
        self.0.history.borrow_mut().clear();
        let views = self.0.fakes.borrow().views();
        for view in views {
            view.reset_history()?;
        }
        tracing::debug!(spy = %self.id(), "history reset");
        Ok(self.clone())
    }

    // ==================== Rendering ====================

    /// Expand a message template:
    ///
    /// - `%n` display name
    /// - `%c` call count in words (`never`, `once`, `twice`, `thrice`, `4 times`)
    /// - `%C` every rendered call, each on its own indented line
    /// - `%t` formatted receivers
    /// - `%*` formatted arguments of the last call
    /// - `%%` a literal percent sign
    ///
    /// Unknown placeholders are kept as written.
    pub fn printf(&self, template: &str) -> String {
        let formatter = self.0.config.formatter();
        let mut out = String::with_capacity(template.len());
        let mut chars = template.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push_str(&self.display_name()),
                Some('c') => out.push_str(&times_in_words(self.call_count())),
                Some('C') => {
                    for call in self.calls() {
                        out.push_str("\n    ");
                        out.push_str(&call.to_string());
                    }
                }
                Some('t') => out.push_str(&format::join(formatter, &self.this_values())),
                Some('*') => {
                    let args = self.last_call().map(|call| call.args().to_vec());
                    out.push_str(&format::join(formatter, &args.unwrap_or_default()));
                }
                Some('%') => out.push('%'),
                Some(other) => {
                    out.push('%');
                    out.push(other);
                }
                None => out.push('%'),
            }
        }
        out
    }

    /// Export the recorded calls as pretty-printed JSON, values rendered
    /// through the configured formatter.
    ///
    /// # Errors
    ///
    /// Returns any serialization error produced by `serde_json`.
    #[cfg(feature = "serde")]
    #[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
    pub fn to_json(&self) -> serde_json::Result<String> {
        use serde::Serialize;

        #[derive(Serialize)]
        struct CallExport {
            call_id: CallId,
            this_value: String,
            args: Vec<String>,
            return_value: Option<String>,
            exception: Option<String>,
            called_with_new: bool,
        }

        let formatter = self.0.config.formatter();
        let exports: Vec<CallExport> = self
            .calls()
            .iter()
            .map(|call| CallExport {
                call_id: call.call_id(),
                this_value: formatter.format(call.this_value()),
                args: call.args().iter().map(|arg| formatter.format(arg)).collect(),
                return_value: call
                    .returned()
                    .then(|| formatter.format(&call.return_value())),
                exception: call.exception().map(ToString::to_string),
                called_with_new: call.called_with_new(),
            })
            .collect();

        serde_json::to_string_pretty(&exports)
    }
}

fn times_in_words(count: usize) -> String {
    match count {
        0 => "never".into(),
        1 => "once".into(),
        2 => "twice".into(),
        3 => "thrice".into(),
        n => format!("{n} times"),
    }
}

impl From<&Spy> for Value {
    fn from(spy: &Spy) -> Self {
        Value::Function(spy.as_function())
    }
}

impl From<Spy> for Value {
    fn from(spy: Spy) -> Self {
        Value::Function(spy.as_function())
    }
}
