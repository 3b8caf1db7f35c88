#![cfg_attr(docsrs, feature(doc_cfg))]
//! # callspy
//!
//! Call recording and rich call assertions for test doubles.
//!
//! A [`Spy`] wraps a callable, forwards every invocation to it and records
//! what happened: arguments, receiver, return value or error, and a position
//! in a total order shared by every spy of the same [`Tracker`]. Tests then
//! ask questions about that history.
//!
//! ## Quick Start
//!
//! ```rust
//! use callspy::{Matcher, Object, Tracker, args};
//!
//! let tracker = Tracker::new();
//! let save = tracker.spy_fn(|inv| Ok(inv.arg(0))).named("save");
//! let notify = tracker.spy().named("notify");
//!
//! save.call(args![Object::new().with("id", 42), "draft"])?;
//! notify.call(args!["saved"])?;
//!
//! assert!(save.called_once());
//! assert!(save.called_with(&args![Object::new().with("id", 42)]));
//! assert!(save.called_with_match(&args![Object::new(), "dra"]));
//! assert!(save.called_with(&args![Matcher::any(), Matcher::type_of("string")]));
//! assert!(save.called_immediately_before(&notify));
//! # Ok::<(), callspy::Error>(())
//! ```
//!
//! ## Core Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Tracker`] | Creates spies that share one call order and one [`Config`] |
//! | [`Spy`] | A tracked function and its call history |
//! | [`Call`] | One recorded invocation, with query and callback helpers |
//! | [`Value`] | Dynamic value passed to, returned from or thrown by a callable |
//! | [`Function`] | A callable value with a name, an arity and own properties |
//! | [`Matcher`] | A predicate standing in for an expected value |
//! | [`Sequencer`] | Issues the [`CallId`]s that order calls across spies |
//!
//! ## Filtered Views
//!
//! [`Spy::with_args`] returns a spy that only sees calls whose leading
//! arguments match. Views are cached by value, start with every matching
//! call already recorded, and can be nested:
//!
//! ```rust
//! use callspy::{Tracker, args};
//!
//! let spy = Tracker::new().spy();
//! spy.call(args![1])?;
//! spy.call(args![1, 1])?;
//! spy.call(args![1, 2])?;
//!
//! assert_eq!(spy.with_args(args![1]).call_count(), 3);
//! assert_eq!(spy.with_args(args![1, 1]).call_count(), 1);
//! assert_eq!(spy.with_args(args![1]).with_args(args![2]).call_count(), 1);
//! # Ok::<(), callspy::Error>(())
//! ```
//!
//! ## Logging
//!
//! Recorded calls are reported with `tracing` at `TRACE`, view creation and
//! resets at `DEBUG`. The library never installs a subscriber.
//!
//! ## Features
//!
//! - **`serde`** - JSON export of call history ([`Spy::to_json`]) and serde
//!   derives on [`CallId`]
//!
//! ## Examples
//!
//! See the `examples/` directory:
//!
//! - `callbacks.rs` - Driving callbacks captured by a spy
//! - `filtered_views.rs` - Argument-scoped views
//! - `call_order.rs` - Ordering assertions across spies

mod call;
mod call_id;
mod config;
mod error;
mod filter_index;
mod function;
mod history;
mod sequencer;
mod spy;
mod tracker;
mod value;

pub mod equality;
pub mod format;
pub mod matcher;

pub use call::{Call, CallBuilder};
pub use call_id::CallId;
pub use config::Config;
pub use equality::{Equality, StructuralEquality};
pub use error::Error;
pub use format::{DefaultFormatter, ValueFormatter};
pub use function::{Function, FunctionBuilder, Invocation};
pub use matcher::{Expected, Matcher};
pub use sequencer::Sequencer;
pub use spy::Spy;
pub use tracker::{Installation, Tracker};
pub use value::{Array, Object, PropertyKey, Symbol, Value};

/// Convenience alias for `Result<T, callspy::Error>`.
pub type Result<T = ()> = std::result::Result<T, Error>;

/// Build a `Vec<Value>` from heterogeneous values.
///
/// ```rust
/// use callspy::args;
///
/// let values = args![1, "two", true];
/// assert_eq!(values.len(), 3);
/// assert_eq!(values[1].as_str(), Some("two"));
///
/// let none = args![];
/// assert!(none.is_empty());
/// ```
#[macro_export]
macro_rules! args {
    ($($value:expr),* $(,)?) => {{
        let values: ::std::vec::Vec<$crate::Value> = ::std::vec![$($crate::Value::from($value)),*];
        values
    }};
}
