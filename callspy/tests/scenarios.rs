//! End-to-end scenarios across spies, views and callbacks.

use callspy::{Error, Function, Matcher, Object, Symbol, Tracker, Value, args};

#[test]
fn with_args_counts_prefix_matches() {
    let tracker = Tracker::new();
    let f = tracker.spy();
    f.call(args![1]).unwrap();
    f.call(args![1, 1]).unwrap();
    f.call(args![1, 2]).unwrap();

    assert_eq!(f.with_args(args![1]).call_count(), 3);
    assert_eq!(f.with_args(args![1, 1]).call_count(), 1);
}

#[test]
fn with_args_returns_same_view_for_fresh_equal_objects() {
    let tracker = Tracker::new();
    let f = tracker.spy();
    let first = f.with_args(args![Object::new().with("id", 1)]);
    let second = f.with_args(args![Object::new().with("id", 1)]);
    assert!(first.ptr_eq(&second));
}

#[test]
fn call_arg_before_any_call_is_not_invoked_yet() {
    let tracker = Tracker::new();
    let f = tracker.spy();
    let err = f.call_arg(0).unwrap_err();
    assert!(matches!(err, Error::NotInvokedYet { .. }));
    assert!(err.to_string().contains("not yet invoked"));
}

#[test]
fn called_with_versus_called_with_exactly() {
    let tracker = Tracker::new();
    let f = tracker.spy();
    f.call(args![42]).unwrap();
    let call = f.get_call(0).unwrap();
    assert!(call.called_with(&args![42]));
    assert!(!call.called_with_exactly(&args![42, 43]));
}

#[test]
fn yield_invokes_callback_without_arguments() {
    let tracker = Tracker::new();
    let f = tracker.spy();
    let callback = tracker.spy();
    f.call(args![&callback]).unwrap();

    f.r#yield(&[]).unwrap();

    assert!(callback.called_once());
    assert!(callback.called_with_exactly(&[]));
}

#[test]
fn yield_without_callback_fails() {
    let tracker = Tracker::new();
    let f = tracker.spy();
    f.call(vec![]).unwrap();
    let err = f.r#yield(&[]).unwrap_err();
    assert!(matches!(err, Error::NoMatchingCallback { .. }));
    assert!(err.to_string().contains("cannot yield since"));
}

#[test]
fn nested_views_are_independent_of_sibling_prefixes() {
    let tracker = Tracker::new();
    let f = tracker.spy();
    let nested = f.with_args(args![1]).with_args(args![2]);
    let two = f.with_args(args![2]);

    f.call(args![1, 2, 3]).unwrap();
    f.call(args![2]).unwrap();
    f.call(args![1, 3]).unwrap();

    assert_eq!(nested.call_count(), 1);
    assert!(nested.called_with_exactly(&args![1, 2, 3]));
    assert_eq!(two.call_count(), 1);
    assert_eq!(f.with_args(args![1]).call_count(), 2);
}

#[test]
fn nested_view_created_late_is_seeded_from_its_parent_view() {
    let tracker = Tracker::new();
    let f = tracker.spy();
    let one = f.with_args(args![1]);
    f.call(args![1, 2]).unwrap();
    f.call(args![1, 3]).unwrap();

    let nested = one.with_args(args![2]);

    assert_eq!(nested.call_count(), 1);
    assert_eq!(nested.first_call().unwrap().call_id(), f.first_call().unwrap().call_id());
}

#[test]
fn call_ids_follow_invocation_order_across_spies() {
    let tracker = Tracker::new();
    let a = tracker.spy();
    let b = tracker.spy();
    a.call(vec![]).unwrap();
    b.call(vec![]).unwrap();
    a.call(vec![]).unwrap();

    let a_ids = a.call_ids();
    let b_ids = b.call_ids();
    assert!(a_ids[0] < b_ids[0]);
    assert!(b_ids[0] < a_ids[1]);
    assert!(b.first_call().unwrap().called_immediately_after(&a.first_call().unwrap()));
    assert!(!a.first_call().unwrap().called_immediately_before(&a.second_call().unwrap()));
}

#[test]
fn view_ids_interleave_with_siblings() {
    let tracker = Tracker::new();
    let f = tracker.spy();
    let one = f.with_args(args![1]);
    let two = f.with_args(args![2]);
    f.call(args![1]).unwrap();
    f.call(args![2]).unwrap();

    assert!(one.called_immediately_before(&two));
    assert!(two.called_after(&one));
}

#[test]
fn reset_is_idempotent() {
    let tracker = Tracker::new();
    let f = tracker.spy();
    f.reset_history().unwrap();
    f.call(args![1]).unwrap();
    f.reset_history().unwrap();
    f.reset_history().unwrap();
    assert_eq!(f.call_count(), 0);
    assert!(f.first_call().is_none());
}

#[test]
fn reset_does_not_rewind_the_sequencer() {
    let tracker = Tracker::new();
    let f = tracker.spy();
    f.call(vec![]).unwrap();
    f.reset_history().unwrap();
    f.call(vec![]).unwrap();
    assert_eq!(f.first_call().unwrap().call_id().value(), 2);
}

#[test]
fn view_reset_clears_replayed_calls() {
    let tracker = Tracker::new();
    let f = tracker.spy();
    f.call(args![1]).unwrap();
    let view = f.with_args(args![1]);
    assert_eq!(view.call_count(), 1);

    view.reset_history().unwrap();

    assert_eq!(view.call_count(), 0);
    assert_eq!(f.call_count(), 1);
    assert!(f.with_args(args![1]).ptr_eq(&view));
}

#[test]
fn yield_to_with_symbol_property() {
    let tracker = Tracker::new();
    let f = tracker.spy().named("somethingAwesome");
    let key = Symbol::new("apple pie");
    let callback = tracker.spy_fn(|inv| Ok(inv.arg(0)));
    f.call(args![23, Object::new().with(&key, &callback)]).unwrap();

    let results = f.yield_to(&key, &args!["pie"]).unwrap();

    assert_eq!(results[0].as_str(), Some("pie"));
    assert!(callback.called_once_with(&args!["pie"]));
}

#[test]
fn yield_to_missing_property_names_spy_and_arguments() {
    let tracker = Tracker::new();
    let f = tracker.spy().named("somethingAwesome");
    f.call(args![23, 42]).unwrap();
    assert_eq!(
        f.yield_to("success", &[]).unwrap_err().to_string(),
        "somethingAwesome cannot yield to 'success' since no callback was passed. Received [23, 42]"
    );
}

#[test]
fn callback_errors_propagate_unchanged() {
    let tracker = Tracker::new();
    let f = tracker.spy();
    let failing = Function::new(|_| Err(Error::throw_error("RangeError", "too far")));
    f.call(args![failing]).unwrap();

    let err = f.call_arg(0).unwrap_err();

    assert_eq!(err.name(), "RangeError");
    assert_eq!(err.message(), "too far");
}

#[test]
fn matchers_work_in_every_query_position() {
    let tracker = Tracker::new();
    let receiver = Object::with_class("Api");
    let f = tracker.spy_fn(|_| Ok(Value::from("done")));
    f.call_on(&Value::from(&receiver), args!["path", 3]).unwrap();

    assert!(f.called_on(&Matcher::new("api", |v| {
        v.as_object().and_then(|o| o.class_name()) == Some("Api")
    }).into()));
    assert!(f.called_with(&args![Matcher::type_of("string"), Matcher::truthy()]));
    assert!(f.returned_with(Matcher::type_of("string")));
    assert!(f.always_returned_with("done"));
}

#[test]
fn rendered_calls_match_conventional_format() {
    let tracker = Tracker::with_config(callspy::Config::default().with_capture_call_site(false));
    let ok = tracker.spy_fn(|inv| Ok(inv.arg(0))).named("doIt");
    let failing = tracker
        .spy_fn(|_| Err(Error::throw_error("TypeError", "Oh noes!")))
        .named("doIt");

    ok.call(args![42, "Hey"]).unwrap();
    failing.call(vec![]).unwrap_err();

    assert_eq!(ok.first_call().unwrap().to_string(), "doIt(42, 'Hey') => 42");
    assert_eq!(failing.first_call().unwrap().to_string(), "doIt() !TypeError(Oh noes!)");
}

#[test]
fn spies_can_be_passed_as_callbacks() {
    let tracker = Tracker::new();
    let outer = tracker.spy_fn(|inv| {
        let callback = inv.arg(0);
        match callback.as_function() {
            Some(callback) => callback.call(&Value::Undefined, &args!["from outer"]),
            None => Ok(Value::Undefined),
        }
    });
    let inner = tracker.spy();

    outer.call(args![&inner]).unwrap();

    assert!(inner.called_once_with(&args!["from outer"]));
    assert!(inner.called_after(&outer));
    assert!(outer.first_call().unwrap().called_before(&inner.first_call().unwrap()));
}
