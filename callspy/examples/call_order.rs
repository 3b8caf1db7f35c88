use callspy::*;

fn main() -> Result {
    let tracker = Tracker::new();

    let connect = tracker.spy().named("connect");
    let query = tracker.spy_fn(|_| Ok(Value::from(vec![Value::from(1), Value::from(2)])));
    let close = tracker.spy().named("close");

    connect.call(vec![])?;
    query.call(args!["select 1"])?;
    query.call(args!["select 2"])?;
    close.call(vec![])?;

    assert!(connect.called_immediately_before(&query));
    assert!(query.called_before(&close));
    assert!(close.called_immediately_after(&query));
    assert!(!connect.called_immediately_before(&close));

    for call in query.calls() {
        println!("#{} {}", call.call_id(), call);
    }
    println!("last issued id: {:?}", tracker.sequencer().last_call_id());
    Ok(())
}
