use callspy::*;

fn main() -> Result {
    let tracker = Tracker::new();

    // A loader that receives callbacks, like most async-style APIs do
    let load = tracker.spy().named("load");
    let on_done = tracker.spy_fn(|inv| {
        println!("done with {}", inv.arg(0));
        Ok(Value::Undefined)
    });

    load.call(args!["users.json", &on_done])?;

    // Drive the captured callback as if the load finished
    load.r#yield(&args![Object::new().with("count", 3)])?;
    assert!(on_done.called_once_with(&args![Object::new().with("count", 3)]));

    // Callbacks passed inside an options object
    let success = tracker.spy().named("success");
    let failure = tracker.spy().named("failure");
    let handlers = Object::new()
        .with("success", &success)
        .with("failure", &failure);
    load.call(args!["posts.json", &handlers])?;
    load.reset_history()?;
    load.call(args!["posts.json", &handlers])?;
    load.yield_to("success", &args![200])?;
    assert!(success.called_once_with(&args![200]));
    assert!(failure.not_called());

    // Without a callback the helper says what it got instead
    let plain = tracker.spy().named("plain");
    plain.call(args![23, 42])?;
    if let Err(err) = plain.r#yield(&[]) {
        println!("{err}");
    }

    println!("{}", load.printf("%n was called %c:%C"));
    Ok(())
}
