use callspy::*;

fn main() -> Result {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let tracker = Tracker::new();
    let fetch = tracker.spy().named("fetch");

    fetch.call(args!["/users", Object::new().with("page", 1)])?;
    fetch.call(args!["/users", Object::new().with("page", 2)])?;
    fetch.call(args!["/posts"])?;

    // Views start with the matching history and keep following new calls
    let users = fetch.with_args(args!["/users"]);
    let page_two = users.with_args(args![Matcher::partial(Object::new().with("page", 2))]);
    println!("users: {}, page two: {}", users.call_count(), page_two.call_count());

    fetch.call(args!["/users", Object::new().with("page", 2).with("size", 50)])?;
    println!("users: {}, page two: {}", users.call_count(), page_two.call_count());

    // Asking again returns the same view
    assert!(fetch.with_args(args!["/users"]).ptr_eq(&users));

    // Resetting the parent clears every view but keeps them registered
    fetch.reset_history()?;
    assert!(users.not_called());
    fetch.call(args!["/users"])?;
    assert!(users.called_once());

    Ok(())
}
