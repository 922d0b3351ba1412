use anyhow::anyhow;
use trowel::{value, Callable, Context, InvokeErrorKind, Subject};

// Stands in for whatever module system the application sits on
fn load_module(id: &str) -> anyhow::Result<Subject> {
    match id {
        "./greeter" => Ok(Subject::from(Callable::from_fn(&[], || {
            Ok::<_, InvokeErrorKind>("So long, and thanks for all the fish!")
        }))),
        "./answer" => Ok(Subject::from(value(42_i32))),
        _ => Err(anyhow!("no module '{id}'")),
    }
}

fn main() {
    let context = Context::builder().loader(load_module).build();

    // Nothing is loaded at wire time
    context
        .require("./greeter")
        .unwrap()
        .singleton("greeting")
        .unwrap()
        .require("./answer")
        .unwrap()
        .value("answer")
        .unwrap();

    // The module is loaded on first retrieval and the result sticks
    let greeting = context.get::<&str>("greeting").unwrap();
    assert_eq!(*greeting, "So long, and thanks for all the fish!");

    let answer = context.get::<i32>("answer").unwrap();
    assert_eq!(*answer, 42);
}
