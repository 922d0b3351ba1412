use trowel::{value, Callable, Context, Inject, InvokeErrorKind, Overrides};

struct Mailer {
    smtp: &'static str,
}

struct StubMailer;

fn main() {
    let context = Context::new();
    context
        .wire(value(Mailer { smtp: "smtp://mail.internal" }))
        .value("mailer")
        .unwrap()
        .wire(value("welcome aboard"))
        .value("template")
        .unwrap();

    // Dependencies are declared by key and injected positionally
    let send_welcome = Callable::from_fn(
        &["mailer", "template"],
        |Inject(mailer): Inject<Mailer>, Inject(template): Inject<&str>| {
            Ok::<_, InvokeErrorKind>(format!("{} via {}", template, mailer.smtp))
        },
    );

    let sent = context.resolve(&send_welcome).unwrap().unwrap();
    assert_eq!(
        *sent.downcast::<String>().unwrap(),
        "welcome aboard via smtp://mail.internal"
    );

    // An override view shadows single keys for one resolution, the wirings
    // themselves stay as they are. Handy for swapping collaborators in tests.
    let stubbed = Callable::from_fn(
        &["mailer", "template"],
        |Inject(_mailer): Inject<StubMailer>, Inject(template): Inject<&str>| {
            Ok::<_, InvokeErrorKind>(format!("{template} kept on disk"))
        },
    );
    let sent = context
        .using(Overrides::new().with("mailer", value(StubMailer)))
        .unwrap()
        .resolve(&stubbed)
        .unwrap()
        .unwrap();
    assert_eq!(*sent.downcast::<String>().unwrap(), "welcome aboard kept on disk");
}
