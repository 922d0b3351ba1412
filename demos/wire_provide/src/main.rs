use std::sync::Arc;

use trowel::{value, Callable, Context, Inject, InvokeErrorKind};

// Dependency that will be alive throughout the application
#[derive(Clone)]
struct Config {
    dsn: &'static str,
}

struct PostgresUserRepo {
    _dsn: String,
}

struct CreateUser {
    repo: Arc<PostgresUserRepo>,
}

impl CreateUser {
    fn handle(&self) {
        let _ = &self.repo;
    }
}

fn init_context(config: Config) -> Context {
    let context = Context::new();
    context
        // Plain values are handed back as-is
        .wire(value(config))
        .value("config")
        .unwrap()
        // A singleton is resolved on first retrieval and cached on its wiring
        .wire(Callable::from_fn(&["config"], |Inject(config): Inject<Config>| {
            Ok::<_, InvokeErrorKind>(PostgresUserRepo {
                _dsn: config.dsn.into(),
            })
        }))
        .singleton("user repo")
        .unwrap()
        // A producer is resolved on every retrieval
        .wire(Callable::from_fn(&["user repo"], |Inject(repo): Inject<PostgresUserRepo>| {
            Ok::<_, InvokeErrorKind>(CreateUser { repo })
        }))
        .producer("create user")
        .unwrap()
}

fn main() {
    let context = init_context(Config {
        dsn: "postgres://localhost/users",
    });

    // Each retrieval builds a fresh interactor over the shared repo
    let interactor = context.get::<CreateUser>("create user").unwrap();
    interactor.handle();

    // Request-scoped wirings go into a child; the parent stays untouched.
    // Don't worry about cloning contexts, handles are cheap.
    let request = context.spawn();
    request.wire(value("alice")).value("current user").unwrap();

    // The child falls back to the parent for everything it doesn't shadow
    let _config = request.get::<Config>("config").unwrap();
    let _user = request.get::<&str>("current user").unwrap();
    assert!(!context.has("current user"));
}
