#![allow(dead_code)]

use criterion::{criterion_group, criterion_main, Criterion};
use trowel::{value, Callable, Context, Inject, InvokeErrorKind, Overrides};

struct Flask;

#[inline]
fn context_new() -> Context {
    Context::new()
}

#[inline]
fn context_wire_three_values() -> Context {
    let context = Context::new();
    context
        .wire(value(1_i32))
        .value("one")
        .unwrap()
        .wire(value(2_i32))
        .value("two")
        .unwrap()
        .wire(value(3_i32))
        .value("three")
        .unwrap()
}

#[inline]
fn retrieve(context: &Context, key: &str) {
    let _ = context.retrieve(key).unwrap();
}

#[inline]
fn resolve(context: &Context, callable: &Callable) {
    let _ = context.resolve(callable).unwrap();
}

#[inline]
fn resolve_with_override(context: &Context, callable: &Callable) {
    let _ = context
        .using(Overrides::new().with("foo", value("Adieu")))
        .unwrap()
        .resolve(callable)
        .unwrap();
}

#[inline]
fn spawn_lineage(context: &Context) -> Context {
    context.spawn().spawn().spawn().spawn().spawn()
}

fn criterion_benchmark(c: &mut Criterion) {
    let wired = Context::new();
    wired
        .wire(value("So long"))
        .value("foo")
        .unwrap()
        .wire(value("and thanks for all the fish!"))
        .value("qux")
        .unwrap()
        .wire(Callable::from_fn(&[], || Ok::<_, InvokeErrorKind>(Flask)))
        .producer("fresh flask")
        .unwrap()
        .wire(Callable::from_fn(&[], || Ok::<_, InvokeErrorKind>(Flask)))
        .singleton("flask")
        .unwrap();

    let farewell = Callable::from_fn(
        &["foo", "qux"],
        |Inject(foo): Inject<&str>, Inject(qux): Inject<&str>| Ok::<_, InvokeErrorKind>(format!("{foo}, {qux}")),
    );

    let leaf = spawn_lineage(&wired);

    c.bench_function("context_new", |b| b.iter(|| context_new()))
        .bench_function("context_wire_three_values", |b| b.iter(|| context_wire_three_values()))
        .bench_function("context_retrieve_value", |b| b.iter(|| retrieve(&wired, "foo")))
        .bench_function("context_retrieve_producer", |b| b.iter(|| retrieve(&wired, "fresh flask")))
        .bench_function("context_retrieve_singleton", |b| b.iter(|| retrieve(&wired, "flask")))
        .bench_function("context_resolve", |b| b.iter(|| resolve(&wired, &farewell)))
        .bench_function("context_resolve_with_override", |b| {
            b.iter(|| resolve_with_override(&wired, &farewell))
        })
        .bench_function("context_spawn_lineage", |b| b.iter(|| spawn_lineage(&wired)))
        .bench_function("context_retrieve_through_lineage", |b| b.iter(|| retrieve(&leaf, "foo")));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
