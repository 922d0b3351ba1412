#![no_std]

extern crate alloc;

#[macro_use]
pub(crate) mod macros;

pub(crate) mod any;
pub(crate) mod cache;
pub(crate) mod callable;
pub(crate) mod context;
pub(crate) mod deferred;
pub(crate) mod errors;
pub(crate) mod inject;
pub(crate) mod loader;
pub(crate) mod registry;
pub(crate) mod service;
pub(crate) mod subject;
pub(crate) mod using;

pub use any::{value, Value};
pub use callable::{Args, Callable, Factory};
pub use context::{Context, ContextBuilder, WeakContext, Wiring};
pub use deferred::Deferred;
pub use errors::{InvokeErrorKind, RegistryErrorKind, ResolveErrorKind, WireErrorKind};
pub use inject::{FromValue, Inject};
pub use loader::ModuleLoader;
pub use registry::{Provider, ProviderRegistry, ProvideRequest, Slot};
pub use subject::Subject;
pub use using::{OverrideSource, Overrides, Using};
