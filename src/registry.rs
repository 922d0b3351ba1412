use alloc::{boxed::Box, collections::BTreeMap, sync::Arc, vec::Vec};
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::{
    any::Value,
    context::Context,
    errors::{RegistryErrorKind, ResolveErrorKind},
    service::{provide_fn, BoxCloneProvide},
    subject::Subject,
};

pub(crate) const VALUE: &str = "value";
pub(crate) const PRODUCER: &str = "producer";
pub(crate) const SINGLETON: &str = "singleton";

/// Everything a provider gets to see when a wired key is retrieved.
pub struct ProvideRequest {
    /// The subject as it was wired. Deferred subjects are forced before the
    /// provider is called, so this is never [`Subject::Deferred`].
    pub subject: Subject,
    /// The flag set by [`Wiring::constructable`](crate::Wiring::constructable).
    /// Built-in providers carry it through untouched.
    pub constructable: bool,
    /// Per-wiring storage, empty until a provider decides to fill it.
    pub slot: Slot,
    /// The context whose wiring is being provided.
    pub context: Context,
}

/// A cell shared by all clones of one wiring.
///
/// The `singleton` provider keeps its resolved instance here, which is what
/// scopes the instance to the wiring rather than to the provider.
#[derive(Clone, Default)]
pub struct Slot {
    cell: Arc<Mutex<Option<Value>>>,
}

impl Slot {
    #[inline]
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            cell: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the stored value, running `init` to produce it if the cell is
    /// empty. `Ok(None)` and errors leave the cell empty, so the next call
    /// runs `init` again.
    ///
    /// The cell stays locked while `init` runs.
    ///
    /// # Errors
    /// Whatever `init` returns.
    pub fn get_or_try_init(
        &self,
        init: impl FnOnce() -> Result<Option<Value>, ResolveErrorKind>,
    ) -> Result<Option<Value>, ResolveErrorKind> {
        let mut cell = self.cell.lock();

        if let Some(value) = cell.as_ref() {
            debug!("Found in slot");
            return Ok(Some(value.clone()));
        }

        let resolved = init()?;
        if let Some(value) = resolved.as_ref() {
            *cell = Some(value.clone());
            debug!("Cached in slot");
        }
        Ok(resolved)
    }
}

pub(crate) type ConfigureFn = Arc<dyn Fn(&Context) -> BoxCloneProvide + Send + Sync>;

/// A named provider strategy.
///
/// `configure` runs once per context, when the context is created, and
/// receives that context. The returned closure runs on every retrieval of a
/// key wired through this provider.
///
/// A provider that keeps the context it was configured with should hold a
/// [`WeakContext`](crate::WeakContext), since the context owns its providers.
/// Built-in providers avoid the question by using [`ProvideRequest::context`]
/// instead.
///
/// # Examples
///
/// ```
/// use trowel::{Context, Provider, ProvideRequest, ResolveErrorKind, Value};
///
/// let provider = Provider::new("echo", |_context: &Context| {
///     |request: ProvideRequest| -> Result<Option<Value>, ResolveErrorKind> {
///         Ok(request.subject.into_value())
///     }
/// });
/// assert_eq!(provider.name(), "echo");
/// ```
#[derive(Clone)]
pub struct Provider {
    name: Box<str>,
    configure: ConfigureFn,
}

impl Provider {
    #[must_use]
    pub fn new<C, P>(name: &str, configure: C) -> Self
    where
        C: Fn(&Context) -> P + Send + Sync + 'static,
        P: FnMut(ProvideRequest) -> Result<Option<Value>, ResolveErrorKind> + Clone + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            configure: Arc::new(move |context| BoxCloneProvide(Box::new(provide_fn(configure(context))))),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The set of provider strategies contexts materialize their providers from.
///
/// The registry is a shared handle. Contexts created from it pick up whatever
/// is registered at that moment; registering afterwards doesn't change
/// already-created contexts.
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: Arc<Mutex<BTreeMap<Box<str>, ConfigureFn>>>,
}

impl ProviderRegistry {
    /// Creates a registry holding the built-in `value`, `producer` and
    /// `singleton` providers.
    #[must_use]
    pub fn new() -> Self {
        let mut providers = BTreeMap::new();
        providers.insert(VALUE.into(), builtin(provide_value));
        providers.insert(PRODUCER.into(), builtin(provide_producer));
        providers.insert(SINGLETON.into(), builtin(provide_singleton));

        Self {
            providers: Arc::new(Mutex::new(providers)),
        }
    }

    /// The process-wide registry used by contexts that weren't given one.
    /// Created on first use.
    #[must_use]
    pub fn global() -> Self {
        static GLOBAL: Mutex<Option<ProviderRegistry>> = Mutex::new(None);

        GLOBAL.lock().get_or_insert_with(Self::new).clone()
    }

    /// Registers a provider under its name and returns the handle for
    /// chaining.
    ///
    /// # Errors
    /// [`RegistryErrorKind::DuplicateProvider`] if the name is taken, built-ins included.
    ///
    /// # Examples
    ///
    /// ```
    /// use trowel::{Context, Provider, ProviderRegistry, ProvideRequest, ResolveErrorKind, Value};
    ///
    /// let registry = ProviderRegistry::new();
    /// registry
    ///     .register(Provider::new("first", |_context: &Context| {
    ///         |request: ProvideRequest| -> Result<Option<Value>, ResolveErrorKind> {
    ///             Ok(request.subject.into_value())
    ///         }
    ///     }))?
    ///     .register(Provider::new("second", |_context: &Context| {
    ///         |request: ProvideRequest| -> Result<Option<Value>, ResolveErrorKind> {
    ///             Ok(request.subject.into_value())
    ///         }
    ///     }))?;
    /// # Ok::<(), trowel::RegistryErrorKind>(())
    /// ```
    pub fn register(&self, provider: Provider) -> Result<&Self, RegistryErrorKind> {
        let Provider { name, configure } = provider;

        let mut providers = self.providers.lock();
        if providers.contains_key(&name) {
            let err = RegistryErrorKind::DuplicateProvider { name };
            error!("{}", err);
            return Err(err);
        }

        debug!(name = %name, "Provider registered");
        providers.insert(name, configure);
        Ok(self)
    }

    pub(crate) fn materialize(&self, context: &Context) -> BTreeMap<Box<str>, BoxCloneProvide> {
        let configures: Vec<(Box<str>, ConfigureFn)> = self
            .providers
            .lock()
            .iter()
            .map(|(name, configure)| (name.clone(), configure.clone()))
            .collect();

        let providers: BTreeMap<Box<str>, BoxCloneProvide> = configures
            .into_iter()
            .map(|(name, configure)| (name, configure(context)))
            .collect();
        debug!(count = providers.len(), "Providers materialized");
        providers
    }
}

impl Default for ProviderRegistry {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

fn builtin(provide: fn(ProvideRequest) -> Result<Option<Value>, ResolveErrorKind>) -> ConfigureFn {
    Arc::new(move |_context| BoxCloneProvide(Box::new(provide_fn(provide))))
}

fn provide_value(request: ProvideRequest) -> Result<Option<Value>, ResolveErrorKind> {
    Ok(request.subject.into_value())
}

fn provide_producer(request: ProvideRequest) -> Result<Option<Value>, ResolveErrorKind> {
    let ProvideRequest { subject, context, .. } = request;
    context.resolve_subject(&subject)
}

fn provide_singleton(request: ProvideRequest) -> Result<Option<Value>, ResolveErrorKind> {
    let ProvideRequest { subject, slot, context, .. } = request;
    slot.get_or_try_init(|| context.resolve_subject(&subject))
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::{
        format,
        string::{String, ToString as _},
        sync::Arc,
    };
    use core::sync::atomic::{AtomicU8, Ordering};
    use tracing::debug;
    use tracing_test::traced_test;

    use super::{Provider, ProviderRegistry, ProvideRequest, Slot};
    use crate::{
        any::{value, Value},
        errors::{RegistryErrorKind, ResolveErrorKind, WireErrorKind},
        Context,
    };

    #[test]
    fn test_register_duplicate_name() {
        let registry = ProviderRegistry::new();

        assert!(matches!(
            registry.register(Provider::new("value", |_context: &Context| {
                |request: ProvideRequest| -> Result<Option<Value>, ResolveErrorKind> {
                    Ok(request.subject.into_value())
                }
            })),
            Err(RegistryErrorKind::DuplicateProvider { name }) if &*name == "value",
        ));
    }

    #[test]
    #[traced_test]
    fn test_custom_provider() {
        let configure_count = Arc::new(AtomicU8::new(0));
        let provide_count = Arc::new(AtomicU8::new(0));

        let registry = ProviderRegistry::new();
        registry
            .register(Provider::new("tagged", {
                let configure_count = configure_count.clone();
                let provide_count = provide_count.clone();
                move |_context: &Context| {
                    configure_count.fetch_add(1, Ordering::SeqCst);

                    let provide_count = provide_count.clone();
                    move |request: ProvideRequest| -> Result<Option<Value>, ResolveErrorKind> {
                        provide_count.fetch_add(1, Ordering::SeqCst);

                        let tagged = request
                            .subject
                            .into_value()
                            .and_then(|subject| subject.downcast::<&str>().ok())
                            .map(|subject| value(format!("tagged {subject}")));
                        Ok(tagged)
                    }
                }
            }))
            .unwrap();

        let context = Context::builder().registry(registry).build();
        assert_eq!(configure_count.load(Ordering::SeqCst), 1);

        context.wire(value("brick")).as_provider("tagged", "brick").unwrap();
        assert_eq!(provide_count.load(Ordering::SeqCst), 0);

        let retrieved = context.retrieve("brick").unwrap();
        assert_eq!(*retrieved.downcast::<String>().unwrap(), "tagged brick");
        assert_eq!(provide_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_constructable_flag_reaches_provider() {
        let registry = ProviderRegistry::new();
        registry
            .register(Provider::new("flag-check", |_context: &Context| {
                |request: ProvideRequest| -> Result<Option<Value>, ResolveErrorKind> {
                    Ok(Some(value(request.constructable)))
                }
            }))
            .unwrap();

        let context = Context::builder().registry(registry).build();
        context
            .wire(value(()))
            .constructable()
            .as_provider("flag-check", "flagged")
            .unwrap();
        context.wire(value(())).as_provider("flag-check", "plain").unwrap();

        assert!(*context.get::<bool>("flagged").unwrap());
        assert!(!*context.get::<bool>("plain").unwrap());
    }

    #[test]
    fn test_registration_invisible_to_existing_contexts() {
        let registry = ProviderRegistry::new();
        let early = Context::builder().registry(registry.clone()).build();

        registry
            .register(Provider::new("late", |_context: &Context| {
                |request: ProvideRequest| -> Result<Option<Value>, ResolveErrorKind> {
                    Ok(request.subject.into_value())
                }
            }))
            .unwrap();

        assert!(matches!(
            early.wire(value(1_i32)).as_provider("late", "one"),
            Err(WireErrorKind::UnknownProvider { name }) if &*name == "late",
        ));

        let fresh = Context::builder().registry(registry).build();
        fresh.wire(value(1_i32)).as_provider("late", "one").unwrap();
        assert_eq!(*fresh.retrieve("one").unwrap().downcast::<i32>().unwrap(), 1);
    }

    #[test]
    fn test_global_registry_is_shared() {
        ProviderRegistry::global()
            .register(Provider::new("shared-between-handles", |_context: &Context| {
                |request: ProvideRequest| -> Result<Option<Value>, ResolveErrorKind> {
                    Ok(request.subject.into_value())
                }
            }))
            .unwrap();

        let context = Context::new();
        context
            .wire(value(2_i8))
            .as_provider("shared-between-handles", "two")
            .unwrap();
        assert_eq!(*context.retrieve("two").unwrap().downcast::<i8>().unwrap(), 2);
    }

    #[test]
    #[traced_test]
    fn test_slot_caches_first_value() {
        let slot = Slot::new();
        let init_count = AtomicU8::new(0);

        let first = slot
            .get_or_try_init(|| {
                init_count.fetch_add(1, Ordering::SeqCst);
                Ok(Some(value(42_i32)))
            })
            .unwrap()
            .unwrap();
        let second = slot
            .get_or_try_init(|| {
                init_count.fetch_add(1, Ordering::SeqCst);
                debug!("Never runs");
                Ok(Some(value(0_i32)))
            })
            .unwrap()
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(init_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_slot_retries_after_none() {
        let slot = Slot::new();

        let missing = slot.get_or_try_init(|| Ok(None)).unwrap();
        assert!(missing.is_none());

        let found = slot.get_or_try_init(|| Ok(Some(value(1_u8)))).unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn test_slot_retries_after_error() {
        let slot = Slot::new();

        let err = slot
            .get_or_try_init(|| {
                Err(ResolveErrorKind::KeyNotFound {
                    key: "missing".into(),
                })
            })
            .unwrap_err();
        assert!(matches!(err, ResolveErrorKind::KeyNotFound { .. }));

        let found = slot.get_or_try_init(|| Ok(Some(value(1_u8)))).unwrap();
        assert!(found.is_some());
    }
}
