use alloc::{
    boxed::Box,
    collections::BTreeMap,
    sync::{Arc, Weak},
};
use core::any::TypeId;
use parking_lot::Mutex;
use tracing::{debug, error, info_span};

use crate::{
    any::Value,
    cache::{Cache, Registration},
    callable::Callable,
    deferred::Deferred,
    errors::{InvokeErrorKind, ResolveErrorKind, WireErrorKind},
    loader::ModuleLoader,
    registry::{ProvideRequest, ProviderRegistry, Slot, PRODUCER, SINGLETON, VALUE},
    service::{BoxCloneProvide, Provide as _},
    subject::Subject,
    using::{OverrideSource, Overrides, ResolvedSource, Using},
};

/// A string-keyed hierarchical wiring container.
///
/// Subjects are wired under keys through named provider strategies and
/// retrieved by key, falling back to the parent chain. A context is a cheap
/// handle; clones share wirings.
///
/// # Examples
///
/// ```
/// use trowel::{value, Context};
///
/// let context = Context::new();
/// context.wire(value("So long")).value("foo")?;
///
/// assert_eq!(*context.get::<&str>("foo")?, "So long");
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Clone)]
pub struct Context {
    pub(crate) inner: Arc<ContextInner>,
}

pub(crate) struct ContextInner {
    cache: Mutex<Cache>,
    providers: Mutex<BTreeMap<Box<str>, BoxCloneProvide>>,
    registry: ProviderRegistry,
    loader: Option<Arc<dyn ModuleLoader>>,
    parent: Option<Context>,
}

impl Context {
    /// Creates a root context over [`ProviderRegistry::global`], without a
    /// module loader.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    #[inline]
    #[must_use]
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Creates a child context. The child inherits this context's registry
    /// and loader and falls back to it on retrieval.
    ///
    /// # Examples
    ///
    /// ```
    /// use trowel::{value, Context};
    ///
    /// let parent = Context::new();
    /// parent.wire(value(1_u8)).value("one")?;
    ///
    /// let child = parent.spawn();
    /// assert_eq!(*child.get::<u8>("one")?, 1);
    /// assert!(!child.has("one"));
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    #[must_use]
    pub fn spawn(&self) -> Self {
        Self::builder().parent(self.clone()).build()
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<&Context> {
        self.inner.parent.as_ref()
    }

    /// Whether two handles point at the same context.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    #[inline]
    #[must_use]
    pub fn downgrade(&self) -> WeakContext {
        WeakContext {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Starts a wiring for `subject`. Nothing is registered until a provider
    /// setter on the returned [`Wiring`] is called.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use trowel::{Callable, Context, InvokeErrorKind};
    ///
    /// struct Flask;
    ///
    /// let context = Context::new();
    /// let factory = Callable::from_fn(&[], || Ok::<_, InvokeErrorKind>(Flask));
    ///
    /// // A singleton is resolved once:
    /// context.wire(factory.clone()).singleton("flask")?;
    /// let first = context.get::<Flask>("flask")?;
    /// let second = context.get::<Flask>("flask")?;
    /// assert!(Arc::ptr_eq(&first, &second));
    ///
    /// // a producer on every retrieval:
    /// context.wire(factory.clone()).producer("fresh flask")?;
    /// let first = context.get::<Flask>("fresh flask")?;
    /// let second = context.get::<Flask>("fresh flask")?;
    /// assert!(!Arc::ptr_eq(&first, &second));
    ///
    /// // and a value not at all:
    /// context.wire(factory).value("flask factory")?;
    /// let factory = context.get::<Callable>("flask factory")?;
    /// assert!(factory.keys().is_empty());
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    #[must_use]
    pub fn wire(&self, subject: impl Into<Subject>) -> Wiring {
        Wiring {
            context: self.clone(),
            subject: subject.into(),
            constructable: false,
        }
    }

    /// Starts a wiring that loads `id` through the context's module loader on
    /// first retrieval.
    ///
    /// # Errors
    /// [`WireErrorKind::NoModuleBound`] if neither this context nor its
    /// ancestry was built with a loader.
    ///
    /// # Examples
    ///
    /// ```
    /// use trowel::{Callable, Context, InvokeErrorKind, Subject};
    ///
    /// let context = Context::builder()
    ///     .loader(|id: &str| -> anyhow::Result<Subject> {
    ///         let id = String::from(id);
    ///         Ok(Subject::from(Callable::from_fn(&[], move || {
    ///             Ok::<_, InvokeErrorKind>(format!("module {id}"))
    ///         })))
    ///     })
    ///     .build();
    ///
    /// // nothing is loaded yet
    /// context.require("./greeting")?.singleton("greeting")?;
    ///
    /// assert_eq!(*context.get::<String>("greeting")?, "module ./greeting");
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn require(&self, id: &str) -> Result<Wiring, WireErrorKind> {
        let span = info_span!("require", id);
        let _guard = span.enter();

        let Some(loader) = self.inner.loader.clone() else {
            let err = WireErrorKind::NoModuleBound;
            error!("{}", err);
            return Err(err);
        };

        let id: Box<str> = id.into();
        Ok(self.wire(Deferred::new(move || loader.load(&id))))
    }

    /// Retrieves the value wired to `key`, through whatever provider it was
    /// wired with. Keys missing here are looked up through the parent chain.
    ///
    /// # Errors
    /// - [`ResolveErrorKind::KeyNotFound`] if no context in the chain has the
    ///   key, or its provider produced nothing
    /// - [`ResolveErrorKind::Load`] if a deferred subject failed to load
    /// - resolution errors of the wired subject itself
    pub fn retrieve(&self, key: &str) -> Result<Value, ResolveErrorKind> {
        self.retrieve_with_fallback(key, self.inner.parent.as_ref())
    }

    /// Typed [`retrieve`](Self::retrieve).
    ///
    /// # Errors
    /// [`InvokeErrorKind::IncorrectType`] if the value is not a `T`, plus
    /// everything [`retrieve`](Self::retrieve) returns.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Result<Arc<T>, ResolveErrorKind> {
        match self.retrieve(key)?.downcast::<T>() {
            Ok(value) => Ok(value),
            Err(value) => {
                let err = ResolveErrorKind::Invoke(InvokeErrorKind::IncorrectType {
                    expected: TypeId::of::<T>(),
                    actual: (*value).type_id(),
                });
                error!("{}", err);
                Err(err)
            }
        }
    }

    /// Whether `key` is wired in this context. Parents are not consulted.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.inner.cache.lock().contains(key)
    }

    /// Removes the wiring for `key` from this context, returning whether one
    /// existed. The key can be wired again afterwards.
    pub fn release(&self, key: &str) -> bool {
        let released = self.inner.cache.lock().remove(key);
        if released {
            debug!(key, "Released");
        }
        released
    }

    /// Resolves the callable's keys and invokes it.
    ///
    /// Keys are looked up in the parent first and fall back to this context's
    /// full chain, so a root context resolves purely from its own wirings.
    ///
    /// # Examples
    ///
    /// ```
    /// use trowel::{value, Callable, Context, Inject, InvokeErrorKind};
    ///
    /// let context = Context::new();
    /// context
    ///     .wire(value("So long")).value("foo")?
    ///     .wire(value("and thanks for all the fish!")).value("qux")?;
    ///
    /// let farewell = context.resolve(&Callable::from_fn(
    ///     &["foo", "qux"],
    ///     |Inject(foo): Inject<&str>, Inject(qux): Inject<&str>| {
    ///         Ok::<_, InvokeErrorKind>(format!("{foo}, {qux}"))
    ///     },
    /// ))?;
    /// assert_eq!(
    ///     *farewell.unwrap().downcast::<String>().unwrap(),
    ///     "So long, and thanks for all the fish!"
    /// );
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    ///
    /// # Errors
    /// [`ResolveErrorKind::KeyNotFound`] for keys wired nowhere, or the
    /// callable's own invoke error.
    pub fn resolve(&self, callable: &Callable) -> Result<Option<Value>, ResolveErrorKind> {
        self.using_parent().resolve(callable)
    }

    /// [`resolve`](Self::resolve) for an untyped subject, as stored in
    /// provide requests.
    ///
    /// # Errors
    /// [`ResolveErrorKind::NotCallable`] if the subject holds no callable.
    pub fn resolve_subject(&self, subject: &Subject) -> Result<Option<Value>, ResolveErrorKind> {
        self.using_parent().resolve_subject(subject)
    }

    /// Builds a resolution view with `source` shadowing this context's
    /// wirings.
    ///
    /// # Errors
    /// [`ResolveErrorKind::InvalidOverride`] if a callable source doesn't
    /// produce a [`Context`] or an [`Overrides`], plus resolution errors of
    /// the callable source itself.
    ///
    /// # Examples
    ///
    /// ```
    /// use trowel::{value, Callable, Context, Inject, InvokeErrorKind, Overrides};
    ///
    /// let context = Context::new();
    /// context
    ///     .wire(value("So long")).value("foo")?
    ///     .wire(value("and thanks for all the fish!")).value("qux")?;
    ///
    /// let farewell = context
    ///     .using(Overrides::new().with("foo", value("Adieu")))?
    ///     .resolve(&Callable::from_fn(
    ///         &["foo", "qux"],
    ///         |Inject(foo): Inject<&str>, Inject(qux): Inject<&str>| {
    ///             Ok::<_, InvokeErrorKind>(format!("{foo}, {qux}"))
    ///         },
    ///     ))?;
    /// assert_eq!(
    ///     *farewell.unwrap().downcast::<String>().unwrap(),
    ///     "Adieu, and thanks for all the fish!"
    /// );
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn using(&self, source: impl Into<OverrideSource>) -> Result<Using, ResolveErrorKind> {
        Using::new(self.clone(), source.into())
    }

    fn using_parent(&self) -> Using {
        let source = match self.inner.parent.as_ref() {
            Some(parent) => ResolvedSource::Context(parent.clone()),
            None => ResolvedSource::Overrides(Overrides::new()),
        };
        Using::with_resolved(self.clone(), source)
    }

    pub(crate) fn retrieve_with_fallback(&self, key: &str, fallback: Option<&Context>) -> Result<Value, ResolveErrorKind> {
        let span = info_span!("retrieve", key);
        let _guard = span.enter();

        // The lookup is its own statement so the cache stays unlocked while
        // the fallback walk re-enters `retrieve`.
        let registration = self.inner.cache.lock().get_cloned(key);
        let Some(mut registration) = registration else {
            debug!("Not found in cache");
            if let Some(fallback) = fallback {
                return fallback.retrieve(key);
            }
            let err = ResolveErrorKind::KeyNotFound { key: key.into() };
            error!("{}", err);
            return Err(err);
        };
        debug!("Found in cache");

        // Providers never see a deferred subject: it is forced here and the
        // wiring is updated in place, so the load happens at most once.
        while let Subject::Deferred(deferred) = registration.subject.clone() {
            match deferred.force() {
                Ok(subject) => {
                    self.inner.cache.lock().replace_subject(key, subject.clone());
                    registration.subject = subject;
                }
                Err(source) => {
                    let err = ResolveErrorKind::Load { key: key.into(), source };
                    error!("{}", err);
                    return Err(err);
                }
            }
        }

        let Registration {
            subject,
            mut provider,
            constructable,
            slot,
        } = registration;

        let provided = provider.call(ProvideRequest {
            subject,
            constructable,
            slot,
            context: self.clone(),
        })?;

        match provided {
            Some(value) => Ok(value),
            None => {
                let err = ResolveErrorKind::KeyNotFound { key: key.into() };
                error!("{}", err);
                Err(err)
            }
        }
    }
}

impl Default for Context {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// A non-owning [`Context`] handle.
///
/// Custom providers configured with a context should keep one of these
/// instead of a strong handle: the context owns its providers, so a strong
/// handle inside a provider keeps the context alive forever.
#[derive(Clone)]
pub struct WeakContext {
    inner: Weak<ContextInner>,
}

impl WeakContext {
    /// Upgrades back to a strong handle if the context is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Context> {
        self.inner.upgrade().map(|inner| Context { inner })
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    parent: Option<Context>,
    registry: Option<ProviderRegistry>,
    loader: Option<Arc<dyn ModuleLoader>>,
}

impl ContextBuilder {
    #[must_use]
    pub fn parent(mut self, parent: Context) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets the provider registry. Unset, the parent's registry is used, or
    /// [`ProviderRegistry::global`] for a root context.
    #[must_use]
    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the module loader backing [`Context::require`]. Unset, the
    /// parent's loader is used, if any.
    #[must_use]
    pub fn loader(mut self, loader: impl ModuleLoader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Builds the context and materializes its providers from the registry.
    #[must_use]
    pub fn build(self) -> Context {
        let Self { parent, registry, loader } = self;

        let registry = registry
            .or_else(|| parent.as_ref().map(|parent| parent.inner.registry.clone()))
            .unwrap_or_else(ProviderRegistry::global);
        let loader = loader.or_else(|| parent.as_ref().and_then(|parent| parent.inner.loader.clone()));

        let context = Context {
            inner: Arc::new(ContextInner {
                cache: Mutex::new(Cache::new()),
                providers: Mutex::new(BTreeMap::new()),
                registry: registry.clone(),
                loader,
                parent,
            }),
        };
        *context.inner.providers.lock() = registry.materialize(&context);
        context
    }
}

/// A pending wiring, finished by one of the provider setters.
pub struct Wiring {
    context: Context,
    subject: Subject,
    constructable: bool,
}

impl Wiring {
    /// Marks the subject as meant to be constructed rather than called.
    /// Built-in providers ignore the flag; custom providers see it on their
    /// requests.
    #[must_use]
    pub fn constructable(mut self) -> Self {
        self.constructable = true;
        self
    }

    /// Wires the subject to be handed back as-is.
    ///
    /// # Errors
    /// See [`Self::as_provider`].
    pub fn value(self, key: &str) -> Result<Context, WireErrorKind> {
        self.as_provider(VALUE, key)
    }

    /// Wires the subject to be resolved and invoked on every retrieval.
    ///
    /// # Errors
    /// See [`Self::as_provider`].
    pub fn producer(self, key: &str) -> Result<Context, WireErrorKind> {
        self.as_provider(PRODUCER, key)
    }

    /// Wires the subject to be resolved once, on first retrieval.
    ///
    /// # Errors
    /// See [`Self::as_provider`].
    pub fn singleton(self, key: &str) -> Result<Context, WireErrorKind> {
        self.as_provider(SINGLETON, key)
    }

    /// Wires the subject under `key` through the named provider, and returns
    /// the context for chaining.
    ///
    /// # Errors
    /// - [`WireErrorKind::UnknownProvider`] if the context has no provider
    ///   with that name
    /// - [`WireErrorKind::UndefinedSubject`] if the subject is undefined
    /// - [`WireErrorKind::DuplicateKey`] if the key is already wired in this
    ///   context
    /// - [`WireErrorKind::InvalidKey`] if the key is empty
    pub fn as_provider(self, name: &str, key: &str) -> Result<Context, WireErrorKind> {
        let span = info_span!("wire", provider = name, key);
        let _guard = span.enter();

        let Self {
            context,
            subject,
            constructable,
        } = self;

        let Some(provider) = context.inner.providers.lock().get(name).cloned() else {
            let err = WireErrorKind::UnknownProvider { name: name.into() };
            error!("{}", err);
            return Err(err);
        };
        if subject.is_undefined() {
            let err = WireErrorKind::UndefinedSubject { provider: name.into() };
            error!("{}", err);
            return Err(err);
        }
        if context.has(key) {
            let err = WireErrorKind::DuplicateKey { key: key.into() };
            error!("{}", err);
            return Err(err);
        }
        if key.is_empty() {
            let err = WireErrorKind::InvalidKey { key: key.into() };
            error!("{}", err);
            return Err(err);
        }

        context.inner.cache.lock().insert(
            key.into(),
            Registration {
                subject,
                provider,
                constructable,
                slot: Slot::new(),
            },
        );
        debug!("Wired");
        Ok(context)
    }
}
