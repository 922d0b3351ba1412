use alloc::{boxed::Box, collections::BTreeMap, vec::Vec};
use tracing::{debug, error, info_span};

use crate::{
    any::Value,
    callable::{Args, Callable},
    context::Context,
    errors::ResolveErrorKind,
    subject::Subject,
};

/// A plain key-to-value map shadowing context wirings during one resolution.
#[derive(Clone, Default)]
pub struct Overrides {
    map: BTreeMap<Box<str>, Value>,
}

impl Overrides {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { map: BTreeMap::new() }
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.map.insert(key.into(), value);
    }

    #[must_use]
    pub(crate) fn get(&self, key: &str) -> Option<Value> {
        self.map.get(key).cloned()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K> FromIterator<(K, Value)> for Overrides
where
    K: Into<Box<str>>,
{
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().map(|(key, value)| (key.into(), value)).collect(),
        }
    }
}

/// What [`Context::using`] accepts as an override source.
///
/// A callable source is resolved against the origin context right away and
/// must produce a [`Context`] or an [`Overrides`].
pub enum OverrideSource {
    Context(Context),
    Overrides(Overrides),
    Callable(Callable),
}

impl From<Context> for OverrideSource {
    fn from(context: Context) -> Self {
        Self::Context(context)
    }
}

impl From<&Context> for OverrideSource {
    fn from(context: &Context) -> Self {
        Self::Context(context.clone())
    }
}

impl From<Overrides> for OverrideSource {
    fn from(overrides: Overrides) -> Self {
        Self::Overrides(overrides)
    }
}

impl From<Callable> for OverrideSource {
    fn from(callable: Callable) -> Self {
        Self::Callable(callable)
    }
}

pub(crate) enum ResolvedSource {
    Context(Context),
    Overrides(Overrides),
}

/// A resolution view pairing an origin context with an override source.
///
/// Created by [`Context::using`]; call [`resolve`](Using::resolve) on it.
pub struct Using {
    origin: Context,
    source: ResolvedSource,
}

impl Using {
    pub(crate) fn with_resolved(origin: Context, source: ResolvedSource) -> Self {
        Self { origin, source }
    }

    pub(crate) fn new(origin: Context, source: OverrideSource) -> Result<Self, ResolveErrorKind> {
        let source = match source {
            OverrideSource::Context(context) => ResolvedSource::Context(context),
            OverrideSource::Overrides(overrides) => ResolvedSource::Overrides(overrides),
            OverrideSource::Callable(callable) => {
                let Some(resolved) = origin.resolve(&callable)? else {
                    let err = ResolveErrorKind::InvalidOverride;
                    error!("{}", err);
                    return Err(err);
                };

                match resolved.downcast::<Context>() {
                    Ok(context) => ResolvedSource::Context((*context).clone()),
                    Err(resolved) => match resolved.downcast::<Overrides>() {
                        Ok(overrides) => ResolvedSource::Overrides((*overrides).clone()),
                        Err(_) => {
                            let err = ResolveErrorKind::InvalidOverride;
                            error!("{}", err);
                            return Err(err);
                        }
                    },
                }
            }
        };

        Ok(Self::with_resolved(origin, source))
    }

    /// Resolves the callable's keys through the override source and invokes it.
    ///
    /// A context source is checked against its own wirings first, with the
    /// full origin chain as fallback; the source's own parents are never
    /// consulted. An overrides source falls back to the origin chain for
    /// every key it doesn't shadow.
    ///
    /// # Errors
    /// [`ResolveErrorKind::KeyNotFound`] if a key is wired nowhere, or the
    /// invoke error of the callable itself.
    pub fn resolve(&self, callable: &Callable) -> Result<Option<Value>, ResolveErrorKind> {
        let span = info_span!("resolve", keys = ?callable.keys());
        let _guard = span.enter();

        let mut resolved = Vec::with_capacity(callable.keys().len());
        for key in callable.keys() {
            let value = match &self.source {
                ResolvedSource::Context(source) => source.retrieve_with_fallback(key, Some(&self.origin))?,
                ResolvedSource::Overrides(overrides) => match overrides.get(key) {
                    Some(value) => {
                        debug!(key = %key, "Overridden");
                        value
                    }
                    None => self.origin.retrieve(key)?,
                },
            };
            resolved.push(value);
        }

        match callable.call(Args::new(resolved)) {
            Ok(value) => Ok(value),
            Err(err) => {
                error!("{}", err);
                Err(err.into())
            }
        }
    }

    /// [`resolve`](Using::resolve) for an untyped subject.
    ///
    /// # Errors
    /// [`ResolveErrorKind::NotCallable`] if the subject holds no callable.
    pub fn resolve_subject(&self, subject: &Subject) -> Result<Option<Value>, ResolveErrorKind> {
        match subject.as_callable() {
            Some(callable) => self.resolve(callable),
            None => {
                let err = ResolveErrorKind::NotCallable { kind: subject.kind() };
                error!("{}", err);
                Err(err)
            }
        }
    }
}
