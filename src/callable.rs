use alloc::{boxed::Box, sync::Arc, vec::Vec};

use crate::{
    any::{value, Value},
    errors::InvokeErrorKind,
    inject::FromValue,
};

/// Positional dependency values handed to a callable on invocation,
/// ordered as the callable's declared keys.
pub struct Args(Box<[Value]>);

impl Args {
    #[inline]
    #[must_use]
    pub(crate) fn new(values: Vec<Value>) -> Self {
        Self(values.into_boxed_slice())
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, Value> {
        self.0.iter()
    }
}

pub trait Factory<Args>: Clone + 'static {
    type Output: 'static;
    type Error: Into<InvokeErrorKind>;

    fn invoke(&mut self, args: Args) -> Result<Self::Output, Self::Error>;
}

macro_rules! impl_factory {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case)]
        impl<F, Response, Err, $($ty,)*> Factory<($($ty,)*)> for F
        where
            F: FnMut($($ty,)*) -> Result<Response, Err> + Clone + 'static,
            Response: 'static,
            Err: Into<InvokeErrorKind>,
            $( $ty: FromValue, )*
        {
            type Output = Response;
            type Error = Err;

            fn invoke(&mut self, ($($ty,)*): ($($ty,)*)) -> Result<Self::Output, Self::Error> {
                self($($ty,)*)
            }
        }
    };
}

all_the_tuples!(impl_factory);

pub(crate) trait FromArgs: Sized {
    const LEN: usize;

    fn from_args(args: &Args) -> Result<Self, InvokeErrorKind>;
}

macro_rules! impl_from_args {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case, unused_variables, unused_mut, clippy::unused_unit)]
        impl<$($ty,)*> FromArgs for ($($ty,)*)
        where
            $( $ty: FromValue, )*
        {
            const LEN: usize = <[&str]>::len(&[$(stringify!($ty)),*]);

            fn from_args(args: &Args) -> Result<Self, InvokeErrorKind> {
                if args.len() != Self::LEN {
                    return Err(InvokeErrorKind::DependencyCount {
                        expected: Self::LEN,
                        actual: args.len(),
                    });
                }
                let mut values = args.iter();
                Ok(($(
                    match values.next() {
                        Some(value) => $ty::from_value(value.clone())?,
                        None => {
                            return Err(InvokeErrorKind::DependencyCount {
                                expected: Self::LEN,
                                actual: args.len(),
                            })
                        }
                    },
                )*))
            }
        }
    };
}

all_the_tuples!(impl_from_args);

type InvokeFn = Arc<dyn Fn(Args) -> Result<Option<Value>, InvokeErrorKind> + Send + Sync>;

/// A subject invokable with resolved dependencies.
///
/// The dependency keys are declared explicitly and are resolved in order
/// before every invocation. Keys are trimmed and blank entries are dropped.
/// `Ok(None)` from an invocation means the callable produced nothing, which
/// [`Context::retrieve`](crate::Context::retrieve) reports as a missing key.
#[derive(Clone)]
pub struct Callable {
    keys: Arc<[Box<str>]>,
    f: InvokeFn,
}

impl Callable {
    /// Creates a callable from declared keys and a closure over raw [`Args`].
    pub fn new<F>(keys: &[&str], f: F) -> Self
    where
        F: Fn(Args) -> Result<Option<Value>, InvokeErrorKind> + Send + Sync + 'static,
    {
        Self {
            keys: filter_keys(keys),
            f: Arc::new(f),
        }
    }

    /// Creates a callable from declared keys and a typed factory.
    ///
    /// Dependency values are downcast per parameter, see [`FromValue`]. A key
    /// count that disagrees with the factory's parameter count fails each
    /// invocation with [`InvokeErrorKind::DependencyCount`].
    #[allow(private_bounds)]
    pub fn from_fn<F, FnArgs>(keys: &[&str], factory: F) -> Self
    where
        F: Factory<FnArgs> + Send + Sync,
        F::Output: Send + Sync,
        FnArgs: FromArgs,
    {
        Self::new(keys, move |args| {
            let fn_args = FnArgs::from_args(&args)?;
            match factory.clone().invoke(fn_args) {
                Ok(output) => Ok(Some(value(output))),
                Err(err) => Err(err.into()),
            }
        })
    }

    /// Declared dependency keys, in invocation order.
    #[inline]
    #[must_use]
    pub fn keys(&self) -> &[Box<str>] {
        &self.keys
    }

    /// Invokes the callable with already resolved dependency values.
    ///
    /// # Errors
    /// Returns [`InvokeErrorKind`] if the values cannot be turned into the
    /// callable's arguments or the callable itself fails
    pub fn call(&self, args: Args) -> Result<Option<Value>, InvokeErrorKind> {
        (self.f)(args)
    }
}

fn filter_keys(keys: &[&str]) -> Arc<[Box<str>]> {
    keys.iter()
        .filter_map(|key| {
            let trimmed = key.trim();
            (!trimmed.is_empty()).then(|| Box::<str>::from(trimmed))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::{
        format,
        string::{String, ToString as _},
        sync::Arc,
        vec,
        vec::Vec,
    };
    use core::sync::atomic::{AtomicU8, Ordering};
    use tracing::debug;
    use tracing_test::traced_test;

    use super::{Args, Callable};
    use crate::{any::value, errors::InvokeErrorKind, inject::Inject};

    struct Database(bool);
    struct Config(u8);

    #[test]
    fn test_keys_trimmed_and_blank_dropped() {
        let callable = Callable::new(&["  config ", "", "   ", "database"], |_| Ok(None));

        let keys: Vec<&str> = callable.keys().iter().map(|key| &**key).collect();
        assert_eq!(keys, ["config", "database"]);
    }

    #[test]
    #[traced_test]
    fn test_from_fn_typed_extraction() {
        let call_count = Arc::new(AtomicU8::new(0));

        let callable = Callable::from_fn(&["database", "config"], {
            let call_count = call_count.clone();
            move |Inject(database): Inject<Database>, Inject(config): Inject<Config>| {
                call_count.fetch_add(1, Ordering::SeqCst);

                debug!("Call factory");
                Ok::<_, InvokeErrorKind>(database.0 && config.0 == 7)
            }
        });

        let produced = callable
            .call(Args::new(vec![value(Database(true)), value(Config(7))]))
            .unwrap()
            .unwrap();

        assert!(*produced.downcast::<bool>().unwrap());
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_from_fn_dependency_count() {
        let callable = Callable::from_fn(&["database", "config"], |Inject(database): Inject<Database>| {
            Ok::<_, InvokeErrorKind>(database.0)
        });

        assert!(matches!(
            callable.call(Args::new(vec![value(Database(true)), value(Config(7))])),
            Err(InvokeErrorKind::DependencyCount { expected: 1, actual: 2 })
        ));
    }

    #[test]
    fn test_from_fn_incorrect_type() {
        let callable = Callable::from_fn(&["database"], |Inject(database): Inject<Database>| {
            Ok::<_, InvokeErrorKind>(database.0)
        });

        assert!(matches!(
            callable.call(Args::new(vec![value(Config(7))])),
            Err(InvokeErrorKind::IncorrectType { .. })
        ));
    }

    #[test]
    fn test_zero_arity() {
        let callable = Callable::from_fn(&[], || Ok::<_, InvokeErrorKind>(42_i32));

        let produced = callable.call(Args::new(vec![])).unwrap().unwrap();

        assert_eq!(*produced.downcast::<i32>().unwrap(), 42);
    }

    #[test]
    fn test_raw_callable_produces_nothing() {
        let callable = Callable::new(&[], |_| Ok(None));

        assert!(callable.call(Args::new(vec![])).unwrap().is_none());
    }

    #[test]
    fn test_raw_callable_reads_args_positionally() {
        let callable = Callable::new(&["left", "right"], |args: Args| {
            let left = *args.get(0).unwrap().clone().downcast::<i32>().unwrap();
            let right = *args.get(1).unwrap().clone().downcast::<i32>().unwrap();
            Ok(Some(value(left - right)))
        });

        let produced = callable.call(Args::new(vec![value(5_i32), value(3_i32)])).unwrap().unwrap();

        assert_eq!(*produced.downcast::<i32>().unwrap(), 2);
    }
}
