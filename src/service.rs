use alloc::boxed::Box;

use crate::{any::Value, errors::ResolveErrorKind, registry::ProvideRequest};

pub(crate) trait Provide {
    fn call(&mut self, request: ProvideRequest) -> Result<Option<Value>, ResolveErrorKind>;
}

pub(crate) trait CloneProvide: Provide {
    #[must_use]
    fn clone_box(&self) -> Box<dyn CloneProvide + Send + Sync>;
}

impl<T> CloneProvide for T
where
    T: Provide + Clone + Send + Sync + 'static,
{
    #[inline]
    fn clone_box(&self) -> Box<dyn CloneProvide + Send + Sync> {
        Box::new(self.clone())
    }
}

pub(crate) struct BoxCloneProvide(pub(crate) Box<dyn CloneProvide + Send + Sync>);

impl Clone for BoxCloneProvide {
    #[inline]
    fn clone(&self) -> Self {
        Self(self.0.clone_box())
    }
}

impl Provide for BoxCloneProvide {
    #[inline]
    fn call(&mut self, request: ProvideRequest) -> Result<Option<Value>, ResolveErrorKind> {
        self.0.call(request)
    }
}

#[inline]
#[must_use]
pub(crate) const fn provide_fn<T>(f: T) -> ProvideFn<T> {
    ProvideFn { f }
}

#[derive(Clone)]
pub(crate) struct ProvideFn<T> {
    f: T,
}

impl<F> Provide for ProvideFn<F>
where
    F: FnMut(ProvideRequest) -> Result<Option<Value>, ResolveErrorKind>,
{
    #[inline]
    fn call(&mut self, request: ProvideRequest) -> Result<Option<Value>, ResolveErrorKind> {
        (self.f)(request)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::boxed::Box;

    use super::{provide_fn, BoxCloneProvide, Provide as _};
    use crate::{
        any::value,
        errors::ResolveErrorKind,
        registry::{ProvideRequest, Slot},
        Context, Subject,
    };

    #[test]
    fn test_provide_fn() {
        let provider = BoxCloneProvide(Box::new(provide_fn(|request: ProvideRequest| {
            Ok::<_, ResolveErrorKind>(request.subject.into_value())
        })));

        let mut cloned = provider.clone();
        let provided = cloned
            .call(ProvideRequest {
                subject: Subject::from(value(true)),
                constructable: false,
                slot: Slot::new(),
                context: Context::new(),
            })
            .unwrap()
            .unwrap();

        assert!(*provided.downcast::<bool>().unwrap());
    }
}
