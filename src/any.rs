use alloc::sync::Arc;
use core::any::Any;

/// Type-erased value stored in and handed out by a [`Context`](crate::Context).
pub type Value = Arc<dyn Any + Send + Sync>;

/// Erases `val` into a [`Value`].
#[inline]
#[must_use]
pub fn value<T: Send + Sync + 'static>(val: T) -> Value {
    Arc::new(val)
}
