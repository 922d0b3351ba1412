use alloc::sync::Arc;
use core::any::TypeId;

use crate::{any::Value, errors::InvokeErrorKind};

/// Extraction of a typed dependency from a resolved [`Value`].
pub trait FromValue: Sized {
    /// # Errors
    /// Returns [`InvokeErrorKind::IncorrectType`] if the value is not of the expected type
    fn from_value(value: Value) -> Result<Self, InvokeErrorKind>;
}

/// Wrapper for a dependency retrieved by key and downcast to `Dep`.
pub struct Inject<Dep>(pub Arc<Dep>);

impl<Dep: Send + Sync + 'static> FromValue for Inject<Dep> {
    fn from_value(value: Value) -> Result<Self, InvokeErrorKind> {
        value.downcast().map(Self).map_err(|value| InvokeErrorKind::IncorrectType {
            expected: TypeId::of::<Dep>(),
            actual: (*value).type_id(),
        })
    }
}

impl FromValue for Value {
    #[inline]
    fn from_value(value: Value) -> Result<Self, InvokeErrorKind> {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::{FromValue as _, Inject};
    use crate::{
        any::{value, Value},
        errors::InvokeErrorKind,
    };

    struct Database(bool);

    #[test]
    fn test_inject() {
        let Inject(database) = Inject::<Database>::from_value(value(Database(true))).unwrap();

        assert!(database.0);
    }

    #[test]
    fn test_inject_incorrect_type() {
        assert!(matches!(
            Inject::<Database>::from_value(value(42_i32)),
            Err(InvokeErrorKind::IncorrectType { .. })
        ));
    }

    #[test]
    fn test_value_identity() {
        let raw = Value::from_value(value(1_u8)).unwrap();

        assert_eq!(*raw.downcast::<u8>().unwrap(), 1);
    }
}
