use crate::{
    any::{value, Value},
    callable::Callable,
    deferred::Deferred,
};

/// What a wiring binds a key to.
#[derive(Clone)]
pub enum Subject {
    /// The outcome of a resolution that produced nothing. Cannot be wired.
    Undefined,
    Value(Value),
    Callable(Callable),
    Deferred(Deferred),
}

impl Subject {
    /// Name of the subject kind, for diagnostics.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Subject::Undefined => "undefined",
            Subject::Value(_) => "value",
            Subject::Callable(_) => "callable",
            Subject::Deferred(_) => "deferred",
        }
    }

    #[inline]
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Subject::Undefined)
    }

    #[inline]
    #[must_use]
    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Subject::Callable(callable) => Some(callable),
            _ => None,
        }
    }

    /// Converts the subject into the value the `value` provider hands out.
    ///
    /// A callable or deferred subject is handed out as a value itself.
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Subject::Undefined => None,
            Subject::Value(val) => Some(val),
            Subject::Callable(callable) => Some(value(callable)),
            Subject::Deferred(deferred) => Some(value(deferred)),
        }
    }
}

impl From<Value> for Subject {
    #[inline]
    fn from(value: Value) -> Self {
        Subject::Value(value)
    }
}

impl From<Callable> for Subject {
    #[inline]
    fn from(callable: Callable) -> Self {
        Subject::Callable(callable)
    }
}

impl From<Deferred> for Subject {
    #[inline]
    fn from(deferred: Deferred) -> Self {
        Subject::Deferred(deferred)
    }
}

impl From<Option<Value>> for Subject {
    #[inline]
    fn from(value: Option<Value>) -> Self {
        match value {
            Some(value) => Subject::Value(value),
            None => Subject::Undefined,
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::Subject;
    use crate::{any::value, callable::Callable};

    #[test]
    fn test_kind_names() {
        assert_eq!(Subject::Undefined.kind(), "undefined");
        assert_eq!(Subject::from(value(1_u8)).kind(), "value");
        assert_eq!(Subject::from(Callable::new(&[], |_| Ok(None))).kind(), "callable");
    }

    #[test]
    fn test_from_absent_value() {
        let subject = Subject::from(None);

        assert!(subject.is_undefined());
        assert!(subject.into_value().is_none());
    }

    #[test]
    fn test_callable_into_value() {
        let subject = Subject::from(Callable::new(&["key"], |_| Ok(None)));

        let callable = subject.into_value().unwrap().downcast::<Callable>().unwrap();
        assert_eq!(callable.keys().len(), 1);
    }
}
