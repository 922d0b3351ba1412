use crate::subject::Subject;

/// The module system behind [`Context::require`](crate::Context::require).
///
/// Given a module id, produces the subject to wire. Implemented for closures:
///
/// ```rust
/// use trowel::{value, Context, Subject};
///
/// let context = Context::builder()
///     .loader(|id: &str| -> anyhow::Result<Subject> { Ok(Subject::from(value(format!("loaded {id}")))) })
///     .build();
/// ```
pub trait ModuleLoader: Send + Sync {
    /// # Errors
    /// Returns an error if the module cannot be loaded
    fn load(&self, id: &str) -> Result<Subject, anyhow::Error>;
}

impl<F> ModuleLoader for F
where
    F: Fn(&str) -> Result<Subject, anyhow::Error> + Send + Sync,
{
    #[inline]
    fn load(&self, id: &str) -> Result<Subject, anyhow::Error> {
        self(id)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use anyhow::anyhow;

    use super::ModuleLoader;
    use crate::{any::value, subject::Subject};

    #[test]
    fn test_closure_loader() {
        let loader = |id: &str| match id {
            "./answer" => Ok(Subject::from(value(42_i32))),
            _ => Err(anyhow!("no module '{id}'")),
        };

        assert!(matches!(loader.load("./answer"), Ok(Subject::Value(_))));
        assert!(loader.load("./missing").is_err());
    }
}
