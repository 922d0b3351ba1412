use core::any::TypeId;

#[derive(thiserror::Error, Debug)]
pub enum InvokeErrorKind {
    #[error("Incorrect count of resolved dependencies. Actual: {actual}, expected: {expected}")]
    DependencyCount { expected: usize, actual: usize },
    #[error("Incorrect dependency type. Actual: {actual:?}, expected: {expected:?}")]
    IncorrectType { expected: TypeId, actual: TypeId },
    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}
