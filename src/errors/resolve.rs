use alloc::boxed::Box;

use super::callable::InvokeErrorKind;

#[derive(thiserror::Error, Debug)]
pub enum ResolveErrorKind {
    #[error("Wiring not found for key '{key}'")]
    KeyNotFound { key: Box<str> },
    #[error("Cannot resolve a non-callable subject, kind: {kind}")]
    NotCallable { kind: &'static str },
    #[error("Cannot use anything else but overrides or a context to override dependency resolutions")]
    InvalidOverride,
    #[error("Deferred load failed for key '{key}': {source}")]
    Load { key: Box<str>, source: anyhow::Error },
    #[error(transparent)]
    Invoke(#[from] InvokeErrorKind),
}
