use alloc::boxed::Box;

#[derive(thiserror::Error, Debug)]
pub enum WireErrorKind {
    #[error("No provider registered for '{name}'")]
    UnknownProvider { name: Box<str> },
    #[error("Cannot wire an undefined subject as a {provider}")]
    UndefinedSubject { provider: Box<str> },
    #[error("Wiring already exists for key '{key}'")]
    DuplicateKey { key: Box<str> },
    #[error("Cannot use '{key}' as a key for wiring")]
    InvalidKey { key: Box<str> },
    #[error("Cannot require without providing a module loader")]
    NoModuleBound,
}
