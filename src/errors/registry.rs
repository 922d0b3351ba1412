use alloc::boxed::Box;

#[derive(thiserror::Error, Debug)]
pub enum RegistryErrorKind {
    #[error("Provider already registered for '{name}'")]
    DuplicateProvider { name: Box<str> },
}
