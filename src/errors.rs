mod callable;
mod registry;
mod resolve;
mod wire;

pub use callable::InvokeErrorKind;
pub use registry::RegistryErrorKind;
pub use resolve::ResolveErrorKind;
pub use wire::WireErrorKind;
