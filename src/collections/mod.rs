//! Engine-wide collections

mod weak_registry;

pub use weak_registry::WeakRegistry;
