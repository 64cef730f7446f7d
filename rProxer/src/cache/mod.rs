//! In-memory caching of remote data.

mod property;

pub use property::{bind, Initializer, LazyProperty};
