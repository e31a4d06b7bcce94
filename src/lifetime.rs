//! Provider lifetime definitions.

use std::fmt;
use std::str::FromStr;

use crate::error::DiError;

/// Provider lifetimes controlling instance caching behavior
///
/// # Lifetime Characteristics
///
/// - **Singleton**: built once on first resolution, cached forever
/// - **Factory**: built on every resolution, never cached
/// - **Resource**: built on first acquire, cached while open; `release`
///   tears it down so the next acquire builds from scratch
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Container, Lifetime, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct RequestModel { id: u32 }
///
/// let container = Container::new();
/// container.add_singleton(Database { url: "postgres://localhost".to_string() }).unwrap();
/// container.add_factory::<RequestModel, _>(|_| RequestModel { id: 7 }).unwrap();
///
/// let db1 = container.resolve::<Database>().unwrap();
/// let db2 = container.resolve::<Database>().unwrap();
/// assert!(Arc::ptr_eq(&db1, &db2));
///
/// let m1 = container.resolve::<RequestModel>().unwrap();
/// let m2 = container.resolve::<RequestModel>().unwrap();
/// assert!(!Arc::ptr_eq(&m1, &m2));
/// assert_eq!(m1.id, m2.id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Single instance per container, cached forever.
    Singleton,
    /// New instance per resolution, never cached.
    Factory,
    /// Instance with an explicit acquire/release lifecycle.
    ///
    /// The first acquire builds and caches the instance; `release` runs the
    /// teardown hook and clears the cache.
    Resource,
}

impl Lifetime {
    /// Whether instances of this lifetime are cached by the provider.
    pub fn is_cached(&self) -> bool {
        !matches!(self, Lifetime::Factory)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Factory => "factory",
            Lifetime::Resource => "resource",
        })
    }
}

impl FromStr for Lifetime {
    type Err = DiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "singleton" => Ok(Lifetime::Singleton),
            "factory" | "transient" => Ok(Lifetime::Factory),
            "resource" => Ok(Lifetime::Resource),
            other => Err(DiError::WrongLifetime(format!("unknown lifetime '{}'", other))),
        }
    }
}
