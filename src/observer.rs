//! Diagnostic observers for resolution events.
//!
//! Observers are notified synchronously from inside resolution and
//! registration. Keep implementations cheap; queue anything expensive.

use std::sync::Arc;
use std::time::Duration;

use crate::error::DiError;
use crate::key::Key;
use crate::lifetime::Lifetime;

/// Observer trait for container events.
///
/// Every method has an empty default, so an observer only overrides the
/// events it cares about.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{Container, DiObserver, Key, Resolver};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct CountingObserver {
///     resolved: AtomicUsize,
/// }
///
/// impl DiObserver for CountingObserver {
///     fn resolved(&self, _key: &Key, _duration: Duration) {
///         self.resolved.fetch_add(1, Ordering::SeqCst);
///     }
/// }
///
/// let observer = Arc::new(CountingObserver::default());
/// let container = Container::new();
/// container.add_observer(observer.clone());
/// container.add_singleton(7u32).unwrap();
///
/// container.resolve::<u32>().unwrap();
/// assert_eq!(observer.resolved.load(Ordering::SeqCst), 1);
/// ```
pub trait DiObserver: Send + Sync {
    /// Called before a key's provider is invoked. `depth` is 1 for a
    /// top-level resolution.
    fn resolving(&self, _key: &Key, _depth: usize) {}

    /// Called after a key was resolved successfully.
    fn resolved(&self, _key: &Key, _duration: Duration) {}

    /// Called when resolving a key failed.
    fn resolution_failed(&self, _key: &Key, _error: &DiError) {}

    /// Called after a provider was registered.
    fn registered(&self, _key: &Key, _lifetime: Lifetime, _replaced: bool) {}
}

#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn DiObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn DiObserver>) {
        self.observers.push(observer);
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn resolving(&self, key: &Key, depth: usize) {
        for observer in &self.observers {
            observer.resolving(key, depth);
        }
    }

    pub(crate) fn resolved(&self, key: &Key, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(key, duration);
        }
    }

    pub(crate) fn resolution_failed(&self, key: &Key, error: &DiError) {
        for observer in &self.observers {
            observer.resolution_failed(key, error);
        }
    }

    pub(crate) fn registered(&self, key: &Key, lifetime: Lifetime, replaced: bool) {
        for observer in &self.observers {
            observer.registered(key, lifetime, replaced);
        }
    }
}

/// Observer that forwards events to `tracing`.
///
/// Resolutions are logged at `debug`, failures at `warn`.
///
/// ```
/// use ferrous_ioc::{Container, TracingObserver};
/// use std::sync::Arc;
///
/// let container = Container::new();
/// container.add_observer(Arc::new(TracingObserver::with_prefix("app")));
/// ```
#[derive(Debug, Clone)]
pub struct TracingObserver {
    prefix: String,
}

impl TracingObserver {
    /// Creates an observer with the default `ioc` prefix.
    pub fn new() -> Self {
        Self::with_prefix("ioc")
    }

    /// Creates an observer whose events carry `prefix`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl DiObserver for TracingObserver {
    fn resolving(&self, key: &Key, depth: usize) {
        tracing::debug!(prefix = %self.prefix, key = %key, depth, "resolving");
    }

    fn resolved(&self, key: &Key, duration: Duration) {
        tracing::debug!(prefix = %self.prefix, key = %key, elapsed_us = duration.as_micros() as u64, "resolved");
    }

    fn resolution_failed(&self, key: &Key, error: &DiError) {
        tracing::warn!(prefix = %self.prefix, key = %key, error = %error, "resolution failed");
    }

    fn registered(&self, key: &Key, lifetime: Lifetime, replaced: bool) {
        tracing::debug!(prefix = %self.prefix, key = %key, lifetime = %lifetime, replaced, "registered");
    }
}
