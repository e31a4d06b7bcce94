//! Resolver traits for provider resolution.

use std::sync::Arc;

use crate::error::DiResult;
use crate::internal::BoxFuture;
use crate::key::Key;
use crate::registration::{downcast, AnyArc};

/// Core resolver trait for object-safe resolution.
///
/// This trait carries the type-erased resolution primitives. It is object
/// safe, so factories and adapters can work against `&dyn ResolverCore`.
/// Both [`Container`](crate::Container) (which starts a fresh resolution
/// chain on every call) and [`ResolverContext`](crate::ResolverContext)
/// (which continues the chain of the factory it was handed to) implement it.
///
/// Most users should use the [`Resolver`] trait instead, which provides
/// typed generic methods built on top of this one.
pub trait ResolverCore: Send + Sync {
    /// Resolves a key to its type-erased instance.
    ///
    /// # Returns
    ///
    /// * `Ok(AnyArc)` - The instance, an `Arc<T>` wrapped in `Arc<dyn Any>`
    /// * `Err(DiError)` - Not found, circular, async-in-sync, factory failure
    fn resolve_key(&self, key: &Key) -> DiResult<AnyArc>;

    /// Resolves a key through the asynchronous path.
    ///
    /// Accepts both sync and async providers.
    fn resolve_key_async<'a>(&'a self, key: &'a Key) -> BoxFuture<'a, DiResult<AnyArc>>;

    /// Returns true if a provider is registered for `key`.
    fn has_key(&self, key: &Key) -> bool;
}

/// High-level resolver interface with generic methods for type-safe resolution.
///
/// Implemented for every [`ResolverCore`].
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{Container, Lifetime, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) -> String {
///         format!("LOG: {}", msg)
///     }
/// }
///
/// let container = Container::new();
/// container.add_singleton(42usize).unwrap();
/// container
///     .register::<dyn Logger, _>(Lifetime::Singleton, |_| Ok(Arc::new(ConsoleLogger) as Arc<dyn Logger>))
///     .unwrap();
///
/// assert_eq!(*container.resolve::<usize>().unwrap(), 42);
/// assert_eq!(container.resolve::<dyn Logger>().unwrap().log("hi"), "LOG: hi");
/// assert!(container.resolve_optional::<String>().unwrap().is_none());
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves the provider registered for `T`.
    fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        downcast::<T>(self.resolve_key(&Key::of::<T>())?)
    }

    /// Resolves the provider registered for `T` under `name`.
    fn resolve_named<T: ?Sized + Send + Sync + 'static>(&self, name: &'static str) -> DiResult<Arc<T>> {
        downcast::<T>(self.resolve_key(&Key::named::<T>(name))?)
    }

    /// Resolves `T` if it is registered, `None` otherwise.
    ///
    /// Only a missing registration maps to `None`; failures while building a
    /// registered provider are still reported.
    fn resolve_optional<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        let key = Key::of::<T>();
        if !self.has_key(&key) {
            return Ok(None);
        }
        downcast::<T>(self.resolve_key(&key)?).map(Some)
    }

    /// Returns true if `T` is registered.
    fn has<T: ?Sized + 'static>(&self) -> bool {
        self.has_key(&Key::of::<T>())
    }

    /// Asynchronous counterpart of [`resolve`](Self::resolve).
    fn resolve_async<T: ?Sized + Send + Sync + 'static>(&self) -> BoxFuture<'_, DiResult<Arc<T>>> {
        Box::pin(async move {
            let key = Key::of::<T>();
            downcast::<T>(self.resolve_key_async(&key).await?)
        })
    }

    /// Asynchronous counterpart of [`resolve_named`](Self::resolve_named).
    fn resolve_named_async<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: &'static str,
    ) -> BoxFuture<'_, DiResult<Arc<T>>> {
        Box::pin(async move {
            let key = Key::named::<T>(name);
            downcast::<T>(self.resolve_key_async(&key).await?)
        })
    }

    /// Asynchronous counterpart of [`resolve_optional`](Self::resolve_optional).
    fn resolve_optional_async<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> BoxFuture<'_, DiResult<Option<Arc<T>>>> {
        Box::pin(async move {
            let key = Key::of::<T>();
            if !self.has_key(&key) {
                return Ok(None);
            }
            downcast::<T>(self.resolve_key_async(&key).await?).map(Some)
        })
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
