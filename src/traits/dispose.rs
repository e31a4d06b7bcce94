//! Teardown traits for resource providers.

/// Trait for synchronous resource teardown.
///
/// Implement this for resources that need structured teardown (flushing
/// buffers, closing handles). Register them with
/// [`Container::add_disposable_resource`](crate::Container::add_disposable_resource);
/// `dispose` runs when the resource is released.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{Container, Dispose};
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// struct Cache {
///     flushed: AtomicBool,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         self.flushed.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let container = Container::new();
/// container
///     .add_disposable_resource::<Cache, _>(|_| Cache { flushed: AtomicBool::new(false) })
///     .unwrap();
///
/// let cache = container.acquire::<Cache>().unwrap();
/// assert!(container.release::<Cache>().unwrap());
/// assert!(cache.flushed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup.
    fn dispose(&self);
}

/// Trait for asynchronous resource teardown.
///
/// Implement this for resources that require async teardown (graceful
/// connection shutdown). Resources registered with
/// [`Container::add_async_disposable_resource`](crate::Container::add_async_disposable_resource)
/// must be released with `release_async`.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{AsyncDispose, Container};
/// use async_trait::async_trait;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// struct DatabaseClient {
///     closed: AtomicBool,
/// }
///
/// #[async_trait]
/// impl AsyncDispose for DatabaseClient {
///     async fn dispose(&self) {
///         self.closed.store(true, Ordering::SeqCst);
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() {
/// let container = Container::new();
/// container
///     .add_async_disposable_resource::<DatabaseClient, _>(|_| DatabaseClient {
///         closed: AtomicBool::new(false),
///     })
///     .unwrap();
///
/// let client = container.acquire_async::<DatabaseClient>().await.unwrap();
/// assert!(container.release_async::<DatabaseClient>().await.unwrap());
/// assert!(client.closed.load(Ordering::SeqCst));
/// # }
/// ```
#[async_trait::async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    /// Perform asynchronous cleanup.
    async fn dispose(&self);
}
