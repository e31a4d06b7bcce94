//! Async factory support.
//!
//! Providers registered through [`Container::register_async`](crate::Container::register_async)
//! build their instance asynchronously (connection handshakes, remote
//! configuration, warm-up). They can only be resolved from the async path;
//! a synchronous resolve fails with
//! [`DiError::AsyncProviderInSyncContext`](crate::DiError::AsyncProviderInSyncContext).

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::container::ResolverContext;
use crate::error::DiResult;
use crate::internal::BoxFuture;
use crate::registration::{erase, AnyArc, AsyncCtor};

/// Trait for factories that create instances asynchronously.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{AsyncFactory, Container, DiResult, Lifetime, Resolver, ResolverContext};
/// use async_trait::async_trait;
/// use std::sync::Arc;
///
/// struct DatabasePool {
///     url: String,
/// }
///
/// struct PoolFactory {
///     url: String,
/// }
///
/// #[async_trait]
/// impl AsyncFactory<DatabasePool> for PoolFactory {
///     async fn create(&self, _ctx: ResolverContext) -> DiResult<Arc<DatabasePool>> {
///         tokio::task::yield_now().await;
///         Ok(Arc::new(DatabasePool { url: self.url.clone() }))
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() {
/// let container = Container::new();
/// container
///     .register_async::<DatabasePool, _>(Lifetime::Singleton, PoolFactory {
///         url: "postgres://localhost".to_string(),
///     })
///     .unwrap();
///
/// let pool = container.resolve_async::<DatabasePool>().await.unwrap();
/// assert_eq!(pool.url, "postgres://localhost");
/// assert!(container.resolve::<DatabasePool>().is_err());
/// # }
/// ```
#[async_trait]
pub trait AsyncFactory<T: ?Sized + Send + Sync + 'static>: Send + Sync + 'static {
    /// Creates a new instance.
    ///
    /// `ctx` continues the caller's resolution chain; use it to resolve the
    /// instance's own dependencies.
    async fn create(&self, ctx: ResolverContext) -> DiResult<Arc<T>>;
}

#[async_trait]
impl<T, F, Fut> AsyncFactory<T> for F
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn(ResolverContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DiResult<Arc<T>>> + Send,
{
    async fn create(&self, ctx: ResolverContext) -> DiResult<Arc<T>> {
        self(ctx).await
    }
}

pub(crate) fn into_ctor<T, F>(factory: F) -> AsyncCtor
where
    T: ?Sized + Send + Sync + 'static,
    F: AsyncFactory<T>,
{
    let factory = Arc::new(factory);
    Arc::new(move |ctx: ResolverContext| -> BoxFuture<'static, DiResult<AnyArc>> {
        let factory = factory.clone();
        Box::pin(async move { factory.create(ctx).await.map(erase) })
    })
}

/// Builds an async factory from an async block yielding an `Arc<T>`.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{async_factory, Container, Lifetime, Resolver};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let container = Container::new();
/// container
///     .register_async::<String, _>(
///         Lifetime::Singleton,
///         async_factory!(|_ctx| async { Arc::new("ready".to_string()) }),
///     )
///     .unwrap();
///
/// assert_eq!(*container.resolve_async::<String>().await.unwrap(), "ready");
/// # }
/// ```
#[macro_export]
macro_rules! async_factory {
    (|$ctx:ident| async $body:block) => {
        move |$ctx: $crate::ResolverContext| async move { Ok::<_, $crate::DiError>($body) }
    };
}
