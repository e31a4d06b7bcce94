//! Resolver context handed to factories.

use std::fmt;

use crate::container::Container;
use crate::error::DiResult;
use crate::internal::{BoxFuture, ResolutionChain};
use crate::key::Key;
use crate::registration::AnyArc;
use crate::traits::ResolverCore;

/// Context passed to factory functions for resolving dependencies.
///
/// A context continues the resolution chain of the provider it was handed
/// to, which is how cycles are detected: resolving a key that is already in
/// flight on this chain fails with
/// [`DiError::CircularDependency`](crate::DiError::CircularDependency).
/// Contexts are cheap to clone and may be moved into async factories; two
/// clones resolving concurrently never see each other's progress.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{Container, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let container = Container::new();
/// container.add_singleton(Database { url: "postgres://localhost".to_string() }).unwrap();
/// container
///     .add_factory::<UserService, _>(|ctx| {
///         assert_eq!(ctx.path().len(), 1);
///         UserService { db: ctx.resolve::<Database>().unwrap() }
///     })
///     .unwrap();
///
/// let service = container.resolve::<UserService>().unwrap();
/// assert_eq!(service.db.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct ResolverContext {
    container: Container,
    chain: ResolutionChain,
}

impl ResolverContext {
    pub(crate) fn new(container: Container, chain: ResolutionChain) -> Self {
        Self { container, chain }
    }

    /// Number of keys currently in flight on this chain.
    pub fn depth(&self) -> usize {
        self.chain.depth()
    }

    /// Keys currently in flight, outermost first.
    pub fn path(&self) -> Vec<Key> {
        self.chain.keys()
    }

    pub(crate) fn chain(&self) -> &ResolutionChain {
        &self.chain
    }
}

impl ResolverCore for ResolverContext {
    fn resolve_key(&self, key: &Key) -> DiResult<AnyArc> {
        self.container.resolve_in(key, &self.chain)
    }

    fn resolve_key_async<'a>(&'a self, key: &'a Key) -> BoxFuture<'a, DiResult<AnyArc>> {
        self.container.resolve_in_async(*key, self.chain.clone())
    }

    fn has_key(&self, key: &Key) -> bool {
        self.container.has_key(key)
    }
}

impl fmt::Debug for ResolverContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverContext")
            .field("path", &self.chain.keys())
            .finish()
    }
}
