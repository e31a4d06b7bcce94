//! Provider registration types.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use crate::container::ResolverContext;
use crate::error::{DiError, DiResult};
use crate::internal::{BoxFuture, BoxFutureUnit, ResolutionChain, WaitGuard};
use crate::key::Key;
use crate::lifetime::Lifetime;

/// Type-erased instance: an `Arc<T>` boxed as `Arc<dyn Any>`.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

pub(crate) type SyncCtor = Arc<dyn Fn(&ResolverContext) -> DiResult<AnyArc> + Send + Sync>;
pub(crate) type AsyncCtor =
    Arc<dyn Fn(ResolverContext) -> BoxFuture<'static, DiResult<AnyArc>> + Send + Sync>;
pub(crate) type CastFn = Arc<dyn Fn(AnyArc) -> DiResult<AnyArc> + Send + Sync>;

/// Wraps a typed instance for storage.
#[inline]
pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> AnyArc {
    Arc::new(value)
}

/// Recovers the typed instance; the clone shares identity with the cached one.
#[inline]
pub(crate) fn downcast<T: ?Sized + Send + Sync + 'static>(any: AnyArc) -> DiResult<Arc<T>> {
    any.downcast::<Arc<T>>()
        .map(|outer| (*outer).clone())
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
}

/// Teardown hook run when a resource is released.
pub(crate) enum Teardown {
    Sync(Arc<dyn Fn(AnyArc) + Send + Sync>),
    Async(Arc<dyn Fn(AnyArc) -> BoxFutureUnit + Send + Sync>),
}

enum Recipe {
    Sync(SyncCtor),
    Async(AsyncCtor),
}

/// Cache slot of a `Singleton` or `Resource` provider.
///
/// The slot lock is never held while building. Instead the building chain is
/// recorded, and other chains wait on `ready` (sync) or `notify` (async)
/// until it finishes.
#[derive(Default)]
struct Cell {
    state: parking_lot::Mutex<CellState>,
    ready: parking_lot::Condvar,
    notify: tokio::sync::Notify,
}

#[derive(Default)]
struct CellState {
    instance: Option<AnyArc>,
    building: Option<Builder>,
}

struct Builder {
    chain: ResolutionChain,
    /// Set for sync builds, which run to completion on one thread.
    thread: Option<ThreadId>,
}

enum Claim<'a> {
    Cached(AnyArc),
    Build(BuildGuard<'a>),
}

impl Cell {
    fn with_instance(instance: AnyArc) -> Self {
        let cell = Cell::default();
        cell.state.lock().instance = Some(instance);
        cell
    }

    fn instance(&self) -> Option<AnyArc> {
        self.state.lock().instance.clone()
    }

    fn take(&self) -> Option<AnyArc> {
        self.state.lock().instance.take()
    }

    fn step(
        &self,
        state: &mut CellState,
        key: Key,
        chain: &ResolutionChain,
        thread: Option<ThreadId>,
    ) -> DiResult<Result<Claim<'_>, WaitGuard>> {
        if let Some(instance) = &state.instance {
            return Ok(Ok(Claim::Cached(instance.clone())));
        }
        let builder = match &state.building {
            Some(builder) => builder,
            None => {
                state.building = Some(Builder {
                    chain: chain.clone(),
                    thread,
                });
                return Ok(Ok(Claim::Build(BuildGuard { cell: self })));
            }
        };
        if thread.is_some() && builder.thread == thread {
            return Err(chain.reentered(&builder.chain));
        }
        chain.wait_for(key, &builder.chain).map(Err)
    }

    fn claim(&self, key: Key, chain: &ResolutionChain) -> DiResult<Claim<'_>> {
        let thread = Some(thread::current().id());
        let mut state = self.state.lock();
        loop {
            let waiting = match self.step(&mut state, key, chain, thread)? {
                Ok(claim) => return Ok(claim),
                Err(waiting) => waiting,
            };
            self.ready.wait(&mut state);
            drop(waiting);
        }
    }

    async fn claim_async(&self, key: Key, chain: &ResolutionChain) -> DiResult<Claim<'_>> {
        loop {
            let (waiting, notified) = {
                let mut state = self.state.lock();
                match self.step(&mut state, key, chain, None)? {
                    Ok(claim) => return Ok(claim),
                    Err(waiting) => (waiting, self.notify.notified()),
                }
            };
            notified.await;
            drop(waiting);
        }
    }
}

/// Exclusive right to build a cell's instance. Dropping it without
/// [`finish`](BuildGuard::finish) (error, panic, cancelled future) hands the
/// build to the next waiter.
struct BuildGuard<'a> {
    cell: &'a Cell,
}

impl BuildGuard<'_> {
    fn finish(self, instance: AnyArc) -> AnyArc {
        self.cell.state.lock().instance = Some(instance.clone());
        instance
    }
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        self.cell.state.lock().building = None;
        self.cell.ready.notify_all();
        self.cell.notify.notify_waiters();
    }
}

/// A registered recipe for producing instances of a key.
///
/// Cached lifetimes build their instance once. Concurrent first resolutions
/// wait for the chain that got there first; a chain that would wait on
/// itself, directly or through other waiting chains, fails with
/// [`DiError::CircularDependency`] instead.
pub struct Provider {
    key: Key,
    lifetime: Lifetime,
    recipe: Recipe,
    cell: Cell,
    teardown: Option<Teardown>,
}

impl Provider {
    pub(crate) fn new_sync(key: Key, lifetime: Lifetime, ctor: SyncCtor) -> Self {
        Self {
            key,
            lifetime,
            recipe: Recipe::Sync(ctor),
            cell: Cell::default(),
            teardown: None,
        }
    }

    pub(crate) fn new_async(key: Key, lifetime: Lifetime, ctor: AsyncCtor) -> Self {
        Self {
            key,
            lifetime,
            recipe: Recipe::Async(ctor),
            cell: Cell::default(),
            teardown: None,
        }
    }

    /// Singleton provider around an already built instance.
    pub(crate) fn from_instance(key: Key, instance: AnyArc) -> Self {
        let cached = instance.clone();
        Self {
            key,
            lifetime: Lifetime::Singleton,
            recipe: Recipe::Sync(Arc::new(move |_: &ResolverContext| -> DiResult<AnyArc> {
                Ok(instance.clone())
            })),
            cell: Cell::with_instance(cached),
            teardown: None,
        }
    }

    pub(crate) fn with_teardown(mut self, teardown: Teardown) -> Self {
        self.teardown = Some(teardown);
        self
    }

    /// The key this provider was registered under.
    pub fn key(&self) -> Key {
        self.key
    }

    /// The provider's lifetime.
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Whether the provider builds its instance asynchronously.
    pub fn is_async(&self) -> bool {
        matches!(self.recipe, Recipe::Async(_))
    }

    /// Whether a cached instance currently exists.
    ///
    /// Always false for `Factory` providers and while the first build is
    /// still running.
    pub fn is_instantiated(&self) -> bool {
        self.cell.instance().is_some()
    }

    pub(crate) fn get(&self, ctx: &ResolverContext) -> DiResult<AnyArc> {
        let ctor = match &self.recipe {
            Recipe::Async(_) => return Err(DiError::AsyncProviderInSyncContext { key: self.key }),
            Recipe::Sync(ctor) => ctor,
        };
        if !self.lifetime.is_cached() {
            return ctor(ctx);
        }
        match self.cell.claim(self.key, ctx.chain())? {
            Claim::Cached(instance) => Ok(instance),
            Claim::Build(build) => Ok(build.finish(ctor(ctx)?)),
        }
    }

    pub(crate) async fn get_async(&self, ctx: ResolverContext) -> DiResult<AnyArc> {
        let ctor = match &self.recipe {
            Recipe::Sync(_) => return self.get(&ctx),
            Recipe::Async(ctor) => ctor,
        };
        if !self.lifetime.is_cached() {
            return ctor(ctx).await;
        }
        let chain = ctx.chain().clone();
        match self.cell.claim_async(self.key, &chain).await? {
            Claim::Cached(instance) => Ok(instance),
            Claim::Build(build) => Ok(build.finish(ctor(ctx).await?)),
        }
    }

    /// Tears down and clears the cached resource. Returns false if nothing was open.
    pub(crate) fn release(&self) -> DiResult<bool> {
        self.ensure_resource()?;
        if self.is_async() || matches!(self.teardown, Some(Teardown::Async(_))) {
            return Err(DiError::AsyncProviderInSyncContext { key: self.key });
        }
        let taken = self.cell.take();
        match (taken, &self.teardown) {
            (None, _) => Ok(false),
            (Some(instance), Some(Teardown::Sync(teardown))) => {
                teardown(instance);
                Ok(true)
            }
            (Some(_), _) => Ok(true),
        }
    }

    pub(crate) async fn release_async(&self) -> DiResult<bool> {
        self.ensure_resource()?;
        let taken = self.cell.take();
        match (taken, &self.teardown) {
            (None, _) => Ok(false),
            (Some(instance), Some(Teardown::Sync(teardown))) => {
                teardown(instance);
                Ok(true)
            }
            (Some(instance), Some(Teardown::Async(teardown))) => {
                teardown(instance).await;
                Ok(true)
            }
            (Some(_), None) => Ok(true),
        }
    }

    fn ensure_resource(&self) -> DiResult<()> {
        if self.lifetime == Lifetime::Resource {
            Ok(())
        } else {
            Err(DiError::WrongLifetime(format!(
                "'{}' is a {} provider; only resource providers can be released",
                self.key, self.lifetime
            )))
        }
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("key", &self.key)
            .field("lifetime", &self.lifetime)
            .field("async", &self.is_async())
            .field("teardown", &self.teardown.is_some())
            .finish()
    }
}

/// What a key resolves through: a provider, optionally reached via an alias.
#[derive(Clone)]
pub(crate) struct Binding {
    pub(crate) provider: Arc<Provider>,
    /// Set when the key is an alias for another key.
    pub(crate) alias_of: Option<Key>,
    cast: Option<CastFn>,
}

impl Binding {
    pub(crate) fn direct(provider: Provider) -> Self {
        Self {
            provider: Arc::new(provider),
            alias_of: None,
            cast: None,
        }
    }

    /// Binding for a key aliasing `target`, sharing this binding's provider.
    pub(crate) fn aliased(&self, target: Key, cast: Option<CastFn>) -> Self {
        let cast = match (self.cast.clone(), cast) {
            (Some(inner), Some(outer)) => {
                let composed: CastFn =
                    Arc::new(move |instance: AnyArc| -> DiResult<AnyArc> { outer(inner(instance)?) });
                Some(composed)
            }
            (inner, outer) => outer.or(inner),
        };
        Self {
            provider: self.provider.clone(),
            alias_of: Some(target),
            cast,
        }
    }

    pub(crate) fn apply(&self, instance: AnyArc) -> DiResult<AnyArc> {
        match &self.cast {
            Some(cast) => cast(instance),
            None => Ok(instance),
        }
    }
}

/// Key to binding map that remembers registration order.
#[derive(Clone, Default)]
pub(crate) struct Registry {
    entries: Vec<(Key, Binding)>,
    index: HashMap<Key, usize>,
}

impl Registry {
    /// Inserts or overwrites; returns true when an existing binding was replaced.
    pub(crate) fn insert(&mut self, key: Key, binding: Binding) -> bool {
        match self.index.get(&key) {
            Some(&pos) => {
                self.entries[pos] = (key, binding);
                true
            }
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push((key, binding));
                false
            }
        }
    }

    #[inline]
    pub(crate) fn get(&self, key: &Key) -> Option<&Binding> {
        self.index.get(key).map(|&pos| &self.entries[pos].1)
    }

    #[inline]
    pub(crate) fn contains_key(&self, key: &Key) -> bool {
        self.index.contains_key(key)
    }

    pub(crate) fn keys(&self) -> Vec<Key> {
        self.entries.iter().map(|(key, _)| *key).collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Key, &Binding)> {
        self.entries.iter().map(|(key, binding)| (key, binding))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Whole-registry copy taken by [`Container::snapshot`](crate::Container::snapshot).
///
/// Restoring it replaces every binding at once. Providers are shared with the
/// live registry, so a singleton built after the snapshot is still cached
/// after a restore.
#[derive(Clone)]
pub struct RegistrySnapshot {
    pub(crate) registry: Registry,
}

impl RegistrySnapshot {
    /// Keys captured by the snapshot, in registration order.
    pub fn keys(&self) -> Vec<Key> {
        self.registry.keys()
    }

    /// Number of bindings captured.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// True if the snapshot holds no bindings.
    pub fn is_empty(&self) -> bool {
        self.registry.len() == 0
    }
}

impl fmt::Debug for RegistrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrySnapshot")
            .field("keys", &self.registry.keys())
            .finish()
    }
}
