//! The container: provider registry plus resolver.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use crate::async_factories::{into_ctor, AsyncFactory};
use crate::config::{ContainerOptions, DuplicatePolicy};
use crate::error::{DiError, DiResult};
use crate::inject::Injector;
use crate::internal::{BoxFuture, ResolutionChain};
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::observer::{DiObserver, Observers};
use crate::registration::{
    downcast, erase, AnyArc, Binding, CastFn, Provider, Registry, RegistrySnapshot, SyncCtor, Teardown,
};
use crate::traits::{AsyncDispose, Dispose, Resolver, ResolverCore};

mod context;

pub use context::ResolverContext;

/// Dependency injection container.
///
/// `Container` owns the provider registry and resolves keys against it. It
/// is a cheap handle: clones share the same registry, so the application
/// root creates one and passes it to whatever needs it.
///
/// Every top-level call starts a fresh resolution chain. Factories receive a
/// [`ResolverContext`] that continues the chain of the provider being built.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{autowire, Container, Lifetime, Resolver};
/// use std::sync::Arc;
///
/// struct Config { port: u16 }
/// struct Server { config: Arc<Config> }
/// autowire!(Server { config: Arc<Config> });
///
/// let container = Container::new();
/// container.add_singleton(Config { port: 8080 }).unwrap();
/// container.add_autowired::<Server>(Lifetime::Singleton).unwrap();
///
/// let server = container.resolve::<Server>().unwrap();
/// assert_eq!(server.config.port, 8080);
/// assert!(Arc::ptr_eq(&server, &container.resolve::<Server>().unwrap()));
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

struct Inner {
    registry: RwLock<Registry>,
    observers: RwLock<Arc<Observers>>,
    options: ContainerOptions,
}

impl Container {
    /// Creates an empty container with default options.
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    /// Creates an empty container with the given options.
    pub fn with_options(options: ContainerOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: RwLock::new(Registry::default()),
                observers: RwLock::new(Arc::new(Observers::default())),
                options,
            }),
        }
    }

    /// The options this container was built with.
    pub fn options(&self) -> &ContainerOptions {
        &self.inner.options
    }

    /// Attaches an observer for resolution and registration events.
    pub fn add_observer(&self, observer: Arc<dyn DiObserver>) {
        let mut slot = self.inner.observers.write();
        let mut observers = Observers::clone(&slot);
        observers.add(observer);
        *slot = Arc::new(observers);
    }

    // ----- Registration -----

    /// Registers a fallible factory for `T`.
    ///
    /// This is the general registration form; the `add_*` helpers wrap it.
    /// `T` may be unsized, so a trait object can be registered directly:
    ///
    /// ```
    /// use ferrous_ioc::{Container, Lifetime, Resolver};
    /// use std::sync::Arc;
    ///
    /// trait Clock: Send + Sync { fn now(&self) -> u64; }
    /// struct Fixed;
    /// impl Clock for Fixed { fn now(&self) -> u64 { 42 } }
    ///
    /// let container = Container::new();
    /// container
    ///     .register::<dyn Clock, _>(Lifetime::Singleton, |_| Ok(Arc::new(Fixed) as Arc<dyn Clock>))
    ///     .unwrap();
    /// assert_eq!(container.resolve::<dyn Clock>().unwrap().now(), 42);
    /// ```
    pub fn register<T, F>(&self, lifetime: Lifetime, factory: F) -> DiResult<()>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        let key = Key::of::<T>();
        self.install(key, Binding::direct(Provider::new_sync(key, lifetime, sync_ctor(factory))), self.policy())
    }

    /// Registers a fallible factory for `T` under `name`.
    pub fn register_named<T, F>(&self, name: &'static str, lifetime: Lifetime, factory: F) -> DiResult<()>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        let key = Key::named::<T>(name);
        self.install(key, Binding::direct(Provider::new_sync(key, lifetime, sync_ctor(factory))), self.policy())
    }

    /// Registers an asynchronous factory for `T`.
    ///
    /// The provider can only be resolved through the async paths.
    pub fn register_async<T, F>(&self, lifetime: Lifetime, factory: F) -> DiResult<()>
    where
        T: ?Sized + Send + Sync + 'static,
        F: AsyncFactory<T>,
    {
        let key = Key::of::<T>();
        self.install(key, Binding::direct(Provider::new_async(key, lifetime, into_ctor(factory))), self.policy())
    }

    /// Replaces the provider for `T` without a duplicate warning.
    ///
    /// Intended for overrides in tests and composition roots.
    pub fn replace<T, F>(&self, lifetime: Lifetime, factory: F) -> DiResult<()>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        let key = Key::of::<T>();
        self.install(
            key,
            Binding::direct(Provider::new_sync(key, lifetime, sync_ctor(factory))),
            DuplicatePolicy::Replace,
        )
    }

    /// Registers an already built singleton.
    pub fn add_singleton<T: Send + Sync + 'static>(&self, value: T) -> DiResult<()> {
        let key = Key::of::<T>();
        self.install(key, Binding::direct(Provider::from_instance(key, erase(Arc::new(value)))), self.policy())
    }

    /// Registers a singleton built lazily on first resolution.
    pub fn add_singleton_factory<T, F>(&self, factory: F) -> DiResult<()>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.register::<T, _>(Lifetime::Singleton, move |ctx| Ok(Arc::new(factory(ctx))))
    }

    /// Registers a factory invoked on every resolution.
    pub fn add_factory<T, F>(&self, factory: F) -> DiResult<()>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.register::<T, _>(Lifetime::Factory, move |ctx| Ok(Arc::new(factory(ctx))))
    }

    /// Registers a resource without a teardown hook.
    pub fn add_resource<T, F>(&self, factory: F) -> DiResult<()>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.register::<T, _>(Lifetime::Resource, move |ctx| Ok(Arc::new(factory(ctx))))
    }

    /// Registers a resource whose `teardown` runs on release.
    pub fn add_resource_with_teardown<T, F, D>(&self, factory: F, teardown: D) -> DiResult<()>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
        D: Fn(Arc<T>) + Send + Sync + 'static,
    {
        let teardown = Teardown::Sync(Arc::new(move |instance: AnyArc| {
            if let Ok(instance) = downcast::<T>(instance) {
                teardown(instance);
            }
        }));
        self.install_resource::<T, F>(factory, teardown)
    }

    /// Registers a resource torn down through [`Dispose`].
    pub fn add_disposable_resource<T, F>(&self, factory: F) -> DiResult<()>
    where
        T: Dispose,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.add_resource_with_teardown(factory, |instance: Arc<T>| instance.dispose())
    }

    /// Registers a resource torn down through [`AsyncDispose`].
    ///
    /// Such resources must be released with [`release_async`](Self::release_async).
    pub fn add_async_disposable_resource<T, F>(&self, factory: F) -> DiResult<()>
    where
        T: AsyncDispose,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        let teardown = Teardown::Async(Arc::new(|instance: AnyArc| -> BoxFuture<'static, ()> {
            Box::pin(async move {
                if let Ok(instance) = downcast::<T>(instance) {
                    instance.dispose().await;
                }
            })
        }));
        self.install_resource::<T, F>(factory, teardown)
    }

    fn install_resource<T, F>(&self, factory: F, teardown: Teardown) -> DiResult<()>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        let key = Key::of::<T>();
        let ctor = sync_ctor::<T, _>(move |ctx| Ok(Arc::new(factory(ctx))));
        let provider = Provider::new_sync(key, Lifetime::Resource, ctor).with_teardown(teardown);
        self.install(key, Binding::direct(provider), self.policy())
    }

    // ----- Aliases -----

    /// Makes `alias` resolve through the provider currently bound to `target`.
    ///
    /// The alias shares the target provider's lifetime and cache. Both keys
    /// must name the same instance type; use [`alias`](Self::alias) to expose
    /// a concrete type under a trait object.
    pub fn alias_key(&self, alias: Key, target: Key) -> DiResult<()> {
        self.bind_alias(alias, target, None)
    }

    /// Makes `A` resolve through the provider of `B`, converting with `cast`.
    ///
    /// ```
    /// use ferrous_ioc::{Container, Resolver};
    /// use std::sync::Arc;
    ///
    /// trait Greeter: Send + Sync { fn greet(&self) -> String; }
    /// struct English;
    /// impl Greeter for English { fn greet(&self) -> String { "hello".into() } }
    ///
    /// let container = Container::new();
    /// container.add_singleton(English).unwrap();
    /// container.alias::<dyn Greeter, English, _>(|e| e as Arc<dyn Greeter>).unwrap();
    ///
    /// assert_eq!(container.resolve::<dyn Greeter>().unwrap().greet(), "hello");
    /// ```
    pub fn alias<A, B, F>(&self, cast: F) -> DiResult<()>
    where
        A: ?Sized + Send + Sync + 'static,
        B: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<B>) -> Arc<A> + Send + Sync + 'static,
    {
        let cast: CastFn = Arc::new(move |instance: AnyArc| -> DiResult<AnyArc> {
            Ok(erase(cast(downcast::<B>(instance)?)))
        });
        self.bind_alias(Key::of::<A>(), Key::of::<B>(), Some(cast))
    }

    fn bind_alias(&self, alias: Key, target: Key, cast: Option<CastFn>) -> DiResult<()> {
        let binding = self.binding(&target)?.aliased(target, cast);
        tracing::debug!(alias = %alias, target = %target, "alias bound");
        self.install(alias, binding, self.policy())
    }

    fn install(&self, key: Key, binding: Binding, policy: DuplicatePolicy) -> DiResult<()> {
        let lifetime = binding.provider.lifetime();
        let replaced = {
            let mut registry = self.inner.registry.write();
            if registry.contains_key(&key) {
                match policy {
                    DuplicatePolicy::Reject => return Err(DiError::AlreadyRegistered { key }),
                    DuplicatePolicy::Warn => {
                        tracing::warn!(key = %key, "Provider for '{}' is being overwritten", key);
                    }
                    DuplicatePolicy::Replace => {}
                }
            }
            registry.insert(key, binding)
        };
        tracing::debug!(key = %key, lifetime = %lifetime, replaced, "provider registered");
        self.observers().registered(&key, lifetime, replaced);
        Ok(())
    }

    // ----- Lookup -----

    /// Registered keys, in registration order.
    pub fn keys(&self) -> Vec<Key> {
        self.inner.registry.read().keys()
    }

    /// Returns the provider bound to `key`.
    ///
    /// For an alias this is the target's provider.
    pub fn lookup(&self, key: &Key) -> DiResult<Arc<Provider>> {
        self.binding(key).map(|binding| binding.provider)
    }

    fn binding(&self, key: &Key) -> DiResult<Binding> {
        let registry = self.inner.registry.read();
        registry.get(key).cloned().ok_or_else(|| DiError::ProviderNotFound {
            key: *key,
            available: registry.keys(),
        })
    }

    // ----- Resolution -----

    fn enter(&self, key: &Key, chain: &ResolutionChain) -> DiResult<(Binding, ResolverContext)> {
        let max_depth = self.inner.options.max_depth;
        let chain = chain.enter(*key, max_depth)?;
        let binding = self.binding(key)?;

        // aliases also occupy their provider's key so a cycle through an
        // alias is reported instead of waiting on its own provider's build
        let target = binding.provider.key();
        let chain = if target == *key { chain } else { chain.enter(target, max_depth)? };

        Ok((binding, ResolverContext::new(self.clone(), chain)))
    }

    pub(crate) fn resolve_in(&self, key: &Key, chain: &ResolutionChain) -> DiResult<AnyArc> {
        let observers = self.observers();
        let started = Instant::now();

        let result = self.enter(key, chain).and_then(|(binding, ctx)| {
            let depth = chain.depth() + 1;
            tracing::trace!(key = %key, alias_of = ?binding.alias_of, depth, "resolving");
            observers.resolving(key, depth);
            binding.provider.get(&ctx).and_then(|instance| binding.apply(instance))
        });

        report(&observers, key, started, result)
    }

    pub(crate) fn resolve_in_async(&self, key: Key, chain: ResolutionChain) -> BoxFuture<'static, DiResult<AnyArc>> {
        let container = self.clone();
        Box::pin(async move {
            let observers = container.observers();
            let started = Instant::now();

            let result = match container.enter(&key, &chain) {
                Ok((binding, ctx)) => {
                    let depth = chain.depth() + 1;
                    tracing::trace!(key = %key, alias_of = ?binding.alias_of, depth, "resolving async");
                    observers.resolving(&key, depth);
                    match binding.provider.get_async(ctx).await {
                        Ok(instance) => binding.apply(instance),
                        Err(err) => Err(err),
                    }
                }
                Err(err) => Err(err),
            };

            report(&observers, &key, started, result)
        })
    }

    // ----- Resources -----

    /// Opens the resource `T`, building it if it is not already open.
    ///
    /// Fails with `WrongLifetime` if `T` is not a resource.
    pub fn acquire<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.ensure_resource(&Key::of::<T>())?;
        self.resolve::<T>()
    }

    /// Asynchronous counterpart of [`acquire`](Self::acquire).
    pub async fn acquire_async<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.ensure_resource(&Key::of::<T>())?;
        self.resolve_async::<T>().await
    }

    /// Tears down and clears the resource `T`.
    ///
    /// Returns `Ok(false)` if the resource was not open. The next acquire
    /// builds a fresh instance. Resources with async teardown or an async
    /// factory fail with `AsyncProviderInSyncContext`.
    pub fn release<T: ?Sized + 'static>(&self) -> DiResult<bool> {
        let key = Key::of::<T>();
        let released = self.lookup(&key)?.release()?;
        tracing::debug!(key = %key, released, "resource released");
        Ok(released)
    }

    /// Asynchronous counterpart of [`release`](Self::release); handles every
    /// kind of teardown.
    pub async fn release_async<T: ?Sized + 'static>(&self) -> DiResult<bool> {
        let key = Key::of::<T>();
        let released = self.lookup(&key)?.release_async().await?;
        tracing::debug!(key = %key, released, "resource released");
        Ok(released)
    }

    /// Releases every open resource, most recently registered first.
    ///
    /// Resources that need the async path are left open and reported by the
    /// first error after all others were released. Returns the number of
    /// resources torn down.
    pub fn release_all(&self) -> DiResult<usize> {
        let mut released = 0;
        let mut first_error = None;
        for provider in self.open_resources() {
            match provider.release() {
                Ok(true) => released += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(key = %provider.key(), error = %err, "resource left open");
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(released),
        }
    }

    /// Asynchronous counterpart of [`release_all`](Self::release_all).
    pub async fn release_all_async(&self) -> DiResult<usize> {
        let mut released = 0;
        for provider in self.open_resources() {
            if provider.release_async().await? {
                released += 1;
            }
        }
        Ok(released)
    }

    fn open_resources(&self) -> Vec<Arc<Provider>> {
        let registry = self.inner.registry.read();
        let mut providers: Vec<Arc<Provider>> = Vec::new();
        for (_, binding) in registry.iter() {
            let provider = &binding.provider;
            if provider.lifetime() == Lifetime::Resource
                && provider.is_instantiated()
                && !providers.iter().any(|seen| Arc::ptr_eq(seen, provider))
            {
                providers.push(provider.clone());
            }
        }
        providers.reverse();
        providers
    }

    fn ensure_resource(&self, key: &Key) -> DiResult<()> {
        let provider = self.lookup(key)?;
        if provider.lifetime() == Lifetime::Resource {
            Ok(())
        } else {
            Err(DiError::WrongLifetime(format!(
                "'{}' is a {} provider; acquire requires a resource",
                key,
                provider.lifetime()
            )))
        }
    }

    // ----- Injection -----

    /// Starts describing a callable named `callable` for wrapping.
    ///
    /// See [`Injector`] for the full flow.
    pub fn injector(&self, callable: &'static str) -> Injector {
        Injector::new(self.clone(), callable)
    }

    // ----- Snapshot / restore -----

    /// Copies the current registry.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            registry: self.inner.registry.read().clone(),
        }
    }

    /// Replaces the whole registry with `snapshot`.
    ///
    /// ```
    /// use ferrous_ioc::{Container, Resolver};
    ///
    /// let container = Container::new();
    /// container.add_singleton(1u32).unwrap();
    /// let clean = container.snapshot();
    ///
    /// container.add_singleton("leaked".to_string()).unwrap();
    /// container.restore(clean);
    ///
    /// assert!(container.has::<u32>());
    /// assert!(!container.has::<String>());
    /// ```
    pub fn restore(&self, snapshot: RegistrySnapshot) {
        *self.inner.registry.write() = snapshot.registry;
        tracing::debug!("registry restored");
    }

    /// Removes every provider.
    pub fn reset(&self) {
        *self.inner.registry.write() = Registry::default();
        tracing::debug!("registry reset");
    }

    #[inline]
    fn policy(&self) -> DuplicatePolicy {
        self.inner.options.duplicate_policy
    }

    #[inline]
    fn observers(&self) -> Arc<Observers> {
        self.inner.observers.read().clone()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverCore for Container {
    fn resolve_key(&self, key: &Key) -> DiResult<AnyArc> {
        self.resolve_in(key, &ResolutionChain::default())
    }

    fn resolve_key_async<'a>(&'a self, key: &'a Key) -> BoxFuture<'a, DiResult<AnyArc>> {
        self.resolve_in_async(*key, ResolutionChain::default())
    }

    fn has_key(&self, key: &Key) -> bool {
        self.inner.registry.read().contains_key(key)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("keys", &self.keys())
            .field("observers", &self.observers().len())
            .field("options", &self.inner.options)
            .finish()
    }
}

fn sync_ctor<T, F>(factory: F) -> SyncCtor
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn(&ResolverContext) -> DiResult<Arc<T>> + Send + Sync + 'static,
{
    Arc::new(move |ctx: &ResolverContext| factory(ctx).map(erase))
}

fn report(observers: &Observers, key: &Key, started: Instant, result: DiResult<AnyArc>) -> DiResult<AnyArc> {
    match &result {
        Ok(_) => observers.resolved(key, started.elapsed()),
        Err(err) => {
            tracing::trace!(key = %key, error = %err, "resolution failed");
            observers.resolution_failed(key, err);
        }
    }
    result
}
