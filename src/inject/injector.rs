//! Callable wrapping with just-in-time dependency injection.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::container::{Container, ResolverContext};
use crate::error::{DiError, DiResult};
use crate::inject::{DependencySet, InjectionPlan, Overrides, ParamKind};
use crate::internal::BoxFuture;
use crate::traits::ResolverCore;

/// Builder describing a callable's signature before wrapping it.
///
/// Parameters are declared in their original order: `dep` for parameters
/// the container supplies, `arg` for parameters the caller supplies. The
/// `dep` parameters map, in order, onto the elements of the dependency tuple
/// the wrapped closure receives. The caller's arguments arrive as a single
/// value (usually a struct with named fields), so arguments following an
/// injected parameter can only ever be passed by name.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::Container;
/// use std::sync::Arc;
///
/// struct Greeter { greeting: String }
/// struct GreetArgs { name: String }
///
/// let container = Container::new();
/// container.add_singleton(Greeter { greeting: "Hello".to_string() }).unwrap();
///
/// let greet = container
///     .injector("greet")
///     .dep("greeter")
///     .arg("name")
///     .wrap(|(greeter,): (Arc<Greeter>,), args: GreetArgs| {
///         format!("{}, {}!", greeter.greeting, args.name)
///     })
///     .unwrap();
///
/// assert_eq!(greet.plan().keyword_only(), vec!["name"]);
/// assert_eq!(greet.call(GreetArgs { name: "Ada".to_string() }).unwrap(), "Hello, Ada!");
/// ```
///
/// Arguments cannot be passed positionally:
///
/// ```compile_fail
/// use ferrous_ioc::Container;
/// use std::sync::Arc;
///
/// struct Greeter;
/// struct GreetArgs { name: String }
///
/// let container = Container::new();
/// container.add_singleton(Greeter).unwrap();
/// let greet = container
///     .injector("greet")
///     .dep("greeter")
///     .arg("name")
///     .wrap(|(_greeter,): (Arc<Greeter>,), args: GreetArgs| args.name)
///     .unwrap();
///
/// greet.call("Ada".to_string());
/// ```
pub struct Injector {
    container: Container,
    callable: &'static str,
    params: Vec<(&'static str, bool)>,
}

impl Injector {
    pub(crate) fn new(container: Container, callable: &'static str) -> Self {
        Self {
            container,
            callable,
            params: Vec::new(),
        }
    }

    /// Declares a caller-supplied parameter.
    pub fn arg(mut self, name: &'static str) -> Self {
        self.params.push((name, false));
        self
    }

    /// Declares a container-supplied parameter.
    pub fn dep(mut self, name: &'static str) -> Self {
        self.params.push((name, true));
        self
    }

    /// Wraps a synchronous callable.
    ///
    /// The injection plan is computed here, once: `Option<Arc<T>>`
    /// dependencies whose key is unregistered at this point always receive
    /// `None`.
    pub fn wrap<D, A, R, F>(self, func: F) -> DiResult<Injected<D, A, R>>
    where
        D: DependencySet,
        F: Fn(D, A) -> R + Send + Sync + 'static,
    {
        let plan = self.plan::<D>()?;
        tracing::debug!(callable = self.callable, params = plan.params().len(), "callable wrapped");
        Ok(Injected {
            container: self.container,
            plan: Arc::new(plan),
            func: Arc::new(func),
        })
    }

    /// Wraps an asynchronous callable.
    ///
    /// Dependencies are resolved through the async path, so async providers
    /// are accepted.
    pub fn wrap_async<D, A, R, F, Fut>(self, func: F) -> DiResult<InjectedAsync<D, A, R>>
    where
        D: DependencySet,
        A: 'static,
        R: 'static,
        F: Fn(D, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let plan = self.plan::<D>()?;
        tracing::debug!(callable = self.callable, params = plan.params().len(), "async callable wrapped");
        Ok(InjectedAsync {
            container: self.container,
            plan: Arc::new(plan),
            func: Arc::new(move |deps: D, args: A| -> BoxFuture<'static, R> { Box::pin(func(deps, args)) }),
        })
    }

    fn plan<D: DependencySet>(&self) -> DiResult<InjectionPlan> {
        let mut seen = HashSet::new();
        for (name, _) in &self.params {
            if !seen.insert(*name) {
                return Err(DiError::InvalidSignature {
                    callable: self.callable,
                    reason: format!("duplicate parameter '{}'", name),
                });
            }
        }

        let declared = self.params.iter().filter(|(_, dep)| *dep).count();
        if declared != D::ARITY {
            return Err(DiError::InvalidSignature {
                callable: self.callable,
                reason: format!(
                    "{} dependencies declared but the dependency tuple has {}",
                    declared,
                    D::ARITY
                ),
            });
        }

        let mut kinds = D::classify(&self.container).into_iter();
        let signature = self
            .params
            .iter()
            .map(|&(name, dep)| {
                let kind = if dep {
                    kinds.next().unwrap_or(ParamKind::PassThrough)
                } else {
                    ParamKind::PassThrough
                };
                (name, kind)
            })
            .collect();

        Ok(InjectionPlan::new(self.callable, signature))
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("callable", &self.callable)
            .field("params", &self.params)
            .finish()
    }
}

/// A synchronous callable with its dependencies injected per call.
pub struct Injected<D, A, R> {
    container: Container,
    plan: Arc<InjectionPlan>,
    func: Arc<dyn Fn(D, A) -> R + Send + Sync>,
}

impl<D: DependencySet, A, R> Injected<D, A, R> {
    /// Calls the wrapped callable, resolving every dependency.
    pub fn call(&self, args: A) -> DiResult<R> {
        self.call_with(Overrides::new(), args)
    }

    /// Calls the wrapped callable; parameters named in `overrides` use the
    /// supplied value instead of being resolved.
    ///
    /// Resolution failures are reported as
    /// [`DiError::DependencyInjection`] naming the parameter, except
    /// [`DiError::AsyncProviderInSyncContext`], which is returned as is.
    pub fn call_with(&self, overrides: Overrides, args: A) -> DiResult<R> {
        self.invoke(&self.container, overrides, args)
    }

    /// Calls the wrapped callable from inside a factory, continuing the
    /// factory's resolution chain.
    ///
    /// A dependency that is already being built further up the chain is
    /// reported as a [`DiError::CircularDependency`] (wrapped in
    /// [`DiError::DependencyInjection`]).
    pub fn call_in(&self, ctx: &ResolverContext, args: A) -> DiResult<R> {
        self.invoke(ctx, Overrides::new(), args)
    }

    /// [`call_in`](Self::call_in) with overrides.
    pub fn call_with_in(&self, ctx: &ResolverContext, overrides: Overrides, args: A) -> DiResult<R> {
        self.invoke(ctx, overrides, args)
    }

    fn invoke(&self, resolver: &dyn ResolverCore, overrides: Overrides, args: A) -> DiResult<R> {
        let slots = self.plan.slots(overrides)?;
        let deps = D::resolve(slots, resolver).map_err(|failure| self.plan.wrap_error(failure))?;
        Ok((self.func)(deps, args))
    }

    /// Name of the wrapped callable.
    pub fn name(&self) -> &'static str {
        self.plan.callable()
    }

    /// The plan computed at wrap time.
    pub fn plan(&self) -> &InjectionPlan {
        &self.plan
    }
}

impl<D, A, R> Clone for Injected<D, A, R> {
    fn clone(&self) -> Self {
        Self {
            container: self.container.clone(),
            plan: self.plan.clone(),
            func: self.func.clone(),
        }
    }
}

impl<D, A, R> fmt::Debug for Injected<D, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injected").field("plan", &self.plan).finish()
    }
}

/// An asynchronous callable with its dependencies injected per call.
pub struct InjectedAsync<D, A, R> {
    container: Container,
    plan: Arc<InjectionPlan>,
    func: Arc<dyn Fn(D, A) -> BoxFuture<'static, R> + Send + Sync>,
}

impl<D: DependencySet, A, R> InjectedAsync<D, A, R> {
    /// Calls the wrapped callable, resolving every dependency.
    pub async fn call(&self, args: A) -> DiResult<R> {
        self.call_with(Overrides::new(), args).await
    }

    /// Calls the wrapped callable with caller-supplied dependency values.
    pub async fn call_with(&self, overrides: Overrides, args: A) -> DiResult<R> {
        self.invoke(&self.container, overrides, args).await
    }

    /// Calls the wrapped callable from inside a factory, continuing the
    /// factory's resolution chain.
    pub async fn call_in(&self, ctx: &ResolverContext, args: A) -> DiResult<R> {
        self.invoke(ctx, Overrides::new(), args).await
    }

    /// [`call_in`](Self::call_in) with overrides.
    pub async fn call_with_in(&self, ctx: &ResolverContext, overrides: Overrides, args: A) -> DiResult<R> {
        self.invoke(ctx, overrides, args).await
    }

    async fn invoke(&self, resolver: &dyn ResolverCore, overrides: Overrides, args: A) -> DiResult<R> {
        let slots = self.plan.slots(overrides)?;
        let deps = D::resolve_async(slots, resolver)
            .await
            .map_err(|failure| self.plan.wrap_error(failure))?;
        Ok((self.func)(deps, args).await)
    }

    /// Name of the wrapped callable.
    pub fn name(&self) -> &'static str {
        self.plan.callable()
    }

    /// The plan computed at wrap time.
    pub fn plan(&self) -> &InjectionPlan {
        &self.plan
    }
}

impl<D, A, R> Clone for InjectedAsync<D, A, R> {
    fn clone(&self) -> Self {
        Self {
            container: self.container.clone(),
            plan: self.plan.clone(),
            func: self.func.clone(),
        }
    }
}

impl<D, A, R> fmt::Debug for InjectedAsync<D, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectedAsync").field("plan", &self.plan).finish()
    }
}
