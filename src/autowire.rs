//! Constructor auto-wiring.
//!
//! A type implementing [`Autowire`] declares its constructor parameters as a
//! dependency tuple. Registering it with
//! [`Container::add_autowired`] builds a factory that resolves each
//! parameter on the resolving chain and calls the constructor.

use std::sync::Arc;

use crate::container::{Container, ResolverContext};
use crate::error::{DiError, DiResult};
use crate::inject::{DependencySet, InjectionPlan, Slot};
use crate::lifetime::Lifetime;

/// Constructor description for auto-wired types.
///
/// Usually derived with [`autowire!`](crate::autowire!). A manual impl is
/// useful when the constructor needs more than field assignment:
///
/// ```
/// use ferrous_ioc::{Autowire, Container, Lifetime, Resolver};
/// use std::sync::Arc;
///
/// struct Settings { retries: u32 }
/// struct Client { retries: u32, label: String }
///
/// impl Autowire for Client {
///     type Deps = (Arc<Settings>, Option<Arc<String>>);
///     const PARAMS: &'static [&'static str] = &["settings", "label"];
///
///     fn construct((settings, label): Self::Deps) -> Self {
///         Client {
///             retries: settings.retries,
///             label: label.map(|l| (*l).clone()).unwrap_or_else(|| "default".to_string()),
///         }
///     }
/// }
///
/// let container = Container::new();
/// container.add_singleton(Settings { retries: 3 }).unwrap();
/// container.add_autowired::<Client>(Lifetime::Factory).unwrap();
///
/// let client = container.resolve::<Client>().unwrap();
/// assert_eq!(client.retries, 3);
/// assert_eq!(client.label, "default");
/// ```
pub trait Autowire: Sized + Send + Sync + 'static {
    /// Constructor parameters, in order.
    type Deps: DependencySet;

    /// Constructor parameter names, matching `Deps` element for element.
    const PARAMS: &'static [&'static str];

    /// Builds the instance from its resolved parameters.
    fn construct(deps: Self::Deps) -> Self;
}

/// Computes the injection plan `container` would use for `T`.
///
/// `Option<Arc<_>>` parameters whose key is unregistered become
/// `OptionalAbsent`.
pub fn plan_for<T: Autowire>(container: &Container) -> DiResult<InjectionPlan> {
    let callable = std::any::type_name::<T>();
    if T::PARAMS.len() != <T::Deps as DependencySet>::ARITY {
        return Err(DiError::InvalidSignature {
            callable,
            reason: format!(
                "{} parameter names for {} constructor parameters",
                T::PARAMS.len(),
                <T::Deps as DependencySet>::ARITY
            ),
        });
    }

    let kinds = <T::Deps as DependencySet>::classify(container);
    Ok(InjectionPlan::new(callable, T::PARAMS.iter().copied().zip(kinds).collect()))
}

fn planned_slots(plan: &InjectionPlan) -> Vec<Slot> {
    plan.dependencies().map(|param| Slot::planned(param.kind)).collect()
}

impl Container {
    /// Registers `T` with a factory built from its [`Autowire`] impl.
    ///
    /// Parameters are classified now; failures while resolving them surface
    /// unchanged (a cycle is still a `CircularDependency`).
    pub fn add_autowired<T: Autowire>(&self, lifetime: Lifetime) -> DiResult<()> {
        let plan = plan_for::<T>(self)?;
        tracing::debug!(ty = plan.callable(), params = ?T::PARAMS, "autowired");
        self.register::<T, _>(lifetime, move |ctx| {
            <T::Deps as DependencySet>::resolve(planned_slots(&plan), ctx)
                .map(|deps| Arc::new(T::construct(deps)))
                .map_err(|failure| failure.error)
        })
    }

    /// Like [`add_autowired`](Self::add_autowired), but resolves parameters
    /// through the async path so they may come from async providers.
    pub fn add_autowired_async<T: Autowire>(&self, lifetime: Lifetime) -> DiResult<()> {
        let plan = Arc::new(plan_for::<T>(self)?);
        tracing::debug!(ty = plan.callable(), params = ?T::PARAMS, "autowired async");
        self.register_async::<T, _>(lifetime, move |ctx: ResolverContext| {
            let plan = plan.clone();
            async move {
                <T::Deps as DependencySet>::resolve_async(planned_slots(&plan), &ctx)
                    .await
                    .map(|deps| Arc::new(T::construct(deps)))
                    .map_err(|failure| failure.error)
            }
        })
    }
}

/// Implements [`Autowire`] for a struct whose fields are all dependencies.
///
/// ```
/// use ferrous_ioc::{autowire, Container, Lifetime, Resolver};
/// use std::sync::Arc;
///
/// struct Database;
/// struct Metrics;
/// struct Service {
///     db: Arc<Database>,
///     metrics: Option<Arc<Metrics>>,
/// }
/// autowire!(Service { db: Arc<Database>, metrics: Option<Arc<Metrics>> });
///
/// let container = Container::new();
/// container.add_singleton(Database).unwrap();
/// container.add_autowired::<Service>(Lifetime::Singleton).unwrap();
///
/// assert!(container.resolve::<Service>().unwrap().metrics.is_none());
/// ```
#[macro_export]
macro_rules! autowire {
    ($ty:ident { $($field:ident : $fty:ty),* $(,)? }) => {
        impl $crate::Autowire for $ty {
            type Deps = ($($fty,)*);
            const PARAMS: &'static [&'static str] = &[$(stringify!($field)),*];

            fn construct(deps: Self::Deps) -> Self {
                let ($($field,)*) = deps;
                $ty { $($field),* }
            }
        }
    };
}
