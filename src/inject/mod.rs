//! Dependency parameters and injection plans.
//!
//! A callable's dependencies are described by a tuple of parameter types
//! (`(Arc<A>, Option<Arc<B>>, ...)`). Each element knows its key and how to
//! classify itself against a registry; the tuple as a whole resolves its
//! slots in declaration order.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::internal::BoxFuture;
use crate::key::Key;
use crate::registration::{downcast, erase, AnyArc};
use crate::traits::ResolverCore;

mod injector;

pub use injector::{Injected, InjectedAsync, Injector};

/// How one parameter is satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Resolved from the container on every call.
    Required(Key),
    /// Declared optional and unregistered when the plan was built; always
    /// receives `None`.
    OptionalAbsent(Key),
    /// Supplied by the caller.
    PassThrough,
}

impl ParamKind {
    /// The dependency key, `None` for pass-through parameters.
    pub fn key(&self) -> Option<Key> {
        match self {
            ParamKind::Required(key) | ParamKind::OptionalAbsent(key) => Some(*key),
            ParamKind::PassThrough => None,
        }
    }

    /// True unless the parameter is pass-through.
    pub fn is_injectable(&self) -> bool {
        !matches!(self, ParamKind::PassThrough)
    }
}

/// How the caller may supply a pass-through parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallingConvention {
    /// Positional or by name.
    PositionalOrKeyword,
    /// By name only. Every pass-through parameter after the first injected
    /// one gets this convention, since injected parameters no longer occupy
    /// a position.
    KeywordOnly,
}

/// One parameter of a wrapped callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedParam {
    /// Parameter name.
    pub name: &'static str,
    /// How the parameter is satisfied.
    pub kind: ParamKind,
    /// Calling convention for the caller.
    pub convention: CallingConvention,
}

/// Parameter-to-dependency mapping for a wrapped callable, computed once at
/// wrap time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionPlan {
    callable: &'static str,
    params: Vec<PlannedParam>,
}

impl InjectionPlan {
    /// Builds a plan from an ordered signature.
    ///
    /// `signature` lists each parameter with its classification; conventions
    /// are derived from the order.
    pub fn new(callable: &'static str, signature: Vec<(&'static str, ParamKind)>) -> Self {
        let mut seen_injectable = false;
        let params = signature
            .into_iter()
            .map(|(name, kind)| {
                seen_injectable |= kind.is_injectable();
                let convention = if seen_injectable && !kind.is_injectable() {
                    CallingConvention::KeywordOnly
                } else {
                    CallingConvention::PositionalOrKeyword
                };
                PlannedParam { name, kind, convention }
            })
            .collect();
        Self { callable, params }
    }

    /// Name of the wrapped callable.
    pub fn callable(&self) -> &'static str {
        self.callable
    }

    /// All parameters in declaration order.
    pub fn params(&self) -> &[PlannedParam] {
        &self.params
    }

    /// Looks a parameter up by name.
    pub fn param(&self, name: &str) -> Option<&PlannedParam> {
        self.params.iter().find(|param| param.name == name)
    }

    /// Injectable parameters, in declaration order.
    pub fn dependencies(&self) -> impl Iterator<Item = &PlannedParam> {
        self.params.iter().filter(|param| param.kind.is_injectable())
    }

    /// Names of the parameters the caller must pass by name.
    pub fn keyword_only(&self) -> Vec<&'static str> {
        self.params
            .iter()
            .filter(|param| param.convention == CallingConvention::KeywordOnly)
            .map(|param| param.name)
            .collect()
    }

    /// Pairs each dependency with its caller-supplied override, if any.
    ///
    /// Overrides naming anything but an injectable parameter are rejected.
    pub(crate) fn slots(&self, mut overrides: Overrides) -> DiResult<Vec<Slot>> {
        let slots = self
            .dependencies()
            .map(|param| Slot {
                kind: param.kind,
                supplied: overrides.values.remove(param.name),
            })
            .collect();

        if !overrides.values.is_empty() {
            let mut unknown: Vec<&str> = overrides.values.keys().copied().collect();
            unknown.sort_unstable();
            return Err(DiError::InvalidSignature {
                callable: self.callable,
                reason: format!("no injectable parameter named {}", unknown.join(", ")),
            });
        }
        Ok(slots)
    }

    /// Attaches parameter context to a slot failure.
    ///
    /// `AsyncProviderInSyncContext` is passed through untouched.
    pub(crate) fn wrap_error(&self, failure: SlotError) -> DiError {
        let SlotError { index, error } = failure;
        if matches!(error, DiError::AsyncProviderInSyncContext { .. }) {
            return error;
        }
        match self.dependencies().nth(index).and_then(|param| param.kind.key().map(|key| (param, key))) {
            Some((param, key)) => DiError::DependencyInjection {
                key,
                param: param.name,
                callable: self.callable,
                cause: Box::new(error),
            },
            None => error,
        }
    }
}

/// One dependency position: its classification plus an optional
/// caller-supplied value.
#[doc(hidden)]
#[derive(Debug, Clone)]
pub struct Slot {
    kind: ParamKind,
    supplied: Option<AnyArc>,
}

impl Slot {
    pub(crate) fn planned(kind: ParamKind) -> Self {
        Self { kind, supplied: None }
    }
}

/// Failure while filling the dependency at `index`.
#[derive(Debug)]
pub struct SlotError {
    /// Position within the dependency tuple.
    pub index: usize,
    /// The underlying failure.
    pub error: DiError,
}

/// A type that can appear as an injected parameter.
///
/// Implemented for `Arc<T>` (always resolved) and `Option<Arc<T>>`
/// (resolved when registered at plan time, `None` otherwise).
pub trait Inject: Sized + Send + 'static {
    /// Key this parameter resolves.
    fn key() -> Key;

    /// Classifies the parameter against `resolver`.
    fn classify(resolver: &dyn ResolverCore) -> ParamKind;

    #[doc(hidden)]
    fn provide(slot: Slot, resolver: &dyn ResolverCore) -> DiResult<Self>;

    #[doc(hidden)]
    fn provide_async(slot: Slot, resolver: &dyn ResolverCore) -> BoxFuture<'_, DiResult<Self>>;
}

impl<T: ?Sized + Send + Sync + 'static> Inject for Arc<T> {
    fn key() -> Key {
        Key::of::<T>()
    }

    fn classify(_resolver: &dyn ResolverCore) -> ParamKind {
        ParamKind::Required(Key::of::<T>())
    }

    fn provide(slot: Slot, resolver: &dyn ResolverCore) -> DiResult<Self> {
        match slot.supplied {
            Some(value) => downcast::<T>(value),
            None => downcast::<T>(resolver.resolve_key(&Key::of::<T>())?),
        }
    }

    fn provide_async(slot: Slot, resolver: &dyn ResolverCore) -> BoxFuture<'_, DiResult<Self>> {
        Box::pin(async move {
            match slot.supplied {
                Some(value) => downcast::<T>(value),
                None => {
                    let key = Key::of::<T>();
                    downcast::<T>(resolver.resolve_key_async(&key).await?)
                }
            }
        })
    }
}

impl<T: ?Sized + Send + Sync + 'static> Inject for Option<Arc<T>> {
    fn key() -> Key {
        Key::of::<T>()
    }

    fn classify(resolver: &dyn ResolverCore) -> ParamKind {
        let key = Key::of::<T>();
        if resolver.has_key(&key) {
            ParamKind::Required(key)
        } else {
            ParamKind::OptionalAbsent(key)
        }
    }

    fn provide(slot: Slot, resolver: &dyn ResolverCore) -> DiResult<Self> {
        match (slot.supplied, slot.kind) {
            (Some(value), _) => downcast::<T>(value).map(Some),
            (None, ParamKind::Required(key)) => downcast::<T>(resolver.resolve_key(&key)?).map(Some),
            (None, _) => Ok(None),
        }
    }

    fn provide_async(slot: Slot, resolver: &dyn ResolverCore) -> BoxFuture<'_, DiResult<Self>> {
        Box::pin(async move {
            match (slot.supplied, slot.kind) {
                (Some(value), _) => downcast::<T>(value).map(Some),
                (None, ParamKind::Required(key)) => {
                    downcast::<T>(resolver.resolve_key_async(&key).await?).map(Some)
                }
                (None, _) => Ok(None),
            }
        })
    }
}

/// An ordered set of injected parameters; implemented for tuples of up to
/// eight [`Inject`] types.
pub trait DependencySet: Sized + Send + 'static {
    /// Number of parameters.
    const ARITY: usize;

    /// Keys in declaration order.
    fn keys() -> Vec<Key>;

    /// Classifies every parameter against `resolver`.
    fn classify(resolver: &dyn ResolverCore) -> Vec<ParamKind>;

    #[doc(hidden)]
    fn resolve(slots: Vec<Slot>, resolver: &dyn ResolverCore) -> Result<Self, SlotError>;

    #[doc(hidden)]
    fn resolve_async(slots: Vec<Slot>, resolver: &dyn ResolverCore) -> BoxFuture<'_, Result<Self, SlotError>>;
}

fn missing_slot(index: usize) -> SlotError {
    SlotError {
        index,
        error: DiError::InvalidSignature {
            callable: "<dependency set>",
            reason: format!("no slot for dependency {}", index),
        },
    }
}

macro_rules! impl_dependency_set {
    ($($name:ident),*) => {
        #[allow(unused_mut, unused_variables)]
        impl<$($name: Inject),*> DependencySet for ($($name,)*) {
            const ARITY: usize = <[&str]>::len(&[$(stringify!($name)),*]);

            fn keys() -> Vec<Key> {
                vec![$($name::key()),*]
            }

            fn classify(resolver: &dyn ResolverCore) -> Vec<ParamKind> {
                vec![$($name::classify(resolver)),*]
            }

            fn resolve(slots: Vec<Slot>, resolver: &dyn ResolverCore) -> Result<Self, SlotError> {
                let mut slots = slots.into_iter().enumerate();
                Ok(($(
                    {
                        let (index, slot) = slots.next().ok_or_else(|| missing_slot(Self::ARITY))?;
                        $name::provide(slot, resolver).map_err(|error| SlotError { index, error })?
                    },
                )*))
            }

            fn resolve_async(
                slots: Vec<Slot>,
                resolver: &dyn ResolverCore,
            ) -> BoxFuture<'_, Result<Self, SlotError>> {
                Box::pin(async move {
                    let mut slots = slots.into_iter().enumerate();
                    Ok(($(
                        {
                            let (index, slot) = slots.next().ok_or_else(|| missing_slot(Self::ARITY))?;
                            $name::provide_async(slot, resolver)
                                .await
                                .map_err(|error| SlotError { index, error })?
                        },
                    )*))
                })
            }
        }
    };
}

impl_dependency_set!();
impl_dependency_set!(D1);
impl_dependency_set!(D1, D2);
impl_dependency_set!(D1, D2, D3);
impl_dependency_set!(D1, D2, D3, D4);
impl_dependency_set!(D1, D2, D3, D4, D5);
impl_dependency_set!(D1, D2, D3, D4, D5, D6);
impl_dependency_set!(D1, D2, D3, D4, D5, D6, D7);
impl_dependency_set!(D1, D2, D3, D4, D5, D6, D7, D8);

/// Caller-supplied values for injectable parameters.
///
/// A supplied value takes precedence over resolution for that call.
///
/// ```
/// use ferrous_ioc::Overrides;
/// use std::sync::Arc;
///
/// let overrides = Overrides::new().with::<String>("greeting", Arc::new("hi".to_string()));
/// assert_eq!(overrides.len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct Overrides {
    values: HashMap<&'static str, AnyArc>,
}

impl Overrides {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplies `value` for the parameter `param`.
    pub fn with<T: ?Sized + Send + Sync + 'static>(mut self, param: &'static str, value: Arc<T>) -> Self {
        self.values.insert(param, erase(value));
        self
    }

    /// Number of supplied parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if nothing is supplied.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Overrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.values.keys().copied().collect();
        names.sort_unstable();
        f.debug_struct("Overrides").field("params", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Db;
    struct Cache;

    #[test]
    fn test_keyword_only_after_first_dependency() {
        let plan = InjectionPlan::new(
            "handler",
            vec![
                ("a", ParamKind::PassThrough),
                ("db", ParamKind::Required(Key::of::<Db>())),
                ("user_id", ParamKind::PassThrough),
                ("cache", ParamKind::OptionalAbsent(Key::of::<Cache>())),
                ("limit", ParamKind::PassThrough),
            ],
        );

        assert_eq!(plan.param("a").unwrap().convention, CallingConvention::PositionalOrKeyword);
        assert_eq!(plan.keyword_only(), vec!["user_id", "limit"]);
        assert_eq!(
            plan.dependencies().map(|p| p.name).collect::<Vec<_>>(),
            vec!["db", "cache"]
        );
    }

    #[test]
    fn test_slots_take_overrides_by_name() {
        let plan = InjectionPlan::new(
            "handler",
            vec![("db", ParamKind::Required(Key::of::<Db>())), ("x", ParamKind::PassThrough)],
        );

        let slots = plan.slots(Overrides::new().with("db", Arc::new(Db))).unwrap();
        assert_eq!(slots.len(), 1);
        assert!(slots[0].supplied.is_some());

        // pass-through parameters cannot be overridden
        let err = plan.slots(Overrides::new().with("x", Arc::new(1u8))).unwrap_err();
        assert!(matches!(err, DiError::InvalidSignature { callable: "handler", .. }));
    }

    #[test]
    fn test_wrap_error_keeps_async_error_bare() {
        let plan = InjectionPlan::new("handler", vec![("db", ParamKind::Required(Key::of::<Db>()))]);

        let wrapped = plan.wrap_error(SlotError {
            index: 0,
            error: DiError::DepthExceeded(3),
        });
        match wrapped {
            DiError::DependencyInjection { key, param, callable, cause } => {
                assert_eq!(key, Key::of::<Db>());
                assert_eq!(param, "db");
                assert_eq!(callable, "handler");
                assert!(matches!(*cause, DiError::DepthExceeded(3)));
            }
            other => panic!("unexpected {:?}", other),
        }

        let bare = plan.wrap_error(SlotError {
            index: 0,
            error: DiError::AsyncProviderInSyncContext { key: Key::of::<Db>() },
        });
        assert!(matches!(bare, DiError::AsyncProviderInSyncContext { .. }));
    }

    #[test]
    fn test_tuple_arity() {
        assert_eq!(<() as DependencySet>::ARITY, 0);
        assert_eq!(<(Arc<Db>,) as DependencySet>::ARITY, 1);
        assert_eq!(<(Arc<Db>, Option<Arc<Cache>>, Arc<u8>) as DependencySet>::ARITY, 3);
        assert_eq!(
            <(Arc<Db>, Option<Arc<Cache>>) as DependencySet>::keys(),
            vec![Key::of::<Db>(), Key::of::<Cache>()]
        );
    }
}
