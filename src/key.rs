//! Provider key types for the container.

use std::any::TypeId;
use std::fmt;

/// Key for provider storage and lookup.
///
/// Keys uniquely identify providers in the container. The `TypeId` drives
/// equality and hashing; the type name is carried along for diagnostics
/// only, which keeps error messages readable without paying for string
/// comparisons on the hot path.
///
/// Keys work for unsized types too, so an abstract `dyn Trait` can be a key
/// just like a concrete struct.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::Key;
///
/// trait Repository: Send + Sync {}
///
/// let concrete = Key::of::<String>();
/// let abstract_key = Key::of::<dyn Repository>();
/// let named = Key::named::<u32>("http_port");
///
/// assert_eq!(concrete, Key::of::<String>());
/// assert_ne!(named, Key::of::<u32>());
/// assert_eq!(named.service_name(), Some("http_port"));
/// assert!(abstract_key.display_name().contains("Repository"));
/// ```
#[derive(Debug, Clone, Copy)]
pub enum Key {
    /// Unnamed key for a type (sized or `dyn Trait`).
    Type(TypeId, &'static str),
    /// Named key: the same type registered several times under different names.
    Named(TypeId, &'static str, &'static str),
}

impl Key {
    /// Key for the type `T`.
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Key::Type(TypeId::of::<T>(), std::any::type_name::<T>())
    }

    /// Key for the type `T` registered under `name`.
    #[inline(always)]
    pub fn named<T: ?Sized + 'static>(name: &'static str) -> Self {
        Key::Named(TypeId::of::<T>(), std::any::type_name::<T>(), name)
    }

    /// The type name for display.
    pub fn display_name(&self) -> &'static str {
        match self {
            Key::Type(_, name) => name,
            Key::Named(_, name, _) => name,
        }
    }

    /// The registration name for named keys, `None` otherwise.
    pub fn service_name(&self) -> Option<&'static str> {
        match self {
            Key::Type(_, _) => None,
            Key::Named(_, _, name) => Some(name),
        }
    }

    /// The `TypeId` of the instance type behind this key.
    pub fn type_id(&self) -> TypeId {
        match self {
            Key::Type(id, _) | Key::Named(id, _, _) => *id,
        }
    }
}

// TypeId-only comparison; the type name is diagnostics
impl PartialEq for Key {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Type(a, _), Key::Type(b, _)) => a == b,
            (Key::Named(a, _, name_a), Key::Named(b, _, name_b)) => a == b && name_a == name_b,
            _ => false,
        }
    }
}

impl Eq for Key {}

impl std::hash::Hash for Key {
    #[inline(always)]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Key::Type(id, _) => {
                0u8.hash(state);
                id.hash(state);
            }
            Key::Named(id, _, name) => {
                1u8.hash(state);
                id.hash(state);
                name.hash(state);
            }
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Type(_, name) => f.write_str(name),
            Key::Named(_, name, service) => write!(f, "{}[{}]", name, service),
        }
    }
}

/// Shorthand for [`Key::of`].
#[inline(always)]
pub fn key_of_type<T: ?Sized + 'static>() -> Key {
    Key::of::<T>()
}
