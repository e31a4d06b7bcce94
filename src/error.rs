//! Error types for the container.

use thiserror::Error;

use crate::key::Key;

/// Container errors
///
/// Represents the conditions that can occur during registration,
/// resolution, resource release and callable injection. All of them surface
/// to the caller; the container never retries.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Container, DiError, Key, Resolver};
///
/// let container = Container::new();
/// match container.resolve::<String>() {
///     Err(DiError::ProviderNotFound { key, available }) => {
///         assert_eq!(key, Key::of::<String>());
///         assert!(available.is_empty());
///     }
///     _ => unreachable!(),
/// }
///
/// let circular = DiError::CircularDependency {
///     chain: vec![Key::of::<u8>(), Key::of::<u16>(), Key::of::<u8>()],
/// };
/// assert_eq!(circular.to_string(), "Circular dependency detected: u8 -> u16 -> u8");
/// ```
#[derive(Debug, Clone, Error)]
pub enum DiError {
    /// Resolving or aliasing a key that has no provider
    #[error(
        "Provider for '{key}' not found in container. Available providers: {}",
        list_keys(.available)
    )]
    ProviderNotFound {
        /// The missing key
        key: Key,
        /// Keys registered at the time of the failure, in registration order
        available: Vec<Key>,
    },

    /// A key reappeared in its own resolution path
    #[error("Circular dependency detected: {}", join_chain(.chain))]
    CircularDependency {
        /// Full traversal path, ending with the repeated key
        chain: Vec<Key>,
    },

    /// Resolving one parameter of an injected callable failed
    #[error(
        "Failed to inject dependency '{key}' for parameter '{param}' in function '{callable}': {cause}"
    )]
    DependencyInjection {
        /// Key of the parameter being injected
        key: Key,
        /// Parameter name
        param: &'static str,
        /// Name of the wrapped callable
        callable: &'static str,
        /// The original failure
        #[source]
        cause: Box<DiError>,
    },

    /// A synchronous path tried to consume an asynchronous provider
    #[error(
        "Dependency '{key}' is provided asynchronously and cannot be resolved in a sync context. \
         Use the async resolution path or register a sync provider"
    )]
    AsyncProviderInSyncContext {
        /// Key of the asynchronous provider
        key: Key,
    },

    /// Duplicate registration rejected by `DuplicatePolicy::Reject`
    #[error("Provider for '{key}' is already registered")]
    AlreadyRegistered {
        /// The key that was registered twice
        key: Key,
    },

    /// Type downcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),

    /// Operation not valid for the provider's lifetime
    #[error("Lifetime error: {0}")]
    WrongLifetime(String),

    /// Maximum resolution depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),

    /// Injection signature does not match the dependency tuple
    #[error("Invalid injection signature for '{callable}': {reason}")]
    InvalidSignature {
        /// Name of the wrapped callable
        callable: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// A factory reported a construction failure
    #[error("Failed to construct '{type_name}': {message}")]
    Construction {
        /// Type being constructed
        type_name: &'static str,
        /// Failure description
        message: String,
    },
}

impl DiError {
    /// Builds a [`DiError::Construction`] for `T` from any displayable error.
    ///
    /// ```rust
    /// use ferrous_ioc::DiError;
    ///
    /// let err = DiError::construction::<String>("disk full");
    /// assert_eq!(err.to_string(), "Failed to construct 'alloc::string::String': disk full");
    /// ```
    pub fn construction<T: ?Sized + 'static>(message: impl std::fmt::Display) -> Self {
        DiError::Construction {
            type_name: std::any::type_name::<T>(),
            message: message.to_string(),
        }
    }

    /// Follows `DependencyInjection` causes down to the innermost error.
    pub fn root_cause(&self) -> &DiError {
        let mut current = self;
        while let DiError::DependencyInjection { cause, .. } = current {
            current = cause;
        }
        current
    }
}

fn join_chain(chain: &[Key]) -> String {
    chain.iter().map(Key::to_string).collect::<Vec<_>>().join(" -> ")
}

fn list_keys(keys: &[Key]) -> String {
    if keys.is_empty() {
        "None".to_string()
    } else {
        keys.iter().map(Key::to_string).collect::<Vec<_>>().join(", ")
    }
}

/// Result type for container operations
///
/// ```rust
/// use ferrous_ioc::{DiError, DiResult};
///
/// fn open() -> DiResult<u16> {
///     Err(DiError::construction::<u16>("port unavailable"))
/// }
///
/// assert!(open().is_err());
/// ```
pub type DiResult<T> = Result<T, DiError>;
