//! Internal implementation details.

pub(crate) mod circular;

use std::future::Future;
use std::pin::Pin;

pub(crate) use circular::{ResolutionChain, WaitGuard, DEFAULT_MAX_DEPTH};

/// Boxed, sendable future used at the object-safe async seams.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Future type for teardown operations.
pub(crate) type BoxFutureUnit = BoxFuture<'static, ()>;
