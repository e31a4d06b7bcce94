//! # ferrous-ioc
//!
//! An in-process inversion-of-control container: providers registered under
//! typed keys, explicit lifetimes, cycle-safe resolution, constructor
//! auto-wiring and callable injection.
//!
//! ## Features
//!
//! - **Lifetimes**: Singleton, Factory and Resource (explicit acquire/release)
//! - **Trait objects**: register and resolve `dyn Trait` keys, or alias a
//!   concrete provider under one
//! - **Cycle detection**: per-call-chain resolution paths, reported with the
//!   full traversal (`A -> B -> A`) instead of overflowing the stack
//! - **Thread-safe caches**: concurrent first resolutions build a singleton
//!   exactly once
//! - **Async providers**: resolved through the async path, rejected on the
//!   sync one
//! - **Callable injection**: wrap a closure with an explicit signature and
//!   have its dependencies resolved on every call
//! - **Test isolation**: registry snapshot and restore
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_ioc::{Container, Resolver};
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let container = Container::new();
//! container
//!     .add_singleton(Database {
//!         connection_string: "postgres://localhost".to_string(),
//!     })
//!     .unwrap();
//! container
//!     .add_factory::<UserService, _>(|ctx| UserService {
//!         db: ctx.resolve::<Database>().unwrap(),
//!     })
//!     .unwrap();
//!
//! let user_service = container.resolve::<UserService>().unwrap();
//! assert_eq!(user_service.db.connection_string, "postgres://localhost");
//! ```
//!
//! ## Lifetimes
//!
//! - **Singleton**: built once and shared for the life of the container
//! - **Factory**: built fresh on every resolution
//! - **Resource**: built on first acquire, shared while open, torn down by
//!   `release`; the next acquire builds a new instance
//!
//! ## Cycles
//!
//! ```rust
//! use ferrous_ioc::{Container, DiError, Key, Lifetime, Resolver};
//! use std::sync::Arc;
//!
//! struct A;
//! struct B;
//!
//! let container = Container::new();
//! container
//!     .register::<A, _>(Lifetime::Singleton, |ctx| {
//!         ctx.resolve::<B>()?;
//!         Ok(Arc::new(A))
//!     })
//!     .unwrap();
//! container
//!     .register::<B, _>(Lifetime::Singleton, |ctx| {
//!         ctx.resolve::<A>()?;
//!         Ok(Arc::new(B))
//!     })
//!     .unwrap();
//!
//! match container.resolve::<A>() {
//!     Err(DiError::CircularDependency { chain }) => {
//!         assert_eq!(chain, vec![Key::of::<A>(), Key::of::<B>(), Key::of::<A>()]);
//!     }
//!     _ => unreachable!(),
//! }
//! ```
//!
//! ## Callable Injection
//!
//! ```rust
//! use ferrous_ioc::Container;
//! use std::sync::Arc;
//!
//! struct Repository;
//! impl Repository {
//!     fn find(&self, id: u32) -> String {
//!         format!("user-{}", id)
//!     }
//! }
//!
//! struct Args {
//!     user_id: u32,
//! }
//!
//! let container = Container::new();
//! container.add_singleton(Repository).unwrap();
//!
//! let handler = container
//!     .injector("get_user")
//!     .dep("repo")
//!     .arg("user_id")
//!     .wrap(|(repo,): (Arc<Repository>,), args: Args| repo.find(args.user_id))
//!     .unwrap();
//!
//! assert_eq!(handler.call(Args { user_id: 7 }).unwrap(), "user-7");
//! ```

pub mod async_factories;
pub mod autowire;
pub mod config;
pub mod container;
pub mod error;
pub mod inject;
pub mod key;
pub mod lifetime;
pub mod observer;
pub mod traits;

mod internal;
mod registration;

pub use async_factories::AsyncFactory;
pub use autowire::{plan_for, Autowire};
pub use config::{ContainerOptions, DuplicatePolicy};
pub use container::{Container, ResolverContext};
pub use error::{DiError, DiResult};
pub use inject::{
    CallingConvention, DependencySet, Inject, Injected, InjectedAsync, InjectionPlan, Injector, Overrides,
    ParamKind, PlannedParam, Slot, SlotError,
};
pub use internal::BoxFuture;
pub use key::{key_of_type, Key};
pub use lifetime::Lifetime;
pub use observer::{DiObserver, TracingObserver};
pub use registration::{AnyArc, Provider, RegistrySnapshot};
pub use traits::{AsyncDispose, Dispose, Resolver, ResolverCore};
