use ferrous_ioc::{
    CallingConvention, Container, DiError, Key, Lifetime, Overrides, ParamKind, Resolver, ResolverContext,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Database {
    name: String,
}

struct Mailer;

struct Args {
    x: i64,
}

fn container_with_db() -> Container {
    let container = Container::new();
    container
        .add_singleton(Database {
            name: "main".to_string(),
        })
        .unwrap();
    container
}

#[test]
fn test_dependency_resolved_and_arg_passed_by_name() {
    let container = container_with_db();
    let handler = container
        .injector("handler")
        .dep("db")
        .arg("x")
        .wrap(|(db,): (Arc<Database>,), args: Args| format!("{}:{}", db.name, args.x))
        .unwrap();

    assert_eq!(handler.call(Args { x: 5 }).unwrap(), "main:5");
    assert_eq!(handler.name(), "handler");
    assert_eq!(handler.plan().keyword_only(), vec!["x"]);
}

#[test]
fn test_plan_is_computed_once() {
    let container = Container::new();
    let handler = container
        .injector("maybe_mail")
        .dep("mailer")
        .wrap(|(mailer,): (Option<Arc<Mailer>>,), _: ()| mailer.is_some())
        .unwrap();

    assert_eq!(
        handler.plan().param("mailer").unwrap().kind,
        ParamKind::OptionalAbsent(Key::of::<Mailer>())
    );

    // registering afterwards does not change the plan
    container.add_singleton(Mailer).unwrap();
    assert!(!handler.call(()).unwrap());
}

#[test]
fn test_optional_missing_arrives_as_none() {
    let container = Container::new();
    let handler = container
        .injector("notify")
        .dep("mailer")
        .wrap(|(mailer,): (Option<Arc<Mailer>>,), _: ()| mailer.is_none())
        .unwrap();

    assert!(handler.call(()).unwrap());
}

#[test]
fn test_optional_present_is_resolved() {
    let container = Container::new();
    container.add_singleton(Mailer).unwrap();
    let handler = container
        .injector("notify")
        .dep("mailer")
        .wrap(|(mailer,): (Option<Arc<Mailer>>,), _: ()| mailer.is_some())
        .unwrap();

    assert_eq!(
        handler.plan().param("mailer").unwrap().kind,
        ParamKind::Required(Key::of::<Mailer>())
    );
    assert!(handler.call(()).unwrap());
}

#[test]
fn test_conventions_follow_original_order() {
    let container = container_with_db();
    let handler = container
        .injector("handler")
        .arg("a")
        .dep("db")
        .arg("user_id")
        .dep("mailer")
        .arg("limit")
        .wrap(
            |(_db, _mailer): (Arc<Database>, Option<Arc<Mailer>>), (a, user_id, limit): (u8, u32, usize)| {
                a as usize + user_id as usize + limit
            },
        )
        .unwrap();

    let conventions: Vec<_> = handler
        .plan()
        .params()
        .iter()
        .map(|param| (param.name, param.convention))
        .collect();
    assert_eq!(
        conventions,
        vec![
            ("a", CallingConvention::PositionalOrKeyword),
            ("db", CallingConvention::PositionalOrKeyword),
            ("user_id", CallingConvention::KeywordOnly),
            ("mailer", CallingConvention::PositionalOrKeyword),
            ("limit", CallingConvention::KeywordOnly),
        ]
    );
    assert_eq!(handler.call((1, 2, 3)).unwrap(), 6);
}

#[test]
fn test_dependencies_resolved_per_call() {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = builds.clone();
    let container = Container::new();
    container
        .add_factory(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Mailer
        })
        .unwrap();

    let handler = container
        .injector("send")
        .dep("mailer")
        .wrap(|_: (Arc<Mailer>,), _: ()| ())
        .unwrap();
    assert_eq!(builds.load(Ordering::SeqCst), 0);

    handler.call(()).unwrap();
    handler.call(()).unwrap();
    assert_eq!(builds.load(Ordering::SeqCst), 2);
}

#[test]
fn test_required_dependency_is_late_bound() {
    let container = Container::new();
    let handler = container
        .injector("handler")
        .dep("db")
        .wrap(|(db,): (Arc<Database>,), _: ()| db.name.clone())
        .unwrap();

    container
        .add_singleton(Database {
            name: "late".to_string(),
        })
        .unwrap();
    assert_eq!(handler.call(()).unwrap(), "late");
}

#[test]
fn test_override_skips_resolution() {
    let container = container_with_db();
    let handler = container
        .injector("handler")
        .dep("db")
        .wrap(|(db,): (Arc<Database>,), _: ()| db.name.clone())
        .unwrap();

    let supplied = Arc::new(Database {
        name: "test".to_string(),
    });
    let name = handler
        .call_with(Overrides::new().with("db", supplied), ())
        .unwrap();
    assert_eq!(name, "test");
    assert_eq!(handler.call(()).unwrap(), "main");
}

#[test]
fn test_override_for_absent_optional() {
    let container = Container::new();
    let handler = container
        .injector("notify")
        .dep("mailer")
        .wrap(|(mailer,): (Option<Arc<Mailer>>,), _: ()| mailer.is_some())
        .unwrap();

    assert!(handler
        .call_with(Overrides::new().with("mailer", Arc::new(Mailer)), ())
        .unwrap());
}

#[test]
fn test_unknown_override_is_rejected() {
    let container = container_with_db();
    let handler = container
        .injector("handler")
        .dep("db")
        .arg("x")
        .wrap(|_: (Arc<Database>,), args: Args| args.x)
        .unwrap();

    let result = handler.call_with(Overrides::new().with("x", Arc::new(1i64)), Args { x: 2 });
    match result {
        Err(DiError::InvalidSignature { callable, reason }) => {
            assert_eq!(callable, "handler");
            assert!(reason.contains('x'));
        }
        other => panic!("Expected InvalidSignature, got {:?}", other),
    }
}

#[test]
fn test_missing_dependency_is_wrapped_with_context() {
    let container = Container::new();
    container.add_singleton(7u8).unwrap();
    let handler = container
        .injector("handler")
        .dep("db")
        .wrap(|_: (Arc<Database>,), _: ()| ())
        .unwrap();

    let err = handler.call(()).unwrap_err();
    match &err {
        DiError::DependencyInjection {
            key,
            param,
            callable,
            cause,
        } => {
            assert_eq!(*key, Key::of::<Database>());
            assert_eq!(*param, "db");
            assert_eq!(*callable, "handler");
            assert!(matches!(**cause, DiError::ProviderNotFound { .. }));
        }
        other => panic!("Expected DependencyInjection, got {:?}", other),
    }
    assert!(matches!(err.root_cause(), DiError::ProviderNotFound { .. }));
    assert!(std::error::Error::source(&err).is_some());
    assert!(err.to_string().contains("parameter 'db' in function 'handler'"));
}

#[test]
fn test_second_parameter_failure_names_that_parameter() {
    let container = container_with_db();
    let handler = container
        .injector("handler")
        .dep("db")
        .dep("mailer")
        .wrap(|_: (Arc<Database>, Arc<Mailer>), _: ()| ())
        .unwrap();

    match handler.call(()) {
        Err(DiError::DependencyInjection { param, key, .. }) => {
            assert_eq!(param, "mailer");
            assert_eq!(key, Key::of::<Mailer>());
        }
        other => panic!("Expected DependencyInjection, got {:?}", other),
    }
}

#[test]
fn test_async_provider_in_sync_call_is_not_wrapped() {
    let container = Container::new();
    container
        .register_async::<Database, _>(Lifetime::Singleton, |_ctx: ResolverContext| async {
            Ok::<_, DiError>(Arc::new(Database {
                name: "async".to_string(),
            }))
        })
        .unwrap();

    let handler = container
        .injector("handler")
        .dep("db")
        .wrap(|_: (Arc<Database>,), _: ()| ())
        .unwrap();

    match handler.call(()) {
        Err(DiError::AsyncProviderInSyncContext { key }) => assert_eq!(key, Key::of::<Database>()),
        other => panic!("Expected AsyncProviderInSyncContext, got {:?}", other),
    }
}

#[test]
fn test_callable_called_in_factory_continues_its_chain() {
    let container = Container::new();
    container.add_singleton(Mailer).unwrap();
    let handle = container.clone();
    container
        .register::<Database, _>(Lifetime::Singleton, move |ctx| {
            let describe = handle
                .injector("describe")
                .dep("mailer")
                .wrap(|_: (Arc<Mailer>,), _: ()| "mailed".to_string())?;
            let name = describe.call_in(ctx, ())?;
            Ok(Arc::new(Database { name }))
        })
        .unwrap();

    assert_eq!(container.resolve::<Database>().unwrap().name, "mailed");
}

#[test]
fn test_callable_needing_its_own_factory_reports_cycle() {
    let container = Container::new();
    let handle = container.clone();
    container
        .register::<Database, _>(Lifetime::Singleton, move |ctx| {
            let describe = handle
                .injector("describe")
                .dep("db")
                .wrap(|(db,): (Arc<Database>,), _: ()| db.name.clone())?;
            let name = describe.call_in(ctx, ())?;
            Ok(Arc::new(Database { name }))
        })
        .unwrap();

    match container.resolve::<Database>() {
        Err(err @ DiError::DependencyInjection { .. }) => {
            assert!(matches!(err, DiError::DependencyInjection { param: "db", callable: "describe", .. }));
            match err.root_cause() {
                DiError::CircularDependency { chain } => {
                    assert_eq!(chain, &vec![Key::of::<Database>(), Key::of::<Database>()]);
                }
                other => panic!("Expected CircularDependency, got {:?}", other),
            }
        }
        other => panic!("Expected DependencyInjection, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_detached_call_in_factory_reports_cycle() {
    let container = Container::new();
    let handle = container.clone();
    container
        .register::<Database, _>(Lifetime::Singleton, move |_ctx| {
            // a plain call starts a new chain on the thread already building Database
            let describe = handle
                .injector("describe")
                .dep("db")
                .wrap(|(db,): (Arc<Database>,), _: ()| db.name.clone())?;
            let name = describe.call(())?;
            Ok(Arc::new(Database { name }))
        })
        .unwrap();

    match container.resolve::<Database>() {
        Err(err) => match err.root_cause() {
            DiError::CircularDependency { chain } => {
                assert_eq!(chain, &vec![Key::of::<Database>(), Key::of::<Database>()]);
            }
            other => panic!("Expected CircularDependency, got {:?}", other),
        },
        Ok(_) => panic!("Expected CircularDependency, resolution succeeded"),
    }

    // the failed build left nothing claimed
    container
        .replace::<Database, _>(Lifetime::Singleton, |_| {
            Ok(Arc::new(Database {
                name: "fixed".to_string(),
            }))
        })
        .unwrap();
    assert_eq!(container.resolve::<Database>().unwrap().name, "fixed");
}

#[tokio::test]
async fn test_async_callable_called_in_factory_reports_cycle() {
    let container = Container::new();
    let handle = container.clone();
    container
        .register_async::<Database, _>(Lifetime::Singleton, move |ctx: ResolverContext| {
            let handle = handle.clone();
            async move {
                let describe = handle
                    .injector("describe")
                    .dep("db")
                    .wrap_async(|(db,): (Arc<Database>,), _: ()| async move { db.name.clone() })?;
                let name = describe.call_in(&ctx, ()).await?;
                Ok::<_, DiError>(Arc::new(Database { name }))
            }
        })
        .unwrap();

    match container.resolve_async::<Database>().await {
        Err(err) => {
            assert!(matches!(err, DiError::DependencyInjection { param: "db", .. }));
            assert!(matches!(err.root_cause(), DiError::CircularDependency { .. }));
        }
        Ok(_) => panic!("Expected a cycle, resolution succeeded"),
    }
}

#[tokio::test]
async fn test_async_callable_accepts_async_providers() {
    let container = Container::new();
    container
        .register_async::<Database, _>(Lifetime::Singleton, |_ctx: ResolverContext| async {
            tokio::task::yield_now().await;
            Ok::<_, DiError>(Arc::new(Database {
                name: "async".to_string(),
            }))
        })
        .unwrap();
    container.add_singleton(Mailer).unwrap();

    let handler = container
        .injector("handler")
        .dep("db")
        .dep("mailer")
        .arg("x")
        .wrap_async(|(db, _mailer): (Arc<Database>, Arc<Mailer>), args: Args| async move {
            format!("{}:{}", db.name, args.x)
        })
        .unwrap();

    assert_eq!(handler.call(Args { x: 1 }).await.unwrap(), "async:1");
    assert_eq!(handler.plan().keyword_only(), vec!["x"]);

    let first = container.resolve_async::<Database>().await.unwrap();
    let second = container.resolve_async::<Database>().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_async_callable_wraps_errors() {
    let container = Container::new();
    let handler = container
        .injector("handler")
        .dep("db")
        .wrap_async(|_: (Arc<Database>,), _: ()| async {})
        .unwrap();

    match handler.call(()).await {
        Err(DiError::DependencyInjection { param, callable, .. }) => {
            assert_eq!(param, "db");
            assert_eq!(callable, "handler");
        }
        other => panic!("Expected DependencyInjection, got {:?}", other),
    }
}

#[test]
fn test_injected_handles_are_cloneable_across_threads() {
    let container = container_with_db();
    let handler = container
        .injector("handler")
        .dep("db")
        .arg("x")
        .wrap(|(db,): (Arc<Database>,), args: Args| db.name.len() as i64 + args.x)
        .unwrap();

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let handler = handler.clone();
            std::thread::spawn(move || handler.call(Args { x: i }).unwrap())
        })
        .collect();

    let results: Vec<i64> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    assert_eq!(results, vec![4, 5, 6, 7]);
}
