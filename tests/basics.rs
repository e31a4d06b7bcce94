use ferrous_ioc::{autowire, Container, DiError, Key, Lifetime, Resolver, ResolverCore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Config {
    port: u16,
}

struct Server {
    config: Arc<Config>,
}
autowire!(Server { config: Arc<Config> });

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

struct English;
impl Greeter for English {
    fn greet(&self) -> String {
        "hello".to_string()
    }
}

#[test]
fn test_end_to_end_config_and_server() {
    let container = Container::new();
    container
        .register::<Config, _>(Lifetime::Singleton, |_| Ok(Arc::new(Config { port: 8080 })))
        .unwrap();
    container.add_autowired::<Server>(Lifetime::Singleton).unwrap();

    let first = container.resolve::<Server>().unwrap();
    let second = container.resolve::<Server>().unwrap();

    assert_eq!(first.config.port, 8080);
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_singleton_factory_is_lazy_and_built_once() {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = builds.clone();
    let container = Container::new();
    container
        .add_singleton_factory(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Config { port: 1 }
        })
        .unwrap();

    assert_eq!(builds.load(Ordering::SeqCst), 0);
    let a = container.resolve::<Config>().unwrap();
    let b = container.resolve::<Config>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[test]
fn test_factory_returns_distinct_instances() {
    let container = Container::new();
    container.add_factory(|_| Config { port: 2 }).unwrap();

    let a = container.resolve::<Config>().unwrap();
    let b = container.resolve::<Config>().unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(a.port, b.port);
}

#[test]
fn test_factory_dependencies_resolve_transitively() {
    let container = Container::new();
    container.add_singleton(Config { port: 3000 }).unwrap();
    container
        .add_factory(|ctx| Server {
            config: ctx.resolve::<Config>().unwrap(),
        })
        .unwrap();

    let a = container.resolve::<Server>().unwrap();
    let b = container.resolve::<Server>().unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a.config, &b.config));
}

#[test]
fn test_unregistered_key_lists_available() {
    let container = Container::new();
    container.add_singleton(Config { port: 1 }).unwrap();
    container.add_singleton(7u8).unwrap();

    match container.resolve::<Server>() {
        Err(DiError::ProviderNotFound { key, available }) => {
            assert_eq!(key, Key::of::<Server>());
            assert_eq!(available, vec![Key::of::<Config>(), Key::of::<u8>()]);
        }
        other => panic!("Expected ProviderNotFound, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_has_and_keys() {
    let container = Container::new();
    assert!(!container.has::<Config>());
    assert!(container.keys().is_empty());

    container.add_singleton(Config { port: 1 }).unwrap();
    assert!(container.has::<Config>());
    assert!(container.has_key(&Key::of::<Config>()));
    assert_eq!(container.keys(), vec![Key::of::<Config>()]);
}

#[test]
fn test_lookup_reports_provider_shape() {
    let container = Container::new();
    container.add_resource(|_| Config { port: 1 }).unwrap();

    let provider = container.lookup(&Key::of::<Config>()).unwrap();
    assert_eq!(provider.lifetime(), Lifetime::Resource);
    assert!(!provider.is_async());
    assert!(!provider.is_instantiated());

    container.acquire::<Config>().unwrap();
    assert!(provider.is_instantiated());

    assert!(matches!(
        container.lookup(&Key::of::<Server>()),
        Err(DiError::ProviderNotFound { .. })
    ));
}

#[test]
fn test_resolve_optional() {
    let container = Container::new();
    assert!(container.resolve_optional::<Config>().unwrap().is_none());

    container.add_singleton(Config { port: 5 }).unwrap();
    assert_eq!(container.resolve_optional::<Config>().unwrap().unwrap().port, 5);
}

#[test]
fn test_resolve_optional_still_reports_failures() {
    let container = Container::new();
    container
        .register::<Config, _>(Lifetime::Singleton, |_| Err(DiError::construction::<Config>("no file")))
        .unwrap();

    assert!(matches!(
        container.resolve_optional::<Config>(),
        Err(DiError::Construction { .. })
    ));
}

#[test]
fn test_alias_shares_singleton_instance() {
    let container = Container::new();
    container.add_singleton(Config { port: 9 }).unwrap();
    container
        .alias_key(Key::named::<Config>("primary"), Key::of::<Config>())
        .unwrap();

    let direct = container.resolve::<Config>().unwrap();
    let aliased = container.resolve_named::<Config>("primary").unwrap();
    assert!(Arc::ptr_eq(&direct, &aliased));
}

#[test]
fn test_alias_exposes_concrete_type_as_trait() {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = builds.clone();
    let container = Container::new();
    container
        .add_singleton_factory(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            English
        })
        .unwrap();
    container
        .alias::<dyn Greeter, English, _>(|english| english as Arc<dyn Greeter>)
        .unwrap();

    let greeter = container.resolve::<dyn Greeter>().unwrap();
    let english = container.resolve::<English>().unwrap();
    assert_eq!(greeter.greet(), "hello");
    assert_eq!(builds.load(Ordering::SeqCst), 1);
    // same allocation behind both handles
    assert_eq!(
        Arc::as_ptr(&greeter) as *const u8,
        Arc::as_ptr(&english) as *const u8
    );
}

#[test]
fn test_alias_to_unregistered_target_fails() {
    let container = Container::new();
    let result = container.alias_key(Key::named::<Config>("primary"), Key::of::<Config>());
    assert!(matches!(result, Err(DiError::ProviderNotFound { .. })));
    assert!(!container.has_key(&Key::named::<Config>("primary")));
}

#[test]
fn test_alias_of_alias() {
    let container = Container::new();
    container.add_singleton(English).unwrap();
    container
        .alias::<dyn Greeter, English, _>(|english| english as Arc<dyn Greeter>)
        .unwrap();
    container
        .alias_key(Key::named::<dyn Greeter>("default"), Key::of::<dyn Greeter>())
        .unwrap();

    let greeter = container.resolve_named::<dyn Greeter>("default").unwrap();
    assert_eq!(greeter.greet(), "hello");
}

#[test]
fn test_alias_without_cast_between_types_is_a_mismatch() {
    let container = Container::new();
    container.add_singleton(English).unwrap();
    container
        .alias_key(Key::of::<dyn Greeter>(), Key::of::<English>())
        .unwrap();

    assert!(matches!(
        container.resolve::<dyn Greeter>(),
        Err(DiError::TypeMismatch(_))
    ));
}

#[test]
fn test_replace_overrides_existing_provider() {
    let container = Container::new();
    container.add_singleton(Config { port: 1 }).unwrap();
    container
        .replace::<Config, _>(Lifetime::Singleton, |_| Ok(Arc::new(Config { port: 2 })))
        .unwrap();

    assert_eq!(container.resolve::<Config>().unwrap().port, 2);
    assert_eq!(container.keys().len(), 1);
}

#[test]
fn test_clones_share_registry() {
    let container = Container::new();
    let handle = container.clone();
    handle.add_singleton(Config { port: 4 }).unwrap();

    assert_eq!(container.resolve::<Config>().unwrap().port, 4);
}
