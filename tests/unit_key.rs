//! Unit tests for Key construction, equality and display

use ferrous_ioc::{key_of_type, Key};
use std::any::TypeId;
use std::collections::{HashMap, HashSet};

trait Logger: Send + Sync {}

#[test]
fn test_key_display_name_type() {
    let key = Key::Type(TypeId::of::<String>(), "alloc::string::String");
    assert_eq!(key.display_name(), "alloc::string::String");
    assert_eq!(key.to_string(), "alloc::string::String");
}

#[test]
fn test_key_display_name_named() {
    let key = Key::Named(TypeId::of::<u32>(), "u32", "database_port");
    assert_eq!(key.display_name(), "u32");
    assert_eq!(key.service_name(), Some("database_port"));
    assert_eq!(key.to_string(), "u32[database_port]");
}

#[test]
fn test_key_of_matches_manual_construction() {
    assert_eq!(Key::of::<String>(), Key::Type(TypeId::of::<String>(), "alloc::string::String"));
    assert_eq!(key_of_type::<String>(), Key::of::<String>());
    assert_eq!(Key::of::<String>().type_id(), TypeId::of::<String>());
}

#[test]
fn test_trait_object_keys() {
    let key = Key::of::<dyn Logger>();
    assert!(key.display_name().contains("Logger"));
    assert_eq!(key.type_id(), TypeId::of::<dyn Logger>());
    assert_ne!(key, Key::of::<String>());
}

#[test]
fn test_equality_ignores_display_name() {
    let a = Key::Type(TypeId::of::<u8>(), "u8");
    let b = Key::Type(TypeId::of::<u8>(), "a friendlier name");
    assert_eq!(a, b);

    let mut set = HashSet::new();
    set.insert(a);
    assert!(set.contains(&b));
}

#[test]
fn test_named_keys_compare_by_name() {
    assert_eq!(Key::named::<u32>("http"), Key::named::<u32>("http"));
    assert_ne!(Key::named::<u32>("http"), Key::named::<u32>("https"));
    assert_ne!(Key::named::<u32>("http"), Key::of::<u32>());
    assert_ne!(Key::named::<u32>("http"), Key::named::<u64>("http"));
    assert_eq!(Key::of::<u32>().service_name(), None);
}

#[test]
fn test_keys_as_map_keys() {
    let mut map = HashMap::new();
    map.insert(Key::of::<u32>(), "plain");
    map.insert(Key::named::<u32>("port"), "named");
    map.insert(Key::of::<dyn Logger>(), "trait");

    assert_eq!(map.len(), 3);
    assert_eq!(map[&Key::of::<u32>()], "plain");
    assert_eq!(map[&Key::named::<u32>("port")], "named");
    assert_eq!(map[&Key::of::<dyn Logger>()], "trait");
}

#[test]
fn test_keys_are_copy() {
    let key = Key::named::<String>("greeting");
    let copy = key;
    assert_eq!(key, copy);
    assert_eq!(format!("{:?}", key), format!("{:?}", copy));
}
