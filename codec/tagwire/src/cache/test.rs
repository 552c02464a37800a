use super::*;

#[test]
fn interner_assigns_in_order() {
    let mut interner = Interner::new();

    assert_eq!(interner.assign("a"), 0);
    assert_eq!(interner.assign("b"), 1);
    assert_eq!(interner.assign("c"), 2);

    assert_eq!(interner.get(&"b"), Some(1));
    assert_eq!(interner.get(&"d"), None);
    assert_eq!(interner.len(), 3);
}

#[test]
fn interner_truncation_forgets_the_tail() {
    let mut interner = Interner::new();
    interner.assign("a");
    interner.assign("b");
    interner.assign("c");

    interner.truncate(1);

    assert_eq!(interner.get(&"a"), Some(0));
    assert_eq!(interner.get(&"b"), None);
    assert_eq!(interner.get(&"c"), None);

    // the next index continues from the truncation point
    assert_eq!(interner.assign("z"), 1);

    // truncating past the end is a no-op
    interner.truncate(10);
    assert_eq!(interner.len(), 2);
}

#[test]
fn write_caches_roll_back_to_checkpoint() {
    let mut caches = WriteCaches::default();
    caches.assign_priority(Value::from("kept"));
    caches.assign_struct(("point".to_owned(), 2));

    let checkpoint = caches.checkpoint();

    caches.assign_priority(Value::from("dropped"));
    caches.assign_struct(("line".to_owned(), 2));

    caches.rollback(checkpoint);

    assert_eq!(caches.priority_index(&Value::from("kept")), Some(0));
    assert_eq!(caches.priority_index(&Value::from("dropped")), None);
    assert_eq!(caches.struct_index(&("point".to_owned(), 2)), Some(0));
    assert_eq!(caches.struct_index(&("line".to_owned(), 2)), None);
    assert_eq!(caches.checkpoint(), checkpoint);
}

#[test]
fn struct_key_includes_the_component_count() {
    let mut caches = WriteCaches::default();
    caches.assign_struct(("point".to_owned(), 2));

    assert_eq!(caches.struct_index(&("point".to_owned(), 3)), None);
}

#[test]
fn read_cache_references() {
    let mut caches = ReadCaches::default();

    let index = caches.reserve_priority();
    assert_eq!(
        caches.priority(index).unwrap_err().as_corruption(),
        Some(&Corruption::CacheEntryUnderConstruction(0))
    );

    caches.fill_priority(index, Value::from("hello"));
    assert_eq!(caches.priority(index).unwrap(), &Value::from("hello"));

    assert_eq!(
        caches.priority(5).unwrap_err().as_corruption(),
        Some(&Corruption::CacheIndexOutOfRange { index: 5, len: 1 })
    );

    assert_eq!(
        caches.struct_definition(0).unwrap_err().as_corruption(),
        Some(&Corruption::StructIndexOutOfRange { index: 0, len: 0 })
    );

    caches.define_struct(("point".to_owned(), 2));
    assert_eq!(
        caches.struct_definition(0).unwrap(),
        &("point".to_owned(), 2)
    );

    caches.reset();
    assert!(caches.priority(0).is_err());
    assert!(caches.struct_definition(0).is_err());
}

#[test]
fn single_byte_values_are_never_cached() {
    assert!(!is_cacheable(&Value::Nil));
    assert!(!is_cacheable(&Value::Bool(true)));
    assert!(!is_cacheable(&Value::Int(-1)));
    assert!(!is_cacheable(&Value::Int(63)));
    assert!(!is_cacheable(&Value::Float64(0.0)));
    assert!(!is_cacheable(&Value::Float64(1.0)));
    assert!(!is_cacheable(&Value::from("")));

    assert!(is_cacheable(&Value::Int(64)));
    assert!(is_cacheable(&Value::Float64(-0.0)));
    assert!(is_cacheable(&Value::from("a")));
    assert!(is_cacheable(&Value::List(Vec::new())));
}
