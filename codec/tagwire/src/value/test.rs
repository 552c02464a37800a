use std::collections::{BTreeMap, BTreeSet, HashSet};

use proptest::{prop_assert, prop_assert_eq, proptest};

use super::*;

#[test]
fn floats_compare_by_bits() {
    assert_eq!(Value::Float64(f64::NAN), Value::Float64(f64::NAN));
    assert_ne!(Value::Float64(0.0), Value::Float64(-0.0));
    assert_ne!(Value::Float32(1.0), Value::Float64(1.0));

    let mut set = HashSet::new();
    set.insert(Value::Float64(f64::NAN));
    assert!(set.contains(&Value::Float64(f64::NAN)));
}

#[test]
fn conversions_pick_the_narrowest_variant() {
    assert_eq!(Value::from(42u8), Value::Int(42));
    assert_eq!(Value::from(-7i32), Value::Int(-7));
    assert_eq!(Value::from(i64::MAX as u64), Value::Int(i64::MAX));
    assert_eq!(
        Value::from(u64::MAX),
        Value::BigInt(BigInt::from(i128::from(u64::MAX)))
    );
    assert_eq!(Value::from(i128::from(i64::MIN)), Value::Int(i64::MIN));
    assert_eq!(Value::from(None::<i32>), Value::Nil);
    assert_eq!(Value::from(Some("x")), Value::String("x".to_owned()));
    assert_eq!(Value::from(()), Value::Nil);

    let list: Value = [1, 2, 3].into_iter().map(Value::from).collect();
    assert_eq!(
        list,
        Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
}

#[test]
fn values_are_map_keys() {
    let mut map = BTreeMap::new();
    map.insert(Value::from("a"), Value::from(1));
    map.insert(Value::Nil, Value::from(2));
    map.insert(Value::List(vec![Value::from(1)]), Value::from(3));

    let set: BTreeSet<_> = map.keys().cloned().collect();
    let value = Value::Map(map);

    assert_eq!(value.as_map().unwrap().len(), 3);
    assert!(set.contains(&Value::Nil));
    assert_eq!(value.kind(), "map");
}

#[test]
fn record_parts() {
    let record = Record::new("point", vec![Value::from(1), Value::from(2)]);

    assert_eq!(record.tag(), "point");
    assert_eq!(record.components().len(), 2);

    let (tag, components) = record.into_parts();
    assert_eq!(tag, "point");
    assert_eq!(components, vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn big_int_normalizes() {
    assert_eq!(BigInt::from_signed_bytes_be(&[]).to_signed_bytes_be(), &[0]);
    assert_eq!(
        BigInt::from_signed_bytes_be(&[0, 0, 0x7F]).to_signed_bytes_be(),
        &[0x7F]
    );
    assert_eq!(
        BigInt::from_signed_bytes_be(&[0xFF, 0xFF, 0x80]).to_signed_bytes_be(),
        &[0x80]
    );
    assert_eq!(
        BigInt::from_signed_bytes_be(&[0x00, 0x80]).to_signed_bytes_be(),
        &[0x00, 0x80]
    );

    assert_eq!(BigInt::from(128i128).to_i64(), Some(128));
    assert_eq!(BigInt::from(-129i128).to_i64(), Some(-129));
    assert_eq!(BigInt::from(u128::MAX).to_i128(), None);
    assert_eq!(BigInt::from(u128::MAX).to_signed_bytes_be().len(), 17);
    assert_eq!(BigInt::from(-5i128).to_string(), "-5");
}

proptest! {
    #[test]
    fn big_int_round_trips_i128(value: i128) {
        prop_assert_eq!(BigInt::from(value).to_i128(), Some(value));
    }

    #[test]
    fn big_int_order_is_numeric(a: i128, b: i128) {
        prop_assert_eq!(BigInt::from(a).cmp(&BigInt::from(b)), a.cmp(&b));
    }

    #[test]
    fn value_order_is_consistent_with_equality(a: Value, b: Value) {
        prop_assert_eq!(a == b, a.cmp(&b) == Ordering::Equal);
        prop_assert!(a == a.clone());
    }
}
