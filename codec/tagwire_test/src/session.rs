//! Tests for whole writing and reading sessions.

use std::collections::{BTreeMap, BTreeSet};

use proptest::{
    arbitrary::any, collection::vec, prop_assert_eq, prop_oneof, proptest,
    strategy::Strategy,
};
use tagwire::{
    ReadHandlers, ReaderOptions, Record, Registry, Snapshot, Value,
    WriteHandlers,
};

mod common;

fn sample() -> Vec<Value> {
    let mut map = BTreeMap::new();
    map.insert(Value::from("name"), Value::from("tagwire"));
    map.insert(Value::from("version"), Value::from(1));

    let set = [1, 2, 3].into_iter().map(Value::from).collect::<BTreeSet<_>>();

    vec![
        Value::Nil,
        Value::from(true),
        Value::from(-1),
        Value::from(i64::MAX),
        Value::from(u64::MAX),
        Value::Float32(1.5),
        Value::from(0.1),
        Value::from(vec![0u8; 70_000]),
        Value::from("x".repeat(70_000)),
        Value::Map(map),
        Value::Set(set),
        Value::Extended(Record::new("point", vec![1.into(), 2.into()])),
    ]
}

#[test]
fn round_trip_with_footer() {
    common::init_logging();

    let values = sample();

    let mut writer = tagwire::create_writer(Vec::new(), Registry::default());
    for value in &values {
        writer.write_value(value).unwrap();
    }
    writer.write_footer().unwrap();
    assert!(writer.is_closed());
    let bytes = writer.finish().unwrap();

    let mut reader =
        tagwire::create_reader(&bytes[..], Registry::builtin(), true);
    let mut read = ReadHandlers::new();
    assert!(read.register_record("point"));
    let registry = Registry::new(WriteHandlers::new(), read);
    let mut lenient = tagwire::create_reader(&bytes[..], registry, true);

    // the built-in registry knows no `point`
    for value in &values[..values.len() - 1] {
        assert_eq!(&reader.read_object().unwrap(), value);
    }
    assert!(reader.read_object().is_err());

    assert_eq!(tagwire::read_batch(&mut lenient).unwrap(), values);
    lenient.validate_footer().unwrap();
}

#[test]
fn empty_stream() {
    common::init_logging();

    let mut reader =
        tagwire::create_reader(&[][..], Registry::default(), true);

    assert!(tagwire::read_batch(&mut reader).unwrap().is_empty());
    assert!(reader.read_object().unwrap_err().is_end_of_stream());
}

#[test]
fn repeated_values_are_references() {
    common::init_logging();

    let mut writer = tagwire::create_writer(Vec::new(), Registry::default());
    writer.write_object(&"a string worth caching").unwrap();
    let first = writer.sink().len();
    writer.write_object(&"a string worth caching").unwrap();
    let second = writer.sink().len() - first;
    let bytes = writer.finish().unwrap();

    assert_eq!(second, 1);

    let mut reader =
        tagwire::create_reader(&bytes[..], Registry::default(), false);
    let values = tagwire::read_batch(&mut reader).unwrap();
    assert_eq!(values, vec![Value::from("a string worth caching"); 2]);
}

#[test]
fn reset_caches_between_objects() {
    common::init_logging();

    let mut writer = tagwire::create_writer(Vec::new(), Registry::default());
    writer.write_object(&"cached").unwrap();
    writer.reset_caches().unwrap();
    writer.write_object(&"cached").unwrap();
    let bytes = writer.finish().unwrap();

    let mut reader =
        tagwire::create_reader(&bytes[..], Registry::default(), false);
    assert_eq!(
        tagwire::read_batch(&mut reader).unwrap(),
        vec![Value::from("cached"); 2]
    );
}

#[test]
fn snapshot_can_be_read_again() {
    common::init_logging();

    let mut writer = tagwire::create_writer(Vec::new(), Registry::default());
    writer.write_object(&vec![Value::from(1), Value::from("one")]).unwrap();
    writer.write_footer().unwrap();
    let snapshot = Snapshot::with_options(
        writer.finish().unwrap(),
        Registry::default(),
        ReaderOptions { expect_footer: true, ..ReaderOptions::default() },
    );

    let first = snapshot.iter().collect::<Result<Vec<_>, _>>().unwrap();
    let second = snapshot.iter().collect::<Result<Vec<_>, _>>().unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
}

fn simple_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[a-z]{0,10}".prop_map(Value::from),
        vec(any::<u8>(), 0..16).prop_map(Value::from),
    ]
}

proptest! {
    #[test]
    fn batches_round_trip(values in vec(simple_value(), 0..32)) {
        let mut writer =
            tagwire::create_writer(Vec::new(), Registry::default());
        for value in &values {
            writer.write_value(value).unwrap();
        }
        writer.write_footer().unwrap();
        let bytes = writer.finish().unwrap();

        let mut reader =
            tagwire::create_reader(&bytes[..], Registry::default(), true);

        prop_assert_eq!(tagwire::read_batch(&mut reader).unwrap(), values);
        prop_assert_eq!(reader.validate_footer().is_ok(), true);
    }
}
