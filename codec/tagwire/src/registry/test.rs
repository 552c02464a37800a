use std::any::{Any, TypeId};

use super::*;
use crate::{reader::Reader, writer::Writer};

#[derive(Debug)]
struct Base(i64);

#[derive(Debug)]
struct Middle {
    base: Base,
}

#[derive(Debug)]
struct Leaf {
    middle: Middle,
}

fn tag_of<T: Any>(registry: &Registry, object: &T) -> Option<String> {
    crate::init_logging();

    registry
        .resolve_write(TypeId::of::<T>(), object)
        .map(|(entry, _)| entry.tag().clone())
}

fn write_base(writer: &mut dyn ObjectWriter, base: &Base) -> Result<()> {
    writer.write_tag("base", 1)?;
    writer.write_int(base.0)
}

#[test]
fn builtin_handlers() {
    let registry = Registry::builtin();

    assert_eq!(tag_of(&registry, &1i64).as_deref(), Some("int"));
    assert_eq!(tag_of(&registry, &u64::MAX).as_deref(), Some("int"));
    assert_eq!(tag_of(&registry, &"text").as_deref(), Some("string"));
    assert_eq!(tag_of(&registry, &Value::Nil).as_deref(), Some("value"));
    assert_eq!(tag_of(&registry, &Base(1)), None);

    assert!(registry.read_handler("point").is_none());
}

#[test]
fn custom_handlers_come_first() {
    let mut write = WriteHandlers::new();
    assert!(write.register::<i64, _>("custom-int", |writer, value| {
        writer.write_string(&value.to_string())
    }));
    let registry = Registry::new(write, ReadHandlers::new());

    assert_eq!(tag_of(&registry, &1i64).as_deref(), Some("custom-int"));
    assert_eq!(tag_of(&registry, &1i32).as_deref(), Some("int"));
}

#[test]
fn duplicate_registrations_are_rejected() {
    let mut write = WriteHandlers::new();
    assert!(write.register::<Base, _>("base", write_base));
    assert!(!write.register::<Base, _>("other", write_base));
    assert_eq!(write.len(), 1);

    let mut read = ReadHandlers::new();
    assert!(read.register_record("point"));
    assert!(!read.register_record("point"));
    assert_eq!(read.len(), 1);
}

#[test]
fn reserved_tags_cannot_be_read_by_custom_handlers() {
    let mut read = ReadHandlers::new();

    for tag in ["int", "string", "list", "map", "set", "bytes", "bigint"] {
        assert!(!read.register_record(tag), "`{tag}` was accepted");
    }
    assert!(read.is_empty());
}

#[test]
fn supertype_is_followed_one_level() {
    let mut write = WriteHandlers::new();
    assert!(write.register::<Base, _>("base", write_base));
    assert!(write.register_supertype::<Middle, Base>(|middle| &middle.base));
    assert!(write.register_supertype::<Leaf, Middle>(|leaf| &leaf.middle));
    assert!(!write.register_supertype::<Leaf, Base>(|leaf| &leaf.middle.base));
    let registry = Registry::new(write, ReadHandlers::new());

    let middle = Middle { base: Base(7) };
    let (entry, object) =
        registry.resolve_write(TypeId::of::<Middle>(), &middle).unwrap();
    assert_eq!(entry.tag(), "base");
    assert_eq!(object.downcast_ref::<Base>().map(|base| base.0), Some(7));

    let leaf = Leaf { middle: Middle { base: Base(8) } };
    assert!(registry.resolve_write(TypeId::of::<Leaf>(), &leaf).is_none());
}

#[test]
fn custom_supertype_comes_before_builtin_handlers() {
    let mut write = WriteHandlers::new();
    assert!(write.register_supertype::<Record, Vec<Value>>(|record| {
        record.components()
    }));
    let registry = Registry::new(write, ReadHandlers::new());

    let record = Record::new("point", vec![Value::from(1), Value::from(2)]);
    assert_eq!(tag_of(&registry, &record).as_deref(), Some("list"));
    assert_eq!(
        tag_of(&Registry::builtin(), &record).as_deref(),
        Some("record")
    );

    // the built-in handlers still answer types without a declaration
    assert_eq!(tag_of(&registry, &1i64).as_deref(), Some("int"));

    let mut writer = Writer::new(Vec::new(), registry);
    writer.write_object(&record).unwrap();
    assert_eq!(writer.finish().unwrap(), [0xE6, 0x01, 0x02]);
}

#[test]
fn custom_supertype_without_a_handler_falls_back() {
    static ZERO: Base = Base(0);

    let mut write = WriteHandlers::new();
    assert!(write.register_supertype::<Middle, Base>(|middle| &middle.base));
    let registry = Registry::new(write, ReadHandlers::new());

    let middle = Middle { base: Base(1) };
    assert_eq!(tag_of(&registry, &middle), None);

    let mut write = WriteHandlers::new();
    assert!(write.register_supertype::<i64, Base>(|_| &ZERO));
    let registry = Registry::new(write, ReadHandlers::new());
    assert_eq!(tag_of(&registry, &1i64).as_deref(), Some("int"));
}

#[test]
fn chain_consults_lookups_in_order() {
    let mut first = ReadHandlers::new();
    assert!(first.register("point", |_, _, _| Ok(Value::from("first"))));

    let mut second = ReadHandlers::new();
    assert!(second.register("point", |_, _, _| Ok(Value::from("second"))));
    assert!(second.register("line", |_, _, _| Ok(Value::from("second"))));

    let registry =
        Registry::new(WriteHandlers::new(), Chain::new(first, second));
    assert!(registry.read_handler("circle").is_none());

    let mut writer = Writer::new(Vec::new(), registry.clone());
    writer.write_value(&Value::Extended(Record::new("point", vec![]))).unwrap();
    writer.write_value(&Value::Extended(Record::new("line", vec![]))).unwrap();
    let bytes = writer.finish().unwrap();

    let mut reader = Reader::new(&bytes[..], registry);
    assert_eq!(reader.read_object().unwrap(), Value::from("first"));
    assert_eq!(reader.read_object().unwrap(), Value::from("second"));
}
