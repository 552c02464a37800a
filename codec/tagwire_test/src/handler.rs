//! Tests for custom write and read handlers.

use tagwire::{
    Corruption, Error, ObjectReader, ObjectWriter, ReadHandlers, Record,
    Registry, Value, WriteHandlers,
};

mod common;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Point {
    x: i64,
    y: i64,
}

#[derive(Debug, Clone, Copy)]
struct Line {
    from: Point,
    to: Point,
}

#[derive(Debug, Clone)]
struct Labeled {
    point: Point,
    #[allow(dead_code)]
    label: String,
}

fn write_point(
    writer: &mut dyn ObjectWriter,
    point: &Point,
) -> tagwire::Result<()> {
    writer.write_tag("point", 2)?;
    writer.write_int(point.x)?;
    writer.write_int(point.y)
}

fn read_point(
    reader: &mut dyn ObjectReader,
    tag: &str,
    _: usize,
) -> tagwire::Result<Value> {
    let x = reader.read_int()?;
    let y = reader.read_int()?;

    Ok(Value::Extended(Record::new(tag, vec![x.into(), y.into()])))
}

fn write_handlers() -> WriteHandlers {
    let mut write = WriteHandlers::new();

    assert!(write.register::<Point, _>("point", write_point));
    assert!(write.register::<Line, _>("line", |writer, line| {
        writer.write_tag("line", 2)?;
        writer.write_object(&line.from)?;
        writer.write_object(&line.to)
    }));
    assert!(
        write.register_supertype::<Labeled, Point>(|labeled| &labeled.point)
    );

    write
}

fn registry() -> Registry {
    let mut read = ReadHandlers::new();
    assert!(read.register("point", read_point));
    assert!(read.register_record("line"));

    Registry::new(write_handlers(), read)
}

fn point_value(x: i64, y: i64) -> Value {
    Value::Extended(Record::new("point", vec![x.into(), y.into()]))
}

#[test]
fn custom_types_round_trip() {
    common::init_logging();

    let registry = registry();

    let line = Line { from: Point { x: 0, y: 0 }, to: Point { x: 3, y: 4 } };

    let mut writer = tagwire::create_writer(Vec::new(), registry.clone());
    writer.write_object(&Point { x: 1, y: -2 }).unwrap();
    writer.write_object(&line).unwrap();
    writer.write_object(&Point { x: 5, y: 6 }).unwrap();
    writer.write_footer().unwrap();
    let bytes = writer.finish().unwrap();

    let mut reader = tagwire::create_reader(&bytes[..], registry, true);
    assert_eq!(tagwire::read_batch(&mut reader).unwrap(), vec![
        point_value(1, -2),
        Value::Extended(Record::new("line", vec![
            point_value(0, 0),
            point_value(3, 4),
        ])),
        point_value(5, 6),
    ]);
    reader.validate_footer().unwrap();
}

#[test]
fn reader_without_the_handler() {
    common::init_logging();

    let mut writer = tagwire::create_writer(Vec::new(), registry());
    writer.write_object(&Point { x: 1, y: 2 }).unwrap();
    let bytes = writer.finish().unwrap();

    let mut reader =
        tagwire::create_reader(&bytes[..], Registry::default(), false);
    assert!(matches!(
        reader.read_object(),
        Err(Error::StreamCorrupt(Corruption::UnknownTag(tag))) if tag == "point"
    ));
    assert!(matches!(reader.read_object(), Err(Error::SessionClosed)));
}

#[test]
fn writer_without_the_handler() {
    common::init_logging();

    let mut writer =
        tagwire::create_writer(Vec::new(), Registry::default());

    assert!(matches!(
        writer.write_object(&Point { x: 1, y: 2 }),
        Err(Error::UnsupportedType { .. })
    ));
    assert!(!writer.is_closed());
    assert!(writer.sink().is_empty());
}

#[test]
fn subtype_uses_the_supertype_handler() {
    common::init_logging();

    let registry = registry();
    let labeled =
        Labeled { point: Point { x: 9, y: 10 }, label: "origin".to_owned() };

    let mut writer = tagwire::create_writer(Vec::new(), registry.clone());
    writer.write_object(&labeled).unwrap();
    let bytes = writer.finish().unwrap();

    let mut reader = tagwire::create_reader(&bytes[..], registry, false);
    assert_eq!(reader.read_object().unwrap(), point_value(9, 10));
}

#[test]
fn custom_handler_overrides_a_builtin() {
    common::init_logging();

    let mut write = WriteHandlers::new();
    assert!(write.register::<bool, _>("yes-no", |writer, value| {
        writer.write_string(if *value { "yes" } else { "no" })
    }));
    let registry = Registry::new(write, ReadHandlers::new());

    let mut writer = tagwire::create_writer(Vec::new(), registry.clone());
    writer.write_object(&true).unwrap();
    writer.write_object(&1i64).unwrap();
    let bytes = writer.finish().unwrap();

    let mut reader = tagwire::create_reader(&bytes[..], registry, false);
    assert_eq!(tagwire::read_batch(&mut reader).unwrap(), vec![
        Value::from("yes"),
        Value::from(1),
    ]);
}

#[test]
fn component_counts_are_enforced() {
    common::init_logging();

    let mut write = WriteHandlers::new();
    assert!(write.register::<Point, _>("point", |writer, point| {
        writer.write_tag("point", 3)?;
        writer.write_int(point.x)?;
        writer.write_int(point.y)
    }));
    let registry = Registry::new(write, ReadHandlers::new());

    let mut writer = tagwire::create_writer(Vec::new(), registry);
    assert!(matches!(
        writer.write_object(&Point { x: 1, y: 2 }),
        Err(Error::ArityMismatch { declared: 3, written: 2, .. })
    ));
    assert!(writer.sink().is_empty());

    // a reader handler consuming less than declared
    let mut read = ReadHandlers::new();
    assert!(read.register("point", |reader, tag, _| {
        let x = reader.read_int()?;
        Ok(Value::Extended(Record::new(tag, vec![x.into()])))
    }));
    let registry = Registry::new(write_handlers(), read);

    let mut writer = tagwire::create_writer(Vec::new(), registry.clone());
    writer.write_object(&Point { x: 1, y: 2 }).unwrap();
    let bytes = writer.finish().unwrap();

    let mut reader = tagwire::create_reader(&bytes[..], registry, false);
    assert!(matches!(
        reader.read_object(),
        Err(Error::StreamCorrupt(Corruption::ArityMismatch {
            declared: 2,
            consumed: 1,
            ..
        }))
    ));
}

#[test]
fn dropped_nested_errors_fail_the_object() {
    common::init_logging();

    // the line handler swallows the failure of its second point
    let mut write = WriteHandlers::new();
    assert!(write.register::<Point, _>("point", |writer, point| {
        writer.write_tag("point", 2)?;
        writer.write_int(point.x)?;
        if point.y >= 0 {
            writer.write_int(point.y)?;
        }
        Ok(())
    }));
    assert!(write.register::<Line, _>("line", |writer, line| {
        writer.write_tag("line", 2)?;
        writer.write_object(&line.from)?;
        let _ = writer.write_object(&line.to);
        Ok(())
    }));
    let partial = Registry::new(write, ReadHandlers::new());

    let line = Line { from: Point { x: 0, y: 0 }, to: Point { x: 1, y: -1 } };

    let mut writer = tagwire::create_writer(Vec::new(), partial);
    assert!(matches!(
        writer.write_object(&line),
        Err(Error::HandlerMisuse(_))
    ));
    writer.write_object(&42).unwrap();
    writer.write_footer().unwrap();
    let bytes = writer.finish().unwrap();

    let mut reader = tagwire::create_reader(&bytes[..], registry(), true);
    assert_eq!(tagwire::read_batch(&mut reader).unwrap(), [Value::from(42)]);
    reader.validate_footer().unwrap();
}
