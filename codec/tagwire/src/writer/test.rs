use std::io;

use super::*;
use crate::registry::{ReadHandlers, WriteHandlers};

fn encode<T: Any>(object: &T) -> Vec<u8> {
    crate::init_logging();

    let mut writer = Writer::new(Vec::new(), Registry::default());
    writer.write_object(object).unwrap();
    writer.finish().unwrap()
}

fn custom(write: WriteHandlers) -> Writer<Vec<u8>> {
    crate::init_logging();

    Writer::new(Vec::new(), Registry::new(write, ReadHandlers::new()))
}

struct Bad;

struct Pair(i64, i64);

struct Outer;

struct Inner;

#[test]
fn builtin_scalars() {
    assert_eq!(encode(&5i32), [0x05]);
    assert_eq!(encode(&true), [codes::TRUE]);
    assert_eq!(encode(&()), [codes::NULL]);
    assert_eq!(encode(&1.0f64), [codes::DOUBLE_1]);
    assert_eq!(encode(&None::<Value>), [codes::NULL]);
    assert_eq!(encode(&vec![1u8, 2]), [0xD2, 1, 2]);

    let wide = encode(&u64::MAX);
    assert_eq!(wide[0], codes::BIGINT);
}

#[test]
fn repeated_strings_become_references() {
    let list = Value::List(vec!["hello".into(), "hello".into()]);

    assert_eq!(encode(&list), [
        0xE6,
        codes::PUT_PRIORITY_CACHE,
        0xDF,
        b'h',
        b'e',
        b'l',
        b'l',
        b'o',
        codes::PRIORITY_CACHE_PACKED_START,
    ]);
}

#[test]
fn string_caching_follows_options() {
    let list = Value::List(vec!["abc".into(), "abc".into()]);

    let mut writer =
        Writer::with_options(Vec::new(), Registry::default(), WriterOptions {
            cache_strings: false,
            ..WriterOptions::default()
        });
    writer.write_value(&list).unwrap();
    assert_eq!(writer.finish().unwrap(), [
        0xE6, 0xDD, b'a', b'b', b'c', 0xDD, b'a', b'b', b'c'
    ]);

    let mut writer =
        Writer::with_options(Vec::new(), Registry::default(), WriterOptions {
            min_cached_string_len: 4,
            ..WriterOptions::default()
        });
    writer.write_value(&list).unwrap();
    assert!(!writer.finish().unwrap().contains(&codes::PUT_PRIORITY_CACHE));
}

#[test]
fn repeated_structures_use_the_struct_cache() {
    let point = Record::new("point", vec![1.into(), 2.into()]);

    let mut writer = Writer::new(Vec::new(), Registry::default());
    writer.write_object(&point).unwrap();
    writer.write_object(&Record::new("point", vec![3.into(), 4.into()])).unwrap();

    assert_eq!(writer.finish().unwrap(), [
        codes::STRUCTTYPE,
        0xDF,
        b'p',
        b'o',
        b'i',
        b'n',
        b't',
        0x02,
        0x01,
        0x02,
        codes::STRUCT_CACHE_PACKED_START,
        0x03,
        0x04,
    ]);
}

#[test]
fn unsupported_type_writes_nothing() {
    let mut writer = Writer::new(Vec::new(), Registry::default());

    let error = writer.write_object(&Bad).unwrap_err();
    assert!(matches!(error, Error::UnsupportedType { .. }));
    assert!(!writer.is_closed());

    assert!(writer.finish().unwrap().is_empty());
}

#[test]
fn arity_mismatch_rolls_back_the_object() {
    let mut write = WriteHandlers::new();
    assert!(write.register("bad", |writer: &mut dyn ObjectWriter, _: &Bad| {
        writer.write_tag("bad", 2)?;
        writer.write_string("shared")
    }));

    let mut writer = custom(write);

    let error = writer.write_object(&Bad).unwrap_err();
    assert!(matches!(
        error,
        Error::ArityMismatch { ref tag, declared: 2, written: 1 } if tag == "bad"
    ));

    // the string cached by the failed object is forgotten
    writer.write_object(&"shared").unwrap();
    assert_eq!(writer.finish().unwrap(), [
        codes::PUT_PRIORITY_CACHE,
        0xE0,
        b's',
        b'h',
        b'a',
        b'r',
        b'e',
        b'd',
    ]);
}

#[test]
fn ignored_nested_failure_rolls_back_the_object() {
    let mut write = WriteHandlers::new();
    assert!(write.register("outer", |writer: &mut dyn ObjectWriter, _: &Outer| {
        writer.write_tag("outer", 1)?;
        let _ = writer.write_object(&Inner);
        Ok(())
    }));
    assert!(write.register("inner", |writer: &mut dyn ObjectWriter, _: &Inner| {
        writer.write_tag("inner", 2)?;
        writer.write_int(7)
    }));
    assert!(write.register("unbalanced", |writer: &mut dyn ObjectWriter, _: &Bad| {
        let _ = writer.end_list();
        writer.write_nil()
    }));

    let mut writer = custom(write);

    assert!(matches!(
        writer.write_object(&Outer),
        Err(Error::HandlerMisuse(_))
    ));
    assert!(matches!(writer.write_object(&Bad), Err(Error::HandlerMisuse(_))));
    assert!(!writer.is_closed());

    // nothing of the failed objects reached the sink
    writer.write_object(&42).unwrap();
    assert_eq!(writer.finish().unwrap(), [0x2A]);
}

#[test]
fn untagged_handler_writes_exactly_one_value() {
    let mut write = WriteHandlers::new();
    assert!(write.register("pair", |writer: &mut dyn ObjectWriter, pair: &Pair| {
        writer.write_int(pair.0)?;
        writer.write_int(pair.1)
    }));

    let mut writer = custom(write);

    let error = writer.write_object(&Pair(1, 2)).unwrap_err();
    assert!(matches!(error, Error::ArityMismatch {
        declared: 1,
        written: 2,
        ..
    }));
}

#[test]
fn handler_protocol_violations() {
    let mut write = WriteHandlers::new();
    assert!(write.register("twice", |writer: &mut dyn ObjectWriter, _: &Bad| {
        writer.write_tag("twice", 0)?;
        writer.write_tag("twice", 0)
    }));
    assert!(write.register("late", |writer: &mut dyn ObjectWriter, _: &Pair| {
        writer.write_int(0)?;
        writer.write_tag("late", 0)
    }));
    assert!(write.register("reserved", |writer: &mut dyn ObjectWriter, _: &u8| {
        writer.write_tag("map", 0)
    }));

    let mut writer = custom(write);

    for error in [
        writer.write_object(&Bad).unwrap_err(),
        writer.write_object(&Pair(0, 0)).unwrap_err(),
        writer.write_object(&0u8).unwrap_err(),
    ] {
        assert!(matches!(error, Error::HandlerMisuse(_)), "{error:?}");
    }

    assert!(writer.finish().unwrap().is_empty());
}

#[test]
fn custom_handler_overrides_builtin() {
    let mut write = WriteHandlers::new();
    assert!(write.register("loud", |writer: &mut dyn ObjectWriter, value: &bool| {
        writer.write_string(if *value { "YES" } else { "NO" })
    }));

    let mut writer = Writer::with_options(
        Vec::new(),
        Registry::new(write, ReadHandlers::new()),
        WriterOptions { cache_strings: false, ..WriterOptions::default() },
    );
    writer.write_object(&true).unwrap();

    assert_eq!(writer.finish().unwrap(), [0xDD, b'Y', b'E', b'S']);
}

#[test]
fn streamed_list_counts_as_one_component() {
    let mut write = WriteHandlers::new();
    assert!(write.register("seq", |writer: &mut dyn ObjectWriter, pair: &Pair| {
        writer.write_tag("seq", 1)?;
        writer.begin_closed_list()?;
        for value in pair.0..pair.1 {
            writer.write_int(value)?;
        }
        writer.end_list()
    }));
    assert!(write.register("open", |writer: &mut dyn ObjectWriter, _: &Bad| {
        writer.begin_open_list()?;
        writer.write_nil()
    }));

    let mut writer = custom(write);
    writer.write_object(&Pair(1, 4)).unwrap();

    let error = writer.write_object(&Bad).unwrap_err();
    assert!(matches!(error, Error::HandlerMisuse(_)));

    assert_eq!(writer.finish().unwrap(), [
        codes::STRUCTTYPE,
        0xDD,
        b's',
        b'e',
        b'q',
        0x01,
        codes::BEGIN_CLOSED_LIST,
        0x01,
        0x02,
        0x03,
        codes::END_COLLECTION,
    ]);
}

#[test]
fn nested_objects_dispatch_through_the_registry() {
    let mut write = WriteHandlers::new();
    assert!(write.register("pair", |writer: &mut dyn ObjectWriter, pair: &Pair| {
        writer.write_tag("pair", 2)?;
        writer.write_object(&pair.0)?;
        writer.write_object(&Record::new("inner", vec![pair.1.into()]))
    }));

    let mut writer = custom(write);
    writer.write_object(&Pair(7, 8)).unwrap();

    let bytes = writer.finish().unwrap();
    assert_eq!(bytes[0], codes::STRUCTTYPE);
    assert_eq!(bytes.last(), Some(&0x08));
}

#[test]
fn footer_closes_the_session() {
    let mut writer = Writer::new(Vec::new(), Registry::default());
    writer.write_object(&"hello").unwrap();
    writer.write_footer().unwrap();

    assert!(writer.is_closed());
    assert!(matches!(writer.write_object(&1), Err(Error::SessionClosed)));
    assert!(matches!(writer.write_footer(), Err(Error::SessionClosed)));

    let bytes = writer.finish().unwrap();
    let (body, footer) = bytes.split_at(bytes.len() - 12);

    assert_eq!(&footer[..4], &codes::FOOTER_MAGIC.to_be_bytes());
    assert_eq!(&footer[4..8], &(body.len() as u32).to_be_bytes());
    assert_eq!(
        &footer[8..],
        &xxhash_rust::xxh32::xxh32(body, 0).to_be_bytes()
    );
}

#[test]
fn reset_caches_forgets_entries() {
    let mut writer = Writer::new(Vec::new(), Registry::default());
    writer.write_object(&"abc").unwrap();
    writer.reset_caches().unwrap();
    writer.write_object(&"abc").unwrap();

    assert_eq!(writer.finish().unwrap(), [
        codes::PUT_PRIORITY_CACHE,
        0xDD,
        b'a',
        b'b',
        b'c',
        codes::RESET_CACHES,
        codes::PUT_PRIORITY_CACHE,
        0xDD,
        b'a',
        b'b',
        b'c',
    ]);
}

struct BrokenSink;

impl io::Write for BrokenSink {
    fn write(&mut self, _: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken"))
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

#[test]
fn io_failure_closes_the_session() {
    let mut writer = Writer::new(BrokenSink, Registry::default());

    assert!(matches!(writer.write_object(&1), Err(Error::Io(_))));
    assert!(writer.is_closed());
    assert!(matches!(writer.write_object(&1), Err(Error::SessionClosed)));
}
