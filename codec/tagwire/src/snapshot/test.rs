use super::*;
use crate::{
    error::{Corruption, Error},
    writer::Writer,
};

fn encode(values: &[Value]) -> Vec<u8> {
    crate::init_logging();

    let mut writer = Writer::new(Vec::new(), Registry::default());
    for value in values {
        writer.write_value(value).unwrap();
    }
    writer.write_footer().unwrap();
    writer.finish().unwrap()
}

fn footed(bytes: Vec<u8>) -> Snapshot {
    Snapshot::with_options(bytes, Registry::default(), ReaderOptions {
        expect_footer: true,
        ..ReaderOptions::default()
    })
}

#[test]
fn every_iteration_starts_from_the_beginning() {
    let values = vec![Value::from("repeated"), Value::from("repeated")];
    let snapshot = footed(encode(&values));

    for _ in 0..2 {
        let decoded = snapshot.iter().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(decoded, values);
    }

    assert_eq!((&snapshot).into_iter().count(), 2);
}

#[test]
fn failure_is_yielded_once() {
    let mut bytes = encode(&[Value::from(1)]);
    bytes.insert(0, 0xB0);
    let snapshot = footed(bytes);

    let mut objects = snapshot.iter();
    assert!(matches!(objects.next(), Some(Err(Error::StreamCorrupt(_)))));
    assert!(objects.next().is_none());
    assert!(objects.next().is_none());
}

#[test]
fn footers_are_validated_between_segments() {
    let mut bytes = encode(&[Value::from("abc")]);
    bytes.extend(encode(&[Value::from("abc"), Value::from(2)]));

    let decoded =
        footed(bytes.clone()).iter().collect::<Result<Vec<_>>>().unwrap();
    assert_eq!(decoded, [
        Value::from("abc"),
        Value::from("abc"),
        Value::from(2)
    ]);

    // without the option the first footer is corrupt
    let snapshot = Snapshot::new(bytes, Registry::default());
    let mut objects = snapshot.iter();
    assert_eq!(objects.next().unwrap().unwrap(), Value::from("abc"));
    assert!(matches!(
        objects.next(),
        Some(Err(Error::StreamCorrupt(Corruption::UnexpectedCode {
            code: 0xCF,
            ..
        })))
    ));
    assert!(objects.next().is_none());
}

#[test]
fn missing_or_changed_footer_is_yielded() {
    let bytes = encode(&[Value::from("abc")]);

    let snapshot = footed(bytes[..bytes.len() - 12].to_vec());
    let mut objects = snapshot.iter();
    assert_eq!(objects.next().unwrap().unwrap(), Value::from("abc"));
    assert!(matches!(
        objects.next(),
        Some(Err(Error::StreamCorrupt(Corruption::Truncated)))
    ));
    assert!(objects.next().is_none());

    // `PUT`, the length code, then the payload
    let mut changed = bytes;
    changed[2] = b'x';

    let snapshot = footed(changed);
    let mut objects = snapshot.iter();
    assert_eq!(objects.next().unwrap().unwrap(), Value::from("xbc"));
    assert!(matches!(
        objects.next(),
        Some(Err(Error::StreamCorrupt(Corruption::ChecksumMismatch { .. })))
    ));
}

#[test]
fn empty_snapshot() {
    let snapshot = Snapshot::new(Vec::new(), Registry::default());

    assert!(snapshot.bytes().is_empty());
    assert!(snapshot.iter().next().is_none());
}
