//! Tests for malformed streams and reader options.

use tagwire::{
    Corruption, Error, Reader, ReaderOptions, Registry, Value, WriterOptions,
};

mod common;

fn encode_with_footer(values: &[Value]) -> Vec<u8> {
    let mut writer = tagwire::create_writer(Vec::new(), Registry::default());
    for value in values {
        writer.write_value(value).unwrap();
    }
    writer.write_footer().unwrap();
    writer.finish().unwrap()
}

fn footed() -> ReaderOptions {
    ReaderOptions { expect_footer: true, ..ReaderOptions::default() }
}

fn read_error(bytes: &[u8], options: ReaderOptions) -> Corruption {
    let mut reader = Reader::with_options(bytes, Registry::default(), options);

    let error = match tagwire::read_batch(&mut reader) {
        Ok(_) => reader.validate_footer().unwrap_err(),
        Err(error) => error,
    };
    assert!(reader.is_closed());

    match error {
        Error::StreamCorrupt(corruption) => corruption,
        error => panic!("expected a corrupt stream, got {error:?}"),
    }
}

#[test]
fn unknown_code() {
    common::init_logging();

    assert_eq!(
        read_error(&[0x01, 0xB5], ReaderOptions::default()),
        Corruption::UnknownCode(0xB5)
    );
}

#[test]
fn truncated_streams() {
    common::init_logging();

    let bytes = encode_with_footer(&[Value::from("a longer string value")]);

    // a cut inside the footer leaves the value intact but fails validation
    for len in 1..bytes.len() {
        assert_eq!(
            read_error(&bytes[..len], footed()),
            Corruption::Truncated,
            "cut at {len}"
        );
    }
}

#[test]
fn footer_must_be_expected() {
    common::init_logging();

    let bytes = encode_with_footer(&[Value::from(1)]);

    assert_eq!(
        read_error(&bytes, ReaderOptions::default()),
        Corruption::UnexpectedCode { expected: "a value", code: 0xCF }
    );

    let mut reader =
        tagwire::create_reader(&bytes[..], Registry::default(), false);
    assert!(tagwire::read_batch(&mut reader).is_err());

    let mut reader =
        tagwire::create_reader(&bytes[..], Registry::default(), true);
    assert_eq!(tagwire::read_batch(&mut reader).unwrap(), [Value::from(1)]);
    reader.validate_footer().unwrap();
}

#[test]
fn footer_length_mismatch() {
    common::init_logging();

    let mut bytes = encode_with_footer(&[Value::from(1), Value::from(2)]);
    let length_byte = bytes.len() - 5;
    bytes[length_byte] ^= 0x01;

    assert!(matches!(
        read_error(&bytes, footed()),
        Corruption::FooterLengthMismatch { recorded: 3, calculated: 2 }
    ));
}

#[test]
fn footer_magic() {
    common::init_logging();

    let mut bytes = encode_with_footer(&[Value::from(1)]);
    let magic_byte = bytes.len() - 10;
    bytes[magic_byte] = 0;

    assert!(matches!(
        read_error(&bytes, footed()),
        Corruption::InvalidFooterMagic(_)
    ));
}

#[test]
fn cache_reference_before_definition() {
    common::init_logging();

    assert_eq!(
        read_error(&[0xCC, 0x07], ReaderOptions::default()),
        Corruption::CacheIndexOutOfRange { index: 7, len: 0 }
    );
}

#[test]
fn options_from_toml() {
    common::init_logging();

    let options = toml::from_str::<ReaderOptions>(
        r"
expect_footer = true
validate_checksum = false
max_depth = 2
",
    )
    .unwrap();
    assert!(options.expect_footer);
    assert!(!options.validate_checksum);
    assert!(!options.accept_unknown_tags);
    assert_eq!(options.max_depth, Some(2));

    let nested = Value::from(vec![Value::from(vec![Value::List(Vec::new())])]);
    assert_eq!(
        read_error(&encode_with_footer(&[nested]), options),
        Corruption::DepthLimitExceeded(2)
    );

    let options = toml::from_str::<WriterOptions>("").unwrap();
    assert_eq!(options, WriterOptions::default());
}

#[test]
fn checksum_can_be_skipped() {
    common::init_logging();

    let mut bytes = encode_with_footer(&[Value::from("payload")]);
    // the first payload byte after `PUT` and the length code
    bytes[2] = b'P';

    assert!(matches!(
        read_error(&bytes, footed()),
        Corruption::ChecksumMismatch { .. }
    ));

    let mut reader =
        Reader::with_options(&bytes[..], Registry::default(), ReaderOptions {
            validate_checksum: false,
            ..footed()
        });
    assert_eq!(
        tagwire::read_batch(&mut reader).unwrap(),
        vec![Value::from("Payload")]
    );
    reader.validate_footer().unwrap();
}
