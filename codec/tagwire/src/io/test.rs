use super::*;

#[test]
fn output_counts_and_checksums() {
    let mut output = RawOutput::new(Vec::new());

    output.append(b"hello").unwrap();
    output.append(b" world").unwrap();

    assert_eq!(output.bytes_written(), 11);
    assert_eq!(
        output.checksum(),
        xxhash_rust::xxh32::xxh32(b"hello world", 0)
    );

    output.append_unaccounted(&[0xCF]).unwrap();
    assert_eq!(output.bytes_written(), 11);

    output.reset();
    assert_eq!(output.bytes_written(), 0);
    assert_eq!(output.checksum(), xxhash_rust::xxh32::xxh32(b"", 0));

    assert_eq!(output.into_inner(), b"hello world\xCF");
}

#[test]
fn input_peek_does_not_consume() {
    let mut input = RawInput::new(&[1u8, 2, 3][..]);

    assert_eq!(input.peek().unwrap(), Some(1));
    assert_eq!(input.peek().unwrap(), Some(1));
    assert_eq!(input.bytes_read(), 0);

    assert_eq!(input.read_byte().unwrap(), Some(1));
    assert_eq!(input.bytes_read(), 1);

    let mut buf = [0u8; 2];
    input.expect_bytes(&mut buf).unwrap();
    assert_eq!(buf, [2, 3]);
    assert_eq!(input.checksum(), xxhash_rust::xxh32::xxh32(&[1, 2, 3], 0));

    // the end of the stream is repeatable
    assert_eq!(input.peek().unwrap(), None);
    assert_eq!(input.read_byte().unwrap(), None);
    assert_eq!(input.read_byte().unwrap(), None);
}

#[test]
fn input_truncation_is_corruption() {
    let mut input = RawInput::new(&[1u8][..]);

    let mut buf = [0u8; 4];
    let error = input.expect_bytes(&mut buf).unwrap_err();
    assert_eq!(error.as_corruption(), Some(&Corruption::Truncated));

    let mut input = RawInput::new(&[0u8; 0][..]);
    let error = input.expect_byte().unwrap_err();
    assert_eq!(error.as_corruption(), Some(&Corruption::Truncated));
}
