//! The primitive wire representations: packed integers, floating point
//! numbers, and length-prefixed byte and text payloads.
//!
//! Encoding functions append to a `Vec<u8>`; decoding functions pull from a
//! [`RawInput`]. Multi-byte raw integers are big-endian.
//!
//! # Integer Packing
//!
//! An integer is written with the fewest bytes its significant bits allow.
//! Values in `-1..=63` are the code byte itself. Larger magnitudes use a code
//! from one of the packed ranges, whose offset from the range's "zero" code
//! carries the high bits, followed by 1 to 6 raw bytes carrying the low
//! bits. Everything else is the [`codes::INT`] code followed by 8 raw bytes.

use crate::{
    codes,
    error::{Corruption, Result},
    io::{ByteSource, RawInput},
    value::BigInt,
};

/// The number of leading bits that carry no information, used to pick the
/// packed form of an integer.
#[must_use]
pub const fn bit_switch(value: i64) -> u32 {
    let value = if value < 0 { !value } else { value };
    value.leading_zeros()
}

/// Appends the low `width` bytes of `value`, big-endian.
pub fn write_raw(out: &mut Vec<u8>, value: u64, width: usize) {
    out.extend_from_slice(&value.to_be_bytes()[8 - width..]);
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn packed_code(zero: u8, high: i64) -> u8 { (i64::from(zero) + high) as u8 }

/// Appends a packed integer.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub fn write_int(out: &mut Vec<u8>, value: i64) {
    let raw = value as u64;

    match bit_switch(value) {
        58..=64 if value >= -1 => out.push(value as u8),
        52..=64 => {
            out.push(packed_code(codes::INT_PACKED_2_ZERO, value >> 8));
            write_raw(out, raw, 1);
        }
        45..=51 => {
            out.push(packed_code(codes::INT_PACKED_3_ZERO, value >> 16));
            write_raw(out, raw, 2);
        }
        39..=44 => {
            out.push(packed_code(codes::INT_PACKED_4_ZERO, value >> 24));
            write_raw(out, raw, 3);
        }
        31..=38 => {
            out.push(packed_code(codes::INT_PACKED_5_ZERO, value >> 32));
            write_raw(out, raw, 4);
        }
        23..=30 => {
            out.push(packed_code(codes::INT_PACKED_6_ZERO, value >> 40));
            write_raw(out, raw, 5);
        }
        15..=22 => {
            out.push(packed_code(codes::INT_PACKED_7_ZERO, value >> 48));
            write_raw(out, raw, 6);
        }
        _ => {
            out.push(codes::INT);
            write_raw(out, raw, 8);
        }
    }
}

/// Appends a non-negative count or length as a packed integer.
#[allow(clippy::cast_possible_wrap)]
pub fn write_count(out: &mut Vec<u8>, count: usize) {
    write_int(out, count as i64);
}

/// Appends a single precision float.
pub fn write_float(out: &mut Vec<u8>, value: f32) {
    out.push(codes::FLOAT);
    write_raw(out, u64::from(value.to_bits()), 4);
}

/// Appends a double precision float, using the one-byte codes for exactly
/// `0.0` and `1.0`.
pub fn write_double(out: &mut Vec<u8>, value: f64) {
    let bits = value.to_bits();

    if bits == 0.0f64.to_bits() {
        out.push(codes::DOUBLE_0);
    } else if bits == 1.0f64.to_bits() {
        out.push(codes::DOUBLE_1);
    } else {
        out.push(codes::DOUBLE);
        write_raw(out, bits, 8);
    }
}

/// The codes used by one family of chunked payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkCodes {
    /// The first code carrying its length in the code itself.
    pub packed_start: u8,

    /// The first code past the packed range.
    pub packed_end: u8,

    /// The code of a non-final chunk.
    pub chunk: u8,

    /// The code of a final, length-prefixed chunk.
    pub last: u8,

    /// What the payload is called in corruption reports.
    pub name: &'static str,
}

/// The codes of raw byte strings.
pub const BYTES_CODES: ChunkCodes = ChunkCodes {
    packed_start: codes::BYTES_PACKED_LENGTH_START,
    packed_end: codes::BYTES_PACKED_LENGTH_END,
    chunk: codes::BYTES_CHUNK,
    last: codes::BYTES,
    name: "bytes",
};

/// The codes of UTF-8 strings.
pub const STRING_CODES: ChunkCodes = ChunkCodes {
    packed_start: codes::STRING_PACKED_LENGTH_START,
    packed_end: codes::STRING_PACKED_LENGTH_END,
    chunk: codes::STRING_CHUNK,
    last: codes::STRING,
    name: "string",
};

impl ChunkCodes {
    /// Returns `true` if `code` starts a payload of this family.
    #[must_use]
    pub const fn starts_with(&self, code: u8) -> bool {
        (code >= self.packed_start && code < self.packed_end)
            || code == self.chunk
            || code == self.last
    }
}

#[allow(clippy::cast_possible_truncation)]
fn write_chunked(out: &mut Vec<u8>, payload: &[u8], family: ChunkCodes) {
    let packed_len = usize::from(family.packed_end - family.packed_start);

    if payload.len() < packed_len {
        out.push(family.packed_start + payload.len() as u8);
        out.extend_from_slice(payload);
        return;
    }

    let mut rest = payload;
    while rest.len() > codes::CHUNK_SIZE {
        let (chunk, tail) = rest.split_at(codes::CHUNK_SIZE);

        out.push(family.chunk);
        write_count(out, chunk.len());
        out.extend_from_slice(chunk);

        rest = tail;
    }

    out.push(family.last);
    write_count(out, rest.len());
    out.extend_from_slice(rest);
}

/// Appends a raw byte string.
pub fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_chunked(out, bytes, BYTES_CODES);
}

/// Appends a UTF-8 string.
pub fn write_string(out: &mut Vec<u8>, string: &str) {
    write_chunked(out, string.as_bytes(), STRING_CODES);
}

/// Appends a list header announcing `len` elements.
#[allow(clippy::cast_possible_truncation)]
pub fn write_list_header(out: &mut Vec<u8>, len: usize) {
    let packed_len = usize::from(
        codes::LIST_PACKED_LENGTH_END - codes::LIST_PACKED_LENGTH_START,
    );

    if len < packed_len {
        out.push(codes::LIST_PACKED_LENGTH_START + len as u8);
    } else {
        out.push(codes::LIST);
        write_count(out, len);
    }
}

/// Appends a big integer.
pub fn write_big_int(out: &mut Vec<u8>, value: &BigInt) {
    let bytes = value.to_signed_bytes_be();

    out.push(codes::BIGINT);
    write_count(out, bytes.len());
    out.extend_from_slice(bytes);
}

/// Reads `width` raw big-endian bytes as an unsigned integer.
///
/// # Errors
///
/// Returns [`Corruption::Truncated`] if the stream ends first.
pub fn read_raw<S: ByteSource>(
    input: &mut RawInput<S>,
    width: usize,
) -> Result<u64> {
    let mut buf = [0u8; 8];
    input.expect_bytes(&mut buf[8 - width..])?;

    Ok(u64::from_be_bytes(buf))
}

/// Decodes the rest of a packed integer whose code has been consumed.
///
/// Returns `None` if `code` is not an integer code.
///
/// # Errors
///
/// Returns [`Corruption::Truncated`] if the stream ends first.
#[allow(clippy::cast_possible_wrap)]
pub fn read_int_body<S: ByteSource>(
    code: u8,
    input: &mut RawInput<S>,
) -> Result<Option<i64>> {
    let packed = |zero: u8, shift: u32, width: usize, input: &mut RawInput<S>| {
        let high = i64::from(code) - i64::from(zero);
        let low = read_raw(input, width)? as i64;

        Ok::<_, crate::error::Error>(Some((high << shift) | low))
    };

    match code {
        0x00..=0x3F => Ok(Some(i64::from(code))),
        codes::INT_PACKED_1_START => Ok(Some(-1)),
        0x40..=0x5F => packed(codes::INT_PACKED_2_ZERO, 8, 1, input),
        0x60..=0x6F => packed(codes::INT_PACKED_3_ZERO, 16, 2, input),
        0x70..=0x73 => packed(codes::INT_PACKED_4_ZERO, 24, 3, input),
        0x74..=0x77 => packed(codes::INT_PACKED_5_ZERO, 32, 4, input),
        0x78..=0x7B => packed(codes::INT_PACKED_6_ZERO, 40, 5, input),
        0x7C..=0x7F => packed(codes::INT_PACKED_7_ZERO, 48, 6, input),
        codes::INT => Ok(Some(read_raw(input, 8)? as i64)),
        _ => Ok(None),
    }
}

/// Reads a complete packed integer, code included.
///
/// # Errors
///
/// Returns [`Corruption::UnexpectedCode`] if the next value is not an
/// integer, or [`Corruption::Truncated`] if the stream ends first.
pub fn read_int<S: ByteSource>(input: &mut RawInput<S>) -> Result<i64> {
    let code = input.expect_byte()?;

    read_int_body(code, input)?.ok_or_else(|| {
        Corruption::UnexpectedCode { expected: "an integer", code }.into()
    })
}

/// Reads a complete count or length, which must be non-negative.
///
/// # Errors
///
/// Returns [`Corruption::InvalidLength`] for a negative or oversized value,
/// plus the errors of [`read_int`].
pub fn read_count<S: ByteSource>(input: &mut RawInput<S>) -> Result<usize> {
    let count = read_int(input)?;

    usize::try_from(count).map_err(|_| Corruption::InvalidLength(count).into())
}

/// Decodes the payload of a single precision float.
///
/// # Errors
///
/// Returns [`Corruption::Truncated`] if the stream ends first.
#[allow(clippy::cast_possible_truncation)]
pub fn read_float_body<S: ByteSource>(input: &mut RawInput<S>) -> Result<f32> {
    Ok(f32::from_bits(read_raw(input, 4)? as u32))
}

/// Decodes the payload of a double precision float.
///
/// # Errors
///
/// Returns [`Corruption::Truncated`] if the stream ends first.
pub fn read_double_body<S: ByteSource>(
    input: &mut RawInput<S>,
) -> Result<f64> {
    Ok(f64::from_bits(read_raw(input, 8)?))
}

/// Reads exactly `len` bytes.
///
/// The buffer grows with what is actually read, so a corrupt, huge length
/// runs into the end of the stream instead of a huge allocation.
///
/// # Errors
///
/// Returns [`Corruption::Truncated`] if the stream ends first.
pub fn read_payload<S: ByteSource>(
    input: &mut RawInput<S>,
    len: usize,
    into: &mut Vec<u8>,
) -> Result<()> {
    let mut remaining = len;

    while remaining > 0 {
        let step = remaining.min(codes::CHUNK_SIZE);
        let start = into.len();

        into.resize(start + step, 0);
        input.expect_bytes(&mut into[start..])?;

        remaining -= step;
    }

    Ok(())
}

/// Decodes the rest of a chunked payload whose first code has been
/// consumed.
///
/// # Errors
///
/// Returns [`Corruption::UnexpectedCode`] if a chunk is followed by anything
/// but another chunk of the same family, plus the errors of [`read_count`].
pub fn read_chunked_body<S: ByteSource>(
    code: u8,
    input: &mut RawInput<S>,
    family: ChunkCodes,
) -> Result<Vec<u8>> {
    let mut payload = Vec::new();
    let mut code = code;

    loop {
        if code >= family.packed_start && code < family.packed_end {
            read_payload(
                input,
                usize::from(code - family.packed_start),
                &mut payload,
            )?;
            return Ok(payload);
        }

        let len = read_count(input)?;
        read_payload(input, len, &mut payload)?;

        if code == family.last {
            return Ok(payload);
        }

        code = input.expect_byte()?;
        if code != family.chunk && code != family.last {
            return Err(Corruption::UnexpectedCode {
                expected: family.name,
                code,
            }
            .into());
        }
    }
}

/// Decodes the rest of a string whose first code has been consumed.
///
/// # Errors
///
/// Returns [`Corruption::InvalidUtf8`] for a malformed payload, plus the
/// errors of [`read_chunked_body`].
pub fn read_string_body<S: ByteSource>(
    code: u8,
    input: &mut RawInput<S>,
) -> Result<String> {
    let payload = read_chunked_body(code, input, STRING_CODES)?;

    String::from_utf8(payload).map_err(|_| Corruption::InvalidUtf8.into())
}

/// Decodes the rest of a big integer whose code has been consumed.
///
/// # Errors
///
/// Returns the errors of [`read_count`] and [`read_payload`].
pub fn read_big_int_body<S: ByteSource>(
    input: &mut RawInput<S>,
) -> Result<BigInt> {
    let len = read_count(input)?;

    let mut bytes = Vec::new();
    read_payload(input, len, &mut bytes)?;

    Ok(BigInt::from_signed_bytes_be(&bytes))
}
