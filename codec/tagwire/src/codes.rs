//! The single-byte code table of the wire format.
//!
//! Every encoded value starts with one of these codes. Ranges are half-open:
//! `*_START` is the first code of the range and `*_END` the first code past
//! it.
//!
//! The assignments follow Fressian, but footers are not wire-compatible
//! with it. A footer is [`FOOTER_MAGIC`], then the number of data bytes
//! before it, then the xxHash32 (seed 0) of those data bytes, each a 4-byte
//! big-endian word. The magic and the length are not covered by the
//! checksum, and Fressian's Adler-32 is not used.

#![allow(missing_docs)]

pub const PRIORITY_CACHE_PACKED_START: u8 = 0x80;
pub const PRIORITY_CACHE_PACKED_END: u8 = 0xA0;
pub const STRUCT_CACHE_PACKED_START: u8 = 0xA0;
pub const STRUCT_CACHE_PACKED_END: u8 = 0xB0;

pub const MAP: u8 = 0xC0;
pub const SET: u8 = 0xC1;
pub const BIGINT: u8 = 0xC6;

pub const GET_PRIORITY_CACHE: u8 = 0xCC;
pub const PUT_PRIORITY_CACHE: u8 = 0xCD;
pub const FOOTER: u8 = 0xCF;
pub const FOOTER_MAGIC: u32 = 0xCFCF_CFCF;

pub const BYTES_PACKED_LENGTH_START: u8 = 0xD0;
pub const BYTES_PACKED_LENGTH_END: u8 = 0xD8;
pub const BYTES_CHUNK: u8 = 0xD8;
pub const BYTES: u8 = 0xD9;

pub const STRING_PACKED_LENGTH_START: u8 = 0xDA;
pub const STRING_PACKED_LENGTH_END: u8 = 0xE2;
pub const STRING_CHUNK: u8 = 0xE2;
pub const STRING: u8 = 0xE3;

pub const LIST_PACKED_LENGTH_START: u8 = 0xE4;
pub const LIST_PACKED_LENGTH_END: u8 = 0xEC;
pub const LIST: u8 = 0xEC;
pub const BEGIN_CLOSED_LIST: u8 = 0xED;
pub const BEGIN_OPEN_LIST: u8 = 0xEE;

pub const STRUCTTYPE: u8 = 0xEF;
pub const STRUCT: u8 = 0xF0;

pub const TRUE: u8 = 0xF5;
pub const FALSE: u8 = 0xF6;
pub const NULL: u8 = 0xF7;
pub const INT: u8 = 0xF8;
pub const FLOAT: u8 = 0xF9;
pub const DOUBLE: u8 = 0xFA;
pub const DOUBLE_0: u8 = 0xFB;
pub const DOUBLE_1: u8 = 0xFC;
pub const END_COLLECTION: u8 = 0xFD;
pub const RESET_CACHES: u8 = 0xFE;

pub const INT_PACKED_1_START: u8 = 0xFF;
pub const INT_PACKED_1_END: u8 = 0x40;
pub const INT_PACKED_2_START: u8 = 0x40;
pub const INT_PACKED_2_ZERO: u8 = 0x50;
pub const INT_PACKED_2_END: u8 = 0x60;
pub const INT_PACKED_3_START: u8 = 0x60;
pub const INT_PACKED_3_ZERO: u8 = 0x68;
pub const INT_PACKED_3_END: u8 = 0x70;
pub const INT_PACKED_4_START: u8 = 0x70;
pub const INT_PACKED_4_ZERO: u8 = 0x72;
pub const INT_PACKED_4_END: u8 = 0x74;
pub const INT_PACKED_5_START: u8 = 0x74;
pub const INT_PACKED_5_ZERO: u8 = 0x76;
pub const INT_PACKED_5_END: u8 = 0x78;
pub const INT_PACKED_6_START: u8 = 0x78;
pub const INT_PACKED_6_ZERO: u8 = 0x7A;
pub const INT_PACKED_6_END: u8 = 0x7C;
pub const INT_PACKED_7_START: u8 = 0x7C;
pub const INT_PACKED_7_ZERO: u8 = 0x7E;
pub const INT_PACKED_7_END: u8 = 0x80;

/// The largest payload of a single string or byte-string chunk.
pub const CHUNK_SIZE: usize = 65_535;

/// Tag names that belong to built-in codes and can never be given a custom
/// read handler.
pub const RESERVED_TAGS: &[&str] = &[
    "nil", "bool", "int", "float", "double", "bytes", "string", "list", "map",
    "set", "bigint", "footer", "cache", "struct",
];

/// Returns `true` if `tag` names a built-in type.
#[must_use]
pub fn is_reserved_tag(tag: &str) -> bool { RESERVED_TAGS.contains(&tag) }
