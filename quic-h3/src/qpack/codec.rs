// SPDX-License-Identifier: Apache-2.0

//! Encodes and decodes QPACK field sections (RFC 9204 §4.5) against the
//! static table only.
//!
//! This build never grows a dynamic table and never emits Huffman-coded
//! strings: every field section it writes carries Required Insert Count 0
//! and Base Delta 0, and every field line either indexes the static table or
//! falls back to a literal name and literal value, both written as raw
//! (non-Huffman) strings. A dynamic-table reference or a Huffman-coded
//! string on the wire is something this build never produced, so decoding
//! one is reported as `Error::Unsupported` rather than guessed at.

use super::{field::HeaderField, prefix_int, static_table};
use alloc::vec::Vec;
use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    Truncated,
    /// The field section referenced the dynamic table or a nonzero base,
    /// which this build never offers and so never expects from a peer using
    /// the same codec.
    Unsupported,
    /// The section used a Huffman-coded string; this codec always emits raw
    /// strings and does not implement the Huffman table to decode one.
    HuffmanUnsupported,
    StaticIndexOutOfRange,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "field section ended mid-instruction"),
            Self::Unsupported => write!(f, "field section referenced the dynamic table"),
            Self::HuffmanUnsupported => write!(f, "field section used a Huffman-coded string"),
            Self::StaticIndexOutOfRange => write!(f, "static table index out of range"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Encodes `fields` as a complete QPACK field section: the Required Insert
/// Count / Base prefix followed by one field line per field.
pub fn encode_field_section(fields: &[HeaderField]) -> Vec<u8> {
    let mut out = Vec::new();
    prefix_int::encode(&mut out, 8, 0x00, 0); // Required Insert Count = 0
    prefix_int::encode(&mut out, 7, 0x00, 0); // Base Delta = 0, sign = 0
    for field in fields {
        encode_field(field, &mut out);
    }
    out
}

fn encode_field(field: &HeaderField, out: &mut Vec<u8>) {
    if let (Some(name), Some(value)) = (field.name_str(), field.value_str()) {
        if let Some(index) = static_table::find(name, value) {
            // Indexed Field Line, static (RFC 9204 Figure 6): 1 T=1 Index(6+)
            prefix_int::encode(out, 6, 0xc0, index as u64);
            return;
        }
        if let Some(index) = static_table::find_name(name) {
            // Literal Field Line With Name Reference, static (Figure 7): 01 N=0 T=1 Index(4+)
            prefix_int::encode(out, 4, 0x50, index as u64);
            encode_string(field.value.as_slice(), out);
            return;
        }
    }
    // Literal Field Line With Literal Name (Figure 9): 001 N=0 H=0 NameLen(3+)
    prefix_int::encode(out, 3, 0x20, field.name.len() as u64);
    out.extend_from_slice(&field.name);
    encode_string(&field.value, out);
}

fn encode_string(bytes: &[u8], out: &mut Vec<u8>) {
    // Value String (Figure 8): H=0 Length(7+)
    prefix_int::encode(out, 7, 0x00, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

/// Decodes a complete QPACK field section into its header fields.
pub fn decode_field_section(bytes: &[u8]) -> Result<Vec<HeaderField>, Error> {
    let (required_insert_count, consumed) =
        prefix_int::decode(bytes, 8).map_err(|_| Error::Truncated)?;
    if required_insert_count != 0 {
        return Err(Error::Unsupported);
    }
    let bytes = &bytes[consumed..];

    let sign = *bytes.first().ok_or(Error::Truncated)? & 0x80 != 0;
    let (delta_base, consumed) = prefix_int::decode(bytes, 7).map_err(|_| Error::Truncated)?;
    if sign || delta_base != 0 {
        return Err(Error::Unsupported);
    }
    let mut bytes = &bytes[consumed..];

    let mut fields = Vec::new();
    while !bytes.is_empty() {
        let first = bytes[0];

        if first & 0x80 != 0 {
            let is_static = first & 0x40 != 0;
            if !is_static {
                return Err(Error::Unsupported);
            }
            let (index, consumed) = prefix_int::decode(bytes, 6).map_err(|_| Error::Truncated)?;
            let (name, value) =
                static_table::get(index as usize).ok_or(Error::StaticIndexOutOfRange)?;
            fields.push(HeaderField::from((name, value)));
            bytes = &bytes[consumed..];
        } else if first & 0xc0 == 0x40 {
            let is_static = first & 0x10 != 0;
            if !is_static {
                return Err(Error::Unsupported);
            }
            let (index, consumed) = prefix_int::decode(bytes, 4).map_err(|_| Error::Truncated)?;
            let (name, _) =
                static_table::get(index as usize).ok_or(Error::StaticIndexOutOfRange)?;
            bytes = &bytes[consumed..];
            let (value, consumed) = decode_string(bytes)?;
            fields.push(HeaderField::new(name, value));
            bytes = &bytes[consumed..];
        } else if first & 0xe0 == 0x20 {
            if first & 0x08 != 0 {
                return Err(Error::HuffmanUnsupported);
            }
            let (name_len, consumed) = prefix_int::decode(bytes, 3).map_err(|_| Error::Truncated)?;
            let name_len = name_len as usize;
            bytes = &bytes[consumed..];
            if bytes.len() < name_len {
                return Err(Error::Truncated);
            }
            let name = bytes[..name_len].to_vec();
            bytes = &bytes[name_len..];
            let (value, consumed) = decode_string(bytes)?;
            fields.push(HeaderField::new(name, value));
            bytes = &bytes[consumed..];
        } else {
            // Indexed/Literal Field Line With Post-Base *, dynamic-table only.
            return Err(Error::Unsupported);
        }
    }

    Ok(fields)
}

fn decode_string(bytes: &[u8]) -> Result<(Vec<u8>, usize), Error> {
    let first = *bytes.first().ok_or(Error::Truncated)?;
    if first & 0x80 != 0 {
        return Err(Error::HuffmanUnsupported);
    }
    let (len, consumed) = prefix_int::decode(bytes, 7).map_err(|_| Error::Truncated)?;
    let len = len as usize;
    let rest = &bytes[consumed..];
    if rest.len() < len {
        return Err(Error::Truncated);
    }
    Ok((rest[..len].to_vec(), consumed + len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_static_match_round_trips_as_indexed() {
        let fields = alloc::vec![HeaderField::from((":method", "GET"))];
        let bytes = encode_field_section(&fields);
        // Required Insert Count byte, Base Delta byte, one Indexed Field Line byte
        assert_eq!(bytes.len(), 3);
        assert_eq!(decode_field_section(&bytes).unwrap(), fields);
    }

    #[test]
    fn name_only_static_match_uses_literal_with_name_reference() {
        let fields = alloc::vec![HeaderField::from((":path", "/index.html"))];
        let bytes = encode_field_section(&fields);
        assert_eq!(decode_field_section(&bytes).unwrap(), fields);
    }

    #[test]
    fn unknown_field_uses_literal_with_literal_name() {
        let fields = alloc::vec![HeaderField::new("x-request-id", "abc123")];
        let bytes = encode_field_section(&fields);
        assert_eq!(decode_field_section(&bytes).unwrap(), fields);
    }

    #[test]
    fn multiple_fields_round_trip_in_order() {
        let fields = alloc::vec![
            HeaderField::from((":method", "POST")),
            HeaderField::from((":scheme", "https")),
            HeaderField::new("x-trace", "deadbeef"),
        ];
        let bytes = encode_field_section(&fields);
        assert_eq!(decode_field_section(&bytes).unwrap(), fields);
    }

    #[test]
    fn nonzero_required_insert_count_is_unsupported() {
        let mut bytes = Vec::new();
        prefix_int::encode(&mut bytes, 8, 0x00, 1);
        prefix_int::encode(&mut bytes, 7, 0x00, 0);
        assert_eq!(decode_field_section(&bytes), Err(Error::Unsupported));
    }

    #[test]
    fn huffman_coded_value_string_is_rejected() {
        let mut bytes = Vec::new();
        prefix_int::encode(&mut bytes, 8, 0x00, 0);
        prefix_int::encode(&mut bytes, 7, 0x00, 0);
        prefix_int::encode(&mut bytes, 3, 0x20, 1); // literal name, len 1
        bytes.push(b'x');
        prefix_int::encode(&mut bytes, 7, 0x80, 1); // H=1 on the value string
        bytes.push(b'y');
        assert_eq!(decode_field_section(&bytes), Err(Error::HuffmanUnsupported));
    }
}
