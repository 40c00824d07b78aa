// SPDX-License-Identifier: Apache-2.0

//! The decoder-stream track of a QPACK connection: applies incoming encoder
//! instructions to a mirror of the encoder's dynamic table and decodes field
//! sections that may reference it, emitting decoder instructions (RFC 9204
//! §4.4) in response.
//!
//! A field section whose Required Insert Count exceeds what has been
//! inserted so far is supposed to block the stream until the missing
//! inserts arrive. This build has no task to suspend on, so it reports
//! `Error::Blocked` instead and leaves re-driving the stream to the caller.

use super::{
    dynamic_table::{self, decode_required_insert_count, DynamicTable},
    field::HeaderField,
    prefix_int, static_table,
};
use alloc::vec::Vec;
use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    Truncated,
    /// The field section's Required Insert Count hasn't been satisfied yet;
    /// the caller should retry once more encoder instructions arrive.
    Blocked,
    HuffmanUnsupported,
    StaticIndexOutOfRange,
    Table(dynamic_table::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "instruction or field section ended mid-encoding"),
            Self::Blocked => write!(f, "field section references an insert not yet received"),
            Self::HuffmanUnsupported => write!(f, "section used a Huffman-coded string"),
            Self::StaticIndexOutOfRange => write!(f, "static table index out of range"),
            Self::Table(e) => fmt::Display::fmt(e, f),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl From<dynamic_table::Error> for Error {
    fn from(e: dynamic_table::Error) -> Self {
        Self::Table(e)
    }
}

pub struct Decoder {
    table: DynamicTable,
    known_insert_count: u64,
}

impl Decoder {
    pub fn new(max_capacity: usize) -> Self {
        Self {
            table: DynamicTable::new(max_capacity),
            known_insert_count: 0,
        }
    }

    pub fn known_insert_count(&self) -> u64 {
        self.known_insert_count
    }

    pub fn table(&self) -> &DynamicTable {
        &self.table
    }

    /// Applies every encoder instruction present in `bytes`, in order.
    pub fn on_encoder_instructions(&mut self, mut bytes: &[u8]) -> Result<(), Error> {
        while !bytes.is_empty() {
            let first = bytes[0];

            if first & 0xe0 == 0x20 {
                // Set Dynamic Table Capacity (Figure 5): 001 Capacity(5+)
                let (capacity, consumed) = prefix_int::decode(bytes, 5).map_err(|_| Error::Truncated)?;
                self.table.set_capacity(capacity as usize)?;
                bytes = &bytes[consumed..];
            } else if first & 0x80 != 0 {
                // Insert With Name Reference (Figure 3): 1 T NameIndex(6+)
                let is_static = first & 0x40 != 0;
                let (name_index, consumed) = prefix_int::decode(bytes, 6).map_err(|_| Error::Truncated)?;
                bytes = &bytes[consumed..];
                let name = if is_static {
                    static_table::get(name_index as usize)
                        .ok_or(Error::StaticIndexOutOfRange)?
                        .0
                        .as_bytes()
                        .to_vec()
                } else {
                    let absolute = self.relative_to_absolute(name_index)?;
                    self.table.get(absolute)?.name.clone()
                };
                let (value, consumed) = decode_string(bytes)?;
                bytes = &bytes[consumed..];
                self.table.insert(HeaderField::new(name, value))?;
                self.known_insert_count += 1;
            } else if first & 0x40 != 0 {
                // Insert With Literal Name (Figure 4): 01 H NameLen(5+)
                if first & 0x20 != 0 {
                    return Err(Error::HuffmanUnsupported);
                }
                let (name_len, consumed) = prefix_int::decode(bytes, 5).map_err(|_| Error::Truncated)?;
                bytes = &bytes[consumed..];
                let name_len = name_len as usize;
                if bytes.len() < name_len {
                    return Err(Error::Truncated);
                }
                let name = bytes[..name_len].to_vec();
                bytes = &bytes[name_len..];
                let (value, consumed) = decode_string(bytes)?;
                bytes = &bytes[consumed..];
                self.table.insert(HeaderField::new(name, value))?;
                self.known_insert_count += 1;
            } else {
                // Duplicate (Figure 12): 000 Index(5+)
                let (index, consumed) = prefix_int::decode(bytes, 5).map_err(|_| Error::Truncated)?;
                let absolute = self.relative_to_absolute(index)?;
                self.table.duplicate(absolute)?;
                bytes = &bytes[consumed..];
                self.known_insert_count += 1;
            }
        }
        Ok(())
    }

    fn relative_to_absolute(&self, relative: u64) -> Result<u64, Error> {
        self.table
            .insert_count()
            .checked_sub(relative + 1)
            .ok_or(Error::StaticIndexOutOfRange)
    }

    /// Decodes a field section, returning the fields plus, if any dynamic
    /// entry was referenced, the Required Insert Count to acknowledge on the
    /// decoder stream via [`section_acknowledgment`].
    pub fn decode_field_section(&mut self, bytes: &[u8]) -> Result<(Vec<HeaderField>, Option<u64>), Error> {
        let (encoded_ric, consumed) = prefix_int::decode(bytes, 8).map_err(|_| Error::Truncated)?;
        let bytes = &bytes[consumed..];
        let max_entries = self.table.max_entries().max(1);
        let required_insert_count =
            decode_required_insert_count(encoded_ric, max_entries, self.known_insert_count)
                .map_err(Error::Table)?;

        if required_insert_count > self.known_insert_count {
            return Err(Error::Blocked);
        }

        let sign = *bytes.first().ok_or(Error::Truncated)? & 0x80 != 0;
        let (delta_base, consumed) = prefix_int::decode(bytes, 7).map_err(|_| Error::Truncated)?;
        let mut bytes = &bytes[consumed..];

        let base = if sign {
            required_insert_count
                .checked_sub(delta_base + 1)
                .ok_or(Error::Truncated)?
        } else {
            required_insert_count + delta_base
        };

        let mut fields = Vec::new();
        while !bytes.is_empty() {
            let first = bytes[0];

            if first & 0x80 != 0 {
                let is_static = first & 0x40 != 0;
                let (index, consumed) = prefix_int::decode(bytes, 6).map_err(|_| Error::Truncated)?;
                bytes = &bytes[consumed..];
                if is_static {
                    let (name, value) =
                        static_table::get(index as usize).ok_or(Error::StaticIndexOutOfRange)?;
                    fields.push(HeaderField::from((name, value)));
                } else {
                    let absolute = base.checked_sub(index + 1).ok_or(Error::Truncated)?;
                    fields.push(self.table.get(absolute)?.clone());
                }
            } else if first & 0xc0 == 0x40 {
                let is_static = first & 0x10 != 0;
                let (index, consumed) = prefix_int::decode(bytes, 4).map_err(|_| Error::Truncated)?;
                bytes = &bytes[consumed..];
                let name = if is_static {
                    static_table::get(index as usize)
                        .ok_or(Error::StaticIndexOutOfRange)?
                        .0
                        .as_bytes()
                        .to_vec()
                } else {
                    let absolute = base.checked_sub(index + 1).ok_or(Error::Truncated)?;
                    self.table.get(absolute)?.name.clone()
                };
                let (value, consumed) = decode_string(bytes)?;
                bytes = &bytes[consumed..];
                fields.push(HeaderField::new(name, value));
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
                bytes = &bytes[consumed..];
                fields.push(HeaderField::new(name, value));
            } else {
                // Indexed/Literal Field Line With Post-Base *: not produced by
                // this build's encoder, so not implemented on decode either.
                return Err(Error::Truncated);
            }
        }

        let ack = (required_insert_count > 0).then_some(required_insert_count);
        Ok((fields, ack))
    }

    /// Encodes a Section Acknowledgment instruction for `stream_id`.
    pub fn section_acknowledgment(stream_id: u64) -> Vec<u8> {
        let mut out = Vec::new();
        // Section Acknowledgment (Figure 13): 1 StreamId(7+)
        prefix_int::encode(&mut out, 7, 0x80, stream_id);
        out
    }

    /// Encodes a Stream Cancellation instruction for `stream_id`.
    pub fn stream_cancellation(stream_id: u64) -> Vec<u8> {
        let mut out = Vec::new();
        // Stream Cancellation (Figure 14): 01 StreamId(6+)
        prefix_int::encode(&mut out, 6, 0x40, stream_id);
        out
    }

    /// Encodes an Insert Count Increment instruction.
    pub fn insert_count_increment(increment: u64) -> Vec<u8> {
        let mut out = Vec::new();
        // Insert Count Increment (Figure 15): 00 Increment(6+)
        prefix_int::encode(&mut out, 6, 0x00, increment);
        out
    }
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
    use crate::qpack::encoder::Encoder;

    #[test]
    fn decoder_applies_encoder_instructions_and_tracks_insert_count() {
        let mut encoder = Encoder::new(128);
        let set_cap = encoder.set_capacity(128).unwrap();
        let (_, insert_insn) = encoder.insert(HeaderField::from((":method", "GET"))).unwrap();

        let mut decoder = Decoder::new(128);
        decoder.on_encoder_instructions(&set_cap).unwrap();
        decoder.on_encoder_instructions(&insert_insn).unwrap();

        assert_eq!(decoder.known_insert_count(), 1);
        assert_eq!(decoder.table().get(0).unwrap(), &HeaderField::from((":method", "GET")));
    }

    #[test]
    fn field_section_referencing_an_unreceived_insert_is_blocked() {
        let mut encoder = Encoder::new(128);
        encoder.set_capacity(128).unwrap();
        encoder.insert(HeaderField::from((":method", "GET"))).unwrap();
        let section = encoder.encode_field_section(3, &[HeaderField::from((":method", "GET"))]);

        let mut decoder = Decoder::new(128);
        assert_eq!(decoder.decode_field_section(&section), Err(Error::Blocked));
    }

    #[test]
    fn field_section_decodes_once_inserts_have_arrived() {
        let mut encoder = Encoder::new(128);
        let set_cap = encoder.set_capacity(128).unwrap();
        let (_, insert_insn) = encoder.insert(HeaderField::from((":method", "GET"))).unwrap();
        let section = encoder.encode_field_section(3, &[HeaderField::from((":method", "GET"))]);

        let mut decoder = Decoder::new(128);
        decoder.on_encoder_instructions(&set_cap).unwrap();
        decoder.on_encoder_instructions(&insert_insn).unwrap();

        let (fields, ack) = decoder.decode_field_section(&section).unwrap();
        assert_eq!(fields, alloc::vec![HeaderField::from((":method", "GET"))]);
        assert_eq!(ack, Some(1));
    }
}
