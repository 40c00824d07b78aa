// SPDX-License-Identifier: Apache-2.0

//! The encoder-stream track of a QPACK connection: owns the dynamic table,
//! emits encoder instructions (RFC 9204 §4.3), and tracks which entries are
//! referenced by field sections still in flight so they aren't evicted out
//! from under a stream waiting on a decoder Section Acknowledgment.

use super::{
    dynamic_table::{self, encode_required_insert_count, DynamicTable},
    field::HeaderField,
    prefix_int, static_table,
};
use alloc::{collections::BTreeMap, string::String, vec::Vec};

pub use dynamic_table::Error;

struct Outstanding {
    required_insert_count: u64,
    referenced: Vec<u64>,
}

pub struct Encoder {
    table: DynamicTable,
    known_received_count: u64,
    outstanding: BTreeMap<u64, Outstanding>,
}

impl Encoder {
    pub fn new(max_capacity: usize) -> Self {
        Self {
            table: DynamicTable::new(max_capacity),
            known_received_count: 0,
            outstanding: BTreeMap::new(),
        }
    }

    pub fn known_received_count(&self) -> u64 {
        self.known_received_count
    }

    pub fn table(&self) -> &DynamicTable {
        &self.table
    }

    /// Applies a `Set Dynamic Table Capacity` instruction and returns the
    /// bytes to queue on the encoder stream.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<Vec<u8>, Error> {
        self.table.set_capacity(capacity)?;
        let mut out = Vec::new();
        // Set Dynamic Table Capacity (Figure 5): 001 Capacity(5+)
        prefix_int::encode(&mut out, 5, 0x20, capacity as u64);
        Ok(out)
    }

    /// Inserts `field`, preferring a name reference into the static or
    /// dynamic table when one is available, and returns the entry's
    /// absolute index plus the instruction bytes to queue on the encoder
    /// stream.
    pub fn insert(&mut self, field: HeaderField) -> Result<(u64, Vec<u8>), Error> {
        let mut out = Vec::new();
        let name_value = field
            .name_str()
            .zip(field.value_str())
            .map(|(n, v)| (String::from(n), String::from(v)));

        if let Some((name, value)) = name_value {
            if let Some(dynamic_index) = self.table.find_name(&name) {
                let relative = self.table.insert_count() - dynamic_index - 1;
                let index = self.table.insert(field)?;
                // Insert With Name Reference, dynamic (Figure 3): 1 T=0 NameIndex(6+)
                prefix_int::encode(&mut out, 6, 0x80, relative);
                encode_value_string(value.as_bytes(), &mut out);
                return Ok((index, out));
            }
            if let Some(static_index) = static_table::find_name(&name) {
                let index = self.table.insert(field)?;
                // Insert With Name Reference, static (Figure 3): 1 T=1 NameIndex(6+)
                prefix_int::encode(&mut out, 6, 0xc0, static_index as u64);
                encode_value_string(value.as_bytes(), &mut out);
                return Ok((index, out));
            }
        }

        let name = field.name.clone();
        let value = field.value.clone();
        let index = self.table.insert(field)?;
        // Insert With Literal Name (Figure 4): 01 H=0 NameLen(5+)
        prefix_int::encode(&mut out, 5, 0x40, name.len() as u64);
        out.extend_from_slice(&name);
        encode_value_string(&value, &mut out);
        Ok((index, out))
    }

    /// Duplicates an existing entry (RFC 9204 §4.3.4) and returns its new
    /// absolute index plus the instruction bytes.
    pub fn duplicate(&mut self, absolute_index: u64) -> Result<(u64, Vec<u8>), Error> {
        let relative = self.table.insert_count() - absolute_index - 1;
        let new_index = self.table.duplicate(absolute_index)?;
        let mut out = Vec::new();
        // Duplicate (Figure 12): 000 Index(5+)
        prefix_int::encode(&mut out, 5, 0x00, relative);
        Ok((new_index, out))
    }

    /// Encodes a field section for `stream_id`, referencing dynamic-table
    /// entries where an exact or name match already exists. Entries used are
    /// acquired until the corresponding Section Acknowledgment arrives.
    pub fn encode_field_section(&mut self, stream_id: u64, fields: &[HeaderField]) -> Vec<u8> {
        let base = self.table.insert_count();
        let mut referenced = Vec::new();
        let mut required_insert_count = 0u64;
        let mut lines = Vec::new();

        for field in fields {
            encode_field(field, &self.table, base, &mut lines, &mut referenced, &mut required_insert_count);
        }

        for &index in &referenced {
            let _ = self.table.acquire(index);
        }
        if !referenced.is_empty() {
            self.outstanding.insert(
                stream_id,
                Outstanding {
                    required_insert_count,
                    referenced,
                },
            );
        }

        let mut out = Vec::new();
        let max_entries = self.table.max_entries();
        let encoded_ric = encode_required_insert_count(required_insert_count, max_entries.max(1));
        prefix_int::encode(&mut out, 8, 0x00, encoded_ric);

        if required_insert_count == 0 {
            prefix_int::encode(&mut out, 7, 0x00, 0);
        } else {
            // Base == required_insert_count for entries inserted by this call;
            // delta is always 0 since Base is taken at encode time.
            let delta = base - required_insert_count;
            prefix_int::encode(&mut out, 7, 0x00, delta);
        }

        out.extend_from_slice(&lines);
        out
    }

    /// Applies an incoming Section Acknowledgment: releases the references
    /// this stream's field section took and advances `known_received_count`.
    pub fn on_section_acknowledged(&mut self, stream_id: u64) {
        if let Some(outstanding) = self.outstanding.remove(&stream_id) {
            for index in outstanding.referenced {
                self.table.release(index);
            }
            if outstanding.required_insert_count > self.known_received_count {
                self.known_received_count = outstanding.required_insert_count;
            }
        }
    }

    /// Applies an incoming Stream Cancellation: releases references without
    /// advancing `known_received_count`.
    pub fn on_stream_cancelled(&mut self, stream_id: u64) {
        if let Some(outstanding) = self.outstanding.remove(&stream_id) {
            for index in outstanding.referenced {
                self.table.release(index);
            }
        }
    }

    /// Applies an incoming Insert Count Increment.
    pub fn on_insert_count_increment(&mut self, increment: u64) {
        self.known_received_count += increment;
    }
}

fn encode_field(
    field: &HeaderField,
    table: &DynamicTable,
    base: u64,
    out: &mut Vec<u8>,
    referenced: &mut Vec<u64>,
    required_insert_count: &mut u64,
) {
    if let (Some(name), Some(value)) = (field.name_str(), field.value_str()) {
        if let Some(index) = table.find(name, value) {
            referenced.push(index);
            *required_insert_count = (*required_insert_count).max(index + 1);
            let relative = base - index - 1;
            // Indexed Field Line, dynamic (Figure 6): 1 T=0 Index(6+)
            prefix_int::encode(out, 6, 0x80, relative);
            return;
        }
        if let Some(index) = static_table::find(name, value) {
            prefix_int::encode(out, 6, 0xc0, index as u64);
            return;
        }
        if let Some(index) = table.find_name(name) {
            referenced.push(index);
            *required_insert_count = (*required_insert_count).max(index + 1);
            let relative = base - index - 1;
            // Literal Field Line With Name Reference, dynamic (Figure 7): 01 N=0 T=0 Index(4+)
            prefix_int::encode(out, 4, 0x40, relative);
            encode_value_string(value.as_bytes(), out);
            return;
        }
        if let Some(index) = static_table::find_name(name) {
            prefix_int::encode(out, 4, 0x50, index as u64);
            encode_value_string(value.as_bytes(), out);
            return;
        }
    }
    // Literal Field Line With Literal Name (Figure 9): 001 N=0 H=0 NameLen(3+)
    prefix_int::encode(out, 3, 0x20, field.name.len() as u64);
    out.extend_from_slice(&field.name);
    encode_value_string(&field.value, out);
}

fn encode_value_string(bytes: &[u8], out: &mut Vec<u8>) {
    prefix_int::encode(out, 7, 0x00, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_entry_is_referenced_as_indexed_dynamic() {
        let mut encoder = Encoder::new(128);
        encoder.set_capacity(128).unwrap();
        let (index, _insns) = encoder.insert(HeaderField::from((":method", "GET"))).unwrap();
        assert_eq!(index, 0);

        let section = encoder.encode_field_section(3, &[HeaderField::from((":method", "GET"))]);
        // Required Insert Count byte must be nonzero since a dynamic entry was referenced.
        assert_ne!(section[0], 0);
        assert!(encoder.table().is_referenced(0));
    }

    #[test]
    fn section_ack_releases_references_and_advances_known_received_count() {
        let mut encoder = Encoder::new(128);
        encoder.set_capacity(128).unwrap();
        encoder.insert(HeaderField::from((":method", "GET"))).unwrap();
        encoder.encode_field_section(3, &[HeaderField::from((":method", "GET"))]);
        assert!(encoder.table().is_referenced(0));

        encoder.on_section_acknowledged(3);
        assert!(!encoder.table().is_referenced(0));
        assert_eq!(encoder.known_received_count(), 1);
    }

    #[test]
    fn fields_without_a_dynamic_match_fall_back_to_static_or_literal() {
        let mut encoder = Encoder::new(128);
        encoder.set_capacity(128).unwrap();
        let section = encoder.encode_field_section(5, &[HeaderField::new("x-custom", "abc")]);
        assert_eq!(section[0], 0); // no dynamic reference, so Required Insert Count == 0
    }
}
