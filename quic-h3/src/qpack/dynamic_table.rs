// SPDX-License-Identifier: Apache-2.0

//! The QPACK dynamic table (RFC 9204 §3.2): a FIFO of (name, value) entries
//! shared between a connection's encoder and decoder tracks, indexed by
//! absolute insertion count and reference-counted per outstanding field
//! section.

use super::field::HeaderField;
use core::fmt;

/// Every entry's accounting overhead (RFC 9204 §3.2.1), charged against
/// capacity in addition to the name and value bytes themselves.
const ENTRY_SIZE_OVERHEAD: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// The entry (plus its 32-byte overhead) cannot fit even in an empty
    /// table of the current capacity.
    EntryTooLarge,
    /// A `Set Dynamic Table Capacity` instruction asked for more than the
    /// negotiated `max_capacity`.
    CapacityExceedsMax,
    /// An absolute or relative index referenced an entry never inserted, or
    /// one already evicted.
    UnknownIndex,
    /// An entry was asked to evict while still referenced by an outstanding
    /// field section.
    EntryInUse,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EntryTooLarge => write!(f, "entry does not fit in the dynamic table's capacity"),
            Self::CapacityExceedsMax => write!(f, "requested capacity exceeds the negotiated maximum"),
            Self::UnknownIndex => write!(f, "dynamic table index is out of range"),
            Self::EntryInUse => write!(f, "dynamic table entry is still referenced"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

struct Entry {
    field: HeaderField,
    ref_count: usize,
}

fn entry_size(field: &HeaderField) -> usize {
    field.name.len() + field.value.len() + ENTRY_SIZE_OVERHEAD
}

/// One connection's dynamic-table state for a single direction (encoder or
/// decoder track). Both tracks use the same structure; which one a
/// particular instance backs is just a matter of who calls `insert`.
pub struct DynamicTable {
    /// Oldest-first; `entries[0]` is the entry at absolute index `base_index`.
    entries: alloc::collections::VecDeque<Entry>,
    /// Absolute index of `entries[0]`, i.e. the count of entries ever evicted.
    base_index: u64,
    capacity: usize,
    max_capacity: usize,
    used: usize,
}

impl DynamicTable {
    pub fn new(max_capacity: usize) -> Self {
        Self {
            entries: alloc::collections::VecDeque::new(),
            base_index: 0,
            capacity: 0,
            max_capacity,
            used: 0,
        }
    }

    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total entries ever inserted; the dynamic table's "Insert Count".
    pub fn insert_count(&self) -> u64 {
        self.base_index + self.entries.len() as u64
    }

    /// RFC 9204 §3.2.3's `MaxEntries`: the most entries the table could ever
    /// hold at `max_capacity`, used by the Required Insert Count encoding.
    pub fn max_entries(&self) -> u64 {
        (self.max_capacity / ENTRY_SIZE_OVERHEAD) as u64
    }

    /// Applies a `Set Dynamic Table Capacity` instruction, evicting oldest
    /// entries as needed. Fails only if unreferenced entries can't be
    /// evicted far enough, or the request exceeds `max_capacity`.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<(), Error> {
        if capacity > self.max_capacity {
            return Err(Error::CapacityExceedsMax);
        }
        self.evict_to_fit(self.used.saturating_sub(capacity))?;
        self.capacity = capacity;
        Ok(())
    }

    fn evict_to_fit(&mut self, mut to_free: usize) -> Result<(), Error> {
        while to_free > 0 {
            let Some(front) = self.entries.front() else {
                return Err(Error::EntryTooLarge);
            };
            if front.ref_count > 0 {
                return Err(Error::EntryInUse);
            }
            let freed = entry_size(&front.field);
            self.entries.pop_front();
            self.base_index += 1;
            self.used -= freed;
            to_free = to_free.saturating_sub(freed);
        }
        Ok(())
    }

    /// Inserts a new entry, evicting the oldest unreferenced entries to make
    /// room if needed. Returns the entry's absolute index.
    pub fn insert(&mut self, field: HeaderField) -> Result<u64, Error> {
        let size = entry_size(&field);
        if size > self.capacity {
            return Err(Error::EntryTooLarge);
        }
        if self.used + size > self.capacity {
            self.evict_to_fit(self.used + size - self.capacity)?;
        }
        let index = self.base_index + self.entries.len() as u64;
        self.used += size;
        self.entries.push_back(Entry { field, ref_count: 0 });
        Ok(index)
    }

    /// Duplicates an existing entry as a fresh insertion (RFC 9204 §3.2.3),
    /// used so a popular entry can be kept alive without growing unbounded
    /// reference counts on the original.
    pub fn duplicate(&mut self, absolute_index: u64) -> Result<u64, Error> {
        let field = self.get(absolute_index)?.clone();
        self.insert(field)
    }

    fn slot(&self, absolute_index: u64) -> Result<usize, Error> {
        if absolute_index < self.base_index {
            return Err(Error::UnknownIndex);
        }
        let slot = (absolute_index - self.base_index) as usize;
        if slot >= self.entries.len() {
            return Err(Error::UnknownIndex);
        }
        Ok(slot)
    }

    pub fn get(&self, absolute_index: u64) -> Result<&HeaderField, Error> {
        let slot = self.slot(absolute_index)?;
        Ok(&self.entries[slot].field)
    }

    /// Marks an entry referenced by an outstanding field section, preventing
    /// its eviction until every reference is released.
    pub fn acquire(&mut self, absolute_index: u64) -> Result<(), Error> {
        let slot = self.slot(absolute_index)?;
        self.entries[slot].ref_count += 1;
        Ok(())
    }

    /// Releases one reference taken by `acquire`.
    pub fn release(&mut self, absolute_index: u64) {
        if let Ok(slot) = self.slot(absolute_index) {
            if self.entries[slot].ref_count > 0 {
                self.entries[slot].ref_count -= 1;
            }
        }
    }

    pub fn is_referenced(&self, absolute_index: u64) -> bool {
        self.slot(absolute_index)
            .map(|slot| self.entries[slot].ref_count > 0)
            .unwrap_or(false)
    }

    /// Finds an exact name/value match, most-recently-inserted first (the
    /// entries a fresh reference is most likely to still find live).
    pub fn find(&self, name: &str, value: &str) -> Option<u64> {
        self.entries
            .iter()
            .enumerate()
            .rev()
            .find(|(_, e)| e.field.name_str() == Some(name) && e.field.value_str() == Some(value))
            .map(|(i, _)| self.base_index + i as u64)
    }

    pub fn find_name(&self, name: &str) -> Option<u64> {
        self.entries
            .iter()
            .enumerate()
            .rev()
            .find(|(_, e)| e.field.name_str() == Some(name))
            .map(|(i, _)| self.base_index + i as u64)
    }
}

/// RFC 9204 §4.5.1.1: encodes a Required Insert Count for the wire, wrapping
/// it into the range `1..=2*max_entries` so it fits regardless of how far
/// the table has grown.
pub fn encode_required_insert_count(required_insert_count: u64, max_entries: u64) -> u64 {
    if required_insert_count == 0 {
        0
    } else {
        (required_insert_count % (2 * max_entries)) + 1
    }
}

/// RFC 9204 §4.5.1.2: reconstructs the Required Insert Count from its wire
/// encoding, given the decoder's current `known_insert_count`. Errors if the
/// encoded value can't correspond to any valid insert count.
pub fn decode_required_insert_count(
    encoded_insert_count: u64,
    max_entries: u64,
    known_insert_count: u64,
) -> Result<u64, Error> {
    if encoded_insert_count == 0 {
        return Ok(0);
    }
    if max_entries == 0 {
        return Err(Error::UnknownIndex);
    }

    let full_range = 2 * max_entries;
    if encoded_insert_count > full_range {
        return Err(Error::UnknownIndex);
    }

    let max_value = known_insert_count + max_entries;
    let max_wrapped = (max_value / full_range) * full_range;
    let mut required_insert_count = max_wrapped + encoded_insert_count - 1;

    if required_insert_count > max_value {
        if required_insert_count < full_range {
            return Err(Error::UnknownIndex);
        }
        required_insert_count -= full_range;
    }

    if required_insert_count == 0 {
        return Err(Error::UnknownIndex);
    }

    Ok(required_insert_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup_round_trips() {
        let mut table = DynamicTable::new(128);
        table.set_capacity(128).unwrap();
        let index = table.insert(HeaderField::from((":method", "GET"))).unwrap();
        assert_eq!(index, 0);
        assert_eq!(table.get(0).unwrap(), &HeaderField::from((":method", "GET")));
        assert_eq!(table.insert_count(), 1);
    }

    #[test]
    fn eviction_requires_entries_to_be_unreferenced() {
        let mut table = DynamicTable::new(64);
        table.set_capacity(64).unwrap();
        let first = table.insert(HeaderField::new("a", "1")).unwrap();
        table.acquire(first).unwrap();
        // "b"/"22222222222222222222222222222" is sized to force eviction of `first`.
        let big = HeaderField::new("b", "2".repeat(40));
        assert_eq!(table.insert(big), Err(Error::EntryInUse));
        table.release(first);
        let big = HeaderField::new("b", "2".repeat(40));
        table.insert(big).unwrap();
        assert_eq!(table.get(first), Err(Error::UnknownIndex));
    }

    #[test]
    fn duplicate_creates_a_new_absolute_index_for_the_same_field() {
        let mut table = DynamicTable::new(256);
        table.set_capacity(256).unwrap();
        let original = table.insert(HeaderField::new("x", "y")).unwrap();
        let dup = table.duplicate(original).unwrap();
        assert_ne!(original, dup);
        assert_eq!(table.get(dup).unwrap(), table.get(original).unwrap());
    }

    #[test]
    fn capacity_cannot_exceed_the_negotiated_maximum() {
        let mut table = DynamicTable::new(64);
        assert_eq!(table.set_capacity(128), Err(Error::CapacityExceedsMax));
    }

    #[test]
    fn required_insert_count_round_trips_below_the_wrap() {
        let max_entries = 10;
        for required in 0..=15u64 {
            let encoded = encode_required_insert_count(required, max_entries);
            let decoded = decode_required_insert_count(encoded, max_entries, required).unwrap();
            assert_eq!(decoded, required);
        }
    }

    #[test]
    fn required_insert_count_zero_encodes_to_zero() {
        assert_eq!(encode_required_insert_count(0, 10), 0);
        assert_eq!(decode_required_insert_count(0, 10, 100).unwrap(), 0);
    }
}
