// SPDX-License-Identifier: Apache-2.0

use super::StreamId;

/// An Iterator over Stream Ids of a particular type.
#[derive(Debug, Clone, Copy)]
pub struct StreamIter {
    start_stream_id: StreamId,
    max_stream_id: StreamId,
    finished: bool,
}

impl StreamIter {
    #[inline]
    pub fn new(start_stream_id: StreamId, max_stream_id: StreamId) -> Self {
        debug_assert_eq!(start_stream_id.stream_type(), max_stream_id.stream_type());
        debug_assert_eq!(start_stream_id.initiator(), max_stream_id.initiator());
        debug_assert!(start_stream_id <= max_stream_id);

        Self {
            start_stream_id,
            max_stream_id,
            finished: false,
        }
    }

    #[inline]
    pub fn max_stream_id(self) -> StreamId {
        self.max_stream_id
    }
}

impl Iterator for StreamIter {
    type Item = StreamId;

    fn next(&mut self) -> Option<Self::Item> {
        // short circuit when finished
        if self.finished {
            return None;
        }

        match self.start_stream_id.cmp(&self.max_stream_id) {
            core::cmp::Ordering::Less => {
                let ret = self.start_stream_id;
                // The Stream ID can be expected to be valid, since `max_stream_id`
                // is a valid `StreamId` and all IDs we iterate over are lower.
                self.start_stream_id = self
                    .start_stream_id
                    .next_of_type()
                    .expect("Expect a valid Stream ID");
                Some(ret)
            }
            core::cmp::Ordering::Equal => {
                // Avoid incrementing beyond `max_stream_id` and mark finished to
                // to avoid returning max value again
                self.finished = true;
                Some(self.start_stream_id)
            }
            core::cmp::Ordering::Greater => {
                debug_assert!(false, "The `new` method should verify valid ranges");

                // finished
                self.finished = true;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{endpoint, stream::StreamType, varint::VarInt};

    #[test]
    fn iterates_over_range() {
        let start = StreamId::initial(endpoint::Type::Client, StreamType::Bidirectional);
        let max = StreamId::nth(endpoint::Type::Client, StreamType::Bidirectional, 3).unwrap();

        let ids: Vec<_> = StreamIter::new(start, max).collect();
        assert_eq!(ids.len(), 4);
        assert_eq!(ids[0], start);
        assert_eq!(ids[3], max);
    }

    #[test]
    fn single_id_range() {
        let id = StreamId::from_varint(VarInt::from_u32(0));
        let ids: Vec<_> = StreamIter::new(id, id).collect();
        assert_eq!(ids, vec![id]);
    }
}
