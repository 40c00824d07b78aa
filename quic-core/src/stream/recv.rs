// SPDX-License-Identifier: Apache-2.0

//! STREAM frame reassembly, receive-side flow control, and STOP_SENDING for one
//! receive stream (RFC 9000 §2.2, §3.2, §3.5, §4, §19.5, §19.8).

use crate::{
    application,
    frame::StopSending,
    packet::writer::{FrameCategory, InsufficientSpace, Writer},
    stream::{flow::Limiter, state},
    transport,
    varint::VarInt,
};
use alloc::{collections::VecDeque, vec::Vec};

/// One contiguous, non-overlapping chunk of bytes waiting to be drained.
struct Entry {
    start: u64,
    data: Vec<u8>,
}

impl Entry {
    fn end(&self) -> u64 {
        self.start + self.data.len() as u64
    }
}

/// Two segments carried bytes for the same range that don't agree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mismatch;

/// An ordered, non-overlapping queue of received-but-undelivered bytes.
///
/// `read_pos` is the offset up to which the consumer has drained data;
/// arriving bytes entirely below it are dropped without inspection.
struct Reassembler {
    entries: VecDeque<Entry>,
    read_pos: u64,
}

impl Reassembler {
    fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            read_pos: 0,
        }
    }

    /// Inserts `data` starting at `start`, merging with and validating against
    /// any overlapping entries already queued.
    fn insert(&mut self, start: u64, mut data: Vec<u8>) -> Result<(), Mismatch> {
        if data.is_empty() {
            return Ok(());
        }

        let end = start + data.len() as u64;
        if end <= self.read_pos {
            // entirely before the cursor
            return Ok(());
        }

        let mut start = start;
        if start < self.read_pos {
            let trim = (self.read_pos - start) as usize;
            data.drain(0..trim);
            start = self.read_pos;
        }
        if data.is_empty() {
            return Ok(());
        }

        let idx = self.entries.partition_point(|e| e.start < start);

        // overlap with the preceding entry
        if idx > 0 {
            let prev = &self.entries[idx - 1];
            if prev.end() > start {
                let local = (start - prev.start) as usize;
                let overlap = (prev.end() - start) as usize;
                if overlap >= data.len() {
                    // entirely duplicated by the previous entry
                    let want = &prev.data[local..local + data.len()];
                    return if want == &data[..] { Ok(()) } else { Err(Mismatch) };
                }
                let want = &prev.data[local..];
                if want != &data[..overlap] {
                    return Err(Mismatch);
                }
                data.drain(0..overlap);
                start += overlap as u64;
            }
        }

        // fold in and validate against any following entries this segment now reaches
        let mut idx = self.entries.partition_point(|e| e.start < start);
        loop {
            let end = start + data.len() as u64;
            let Some(next) = self.entries.get(idx) else { break };
            if next.start > end {
                break;
            }
            if next.start < end {
                let local = (next.start - start) as usize;
                let overlap = (end.min(next.end()) - next.start) as usize;
                if data[local..local + overlap] != next.data[..overlap] {
                    return Err(Mismatch);
                }
            }
            if next.end() > end {
                let extra = (end - next.start) as usize;
                data.extend_from_slice(&next.data[extra..]);
            }
            self.entries.remove(idx);
        }

        self.entries.insert(idx, Entry { start, data });
        Ok(())
    }

    /// True once the queue covers `[read_pos, final_size)` as one contiguous run.
    fn is_fully_received(&self, final_size: u64) -> bool {
        match self.entries.front() {
            Some(first) => first.start == self.read_pos && first.end() >= final_size,
            None => self.read_pos >= final_size,
        }
    }

    /// Drains up to `dest.len()` contiguous bytes starting at `read_pos`.
    fn drain(&mut self, dest: &mut [u8]) -> usize {
        let mut written = 0;
        while written < dest.len() {
            let Some(front) = self.entries.front_mut() else { break };
            if front.start != self.read_pos {
                break;
            }
            let n = (dest.len() - written).min(front.data.len());
            dest[written..written + n].copy_from_slice(&front.data[..n]);
            written += n;
            self.read_pos += n as u64;
            if n == front.data.len() {
                self.entries.pop_front();
            } else {
                front.data.drain(0..n);
                front.start += n as u64;
            }
        }
        written
    }
}

/// Drives STREAM frame reassembly, receive-side flow control, and STOP_SENDING
/// for one receive stream.
pub struct RecvStream {
    state: state::Receiver,
    recv_limit: Limiter,
    final_size: Option<u64>,
    reassembly: Reassembler,
    signaled_complete: bool,
}

impl RecvStream {
    pub fn new(initial_recv_limit: u64) -> Self {
        Self {
            state: state::Receiver::default(),
            recv_limit: Limiter::new(initial_recv_limit),
            final_size: None,
            reassembly: Reassembler::new(),
            signaled_complete: false,
        }
    }

    pub fn state(&self) -> &state::Receiver {
        &self.state
    }

    pub fn recv_limit(&self) -> &Limiter {
        &self.recv_limit
    }

    /// Handles an inbound STREAM frame. Returns `true` the first time this call
    /// completes the stream (the "data fully received" signal fires exactly once).
    pub fn on_stream_frame(
        &mut self,
        offset: VarInt,
        data: &[u8],
        is_fin: bool,
        conn_limit: &mut Limiter,
    ) -> Result<bool, transport::Error> {
        let start = offset.as_u64();
        let end = start
            .checked_add(data.len() as u64)
            .ok_or(transport::Error::FINAL_SIZE_ERROR)?;

        if let Some(final_size) = self.final_size {
            if end > final_size || (is_fin && end != final_size) {
                return Err(transport::Error::FINAL_SIZE_ERROR);
            }
        }

        if end > self.recv_limit.limit() {
            return Err(transport::Error::FLOW_CONTROL_ERROR);
        }
        let delta = end.saturating_sub(self.recv_limit.used());
        self.recv_limit.advance(end);
        let _ = conn_limit.charge(delta);

        if is_fin {
            if self.final_size.is_some_and(|existing| existing != end) {
                return Err(transport::Error::FINAL_SIZE_ERROR);
            }
            self.final_size = Some(end);
            let _ = self.state.on_receive_fin();
        }

        self.reassembly
            .insert(start, data.to_vec())
            .map_err(|_| transport::Error::STREAM_STATE_ERROR)?;

        if let Some(final_size) = self.final_size {
            if !self.signaled_complete && self.reassembly.is_fully_received(final_size) {
                let _ = self.state.on_receive_all_data();
                self.signaled_complete = true;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// A RESET_STREAM arrived from the peer.
    pub fn on_reset_stream(&mut self, final_size: u64, error: application::Error) -> Result<application::Error, transport::Error> {
        if let Some(existing) = self.final_size {
            if existing != final_size {
                return Err(transport::Error::FINAL_SIZE_ERROR);
            }
        }
        self.final_size = Some(final_size);
        let _ = self.state.on_reset();
        Ok(error)
    }

    /// The application has observed the reset and will not read from this
    /// stream again.
    pub fn on_app_read_reset(&mut self) {
        let _ = self.state.on_app_read_reset();
    }

    /// The application has consumed data up to the new read cursor; advances
    /// the local flow-control window and reports whether MAX_STREAM_DATA
    /// should now be broadcast.
    pub fn on_app_read(&mut self, dest: &mut [u8]) -> usize {
        let n = self.reassembly.drain(dest);
        if self.reassembly.entries.is_empty() && self.final_size == Some(self.reassembly.read_pos) {
            let _ = self.state.on_app_read_all_data();
        }
        n
    }

    /// Copies up to `dest.len()` contiguous bytes starting at the read cursor
    /// without consuming them; a later `on_app_read` may return more than
    /// `peek` showed if further frames coalesce the gap in between.
    pub fn peek(&self, dest: &mut [u8]) -> usize {
        let mut written = 0;
        let mut pos = self.reassembly.read_pos;
        for entry in &self.reassembly.entries {
            if entry.start != pos || written == dest.len() {
                break;
            }
            let n = (dest.len() - written).min(entry.data.len());
            dest[written..written + n].copy_from_slice(&entry.data[..n]);
            written += n;
            pos += n as u64;
            if n < entry.data.len() {
                break;
            }
        }
        written
    }

    /// Raises the local receive limit and returns whether a broadcast is due.
    pub fn maybe_broadcast(&mut self, next_limit: u64) -> Option<u64> {
        if self.recv_limit.should_broadcast() {
            self.recv_limit.raise_limit(next_limit);
            Some(next_limit)
        } else {
            None
        }
    }

    /// The local application asks the peer to stop sending.
    pub fn request_stop_sending(
        &mut self,
        writer: &mut Writer<'_>,
        stream_id: VarInt,
        error: application::Error,
    ) -> Result<usize, InsufficientSpace> {
        let frame = StopSending {
            stream_id,
            application_error_code: error.into(),
        };
        writer.write_frame(
            &frame,
            FrameCategory {
                ack_eliciting: true,
                ..Default::default()
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit() -> Limiter {
        Limiter::new(1_000_000)
    }

    #[test]
    fn in_order_frames_reassemble_and_signal_completion_once() {
        let mut stream = RecvStream::new(1_000_000);
        let mut conn_limit = limit();
        assert_eq!(
            stream
                .on_stream_frame(VarInt::from_u8(0), &[1, 2], false, &mut conn_limit)
                .unwrap(),
            false
        );
        assert_eq!(
            stream
                .on_stream_frame(VarInt::from_u8(2), &[3, 4], true, &mut conn_limit)
                .unwrap(),
            true
        );
        assert_eq!(
            stream
                .on_stream_frame(VarInt::from_u8(2), &[3, 4], true, &mut conn_limit)
                .unwrap(),
            false
        );
    }

    #[test]
    fn out_of_order_frames_reassemble() {
        let mut stream = RecvStream::new(1_000_000);
        let mut conn_limit = limit();
        stream
            .on_stream_frame(VarInt::from_u8(2), &[3, 4], true, &mut conn_limit)
            .unwrap();
        let completed = stream
            .on_stream_frame(VarInt::from_u8(0), &[1, 2], false, &mut conn_limit)
            .unwrap();
        assert!(completed);

        let mut out = [0u8; 4];
        assert_eq!(stream.on_app_read(&mut out), 4);
        assert_eq!(out, [1, 2, 3, 4]);
    }

    #[test]
    fn duplicate_retransmission_with_mismatched_bytes_is_rejected() {
        let mut stream = RecvStream::new(1_000_000);
        let mut conn_limit = limit();
        stream
            .on_stream_frame(VarInt::from_u8(0), &[1, 2, 3, 4], false, &mut conn_limit)
            .unwrap();
        let err = stream
            .on_stream_frame(VarInt::from_u8(1), &[9, 9], false, &mut conn_limit)
            .unwrap_err();
        assert_eq!(err, transport::Error::STREAM_STATE_ERROR);
    }

    #[test]
    fn frame_past_known_final_size_is_rejected() {
        let mut stream = RecvStream::new(1_000_000);
        let mut conn_limit = limit();
        stream
            .on_stream_frame(VarInt::from_u8(0), &[1, 2], true, &mut conn_limit)
            .unwrap();
        let err = stream
            .on_stream_frame(VarInt::from_u8(2), &[3], false, &mut conn_limit)
            .unwrap_err();
        assert_eq!(err, transport::Error::FINAL_SIZE_ERROR);
    }

    #[test]
    fn exceeding_the_recv_limit_is_flow_control_error() {
        let mut stream = RecvStream::new(4);
        let mut conn_limit = limit();
        let err = stream
            .on_stream_frame(VarInt::from_u8(0), &[1, 2, 3, 4, 5], false, &mut conn_limit)
            .unwrap_err();
        assert_eq!(err, transport::Error::FLOW_CONTROL_ERROR);
    }

    #[test]
    fn gap_fill_coalesces_with_right_neighbour() {
        let mut stream = RecvStream::new(1_000_000);
        let mut conn_limit = limit();
        stream
            .on_stream_frame(VarInt::from_u8(0), &[1], false, &mut conn_limit)
            .unwrap();
        stream
            .on_stream_frame(VarInt::from_u8(2), &[3], false, &mut conn_limit)
            .unwrap();
        stream
            .on_stream_frame(VarInt::from_u8(1), &[2], true, &mut conn_limit)
            .unwrap();

        let mut out = [0u8; 3];
        assert_eq!(stream.on_app_read(&mut out), 3);
        assert_eq!(out, [1, 2, 3]);
    }

    #[test]
    fn peek_does_not_advance_the_read_cursor() {
        let mut stream = RecvStream::new(1_000_000);
        let mut conn_limit = limit();
        stream
            .on_stream_frame(VarInt::from_u8(0), &[1, 2, 3], false, &mut conn_limit)
            .unwrap();

        let mut peeked = [0u8; 2];
        assert_eq!(stream.peek(&mut peeked), 2);
        assert_eq!(peeked, [1, 2]);

        let mut out = [0u8; 3];
        assert_eq!(stream.on_app_read(&mut out), 3);
        assert_eq!(out, [1, 2, 3]);
    }
}
