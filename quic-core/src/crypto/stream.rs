// SPDX-License-Identifier: Apache-2.0

//! Send- and receive-side buffering for one encryption level's CRYPTO stream
//! (RFC 9000 §7.5, §19.6).
//!
//! Unlike an application STREAM, a CRYPTO stream carries no flow control and no
//! FIN: it simply carries handshake bytes reliably and in order for as long as
//! the encryption level is in use.

use crate::{
    frame::Crypto,
    packet::writer::{FrameCategory, Writer},
    recovery::{
        resend::{RetransmitStatus, SendOutcome},
        Observer, Registry,
    },
    transport,
    varint::VarInt,
};
use alloc::{collections::VecDeque, vec::Vec};
use core::convert::TryFrom;

/// Bytes buffered by the peer beyond this are a protocol violation: no TLS
/// implementation needs anywhere near this much unconsumed handshake data
/// in flight at once.
pub const MAX_BUFFERED_BYTES: usize = 64 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
struct Fragment {
    offset: VarInt,
    data: Vec<u8>,
}

/// Appends outbound handshake bytes and emits them as CRYPTO frames.
pub struct SendStream {
    pending: VecDeque<u8>,
    send_offset: u64,
    registry: Registry<Fragment>,
}

impl Default for SendStream {
    fn default() -> Self {
        Self::new()
    }
}

impl SendStream {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            send_offset: 0,
            registry: Registry::new(),
        }
    }

    /// True once every queued byte has been sent and acknowledged.
    pub fn is_flushed(&self) -> bool {
        self.pending.is_empty() && self.registry.is_empty()
    }

    /// Queues bytes produced by the TLS implementation for transmission.
    pub fn queue(&mut self, data: &[u8]) {
        self.pending.extend(data.iter().copied());
    }

    /// Emits one CRYPTO frame carrying as much of the queued data as fits.
    /// Returns the number of bytes written, or `None` if nothing was written
    /// (either nothing is queued or the frame did not fit).
    pub fn send(&mut self, writer: &mut Writer<'_>) -> Option<usize> {
        if self.pending.is_empty() {
            return None;
        }

        let data: Vec<u8> = self.pending.iter().copied().collect();
        let offset = VarInt::new(self.send_offset).ok()?;
        let frame = Crypto { offset, data: &data[..] };
        let data_len = frame.try_fit(writer.remaining_capacity()).ok()?;
        if data_len == 0 {
            return None;
        }

        let frame = Crypto {
            offset,
            data: &data[..data_len],
        };
        writer
            .write_frame(&frame, FrameCategory { ack_eliciting: true, contains_crypto: true, ..Default::default() })
            .ok()?;

        self.pending.drain(0..data_len);
        self.registry.insert(
            Fragment { offset, data: data[..data_len].to_vec() },
            Observer::new(),
        );
        self.send_offset += data_len as u64;
        Some(data_len)
    }

    /// Retransmits any fragments loss recovery has declared lost.
    pub fn retransmit(&mut self, writer: &mut Writer<'_>) -> RetransmitStatus {
        self.registry.retransmit(|fragment, save_new| {
            let capacity = writer.remaining_capacity();
            let frame = Crypto { offset: fragment.offset, data: &fragment.data[..] };
            let data_len = match frame.try_fit(capacity) {
                Ok(len) => len,
                Err(_) => return SendOutcome::NoCapacity,
            };
            if data_len == 0 {
                return SendOutcome::NoCapacity;
            }
            let frame = Crypto {
                offset: fragment.offset,
                data: &fragment.data[..data_len],
            };
            if writer
                .write_frame(&frame, FrameCategory { ack_eliciting: true, contains_crypto: true, ..Default::default() })
                .is_err()
            {
                return SendOutcome::NoCapacity;
            }
            if data_len < fragment.data.len() {
                let tail_offset = fragment
                    .offset
                    .checked_add(VarInt::try_from(data_len).unwrap_or(VarInt::ZERO))
                    .unwrap_or(fragment.offset);
                save_new(
                    Fragment { offset: tail_offset, data: fragment.data[data_len..].to_vec() },
                    Observer::new(),
                );
            }
            SendOutcome::Ok
        })
    }
}

struct Entry {
    start: u64,
    data: Vec<u8>,
}

impl Entry {
    fn end(&self) -> u64 {
        self.start + self.data.len() as u64
    }
}

/// An offset-sorted queue of received-but-undelivered handshake bytes.
///
/// Delivery to the TLS implementation must be strictly in order, so bytes are
/// only handed out once they are contiguous with `read_pos`.
pub struct RecvStream {
    entries: VecDeque<Entry>,
    read_pos: u64,
    buffered: usize,
}

impl Default for RecvStream {
    fn default() -> Self {
        Self::new()
    }
}

impl RecvStream {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            read_pos: 0,
            buffered: 0,
        }
    }

    /// Handles an inbound CRYPTO frame, returning the longest run of bytes
    /// now contiguous with `read_pos`, ready for immediate delivery to the
    /// TLS implementation. The run is empty if this frame only filled a gap
    /// further out than the current read position.
    pub fn on_crypto_frame(&mut self, offset: VarInt, data: &[u8]) -> Result<Vec<u8>, transport::Error> {
        let start = offset.as_u64();
        let end = start
            .checked_add(data.len() as u64)
            .ok_or(transport::Error::CRYPTO_BUFFER_EXCEEDED)?;

        if end <= self.read_pos {
            return Ok(Vec::new());
        }

        if self.buffered.saturating_add(data.len()) > MAX_BUFFERED_BYTES {
            return Err(transport::Error::CRYPTO_BUFFER_EXCEEDED);
        }

        let mut start = start;
        let mut data = data.to_vec();
        if start < self.read_pos {
            let trim = (self.read_pos - start) as usize;
            data.drain(0..trim);
            start = self.read_pos;
        }
        if data.is_empty() {
            return Ok(Vec::new());
        }

        // merge against the preceding entry, if it overlaps
        let idx = self.entries.partition_point(|e| e.start < start);
        if idx > 0 {
            let prev = &self.entries[idx - 1];
            if prev.end() > start {
                let overlap = (prev.end() - start) as usize;
                if overlap >= data.len() {
                    return Ok(Vec::new());
                }
                data.drain(0..overlap);
                start += overlap as u64;
            }
        }

        // merge/skip any following entries this segment now reaches or overlaps
        let mut idx = self.entries.partition_point(|e| e.start < start);
        loop {
            let end = start + data.len() as u64;
            let Some(next) = self.entries.get(idx) else { break };
            if next.start > end {
                break;
            }
            if next.end() > end {
                let extra = (end - next.start) as usize;
                data.extend_from_slice(&next.data[extra..]);
            }
            let removed = self.entries.remove(idx).expect("index was just read via get");
            self.buffered = self.buffered.saturating_sub(removed.data.len());
        }

        self.buffered += data.len();
        self.entries.insert(idx, Entry { start, data });

        Ok(self.drain_contiguous())
    }

    fn drain_contiguous(&mut self) -> Vec<u8> {
        let mut ready = Vec::new();
        while let Some(front) = self.entries.front() {
            if front.start != self.read_pos {
                break;
            }
            let entry = self.entries.pop_front().expect("front() just confirmed an entry exists");
            self.buffered = self.buffered.saturating_sub(entry.data.len());
            self.read_pos += entry.data.len() as u64;
            ready.extend_from_slice(&entry.data);
        }
        ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::writer::Writer;

    #[test]
    fn send_stream_emits_and_retransmits() {
        let mut stream = SendStream::new();
        stream.queue(b"client hello");
        let mut buf = [0u8; 256];
        let mut writer = Writer::new(&mut buf);
        let written = stream.send(&mut writer).unwrap();
        assert_eq!(written, b"client hello".len());

        let mut tiny = [0u8; 0];
        let mut tiny_writer = Writer::new(&mut tiny);
        assert!(stream.send(&mut tiny_writer).is_none());
        // nothing left to queue, but the sent fragment is still awaiting ack
        assert!(!stream.is_flushed());
    }

    #[test]
    fn recv_stream_delivers_in_order_only() {
        let mut recv = RecvStream::new();
        let out_of_order = recv.on_crypto_frame(VarInt::from_u8(5), b"world").unwrap();
        assert!(out_of_order.is_empty());

        let ready = recv.on_crypto_frame(VarInt::from_u8(0), b"hello").unwrap();
        assert_eq!(ready, b"helloworld");
    }

    #[test]
    fn recv_stream_rejects_excessive_buffering() {
        let mut recv = RecvStream::new();
        let huge = alloc::vec![0u8; MAX_BUFFERED_BYTES + 1];
        let err = recv.on_crypto_frame(VarInt::from_u8(1), &huge).unwrap_err();
        assert_eq!(err, transport::Error::CRYPTO_BUFFER_EXCEEDED);
    }
}
