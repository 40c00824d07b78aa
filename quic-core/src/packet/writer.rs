// SPDX-License-Identifier: Apache-2.0

//! Bounded packet payload writer and per-packet frame-category tracking.
//!
//! The loss-recovery module classifies a sent packet (ack-eliciting? path-probing?
//! carries CRYPTO? carries a STREAM FIN?) without re-walking its frames; this writer
//! accumulates that bitset as frames are written.

use quic_codec::{Encoder, EncoderBuffer, EncoderLenEstimator, EncoderValue};

/// Frame categories tracked per packet for the loss-recovery module.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameCategory {
    pub ack_eliciting: bool,
    pub path_probing: bool,
    pub contains_crypto: bool,
    pub contains_stream_fin: bool,
    pub contains_handshake_done: bool,
}

impl FrameCategory {
    pub fn merge(&mut self, other: FrameCategory) {
        self.ack_eliciting |= other.ack_eliciting;
        self.path_probing |= other.path_probing;
        self.contains_crypto |= other.contains_crypto;
        self.contains_stream_fin |= other.contains_stream_fin;
        self.contains_handshake_done |= other.contains_handshake_done;
    }
}

/// A frame could not be written into the remaining packet space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InsufficientSpace;

/// The minimum length an encoded packet's unprotected payload must reach so that
/// header-protection sampling always has enough ciphertext to read from, regardless
/// of the packet-number wire length chosen by the caller.
///
/// RFC 9000 §17.2 requires the payload be long enough that the sample offset (4
/// bytes past the longest possible packet number) plus the 16-byte sample itself
/// never runs past the end of the packet.
pub const HEADER_PROTECTION_SAMPLE_MIN_LEN: usize = 4 + 16;

/// Wraps a bounded byte buffer, accumulating the frame-category bitset as frames
/// are written so the packet doesn't need to be re-walked to classify it.
pub struct Writer<'a> {
    buffer: EncoderBuffer<'a>,
    category: FrameCategory,
}

impl<'a> Writer<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self {
            buffer: EncoderBuffer::new(bytes),
            category: FrameCategory::default(),
        }
    }

    pub fn remaining_capacity(&self) -> usize {
        self.buffer.remaining_capacity()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn category(&self) -> FrameCategory {
        self.category
    }

    /// Writes a frame if its encoded size fits the remaining capacity, merging
    /// `category` into the packet's accumulated bitset. Leaves the buffer
    /// untouched on `Err`.
    pub fn write_frame<F: EncoderValue>(
        &mut self,
        frame: &F,
        category: FrameCategory,
    ) -> Result<usize, InsufficientSpace> {
        let mut estimator = EncoderLenEstimator::new(self.remaining_capacity());
        estimator.encode(frame);
        if estimator.overflowed() {
            return Err(InsufficientSpace);
        }
        let len = estimator.len();
        self.buffer.encode(frame);
        self.category.merge(category);
        Ok(len)
    }

    /// Pads the packet with PADDING frames (single zero bytes) until either
    /// `min_len` or the buffer's capacity is reached, whichever is smaller.
    ///
    /// Used to satisfy [`HEADER_PROTECTION_SAMPLE_MIN_LEN`] once the packet number
    /// length for this packet is known.
    pub fn pad_to_min_len(&mut self, min_len: usize) {
        let target = min_len.min(self.buffer.capacity());
        if self.len() < target {
            let count = target - self.len();
            self.buffer.write_repeated(count, 0);
        }
    }

    /// Splits the written prefix from the unused remainder of the backing buffer.
    pub fn split_mut(&mut self) -> (&mut [u8], &mut [u8]) {
        self.buffer.split_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Ping;

    #[test]
    fn writes_frame_and_merges_category() {
        let mut bytes = [0u8; 16];
        let mut writer = Writer::new(&mut bytes);
        writer
            .write_frame(
                &Ping,
                FrameCategory {
                    ack_eliciting: true,
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(writer.category().ack_eliciting);
        assert_eq!(writer.len(), 1);
    }

    #[test]
    fn rejects_frame_that_does_not_fit() {
        let mut bytes = [0u8; 0];
        let mut writer = Writer::new(&mut bytes);
        assert_eq!(
            writer.write_frame(&Ping, FrameCategory::default()),
            Err(InsufficientSpace)
        );
    }

    #[test]
    fn pad_to_min_len_fills_remaining_space() {
        let mut bytes = [0xffu8; 32];
        let mut writer = Writer::new(&mut bytes);
        writer.write_frame(&Ping, FrameCategory::default()).unwrap();
        writer.pad_to_min_len(HEADER_PROTECTION_SAMPLE_MIN_LEN);
        assert_eq!(writer.len(), HEADER_PROTECTION_SAMPLE_MIN_LEN);
    }

    #[test]
    fn pad_to_min_len_is_capped_by_capacity() {
        let mut bytes = [0u8; 4];
        let mut writer = Writer::new(&mut bytes);
        writer.pad_to_min_len(HEADER_PROTECTION_SAMPLE_MIN_LEN);
        assert_eq!(writer.len(), 4);
    }
}
