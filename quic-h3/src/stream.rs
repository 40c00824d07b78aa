// SPDX-License-Identifier: Apache-2.0

//! Unidirectional stream types (RFC 9114 §6.2) and the per-connection
//! bookkeeping that keeps each singleton stream type to one instance.

use crate::error::{Code, Error};
use quic_core::varint::VarInt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamType {
    Control,
    Push,
    QpackEncoder,
    QpackDecoder,
    /// A reserved or application-defined type this build doesn't interpret;
    /// RFC 9114 §9 requires unknown unidirectional stream types be tolerated,
    /// not rejected.
    Unknown(VarInt),
}

impl StreamType {
    const CONTROL: u64 = 0x00;
    const PUSH: u64 = 0x01;
    const QPACK_ENCODER: u64 = 0x02;
    const QPACK_DECODER: u64 = 0x03;

    pub fn from_varint(value: VarInt) -> Self {
        match value.as_u64() {
            Self::CONTROL => Self::Control,
            Self::PUSH => Self::Push,
            Self::QPACK_ENCODER => Self::QpackEncoder,
            Self::QPACK_DECODER => Self::QpackDecoder,
            _ => Self::Unknown(value),
        }
    }

    pub fn is_singleton(self) -> bool {
        matches!(self, Self::Control | Self::QpackEncoder | Self::QpackDecoder)
    }
}

/// Tracks which of the three singleton unidirectional stream types a peer
/// has already opened. A second instance of any of them is a connection
/// error per RFC 9114 §6.2.
#[derive(Default, Debug)]
pub struct PeerStreams {
    control_seen: bool,
    qpack_encoder_seen: bool,
    qpack_decoder_seen: bool,
}

impl PeerStreams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a newly opened stream of `ty`, returning an error if this
    /// singleton type was already open.
    pub fn open(&mut self, ty: StreamType) -> Result<(), Error> {
        let seen = match ty {
            StreamType::Control => &mut self.control_seen,
            StreamType::QpackEncoder => &mut self.qpack_encoder_seen,
            StreamType::QpackDecoder => &mut self.qpack_decoder_seen,
            StreamType::Push | StreamType::Unknown(_) => return Ok(()),
        };
        if *seen {
            return Err(Error::new(Code::H3_STREAM_CREATION_ERROR));
        }
        *seen = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_type_ids_decode() {
        assert_eq!(StreamType::from_varint(VarInt::from_u8(0)), StreamType::Control);
        assert_eq!(StreamType::from_varint(VarInt::from_u8(1)), StreamType::Push);
        assert_eq!(StreamType::from_varint(VarInt::from_u8(2)), StreamType::QpackEncoder);
        assert_eq!(StreamType::from_varint(VarInt::from_u8(3)), StreamType::QpackDecoder);
    }

    #[test]
    fn unrecognized_type_id_is_tolerated() {
        let ty = StreamType::from_varint(VarInt::from_u32(0x1f + 0x21));
        assert!(matches!(ty, StreamType::Unknown(_)));
    }

    #[test]
    fn second_control_stream_is_rejected() {
        let mut peer = PeerStreams::new();
        peer.open(StreamType::Control).unwrap();
        assert_eq!(
            peer.open(StreamType::Control),
            Err(Error::new(Code::H3_STREAM_CREATION_ERROR))
        );
    }

    #[test]
    fn multiple_push_streams_are_allowed() {
        let mut peer = PeerStreams::new();
        peer.open(StreamType::Push).unwrap();
        peer.open(StreamType::Push).unwrap();
    }
}
