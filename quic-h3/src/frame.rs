// SPDX-License-Identifier: Apache-2.0

//! HTTP/3 frame headers (RFC 9114 §7.2): a type, a length, and an opaque
//! payload the caller decodes according to the type.

use alloc::vec::Vec;
use quic_codec::{DecoderBuffer, Encoder, EncoderBuffer, EncoderValue};
use quic_core::varint::VarInt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameType {
    Data,
    Headers,
    CancelPush,
    Settings,
    PushPromise,
    Goaway,
    MaxPushId,
    /// A reserved grease type (RFC 9114 §7.2.9) or an application extension
    /// this build doesn't interpret.
    Unknown(VarInt),
}

impl FrameType {
    const DATA: u64 = 0x00;
    const HEADERS: u64 = 0x01;
    const CANCEL_PUSH: u64 = 0x03;
    const SETTINGS: u64 = 0x04;
    const PUSH_PROMISE: u64 = 0x05;
    const GOAWAY: u64 = 0x07;
    const MAX_PUSH_ID: u64 = 0x0d;

    pub fn from_varint(value: VarInt) -> Self {
        match value.as_u64() {
            Self::DATA => Self::Data,
            Self::HEADERS => Self::Headers,
            Self::CANCEL_PUSH => Self::CancelPush,
            Self::SETTINGS => Self::Settings,
            Self::PUSH_PROMISE => Self::PushPromise,
            Self::GOAWAY => Self::Goaway,
            Self::MAX_PUSH_ID => Self::MaxPushId,
            _ => Self::Unknown(value),
        }
    }

    pub fn as_varint(self) -> VarInt {
        let value = match self {
            Self::Data => Self::DATA,
            Self::Headers => Self::HEADERS,
            Self::CancelPush => Self::CANCEL_PUSH,
            Self::Settings => Self::SETTINGS,
            Self::PushPromise => Self::PUSH_PROMISE,
            Self::Goaway => Self::GOAWAY,
            Self::MaxPushId => Self::MAX_PUSH_ID,
            Self::Unknown(value) => value.as_u64(),
        };
        VarInt::new(value).expect("frame type ids fit in a VarInt")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Error;

/// A frame header plus its payload, already fully buffered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub frame_type: FrameType,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(frame_type: FrameType, payload: Vec<u8>) -> Self {
        Self { frame_type, payload }
    }

    /// Parses one frame (type, length-prefixed payload) from the front of
    /// `bytes`, returning it along with the remaining unconsumed bytes.
    pub fn decode(bytes: &[u8]) -> Result<(Self, &[u8]), Error> {
        let buffer = DecoderBuffer::new(bytes);
        let (ty, buffer) = buffer.decode::<VarInt>().map_err(|_| Error)?;
        let (len, buffer) = buffer.decode::<VarInt>().map_err(|_| Error)?;
        let (payload, buffer) = buffer
            .decode_slice(len.as_u64() as usize)
            .map_err(|_| Error)?;
        Ok((
            Self::new(FrameType::from_varint(ty), payload.into_less_safe_slice().to_vec()),
            buffer.into_less_safe_slice(),
        ))
    }

    pub fn encode_to_vec(&self) -> Vec<u8> {
        let type_varint = self.frame_type.as_varint();
        let len_varint = VarInt::new(self.payload.len() as u64).expect("frame payload fits in a VarInt length");
        let mut out = alloc::vec![0u8; type_varint.encoding_size() + len_varint.encoding_size() + self.payload.len()];
        let mut buffer = EncoderBuffer::new(&mut out);
        buffer.encode(&type_varint);
        buffer.encode(&len_varint);
        buffer.write_slice(&self.payload);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_frame_round_trips() {
        let frame = Frame::new(FrameType::Settings, alloc::vec![0x01, 0x02, 0x03]);
        let bytes = frame.encode_to_vec();
        let (decoded, rest) = Frame::decode(&bytes).unwrap();
        assert_eq!(decoded, frame);
        assert!(rest.is_empty());
    }

    #[test]
    fn unknown_frame_type_is_preserved() {
        let grease = VarInt::new(0x1f * 7 + 0x21).unwrap();
        let frame = Frame::new(FrameType::from_varint(grease), Vec::new());
        assert!(matches!(frame.frame_type, FrameType::Unknown(_)));
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let frame = Frame::new(FrameType::Data, alloc::vec![1, 2, 3, 4]);
        let mut bytes = frame.encode_to_vec();
        bytes.truncate(bytes.len() - 1);
        assert_eq!(Frame::decode(&bytes), Err(Error));
    }
}
