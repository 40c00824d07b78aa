// SPDX-License-Identifier: Apache-2.0

//! The control stream's SETTINGS frame (RFC 9114 §7.2.4) and the handful of
//! other frame types a control stream carries.

use crate::{
    error::{Code, Error},
    frame::{Frame, FrameType},
};
use alloc::vec::Vec;
use quic_codec::{DecoderBuffer, Encoder, EncoderBuffer, EncoderValue};
use quic_core::varint::VarInt;

const SETTINGS_QPACK_MAX_TABLE_CAPACITY: u64 = 0x01;
const SETTINGS_MAX_FIELD_SECTION_SIZE: u64 = 0x06;
const SETTINGS_QPACK_BLOCKED_STREAMS: u64 = 0x07;

/// The settings this build advertises and the ones it has learned from a
/// peer. Both table capacity and blocked-streams are pinned at 0: this
/// build's QPACK codec never grows a dynamic table, so it can neither offer
/// capacity for one nor tolerate a peer referencing one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub max_field_section_size: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_field_section_size: None,
        }
    }
}

impl Settings {
    pub fn decode(payload: &[u8]) -> Result<Self, Error> {
        let mut settings = Self::default();
        let mut buffer = DecoderBuffer::new(payload);
        while !buffer.is_empty() {
            let (id, rest) = buffer
                .decode::<VarInt>()
                .map_err(|_| Error::new(Code::H3_FRAME_ERROR))?;
            let (value, rest) = rest
                .decode::<VarInt>()
                .map_err(|_| Error::new(Code::H3_FRAME_ERROR))?;
            buffer = rest;

            match id.as_u64() {
                SETTINGS_MAX_FIELD_SECTION_SIZE => {
                    settings.max_field_section_size = Some(value.as_u64());
                }
                SETTINGS_QPACK_MAX_TABLE_CAPACITY | SETTINGS_QPACK_BLOCKED_STREAMS => {
                    if value.as_u64() != 0 {
                        return Err(Error::new(Code::H3_SETTINGS_ERROR));
                    }
                }
                // Unknown settings identifiers are ignored per RFC 9114 §7.2.4.
                _ => {}
            }
        }
        Ok(settings)
    }

    pub fn encode_frame(&self) -> Frame {
        let mut payload = Vec::new();
        write_setting(&mut payload, SETTINGS_QPACK_MAX_TABLE_CAPACITY, 0);
        write_setting(&mut payload, SETTINGS_QPACK_BLOCKED_STREAMS, 0);
        if let Some(max) = self.max_field_section_size {
            write_setting(&mut payload, SETTINGS_MAX_FIELD_SECTION_SIZE, max);
        }
        Frame::new(FrameType::Settings, payload)
    }
}

fn write_setting(out: &mut Vec<u8>, id: u64, value: u64) {
    let id = VarInt::new(id).expect("settings identifiers fit in a VarInt");
    let value = VarInt::new(value).expect("settings values fit in a VarInt");
    let start = out.len();
    out.resize(start + id.encoding_size() + value.encoding_size(), 0);
    let mut buffer = EncoderBuffer::new(&mut out[start..]);
    buffer.encode(&id);
    buffer.encode(&value);
}

/// Control-stream frame sequencing (RFC 9114 §7.2.4.1): SETTINGS must be the
/// first frame, appear at most once, and CANCEL_PUSH/GOAWAY/MAX_PUSH_ID are
/// only valid after it. HEADERS/DATA/PUSH_PROMISE on a control stream are
/// always a connection error.
#[derive(Debug, PartialEq, Eq)]
pub struct ControlStream {
    settings_received: bool,
}

impl ControlStream {
    pub fn new() -> Self {
        Self {
            settings_received: false,
        }
    }

    pub fn on_frame(&mut self, frame: &Frame) -> Result<Option<Settings>, Error> {
        if !self.settings_received {
            if frame.frame_type != FrameType::Settings {
                return Err(Error::new(Code::H3_MISSING_SETTINGS));
            }
            self.settings_received = true;
            return Settings::decode(&frame.payload).map(Some);
        }

        match frame.frame_type {
            FrameType::Settings => Err(Error::new(Code::H3_FRAME_UNEXPECTED)),
            FrameType::Data | FrameType::Headers | FrameType::PushPromise => {
                Err(Error::new(Code::H3_FRAME_UNEXPECTED))
            }
            FrameType::CancelPush | FrameType::Goaway | FrameType::MaxPushId => Ok(None),
            FrameType::Unknown(_) => Ok(None),
        }
    }
}

impl Default for ControlStream {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_encode_only_qpack_limits() {
        let frame = Settings::default().encode_frame();
        let decoded = Settings::decode(&frame.payload).unwrap();
        assert_eq!(decoded, Settings::default());
    }

    #[test]
    fn max_field_section_size_round_trips() {
        let settings = Settings {
            max_field_section_size: Some(16_384),
        };
        let frame = settings.encode_frame();
        assert_eq!(Settings::decode(&frame.payload).unwrap(), settings);
    }

    #[test]
    fn nonzero_qpack_table_capacity_from_peer_is_an_error() {
        let mut payload = Vec::new();
        write_setting(&mut payload, SETTINGS_QPACK_MAX_TABLE_CAPACITY, 4096);
        assert_eq!(Settings::decode(&payload), Err(Error::new(Code::H3_SETTINGS_ERROR)));
    }

    #[test]
    fn non_settings_frame_before_settings_is_missing_settings_error() {
        let mut control = ControlStream::new();
        let frame = Frame::new(FrameType::Goaway, alloc::vec![0x00]);
        assert_eq!(control.on_frame(&frame), Err(Error::new(Code::H3_MISSING_SETTINGS)));
    }

    #[test]
    fn second_settings_frame_is_unexpected() {
        let mut control = ControlStream::new();
        let settings_frame = Settings::default().encode_frame();
        control.on_frame(&settings_frame).unwrap();
        assert_eq!(
            control.on_frame(&settings_frame),
            Err(Error::new(Code::H3_FRAME_UNEXPECTED))
        );
    }

    #[test]
    fn headers_on_control_stream_is_unexpected() {
        let mut control = ControlStream::new();
        control.on_frame(&Settings::default().encode_frame()).unwrap();
        let frame = Frame::new(FrameType::Headers, Vec::new());
        assert_eq!(control.on_frame(&frame), Err(Error::new(Code::H3_FRAME_UNEXPECTED)));
    }
}
