// SPDX-License-Identifier: Apache-2.0

//! The request stream state machine (RFC 9114 §4.1): a HEADERS frame, zero
//! or more DATA frames, optionally trailing HEADERS, then the stream ends.

use crate::{
    error::{Code, Error},
    frame::FrameType,
    qpack::HeaderField,
};
use alloc::vec::Vec;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    HeaderSend,
    DataSend,
    HeaderRecv,
    DataRecv,
    End,
}

/// Drives one side of a request/response exchange on a bidirectional
/// stream. The send and receive halves advance independently, matching the
/// stream's independent send/receive flow control.
#[derive(Debug)]
pub struct RequestStream {
    send: State,
    recv: State,
}

impl RequestStream {
    pub fn new() -> Self {
        Self {
            send: State::HeaderSend,
            recv: State::HeaderRecv,
        }
    }

    pub fn send_state(&self) -> State {
        self.send
    }

    pub fn recv_state(&self) -> State {
        self.recv
    }

    /// Call before writing a HEADERS frame. `fin` marks this as the final
    /// frame on the stream (a header-only request or a trailer section).
    pub fn write_header(&mut self, fin: bool) -> Result<(), Error> {
        if self.send != State::HeaderSend {
            return Err(Error::new(Code::H3_INTERNAL_ERROR));
        }
        self.send = if fin { State::End } else { State::DataSend };
        Ok(())
    }

    /// Call before writing a DATA frame.
    pub fn write_data(&mut self, fin: bool) -> Result<(), Error> {
        if self.send != State::DataSend {
            return Err(Error::new(Code::H3_INTERNAL_ERROR));
        }
        if fin {
            self.send = State::End;
        }
        Ok(())
    }

    /// Call as each frame arrives on the receive side, in order.
    pub fn on_frame(&mut self, frame_type: FrameType, fin: bool) -> Result<(), Error> {
        match (self.recv, frame_type) {
            (State::HeaderRecv, FrameType::Headers) => {
                self.recv = if fin { State::End } else { State::DataRecv };
                Ok(())
            }
            (State::DataRecv, FrameType::Data) => {
                if fin {
                    self.recv = State::End;
                }
                Ok(())
            }
            (State::DataRecv, FrameType::Headers) => {
                // trailing header section
                self.recv = State::End;
                Ok(())
            }
            (State::DataRecv, FrameType::Unknown(_)) | (State::HeaderRecv, FrameType::Unknown(_)) => {
                Ok(())
            }
            _ => Err(Error::new(Code::H3_FRAME_UNEXPECTED)),
        }
    }

    /// Call when the receive side hits end-of-stream with no `fin`-carrying
    /// frame header having closed it already (an empty FIN on its own QUIC
    /// STREAM frame).
    pub fn on_end_of_stream(&mut self) -> Result<(), Error> {
        match self.recv {
            State::End => Ok(()),
            State::DataRecv => {
                self.recv = State::End;
                Ok(())
            }
            State::HeaderRecv => Err(Error::new(Code::H3_REQUEST_INCOMPLETE)),
            State::HeaderSend | State::DataSend => unreachable!("recv state never holds a send-only variant"),
        }
    }
}

impl Default for RequestStream {
    fn default() -> Self {
        Self::new()
    }
}

/// A fully assembled request or response: a header section, an optional
/// body, and an optional trailer section.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Message {
    pub headers: Vec<HeaderField>,
    pub body: Vec<u8>,
    pub trailers: Option<Vec<HeaderField>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_before_header_sent_is_internal_error() {
        let mut stream = RequestStream::new();
        assert_eq!(stream.write_data(false), Err(Error::new(Code::H3_INTERNAL_ERROR)));
    }

    #[test]
    fn header_then_data_then_fin_reaches_end() {
        let mut stream = RequestStream::new();
        stream.write_header(false).unwrap();
        assert_eq!(stream.send_state(), State::DataSend);
        stream.write_data(true).unwrap();
        assert_eq!(stream.send_state(), State::End);
    }

    #[test]
    fn header_only_request_ends_immediately() {
        let mut stream = RequestStream::new();
        stream.write_header(true).unwrap();
        assert_eq!(stream.send_state(), State::End);
    }

    #[test]
    fn recv_side_follows_header_then_data_frames() {
        let mut stream = RequestStream::new();
        stream.on_frame(FrameType::Headers, false).unwrap();
        assert_eq!(stream.recv_state(), State::DataRecv);
        stream.on_frame(FrameType::Data, true).unwrap();
        assert_eq!(stream.recv_state(), State::End);
    }

    #[test]
    fn data_frame_before_headers_is_unexpected() {
        let mut stream = RequestStream::new();
        assert_eq!(
            stream.on_frame(FrameType::Data, false),
            Err(Error::new(Code::H3_FRAME_UNEXPECTED))
        );
    }

    #[test]
    fn end_of_stream_while_awaiting_headers_is_incomplete() {
        let mut stream = RequestStream::new();
        assert_eq!(stream.on_end_of_stream(), Err(Error::new(Code::H3_REQUEST_INCOMPLETE)));
    }
}
