// SPDX-License-Identifier: Apache-2.0

//! STREAM/RESET_STREAM emission, flow control, and retransmission for one send
//! stream (RFC 9000 §2.2, §3.1, §3.5, §4, §19.4, §19.8).

use crate::{
    application,
    frame::{ResetStream, StreamMut},
    packet::writer::{FrameCategory, InsufficientSpace, Writer},
    recovery::{
        self,
        resend::{RetransmitStatus, SendOutcome},
        Observer,
    },
    stream::{flow::Limiter, state},
    varint::VarInt,
};
use alloc::vec::Vec;
use core::convert::TryFrom;

/// A state-machine transition failed; see [`crate::state::Error`].
pub type Error = crate::state::Error<state::Sender>;

/// The largest STREAM fragment this engine will stage in one `send` call.
///
/// Bounded by typical path MTUs; a fragment never needs to be larger than one
/// packet's payload.
const MAX_FRAGMENT_LEN: usize = 1500;

/// One (offset, bytes, fin) retransmission granule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    pub offset: VarInt,
    pub data: Vec<u8>,
    pub fin: bool,
}

/// Which limiter blocked a send attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Blocked {
    Stream,
    Connection,
}

/// The outcome of one `SendStream::send` call.
#[derive(Debug, PartialEq, Eq)]
pub enum SendStatus {
    /// A STREAM or RESET_STREAM frame of this many bytes of payload was written.
    Sent(usize),
    /// Nothing was written; the named limiter has no room left.
    Blocked(Blocked),
    /// Nothing was written because the frame, even at its smallest, didn't fit.
    NoCapacity,
    /// The stream has nothing left to send (already finished or reset).
    Done,
}

/// Supplies the bytes a [`SendStream`] has buffered beyond its send cursor.
///
/// The engine never owns application data directly; it pulls only as much as
/// it is about to charge against the flow-control limiters and fragment it
/// into the registry for retransmission.
pub trait Source {
    /// Bytes still available to send beyond the current cursor.
    fn remaining(&self) -> u64;
    /// Copies up to `dest.len()` bytes starting at the send cursor into `dest`.
    /// Returns the number of bytes copied.
    fn read(&mut self, dest: &mut [u8]) -> usize;
    /// True once the final byte of the stream has been queued by the application.
    fn is_fin_known(&self) -> bool;
}

/// Drives STREAM frame emission, RESET_STREAM, and fragment retransmission for
/// one send stream.
pub struct SendStream {
    state: state::Sender,
    send_limit: Limiter,
    sent_bytes: u64,
    reset_error: Option<application::Error>,
    registry: recovery::Registry<Fragment>,
}

impl SendStream {
    pub fn new(initial_send_limit: u64) -> Self {
        Self {
            state: state::Sender::default(),
            send_limit: Limiter::new(initial_send_limit),
            sent_bytes: 0,
            reset_error: None,
            registry: recovery::Registry::new(),
        }
    }

    pub fn state(&self) -> &state::Sender {
        &self.state
    }

    pub fn sent_bytes(&self) -> u64 {
        self.sent_bytes
    }

    /// A MAX_STREAM_DATA frame raised the peer-imposed send limit.
    pub fn on_max_stream_data(&mut self, limit: u64) {
        self.send_limit.on_limit_received(limit);
    }

    /// The local application cancels the stream.
    pub fn request_reset(&mut self, error: application::Error) -> Result<(), Error> {
        self.state.on_queue_reset()?;
        self.reset_error.get_or_insert(error);
        Ok(())
    }

    /// A STOP_SENDING frame arrived from the peer (RFC 9000 §3.5): the stream
    /// must be reset using the peer's code, unless a local reset already won.
    pub fn on_stop_sending(&mut self, peer_error: application::Error) -> Result<(), Error> {
        self.reset_error.get_or_insert(peer_error);
        self.state.on_queue_reset()
    }

    /// A RESET_STREAM this endpoint sent was acknowledged.
    pub fn on_reset_acked(&mut self) -> Result<(), Error> {
        self.state.on_recv_reset_ack()
    }

    /// Every outstanding fragment and reset request was acknowledged.
    pub fn on_all_acked(&mut self) -> Result<(), Error> {
        self.state.on_recv_all_acks()
    }

    /// Implements the emission contract: sizes and writes the largest STREAM
    /// frame that fits under the fairness cap and both flow-control limits,
    /// charging them atomically with the write.
    pub fn send(
        &mut self,
        writer: &mut Writer<'_>,
        stream_id: VarInt,
        fairness_cap: u64,
        conn_limit: &mut Limiter,
        source: &mut dyn Source,
    ) -> SendStatus {
        if let Some(error) = self.reset_error {
            return match self.send_reset(writer, stream_id, error) {
                Ok(len) => SendStatus::Sent(len),
                Err(InsufficientSpace) => SendStatus::NoCapacity,
            };
        }

        if self.state.is_terminal() {
            return SendStatus::Done;
        }

        let remaining = source.remaining();
        let fin_known = source.is_fin_known();

        if remaining == 0 && !fin_known {
            return SendStatus::Done;
        }

        let offset = VarInt::new(self.sent_bytes).expect("stream offset exceeds varint range");
        // `try_fit` can only size a frame once its data is in hand, but reading from
        // `source` is destructive (it drains the application buffer) — so the packet's
        // real budget must bound the read itself, not just the write that follows it.
        let packet_avail = crate::frame::stream::max_fitting_payload(writer.remaining_capacity(), stream_id, offset);

        let stream_avail = self.send_limit.available();
        let conn_avail = conn_limit.available();
        let available = fairness_cap
            .min(remaining)
            .min(stream_avail)
            .min(conn_avail)
            .min(MAX_FRAGMENT_LEN as u64)
            .min(packet_avail as u64) as usize;

        let fin_eligible = fin_known && available as u64 == remaining;

        if available == 0 && !fin_eligible {
            return if stream_avail == 0 {
                SendStatus::Blocked(Blocked::Stream)
            } else if conn_avail == 0 {
                SendStatus::Blocked(Blocked::Connection)
            } else {
                SendStatus::NoCapacity
            };
        }

        let mut buf = [0u8; MAX_FRAGMENT_LEN];
        let filled = source.read(&mut buf[..available]);

        let mut frame = StreamMut {
            stream_id,
            offset,
            is_last_frame: false,
            is_fin: fin_eligible,
            data: &mut buf[..filled],
        };

        let data_len = match frame.try_fit(writer.remaining_capacity()) {
            Ok(len) => len,
            Err(_) => return SendStatus::NoCapacity,
        };
        if data_len < filled {
            frame.is_fin = false;
        }
        frame.data = &mut buf[..data_len];
        let is_fin = frame.is_fin;

        let category = FrameCategory {
            ack_eliciting: true,
            contains_stream_fin: is_fin,
            ..Default::default()
        };
        if writer.write_frame(&frame, category).is_err() {
            return SendStatus::NoCapacity;
        }

        self.send_limit
            .charge(data_len as u64)
            .expect("charge is bounded by available() above");
        conn_limit
            .charge(data_len as u64)
            .expect("charge is bounded by available() above");

        if data_len > 0 && matches!(self.state, state::Sender::Ready) {
            let _ = self.state.on_send_stream();
        }
        if is_fin {
            let _ = self.state.on_send_fin();
        }
        self.sent_bytes += data_len as u64;

        self.registry.insert(
            Fragment {
                offset,
                data: buf[..data_len].to_vec(),
                fin: is_fin,
            },
            Observer::new(),
        );

        SendStatus::Sent(data_len)
    }

    fn send_reset(
        &mut self,
        writer: &mut Writer<'_>,
        stream_id: VarInt,
        error: application::Error,
    ) -> Result<usize, InsufficientSpace> {
        let frame = ResetStream {
            stream_id,
            application_error_code: error.into(),
            final_size: VarInt::try_from(self.sent_bytes).unwrap_or(VarInt::MAX),
        };
        let len = writer.write_frame(
            &frame,
            FrameCategory {
                ack_eliciting: true,
                ..Default::default()
            },
        )?;
        let _ = self.state.on_send_reset();
        Ok(len)
    }

    /// Re-fits lost fragments into the current packet, splitting the tail back
    /// into the registry when a fragment doesn't fit whole.
    pub fn retransmit(&mut self, writer: &mut Writer<'_>, stream_id: VarInt) -> RetransmitStatus {
        self.registry.retransmit(|fragment, save_new| {
            let mut data = fragment.data.clone();
            let capacity = writer.remaining_capacity();

            let mut frame = StreamMut {
                stream_id,
                offset: fragment.offset,
                is_last_frame: false,
                is_fin: fragment.fin,
                data: &mut data[..],
            };

            let data_len = match frame.try_fit(capacity) {
                Ok(len) => len,
                Err(_) => return SendOutcome::NoCapacity,
            };

            let is_fin = fragment.fin && data_len == data.len();
            frame.is_fin = is_fin;
            frame.data = &mut data[..data_len];

            let category = FrameCategory {
                ack_eliciting: true,
                contains_stream_fin: is_fin,
                ..Default::default()
            };
            if writer.write_frame(&frame, category).is_err() {
                return SendOutcome::NoCapacity;
            }

            if data_len < fragment.data.len() {
                let tail_offset = fragment
                    .offset
                    .checked_add(VarInt::try_from(data_len).unwrap_or(VarInt::ZERO))
                    .unwrap_or(fragment.offset);
                save_new(
                    Fragment {
                        offset: tail_offset,
                        data: fragment.data[data_len..].to_vec(),
                        fin: fragment.fin,
                    },
                    Observer::new(),
                );
            }

            SendOutcome::Ok
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Buffer {
        bytes: Vec<u8>,
        cursor: usize,
        fin: bool,
    }

    impl Source for Buffer {
        fn remaining(&self) -> u64 {
            (self.bytes.len() - self.cursor) as u64
        }

        fn read(&mut self, dest: &mut [u8]) -> usize {
            let n = dest.len().min(self.bytes.len() - self.cursor);
            dest[..n].copy_from_slice(&self.bytes[self.cursor..self.cursor + n]);
            self.cursor += n;
            n
        }

        fn is_fin_known(&self) -> bool {
            self.fin
        }
    }

    #[test]
    fn sends_all_data_with_fin_in_one_call() {
        let mut stream = SendStream::new(1000);
        let mut conn_limit = Limiter::new(1000);
        let mut source = Buffer {
            bytes: alloc::vec![1, 2, 3, 4],
            cursor: 0,
            fin: true,
        };
        let mut bytes = [0u8; 64];
        let mut writer = Writer::new(&mut bytes);

        let status = stream.send(&mut writer, VarInt::from_u8(4), 1000, &mut conn_limit, &mut source);
        assert_eq!(status, SendStatus::Sent(4));
        assert!(stream.state().is_data_sent());
        assert_eq!(conn_limit.used(), 4);
    }

    #[test]
    fn blocks_on_stream_limit() {
        let mut stream = SendStream::new(2);
        let mut conn_limit = Limiter::new(1000);
        let mut source = Buffer {
            bytes: alloc::vec![1, 2, 3, 4],
            cursor: 0,
            fin: true,
        };
        let mut bytes = [0u8; 64];
        let mut writer = Writer::new(&mut bytes);

        stream.send(&mut writer, VarInt::from_u8(4), 1000, &mut conn_limit, &mut source);
        let status = stream.send(&mut writer, VarInt::from_u8(4), 1000, &mut conn_limit, &mut source);
        assert_eq!(status, SendStatus::Blocked(Blocked::Stream));
    }

    #[test]
    fn reset_is_sent_once_requested() {
        let mut stream = SendStream::new(1000);
        let mut conn_limit = Limiter::new(1000);
        let mut source = Buffer {
            bytes: Vec::new(),
            cursor: 0,
            fin: false,
        };
        stream.request_reset(application::Error::new(7).unwrap()).unwrap();

        let mut bytes = [0u8; 64];
        let mut writer = Writer::new(&mut bytes);
        let status = stream.send(&mut writer, VarInt::from_u8(4), 1000, &mut conn_limit, &mut source);
        assert!(matches!(status, SendStatus::Sent(_)));
        assert!(stream.state().is_reset_sent());
    }

    /// Regression for a tight packet budget (other frames already wrote into
    /// `writer` ahead of this stream): the source must never be drained past
    /// what the packet can actually hold, or the excess bytes are lost for
    /// good (no wire write, no retransmission fragment).
    #[test]
    fn never_drains_more_than_the_packet_can_hold() {
        let mut stream = SendStream::new(1000);
        let mut conn_limit = Limiter::new(1000);
        let mut source = Buffer {
            bytes: alloc::vec![1, 2, 3, 4, 5, 6, 7, 8],
            cursor: 0,
            fin: true,
        };

        // A packet with only a handful of bytes left, as if path/crypto/CID
        // frames already claimed the rest of it.
        let mut bytes = [0u8; 6];
        let mut writer = Writer::new(&mut bytes);

        let status = stream.send(&mut writer, VarInt::from_u8(4), 1000, &mut conn_limit, &mut source);
        let sent = match status {
            SendStatus::Sent(n) => n,
            other => panic!("expected Sent, got {other:?}"),
        };
        assert!(sent < 8, "a 6-byte packet cannot hold all 8 source bytes");

        // Every byte not sent on the wire must still be recoverable: either
        // still queued in `source`, or captured for retransmission.
        assert_eq!(source.remaining() as usize + sent, 8);
    }

    #[test]
    fn retransmit_is_a_no_op_with_nothing_outstanding() {
        let mut stream = SendStream::new(1000);
        let mut bytes = [0u8; 64];
        let mut writer = Writer::new(&mut bytes);
        assert_eq!(
            stream.retransmit(&mut writer, VarInt::from_u8(4)),
            RetransmitStatus::Completed
        );
        assert_eq!(writer.len(), 0);
    }
}
