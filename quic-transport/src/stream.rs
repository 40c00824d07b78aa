// SPDX-License-Identifier: Apache-2.0

//! A per-connection stream handle: pairs a `quic_core` send/recv engine with
//! the application-facing buffer and queues the requests (`RESET_STREAM`,
//! `STOP_SENDING`) a [`Connection`](crate::Connection) drains on its next
//! send tick.

use crate::buffer::{Buffer, WriteOutcome};
use quic_core::{
    application,
    recovery::Observer,
    stream::{
        recv::RecvStream,
        send::SendStream,
        state, Error as StreamError, StreamId,
    },
};

pub(crate) struct SendHalf {
    pub(crate) engine: SendStream,
    pub(crate) buffer: Buffer,
}

pub(crate) enum StopSendingState {
    Requested(application::Error),
    Sent(application::Error, Observer),
}

pub(crate) struct RecvHalf {
    pub(crate) engine: RecvStream,
    reset_error: Option<application::Error>,
    reset_observed: bool,
    pub(crate) stop_sending: Option<StopSendingState>,
}

impl RecvHalf {
    fn new(initial_recv_limit: u64) -> Self {
        Self {
            engine: RecvStream::new(initial_recv_limit),
            reset_error: None,
            reset_observed: false,
            stop_sending: None,
        }
    }

    pub(crate) fn on_reset(&mut self, error: application::Error) {
        self.reset_error.get_or_insert(error);
    }
}

/// One QUIC stream, as seen by the application: a readable half, a writable
/// half, or both, depending on the stream's type and which endpoint opened it.
pub struct Stream {
    id: StreamId,
    pub(crate) send: Option<SendHalf>,
    pub(crate) recv: Option<RecvHalf>,
}

impl Stream {
    pub(crate) fn new_bidi(id: StreamId, send_limit: u64, recv_limit: u64) -> Self {
        Self {
            id,
            send: Some(SendHalf {
                engine: SendStream::new(send_limit),
                buffer: Buffer::new(),
            }),
            recv: Some(RecvHalf::new(recv_limit)),
        }
    }

    pub(crate) fn new_send_only(id: StreamId, send_limit: u64) -> Self {
        Self {
            id,
            send: Some(SendHalf {
                engine: SendStream::new(send_limit),
                buffer: Buffer::new(),
            }),
            recv: None,
        }
    }

    pub(crate) fn new_recv_only(id: StreamId, recv_limit: u64) -> Self {
        Self {
            id,
            send: None,
            recv: Some(RecvHalf::new(recv_limit)),
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn is_writable(&self) -> bool {
        self.send.is_some()
    }

    pub fn is_readable(&self) -> bool {
        self.recv.is_some()
    }

    /// Queues application bytes for this stream's send half.
    pub fn write(&mut self, data: &[u8], fin: bool) -> Result<WriteOutcome, StreamError> {
        let send = self.send.as_mut().ok_or(StreamError::NonWritable)?;
        if matches!(
            send.engine.state(),
            state::Sender::ResetQueued | state::Sender::ResetSent | state::Sender::ResetRecvd
        ) {
            return Err(StreamError::SendingBlocked);
        }
        send.buffer.write(data, fin).map_err(|_| StreamError::SendAfterFinish)
    }

    /// Copies received bytes into `dest`. Returns the number of bytes copied
    /// and whether this was the last chunk the stream will ever produce.
    pub fn read(&mut self, dest: &mut [u8]) -> Result<(usize, bool), StreamError> {
        let recv = self.recv.as_mut().ok_or(StreamError::NonReadable)?;
        if let Some(error) = recv.reset_error {
            if !recv.reset_observed {
                recv.reset_observed = true;
                recv.engine.on_app_read_reset();
            }
            return Err(StreamError::StreamReset(error));
        }
        let n = recv.engine.on_app_read(dest);
        let eos = recv.engine.state().is_data_read();
        Ok((n, eos))
    }

    /// Copies received bytes into `dest` without consuming them.
    pub fn peek(&self, dest: &mut [u8]) -> Result<usize, StreamError> {
        let recv = self.recv.as_ref().ok_or(StreamError::NonReadable)?;
        if let Some(error) = recv.reset_error {
            return Err(StreamError::StreamReset(error));
        }
        Ok(recv.engine.peek(dest))
    }

    /// Cancels the send half with an application error code.
    pub fn request_reset(&mut self, error: application::Error) -> Result<(), StreamError> {
        let send = self.send.as_mut().ok_or(StreamError::NonWritable)?;
        send.engine.request_reset(error).map_err(|_| StreamError::SendingBlocked)
    }

    /// Asks the peer to stop sending on this stream's receive half.
    pub fn request_stop_sending(&mut self, error: application::Error) -> Result<(), StreamError> {
        let recv = self.recv.as_mut().ok_or(StreamError::NonReadable)?;
        if recv.stop_sending.is_none() {
            recv.stop_sending = Some(StopSendingState::Requested(error));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips_through_the_engines() {
        let mut stream = Stream::new_bidi(StreamId::initial(
            quic_core::endpoint::Type::Client,
            quic_core::stream::StreamType::Bidirectional,
        ), 1000, 1000);
        stream.write(&[1, 2, 3], true).unwrap();
        assert!(stream.is_writable());
        assert!(stream.is_readable());
    }

    #[test]
    fn send_only_stream_rejects_reads() {
        let mut stream = Stream::new_send_only(
            StreamId::initial(quic_core::endpoint::Type::Client, quic_core::stream::StreamType::Unidirectional),
            1000,
        );
        let mut buf = [0u8; 4];
        assert_eq!(stream.read(&mut buf), Err(StreamError::NonReadable));
    }

    #[test]
    fn recv_only_stream_rejects_writes() {
        let mut stream = Stream::new_recv_only(
            StreamId::initial(quic_core::endpoint::Type::Server, quic_core::stream::StreamType::Unidirectional),
            1000,
        );
        assert_eq!(stream.write(&[1], false), Err(StreamError::NonWritable));
    }

    #[test]
    fn write_after_finish_is_rejected() {
        let mut stream = Stream::new_send_only(
            StreamId::initial(quic_core::endpoint::Type::Client, quic_core::stream::StreamType::Unidirectional),
            1000,
        );
        stream.write(&[1], true).unwrap();
        assert_eq!(stream.write(&[2], false), Err(StreamError::SendAfterFinish));
    }
}
