// SPDX-License-Identifier: Apache-2.0

//! The stateful per-connection engine: wires stream multiplexing, flow
//! control, the crypto handshake, connection IDs, path validation, and the
//! close/drain automaton together over one connection's lifetime.

use crate::stream::{Stream, StopSendingState};
use alloc::collections::{BTreeMap, VecDeque};
use quic_core::{
    application,
    connection::{
        self,
        close::{Closer, Source as CloseSource},
        id::{Acceptor, IdSource, Issuer},
    },
    crypto::handshake::{Engine, Handshaker},
    datagram,
    endpoint,
    frame::{self, FrameMut},
    packet::{
        number::PacketNumberSpace,
        writer::{FrameCategory, Writer},
    },
    path::{self, challenge::Validator},
    recovery::resend::RetransmitStatus,
    stream::{flow::Limiter, send::SendStatus, Error as StreamError, StreamId, StreamType},
    transport::{self, parameters::TransportParameters},
    varint::VarInt,
};
use tracing::debug;

/// The outcome of one `Connection::send_tick` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IoStatus {
    /// Bytes were written into the packet.
    Ok(usize),
    /// The connection has nothing left to send right now.
    NoData,
    /// The connection is closed and has already sent its final close packet.
    Done,
}

/// How many bytes of connection-level send budget one stream may consume on a
/// single `send_tick` before yielding to the next stream (round-robin
/// fairness across a single packet's STREAM frames).
const STREAM_FAIRNESS_CAP: u64 = 1500;

/// Bounds of the random per-connection-ID rotation budget (RFC 9000 §9.5):
/// each accepted ID gets a packet budget drawn uniformly from this range
/// rather than a fixed threshold, so an observer can't predict when this
/// endpoint will rotate source addresses.
const CID_ROTATION_MIN_PACKETS: u64 = 1 << 10;
const CID_ROTATION_MAX_PACKETS: u64 = 1 << 13;

/// The per-direction stream-count and per-direction byte limits a peer's
/// transport parameters grant, and the ones this endpoint grants the peer,
/// per RFC 9000 §4.1.
struct StreamLimits {
    /// Streams opened by us, gated against the peer's granted count.
    local_bidi: Limiter,
    local_uni: Limiter,
    /// Streams opened by the peer, gated against what we granted them.
    remote_bidi: Limiter,
    remote_uni: Limiter,
    /// The highest-numbered stream of each (initiator, type) already created,
    /// expressed as the count of streams created so far.
    local_bidi_count: u64,
    local_uni_count: u64,
    remote_bidi_count: u64,
    remote_uni_count: u64,
}

impl StreamLimits {
    fn new() -> Self {
        Self {
            local_bidi: Limiter::new(0),
            local_uni: Limiter::new(0),
            remote_bidi: Limiter::new(0),
            remote_uni: Limiter::new(0),
            local_bidi_count: 0,
            local_uni_count: 0,
            remote_bidi_count: 0,
            remote_uni_count: 0,
        }
    }
}

/// One QUIC connection: the orchestration layer gluing the `quic_core` stream
/// and connection state machines into the application-facing stream and
/// datagram interface.
pub struct Connection<E: Engine> {
    role: endpoint::Type,
    streams: BTreeMap<StreamId, Stream>,
    accept_queue: VecDeque<StreamId>,
    limits: StreamLimits,
    send_limit: Limiter,
    recv_limit: Limiter,
    local_params: TransportParameters,
    peer_params: Option<TransportParameters>,
    handshaker: Handshaker,
    engine: E,
    id_issuer: Issuer,
    id_acceptor: Acceptor,
    path_validator: Validator,
    closer: Closer,
    datagram_send: Option<datagram::Sender>,
    datagram_recv: datagram::Receiver,
    pending_path_responses: VecDeque<(path::Id, [u8; path::challenge::DATA_LEN])>,
    next_unsent_connection_id_seq: u64,
    last_stream_round_robin: Option<StreamId>,
}

impl<E: Engine> Connection<E> {
    pub fn new(role: endpoint::Type, local_params: TransportParameters, engine: E) -> Self {
        let mut limits = StreamLimits::new();
        limits.remote_bidi.raise_limit(local_params.initial_max_streams_bidi.as_u64());
        limits.remote_uni.raise_limit(local_params.initial_max_streams_uni.as_u64());

        let connection_id_len = local_params
            .initial_source_connection_id
            .as_ref()
            .map_or(0, |id| id.len());
        let datagram_recv = datagram::Receiver::new(local_params.max_datagram_frame_size.map(|v| v.as_u64() as usize));
        let active_connection_id_limit = local_params.active_connection_id_limit.as_u64().max(2);

        Self {
            role,
            streams: BTreeMap::new(),
            accept_queue: VecDeque::new(),
            limits,
            send_limit: Limiter::new(local_params.initial_max_data.as_u64()),
            recv_limit: Limiter::new(local_params.initial_max_data.as_u64()),
            local_params,
            peer_params: None,
            handshaker: Handshaker::new(role),
            engine,
            id_issuer: Issuer::new(connection_id_len.max(1), active_connection_id_limit),
            id_acceptor: Acceptor::new(CID_ROTATION_MIN_PACKETS, CID_ROTATION_MAX_PACKETS),
            path_validator: Validator::new(path::Id::HANDSHAKE),
            closer: Closer::new(),
            datagram_send: None,
            datagram_recv,
            pending_path_responses: VecDeque::new(),
            next_unsent_connection_id_seq: 0,
            last_stream_round_robin: None,
        }
    }

    pub fn role(&self) -> endpoint::Type {
        self.role
    }

    pub fn is_closing(&self) -> bool {
        self.closer.is_closing()
    }

    pub fn handshake_confirmed(&self) -> bool {
        self.handshaker.handshake_confirmed()
    }

    /// Applies the peer's transport parameters once decoded from the
    /// handshake, raising the limits they govern.
    pub fn on_peer_transport_parameters(&mut self, params: TransportParameters) -> Result<(), transport::Error> {
        params.validate()?;
        self.limits.local_bidi.raise_limit(params.initial_max_streams_bidi.as_u64());
        self.limits.local_uni.raise_limit(params.initial_max_streams_uni.as_u64());
        self.send_limit.on_limit_received(params.initial_max_data.as_u64());
        if let Some(max_size) = params.max_datagram_frame_size {
            self.datagram_send.get_or_insert_with(|| datagram::Sender::new(64, 3));
            let _ = max_size;
        }
        self.peer_params = Some(params);
        Ok(())
    }

    /// Enables the local endpoint to queue outbound datagrams, if both sides
    /// advertised support.
    pub fn add_datagram(&mut self, data: alloc::vec::Vec<u8>) -> Result<(), datagram::QueueFull> {
        match self.datagram_send.as_mut() {
            Some(sender) => sender.queue(data),
            None => Err(datagram::QueueFull),
        }
    }

    /// Handles an inbound DATAGRAM frame's payload (RFC 9221 §4), decoded by
    /// the caller's packet loop since DATAGRAM is an extension frame outside
    /// the base set `recv_frame` dispatches.
    pub fn on_datagram_data(&mut self, data: &[u8]) -> Result<alloc::vec::Vec<u8>, transport::Error> {
        let datagram_frame = frame::DatagramRef {
            is_last_frame: true,
            data,
        };
        self.datagram_recv
            .on_datagram_frame(datagram_frame)
            .map(|bytes| bytes.to_vec())
    }

    /// Opens a new bidirectional stream initiated by the local endpoint.
    pub fn open_bidi(&mut self) -> Result<StreamId, connection::Error> {
        self.open(StreamType::Bidirectional)
    }

    /// Opens a new unidirectional stream initiated by the local endpoint.
    pub fn open_uni(&mut self) -> Result<StreamId, connection::Error> {
        self.open(StreamType::Unidirectional)
    }

    fn open(&mut self, stream_type: StreamType) -> Result<StreamId, connection::Error> {
        let limiter = match stream_type {
            StreamType::Bidirectional => &mut self.limits.local_bidi,
            StreamType::Unidirectional => &mut self.limits.local_uni,
        };
        if limiter.charge(1).is_err() {
            return Err(transport::Error::STREAM_LIMIT_ERROR.into());
        }

        let count = match stream_type {
            StreamType::Bidirectional => &mut self.limits.local_bidi_count,
            StreamType::Unidirectional => &mut self.limits.local_uni_count,
        };
        let id = StreamId::nth(self.role, stream_type, *count).ok_or(connection::Error::StreamIdExhausted)?;
        *count += 1;

        let peer = self.peer_params.as_ref();
        let stream = match stream_type {
            StreamType::Bidirectional => Stream::new_bidi(
                id,
                peer.map_or(0, |p| p.initial_max_stream_data_bidi_remote.as_u64()),
                self.local_params.initial_max_stream_data_bidi_local.as_u64(),
            ),
            StreamType::Unidirectional => {
                Stream::new_send_only(id, peer.map_or(0, |p| p.initial_max_stream_data_uni.as_u64()))
            }
        };
        self.streams.insert(id, stream);
        Ok(id)
    }

    /// Returns the next peer-initiated stream the application has not yet
    /// accepted, if any.
    pub fn accept(&mut self) -> Option<StreamId> {
        self.accept_queue.pop_front()
    }

    pub fn stream_mut(&mut self, id: StreamId) -> Result<&mut Stream, StreamError> {
        self.streams.get_mut(&id).ok_or(StreamError::InvalidStream)
    }

    /// Creates any not-yet-seen peer-initiated streams up to and including
    /// `id` (RFC 9000 §3.2: referencing a higher-numbered stream implicitly
    /// creates the lower-numbered ones of the same type).
    fn touch_peer_stream(&mut self, id: StreamId) -> Result<(), connection::Error> {
        if self.streams.contains_key(&id) {
            return Ok(());
        }
        if id.initiator() == self.role {
            // We would have created any stream we initiated ourselves already.
            return Err(transport::Error::STREAM_STATE_ERROR.into());
        }

        let stream_type = id.stream_type();
        let (limiter, count) = match stream_type {
            StreamType::Bidirectional => (&mut self.limits.remote_bidi, &mut self.limits.remote_bidi_count),
            StreamType::Unidirectional => (&mut self.limits.remote_uni, &mut self.limits.remote_uni_count),
        };

        loop {
            let candidate =
                StreamId::nth(id.initiator(), stream_type, *count).ok_or(connection::Error::StreamIdExhausted)?;
            if limiter.charge(1).is_err() {
                return Err(transport::Error::STREAM_LIMIT_ERROR.into());
            }
            *count += 1;

            let stream = match stream_type {
                StreamType::Bidirectional => Stream::new_bidi(
                    candidate,
                    self.peer_params
                        .as_ref()
                        .map_or(0, |p| p.initial_max_stream_data_bidi_local.as_u64()),
                    self.local_params.initial_max_stream_data_bidi_remote.as_u64(),
                ),
                StreamType::Unidirectional => {
                    Stream::new_recv_only(candidate, self.local_params.initial_max_stream_data_uni.as_u64())
                }
            };
            self.streams.insert(candidate, stream);
            self.accept_queue.push_back(candidate);

            if candidate == id {
                break;
            }
        }
        Ok(())
    }

    /// Dispatches one decoded frame against connection and stream state.
    ///
    /// `id_source` is only consulted for NEW_CONNECTION_ID frames, to draw
    /// the accepted ID's random rotation budget.
    pub fn recv_frame(
        &mut self,
        frame: FrameMut<'_>,
        space: PacketNumberSpace,
        path: path::Id,
        id_source: &mut dyn IdSource,
    ) -> Result<(), connection::Error> {
        use frame::Frame;

        match frame {
            Frame::Padding(_) | Frame::Ping(_) | Frame::Ack(_) => {
                // ACK range bookkeeping belongs to the loss-recovery collaborator.
            }
            Frame::ResetStream(f) => {
                let id = StreamId::from_varint(f.stream_id);
                self.touch_peer_stream(id)?;
                let stream = self.streams.get_mut(&id).ok_or(transport::Error::STREAM_STATE_ERROR)?;
                let recv = stream.recv.as_mut().ok_or(transport::Error::STREAM_STATE_ERROR)?;
                let error = recv
                    .engine
                    .on_reset_stream(f.final_size.as_u64(), f.application_error_code.into())?;
                recv.on_reset(error);
            }
            Frame::StopSending(f) => {
                let id = StreamId::from_varint(f.stream_id);
                if let Some(stream) = self.streams.get_mut(&id) {
                    if let Some(send) = stream.send.as_mut() {
                        let _ = send.engine.on_stop_sending(f.application_error_code.into());
                    }
                }
            }
            Frame::Crypto(f) => {
                self.handshaker
                    .on_crypto_frame(space, f.offset, f.data.into_less_safe_slice(), &mut self.engine)
                    .map_err(|_| connection::Error::from(transport::Error::PROTOCOL_VIOLATION))?;
            }
            Frame::NewToken(_) => {
                // Address-validation hint for a future connection attempt; no local state to update.
            }
            Frame::Stream(f) => {
                let id = StreamId::from_varint(f.stream_id);
                self.touch_peer_stream(id)?;
                let is_fin = f.is_fin;
                let offset = f.offset;
                let data = f.data.into_less_safe_slice();
                let stream = self.streams.get_mut(&id).ok_or(transport::Error::STREAM_STATE_ERROR)?;
                let recv = stream.recv.as_mut().ok_or(transport::Error::STREAM_STATE_ERROR)?;
                recv.engine.on_stream_frame(offset, data, is_fin, &mut self.recv_limit)?;
            }
            Frame::MaxData(f) => {
                self.send_limit.on_limit_received(f.maximum_data.as_u64());
            }
            Frame::MaxStreamData(f) => {
                let id = StreamId::from_varint(f.stream_id);
                if let Some(stream) = self.streams.get_mut(&id) {
                    if let Some(send) = stream.send.as_mut() {
                        send.engine.on_max_stream_data(f.maximum_stream_data.as_u64());
                    }
                }
            }
            Frame::MaxStreams(f) => {
                let limiter = match f.stream_type {
                    StreamType::Bidirectional => &mut self.limits.local_bidi,
                    StreamType::Unidirectional => &mut self.limits.local_uni,
                };
                limiter.on_limit_received(f.maximum_streams.as_u64());
            }
            Frame::DataBlocked(_) | Frame::StreamDataBlocked(_) | Frame::StreamsBlocked(_) => {
                debug!("peer reported flow-control blockage");
            }
            Frame::NewConnectionId(f) => {
                let retired = self.id_acceptor.on_new_connection_id(
                    f.sequence_number,
                    f.retire_prior_to,
                    f.connection_id.to_vec(),
                    *f.stateless_reset_token,
                    id_source,
                )?;
                if !retired.is_empty() {
                    debug!(count = retired.len(), "connection IDs retired by peer's retire_prior_to");
                }
            }
            Frame::RetireConnectionId(f) => {
                self.id_issuer.on_retire_connection_id(f.sequence_number)?;
            }
            Frame::PathChallenge(f) => {
                self.pending_path_responses.push_back((path, *f.data));
            }
            Frame::PathResponse(f) => {
                self.path_validator.on_path_response(path, *f.data);
            }
            Frame::ConnectionClose(f) => {
                self.closer.on_error(f.into(), CloseSource::Peer, path);
            }
            Frame::HandshakeDone(_) => {
                self.handshaker
                    .on_handshake_done::<E::Error>(space)
                    .map_err(|_| connection::Error::from(transport::Error::PROTOCOL_VIOLATION))?;
            }
        }

        Ok(())
    }

    /// Call once per received packet after its frames have been processed,
    /// with whether the packet contained only probing frames (RFC 9000 §9.1).
    pub fn on_packet_received(&mut self, path: path::Id, is_probing: bool) -> path::challenge::PathAction {
        self.closer.on_peer_packet_received();
        if is_probing {
            path::challenge::PathAction::None
        } else {
            self.path_validator.on_non_probing_packet(path)
        }
    }

    /// Initiates a local close with `error`, to be emitted on the next
    /// `send_tick`.
    pub fn close(&mut self, error: connection::Error, path: path::Id) {
        self.closer.on_error(error, CloseSource::Application, path);
    }

    /// Builds the next outbound packet's payload into `bytes`, in priority
    /// order: close, path validation, crypto handshake data, connection ID
    /// maintenance, datagrams, then stream data.
    pub fn send_tick(
        &mut self,
        bytes: &mut [u8],
        path: path::Id,
        packet_number: u64,
        space: PacketNumberSpace,
        id_source: &mut dyn IdSource,
    ) -> IoStatus {
        if !self.closer.is_closing() {
            if let Err(_err) = self.handshaker.drive(&mut self.engine) {
                self.closer
                    .on_error(transport::Error::INTERNAL_ERROR.into(), CloseSource::Runtime, path);
            }
        }

        if self.closer.is_closing() {
            return match self.closer.send(bytes, space) {
                Some(len) => IoStatus::Ok(len),
                None => IoStatus::Done,
            };
        }

        let mut writer = Writer::new(bytes);

        while let Some((response_path, data)) = self.pending_path_responses.pop_front() {
            if response_path != path {
                continue;
            }
            let frame = frame::PathResponse { data: &data };
            if writer
                .write_frame(
                    &frame,
                    FrameCategory {
                        ack_eliciting: true,
                        path_probing: true,
                        ..Default::default()
                    },
                )
                .is_err()
            {
                self.pending_path_responses.push_front((response_path, data));
                break;
            }
        }

        if let Some(data) = self.path_validator.pending_challenge(path) {
            let frame = frame::PathChallenge { data: &data };
            let _ = writer.write_frame(
                &frame,
                FrameCategory {
                    ack_eliciting: true,
                    path_probing: true,
                    ..Default::default()
                },
            );
        }

        if let Some(written) = self.handshaker.send(&mut writer, space) {
            let _ = written;
        } else {
            self.handshaker.retransmit(&mut writer, space);
        }

        self.id_issuer.top_up(id_source);
        self.send_new_connection_ids(&mut writer);

        if let Some(sender) = self.datagram_send.as_mut() {
            sender.send(&mut writer, packet_number, &mut |_| {});
        }

        self.send_streams(&mut writer);

        let len = writer.len();
        if len == 0 {
            IoStatus::NoData
        } else {
            IoStatus::Ok(len)
        }
    }

    fn send_new_connection_ids(&mut self, writer: &mut Writer<'_>) {
        // Freshly issued IDs sit in the resend registry in `Wait` state, so
        // `Registry::retransmit` (which only re-offers `Lost` entries) never
        // sees their first transmission; send those directly here first.
        for issued in self.id_issuer.issued() {
            if issued.sequence_number.as_u64() < self.next_unsent_connection_id_seq {
                continue;
            }
            let frame = frame::NewConnectionId {
                sequence_number: issued.sequence_number,
                retire_prior_to: VarInt::from_u8(0),
                connection_id: issued.id(),
                stateless_reset_token: &issued.stateless_reset_token,
            };
            if writer
                .write_frame(
                    &frame,
                    FrameCategory {
                        ack_eliciting: true,
                        ..Default::default()
                    },
                )
                .is_err()
            {
                break;
            }
            self.next_unsent_connection_id_seq = issued.sequence_number.as_u64() + 1;
        }

        let pending = self.id_issuer.pending_mut();
        let _ = pending.retransmit(|issued, _save_new| {
            let frame = frame::NewConnectionId {
                sequence_number: issued.sequence_number,
                retire_prior_to: VarInt::from_u8(0),
                connection_id: issued.id(),
                stateless_reset_token: &issued.stateless_reset_token,
            };
            match writer.write_frame(
                &frame,
                FrameCategory {
                    ack_eliciting: true,
                    ..Default::default()
                },
            ) {
                Ok(_) => quic_core::recovery::resend::SendOutcome::Ok,
                Err(_) => quic_core::recovery::resend::SendOutcome::NoCapacity,
            }
        });
    }

    /// Round-robins STREAM frame emission across writable streams so one busy
    /// stream cannot starve the others within a single packet.
    fn send_streams(&mut self, writer: &mut Writer<'_>) {
        let ids: alloc::vec::Vec<StreamId> = self.streams.keys().copied().collect();
        if ids.is_empty() {
            return;
        }

        let start = match self.last_stream_round_robin {
            Some(last) => ids.iter().position(|id| *id == last).map_or(0, |i| (i + 1) % ids.len()),
            None => 0,
        };

        for i in 0..ids.len() {
            let id = ids[(start + i) % ids.len()];
            let Some(stream) = self.streams.get_mut(&id) else { continue };

            if let Some(recv) = stream.recv.as_mut() {
                let resend = match &recv.stop_sending {
                    Some(StopSendingState::Requested(error)) => Some(*error),
                    Some(StopSendingState::Sent(error, observer)) if observer.is_lost() => Some(*error),
                    _ => None,
                };
                if let Some(error) = resend {
                    if recv
                        .engine
                        .request_stop_sending(writer, id.as_varint(), error)
                        .is_ok()
                    {
                        recv.stop_sending = Some(StopSendingState::Sent(error, quic_core::recovery::Observer::new()));
                    }
                }

                let candidate_limit = recv.engine.recv_limit().limit() * 2 + 1;
                if let Some(next_limit) = recv.engine.maybe_broadcast(candidate_limit) {
                    let frame = frame::MaxStreamData {
                        stream_id: id.as_varint(),
                        maximum_stream_data: VarInt::new(next_limit).unwrap_or(VarInt::MAX),
                    };
                    let _ = writer.write_frame(
                        &frame,
                        FrameCategory {
                            ack_eliciting: true,
                            ..Default::default()
                        },
                    );
                }
            }

            let Some(send) = stream.send.as_mut() else { continue };
            match send
                .engine
                .send(writer, id.as_varint(), STREAM_FAIRNESS_CAP, &mut self.send_limit, &mut send.buffer)
            {
                SendStatus::Sent(_) => {
                    self.last_stream_round_robin = Some(id);
                }
                SendStatus::NoCapacity => break,
                SendStatus::Blocked(_) | SendStatus::Done => {
                    let _: RetransmitStatus = send.engine.retransmit(writer, id.as_varint());
                }
            }
        }

        if let Some(next_limit) = {
            if self.recv_limit.should_broadcast() {
                Some(self.recv_limit.limit() * 2 + 1)
            } else {
                None
            }
        } {
            self.recv_limit.raise_limit(next_limit);
            let frame = frame::MaxData {
                maximum_data: VarInt::new(next_limit).unwrap_or(VarInt::MAX),
            };
            let _ = writer.write_frame(
                &frame,
                FrameCategory {
                    ack_eliciting: true,
                    ..Default::default()
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quic_core::crypto::handshake::Progress;

    struct NoopTls;

    impl Engine for NoopTls {
        type Error = ();

        fn provide_quic_data(&mut self, _space: PacketNumberSpace, _data: &[u8]) -> Result<(), ()> {
            Ok(())
        }

        fn accept(&mut self) -> Result<Progress, ()> {
            Ok(Progress::WouldBlock)
        }

        fn connect(&mut self) -> Result<Progress, ()> {
            Ok(Progress::WouldBlock)
        }

        fn pending_send(&mut self, _space: PacketNumberSpace) -> Option<alloc::vec::Vec<u8>> {
            None
        }
    }

    struct SequentialIds {
        next: u8,
    }

    impl IdSource for SequentialIds {
        fn generate_id(&mut self, len: usize) -> alloc::vec::Vec<u8> {
            let byte = self.next;
            self.next = self.next.wrapping_add(1);
            alloc::vec![byte; len]
        }

        fn generate_stateless_reset_token(&mut self) -> [u8; 16] {
            [self.next; 16]
        }

        fn generate_rotation_budget(&mut self, min: u64, max: u64) -> u64 {
            max.max(min)
        }
    }

    fn client_params() -> TransportParameters {
        let mut params = TransportParameters::default();
        params.initial_max_data = VarInt::from_u32(1 << 16);
        params.initial_max_stream_data_bidi_local = VarInt::from_u32(1 << 14);
        params.initial_max_stream_data_bidi_remote = VarInt::from_u32(1 << 14);
        params.initial_max_stream_data_uni = VarInt::from_u32(1 << 14);
        params.initial_max_streams_bidi = VarInt::from_u32(10);
        params.initial_max_streams_uni = VarInt::from_u32(10);
        params
    }

    #[test]
    fn opening_a_bidi_stream_allows_writing_immediately() {
        let mut conn = Connection::new(endpoint::Type::Client, client_params(), NoopTls);
        conn.on_peer_transport_parameters(client_params()).unwrap();
        let id = conn.open_bidi().unwrap();
        let stream = conn.stream_mut(id).unwrap();
        stream.write(&[1, 2, 3], true).unwrap();
    }

    #[test]
    fn opening_streams_past_the_peer_limit_is_rejected() {
        let mut params = client_params();
        params.initial_max_streams_bidi = VarInt::from_u8(1);
        let mut conn = Connection::new(endpoint::Type::Client, client_params(), NoopTls);
        conn.on_peer_transport_parameters(params).unwrap();
        conn.open_bidi().unwrap();
        assert!(conn.open_bidi().is_err());
    }

    #[test]
    fn receiving_a_stream_frame_implicitly_creates_lower_numbered_streams() {
        let mut conn = Connection::new(endpoint::Type::Server, client_params(), NoopTls);
        conn.on_peer_transport_parameters(client_params()).unwrap();

        let id = StreamId::nth(endpoint::Type::Client, StreamType::Bidirectional, 2).unwrap();
        let mut payload = [1u8, 2, 3];
        let frame = frame::Stream {
            stream_id: id.as_varint(),
            offset: VarInt::from_u8(0),
            is_last_frame: true,
            is_fin: true,
            data: quic_codec::DecoderBufferMut::new(&mut payload),
        };
        let mut ids = SequentialIds { next: 0 };
        conn.recv_frame(
            frame::FrameMut::Stream(frame),
            PacketNumberSpace::ApplicationData,
            path::Id::HANDSHAKE,
            &mut ids,
        )
        .unwrap();

        assert_eq!(conn.accept_queue.len(), 3);
        assert!(conn.stream_mut(id).is_ok());
    }

    #[test]
    fn send_tick_emits_connection_close_once_closing() {
        let mut conn = Connection::new(endpoint::Type::Client, client_params(), NoopTls);
        conn.close(transport::Error::INTERNAL_ERROR.into(), path::Id::HANDSHAKE);
        let mut bytes = [0u8; 64];
        let mut ids = SequentialIds { next: 0 };
        let status = conn.send_tick(&mut bytes, path::Id::HANDSHAKE, 0, PacketNumberSpace::ApplicationData, &mut ids);
        assert!(matches!(status, IoStatus::Ok(_)));
    }
}
