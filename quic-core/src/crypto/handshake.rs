// SPDX-License-Identifier: Apache-2.0

//! Drives the TLS handshake across the three encryption levels and the
//! post-handshake HANDSHAKE_DONE lifecycle (RFC 9000 §7, §19.20; RFC 9001 §4.1).

use crate::{
    crypto::stream::{RecvStream, SendStream},
    endpoint,
    frame::HandshakeDone,
    packet::{
        number::PacketNumberSpace,
        writer::{FrameCategory, Writer},
    },
    recovery::Observer,
    transport,
    varint::VarInt,
};

/// Whether driving the TLS implementation made progress or needs more data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    /// The implementation has nothing further to do until more data arrives.
    WouldBlock,
    /// The handshake is complete from the TLS implementation's perspective.
    Complete,
}

/// The abstract interface to a TLS implementation driving the handshake.
///
/// The handshaker is agnostic to which TLS library backs this: it only needs
/// to feed inbound bytes in order, pull outbound bytes per level, and learn
/// when the handshake has finished.
pub trait Engine {
    type Error;

    /// Delivers in-order handshake bytes received at `space` to the TLS
    /// implementation.
    fn provide_quic_data(&mut self, space: PacketNumberSpace, data: &[u8]) -> Result<(), Self::Error>;

    /// Drives the server side of the handshake forward.
    fn accept(&mut self) -> Result<Progress, Self::Error>;

    /// Drives the client side of the handshake forward.
    fn connect(&mut self) -> Result<Progress, Self::Error>;

    /// Pulls any handshake bytes the implementation has queued for
    /// transmission at `space` since the last call.
    fn pending_send(&mut self, space: PacketNumberSpace) -> Option<alloc::vec::Vec<u8>>;
}

/// Errors surfaced while driving the handshake, parameterized over the TLS
/// implementation's own error type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error<E> {
    Transport(transport::Error),
    Tls(E),
}

impl<E> From<transport::Error> for Error<E> {
    fn from(error: transport::Error) -> Self {
        Self::Transport(error)
    }
}

struct Level {
    send: SendStream,
    recv: RecvStream,
}

impl Level {
    fn new() -> Self {
        Self {
            send: SendStream::new(),
            recv: RecvStream::new(),
        }
    }
}

/// Owns the per-level CRYPTO streams and the HANDSHAKE_DONE lifecycle for one
/// connection.
pub struct Handshaker {
    role: endpoint::Type,
    initial: Level,
    handshake: Level,
    application: Level,
    handshake_complete: bool,
    handshake_done_sent: bool,
    handshake_done_observer: Option<Observer>,
    handshake_done_received: bool,
}

impl Handshaker {
    pub fn new(role: endpoint::Type) -> Self {
        Self {
            role,
            initial: Level::new(),
            handshake: Level::new(),
            application: Level::new(),
            handshake_complete: false,
            handshake_done_sent: false,
            handshake_done_observer: None,
            handshake_done_received: false,
        }
    }

    fn level_mut(&mut self, space: PacketNumberSpace) -> &mut Level {
        match space {
            PacketNumberSpace::Initial => &mut self.initial,
            PacketNumberSpace::Handshake => &mut self.handshake,
            PacketNumberSpace::ApplicationData => &mut self.application,
        }
    }

    /// True once the TLS implementation itself has completed the handshake.
    pub fn handshake_complete(&self) -> bool {
        self.handshake_complete
    }

    /// Per RFC 9001 §4.1.2: a server confirms the handshake as soon as it
    /// completes; a client only confirms it upon receiving HANDSHAKE_DONE.
    pub fn handshake_confirmed(&self) -> bool {
        match self.role {
            endpoint::Type::Server => self.handshake_complete,
            endpoint::Type::Client => self.handshake_done_received,
        }
    }

    /// Handles an inbound CRYPTO frame: buffers it, feeds any now-contiguous
    /// bytes to the TLS implementation, and drives the handshake forward.
    pub fn on_crypto_frame<E: Engine>(
        &mut self,
        space: PacketNumberSpace,
        offset: VarInt,
        data: &[u8],
        engine: &mut E,
    ) -> Result<(), Error<E::Error>> {
        let ready = self.level_mut(space).recv.on_crypto_frame(offset, data)?;
        if !ready.is_empty() {
            engine
                .provide_quic_data(space, &ready)
                .map_err(Error::Tls)?;
        }
        self.drive(engine)
    }

    /// Handles an inbound HANDSHAKE_DONE frame.
    ///
    /// A server must never receive one; a client marks the handshake
    /// confirmed.
    pub fn on_handshake_done<E>(&mut self, space: PacketNumberSpace) -> Result<(), Error<E>> {
        if self.role.is_server() {
            return Err(Error::Transport(
                transport::Error::PROTOCOL_VIOLATION.with_frame_type(VarInt::from_u8(HandshakeDone.tag())),
            ));
        }
        if !space.is_application_data() {
            return Err(Error::Transport(
                transport::Error::PROTOCOL_VIOLATION.with_frame_type(VarInt::from_u8(HandshakeDone.tag())),
            ));
        }
        self.handshake_done_received = true;
        Ok(())
    }

    /// Drives the TLS implementation and, once it reports completion, arms
    /// HANDSHAKE_DONE for the server side.
    pub fn drive<E: Engine>(&mut self, engine: &mut E) -> Result<(), Error<E::Error>> {
        if !self.handshake_complete {
            let progress = match self.role {
                endpoint::Type::Server => engine.accept(),
                endpoint::Type::Client => engine.connect(),
            }
            .map_err(Error::Tls)?;

            if progress == Progress::Complete {
                self.handshake_complete = true;
            }
        }

        for space in [
            PacketNumberSpace::Initial,
            PacketNumberSpace::Handshake,
            PacketNumberSpace::ApplicationData,
        ] {
            while let Some(bytes) = engine.pending_send(space) {
                self.level_mut(space).send.queue(&bytes);
            }
        }

        Ok(())
    }

    /// Emits pending CRYPTO data for `space`, and, for a server past
    /// handshake completion, HANDSHAKE_DONE exactly once.
    pub fn send(&mut self, writer: &mut Writer<'_>, space: PacketNumberSpace) -> Option<usize> {
        if let Some(written) = self.level_mut(space).send.send(writer) {
            return Some(written);
        }

        if !(space.is_application_data() && self.role.is_server() && self.handshake_complete) {
            return None;
        }

        // not yet sent, or sent but declared lost: (re-)send and arm a fresh observer.
        let needs_send = match &self.handshake_done_observer {
            None => true,
            Some(observer) => observer.is_lost(),
        };
        if !needs_send {
            return None;
        }

        let written = writer
            .write_frame(
                &HandshakeDone,
                FrameCategory {
                    ack_eliciting: true,
                    contains_handshake_done: true,
                    ..Default::default()
                },
            )
            .ok()?;
        self.handshake_done_sent = true;
        self.handshake_done_observer = Some(Observer::new());
        Some(written)
    }

    /// Retransmits any lost CRYPTO fragments at `space`.
    pub fn retransmit(&mut self, writer: &mut Writer<'_>, space: PacketNumberSpace) {
        self.level_mut(space).send.retransmit(writer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::{collections::VecDeque, vec::Vec};

    struct FakeTls {
        received: Vec<(PacketNumberSpace, Vec<u8>)>,
        outbound: VecDeque<(PacketNumberSpace, Vec<u8>)>,
        complete_after: usize,
    }

    impl Engine for FakeTls {
        type Error = ();

        fn provide_quic_data(&mut self, space: PacketNumberSpace, data: &[u8]) -> Result<(), ()> {
            self.received.push((space, data.to_vec()));
            Ok(())
        }

        fn accept(&mut self) -> Result<Progress, ()> {
            if self.received.len() >= self.complete_after {
                Ok(Progress::Complete)
            } else {
                Ok(Progress::WouldBlock)
            }
        }

        fn connect(&mut self) -> Result<Progress, ()> {
            self.accept()
        }

        fn pending_send(&mut self, space: PacketNumberSpace) -> Option<Vec<u8>> {
            if let Some((s, _)) = self.outbound.front() {
                if *s == space {
                    return self.outbound.pop_front().map(|(_, bytes)| bytes);
                }
            }
            None
        }
    }

    fn server_tls() -> FakeTls {
        FakeTls {
            received: Vec::new(),
            outbound: VecDeque::new(),
            complete_after: 1,
        }
    }

    #[test]
    fn completing_the_handshake_arms_handshake_done_for_servers() {
        let mut handshaker = Handshaker::new(endpoint::Type::Server);
        let mut tls = server_tls();

        handshaker
            .on_crypto_frame(PacketNumberSpace::Initial, VarInt::from_u8(0), b"hello", &mut tls)
            .unwrap();
        assert!(handshaker.handshake_complete());
        assert!(handshaker.handshake_confirmed());

        let mut buf = [0u8; 64];
        let mut writer = Writer::new(&mut buf);
        let written = handshaker.send(&mut writer, PacketNumberSpace::ApplicationData);
        assert_eq!(written, Some(1));
    }

    #[test]
    fn client_is_not_confirmed_until_handshake_done_arrives() {
        let mut handshaker = Handshaker::new(endpoint::Type::Client);
        let mut tls = FakeTls {
            received: Vec::new(),
            outbound: VecDeque::new(),
            complete_after: 1,
        };
        handshaker
            .on_crypto_frame(PacketNumberSpace::Initial, VarInt::from_u8(0), b"hi", &mut tls)
            .unwrap();
        assert!(handshaker.handshake_complete());
        assert!(!handshaker.handshake_confirmed());

        handshaker
            .on_handshake_done::<()>(PacketNumberSpace::ApplicationData)
            .unwrap();
        assert!(handshaker.handshake_confirmed());
    }

    #[test]
    fn server_receiving_handshake_done_is_a_protocol_violation() {
        let mut handshaker = Handshaker::new(endpoint::Type::Server);
        let err = handshaker
            .on_handshake_done::<()>(PacketNumberSpace::ApplicationData)
            .unwrap_err();
        assert!(matches!(err, Error::Transport(e) if e.code == transport::Error::PROTOCOL_VIOLATION.code));
    }
}
