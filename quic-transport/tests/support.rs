// SPDX-License-Identifier: Apache-2.0

//! Shared test-only `Engine`/`IdSource` stand-ins and transport parameters,
//! mirroring the private helpers `quic_transport::connection`'s own unit
//! tests use, since those are not reachable from integration tests.

#![allow(dead_code)]

use quic_core::{
    connection::id::IdSource,
    crypto::handshake::{Engine, Progress},
    packet::number::PacketNumberSpace,
    transport::parameters::TransportParameters,
    varint::VarInt,
};

pub struct NoopTls;

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

    fn pending_send(&mut self, _space: PacketNumberSpace) -> Option<Vec<u8>> {
        None
    }
}

pub struct SequentialIds {
    pub next: u8,
}

impl IdSource for SequentialIds {
    fn generate_id(&mut self, len: usize) -> Vec<u8> {
        let byte = self.next;
        self.next = self.next.wrapping_add(1);
        vec![byte; len]
    }

    fn generate_stateless_reset_token(&mut self) -> [u8; 16] {
        [self.next; 16]
    }

    fn generate_rotation_budget(&mut self, min: u64, max: u64) -> u64 {
        max.max(min)
    }
}

pub fn client_params() -> TransportParameters {
    let mut params = TransportParameters::default();
    params.initial_max_data = VarInt::from_u32(1 << 16);
    params.initial_max_stream_data_bidi_local = VarInt::from_u32(1 << 14);
    params.initial_max_stream_data_bidi_remote = VarInt::from_u32(1 << 14);
    params.initial_max_stream_data_uni = VarInt::from_u32(1 << 14);
    params.initial_max_streams_bidi = VarInt::from_u32(10);
    params.initial_max_streams_uni = VarInt::from_u32(10);
    params
}
