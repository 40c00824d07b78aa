// SPDX-License-Identifier: Apache-2.0

//! Once closing, every `send_tick` re-emits byte-identical CONNECTION_CLOSE
//! payloads, regardless of anything else arriving in the meantime.

mod support;

use quic_core::{endpoint, packet::number::PacketNumberSpace, path, transport};
use quic_transport::{Connection, IoStatus};
use support::{client_params, NoopTls, SequentialIds};

#[test]
fn connection_close_retransmits_identical_bytes() {
    let mut conn = Connection::new(endpoint::Type::Client, client_params(), NoopTls);
    conn.close(transport::Error::FLOW_CONTROL_ERROR.into(), path::Id::HANDSHAKE);

    let mut ids = SequentialIds { next: 0 };

    let mut first = [0u8; 64];
    let status = conn.send_tick(&mut first, path::Id::HANDSHAKE, 0, PacketNumberSpace::ApplicationData, &mut ids);
    let first_len = match status {
        IoStatus::Ok(len) => len,
        other => panic!("expected Ok, got {other:?}"),
    };

    // An unrelated inbound packet between ticks must not perturb the
    // already-captured close payload.
    let _ = conn.on_packet_received(path::Id::HANDSHAKE, false);

    let mut second = [0u8; 64];
    let status = conn.send_tick(&mut second, path::Id::HANDSHAKE, 1, PacketNumberSpace::ApplicationData, &mut ids);
    let second_len = match status {
        IoStatus::Ok(len) => len,
        other => panic!("expected Ok, got {other:?}"),
    };

    assert_eq!(first_len, second_len);
    assert_eq!(&first[..first_len], &second[..second_len]);
}
