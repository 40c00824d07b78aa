// SPDX-License-Identifier: Apache-2.0

//! A single bidi stream, opened by the client, carries "Hello" with FIN to
//! the server in one packet and is read back whole.

mod support;

use quic_core::{
    frame,
    packet::number::PacketNumberSpace,
    path,
};
use quic_transport::Connection;
use support::{client_params, NoopTls, SequentialIds};

#[test]
fn single_bidi_stream_full_exchange() {
    let mut client = Connection::new(quic_core::endpoint::Type::Client, client_params(), NoopTls);
    client.on_peer_transport_parameters(client_params()).unwrap();
    let mut server = Connection::new(quic_core::endpoint::Type::Server, client_params(), NoopTls);
    server.on_peer_transport_parameters(client_params()).unwrap();

    let id = client.open_bidi().unwrap();
    assert_eq!(id.as_varint(), quic_core::varint::VarInt::from_u8(0));
    client.stream_mut(id).unwrap().write(b"Hello", true).unwrap();

    let mut packet = [0u8; 64];
    let mut ids = SequentialIds { next: 0 };
    let status = client.send_tick(&mut packet, path::Id::HANDSHAKE, 0, PacketNumberSpace::ApplicationData, &mut ids);
    let len = match status {
        quic_transport::IoStatus::Ok(len) => len,
        other => panic!("expected Ok, got {other:?}"),
    };

    // Check the frame's fields against the scenario's described bit semantics
    // (OFF absent since offset==0, a length field present, FIN set) without
    // consuming the bytes the server still needs to decode.
    let mut inspect_copy = packet[..len].to_vec();
    {
        let buffer = quic_codec::DecoderBufferMut::new(&mut inspect_copy);
        let (frame, _) = buffer.decode::<frame::FrameMut>().unwrap();
        match frame {
            frame::Frame::Stream(s) => {
                assert_eq!(*s.stream_id, 0);
                assert_eq!(*s.offset, 0);
                assert!(s.is_fin);
                assert_eq!(s.data.len(), 5);
            }
            other => panic!("expected a STREAM frame, got {other:?}"),
        }
    }

    let buffer = quic_codec::DecoderBufferMut::new(&mut packet[..len]);
    let (frame, _) = buffer.decode::<frame::FrameMut>().unwrap();
    let mut server_ids = SequentialIds { next: 0 };
    server
        .recv_frame(frame, PacketNumberSpace::ApplicationData, path::Id::HANDSHAKE, &mut server_ids)
        .unwrap();

    let stream = server.stream_mut(id).unwrap();
    let mut out = [0u8; 16];
    let (n, eos) = stream.read(&mut out).unwrap();
    assert_eq!(&out[..n], b"Hello");
    assert!(eos);
}
