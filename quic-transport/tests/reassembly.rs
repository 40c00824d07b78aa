// SPDX-License-Identifier: Apache-2.0

//! STREAM frames that arrive out of order reassemble into the original byte
//! sequence once the gap closes.

mod support;

use quic_core::{endpoint, frame, packet::number::PacketNumberSpace, path, stream::StreamType, varint::VarInt};
use quic_transport::Connection;
use support::{client_params, NoopTls, SequentialIds};

#[test]
fn out_of_order_frames_reassemble_in_offset_order() {
    let mut server = Connection::new(endpoint::Type::Server, client_params(), NoopTls);
    server.on_peer_transport_parameters(client_params()).unwrap();
    let mut ids = SequentialIds { next: 0 };

    let id = quic_core::stream::StreamId::nth(endpoint::Type::Client, StreamType::Bidirectional, 0).unwrap();

    let mut world = *b"World";
    let frame = frame::Stream {
        stream_id: id.as_varint(),
        offset: VarInt::from_u8(5),
        is_last_frame: true,
        is_fin: true,
        data: quic_codec::DecoderBufferMut::new(&mut world),
    };
    server
        .recv_frame(frame::FrameMut::Stream(frame), PacketNumberSpace::ApplicationData, path::Id::HANDSHAKE, &mut ids)
        .unwrap();

    let mut hello = *b"Hello";
    let frame = frame::Stream {
        stream_id: id.as_varint(),
        offset: VarInt::from_u8(0),
        is_last_frame: true,
        is_fin: false,
        data: quic_codec::DecoderBufferMut::new(&mut hello),
    };
    server
        .recv_frame(frame::FrameMut::Stream(frame), PacketNumberSpace::ApplicationData, path::Id::HANDSHAKE, &mut ids)
        .unwrap();

    let stream = server.stream_mut(id).unwrap();
    let mut out = [0u8; 10];
    let (n, eos) = stream.read(&mut out).unwrap();
    assert_eq!(n, 10);
    assert_eq!(&out, b"HelloWorld");
    assert!(eos);
}
