// SPDX-License-Identifier: Apache-2.0

//! Tight packet budgets must segment a send across multiple packets without
//! losing bytes, even though `SendStream::send` has to read from its
//! `Source` before it knows the frame's final encoded size.

use quic_core::{
    frame::{self, stream::StreamMut},
    packet::writer::Writer,
    stream::{
        flow::Limiter,
        send::{SendStatus, SendStream, Source},
    },
    varint::VarInt,
};

struct Fixed {
    bytes: Vec<u8>,
    cursor: usize,
    fin: bool,
}

impl Source for Fixed {
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

fn decode_stream_frame(bytes: &mut [u8]) -> StreamMut<'_> {
    let buffer = quic_codec::DecoderBufferMut::new(bytes);
    let (frame, _remaining) = buffer.decode::<frame::FrameMut>().expect("frame decodes");
    match frame {
        frame::Frame::Stream(stream) => StreamMut::from(stream),
        other => panic!("expected a STREAM frame, got {other:?}"),
    }
}

#[test]
fn tight_budget_segments_across_two_sends() {
    let mut stream = SendStream::new(1000);
    let mut conn_limit = Limiter::new(1000);
    let mut source = Fixed {
        bytes: (0..10u8).collect(),
        cursor: 0,
        fin: true,
    };

    // First packet only has room for 7 bytes total: tag(1) + stream_id(1) +
    // len-prefix(1) leaves 4 bytes of data, and nothing fits the full 10-byte
    // stream, so the frame must not claim FIN.
    let mut first = [0u8; 7];
    let mut writer = Writer::new(&mut first);
    let status = stream.send(&mut writer, VarInt::from_u32(0), 1000, &mut conn_limit, &mut source);
    let sent = match status {
        SendStatus::Sent(n) => n,
        other => panic!("expected Sent, got {other:?}"),
    };
    assert_eq!(sent, 4);
    let len = writer.len();
    let frame = decode_stream_frame(&mut first[..len]);
    assert_eq!(*frame.stream_id, 0);
    assert_eq!(*frame.offset, 0);
    assert!(!frame.is_fin);
    assert_eq!(frame.data, &[0, 1, 2, 3]);

    // Second packet has room for 8 bytes: tag(1) + stream_id(1) +
    // offset(1) leaves 5 bytes of capacity, exactly filled so no length
    // prefix is needed and the frame becomes the packet's last frame. Only 9
    // of the 10 source bytes have gone out, so FIN still can't be claimed.
    let mut second = [0u8; 8];
    let mut writer = Writer::new(&mut second);
    let status = stream.send(&mut writer, VarInt::from_u32(0), 1000, &mut conn_limit, &mut source);
    let sent = match status {
        SendStatus::Sent(n) => n,
        other => panic!("expected Sent, got {other:?}"),
    };
    assert_eq!(sent, 5);
    let len = writer.len();
    assert_eq!(len, 8);
    let frame = decode_stream_frame(&mut second[..len]);
    assert_eq!(*frame.offset, 4);
    assert!(frame.is_last_frame);
    assert!(!frame.is_fin);
    assert_eq!(frame.data, &[4, 5, 6, 7, 8]);

    assert_eq!(source.remaining(), 1);

    // The last byte now fits with room to spare, and the source is drained,
    // so this final send both flushes byte 9 and claims FIN.
    let mut third = [0u8; 16];
    let mut writer = Writer::new(&mut third);
    let status = stream.send(&mut writer, VarInt::from_u32(0), 1000, &mut conn_limit, &mut source);
    let sent = match status {
        SendStatus::Sent(n) => n,
        other => panic!("expected Sent, got {other:?}"),
    };
    assert_eq!(sent, 1);
    let len = writer.len();
    let frame = decode_stream_frame(&mut third[..len]);
    assert_eq!(*frame.offset, 9);
    assert!(frame.is_fin);
    assert_eq!(frame.data, &[9]);
    assert_eq!(source.remaining(), 0);
}
