// SPDX-License-Identifier: Apache-2.0

mod protected_packet_number;
pub use protected_packet_number::ProtectedPacketNumber;

//= https://tools.ietf.org/id/draft-ietf-quic-transport-32.txt#12.3
//# The packet number is an integer in the range 0 to 2^62-1.  This
//# number is used in determining the cryptographic nonce for packet
//# protection.  Each endpoint maintains a separate packet number for
//# sending and receiving.

use crate::varint::VarInt;

mod packet_number;
pub use packet_number::PacketNumber;

//= https://tools.ietf.org/id/draft-ietf-quic-transport-32.txt#12.3
//# Packet numbers are limited to this range because they need to be
//# representable in whole in the Largest Acknowledged field of an ACK
//# frame (Section 19.3).  When present in a long or short header
//# however, packet numbers are reduced and encoded in 1 to 4 bytes; see
//# Section 17.1.

mod truncated_packet_number;
pub use truncated_packet_number::TruncatedPacketNumber;

//= https://tools.ietf.org/id/draft-ietf-quic-transport-32.txt#12.3
//# *  Initial space: All Initial packets (Section 17.2.2) are in this
//#    space.
//#
//# *  Handshake space: All Handshake packets (Section 17.2.4) are in
//#    this space.
//#
//# *  Application data space: All 0-RTT (Section 17.2.3) and 1-RTT
//#    (Section 17.3) encrypted packets are in this space.

mod packet_number_space;
pub use packet_number_space::PacketNumberSpace;

//= https://tools.ietf.org/id/draft-ietf-quic-transport-32.txt#17.1
//# Packet numbers are integers in the range 0 to 2^62-1 (Section 12.3).
//# When present in long or short packet headers, they are encoded in 1
//# to 4 bytes.  The number of bits required to represent the packet
//# number is reduced by including only the least significant bits of the
//# packet number.

/// The packet number len is the two least significant bits of the packet tag
pub(crate) const PACKET_NUMBER_LEN_MASK: u8 = 0b11;

mod packet_number_len;
pub use packet_number_len::PacketNumberLen;

mod packet_number_range;
pub use packet_number_range::PacketNumberRange;

//= https://tools.ietf.org/id/draft-ietf-quic-transport-32.txt#17.1
//# the sender MUST use a packet number size able to represent more than
//# twice as large a range than the difference between the largest
//# acknowledged packet and packet number being sent.  A peer receiving
//# the packet will then correctly decode the packet number, unless the
//# packet is delayed in transit such that it arrives after many higher-
//# numbered packets have been received.  An endpoint SHOULD use a large
//# enough packet number encoding to allow the packet number to be
//# recovered even if the packet arrives after packets that are sent
//# afterwards.

fn derive_truncation_range(
    largest_acknowledged_packet_number: PacketNumber,
    packet_number: PacketNumber,
) -> Option<PacketNumberLen> {
    let space = packet_number.space();
    space.assert_eq(largest_acknowledged_packet_number.space());
    packet_number
        .as_u64()
        .checked_sub(largest_acknowledged_packet_number.as_u64())
        .and_then(|value| value.checked_mul(2))
        .and_then(|value| VarInt::new(value).ok())
        .and_then(|value| PacketNumberLen::from_varint(value, space))
}

//= https://tools.ietf.org/id/draft-ietf-quic-transport-32.txt#A
//# DecodePacketNumber(largest_pn, truncated_pn, pn_nbits):
//#    expected_pn  = largest_pn + 1
//#    pn_win       = 1 << pn_nbits
//#    pn_hwin      = pn_win / 2
//#    pn_mask      = pn_win - 1
//#    candidate_pn = (expected_pn & ~pn_mask) | truncated_pn
//#    if candidate_pn <= expected_pn - pn_hwin and
//#       candidate_pn < (1 << 62) - pn_win:
//#       return candidate_pn + pn_win
//#    if candidate_pn > expected_pn + pn_hwin and
//#       candidate_pn >= pn_win:
//#       return candidate_pn - pn_win
//#    return candidate_pn
fn decode_packet_number(
    largest_pn: PacketNumber,
    truncated_pn: TruncatedPacketNumber,
) -> PacketNumber {
    let space = largest_pn.space();
    space.assert_eq(truncated_pn.space());

    let pn_nbits = truncated_pn.bitsize();
    let expected_pn = largest_pn.as_u64() + 1;
    let pn_win: u64 = 1 << pn_nbits;
    let pn_hwin = pn_win / 2;
    let pn_mask = pn_win - 1;
    let candidate_pn = (expected_pn & !pn_mask) | truncated_pn.into_u64();

    let candidate_pn = if candidate_pn <= expected_pn.saturating_sub(pn_hwin)
        && candidate_pn < (1u64 << 62).saturating_sub(pn_win)
    {
        candidate_pn + pn_win
    } else if candidate_pn > expected_pn + pn_hwin && candidate_pn >= pn_win {
        candidate_pn - pn_win
    } else {
        candidate_pn
    }
    .min(VarInt::MAX.as_u64());

    let candidate_pn = VarInt::new(candidate_pn).expect("value was clamped to VarInt::MAX above");

    PacketNumber::from_varint(candidate_pn, space)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bolero::check;

    fn new(value: VarInt) -> PacketNumber {
        PacketNumberSpace::Initial.new_packet_number(value)
    }

    #[test]
    fn packet_number_len_example_test() {
        let largest_acknowledged_packet_number =
            PacketNumberSpace::default().new_packet_number(VarInt::from_u32(0x00ab_e8bc));

        assert_eq!(
            PacketNumberSpace::default()
                .new_packet_number(VarInt::from_u32(0x00ac_5c02))
                .truncate(largest_acknowledged_packet_number)
                .unwrap()
                .bitsize(),
            16,
        );

        assert_eq!(
            PacketNumberSpace::default()
                .new_packet_number(VarInt::from_u32(0x00ac_e8fe))
                .truncate(largest_acknowledged_packet_number)
                .unwrap()
                .bitsize(),
            24,
        );
    }

    #[test]
    fn packet_decoding_example_test() {
        let space = PacketNumberSpace::default();
        let largest_packet_number = space.new_packet_number(VarInt::from_u32(0xa82f_30ea));
        let truncated_packet_number = TruncatedPacketNumber::new(0x9b32u16, space);
        let expected = space.new_packet_number(VarInt::from_u32(0xa82f_9b32));
        let actual = decode_packet_number(largest_packet_number, truncated_packet_number);
        assert_eq!(actual, expected);
        assert_eq!(
            expected.truncate(largest_packet_number).unwrap(),
            truncated_packet_number
        );
    }

    #[test]
    fn truncate_expand_test() {
        check!()
            .with_type()
            .cloned()
            .for_each(|(largest_pn, expected_pn): (VarInt, VarInt)| {
                let largest_pn = new(largest_pn);
                let expected_pn = new(expected_pn);
                if let Some(truncated_pn) = expected_pn.truncate(largest_pn) {
                    assert_eq!(expected_pn, truncated_pn.expand(largest_pn));
                }
            });
    }

    #[test]
    fn example_test() {
        macro_rules! example {
            ($largest:expr, $truncated:expr, $expected:expr) => {{
                let largest = new(VarInt::from_u32($largest));
                let truncated = TruncatedPacketNumber::new($truncated, PacketNumberSpace::Initial);
                let expected = new(VarInt::from_u32($expected));
                assert_eq!(truncated.expand(largest), expected);
            }};
        }

        example!(0xa82e1b31, 0x9b32u16, 0xa82e9b32);
    }
}
