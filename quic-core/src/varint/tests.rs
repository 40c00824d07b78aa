// SPDX-License-Identifier: Apache-2.0

use super::*;
use bolero::check;
use quic_codec::{assert_codec_round_trip_bytes, assert_codec_round_trip_value};

#[test]
#[cfg_attr(miri, ignore)]
fn round_trip_bytes_test() {
    check!().for_each(|input| {
        assert_codec_round_trip_bytes!(VarInt, input);
    });
}

#[test]
fn round_trip_values_test() {
    check!().with_type().cloned().for_each(|v: u64| {
        if let Ok(v) = VarInt::new(v) {
            assert_codec_round_trip_value!(VarInt, v);
        } else {
            assert!(v > MAX_VARINT_VALUE);
        }
    })
}

#[test]
fn encoding_size_table() {
    assert_eq!(VarInt::from_u8(0).encoding_size(), 1);
    assert_eq!(VarInt::from_u8(63).encoding_size(), 1);
    assert_eq!(VarInt::from_u16(64).encoding_size(), 2);
    assert_eq!(VarInt::from_u16(16_383).encoding_size(), 2);
    assert_eq!(VarInt::from_u32(16_384).encoding_size(), 4);
    assert_eq!(VarInt::from_u32(1_073_741_823).encoding_size(), 4);
    assert_eq!(VarInt::new(1_073_741_824).unwrap().encoding_size(), 8);
    assert_eq!(VarInt::MAX.encoding_size(), 8);
}

#[test]
fn arithmetic_overflow() {
    assert_eq!(VarInt::MAX.checked_add(VarInt::from_u8(1)), None);
    assert_eq!(VarInt::ZERO.checked_sub(VarInt::from_u8(1)), None);
    assert_eq!(VarInt::MAX.saturating_add(VarInt::from_u8(1)), VarInt::MAX);
}

#[test]
fn new_rejects_out_of_range() {
    assert!(VarInt::new(MAX_VARINT_VALUE + 1).is_err());
    assert!(VarInt::new(MAX_VARINT_VALUE).is_ok());
}
