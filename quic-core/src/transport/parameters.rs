// SPDX-License-Identifier: Apache-2.0

//! The standardized transport parameter set carried in the TLS handshake
//! (RFC 9000 §7.4, §18) and the 0-RTT cache that enforces monotonic growth
//! across resumption (RFC 9000 §7.4.1).

use crate::{endpoint, transport, varint::VarInt};
use alloc::vec::Vec;
use core::convert::TryFrom;
use quic_codec::{DecoderBuffer, Encoder, EncoderBuffer};

macro_rules! ids {
    ($($name:ident = $value:expr),* $(,)?) => {
        $(const $name: VarInt = VarInt::from_u32($value);)*
    };
}

ids! {
    ID_ORIGINAL_DESTINATION_CONNECTION_ID = 0x00,
    ID_MAX_IDLE_TIMEOUT = 0x01,
    ID_STATELESS_RESET_TOKEN = 0x02,
    ID_MAX_UDP_PAYLOAD_SIZE = 0x03,
    ID_INITIAL_MAX_DATA = 0x04,
    ID_INITIAL_MAX_STREAM_DATA_BIDI_LOCAL = 0x05,
    ID_INITIAL_MAX_STREAM_DATA_BIDI_REMOTE = 0x06,
    ID_INITIAL_MAX_STREAM_DATA_UNI = 0x07,
    ID_INITIAL_MAX_STREAMS_BIDI = 0x08,
    ID_INITIAL_MAX_STREAMS_UNI = 0x09,
    ID_ACK_DELAY_EXPONENT = 0x0a,
    ID_MAX_ACK_DELAY = 0x0b,
    ID_DISABLE_ACTIVE_MIGRATION = 0x0c,
    ID_PREFERRED_ADDRESS = 0x0d,
    ID_ACTIVE_CONNECTION_ID_LIMIT = 0x0e,
    ID_INITIAL_SOURCE_CONNECTION_ID = 0x0f,
    ID_RETRY_SOURCE_CONNECTION_ID = 0x10,
    ID_MAX_DATAGRAM_FRAME_SIZE = 0x20,
    ID_GREASE_QUIC_BIT = 0x2ab2,
}

const DEFAULT_ACK_DELAY_EXPONENT: u8 = 3;
const DEFAULT_MAX_ACK_DELAY_MS: u64 = 25;
const DEFAULT_ACTIVE_CONNECTION_ID_LIMIT: u64 = 2;
const MIN_MAX_UDP_PAYLOAD_SIZE: u64 = 1200;
const MAX_ACK_DELAY_LIMIT: u64 = 1 << 14;
const MAX_STREAMS_LIMIT: u64 = 1 << 60;

/// The address an endpoint asks its peer to migrate to once the handshake
/// confirms, carried as raw wire fields rather than a host socket-address type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreferredAddress {
    pub ipv4_address: Option<([u8; 4], u16)>,
    pub ipv6_address: Option<([u8; 16], u16)>,
    pub connection_id: Vec<u8>,
    pub stateless_reset_token: [u8; 16],
}

/// The subset of parameters a client may remember across a resumed connection
/// (RFC 9000 §7.4.1). Any value the server sends on resumption that is smaller
/// than the cached one is a downgrade attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ZeroRttParameters {
    pub active_connection_id_limit: VarInt,
    pub initial_max_data: VarInt,
    pub initial_max_stream_data_bidi_local: VarInt,
    pub initial_max_stream_data_bidi_remote: VarInt,
    pub initial_max_stream_data_uni: VarInt,
    pub initial_max_streams_bidi: VarInt,
    pub initial_max_streams_uni: VarInt,
    pub max_datagram_frame_size: VarInt,
}

impl ZeroRttParameters {
    /// Checks that every remembered limit the server has resumed with is at
    /// least as large as what was cached from the original connection.
    pub fn validate_resumption(&self, resumed: &ZeroRttParameters) -> Result<(), transport::Error> {
        macro_rules! check {
            ($field:ident) => {
                if resumed.$field < self.$field {
                    return Err(transport::Error::TRANSPORT_PARAMETER_ERROR
                        .with_reason("0-RTT parameter regressed below its cached value"));
                }
            };
        }
        check!(active_connection_id_limit);
        check!(initial_max_data);
        check!(initial_max_stream_data_bidi_local);
        check!(initial_max_stream_data_bidi_remote);
        check!(initial_max_stream_data_uni);
        check!(initial_max_streams_bidi);
        check!(initial_max_streams_uni);
        check!(max_datagram_frame_size);
        Ok(())
    }
}

/// The full RFC-defined transport parameter set, as sent or received by
/// either endpoint. Fields that only one endpoint ever sends stay `None` on
/// the side that doesn't.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportParameters {
    pub original_destination_connection_id: Option<Vec<u8>>,
    pub max_idle_timeout: VarInt,
    pub stateless_reset_token: Option<[u8; 16]>,
    pub max_udp_payload_size: VarInt,
    pub initial_max_data: VarInt,
    pub initial_max_stream_data_bidi_local: VarInt,
    pub initial_max_stream_data_bidi_remote: VarInt,
    pub initial_max_stream_data_uni: VarInt,
    pub initial_max_streams_bidi: VarInt,
    pub initial_max_streams_uni: VarInt,
    pub ack_delay_exponent: VarInt,
    pub max_ack_delay: VarInt,
    pub disable_active_migration: bool,
    pub preferred_address: Option<PreferredAddress>,
    pub active_connection_id_limit: VarInt,
    pub initial_source_connection_id: Option<Vec<u8>>,
    pub retry_source_connection_id: Option<Vec<u8>>,
    pub max_datagram_frame_size: Option<VarInt>,
    pub grease_quic_bit: bool,
}

impl Default for TransportParameters {
    fn default() -> Self {
        Self {
            original_destination_connection_id: None,
            max_idle_timeout: VarInt::ZERO,
            stateless_reset_token: None,
            max_udp_payload_size: VarInt::new(65527).expect("fits VarInt"),
            initial_max_data: VarInt::ZERO,
            initial_max_stream_data_bidi_local: VarInt::ZERO,
            initial_max_stream_data_bidi_remote: VarInt::ZERO,
            initial_max_stream_data_uni: VarInt::ZERO,
            initial_max_streams_bidi: VarInt::ZERO,
            initial_max_streams_uni: VarInt::ZERO,
            ack_delay_exponent: VarInt::from_u8(DEFAULT_ACK_DELAY_EXPONENT),
            max_ack_delay: VarInt::new(DEFAULT_MAX_ACK_DELAY_MS).expect("fits VarInt"),
            disable_active_migration: false,
            preferred_address: None,
            active_connection_id_limit: VarInt::new(DEFAULT_ACTIVE_CONNECTION_ID_LIMIT).expect("fits VarInt"),
            initial_source_connection_id: None,
            retry_source_connection_id: None,
            max_datagram_frame_size: None,
            grease_quic_bit: false,
        }
    }
}

/// Parameters a client must never send; receiving one from a client is
/// TRANSPORT_PARAMETER_ERROR (RFC 9000 §18.2).
fn is_server_only(id: VarInt) -> bool {
    matches!(
        id,
        ID_ORIGINAL_DESTINATION_CONNECTION_ID
            | ID_STATELESS_RESET_TOKEN
            | ID_PREFERRED_ADDRESS
            | ID_RETRY_SOURCE_CONNECTION_ID
    )
}

impl TransportParameters {
    /// Parses the (id, length, value) triples carried in the handshake,
    /// rejecting duplicate IDs and, per `received_by`, any server-only
    /// parameter sent by a client.
    pub fn decode(bytes: &[u8], received_by: endpoint::Type) -> Result<Self, transport::Error> {
        let mut params = Self::default();
        let mut seen: Vec<VarInt> = Vec::new();
        let mut buffer = DecoderBuffer::new(bytes);

        while !buffer.is_empty() {
            let (id, rest) = buffer
                .decode::<VarInt>()
                .map_err(|_| transport::Error::TRANSPORT_PARAMETER_ERROR)?;
            let (len, rest) = rest
                .decode::<VarInt>()
                .map_err(|_| transport::Error::TRANSPORT_PARAMETER_ERROR)?;
            let len: usize = len
                .as_u64()
                .try_into()
                .map_err(|_| transport::Error::TRANSPORT_PARAMETER_ERROR)?;
            let (value, rest) = rest
                .decode_slice(len)
                .map_err(|_| transport::Error::TRANSPORT_PARAMETER_ERROR)?;
            buffer = rest;

            if seen.contains(&id) {
                return Err(transport::Error::TRANSPORT_PARAMETER_ERROR
                    .with_reason("duplicate transport parameter id"));
            }
            seen.push(id);

            if received_by.is_server() && is_server_only(id) {
                return Err(transport::Error::TRANSPORT_PARAMETER_ERROR
                    .with_reason("client sent a server-only transport parameter"));
            }

            params.apply(id, value.into_less_safe_slice())?;
        }

        params.validate()?;
        Ok(params)
    }

    fn apply(&mut self, id: VarInt, value: &[u8]) -> Result<(), transport::Error> {
        fn varint(value: &[u8]) -> Result<VarInt, transport::Error> {
            let (v, rest) = DecoderBuffer::new(value)
                .decode::<VarInt>()
                .map_err(|_| transport::Error::TRANSPORT_PARAMETER_ERROR)?;
            if !rest.is_empty() {
                return Err(transport::Error::TRANSPORT_PARAMETER_ERROR);
            }
            Ok(v)
        }

        match id {
            ID_ORIGINAL_DESTINATION_CONNECTION_ID => {
                self.original_destination_connection_id = Some(value.to_vec());
            }
            ID_MAX_IDLE_TIMEOUT => self.max_idle_timeout = varint(value)?,
            ID_STATELESS_RESET_TOKEN => {
                let token = <[u8; 16]>::try_from(value)
                    .map_err(|_| transport::Error::TRANSPORT_PARAMETER_ERROR)?;
                self.stateless_reset_token = Some(token);
            }
            ID_MAX_UDP_PAYLOAD_SIZE => self.max_udp_payload_size = varint(value)?,
            ID_INITIAL_MAX_DATA => self.initial_max_data = varint(value)?,
            ID_INITIAL_MAX_STREAM_DATA_BIDI_LOCAL => {
                self.initial_max_stream_data_bidi_local = varint(value)?
            }
            ID_INITIAL_MAX_STREAM_DATA_BIDI_REMOTE => {
                self.initial_max_stream_data_bidi_remote = varint(value)?
            }
            ID_INITIAL_MAX_STREAM_DATA_UNI => self.initial_max_stream_data_uni = varint(value)?,
            ID_INITIAL_MAX_STREAMS_BIDI => self.initial_max_streams_bidi = varint(value)?,
            ID_INITIAL_MAX_STREAMS_UNI => self.initial_max_streams_uni = varint(value)?,
            ID_ACK_DELAY_EXPONENT => self.ack_delay_exponent = varint(value)?,
            ID_MAX_ACK_DELAY => self.max_ack_delay = varint(value)?,
            ID_DISABLE_ACTIVE_MIGRATION => {
                if !value.is_empty() {
                    return Err(transport::Error::TRANSPORT_PARAMETER_ERROR);
                }
                self.disable_active_migration = true;
            }
            ID_PREFERRED_ADDRESS => self.preferred_address = Some(decode_preferred_address(value)?),
            ID_ACTIVE_CONNECTION_ID_LIMIT => self.active_connection_id_limit = varint(value)?,
            ID_INITIAL_SOURCE_CONNECTION_ID => {
                self.initial_source_connection_id = Some(value.to_vec());
            }
            ID_RETRY_SOURCE_CONNECTION_ID => {
                self.retry_source_connection_id = Some(value.to_vec());
            }
            ID_MAX_DATAGRAM_FRAME_SIZE => self.max_datagram_frame_size = Some(varint(value)?),
            ID_GREASE_QUIC_BIT => {
                if !value.is_empty() {
                    return Err(transport::Error::TRANSPORT_PARAMETER_ERROR);
                }
                self.grease_quic_bit = true;
            }
            _ => {
                // unrecognized parameters are ignored per RFC 9000 §7.4
            }
        }
        Ok(())
    }

    /// Runs the post-parse validators named for this layer.
    pub fn validate(&self) -> Result<(), transport::Error> {
        if self.ack_delay_exponent.as_u64() > 20 {
            return Err(transport::Error::TRANSPORT_PARAMETER_ERROR
                .with_reason("ack_delay_exponent exceeds 20"));
        }
        if self.active_connection_id_limit.as_u64() < 2 {
            return Err(transport::Error::TRANSPORT_PARAMETER_ERROR
                .with_reason("active_connection_id_limit below 2"));
        }
        if self.max_udp_payload_size.as_u64() < MIN_MAX_UDP_PAYLOAD_SIZE {
            return Err(transport::Error::TRANSPORT_PARAMETER_ERROR
                .with_reason("max_udp_payload_size below 1200"));
        }
        if self.max_ack_delay.as_u64() > MAX_ACK_DELAY_LIMIT {
            return Err(transport::Error::TRANSPORT_PARAMETER_ERROR
                .with_reason("max_ack_delay exceeds 2^14"));
        }
        if self.initial_max_streams_bidi.as_u64() >= MAX_STREAMS_LIMIT
            || self.initial_max_streams_uni.as_u64() >= MAX_STREAMS_LIMIT
        {
            return Err(transport::Error::TRANSPORT_PARAMETER_ERROR
                .with_reason("initial_max_streams_* at or above 2^60"));
        }
        if let Some(preferred) = &self.preferred_address {
            if preferred.connection_id.is_empty() {
                return Err(transport::Error::TRANSPORT_PARAMETER_ERROR
                    .with_reason("preferred_address connection id is empty"));
            }
        }
        Ok(())
    }

    /// Returns the subset of limits that must monotonically grow across
    /// resumption, for caching by the 0-RTT layer.
    pub fn zero_rtt_parameters(&self) -> ZeroRttParameters {
        ZeroRttParameters {
            active_connection_id_limit: self.active_connection_id_limit,
            initial_max_data: self.initial_max_data,
            initial_max_stream_data_bidi_local: self.initial_max_stream_data_bidi_local,
            initial_max_stream_data_bidi_remote: self.initial_max_stream_data_bidi_remote,
            initial_max_stream_data_uni: self.initial_max_stream_data_uni,
            initial_max_streams_bidi: self.initial_max_streams_bidi,
            initial_max_streams_uni: self.initial_max_streams_uni,
            max_datagram_frame_size: self.max_datagram_frame_size.unwrap_or(VarInt::ZERO),
        }
    }

    /// Encodes the non-default parameters as a sequence of (id, length,
    /// value) triples.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut bytes = alloc::vec![0u8; self.wire_len()];
        let mut buffer = EncoderBuffer::new(&mut bytes);
        self.encode_fields(&mut buffer);
        let written = buffer.len();
        bytes.truncate(written);
        bytes
    }

    fn wire_len(&self) -> usize {
        // generous fixed upper bound: every field's id/len/value, even though most
        // stay at their RFC default and are omitted at encode time.
        512 + self
            .preferred_address
            .as_ref()
            .map(|p| p.connection_id.len())
            .unwrap_or(0)
    }

    fn encode_fields(&self, buffer: &mut EncoderBuffer<'_>) {
        macro_rules! encode_varint {
            ($id:expr, $value:expr) => {
                if $value != VarInt::ZERO {
                    buffer.encode(&$id);
                    buffer.encode_with_len_prefix::<VarInt, _>(&$value);
                }
            };
        }

        if let Some(cid) = &self.original_destination_connection_id {
            buffer.encode(&ID_ORIGINAL_DESTINATION_CONNECTION_ID);
            buffer.encode_with_len_prefix::<VarInt, _>(&&cid[..]);
        }
        encode_varint!(ID_MAX_IDLE_TIMEOUT, self.max_idle_timeout);
        if let Some(token) = &self.stateless_reset_token {
            buffer.encode(&ID_STATELESS_RESET_TOKEN);
            buffer.encode_with_len_prefix::<VarInt, _>(&&token[..]);
        }
        if self.max_udp_payload_size != VarInt::new(65527).expect("fits VarInt") {
            encode_varint!(ID_MAX_UDP_PAYLOAD_SIZE, self.max_udp_payload_size);
        }
        encode_varint!(ID_INITIAL_MAX_DATA, self.initial_max_data);
        encode_varint!(
            ID_INITIAL_MAX_STREAM_DATA_BIDI_LOCAL,
            self.initial_max_stream_data_bidi_local
        );
        encode_varint!(
            ID_INITIAL_MAX_STREAM_DATA_BIDI_REMOTE,
            self.initial_max_stream_data_bidi_remote
        );
        encode_varint!(ID_INITIAL_MAX_STREAM_DATA_UNI, self.initial_max_stream_data_uni);
        encode_varint!(ID_INITIAL_MAX_STREAMS_BIDI, self.initial_max_streams_bidi);
        encode_varint!(ID_INITIAL_MAX_STREAMS_UNI, self.initial_max_streams_uni);
        if self.ack_delay_exponent != VarInt::from_u8(DEFAULT_ACK_DELAY_EXPONENT) {
            encode_varint!(ID_ACK_DELAY_EXPONENT, self.ack_delay_exponent);
        }
        if self.max_ack_delay != VarInt::new(DEFAULT_MAX_ACK_DELAY_MS).expect("fits VarInt") {
            encode_varint!(ID_MAX_ACK_DELAY, self.max_ack_delay);
        }
        if self.disable_active_migration {
            buffer.encode(&ID_DISABLE_ACTIVE_MIGRATION);
            buffer.encode_with_len_prefix::<VarInt, _>(&&[][..]);
        }
        if let Some(preferred) = &self.preferred_address {
            buffer.encode(&ID_PREFERRED_ADDRESS);
            let encoded = encode_preferred_address(preferred);
            buffer.encode_with_len_prefix::<VarInt, _>(&&encoded[..]);
        }
        if self.active_connection_id_limit != VarInt::new(DEFAULT_ACTIVE_CONNECTION_ID_LIMIT).expect("fits VarInt") {
            encode_varint!(ID_ACTIVE_CONNECTION_ID_LIMIT, self.active_connection_id_limit);
        }
        if let Some(cid) = &self.initial_source_connection_id {
            buffer.encode(&ID_INITIAL_SOURCE_CONNECTION_ID);
            buffer.encode_with_len_prefix::<VarInt, _>(&&cid[..]);
        }
        if let Some(cid) = &self.retry_source_connection_id {
            buffer.encode(&ID_RETRY_SOURCE_CONNECTION_ID);
            buffer.encode_with_len_prefix::<VarInt, _>(&&cid[..]);
        }
        if let Some(max_size) = self.max_datagram_frame_size {
            encode_varint!(ID_MAX_DATAGRAM_FRAME_SIZE, max_size);
        }
        if self.grease_quic_bit {
            buffer.encode(&ID_GREASE_QUIC_BIT);
            buffer.encode_with_len_prefix::<VarInt, _>(&&[][..]);
        }
    }
}

fn decode_preferred_address(value: &[u8]) -> Result<PreferredAddress, transport::Error> {
    let err = || transport::Error::TRANSPORT_PARAMETER_ERROR.with_reason("malformed preferred_address");
    let buffer = DecoderBuffer::new(value);
    let (v4_bytes, buffer) = buffer.decode_slice(4).map_err(|_| err())?;
    let (v4_port, buffer) = buffer.decode::<u16>().map_err(|_| err())?;
    let (v6_bytes, buffer) = buffer.decode_slice(16).map_err(|_| err())?;
    let (v6_port, buffer) = buffer.decode::<u16>().map_err(|_| err())?;
    let (cid_len, buffer) = buffer.decode::<u8>().map_err(|_| err())?;
    let (cid, buffer) = buffer.decode_slice(cid_len as usize).map_err(|_| err())?;
    let (token, buffer) = buffer.decode_slice(16).map_err(|_| err())?;
    if !buffer.is_empty() {
        return Err(err());
    }

    let mut v4 = [0u8; 4];
    v4.copy_from_slice(v4_bytes.into_less_safe_slice());
    let mut v6 = [0u8; 16];
    v6.copy_from_slice(v6_bytes.into_less_safe_slice());
    let mut reset_token = [0u8; 16];
    reset_token.copy_from_slice(token.into_less_safe_slice());

    Ok(PreferredAddress {
        ipv4_address: (v4 != [0u8; 4] || v4_port != 0).then_some((v4, v4_port)),
        ipv6_address: (v6 != [0u8; 16] || v6_port != 0).then_some((v6, v6_port)),
        connection_id: cid.into_less_safe_slice().to_vec(),
        stateless_reset_token: reset_token,
    })
}

fn encode_preferred_address(preferred: &PreferredAddress) -> Vec<u8> {
    let mut bytes = alloc::vec![0u8; 4 + 2 + 16 + 2 + 1 + preferred.connection_id.len() + 16];
    let mut buffer = EncoderBuffer::new(&mut bytes);
    let (v4, v4_port) = preferred.ipv4_address.unwrap_or(([0u8; 4], 0));
    let (v6, v6_port) = preferred.ipv6_address.unwrap_or(([0u8; 16], 0));
    buffer.write_slice(&v4);
    buffer.encode(&v4_port);
    buffer.write_slice(&v6);
    buffer.encode(&v6_port);
    buffer.encode(&(preferred.connection_id.len() as u8));
    buffer.write_slice(&preferred.connection_id);
    buffer.write_slice(&preferred.stateless_reset_token);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(params: &TransportParameters, received_by: endpoint::Type) -> TransportParameters {
        let bytes = params.encode_to_vec();
        TransportParameters::decode(&bytes, received_by).unwrap()
    }

    #[test]
    fn default_parameters_encode_to_nothing() {
        let params = TransportParameters::default();
        assert!(params.encode_to_vec().is_empty());
    }

    #[test]
    fn non_default_values_round_trip() {
        let mut params = TransportParameters::default();
        params.initial_max_data = VarInt::from_u32(65536);
        params.active_connection_id_limit = VarInt::from_u8(4);
        params.grease_quic_bit = true;
        params.max_datagram_frame_size = Some(VarInt::from_u16(1200));

        let decoded = roundtrip(&params, endpoint::Type::Server);
        assert_eq!(decoded.initial_max_data, params.initial_max_data);
        assert_eq!(decoded.active_connection_id_limit, params.active_connection_id_limit);
        assert!(decoded.grease_quic_bit);
        assert_eq!(decoded.max_datagram_frame_size, params.max_datagram_frame_size);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let id = ID_MAX_IDLE_TIMEOUT;
        let mut bytes = Vec::new();
        for _ in 0..2 {
            let mut buf = alloc::vec![0u8; 8];
            let mut encoder = EncoderBuffer::new(&mut buf);
            encoder.encode(&id);
            encoder.encode_with_len_prefix::<VarInt, _>(&VarInt::from_u8(1));
            let written = encoder.len();
            bytes.extend_from_slice(&buf[..written]);
        }
        let err = TransportParameters::decode(&bytes, endpoint::Type::Client).unwrap_err();
        assert_eq!(err.code, transport::Error::TRANSPORT_PARAMETER_ERROR.code);
    }

    #[test]
    fn server_only_parameter_from_client_is_rejected() {
        let mut params = TransportParameters::default();
        params.stateless_reset_token = Some([7u8; 16]);
        let bytes = params.encode_to_vec();
        let err = TransportParameters::decode(&bytes, endpoint::Type::Server).unwrap_err();
        assert_eq!(err.code, transport::Error::TRANSPORT_PARAMETER_ERROR.code);

        // the same bytes are fine when a client is the one receiving them from a server
        assert!(TransportParameters::decode(&bytes, endpoint::Type::Client).is_ok());
    }

    #[test]
    fn ack_delay_exponent_above_twenty_is_rejected() {
        let mut params = TransportParameters::default();
        params.ack_delay_exponent = VarInt::from_u8(21);
        let bytes = params.encode_to_vec();
        assert!(TransportParameters::decode(&bytes, endpoint::Type::Client).is_err());
    }

    #[test]
    fn active_connection_id_limit_below_two_is_rejected() {
        let mut params = TransportParameters::default();
        params.active_connection_id_limit = VarInt::from_u8(1);
        let bytes = params.encode_to_vec();
        assert!(TransportParameters::decode(&bytes, endpoint::Type::Client).is_err());
    }

    #[test]
    fn undersized_max_udp_payload_size_is_rejected() {
        let mut params = TransportParameters::default();
        params.max_udp_payload_size = VarInt::from_u16(1199);
        let bytes = params.encode_to_vec();
        assert!(TransportParameters::decode(&bytes, endpoint::Type::Client).is_err());
    }

    #[test]
    fn preferred_address_with_empty_connection_id_is_rejected() {
        let mut params = TransportParameters::default();
        params.preferred_address = Some(PreferredAddress {
            ipv4_address: Some(([127, 0, 0, 1], 443)),
            ipv6_address: None,
            connection_id: Vec::new(),
            stateless_reset_token: [0u8; 16],
        });
        let bytes = params.encode_to_vec();
        assert!(TransportParameters::decode(&bytes, endpoint::Type::Client).is_err());
    }

    #[test]
    fn zero_rtt_cache_rejects_shrinking_limits() {
        let mut original = TransportParameters::default();
        original.initial_max_data = VarInt::from_u32(65536);
        let cached = original.zero_rtt_parameters();

        let mut resumed = original.clone();
        resumed.initial_max_data = VarInt::from_u32(1024);
        let resumed_cache = resumed.zero_rtt_parameters();

        assert!(cached.validate_resumption(&resumed_cache).is_err());
    }

    #[test]
    fn zero_rtt_cache_accepts_growing_limits() {
        let mut original = TransportParameters::default();
        original.initial_max_data = VarInt::from_u32(65536);
        let cached = original.zero_rtt_parameters();

        let mut resumed = original.clone();
        resumed.initial_max_data = VarInt::from_u32(131072);
        let resumed_cache = resumed.zero_rtt_parameters();

        assert!(cached.validate_resumption(&resumed_cache).is_ok());
    }
}
