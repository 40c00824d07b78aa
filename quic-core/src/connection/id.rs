// SPDX-License-Identifier: Apache-2.0

//! Issuing and accepting QUIC connection IDs (RFC 9000 §5.1, §19.15, §19.16).

use crate::{recovery, transport, varint::VarInt};
use alloc::vec::Vec;

pub const STATELESS_RESET_TOKEN_LEN: usize = 16;
pub const MAX_CONNECTION_ID_LEN: usize = 20;

/// Produces random connection IDs, stateless reset tokens, and rotation
/// budgets. Randomness itself is an external collaborator (§6); the manager
/// only decides when to ask for one.
pub trait IdSource {
    fn generate_id(&mut self, len: usize) -> Vec<u8>;
    fn generate_stateless_reset_token(&mut self) -> [u8; STATELESS_RESET_TOKEN_LEN];
    /// A value in `min..=max`, used to pick how many packets a newly accepted
    /// connection ID may carry before `Acceptor` signals rotation.
    fn generate_rotation_budget(&mut self, min: u64, max: u64) -> u64;
}

/// One connection ID this endpoint has handed to its peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedId {
    pub sequence_number: VarInt,
    pub id: Vec<u8>,
    pub stateless_reset_token: [u8; STATELESS_RESET_TOKEN_LEN],
    retired: bool,
}

impl IssuedId {
    pub fn id(&self) -> &[u8] {
        &self.id
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }
}

/// Maintains the set of locally issued connection IDs (§4.9 "Issuer").
pub struct Issuer {
    active_connection_id_limit: u64,
    connection_id_len: usize,
    next_sequence_number: u64,
    issued: Vec<IssuedId>,
    /// NEW_CONNECTION_ID frames awaiting ACK; lost entries are re-offered for
    /// retransmission by the resend registry rather than reissued from scratch.
    pending: recovery::Registry<IssuedId>,
}

impl Issuer {
    pub fn new(connection_id_len: usize, active_connection_id_limit: u64) -> Self {
        assert!(active_connection_id_limit >= 2, "RFC 9000 §18.2 requires active_connection_id_limit >= 2");
        Self {
            active_connection_id_limit,
            connection_id_len,
            next_sequence_number: 0,
            issued: Vec::new(),
            pending: recovery::Registry::new(),
        }
    }

    fn usable_count(&self) -> u64 {
        self.issued.iter().filter(|id| !id.is_retired()).count() as u64
    }

    /// Issues new connection IDs until `active_connection_id_limit` usable IDs
    /// exist, queuing each one for NEW_CONNECTION_ID transmission.
    pub fn top_up(&mut self, source: &mut dyn IdSource) {
        while self.usable_count() < self.active_connection_id_limit {
            self.issue_one(source);
        }
    }

    fn issue_one(&mut self, source: &mut dyn IdSource) -> VarInt {
        let sequence_number =
            VarInt::new(self.next_sequence_number).expect("connection ID sequence number exceeds varint range");
        self.next_sequence_number += 1;
        let record = IssuedId {
            sequence_number,
            id: source.generate_id(self.connection_id_len),
            stateless_reset_token: source.generate_stateless_reset_token(),
            retired: false,
        };
        self.pending.insert(record.clone(), recovery::Observer::new());
        self.issued.push(record);
        sequence_number
    }

    /// Handles an inbound RETIRE_CONNECTION_ID frame (RFC 9000 §19.16).
    pub fn on_retire_connection_id(&mut self, sequence_number: VarInt) -> Result<(), transport::Error> {
        let record = self
            .issued
            .iter_mut()
            .find(|id| id.sequence_number == sequence_number)
            .ok_or(transport::Error::PROTOCOL_VIOLATION)?;
        record.retired = true;
        Ok(())
    }

    /// The registry backing NEW_CONNECTION_ID (re)transmission.
    pub fn pending_mut(&mut self) -> &mut recovery::Registry<IssuedId> {
        &mut self.pending
    }

    pub fn issued(&self) -> &[IssuedId] {
        &self.issued
    }
}

/// One connection ID the peer has handed to this endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcceptedId {
    pub sequence_number: VarInt,
    pub id: Vec<u8>,
    pub stateless_reset_token: [u8; STATELESS_RESET_TOKEN_LEN],
    packets_sent: u64,
    /// How many packets this particular ID may carry before rotation is
    /// signaled, drawn once at acceptance time from `[packet_per_id,
    /// max_packet_per_id]` so peers can't predict the rotation cadence.
    rotation_budget: u64,
}

impl AcceptedId {
    pub fn id(&self) -> &[u8] {
        &self.id
    }
}

/// Maintains the set of peer-supplied connection IDs this endpoint may use
/// (§4.9 "Acceptor"). Enforces `retire_prior_to` monotonicity and the "leave at
/// least 1 usable CID" invariant, and tracks per-CID usage for rotation.
pub struct Acceptor {
    accepted: Vec<AcceptedId>,
    retire_prior_to: VarInt,
    packet_per_id: u64,
    max_packet_per_id: u64,
}

impl Acceptor {
    /// `packet_per_id..=max_packet_per_id` bounds the random rotation budget
    /// drawn for each newly accepted connection ID.
    pub fn new(packet_per_id: u64, max_packet_per_id: u64) -> Self {
        assert!(packet_per_id <= max_packet_per_id, "rotation budget range must be non-empty");
        Self {
            accepted: Vec::new(),
            retire_prior_to: VarInt::from_u8(0),
            packet_per_id,
            max_packet_per_id,
        }
    }

    /// Handles an inbound NEW_CONNECTION_ID frame. Returns the sequence numbers
    /// that must now be retired (a RETIRE_CONNECTION_ID emitted for each) because
    /// `retire_prior_to` advanced past them.
    pub fn on_new_connection_id(
        &mut self,
        sequence_number: VarInt,
        retire_prior_to: VarInt,
        id: Vec<u8>,
        stateless_reset_token: [u8; STATELESS_RESET_TOKEN_LEN],
        source: &mut dyn IdSource,
    ) -> Result<Vec<VarInt>, transport::Error> {
        if retire_prior_to > self.retire_prior_to {
            self.retire_prior_to = retire_prior_to;
        }

        if sequence_number >= self.retire_prior_to
            && !self.accepted.iter().any(|a| a.sequence_number == sequence_number)
        {
            let rotation_budget = source.generate_rotation_budget(self.packet_per_id, self.max_packet_per_id);
            self.accepted.push(AcceptedId {
                sequence_number,
                id,
                stateless_reset_token,
                packets_sent: 0,
                rotation_budget,
            });
        }

        let retire_prior_to = self.retire_prior_to;
        let mut retired = Vec::new();
        self.accepted.retain(|a| {
            if a.sequence_number < retire_prior_to {
                retired.push(a.sequence_number);
                false
            } else {
                true
            }
        });

        if self.accepted.is_empty() {
            return Err(transport::Error::PROTOCOL_VIOLATION);
        }

        Ok(retired)
    }

    /// Records a packet sent using `sequence_number`'s connection ID; returns
    /// `true` once that ID's randomly drawn rotation budget has been
    /// exceeded, signaling the caller should rotate to a different accepted
    /// ID.
    pub fn on_packet_sent(&mut self, sequence_number: VarInt) -> bool {
        match self.accepted.iter_mut().find(|a| a.sequence_number == sequence_number) {
            Some(record) => {
                record.packets_sent += 1;
                record.packets_sent > record.rotation_budget
            }
            None => false,
        }
    }

    pub fn accepted(&self) -> &[AcceptedId] {
        &self.accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SequentialSource {
        next_byte: u8,
    }

    impl IdSource for SequentialSource {
        fn generate_id(&mut self, len: usize) -> Vec<u8> {
            let byte = self.next_byte;
            self.next_byte = self.next_byte.wrapping_add(1);
            alloc::vec![byte; len]
        }

        fn generate_stateless_reset_token(&mut self) -> [u8; STATELESS_RESET_TOKEN_LEN] {
            [self.next_byte; STATELESS_RESET_TOKEN_LEN]
        }

        fn generate_rotation_budget(&mut self, min: u64, max: u64) -> u64 {
            max.max(min)
        }
    }

    #[test]
    fn issuer_tops_up_to_the_active_limit() {
        let mut issuer = Issuer::new(8, 4);
        let mut source = SequentialSource { next_byte: 0 };
        issuer.top_up(&mut source);
        assert_eq!(issuer.issued().len(), 4);
    }

    #[test]
    fn retiring_an_issued_id_frees_a_slot_for_top_up() {
        let mut issuer = Issuer::new(8, 2);
        let mut source = SequentialSource { next_byte: 0 };
        issuer.top_up(&mut source);
        let first = issuer.issued()[0].sequence_number;
        issuer.on_retire_connection_id(first).unwrap();
        issuer.top_up(&mut source);
        assert_eq!(issuer.issued().len(), 3);
        assert!(issuer.issued()[0].is_retired());
    }

    #[test]
    fn retiring_an_unknown_sequence_number_is_protocol_violation() {
        let mut issuer = Issuer::new(8, 2);
        assert_eq!(
            issuer.on_retire_connection_id(VarInt::from_u8(99)),
            Err(transport::Error::PROTOCOL_VIOLATION)
        );
    }

    #[test]
    fn acceptor_retires_ids_below_the_advanced_floor() {
        let mut acceptor = Acceptor::new(100, 100);
        let mut source = SequentialSource { next_byte: 0 };
        acceptor
            .on_new_connection_id(VarInt::from_u8(0), VarInt::from_u8(0), alloc::vec![0], [0; 16], &mut source)
            .unwrap();
        acceptor
            .on_new_connection_id(VarInt::from_u8(1), VarInt::from_u8(0), alloc::vec![1], [1; 16], &mut source)
            .unwrap();
        let retired = acceptor
            .on_new_connection_id(VarInt::from_u8(2), VarInt::from_u8(1), alloc::vec![2], [2; 16], &mut source)
            .unwrap();
        assert_eq!(retired, alloc::vec![VarInt::from_u8(0)]);
        assert_eq!(acceptor.accepted().len(), 2);
    }

    #[test]
    fn acceptor_rejects_retiring_down_to_zero_usable_ids() {
        let mut acceptor = Acceptor::new(100, 100);
        let mut source = SequentialSource { next_byte: 0 };
        acceptor
            .on_new_connection_id(VarInt::from_u8(0), VarInt::from_u8(0), alloc::vec![0], [0; 16], &mut source)
            .unwrap();
        let err = acceptor.on_new_connection_id(
            VarInt::from_u8(1),
            VarInt::from_u8(2),
            alloc::vec![1],
            [1; 16],
            &mut source,
        );
        assert_eq!(err, Err(transport::Error::PROTOCOL_VIOLATION));
    }

    #[test]
    fn acceptor_signals_rotation_past_the_packet_budget() {
        let mut acceptor = Acceptor::new(2, 2);
        let mut source = SequentialSource { next_byte: 0 };
        acceptor
            .on_new_connection_id(VarInt::from_u8(0), VarInt::from_u8(0), alloc::vec![0], [0; 16], &mut source)
            .unwrap();
        assert!(!acceptor.on_packet_sent(VarInt::from_u8(0)));
        assert!(!acceptor.on_packet_sent(VarInt::from_u8(0)));
        assert!(acceptor.on_packet_sent(VarInt::from_u8(0)));
    }

    #[test]
    fn acceptor_draws_the_rotation_budget_from_the_configured_range() {
        struct FixedRange;
        impl IdSource for FixedRange {
            fn generate_id(&mut self, len: usize) -> Vec<u8> {
                alloc::vec![0; len]
            }
            fn generate_stateless_reset_token(&mut self) -> [u8; STATELESS_RESET_TOKEN_LEN] {
                [0; STATELESS_RESET_TOKEN_LEN]
            }
            fn generate_rotation_budget(&mut self, min: u64, max: u64) -> u64 {
                assert_eq!((min, max), (5, 10));
                7
            }
        }

        let mut acceptor = Acceptor::new(5, 10);
        let mut source = FixedRange;
        acceptor
            .on_new_connection_id(VarInt::from_u8(0), VarInt::from_u8(0), alloc::vec![0], [0; 16], &mut source)
            .unwrap();
        for _ in 0..7 {
            assert!(!acceptor.on_packet_sent(VarInt::from_u8(0)));
        }
        assert!(acceptor.on_packet_sent(VarInt::from_u8(0)));
    }
}
