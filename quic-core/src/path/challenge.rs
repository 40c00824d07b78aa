// SPDX-License-Identifier: Apache-2.0

//! PATH_CHALLENGE / PATH_RESPONSE drive and migration validation (RFC 9000 §8.2, §9).

use crate::{path, recovery};
use alloc::vec::Vec;

pub const DATA_LEN: usize = 8;

struct Probe {
    path: path::Id,
    data: [u8; DATA_LEN],
    observer: recovery::Observer,
}

/// The action the caller must take after a non-probing packet arrives on some path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathAction {
    /// The packet arrived on the already-active path; nothing to do.
    None,
    /// The packet arrived on a previously validated, non-active path: migrate to it.
    Migrated,
    /// The packet arrived on an unvalidated path: a PATH_CHALLENGE must be queued.
    ValidateImplicitly,
}

/// Tracks outstanding PATH_CHALLENGE probes and which paths have been validated.
pub struct Validator {
    probes: Vec<Probe>,
    validated: Vec<path::Id>,
    active: path::Id,
}

impl Validator {
    /// `active` is assumed already validated (the handshake path, by construction).
    pub fn new(active: path::Id) -> Self {
        Self {
            probes: Vec::new(),
            validated: alloc::vec![active],
            active,
        }
    }

    pub fn active(&self) -> path::Id {
        self.active
    }

    pub fn is_validated(&self, path: path::Id) -> bool {
        self.validated.contains(&path)
    }

    /// Queues an outgoing PATH_CHALLENGE for `path` carrying `data`. A second
    /// probe may be queued for the same path before an earlier one times out, to
    /// cope with loss of the challenge itself.
    pub fn challenge(&mut self, path: path::Id, data: [u8; DATA_LEN]) -> recovery::Observer {
        let observer = recovery::Observer::new();
        self.probes.push(Probe {
            path,
            data,
            observer: observer.clone(),
        });
        observer
    }

    /// The data of the next challenge for `path` still awaiting transmission
    /// confirmation (priority: write before any application data, per §4.10).
    pub fn pending_challenge(&self, path: path::Id) -> Option<[u8; DATA_LEN]> {
        self.probes
            .iter()
            .find(|p| p.path == path && p.observer.not_confirmed())
            .map(|p| p.data)
    }

    /// Handles an inbound PATH_RESPONSE carrying `data`, received on `path`.
    /// Returns `true` if it matched an outstanding challenge, validating the path.
    pub fn on_path_response(&mut self, path: path::Id, data: [u8; DATA_LEN]) -> bool {
        if let Some(pos) = self.probes.iter().position(|p| p.path == path && p.data == data) {
            self.probes.remove(pos);
            if !self.validated.contains(&path) {
                self.validated.push(path);
            }
            true
        } else {
            false
        }
    }

    /// Handles a non-probing packet arriving on `path`.
    pub fn on_non_probing_packet(&mut self, path: path::Id) -> PathAction {
        if path == self.active {
            PathAction::None
        } else if self.is_validated(path) {
            self.active = path;
            PathAction::Migrated
        } else {
            PathAction::ValidateImplicitly
        }
    }

    /// Drops probes for which `is_expired` reports the deadline passed while the
    /// probe is not yet acknowledged.
    pub fn expire(&mut self, mut is_expired: impl FnMut(path::Id) -> bool) {
        self.probes.retain(|p| !(is_expired(p.path) && !p.observer.is_ack()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_path_response_validates_the_path() {
        let mut validator = Validator::new(path::Id::HANDSHAKE);
        let migration = path::Id::migration(2);
        validator.challenge(migration, [1; DATA_LEN]);
        assert!(validator.on_path_response(migration, [1; DATA_LEN]));
        assert!(validator.is_validated(migration));
    }

    #[test]
    fn mismatched_path_response_does_not_validate() {
        let mut validator = Validator::new(path::Id::HANDSHAKE);
        let migration = path::Id::migration(2);
        validator.challenge(migration, [1; DATA_LEN]);
        assert!(!validator.on_path_response(migration, [2; DATA_LEN]));
        assert!(!validator.is_validated(migration));
    }

    #[test]
    fn non_probing_packet_on_validated_path_migrates() {
        let mut validator = Validator::new(path::Id::HANDSHAKE);
        let migration = path::Id::migration(2);
        validator.challenge(migration, [1; DATA_LEN]);
        validator.on_path_response(migration, [1; DATA_LEN]);
        assert_eq!(validator.on_non_probing_packet(migration), PathAction::Migrated);
        assert_eq!(validator.active(), migration);
    }

    #[test]
    fn non_probing_packet_on_unvalidated_path_triggers_implicit_validation() {
        let mut validator = Validator::new(path::Id::HANDSHAKE);
        let migration = path::Id::migration(2);
        assert_eq!(
            validator.on_non_probing_packet(migration),
            PathAction::ValidateImplicitly
        );
        assert_eq!(validator.active(), path::Id::HANDSHAKE);
    }

    #[test]
    fn expired_unconfirmed_probes_are_garbage_collected() {
        let mut validator = Validator::new(path::Id::HANDSHAKE);
        let migration = path::Id::migration(2);
        validator.challenge(migration, [1; DATA_LEN]);
        validator.expire(|_| true);
        assert_eq!(validator.pending_challenge(migration), None);
    }
}
