// SPDX-License-Identifier: Apache-2.0

//! A shared tri-state handle linking a sent unit of data to a loss-recovery outcome.
//!
//! One [`Observer`] is created per unit of transmission (a STREAM fragment, a
//! RESET_STREAM, a NEW_CONNECTION_ID, ...). The transmit path keeps one handle in
//! whatever registry owns retransmission (see [`crate::recovery::resend`]); a second
//! handle is handed to the loss-recovery module, which is the only writer of the
//! state. Reads from either side are lock-free.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU8, Ordering};

const WAIT: u8 = 0;
const ACK: u8 = 1;
const LOST: u8 = 2;

/// The tri-state outcome of a unit of transmission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// Still in flight; no outcome has been reported yet.
    Wait,
    /// The peer acknowledged the packet carrying this unit.
    Ack,
    /// Loss recovery declared the packet carrying this unit lost.
    Lost,
}

impl From<u8> for State {
    fn from(value: u8) -> Self {
        match value {
            ACK => Self::Ack,
            LOST => Self::Lost,
            _ => Self::Wait,
        }
    }
}

/// A shared handle to an [`Observer`]'s state.
///
/// Cloning an `Observer` yields another handle to the same underlying state; this is
/// how the transmit path and the loss-recovery module share one outcome without a
/// back-pointer between their owning structures.
#[derive(Clone, Debug)]
pub struct Observer(Arc<AtomicU8>);

impl Default for Observer {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer {
    /// Creates a new observer in the `Wait` state.
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(WAIT)))
    }

    /// Returns the current state.
    pub fn state(&self) -> State {
        self.0.load(Ordering::Acquire).into()
    }

    pub fn is_ack(&self) -> bool {
        self.state() == State::Ack
    }

    pub fn is_lost(&self) -> bool {
        self.state() == State::Lost
    }

    /// True while no outcome has been reported yet.
    pub fn not_confirmed(&self) -> bool {
        self.state() == State::Wait
    }

    /// Records that the packet carrying this unit was acknowledged.
    ///
    /// Permitted from `Wait` or `Lost` (RFC 9002 allows a spurious-loss correction: a
    /// unit declared lost and then retransmitted may still have its original packet
    /// acknowledged late). Does nothing if already `Ack`.
    pub fn set_ack(&self) {
        self.0.store(ACK, Ordering::Release);
    }

    /// Records that the packet carrying this unit was declared lost.
    ///
    /// A no-op if the unit has already transitioned to `Ack`; an `Ack` must never
    /// revert to `Lost`.
    pub fn set_lost(&self) {
        let _ = self
            .0
            .compare_exchange(WAIT, LOST, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Resets the observer to `Wait` so it can be reused from a pool.
    pub fn confirm(&self) {
        self.0.store(WAIT, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_wait() {
        let observer = Observer::new();
        assert!(observer.not_confirmed());
        assert!(!observer.is_ack());
        assert!(!observer.is_lost());
    }

    #[test]
    fn wait_to_lost() {
        let observer = Observer::new();
        observer.set_lost();
        assert!(observer.is_lost());
    }

    #[test]
    fn spurious_loss_then_ack_wins() {
        let observer = Observer::new();
        observer.set_lost();
        observer.set_ack();
        assert!(observer.is_ack());
        assert!(!observer.is_lost());
    }

    #[test]
    fn ack_does_not_revert_to_lost() {
        let observer = Observer::new();
        observer.set_ack();
        observer.set_lost();
        assert!(observer.is_ack());
    }

    #[test]
    fn shared_handles_see_the_same_state() {
        let observer = Observer::new();
        let handle = observer.clone();
        handle.set_ack();
        assert!(observer.is_ack());
    }

    #[test]
    fn confirm_resets_for_pool_reuse() {
        let observer = Observer::new();
        observer.set_ack();
        observer.confirm();
        assert!(observer.not_confirmed());
    }
}
