// SPDX-License-Identifier: Apache-2.0

//! A generic retransmission set keyed by [`Observer`](super::observer::Observer) handles.
//!
//! `Registry<F>` is generic over the fragment type `F` so it can back STREAM fragments,
//! RESET_STREAM/STOP_SENDING requests, NEW_CONNECTION_ID frames, and PATH_CHALLENGE probes
//! with the same bookkeeping.

use super::observer::{Observer, State};
use alloc::{collections::VecDeque, vec::Vec};

/// The result of attempting to (re-)send one lost fragment.
pub enum SendOutcome {
    /// The fragment was sent; drop it from the registry.
    Ok,
    /// There was no room in the current packet; stop this round, keep the fragment.
    NoCapacity,
    /// The fragment could not be sent right now but is not gone; re-arm its observer.
    NotInIoState,
    /// An unrecoverable error occurred; abort the whole retransmit pass.
    Fatal,
}

/// Outcome of a full [`Registry::retransmit`] pass.
#[derive(Debug, PartialEq, Eq)]
pub enum RetransmitStatus {
    /// Every lost fragment was offered to `send_cb`.
    Completed,
    /// The pass stopped early because `send_cb` reported `NoCapacity`.
    NoCapacity,
    /// The pass stopped early because `send_cb` reported `Fatal`.
    Fatal,
}

/// Stores `(fragment, observer)` pairs awaiting acknowledgement or retransmission.
pub struct Registry<F> {
    entries: VecDeque<(F, Observer)>,
}

impl<F> Default for Registry<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> Registry<F> {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records a freshly transmitted fragment under the given observer.
    pub fn insert(&mut self, fragment: F, observer: Observer) {
        self.entries.push_back((fragment, observer));
    }

    /// Retransmits lost fragments, dropping acked ones.
    ///
    /// `send_cb` is invoked once per `Lost` entry with the fragment and a `save_new`
    /// sink; any fragment handed to `save_new` (e.g. the tail of a fragment that had to
    /// be split to fit) is spliced onto the end of the registry after this pass, so it
    /// is not reprocessed in the same call.
    pub fn retransmit<SendCb>(&mut self, mut send_cb: SendCb) -> RetransmitStatus
    where
        SendCb: FnMut(&F, &mut dyn FnMut(F, Observer)) -> SendOutcome,
    {
        let mut survivors = VecDeque::with_capacity(self.entries.len());
        let mut spliced: Vec<(F, Observer)> = Vec::new();
        let mut status = RetransmitStatus::Completed;
        let mut stop = false;

        while let Some((fragment, observer)) = self.entries.pop_front() {
            if stop {
                survivors.push_back((fragment, observer));
                continue;
            }

            match observer.state() {
                State::Ack => {
                    // acknowledged: drop
                }
                State::Wait => {
                    survivors.push_back((fragment, observer));
                }
                State::Lost => {
                    let mut save_new = |frag: F, obs: Observer| spliced.push((frag, obs));
                    match send_cb(&fragment, &mut save_new) {
                        SendOutcome::Ok => {}
                        SendOutcome::NoCapacity => {
                            survivors.push_back((fragment, observer));
                            status = RetransmitStatus::NoCapacity;
                            stop = true;
                        }
                        SendOutcome::NotInIoState => {
                            observer.confirm();
                            survivors.push_back((fragment, observer));
                        }
                        SendOutcome::Fatal => {
                            survivors.push_back((fragment, observer));
                            status = RetransmitStatus::Fatal;
                            stop = true;
                        }
                    }
                }
            }
        }

        survivors.extend(spliced);
        self.entries = survivors;
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acked_entries_are_removed() {
        let mut registry: Registry<u32> = Registry::new();
        let observer = Observer::new();
        observer.set_ack();
        registry.insert(1, observer);
        let status = registry.retransmit(|_frag, _save_new| SendOutcome::Ok);
        assert_eq!(status, RetransmitStatus::Completed);
        assert!(registry.is_empty());
    }

    #[test]
    fn lost_entries_are_resent_and_removed_on_ok() {
        let mut registry: Registry<u32> = Registry::new();
        let observer = Observer::new();
        observer.set_lost();
        registry.insert(42, observer);
        let mut resent = Vec::new();
        registry.retransmit(|frag, _save_new| {
            resent.push(*frag);
            SendOutcome::Ok
        });
        assert_eq!(resent, vec![42]);
        assert!(registry.is_empty());
    }

    #[test]
    fn no_capacity_keeps_entry_and_stops_early() {
        let mut registry: Registry<u32> = Registry::new();
        let first = Observer::new();
        first.set_lost();
        let second = Observer::new();
        second.set_lost();
        registry.insert(1, first);
        registry.insert(2, second);

        let mut attempts = 0;
        let status = registry.retransmit(|_frag, _save_new| {
            attempts += 1;
            SendOutcome::NoCapacity
        });

        assert_eq!(status, RetransmitStatus::NoCapacity);
        assert_eq!(attempts, 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn not_in_io_state_rearms_observer() {
        let mut registry: Registry<u32> = Registry::new();
        let observer = Observer::new();
        observer.set_lost();
        registry.insert(7, observer.clone());

        registry.retransmit(|_frag, _save_new| SendOutcome::NotInIoState);

        assert!(observer.not_confirmed());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn spliced_fragments_are_not_reprocessed_this_round() {
        let mut registry: Registry<u32> = Registry::new();
        let observer = Observer::new();
        observer.set_lost();
        registry.insert(100, observer);

        let mut calls = 0;
        registry.retransmit(|_frag, save_new| {
            calls += 1;
            save_new(101, Observer::new());
            SendOutcome::Ok
        });

        assert_eq!(calls, 1);
        assert_eq!(registry.len(), 1);
    }
}
