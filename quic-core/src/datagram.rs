// SPDX-License-Identifier: Apache-2.0

//! The unreliable best-effort datagram extension (RFC 9221).
//!
//! Grounded on the endpoint `Sender`/`Receiver`/`Packet` split this crate's corpus uses
//! to keep datagram policy out of the core state machine, reworked here into a concrete
//! bounded queue rather than an application-supplied callback pair.

use crate::{
    frame::{Datagram, DatagramRef},
    packet::writer::{FrameCategory, Writer},
    recovery::Observer,
    transport,
};
use alloc::{collections::VecDeque, vec::Vec};

/// Stands in for a packet number when a queued datagram is dropped before ever
/// reaching the wire, so a drop callback can't be confused with a real loss.
pub const NEVER_SENT: u64 = u64::MAX;

/// The send queue is already at its configured capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueFull;

struct Queued {
    data: Vec<u8>,
    pending_attempts: usize,
}

struct InFlight {
    packet_number: u64,
    observer: Observer,
}

/// A bounded FIFO of outbound datagrams.
///
/// Entries that repeatedly fail to fit a packet are eventually dropped rather than
/// blocking the queue forever; entries that do make it onto the wire are tracked
/// until loss recovery reports their outcome.
pub struct Sender {
    queue: VecDeque<Queued>,
    in_flight: VecDeque<InFlight>,
    capacity: usize,
    pending_limit: usize,
}

impl Sender {
    pub fn new(capacity: usize, pending_limit: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            in_flight: VecDeque::new(),
            capacity,
            pending_limit,
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queues a datagram for best-effort delivery. Rejects the newest datagram
    /// once `capacity` queued datagrams are already waiting.
    pub fn queue(&mut self, data: Vec<u8>) -> Result<(), QueueFull> {
        if self.queue.len() >= self.capacity {
            return Err(QueueFull);
        }
        self.queue.push_back(Queued { data, pending_attempts: 0 });
        Ok(())
    }

    /// Scans the queue in order, writing as many whole datagrams as fit into
    /// `writer`. An entry that doesn't fit has its pending-attempt counter
    /// bumped; once that counter exceeds `pending_limit` the entry is dropped
    /// and `on_drop` is invoked with [`NEVER_SENT`]. A datagram is never split
    /// across frames, so an entry that doesn't fit whole always blocks the
    /// scan for this packet (to preserve FIFO order) unless it is dropped.
    ///
    /// `packet_number` is the packet `writer` is building, recorded against
    /// whatever makes it onto the wire so a later loss outcome can be
    /// attributed to the right packet.
    pub fn send(&mut self, writer: &mut Writer<'_>, packet_number: u64, on_drop: &mut dyn FnMut(u64)) {
        loop {
            let Some(entry) = self.queue.front_mut() else { break };

            let mut frame = Datagram { is_last_frame: true, data: &entry.data[..] };
            let fit_len = frame.try_fit(writer.remaining_capacity()).unwrap_or(0);

            if fit_len == entry.data.len() {
                let category = FrameCategory { ack_eliciting: true, ..Default::default() };
                if writer.write_frame(&frame, category).is_ok() {
                    self.queue.pop_front();
                    self.in_flight.push_back(InFlight { packet_number, observer: Observer::new() });
                    continue;
                }
            }

            entry.pending_attempts += 1;
            if entry.pending_attempts > self.pending_limit {
                self.queue.pop_front();
                on_drop(NEVER_SENT);
                continue;
            }

            break;
        }
    }

    /// Reports loss/ack outcomes for datagrams already on the wire, invoking
    /// `on_drop` with the owning packet number for any the peer never
    /// acknowledged before loss recovery gave up on the packet.
    pub fn poll_outcomes(&mut self, on_drop: &mut dyn FnMut(u64)) {
        let mut remaining = VecDeque::with_capacity(self.in_flight.len());
        while let Some(entry) = self.in_flight.pop_front() {
            if entry.observer.is_lost() {
                on_drop(entry.packet_number);
            } else if entry.observer.is_ack() {
                // delivered (or at least the carrying packet was); nothing further to do
            } else {
                remaining.push_back(entry);
            }
        }
        self.in_flight = remaining;
    }
}

/// Enforces the locally advertised `max_datagram_frame_size` on inbound DATAGRAM
/// frames.
pub struct Receiver {
    max_datagram_frame_size: Option<usize>,
}

impl Receiver {
    /// `max_datagram_frame_size` is `None` if this endpoint never advertised
    /// the datagram extension; any DATAGRAM frame is then unsolicited.
    pub fn new(max_datagram_frame_size: Option<usize>) -> Self {
        Self { max_datagram_frame_size }
    }

    pub fn on_datagram_frame<'a>(&self, frame: DatagramRef<'a>) -> Result<&'a [u8], transport::Error> {
        match self.max_datagram_frame_size {
            None => Err(transport::Error::PROTOCOL_VIOLATION),
            Some(limit) if frame.data.len() > limit => Err(transport::Error::PROTOCOL_VIOLATION),
            Some(_) => Ok(frame.data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::writer::Writer;

    #[test]
    fn queue_rejects_past_capacity() {
        let mut sender = Sender::new(1, 3);
        sender.queue(alloc::vec![1, 2, 3]).unwrap();
        assert_eq!(sender.queue(alloc::vec![4]), Err(QueueFull));
    }

    #[test]
    fn fitting_datagram_is_sent_and_tracked_in_flight() {
        let mut sender = Sender::new(4, 3);
        sender.queue(alloc::vec![1, 2, 3]).unwrap();
        let mut buf = [0u8; 64];
        let mut writer = Writer::new(&mut buf);
        let mut dropped = Vec::new();
        sender.send(&mut writer, 7, &mut |pn| dropped.push(pn));
        assert!(sender.is_empty());
        assert!(dropped.is_empty());
        assert_eq!(sender.in_flight.len(), 1);
    }

    #[test]
    fn entry_is_dropped_after_exceeding_pending_limit() {
        let mut sender = Sender::new(4, 1);
        sender.queue(alloc::vec![0u8; 32]).unwrap();
        let mut dropped = Vec::new();

        for _ in 0..3 {
            let mut tiny = [0u8; 1];
            let mut writer = Writer::new(&mut tiny);
            sender.send(&mut writer, 1, &mut |pn| dropped.push(pn));
        }

        assert!(sender.is_empty());
        assert_eq!(dropped, alloc::vec![NEVER_SENT]);
    }

    #[test]
    fn lost_in_flight_entry_reports_real_packet_number() {
        let mut sender = Sender::new(4, 3);
        sender.queue(alloc::vec![1, 2, 3]).unwrap();
        let mut buf = [0u8; 64];
        let mut writer = Writer::new(&mut buf);
        sender.send(&mut writer, 42, &mut |_| {});

        sender.in_flight[0].observer.set_lost();
        let mut dropped = Vec::new();
        sender.poll_outcomes(&mut |pn| dropped.push(pn));
        assert_eq!(dropped, alloc::vec![42]);
    }

    #[test]
    fn receiver_rejects_unsolicited_datagrams() {
        let receiver = Receiver::new(None);
        let frame = DatagramRef { is_last_frame: true, data: &[1, 2, 3] };
        assert_eq!(receiver.on_datagram_frame(frame), Err(transport::Error::PROTOCOL_VIOLATION));
    }

    #[test]
    fn receiver_rejects_oversize_datagrams() {
        let receiver = Receiver::new(Some(2));
        let frame = DatagramRef { is_last_frame: true, data: &[1, 2, 3] };
        assert_eq!(receiver.on_datagram_frame(frame), Err(transport::Error::PROTOCOL_VIOLATION));
    }

    #[test]
    fn receiver_accepts_datagrams_within_limit() {
        let receiver = Receiver::new(Some(8));
        let frame = DatagramRef { is_last_frame: true, data: &[1, 2, 3] };
        assert_eq!(receiver.on_datagram_frame(frame), Ok(&[1, 2, 3][..]));
    }
}
