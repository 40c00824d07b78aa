// SPDX-License-Identifier: Apache-2.0

use crate::state::{event, is};

//= https://www.rfc-editor.org/rfc/rfc9000#section-3.1
//#        o
//#       | Create Stream (Sending)
//#       | Peer Creates Bidirectional Stream
//#       v
//#   +-------+
//#   | Ready | Send RESET_STREAM
//#   |       |-----------------------.
//#   +-------+                       |
//#       |                           |
//#       | Send STREAM /             |
//#       |      STREAM_DATA_BLOCKED  |
//#       v                           |
//#   +-------+                       |
//#   | Send  | Send RESET_STREAM     |
//#   |       |---------------------->|
//#   +-------+                       |
//#       |                           |
//#       | Send STREAM + FIN         |
//#       v                           v
//#   +-------+                   +-------+
//#   | Data  | Send RESET_STREAM | Reset |
//#   | Sent  |------------------>| Sent  |
//#   +-------+                   +-------+
//#       |                           |
//#       | Recv All ACKs             | Recv ACK
//#       v                           v
//#   +-------+                   +-------+
//#   | Data  |                   | Reset |
//#   | Recvd |                   | Recvd |
//#   +-------+                   +-------+
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Sender {
    #[default]
    Ready,
    Send,
    DataSent,
    DataRecvd,
    /// An additional state for implementations to separate queueing a RESET_STREAM from actually
    /// sending it
    ResetQueued,
    ResetSent,
    ResetRecvd,
}

impl Sender {
    is!(is_ready, Ready);
    is!(is_sending, Send);
    is!(is_data_sent, DataSent);
    is!(is_data_received, DataRecvd);
    is!(is_reset_queued, ResetQueued);
    is!(is_reset_sent, ResetSent);
    is!(is_reset_received, ResetRecvd);
    is!(is_terminal, DataRecvd | ResetRecvd);

    event! {
        on_send_stream(Ready => Send);
        // we can jump from Ready to DataSent even though the
        // diagram doesn't explicitly highlight this transition
        on_send_fin(Ready | Send => DataSent);
        on_recv_all_acks(DataSent | ResetQueued => DataRecvd);

        on_queue_reset(Ready | Send | DataSent => ResetQueued);
        on_send_reset(Ready | Send | DataSent | ResetQueued => ResetSent);
        on_recv_reset_ack(ResetSent => ResetRecvd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_to_data_recvd_via_fin() {
        let mut state = Sender::Ready;
        state.on_send_fin().unwrap();
        assert_eq!(state, Sender::DataSent);
        state.on_recv_all_acks().unwrap();
        assert_eq!(state, Sender::DataRecvd);
        assert!(state.is_terminal());
    }

    #[test]
    fn reset_wins_over_data_sent() {
        let mut state = Sender::Ready;
        state.on_send_stream().unwrap();
        state.on_send_fin().unwrap();
        assert_eq!(state, Sender::DataSent);
        state.on_send_reset().unwrap();
        assert_eq!(state, Sender::ResetSent);
        state.on_recv_reset_ack().unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn recv_all_acks_invalid_from_ready() {
        let mut state = Sender::Ready;
        assert!(state.on_recv_all_acks().is_err());
    }
}
