// SPDX-License-Identifier: Apache-2.0

use crate::state::{event, is};

//= https://www.rfc-editor.org/rfc/rfc9000#section-3.2
//#        o
//#       | Recv STREAM / STREAM_DATA_BLOCKED / RESET_STREAM
//#       | Create Bidirectional Stream (Sending)
//#       | Recv MAX_STREAM_DATA / STOP_SENDING (Bidirectional)
//#       | Create Higher-Numbered Stream
//#       v
//#   +-------+
//#   | Recv  | Recv RESET_STREAM
//#   |       |-----------------------.
//#   +-------+                       |
//#       |                           |
//#       | Recv STREAM + FIN         |
//#       v                           |
//#   +-------+                       |
//#   | Size  | Recv RESET_STREAM     |
//#   | Known |---------------------->|
//#   +-------+                       |
//#       |                           |
//#       | Recv All Data             |
//#       v                           v
//#   +-------+ Recv RESET_STREAM +-------+
//#   | Data  |--- (optional) --->| Reset |
//#   | Recvd |  Recv All Data    | Recvd |
//#   +-------+<-- (optional) ----+-------+
//#       |                           |
//#       | App Read All Data         | App Read Reset
//#       v                           v
//#   +-------+                   +-------+
//#   | Data  |                   | Reset |
//#   | Read  |                   | Read  |
//#   +-------+                   +-------+
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Receiver {
    #[default]
    Recv,
    SizeKnown,
    DataRecvd,
    DataRead,
    ResetRecvd,
    ResetRead,
}

impl Receiver {
    is!(is_receiving, Recv);
    is!(is_size_known, SizeKnown);
    is!(is_data_received, DataRecvd);
    is!(is_data_read, DataRead);
    is!(is_reset_received, ResetRecvd);
    is!(is_reset_read, ResetRead);
    is!(is_terminal, DataRead | ResetRead);

    event! {
        on_receive_fin(Recv => SizeKnown);
        on_receive_all_data(SizeKnown => DataRecvd);
        on_app_read_all_data(DataRecvd => DataRead);

        on_reset(Recv | SizeKnown => ResetRecvd);
        on_app_read_reset(ResetRecvd => ResetRead);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_receive_path() {
        let mut state = Receiver::Recv;
        state.on_receive_fin().unwrap();
        assert_eq!(state, Receiver::SizeKnown);
        state.on_receive_all_data().unwrap();
        assert_eq!(state, Receiver::DataRecvd);
        state.on_app_read_all_data().unwrap();
        assert_eq!(state, Receiver::DataRead);
        assert!(state.is_terminal());
    }

    #[test]
    fn reset_before_fin() {
        let mut state = Receiver::Recv;
        state.on_reset().unwrap();
        assert_eq!(state, Receiver::ResetRecvd);
        state.on_app_read_reset().unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn reset_after_size_known() {
        let mut state = Receiver::Recv;
        state.on_receive_fin().unwrap();
        state.on_reset().unwrap();
        assert_eq!(state, Receiver::ResetRecvd);
    }

    #[test]
    fn cannot_read_before_data_received() {
        let mut state = Receiver::SizeKnown;
        assert!(state.on_app_read_all_data().is_err());
    }
}
