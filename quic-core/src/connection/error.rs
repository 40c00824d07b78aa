// SPDX-License-Identifier: Apache-2.0

use crate::{application, endpoint, frame::ConnectionClose, transport};
use core::fmt;

/// Errors that a connection can encounter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The connection was closed without an error
    Closed { initiator: endpoint::Location },

    /// The connection was closed on the transport level
    ///
    /// This can occur either locally or by the peer. The argument contains
    /// the error code the transport provided in order to close the connection.
    Transport {
        error: transport::Error,
        initiator: endpoint::Location,
    },

    /// The connection was closed on the application level
    ///
    /// This can occur either locally or by the peer. The argument contains
    /// the error code the application supplied in order to close the connection.
    Application {
        error: application::Error,
        initiator: endpoint::Location,
    },

    /// The connection was reset by a stateless reset from the peer
    StatelessReset,

    /// The connection was closed because the local connection's idle timer expired
    IdleTimerExpired,

    /// All Stream IDs for Streams on a given connection had been exhausted
    StreamIdExhausted,

    /// The connection was closed due to an unspecified reason
    Unspecified,
}

impl Error {
    fn from_transport_error(error: transport::Error, initiator: endpoint::Location) -> Self {
        match error.code {
            code if code == transport::Error::NO_ERROR.code => Self::Closed { initiator },
            code if code == transport::Error::APPLICATION_ERROR.code && initiator.is_remote() => {
                Self::Closed { initiator }
            }
            _ => Self::Transport { error, initiator },
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Closed { initiator } => write!(f, "connection closed by {initiator:?}"),
            Self::Transport { error, initiator } => {
                write!(f, "transport error from {initiator:?}: {error}")
            }
            Self::Application { error, initiator } => {
                write!(f, "application error from {initiator:?}: {error}")
            }
            Self::StatelessReset => write!(f, "connection was reset by a stateless reset"),
            Self::IdleTimerExpired => write!(f, "idle timer expired"),
            Self::StreamIdExhausted => write!(f, "stream IDs have been exhausted"),
            Self::Unspecified => write!(f, "an unspecified error occurred"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl application::error::TryInto for Error {
    fn application_error(&self) -> Option<application::Error> {
        if let Self::Application { error, .. } = self {
            Some(*error)
        } else {
            None
        }
    }
}

impl From<transport::Error> for Error {
    fn from(error: transport::Error) -> Self {
        Self::from_transport_error(error, endpoint::Location::Local)
    }
}

impl From<application::Error> for Error {
    fn from(error: application::Error) -> Self {
        Self::Application {
            error,
            initiator: endpoint::Location::Local,
        }
    }
}

impl<'a> From<ConnectionClose<'a>> for Error {
    fn from(error: ConnectionClose<'a>) -> Self {
        if let Some(frame_type) = error.frame_type {
            let error = transport::Error {
                code: error.error_code.into(),
                reason: "",
                frame_type: Some(frame_type),
            };
            Self::from_transport_error(error, endpoint::Location::Remote)
        } else {
            Self::Application {
                error: error.error_code.into(),
                initiator: endpoint::Location::Remote,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::varint::VarInt;

    #[test]
    fn no_error_becomes_closed() {
        let err: Error = transport::Error::NO_ERROR.into();
        assert_eq!(
            err,
            Error::Closed {
                initiator: endpoint::Location::Local
            }
        );
    }

    #[test]
    fn real_error_stays_transport() {
        let err: Error = transport::Error::FLOW_CONTROL_ERROR.into();
        assert_eq!(
            err,
            Error::Transport {
                error: transport::Error::FLOW_CONTROL_ERROR,
                initiator: endpoint::Location::Local,
            }
        );
    }

    #[test]
    fn connection_close_without_frame_type_is_application() {
        let close = ConnectionClose {
            error_code: VarInt::from_u8(7),
            frame_type: None,
            reason: None,
        };
        let err: Error = close.into();
        assert!(matches!(err, Error::Application { .. }));
    }

    #[test]
    fn connection_close_with_frame_type_is_transport() {
        let close = ConnectionClose {
            error_code: VarInt::from_u8(7),
            frame_type: Some(VarInt::from_u8(0x04)),
            reason: None,
        };
        let err: Error = close.into();
        assert!(matches!(err, Error::Transport { .. }));
    }
}
