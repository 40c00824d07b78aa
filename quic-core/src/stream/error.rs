// SPDX-License-Identifier: Apache-2.0

use crate::{application, connection, frame::ConnectionClose, transport};
use core::fmt;

/// Errors that a stream can encounter.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
#[non_exhaustive]
pub enum Error {
    /// The Stream ID which was referenced is invalid
    ///
    /// This could mean the ID is no longer tracked by the connection.
    InvalidStream,

    /// The stream had been reset by the peer via a RESET_STREAM frame.
    ///
    /// The peer-supplied error code is carried in the parameter.
    StreamReset(application::Error),

    /// A send attempt had been performed on a stream after it was closed
    SendAfterFinish,

    /// Attempting to write data would exceed the stream limit
    ///
    /// This is caused because the maximum possible amount of data
    /// (2^62-1 bytes) had already been written to the stream.
    MaxStreamDataSizeExceeded,

    /// The stream was reset due to a connection error
    ConnectionError(connection::Error),

    /// The stream is not readable
    NonReadable,

    /// The stream is not writable
    NonWritable,

    /// The stream is blocked on writing data
    ///
    /// This is caused by trying to send data before polling readiness.
    SendingBlocked,

    /// The stream was provided a non-empty placeholder buffer for receiving data.
    NonEmptyOutput,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidStream => write!(f, "the stream ID is invalid"),
            Self::StreamReset(code) => write!(f, "the stream was reset by the peer: {code}"),
            Self::SendAfterFinish => write!(f, "send attempted on a stream after it was closed"),
            Self::MaxStreamDataSizeExceeded => {
                write!(f, "writing would exceed the maximum stream data size")
            }
            Self::ConnectionError(error) => write!(f, "{error}"),
            Self::NonReadable => write!(f, "the stream is not readable"),
            Self::NonWritable => write!(f, "the stream is not writable"),
            Self::SendingBlocked => write!(f, "the stream is blocked on writing data"),
            Self::NonEmptyOutput => write!(f, "a non-empty output buffer was provided"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl application::error::TryInto for Error {
    fn application_error(&self) -> Option<application::Error> {
        if let Self::ConnectionError(error) = self {
            error.application_error()
        } else {
            None
        }
    }
}

impl From<connection::Error> for Error {
    fn from(error: connection::Error) -> Self {
        Self::ConnectionError(error)
    }
}

impl From<application::Error> for Error {
    fn from(error: application::Error) -> Self {
        Self::ConnectionError(error.into())
    }
}

impl From<transport::Error> for Error {
    fn from(error: transport::Error) -> Self {
        Self::ConnectionError(error.into())
    }
}

impl<'a> From<ConnectionClose<'a>> for Error {
    fn from(error: ConnectionClose<'a>) -> Self {
        Self::ConnectionError(error.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::TryInto as _;

    #[test]
    fn stream_reset_carries_application_error() {
        let code = application::Error::new(7).unwrap();
        let err = Error::StreamReset(code);
        assert_eq!(err.to_string(), "the stream was reset by the peer: QUIC application error code: 7");
    }

    #[test]
    fn connection_error_converts_and_forwards_application_error() {
        let app_err = application::Error::new(42).unwrap();
        let err: Error = app_err.into();
        assert_eq!(err.application_error(), Some(app_err));
    }

    #[test]
    fn transport_error_has_no_application_error() {
        let err: Error = transport::Error::FLOW_CONTROL_ERROR.into();
        assert_eq!(err.application_error(), None);
    }
}
