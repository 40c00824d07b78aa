// SPDX-License-Identifier: Apache-2.0

use crate::{
    application,
    varint::{VarInt, VarIntError},
};
use core::fmt;
use quic_codec::DecoderError;

//= https://www.rfc-editor.org/rfc/rfc9000#section-20
//# QUIC error codes are 62-bit unsigned integers.

/// A transport-level error, as carried in a CONNECTION_CLOSE frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Error {
    pub code: VarInt,
    pub frame_type: Option<VarInt>,
    pub reason: &'static str,
}

impl Error {
    pub const fn new(code: VarInt, reason: &'static str, frame_type: Option<VarInt>) -> Self {
        Self {
            code,
            reason,
            frame_type,
        }
    }

    pub const fn with_frame_type(mut self, frame_type: VarInt) -> Self {
        self.frame_type = Some(frame_type);
        self
    }

    pub const fn with_reason(mut self, reason: &'static str) -> Self {
        self.reason = reason;
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.reason.is_empty() {
            let code: u64 = self.code.into();
            write!(f, "TransportError({code})")
        } else {
            f.write_str(self.reason)
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

macro_rules! def_error {
    ($doc:expr, $name:ident, $code:expr) => {
        impl Error {
            #[doc = $doc]
            pub const $name: Error = Error::new(VarInt::from_u32($code), "", None);
        }
    };
}

//= https://www.rfc-editor.org/rfc/rfc9000#section-20.1
def_error!(
    "An endpoint uses this with CONNECTION_CLOSE to signal that the connection is being closed abruptly in the absence of any error.",
    NO_ERROR,
    0x0
);
def_error!(
    "The endpoint encountered an internal error and cannot continue with the connection.",
    INTERNAL_ERROR,
    0x1
);
def_error!(
    "The server is currently busy and does not accept any new connections.",
    SERVER_BUSY,
    0x2
);
def_error!(
    "An endpoint received more data than it permitted in its advertised data limits.",
    FLOW_CONTROL_ERROR,
    0x3
);
def_error!(
    "An endpoint received a frame for a stream identifier that exceeded its advertised stream limit.",
    STREAM_LIMIT_ERROR,
    0x4
);
def_error!(
    "An endpoint received a frame for a stream that was not in a state that permitted that frame.",
    STREAM_STATE_ERROR,
    0x5
);
def_error!(
    "An endpoint received a STREAM frame or a RESET_STREAM frame containing a final size inconsistent with the previously established final size.",
    FINAL_SIZE_ERROR,
    0x6
);
def_error!(
    "An endpoint received a frame that was badly formatted.",
    FRAME_ENCODING_ERROR,
    0x7
);
def_error!(
    "An endpoint received transport parameters that were badly formatted, included an invalid value, was absent even though it is mandatory, was present though it is forbidden, or is otherwise in error.",
    TRANSPORT_PARAMETER_ERROR,
    0x8
);
def_error!(
    "An endpoint received more connection IDs than it permitted in its active_connection_id_limit transport parameter.",
    CONNECTION_ID_LIMIT_ERROR,
    0x9
);
def_error!(
    "An endpoint detected an error with protocol compliance that was not covered by more specific error codes.",
    PROTOCOL_VIOLATION,
    0xA
);
def_error!(
    "A server received a client Initial that contained an invalid Token field.",
    INVALID_TOKEN,
    0xB
);
def_error!(
    "The application or application protocol caused the connection to be closed during the handshake.",
    APPLICATION_ERROR,
    0xC
);
def_error!(
    "An endpoint has received more data in CRYPTO frames than it can buffer.",
    CRYPTO_BUFFER_EXCEEDED,
    0xD
);
def_error!(
    "An endpoint detected errors in performing key updates.",
    KEY_UPDATE_ERROR,
    0xE
);
def_error!(
    "An endpoint has reached the confidentiality or integrity limit for the AEAD algorithm used by the given connection.",
    AEAD_LIMIT_REACHED,
    0xF
);
def_error!(
    "An endpoint has determined that the network path is incapable of supporting QUIC.",
    NO_VIABLE_PATH,
    0x10
);

impl Error {
    /// A close that is generated and sent by transports unspecified by this document.
    pub const CONNECTION_REFUSED: Error = Error::NO_ERROR;

    #[inline]
    /// Creates a crypto-level [`Error`] from a TLS alert code.
    pub fn crypto_error(code: u8, reason: &'static str) -> Self {
        Self {
            code: VarInt::from_u32(0x100 | u32::from(code)),
            reason,
            frame_type: None,
        }
    }
}

impl application::error::TryInto for Error {
    fn application_error(&self) -> Option<application::Error> {
        if self.frame_type.is_none() {
            Some(self.code.into())
        } else {
            None
        }
    }
}

/// Creates a [`Error`] with variable arguments
#[macro_export]
macro_rules! transport_error {
    ($error:ident) => {
        $crate::transport::Error::new($crate::transport::Error::$error.code, "", None)
    };
    ($error:expr) => {
        $crate::transport::Error::new($error, "", None)
    };
    ($error:ident, $reason:expr) => {
        $crate::transport::Error::new($crate::transport::Error::$error.code, $reason, None)
    };
    ($error:ident, $reason:expr, $frame:expr) => {
        $crate::transport::Error::new(
            $crate::transport::Error::$error.code,
            $reason,
            Some($frame.into()),
        )
    };
}

impl From<DecoderError> for Error {
    fn from(decoder_error: DecoderError) -> Self {
        match decoder_error {
            DecoderError::InvariantViolation(reason) => {
                transport_error!(PROTOCOL_VIOLATION, reason)
            }
            _ => transport_error!(PROTOCOL_VIOLATION, "malformed packet"),
        }
    }
}

impl From<VarIntError> for Error {
    fn from(_: VarIntError) -> Self {
        transport_error!(INTERNAL_ERROR, "varint encoding limit exceeded")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_reason_when_present() {
        let err = Error::FLOW_CONTROL_ERROR.with_reason("stream limit exceeded");
        assert_eq!(err.to_string(), "stream limit exceeded");
    }

    #[test]
    fn display_falls_back_to_code() {
        let err = Error::new(VarInt::from_u32(0x1234), "", None);
        assert_eq!(err.to_string(), "TransportError(4660)");
    }

    #[test]
    fn with_frame_type_sets_field() {
        let err = Error::STREAM_STATE_ERROR.with_frame_type(VarInt::from_u8(0x04));
        assert_eq!(err.frame_type, Some(VarInt::from_u8(0x04)));
    }

    #[test]
    fn macro_builds_expected_code() {
        let err = transport_error!(PROTOCOL_VIOLATION, "bad frame");
        assert_eq!(err.code, Error::PROTOCOL_VIOLATION.code);
        assert_eq!(err.reason, "bad frame");
    }

    #[test]
    fn decoder_error_maps_to_protocol_violation() {
        let err: Error = DecoderError::UnexpectedEof(4).into();
        assert_eq!(err.code, Error::PROTOCOL_VIOLATION.code);
    }
}
