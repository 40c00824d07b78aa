// SPDX-License-Identifier: Apache-2.0

//! HTTP/3 error codes (RFC 9114 §8.1), carried as the QUIC application error
//! code on `STOP_SENDING`/`RESET_STREAM`/`CONNECTION_CLOSE` frames.

use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Code(pub u64);

impl Code {
    pub const H3_NO_ERROR: Code = Code(0x100);
    pub const H3_GENERAL_PROTOCOL_ERROR: Code = Code(0x101);
    pub const H3_INTERNAL_ERROR: Code = Code(0x102);
    pub const H3_STREAM_CREATION_ERROR: Code = Code(0x103);
    pub const H3_CLOSED_CRITICAL_STREAM: Code = Code(0x104);
    pub const H3_FRAME_UNEXPECTED: Code = Code(0x105);
    pub const H3_FRAME_ERROR: Code = Code(0x106);
    pub const H3_EXCESSIVE_LOAD: Code = Code(0x107);
    pub const H3_ID_ERROR: Code = Code(0x108);
    pub const H3_SETTINGS_ERROR: Code = Code(0x109);
    pub const H3_MISSING_SETTINGS: Code = Code(0x10a);
    pub const H3_REQUEST_REJECTED: Code = Code(0x10b);
    pub const H3_REQUEST_CANCELLED: Code = Code(0x10c);
    pub const H3_REQUEST_INCOMPLETE: Code = Code(0x10d);
    pub const H3_MESSAGE_ERROR: Code = Code(0x10e);
    pub const H3_CONNECT_ERROR: Code = Code(0x10f);
    pub const H3_VERSION_FALLBACK: Code = Code(0x110);
    pub const QPACK_DECOMPRESSION_FAILED: Code = Code(0x200);
    pub const QPACK_ENCODER_STREAM_ERROR: Code = Code(0x201);
    pub const QPACK_DECODER_STREAM_ERROR: Code = Code(0x202);

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h3 error 0x{:x}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Error(pub Code);

impl Error {
    pub const fn new(code: Code) -> Self {
        Self(code)
    }

    pub const fn code(self) -> Code {
        self.0
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl From<crate::qpack::Error> for Error {
    fn from(_: crate::qpack::Error) -> Self {
        Error::new(Code::QPACK_DECOMPRESSION_FAILED)
    }
}
