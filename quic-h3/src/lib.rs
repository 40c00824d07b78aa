// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(feature = "std"), no_std)]

//! HTTP/3 (RFC 9114) framing, stream typing, request/response sequencing,
//! and QPACK (RFC 9204) field compression over the transport primitives in
//! `quic-core`.

extern crate alloc;

pub mod error;
pub mod frame;
pub mod qpack;
pub mod request;
pub mod settings;
pub mod stream;

pub use error::{Code, Error};
pub use frame::{Frame, FrameType};
pub use qpack::HeaderField;
pub use request::{Message, RequestStream, State as RequestState};
pub use settings::{ControlStream, Settings};
pub use stream::{PeerStreams, StreamType};
