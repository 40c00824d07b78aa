// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(feature = "std"), no_std)]

//! The per-connection engine: wires the `quic-core` stream, flow-control,
//! crypto handshake, connection ID, path validation, and close state
//! machines into one `Connection` exposing the application-facing
//! stream/datagram interface.

extern crate alloc;

pub mod buffer;
pub mod connection;
pub mod stream;

pub use buffer::{Buffer, WriteOutcome};
pub use connection::{Connection, IoStatus};
pub use stream::Stream;
