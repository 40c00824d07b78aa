// SPDX-License-Identifier: Apache-2.0

//! The per-encryption-level CRYPTO stream engine and HANDSHAKE_DONE lifecycle
//! (RFC 9000 §7, §19.6, §19.20; RFC 9001 §4.1).

pub mod handshake;
pub mod stream;

pub use handshake::{Engine, Error, Handshaker, Progress};
