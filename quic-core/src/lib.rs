// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod application;
pub mod connection;
#[cfg(feature = "alloc")]
pub mod crypto;
#[cfg(feature = "alloc")]
pub mod datagram;
pub mod endpoint;
pub mod frame;
pub mod inet;
pub mod number;
pub mod packet;
pub mod path;
#[cfg(feature = "alloc")]
pub mod recovery;
pub mod state;
pub mod stream;
pub mod transport;
pub mod varint;
