// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(all(not(feature = "checked_range_unsafe")), forbid(unsafe_code))]
#![cfg_attr(all(not(test), not(feature = "std")), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(any(feature = "testing", test))]
#[macro_use]
pub mod testing;

pub mod decoder;
pub mod encoder;

pub use decoder::*;
pub use encoder::*;
