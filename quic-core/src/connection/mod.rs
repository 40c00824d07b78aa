// SPDX-License-Identifier: Apache-2.0

#[cfg(feature = "alloc")]
pub mod close;
pub mod error;
#[cfg(feature = "alloc")]
pub mod id;

pub use error::Error;
