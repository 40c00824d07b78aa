// SPDX-License-Identifier: Apache-2.0

pub mod error;
#[cfg(feature = "alloc")]
pub mod parameters;

pub use error::Error;
#[cfg(feature = "alloc")]
pub use parameters::TransportParameters;
