// SPDX-License-Identifier: Apache-2.0

#[cfg(feature = "alloc")]
pub mod challenge;
mod id;

pub use id::Id;
