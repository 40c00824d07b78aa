// SPDX-License-Identifier: Apache-2.0

mod recv;
mod send;

pub use recv::Receiver;
pub use send::Sender;
