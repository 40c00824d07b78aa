// SPDX-License-Identifier: Apache-2.0

pub mod observer;
pub mod resend;

pub use observer::Observer;
pub use resend::Registry;
