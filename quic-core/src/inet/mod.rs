// SPDX-License-Identifier: Apache-2.0

mod ecn;

pub use ecn::ExplicitCongestionNotification;
