// SPDX-License-Identifier: Apache-2.0

//! The generic flow-control limiter shared by stream-level and connection-level
//! MAX_DATA / MAX_STREAM_DATA / MAX_STREAMS accounting (RFC 9000 §4).

/// A monotonic (used, limit) pair. `used` never decreases; `limit` only increases.
///
/// The same shape backs stream send/receive limits, connection send/receive
/// limits, and the bidi/uni stream-count limits; only the unit differs (bytes or
/// stream count).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limiter {
    used: u64,
    limit: u64,
    initial_limit: u64,
}

/// Charging past the current limit is always a flow-control violation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LimitExceeded;

impl Limiter {
    pub fn new(initial_limit: u64) -> Self {
        Self {
            used: 0,
            limit: initial_limit,
            initial_limit,
        }
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn available(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }

    /// Charges `amount` against the limit; rejects if it would exceed it.
    pub fn charge(&mut self, amount: u64) -> Result<(), LimitExceeded> {
        let new_used = self.used.checked_add(amount).ok_or(LimitExceeded)?;
        if new_used > self.limit {
            return Err(LimitExceeded);
        }
        self.used = new_used;
        Ok(())
    }

    /// Raises the limit when a peer's MAX_DATA / MAX_STREAM_DATA / MAX_STREAMS
    /// advances it. A lower or equal value is ignored (frames may arrive
    /// out of order). Returns `true` if the limit actually moved.
    pub fn on_limit_received(&mut self, new_limit: u64) -> bool {
        if new_limit > self.limit {
            self.limit = new_limit;
            true
        } else {
            false
        }
    }

    /// Advances `used` on the receive side as the consumer reads data, and
    /// reports whether the local limit should now be raised and broadcast.
    ///
    /// Policy: schedule a broadcast once `used >= limit - initial_limit / 2`,
    /// i.e. once half of the last-advertised window has been consumed.
    pub fn advance(&mut self, new_used: u64) -> bool {
        debug_assert!(new_used >= self.used, "used must be monotonic");
        self.used = new_used.max(self.used);
        self.should_broadcast()
    }

    pub fn should_broadcast(&self) -> bool {
        self.used >= self.limit.saturating_sub(self.initial_limit / 2)
    }

    /// Raises the local limit after the engine has decided to broadcast a new
    /// one (MAX_DATA / MAX_STREAM_DATA / MAX_STREAMS), resetting the broadcast
    /// threshold relative to the new window.
    pub fn raise_limit(&mut self, new_limit: u64) {
        if new_limit > self.limit {
            self.limit = new_limit;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charge_within_limit_succeeds() {
        let mut limiter = Limiter::new(100);
        limiter.charge(60).unwrap();
        assert_eq!(limiter.used(), 60);
        assert_eq!(limiter.available(), 40);
    }

    #[test]
    fn charge_past_limit_is_rejected() {
        let mut limiter = Limiter::new(100);
        limiter.charge(60).unwrap();
        assert_eq!(limiter.charge(41), Err(LimitExceeded));
        assert_eq!(limiter.used(), 60);
    }

    #[test]
    fn limit_only_moves_forward() {
        let mut limiter = Limiter::new(100);
        assert!(!limiter.on_limit_received(100));
        assert!(!limiter.on_limit_received(50));
        assert!(limiter.on_limit_received(200));
        assert_eq!(limiter.limit(), 200);
    }

    #[test]
    fn broadcasts_once_half_the_window_is_consumed() {
        let mut limiter = Limiter::new(100);
        assert!(!limiter.advance(49));
        assert!(limiter.advance(50));
    }

    #[test]
    fn raise_limit_after_broadcast_resets_availability() {
        let mut limiter = Limiter::new(100);
        limiter.advance(50);
        assert!(limiter.should_broadcast());
        limiter.raise_limit(200);
        assert!(!limiter.should_broadcast());
    }
}
