use std::time::{Duration, Instant};

/// Token bucket applied per connection to inbound frames.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    tokens: u32,
    max_tokens: u32,
    refill_rate: Duration,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::new_with_limits(20, Duration::from_millis(100))
    }

    pub fn new_with_limits(max_tokens: u32, refill_rate: Duration) -> Self {
        Self {
            tokens: max_tokens,
            max_tokens,
            // A zero interval would divide by zero on refill.
            refill_rate: refill_rate.max(Duration::from_millis(1)),
            last_refill: Instant::now(),
        }
    }

    pub fn check_rate_limit(&mut self) -> bool {
        self.refill_tokens();

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill_tokens(&mut self) {
        let elapsed = self.last_refill.elapsed();
        if elapsed < self.refill_rate {
            return;
        }

        let intervals = u32::try_from(elapsed.as_millis() / self.refill_rate.as_millis())
            .unwrap_or(u32::MAX);
        self.tokens = self.tokens.saturating_add(intervals).min(self.max_tokens);
        if self.tokens == self.max_tokens {
            self.last_refill = Instant::now();
        } else {
            // Carry the partial interval over to the next refill.
            self.last_refill += self.refill_rate * intervals;
        }
    }

    pub fn remaining_tokens(&mut self) -> u32 {
        self.refill_tokens();
        self.tokens
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
