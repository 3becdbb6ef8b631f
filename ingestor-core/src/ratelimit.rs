//! Fixed-window rate limiter core logic (§4.5, §3 "Rate-limiter state").
//! Pure state machine; the RPC service wraps one instance behind a mutex.

/// `(window_start_timestamp, count_in_window)` for a single caller id.
#[derive(Debug, Clone, Copy)]
struct Window {
    start_timestamp: i64,
    count: u32,
}

/// A single caller's fixed-window counter, keyed externally by id in the
/// service's map.
#[derive(Debug, Clone, Copy)]
pub struct FixedWindowLimiter {
    window: Option<Window>,
    limit: u32,
    window_seconds: i64,
}

impl FixedWindowLimiter {
    pub fn new(limit: u32, window_seconds: i64) -> Self {
        Self {
            window: None,
            limit,
            window_seconds,
        }
    }

    /// `ConsumeToken(now)`: reset the window if it has elapsed, otherwise
    /// admit up to `limit` callers within the current window.
    pub fn consume_token(&mut self, now: i64) -> bool {
        match self.window {
            None => {
                self.window = Some(Window {
                    start_timestamp: now,
                    count: 1,
                });
                true
            }
            Some(w) if now - w.start_timestamp > self.window_seconds => {
                self.window = Some(Window {
                    start_timestamp: now,
                    count: 1,
                });
                true
            }
            Some(w) if w.count < self.limit => {
                self.window = Some(Window {
                    count: w.count + 1,
                    ..w
                });
                true
            }
            Some(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_limit_then_denies_until_window_rolls() {
        // Limit = 3, window = 30s. Calls at t=0,1,2,3,4,35.
        let mut limiter = FixedWindowLimiter::new(3, 30);
        assert!(limiter.consume_token(0));
        assert!(limiter.consume_token(1));
        assert!(limiter.consume_token(2));
        assert!(!limiter.consume_token(3));
        assert!(!limiter.consume_token(4));
        assert!(limiter.consume_token(35));
    }

    #[test]
    fn first_call_ever_always_succeeds() {
        let mut limiter = FixedWindowLimiter::new(1, 30);
        assert!(limiter.consume_token(1_000));
    }
}
