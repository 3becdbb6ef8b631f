//! Fixed-width time bucketing and Welford running variance for per-broadcaster
//! hype detection (§4.1). `TimeBucketStats` is the statistics engine;
//! `DetectorState` layers the anomaly predicate, cooldown, and the 60-bucket
//! offline-reset heuristic on top of it (§3 per-broadcaster detector state,
//! invariants V2/V3).

const ANOMALY_MULTIPLIER: f64 = 5.0;

/// Welford's numerically-stable online mean/variance update.
#[derive(Debug, Clone, Copy, Default)]
struct Welford {
    n: u64,
    mean: f64,
    m2: f64,
}

impl Welford {
    fn update(&mut self, x: f64) {
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        let delta2 = x - self.mean;
        self.m2 += delta * delta2;
    }

    fn variance(&self) -> f64 {
        if self.n < 2 {
            0.0
        } else {
            self.m2 / (self.n - 1) as f64
        }
    }

    fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// Fixed-width time-bucket counter with a running Welford variance over
/// closed bucket counts.
#[derive(Debug, Clone)]
pub struct TimeBucketStats {
    bucket_size_seconds: i64,
    max_bucket_gap: i64,
    current_bucket_index: Option<i64>,
    current_bucket_count: u64,
    last_closed_bucket_count: u64,
    welford: Welford,
}

impl TimeBucketStats {
    pub fn new(bucket_size_seconds: i64, max_bucket_gap: i64) -> Self {
        Self {
            bucket_size_seconds,
            max_bucket_gap,
            current_bucket_index: None,
            current_bucket_count: 0,
            last_closed_bucket_count: 0,
            welford: Welford::default(),
        }
    }

    /// Appends a single observation at `timestamp_seconds`. Returns `true`
    /// if the gap since the last observation exceeded `max_bucket_gap`
    /// buckets and all state was reset (the stream is presumed to have gone
    /// offline and come back).
    pub fn append(&mut self, timestamp_seconds: i64) -> bool {
        let bucket = timestamp_seconds.div_euclid(self.bucket_size_seconds);

        let current = match self.current_bucket_index {
            None => {
                self.current_bucket_index = Some(bucket);
                self.current_bucket_count = 1;
                return false;
            }
            Some(c) => c,
        };

        if bucket == current {
            self.current_bucket_count += 1;
            return false;
        }

        if bucket < current {
            // Out-of-order arrival; within a single broadcaster the listener
            // publishes in order, so this is defensive only. Fold it into
            // the still-open current bucket rather than moving backward.
            self.current_bucket_count += 1;
            return false;
        }

        let gap = bucket - current;
        if gap > self.max_bucket_gap {
            *self = Self::new(self.bucket_size_seconds, self.max_bucket_gap);
            self.current_bucket_index = Some(bucket);
            self.current_bucket_count = 1;
            return true;
        }

        // Empty buckets strictly between `current` and `bucket` each
        // contribute a zero sample (invariant V2).
        for _ in 1..gap {
            self.welford.update(0.0);
        }
        self.welford.update(self.current_bucket_count as f64);
        self.last_closed_bucket_count = self.current_bucket_count;
        self.current_bucket_index = Some(bucket);
        self.current_bucket_count = 1;
        false
    }

    /// Number of closed buckets folded into the running variance so far.
    pub fn size(&self) -> u64 {
        self.welford.n
    }

    /// Whether the most recently closed bucket exceeds 5 standard
    /// deviations of the running variance.
    pub fn check_for_anomaly(&self) -> bool {
        self.last_closed_bucket_count as f64 > ANOMALY_MULTIPLIER * self.welford.stddev()
    }

    /// Convenience composite: append, then report whether the statistics
    /// are warmed up (`size() > 60`) and currently anomalous.
    pub fn append_and_check(&mut self, timestamp_seconds: i64) -> bool {
        self.append(timestamp_seconds);
        self.size() > 60 && self.check_for_anomaly()
    }
}

/// Outcome of observing one chat message for a broadcaster's detector
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// No anomaly: either not warmed up, not anomalous, or suppressed by
    /// cooldown.
    Quiet,
    /// A hype moment was detected and should be published.
    Anomaly { timestamp_seconds: i64 },
}

/// Per-broadcaster detector state, keyed by `broadcaster_id` in the
/// anomaly-detector worker's in-memory map.
#[derive(Debug, Clone)]
pub struct DetectorState {
    stats: TimeBucketStats,
    last_anomaly_timestamp: i64,
    cooldown_seconds: i64,
}

impl DetectorState {
    pub fn new(bucket_size_seconds: i64, max_bucket_gap: i64, cooldown_seconds: i64) -> Self {
        Self {
            stats: TimeBucketStats::new(bucket_size_seconds, max_bucket_gap),
            last_anomaly_timestamp: 0,
            cooldown_seconds,
        }
    }

    /// Feed one chat-message second into the detector and decide whether to
    /// emit an anomaly, honoring the cooldown window (§4.2 steps 4-5).
    pub fn observe(&mut self, timestamp_seconds: i64) -> Observation {
        let reset = self.stats.append(timestamp_seconds);
        if reset {
            self.last_anomaly_timestamp = 0;
        }

        if self.stats.size() <= 60 || !self.stats.check_for_anomaly() {
            return Observation::Quiet;
        }

        if timestamp_seconds - self.last_anomaly_timestamp > self.cooldown_seconds {
            self.last_anomaly_timestamp = timestamp_seconds;
            Observation::Anomaly {
                timestamp_seconds,
            }
        } else {
            Observation::Quiet
        }
    }
}

/// Whether a chat message's text matches `^![A-Za-z0-9]+.*$` — a command,
/// not organic chat, that must never influence detector state (§4.2 step 1,
/// P4). The pattern only requires the character immediately after `!` to be
/// alphanumeric; anything may follow.
pub fn is_command(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next() == Some('!') && chars.next().is_some_and(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucketing_sanity_scenario() {
        // Bucket size 5s; append [100, 101, 102, 115].
        let mut stats = TimeBucketStats::new(5, 60);
        for ts in [100, 101, 102, 115] {
            stats.append(ts);
        }
        // Buckets 20 (count 3) and the two empty gap buckets 21, 22 close;
        // bucket 23 stays open with count 1. n=3 closed buckets total.
        assert_eq!(stats.size(), 3);
    }

    #[test]
    fn welford_matches_batch_variance() {
        // Drive a bucket count sequence directly (one bucket per second)
        // and compare the internal Welford accumulator's stddev against a
        // textbook batch computation over the same closed-bucket counts.
        let counts: Vec<u64> = (0..500).map(|i| (i * 7 % 97) as u64).collect();

        let mut stats = TimeBucketStats::new(1, i64::MAX / 2);
        for (bucket, &count) in counts.iter().enumerate() {
            // Zero-count buckets need no appends at all: the gap-fill in
            // `append` contributes their zero sample automatically once a
            // later, non-empty bucket is observed.
            for _ in 0..count {
                stats.append(bucket as i64);
            }
        }
        // Force the final bucket closed.
        stats.append(counts.len() as i64);

        let closed = &counts[..counts.len()];
        let mean = closed.iter().map(|&c| c as f64).sum::<f64>() / closed.len() as f64;
        let variance = closed
            .iter()
            .map(|&c| (c as f64 - mean).powi(2))
            .sum::<f64>()
            / (closed.len() - 1) as f64;
        let expected_stddev = variance.sqrt();

        assert_eq!(stats.size() as usize, closed.len());
        let actual_stddev = stats.welford.stddev();
        assert!(
            (actual_stddev - expected_stddev).abs() < 1e-6,
            "actual={actual_stddev} expected={expected_stddev}"
        );
    }

    #[test]
    fn cooldown_suppresses_repeat_anomalies() {
        let mut state = DetectorState::new(5, 60, 30);
        let bs = 5i64;

        // Prime 61 quiet buckets (indices 0..=60), each count 1. This
        // closes 60 of them (size() == 60, not yet over threshold) and
        // leaves bucket 60 open with count 1.
        for bucket in 0..=60i64 {
            state.observe(bucket * bs);
        }

        // Spike: bucket 60 grows to 1000 messages, then closes when bucket
        // 61 opens. The baseline variance is ~0 (60 identical samples), so
        // this comfortably trips the 5-sigma threshold.
        for _ in 0..999 {
            state.observe(60 * bs);
        }
        let first = state.observe(61 * bs);
        assert!(matches!(first, Observation::Anomaly { timestamp_seconds } if timestamp_seconds == 61 * bs));

        // A second, equally large spike closes 5s later — well inside the
        // 30s cooldown — and must be suppressed even though it would
        // otherwise qualify.
        for _ in 0..999 {
            state.observe(61 * bs);
        }
        let suppressed = state.observe(62 * bs);
        assert_eq!(suppressed, Observation::Quiet);

        // Five quiet buckets carry the clock past the cooldown window.
        for bucket in 63..=67i64 {
            state.observe(bucket * bs);
        }

        // A much larger spike closes 40s after the first anomaly — past
        // cooldown — and should fire again.
        for _ in 0..1_000_000 {
            state.observe(68 * bs);
        }
        let second = state.observe(69 * bs);
        assert!(matches!(second, Observation::Anomaly { .. }));
    }

    #[test]
    fn offline_gap_resets_state() {
        let mut stats = TimeBucketStats::new(5, 60);
        stats.append(0);
        let reset = stats.append(5 * 61 * 10); // far beyond 60-bucket gap
        assert!(reset);
        assert_eq!(stats.size(), 0);
    }

    #[test]
    fn command_messages_are_filtered() {
        assert!(is_command("!ping"));
        assert!(is_command("!ban123"));
        assert!(!is_command("! not a command"));
        assert!(!is_command("hello"));
        assert!(!is_command("!"));
    }
}
