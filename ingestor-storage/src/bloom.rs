use bloomfilter::Bloom;

/// In-process bloom filter gating SQL writes to the streamer registry (§3:
/// "≈10M entries, 0.1% false-positive rate"). A positive hit means the id
/// has *probably* already been persisted and the registry insert can be
/// skipped; a miss is certain and always triggers an insert.
pub struct StreamerBloom {
    inner: Bloom<u64>,
}

impl StreamerBloom {
    pub fn new(expected_items: u64, false_positive_rate: f64) -> Self {
        Self {
            inner: Bloom::new_for_fp_rate(expected_items as usize, false_positive_rate)
                .expect("bloom filter parameters must be valid"),
        }
    }

    /// Returns `true` if `streamer_id` should be inserted: it was not
    /// already marked as seen. Always marks it as seen afterward.
    pub fn should_insert(&mut self, streamer_id: u64) -> bool {
        let already_seen = self.inner.check_and_set(&streamer_id);
        !already_seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_observation_of_the_same_id_is_suppressed() {
        let mut bloom = StreamerBloom::new(1000, 0.01);
        assert!(bloom.should_insert(42));
        assert!(!bloom.should_insert(42));
    }
}
