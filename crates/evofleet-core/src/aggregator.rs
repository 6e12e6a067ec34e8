//! Time-bucketed running averages over the generation-result stream.
//!
//! The dashboard charts fleet progress without keeping every result: each
//! result is folded into the bucket `floor(t / width) * width` and only the
//! running means survive. Buckets are keyed by value, so a result delayed by
//! the network still lands in the window it belongs to.

use std::collections::BTreeMap;
use std::num::NonZeroU64;

use chrono::{DateTime, Utc};
use evofleet_types::{AggregationBucket, GenerationResult};

/// Default bucket width: 5 seconds.
pub const DEFAULT_BUCKET_WIDTH_MS: u64 = 5_000;

/// [`DEFAULT_BUCKET_WIDTH_MS`] as a width.
pub const DEFAULT_BUCKET_WIDTH: NonZeroU64 = match NonZeroU64::new(DEFAULT_BUCKET_WIDTH_MS) {
    Some(width) => width,
    None => NonZeroU64::MIN,
};

/// Folds generation results into fixed-width time buckets.
#[derive(Debug, Clone)]
pub struct StreamingAggregator {
    width_ms: i64,
    buckets: BTreeMap<i64, AggregationBucket>,
}

impl StreamingAggregator {
    /// Create an aggregator with the given bucket width.
    pub fn new(width_ms: NonZeroU64) -> Self {
        Self {
            width_ms: i64::try_from(width_ms.get()).unwrap_or(i64::MAX),
            buckets: BTreeMap::new(),
        }
    }

    /// Bucket width in milliseconds.
    pub const fn width_ms(&self) -> i64 {
        self.width_ms
    }

    /// Key of the bucket covering `event_time`.
    pub fn bucket_key(&self, event_time: DateTime<Utc>) -> i64 {
        let ms = event_time.timestamp_millis();
        ms.div_euclid(self.width_ms).saturating_mul(self.width_ms)
    }

    /// Fold one result into its bucket and return the updated bucket.
    pub fn on_result(
        &mut self,
        event_time: DateTime<Utc>,
        result: &GenerationResult,
    ) -> &AggregationBucket {
        let key = self.bucket_key(event_time);
        let bucket = self.buckets.entry(key).or_insert_with(|| empty_bucket(key));
        fold(bucket, result);
        bucket
    }

    /// Look up a bucket by key.
    pub fn get(&self, key: i64) -> Option<&AggregationBucket> {
        self.buckets.get(&key)
    }

    /// Number of buckets created so far.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether no result has been folded yet.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// All buckets in ascending key order.
    pub fn snapshot(&self) -> Vec<AggregationBucket> {
        self.buckets.values().cloned().collect()
    }
}

const fn empty_bucket(key: i64) -> AggregationBucket {
    AggregationBucket {
        key,
        count: 0,
        avg_best: 0.0,
        avg_avg: 0.0,
        avg_worst: 0.0,
    }
}

/// Incremental mean update: `mean += (x - mean) / count`.
fn fold(bucket: &mut AggregationBucket, result: &GenerationResult) {
    bucket.count = bucket.count.saturating_add(1);
    #[allow(clippy::cast_precision_loss)]
    let n = bucket.count as f64;
    bucket.avg_best += (result.best_fitness - bucket.avg_best) / n;
    bucket.avg_avg += (result.avg_fitness - bucket.avg_avg) / n;
    bucket.avg_worst += (result.worst_fitness - bucket.avg_worst) / n;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rand::Rng;

    const EPS: f64 = 1e-9;

    fn at_secs(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn aggregator(width_ms: u64) -> StreamingAggregator {
        StreamingAggregator::new(NonZeroU64::new(width_ms).unwrap())
    }

    #[test]
    fn results_in_one_window_average_together() {
        let mut agg = aggregator(5_000);
        agg.on_result(at_secs(0), &GenerationResult::new(10.0, 11.0, 12.0));
        agg.on_result(at_secs(2), &GenerationResult::new(20.0, 21.0, 22.0));
        agg.on_result(at_secs(4), &GenerationResult::new(30.0, 31.0, 32.0));
        let bucket = agg.on_result(at_secs(6), &GenerationResult::new(40.0, 41.0, 42.0));
        assert_eq!(bucket.key, 5_000);
        assert_eq!(bucket.count, 1);
        assert!((bucket.avg_best - 40.0).abs() < EPS);

        let first = agg.get(0).unwrap();
        assert_eq!(first.count, 3);
        assert!((first.avg_best - 20.0).abs() < EPS);
        assert!((first.avg_avg - 21.0).abs() < EPS);
        assert!((first.avg_worst - 22.0).abs() < EPS);
    }

    #[test]
    fn running_mean_matches_arithmetic_mean() {
        let mut agg = aggregator(60_000);
        let mut rng = rand::rng();
        let mut value = 0.0_f64;
        let mut sum = 0.0_f64;
        let samples = 500_u32;
        for _ in 0..samples {
            value += rng.random_range(0.001..10.0);
            sum += value;
            agg.on_result(at_secs(1), &GenerationResult::new(value, value, value));
        }
        let bucket = agg.get(0).unwrap();
        let expected = sum / f64::from(samples);
        assert!((bucket.avg_best - expected).abs() < EPS * expected.max(1.0));
    }

    #[test]
    fn separate_windows_do_not_interact() {
        let mut agg = aggregator(5_000);
        agg.on_result(at_secs(1), &GenerationResult::new(1.0, 1.0, 1.0));
        agg.on_result(at_secs(7), &GenerationResult::new(100.0, 100.0, 100.0));
        assert!((agg.get(0).unwrap().avg_best - 1.0).abs() < EPS);
        assert!((agg.get(5_000).unwrap().avg_best - 100.0).abs() < EPS);
    }

    #[test]
    fn late_result_folds_into_its_own_window() {
        let mut agg = aggregator(5_000);
        agg.on_result(at_secs(1), &GenerationResult::new(10.0, 10.0, 10.0));
        agg.on_result(at_secs(12), &GenerationResult::new(50.0, 50.0, 50.0));
        agg.on_result(at_secs(3), &GenerationResult::new(30.0, 30.0, 30.0));

        let early = agg.get(0).unwrap();
        assert_eq!(early.count, 2);
        assert!((early.avg_best - 20.0).abs() < EPS);
        assert_eq!(agg.get(10_000).unwrap().count, 1);
    }

    #[test]
    fn snapshot_is_ascending() {
        let mut agg = aggregator(5_000);
        for secs in [20, 3, 11] {
            agg.on_result(at_secs(secs), &GenerationResult::new(1.0, 1.0, 1.0));
        }
        let keys: Vec<i64> = agg.snapshot().iter().map(|b| b.key).collect();
        assert_eq!(keys, vec![0, 10_000, 20_000]);
    }

    #[test]
    fn pre_epoch_times_floor_downwards() {
        let agg = aggregator(5_000);
        assert_eq!(agg.bucket_key(at_secs(-1)), -5_000);
    }
}
