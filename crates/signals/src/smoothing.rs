//! Rolling mean and fixed-interval resampling.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration};
use serde::{Deserialize, Serialize};

use oee_core::{CoreError, Timestamp};

use crate::Point;

/// Rolling mean of width `k`. The leading values average whatever is available,
/// so the output has the same length as the input. `k = 0` behaves as `k = 1`.
pub fn moving_average(values: &[f64], k: usize) -> Vec<f64> {
    let k = k.max(1);
    (0..values.len())
        .map(|i| {
            // each window summed independently
            let window = &values[(i + 1).saturating_sub(k)..=i];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bucket {
    pub start: Timestamp,
    pub mean: f64,
    pub count: usize,
}

/// Groups points into epoch-aligned buckets of width `bucket` and averages each.
/// Empty buckets are left out.
pub fn resample(points: &[Point], bucket: Duration) -> Result<Vec<Bucket>, CoreError> {
    let width = bucket.num_milliseconds();
    if width <= 0 {
        return Err(CoreError::InvalidParameter(format!(
            "bucket width must be positive, got {width} ms"
        )));
    }

    let mut acc: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for (ts, value) in points {
        let key = ts.timestamp_millis().div_euclid(width) * width;
        let slot = acc.entry(key).or_insert((0.0, 0));
        slot.0 += value;
        slot.1 += 1;
    }

    Ok(acc
        .into_iter()
        .filter_map(|(key, (sum, count))| {
            DateTime::from_timestamp_millis(key).map(|start| Bucket {
                start,
                mean: sum / count as f64,
                count,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn window_shrinks_at_the_start() {
        assert_eq!(
            moving_average(&[10.0, 20.0, 30.0, 40.0], 3),
            vec![10.0, 15.0, 20.0, 30.0]
        );
    }

    #[test]
    fn degenerate_widths() {
        assert_eq!(moving_average(&[1.0, 3.0], 0), vec![1.0, 3.0]);
        assert_eq!(moving_average(&[1.0, 3.0], 10), vec![1.0, 2.0]);
        assert!(moving_average(&[], 3).is_empty());
    }

    #[test]
    fn large_values_do_not_leak_into_later_windows() {
        assert_eq!(
            moving_average(&[1e16, 1.0, 1.0, 1.0], 2),
            vec![1e16, 5e15, 1.0, 1.0]
        );
    }

    #[test]
    fn hourly_buckets_skip_gaps() {
        let t = |h: u32, m: u32| Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap();
        let points = vec![
            (t(6, 5), 10.0),
            (t(6, 55), 20.0),
            (t(9, 0), 7.0),
        ];
        let buckets = resample(&points, Duration::hours(1)).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].start, t(6, 0));
        assert_eq!(buckets[0].mean, 15.0);
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[1].start, t(9, 0));
    }

    #[test]
    fn zero_width_bucket_is_rejected() {
        assert!(matches!(
            resample(&[], Duration::zero()),
            Err(CoreError::InvalidParameter(_))
        ));
    }
}
