//! Report builders over downtime and production snapshots (rollups, trends, top-K).

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

pub mod downtime;
pub mod production;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopKConfig {
    pub k: usize,
}

impl Default for TopKConfig {
    fn default() -> Self {
        Self { k: 10 }
    }
}

/// Sorts descending by `key` (stable for ties) and keeps at most `cfg.k` items.
pub fn top_k<T, F>(mut items: Vec<T>, cfg: TopKConfig, key: F) -> Vec<T>
where
    F: Fn(&T) -> f64,
{
    sort_desc_by(&mut items, key);
    items.truncate(cfg.k);
    items
}

pub(crate) fn sort_desc_by<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> f64,
{
    items.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));
}

pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_k_keeps_largest_in_order() {
        let out = top_k(vec![3.0, 9.0, 1.0, 7.0], TopKConfig { k: 2 }, |v| *v);
        assert_eq!(out, vec![9.0, 7.0]);
    }

    #[test]
    fn top_k_with_fewer_items_than_k() {
        let out = top_k(vec![1.0, 2.0], TopKConfig::default(), |v| *v);
        assert_eq!(out, vec![2.0, 1.0]);
    }

    #[test]
    fn mean_of_nothing_is_zero() {
        assert_eq!(mean(Vec::<f64>::new()), 0.0);
        assert_eq!(mean(vec![10.0, 20.0]), 15.0);
    }
}
