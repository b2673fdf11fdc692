//! Core types and calculators for shop-floor OEE analytics.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub type MachineId = u64;
pub type Timestamp = DateTime<Utc>;

/// Half-open analysis range `[start, end)`. Construction rejects empty or inverted ranges.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawWindow")]
pub struct Window {
    start: Timestamp,
    end: Timestamp,
}

#[derive(Deserialize)]
struct RawWindow {
    start: Timestamp,
    end: Timestamp,
}

impl TryFrom<RawWindow> for Window {
    type Error = CoreError;

    fn try_from(raw: RawWindow) -> Result<Self, Self::Error> {
        Window::new(raw.start, raw.end)
    }
}

impl Window {
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, CoreError> {
        if end <= start {
            return Err(CoreError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Window of `length` ending at `end`.
    pub fn trailing(end: Timestamp, length: Duration) -> Result<Self, CoreError> {
        Self::new(end - length, end)
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn duration_secs(&self) -> f64 {
        interval::as_secs(self.duration())
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Calendar dates touched by the window. The end is exclusive, so a window
    /// ending exactly at midnight does not reach into the following day.
    pub fn date_span(&self) -> DateSpan {
        let last_instant = self.end - Duration::nanoseconds(1);
        DateSpan {
            first: self.start.date_naive(),
            last: last_instant.date_naive(),
        }
    }

    /// Splits the window at UTC midnights. Every piece is non-empty.
    pub fn split_days(&self) -> Vec<Window> {
        let mut pieces = Vec::new();
        let mut cursor = self.start;
        while cursor < self.end {
            let next_midnight = cursor
                .date_naive()
                .succ_opt()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
                .unwrap_or(self.end);
            let piece_end = next_midnight.min(self.end);
            pieces.push(Window { start: cursor, end: piece_end });
            cursor = piece_end;
        }
        pieces
    }
}

/// Inclusive range of calendar dates, used for shift-level production queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateSpan {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

impl DateSpan {
    pub fn single(date: NaiveDate) -> Self {
        Self { first: date, last: date }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.first && date <= self.last
    }
}

/// Result of an analysis that may legitimately find nothing to report on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum Outcome<T> {
    Computed(T),
    NoData,
}

impl<T> Outcome<T> {
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Outcome::Computed(v),
            None => Outcome::NoData,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Outcome::NoData)
    }

    pub fn computed(self) -> Option<T> {
        match self {
            Outcome::Computed(v) => Some(v),
            Outcome::NoData => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Computed(v) => Outcome::Computed(f(v)),
            Outcome::NoData => Outcome::NoData,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    #[error("record store query failed: {0}")]
    Query(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("invalid window: end {end} is not after start {start}")]
    InvalidWindow { start: Timestamp, end: Timestamp },
    #[error("machine {0} not found")]
    MachineNotFound(MachineId),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub mod interval;
pub mod machine;
pub mod oee;
pub mod store;
