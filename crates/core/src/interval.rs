//! Interval clipping against an analysis window.

use chrono::Duration;

use crate::machine::DowntimeEvent;
use crate::{Timestamp, Window};

pub fn as_secs(d: Duration) -> f64 {
    d.num_milliseconds() as f64 / 1000.0
}

/// Length of `[event_start, event_end)` that lies inside `[window_start, window_end)`, never negative.
pub fn overlap(
    event_start: Timestamp,
    event_end: Timestamp,
    window_start: Timestamp,
    window_end: Timestamp,
) -> Duration {
    let lo = event_start.max(window_start);
    let hi = event_end.min(window_end);
    if hi > lo {
        hi - lo
    } else {
        Duration::zero()
    }
}

pub fn clip(event_start: Timestamp, event_end: Timestamp, window: &Window) -> Duration {
    overlap(event_start, event_end, window.start(), window.end())
}

/// Downtime clipped to the window; open events count up to the window end.
pub fn clipped_downtime(event: &DowntimeEvent, window: &Window) -> Duration {
    clip(event.start_time, event.effective_end(window), window)
}

/// Sum of clipped downtime in seconds. Overlapping records are not merged.
pub fn total_downtime_secs<'a, I>(events: I, window: &Window) -> f64
where
    I: IntoIterator<Item = &'a DowntimeEvent>,
{
    events
        .into_iter()
        .map(|ev| as_secs(clipped_downtime(ev, window)))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn t(h: u32, m: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
    }

    fn shift() -> Window {
        Window::new(t(6, 0), t(14, 0)).unwrap()
    }

    #[test]
    fn event_outside_window_is_zero() {
        assert_eq!(clip(t(2, 0), t(5, 0), &shift()), Duration::zero());
        assert_eq!(clip(t(14, 0), t(15, 0), &shift()), Duration::zero());
    }

    #[test]
    fn event_inside_window_keeps_its_length() {
        assert_eq!(clip(t(8, 0), t(9, 0), &shift()), Duration::hours(1));
    }

    #[test]
    fn partial_overlap_is_clipped() {
        assert_eq!(clip(t(5, 0), t(6, 30), &shift()), Duration::minutes(30));
        assert_eq!(clip(t(13, 45), t(16, 0), &shift()), Duration::minutes(15));
    }

    #[test]
    fn inverted_event_yields_zero() {
        assert_eq!(overlap(t(9, 0), t(8, 0), t(6, 0), t(14, 0)), Duration::zero());
    }

    #[test]
    fn open_event_is_clipped_at_window_end() {
        let ev = DowntimeEvent {
            machine_id: 1,
            category: "mechanical".into(),
            reason: "jam".into(),
            start_time: t(13, 0),
            end_time: None,
            resolved: false,
        };
        assert_eq!(clipped_downtime(&ev, &shift()), Duration::hours(1));
        assert!((total_downtime_secs([&ev, &ev], &shift()) - 7200.0).abs() < 1e-9);
    }
}
