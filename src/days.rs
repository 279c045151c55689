//! Day segmentation and quality filtering
//!
//! Splits a recording into day windows at midnight boundaries, drops days
//! failing wear/posture/partial-day thresholds, and exposes the survivors as
//! a contiguous, renumbered `DaySet`.
//!
//! Filtering never mutates the windows themselves: the `DayArena` stores
//! every indexed day and tracks removal through a kept flag, so the raw day
//! set remains available to downstream consumers after filtering.

use chrono::Timelike;
use std::collections::BTreeMap;

use crate::config::DayQualityConfig;
use crate::epochs::{EpochRate, EpochSeries};
use crate::types::{DayWindow, Window};

/// All day windows of one recording plus the kept-index set
#[derive(Debug, Clone)]
pub struct DayArena {
    days: Vec<DayWindow>,
    kept: Vec<bool>,
}

impl DayArena {
    /// Every indexed day in chronological order, unfiltered
    pub fn all(&self) -> &[DayWindow] {
        &self.days
    }

    /// Number of indexed days before filtering
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Number of days removed by filtering so far
    pub fn removed(&self) -> usize {
        self.kept.iter().filter(|k| !**k).count()
    }

    /// Raw day mapping numbered chronologically from 1, ignoring filtering
    pub fn raw(&self) -> BTreeMap<u32, DayWindow> {
        self.days
            .iter()
            .enumerate()
            .map(|(i, d)| (i as u32 + 1, d.clone()))
            .collect()
    }

    /// Drop days failing the configured quality thresholds.
    ///
    /// Only the kept flags change; renumbering happens separately in
    /// [`DayArena::renumbered`].
    pub fn apply_quality_filter(
        &mut self,
        series: &EpochSeries,
        rate: EpochRate,
        config: &DayQualityConfig,
    ) {
        for (i, day) in self.days.iter().enumerate() {
            if !self.kept[i] {
                continue;
            }
            if day_fails_quality(day, series, rate, config) {
                self.kept[i] = false;
            }
        }
    }

    /// Survivors renumbered to contiguous `1..N` in chronological order
    pub fn renumbered(&self) -> DaySet {
        DaySet {
            days: self
                .days
                .iter()
                .zip(&self.kept)
                .filter(|(_, kept)| **kept)
                .map(|(day, _)| day.clone())
                .collect(),
        }
    }
}

/// The filtered, contiguously numbered day-window set.
///
/// Day numbers are 1-based; adjacency questions (a shift straddling midnight
/// belongs partly to the previous day) go through [`DaySet::predecessor`]
/// rather than day-number arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySet {
    days: Vec<DayWindow>,
}

impl DaySet {
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Day window for 1-based day number `day`
    pub fn get(&self, day: u32) -> Option<&DayWindow> {
        (day >= 1).then(|| self.days.get(day as usize - 1)).flatten()
    }

    /// The kept day immediately before `day`, if any
    pub fn predecessor(&self, day: u32) -> Option<&DayWindow> {
        (day >= 2).then(|| self.get(day - 1)).flatten()
    }

    /// Iterate `(day_number, window)` pairs in chronological order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &DayWindow)> {
        self.days.iter().enumerate().map(|(i, d)| (i as u32 + 1, d))
    }
}

/// Split a recording into day windows at midnight boundaries.
///
/// Every epoch whose local time is exactly midnight opens a boundary;
/// consecutive midnight epochs (sub-minute epoch lengths) collapse into the
/// first. Index 0 is forced in as a boundary and the sequence length closes
/// the final window, so a recording shorter than one day yields one window.
pub fn index_days(series: &EpochSeries) -> DayArena {
    let timestamps = series.timestamps();
    let mut boundaries = Vec::new();
    let mut in_midnight_run = false;
    for (i, ts) in timestamps.iter().enumerate() {
        let at_midnight = ts.hour() == 0 && ts.minute() == 0;
        if at_midnight && !in_midnight_run {
            boundaries.push(i);
        }
        in_midnight_run = at_midnight;
    }

    if boundaries.first() != Some(&0) {
        boundaries.insert(0, 0);
    }
    boundaries.push(series.len());

    let days = boundaries
        .windows(2)
        .map(|pair| {
            let window = Window {
                start: pair[0],
                end: pair[1],
            };
            DayWindow::new(window, timestamps[pair[0]].date())
        })
        .collect::<Vec<_>>();
    let kept = vec![true; days.len()];
    DayArena { days, kept }
}

fn day_fails_quality(
    day: &DayWindow,
    series: &EpochSeries,
    rate: EpochRate,
    config: &DayQualityConfig,
) -> bool {
    let Window { start, end } = day.window;
    let length = (end - start) as f64;

    if config.drop_partial_days && day.len() < rate.per_day {
        return true;
    }

    if let Some(max_non_wear) = config.max_non_wear {
        let count = series.non_wear()[start..end]
            .iter()
            .filter(|c| **c == config.non_wear_code)
            .count();
        if count as f64 > length * max_non_wear {
            return true;
        }
    }

    for limit in &config.posture_limits {
        let count = series.activity()[start..end]
            .iter()
            .filter(|c| **c == limit.code)
            .count();
        if count as f64 > length * limit.max_fraction {
            return true;
        }
    }

    false
}

/// Shift windows overlapping a day, clamped to the day's bounds.
///
/// Replaces date-equality lookups against the current and previous day: a
/// shift straddling midnight simply intersects both day windows.
pub fn shifts_overlapping_day(
    day: &DayWindow,
    shifts: &BTreeMap<u32, Window>,
) -> Vec<(u32, Window)> {
    shifts
        .iter()
        .filter_map(|(nr, shift)| shift.intersect(&day.window).map(|w| (*nr, w)))
        .collect()
}
