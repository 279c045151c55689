//! Core types for the actiseg engine
//!
//! This module defines the data structures that flow through the segmentation
//! pipeline: epoch-index windows, day windows with date metadata, parsed shift
//! records, and the per-subject QC record.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::SegmentError;

/// An activity or non-wear classifier code. Codes are small enumerable values.
pub type Code = u8;

/// Half-open epoch-index interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    /// Create a window, enforcing `start < end`
    pub fn new(start: usize, end: usize) -> Result<Self, SegmentError> {
        if start >= end {
            return Err(SegmentError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Number of epochs covered
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Whether `idx` falls inside the window
    pub fn contains(&self, idx: usize) -> bool {
        idx >= self.start && idx < self.end
    }

    /// Overlapping part of two windows, if any
    pub fn intersect(&self, other: &Window) -> Option<Window> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(Window { start, end })
    }
}

/// A day window with derived date metadata.
///
/// Weekday numbering follows the shift tables: Monday = 1 .. Sunday = 7.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub window: Window,
    pub date: NaiveDate,
    pub weekday_nr: u8,
    pub weekday_name: String,
}

impl DayWindow {
    pub fn new(window: Window, date: NaiveDate) -> Self {
        Self {
            window,
            date,
            weekday_nr: date.weekday().number_from_monday() as u8,
            weekday_name: date.format("%A").to_string(),
        }
    }

    /// Length of the day in epochs
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

/// A parsed shift datetime pair, annotated by the validator.
///
/// `nr` is the shift's position in the subject's table row (1-based), kept for
/// warning messages; the mapped windows are renumbered chronologically later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftRecord {
    pub nr: u32,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Starts before the recording; the mapper will clamp it
    pub starts_before_data: bool,
    /// Ends after the recording; the mapper will clamp it
    pub ends_after_data: bool,
}

impl ShiftRecord {
    pub fn new(nr: u32, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            nr,
            start,
            end,
            starts_before_data: false,
            ends_after_data: false,
        }
    }
}

/// Per-subject QC record for shift parsing and mapping.
///
/// Immutable once returned by the pipeline; warnings accumulate in order of
/// detection and are handed as-is to the report layer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QcRecord {
    pub subject_id: String,
    pub data_start: Option<NaiveDateTime>,
    pub data_end: Option<NaiveDateTime>,
    /// Detected shift table layout, as a stable string ("date_time"/"numeric")
    pub format: Option<String>,
    /// Rows in the shift table matching the subject id
    pub id_occurrences: Option<usize>,
    /// Subject row was found but held no shift data at all
    pub no_data: Option<bool>,
    /// Number of mapped shift windows before partitioning
    pub nr_shifts: Option<usize>,
    /// Epoch count per mapped shift window, keyed by shift number
    pub shift_epochs: BTreeMap<u32, usize>,
    pub warnings: Vec<String>,
}

impl QcRecord {
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            ..Self::default()
        }
    }

    /// Warnings joined for single-cell report output
    pub fn warnings_joined(&self) -> String {
        self.warnings.join("; ")
    }
}

/// Format a datetime for warning messages (`dd.mm.yyyy HH:MM`)
pub(crate) fn fmt_dt(dt: &NaiveDateTime) -> String {
    dt.format("%d.%m.%Y %H:%M").to_string()
}

/// Element-wise sum of per-bucket counts, used when combining sub-ranges
pub fn add_counts(acc: &mut BTreeMap<Code, Vec<usize>>, other: &BTreeMap<Code, Vec<usize>>) {
    for (code, counts) in other {
        let entry = acc.entry(*code).or_insert_with(|| vec![0; counts.len()]);
        for (a, b) in entry.iter_mut().zip(counts) {
            *a += b;
        }
    }
}
