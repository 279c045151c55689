//! Epoch series input
//!
//! The collaborator-provided input: one timestamp and one coded value per
//! channel per epoch. Construction validates column lengths and timestamp
//! monotonicity; the epoch rate (epochs per minute / per day) is inferred
//! from the first two timestamps.

use chrono::NaiveDateTime;

use crate::error::SegmentError;
use crate::types::Code;

/// Inferred epoch rate for a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochRate {
    /// Duration of one epoch in seconds
    pub epoch_seconds: i64,
    /// Epochs per minute
    pub per_minute: usize,
    /// Epochs per day
    pub per_day: usize,
}

/// A validated per-epoch coded time series for one subject
#[derive(Debug, Clone)]
pub struct EpochSeries {
    timestamps: Vec<NaiveDateTime>,
    activity: Vec<Code>,
    non_wear: Vec<Code>,
}

impl EpochSeries {
    /// Build a series from parallel columns.
    ///
    /// Fails if the columns differ in length, the series is shorter than two
    /// epochs, or the timestamps are not strictly increasing.
    pub fn new(
        timestamps: Vec<NaiveDateTime>,
        activity: Vec<Code>,
        non_wear: Vec<Code>,
    ) -> Result<Self, SegmentError> {
        if activity.len() != timestamps.len() || non_wear.len() != timestamps.len() {
            return Err(SegmentError::ColumnLengthMismatch(format!(
                "timestamps={}, activity={}, non_wear={}",
                timestamps.len(),
                activity.len(),
                non_wear.len()
            )));
        }
        if timestamps.len() < 2 {
            return Err(SegmentError::SeriesTooShort(timestamps.len()));
        }
        if let Some(i) = (1..timestamps.len()).find(|&i| timestamps[i] <= timestamps[i - 1]) {
            return Err(SegmentError::NonMonotonicTimestamps(i));
        }
        Ok(Self {
            timestamps,
            activity,
            non_wear,
        })
    }

    /// Build a series from raw timestamp strings (`YYYY-MM-DD HH:MM:SS`,
    /// seconds optional)
    pub fn from_strings(
        timestamps: &[String],
        activity: Vec<Code>,
        non_wear: Vec<Code>,
    ) -> Result<Self, SegmentError> {
        let parsed = timestamps
            .iter()
            .map(|s| parse_timestamp(s))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(parsed, activity, non_wear)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn activity(&self) -> &[Code] {
        &self.activity
    }

    pub fn non_wear(&self) -> &[Code] {
        &self.non_wear
    }

    /// Timestamp of the first epoch
    pub fn start(&self) -> NaiveDateTime {
        self.timestamps[0]
    }

    /// Timestamp of the last epoch
    pub fn end(&self) -> NaiveDateTime {
        self.timestamps[self.timestamps.len() - 1]
    }

    /// Index of the first epoch whose timestamp is `>= t`, if any.
    ///
    /// Timestamps are strictly increasing, so a binary search applies.
    pub fn first_at_or_after(&self, t: NaiveDateTime) -> Option<usize> {
        let idx = self.timestamps.partition_point(|ts| *ts < t);
        (idx < self.timestamps.len()).then_some(idx)
    }

    /// Infer the epoch rate from the first two timestamps
    pub fn epoch_rate(&self) -> Result<EpochRate, SegmentError> {
        let delta = self.timestamps[1] - self.timestamps[0];
        let epoch_seconds = delta.num_seconds();
        if epoch_seconds <= 0 {
            return Err(SegmentError::InvalidEpochDuration(epoch_seconds));
        }
        if 60 % epoch_seconds != 0 {
            return Err(SegmentError::NonDivisorEpochDuration(epoch_seconds));
        }
        let per_minute = (60 / epoch_seconds) as usize;
        Ok(EpochRate {
            epoch_seconds,
            per_minute,
            per_day: per_minute * 60 * 24,
        })
    }
}

/// Parse one timestamp cell, with and without a seconds component
fn parse_timestamp(s: &str) -> Result<NaiveDateTime, SegmentError> {
    let trimmed = s.trim();
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M"))
        .map_err(|_| SegmentError::TimestampParse(trimmed.to_string()))
}

/// Evenly spaced timestamps for test fixtures
#[cfg(test)]
pub(crate) fn make_timestamps(
    start: NaiveDateTime,
    count: usize,
    step_seconds: i64,
) -> Vec<NaiveDateTime> {
    (0..count)
        .map(|i| start + chrono::Duration::seconds(step_seconds * i as i64))
        .collect()
}
