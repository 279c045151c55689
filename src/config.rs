//! Run configuration
//!
//! One immutable `SegmentConfig` is built per run and passed explicitly to
//! each component. Defaults mirror the study configuration the engine was
//! developed against; JSON round-tripping is provided for callers that load
//! configuration from file.

use serde::{Deserialize, Serialize};

use crate::types::Code;

/// Duration bucket bounds in seconds, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationBucket {
    pub min_seconds: f64,
    pub max_seconds: f64,
}

impl DurationBucket {
    pub const fn new(min_seconds: f64, max_seconds: f64) -> Self {
        Self {
            min_seconds,
            max_seconds,
        }
    }
}

/// Per-posture day disqualification threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PostureLimit {
    /// Activity code checked against the day window
    pub code: Code,
    /// Maximum allowed fraction of the day spent in this code
    pub max_fraction: f64,
}

/// Day quality thresholds applied by the day filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayQualityConfig {
    /// Non-wear channel code meaning "device not worn"
    pub non_wear_code: Code,
    /// Maximum allowed non-wear fraction per day; `None` disables the check
    pub max_non_wear: Option<f64>,
    /// Single-posture disqualification thresholds
    #[serde(default)]
    pub posture_limits: Vec<PostureLimit>,
    /// Drop windows shorter than one full day
    #[serde(default)]
    pub drop_partial_days: bool,
}

impl Default for DayQualityConfig {
    fn default() -> Self {
        Self {
            non_wear_code: 1,
            max_non_wear: Some(0.2),
            posture_limits: Vec::new(),
            drop_partial_days: false,
        }
    }
}

/// Bout detection and categorization parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoutConfig {
    /// Codes that can start or extend a bout
    pub tracked_codes: Vec<Code>,
    /// Subset of tracked codes binned with `inactive_buckets`
    #[serde(default)]
    pub inactive_codes: Vec<Code>,
    /// Maximum fraction of a run that may be absorbed noise
    pub noise_tolerance: f64,
    /// Minimum bout duration ("cut") in seconds; runs shorter than this use
    /// the stricter gap rule
    pub cut_seconds: f64,
    /// Duration buckets for inactive codes, in seconds
    pub inactive_buckets: Vec<DurationBucket>,
    /// Duration buckets for all other tracked codes, in seconds
    pub active_buckets: Vec<DurationBucket>,
}

impl Default for BoutConfig {
    fn default() -> Self {
        Self {
            tracked_codes: vec![1, 2, 3, 4, 5],
            inactive_codes: vec![4, 5],
            noise_tolerance: 0.1,
            cut_seconds: 300.0,
            inactive_buckets: vec![
                DurationBucket::new(0.0, 1_800.0),
                DurationBucket::new(1_800.0, 3_600.0),
                DurationBucket::new(3_600.0, 7_200.0),
                DurationBucket::new(7_200.0, 86_400.0),
            ],
            active_buckets: vec![
                DurationBucket::new(0.0, 60.0),
                DurationBucket::new(60.0, 300.0),
                DurationBucket::new(300.0, 600.0),
                DurationBucket::new(600.0, 86_400.0),
            ],
        }
    }
}

impl BoutConfig {
    /// Bucket table for a code: inactive codes use the inactive table
    pub fn buckets_for(&self, code: Code) -> &[DurationBucket] {
        if self.inactive_codes.contains(&code) {
            &self.inactive_buckets
        } else {
            &self.active_buckets
        }
    }
}

/// Immutable configuration for one segmentation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentConfig {
    #[serde(default)]
    pub day_quality: DayQualityConfig,
    #[serde(default)]
    pub bouts: BoutConfig,
    /// Shifts at or below this duration are incidental bursts, not real shifts
    #[serde(default = "default_min_shift_minutes")]
    pub min_shift_minutes: u32,
}

fn default_min_shift_minutes() -> u32 {
    60
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            day_quality: DayQualityConfig::default(),
            bouts: BoutConfig::default(),
            min_shift_minutes: default_min_shift_minutes(),
        }
    }
}

impl SegmentConfig {
    /// Load configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_roundtrip() {
        let config = SegmentConfig::default();
        let json = config.to_json().unwrap();
        let loaded = SegmentConfig::from_json(&json).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SegmentConfig::from_json("{}").unwrap();
        assert_eq!(config.min_shift_minutes, 60);
        assert_eq!(config.day_quality.max_non_wear, Some(0.2));
    }

    #[test]
    fn test_buckets_for_code() {
        let config = BoutConfig::default();
        assert_eq!(config.buckets_for(4), config.inactive_buckets.as_slice());
        assert_eq!(config.buckets_for(1), config.active_buckets.as_slice());
    }
}
