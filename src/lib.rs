//! actiseg - Time-window segmentation and bout analytics for coded
//! accelerometer epoch series
//!
//! actiseg turns a per-epoch coded time series (activity code, non-wear code)
//! from a wearable accelerometer into the window structures behind per-day
//! and per-work-shift behavioral statistics:
//!
//! - **Day segmentation**: midnight-boundary day windows, quality filtering,
//!   contiguous renumbering
//! - **Shift extraction**: layout auto-detection and parsing of an external
//!   work-shift table, validation, epoch-index mapping, and partitioning into
//!   real shifts and between-shift spans
//! - **Bout analytics**: noise-tolerant same-code runs within any window,
//!   binned into duration buckets
//!
//! Ingestion (CSV reading), descriptive statistics, and reporting stay with
//! the caller; the pipeline consumes validated in-memory inputs and hands
//! back window sets plus one QC record per subject.

pub mod bouts;
pub mod config;
pub mod days;
pub mod epochs;
pub mod error;
pub mod partition;
pub mod pipeline;
pub mod shift_map;
pub mod shift_table;
pub mod types;

pub use config::{BoutConfig, DayQualityConfig, DurationBucket, PostureLimit, SegmentConfig};
pub use days::{index_days, shifts_overlapping_day, DayArena, DaySet};
pub use epochs::{EpochRate, EpochSeries};
pub use error::SegmentError;
pub use partition::{partition_shifts, ShiftPartition};
pub use pipeline::{SegmentProcessor, SegmentRun, ShiftAnalysis, SubjectSegmentation};
pub use shift_table::{ShiftTable, ShiftTableFormat};
pub use types::{Code, DayWindow, QcRecord, ShiftRecord, Window};

/// Engine version embedded in QC reports by callers
pub const ACTISEG_VERSION: &str = env!("CARGO_PKG_VERSION");
