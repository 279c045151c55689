//! Bout detection and categorization
//!
//! Decomposes a code sequence within a window into maximal same-code runs
//! ("bouts"), tolerating brief interruptions: classifier noise shows up as
//! isolated single-epoch flips, and treating every flip as a boundary would
//! massively overcount short bouts. An interruption is absorbed into the
//! current run when the gap back to the run's code is short and the run's
//! accumulated noise stays under the configured tolerance.
//!
//! Only tracked codes can start or extend a bout; other codes never cause a
//! boundary on their own.

use std::collections::BTreeMap;

use crate::config::BoutConfig;
use crate::types::{add_counts, Code, Window};

/// Detect noise-tolerant bouts in `window` over the full code sequence.
///
/// Returns tracked-code → ordered run lengths (epochs). A window without any
/// tracked-code epoch yields an empty list for every tracked code.
pub fn segment_window(
    codes: &[Code],
    window: Window,
    config: &BoutConfig,
    epochs_per_minute: usize,
) -> BTreeMap<Code, Vec<usize>> {
    let mut runs: BTreeMap<Code, Vec<usize>> = config
        .tracked_codes
        .iter()
        .map(|c| (*c, Vec::new()))
        .collect();
    let tracked = config.tracked_codes.as_slice();
    let cut_epochs = config.cut_seconds * epochs_per_minute as f64 / 60.0;

    // Skip any untracked prefix; no tracked epoch at all means no bouts.
    let Some(first) = (window.start..window.end).find(|&i| tracked.contains(&codes[i])) else {
        return runs;
    };

    let mut current = codes[first];
    let mut length: usize = 0;
    let mut noise: usize = 0;
    let mut i = first;

    while i < window.end {
        let value = codes[i];
        if value == current {
            length += 1;
            i += 1;
            continue;
        }

        let gap = gap_to_next(codes, current, i, window.end);
        let absorb = if (length as f64) < cut_epochs {
            gap < 2
        } else {
            gap < 3 && (noise as f64) / (length as f64) < config.noise_tolerance
        };
        if absorb {
            noise += 1;
            length += 1;
            i += 1;
            continue;
        }

        // Close the run. The mismatch was detected one epoch late when the
        // previous epoch was already absorbed noise: that epoch moves to the
        // new run instead.
        let prev_matches = i > window.start && codes[i - 1] == current;
        record_run(&mut runs, current, if prev_matches { length } else { length - 1 });
        length = if prev_matches { 1 } else { 2 };
        noise = 0;

        if tracked.contains(&value) {
            current = value;
        } else {
            match (i + 1..window.end).find(|&j| tracked.contains(&codes[j])) {
                Some(next) => current = codes[next],
                // No tracked code remains; the closed run stands and the
                // residual is not attributed to anyone.
                None => return runs,
            }
        }
        i += 1;
    }

    record_run(&mut runs, current, length);
    runs
}

fn record_run(runs: &mut BTreeMap<Code, Vec<usize>>, code: Code, length: usize) {
    if let Some(lengths) = runs.get_mut(&code) {
        lengths.push(length);
    }
}

/// Epochs from `from` to the next occurrence of `code`, bounded by `end`.
/// Always at least 1; `end - from` when no occurrence remains.
fn gap_to_next(codes: &[Code], code: Code, from: usize, end: usize) -> usize {
    let mut count = 1;
    while from + count < end && codes[from + count] != code {
        count += 1;
    }
    count
}

/// Bin run lengths into the configured duration buckets.
///
/// Bucket bounds are given in seconds and converted to epoch counts; a run
/// falls into every bucket whose inclusive range contains it. Runs above the
/// top bucket are not counted.
pub fn categorize_runs(
    runs: &BTreeMap<Code, Vec<usize>>,
    config: &BoutConfig,
    epochs_per_minute: usize,
) -> BTreeMap<Code, Vec<usize>> {
    let epochs_per_second = epochs_per_minute as f64 / 60.0;
    runs.iter()
        .map(|(code, lengths)| {
            let counts = config
                .buckets_for(*code)
                .iter()
                .map(|bucket| {
                    let lower = bucket.min_seconds * epochs_per_second;
                    let upper = bucket.max_seconds * epochs_per_second;
                    lengths
                        .iter()
                        .filter(|&&len| (len as f64) >= lower && (len as f64) <= upper)
                        .count()
                })
                .collect();
            (*code, counts)
        })
        .collect()
}

/// Detect and categorize bouts over one window in a single step
pub fn categorize_window(
    codes: &[Code],
    window: Window,
    config: &BoutConfig,
    epochs_per_minute: usize,
) -> BTreeMap<Code, Vec<usize>> {
    let runs = segment_window(codes, window, config, epochs_per_minute);
    categorize_runs(&runs, config, epochs_per_minute)
}

/// Categorize bouts over a non-contiguous window (ordered sub-ranges),
/// summing bucket counts across the ranges.
///
/// Each sub-range is segmented independently: a bout cannot continue across
/// the carved-out burst separating two ranges.
pub fn categorize_ranges(
    codes: &[Code],
    ranges: &[Window],
    config: &BoutConfig,
    epochs_per_minute: usize,
) -> BTreeMap<Code, Vec<usize>> {
    let mut combined: BTreeMap<Code, Vec<usize>> = config
        .tracked_codes
        .iter()
        .map(|c| (*c, vec![0; config.buckets_for(*c).len()]))
        .collect();
    for range in ranges {
        let counts = categorize_window(codes, *range, config, epochs_per_minute);
        add_counts(&mut combined, &counts);
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DurationBucket;
    use pretty_assertions::assert_eq;

    fn config(tracked: &[Code], noise_tolerance: f64, cut_seconds: f64) -> BoutConfig {
        BoutConfig {
            tracked_codes: tracked.to_vec(),
            inactive_codes: vec![],
            noise_tolerance,
            cut_seconds,
            inactive_buckets: vec![],
            active_buckets: vec![
                DurationBucket::new(0.0, 60.0),
                DurationBucket::new(90.0, 300.0),
            ],
        }
    }

    fn window(len: usize) -> Window {
        Window { start: 0, end: len }
    }

    #[test]
    fn test_single_flip_absorbed_into_one_run() {
        let codes = [1, 1, 1, 2, 1, 1, 1, 1, 1];
        let cfg = config(&[1], 0.5, 60.0);
        let runs = segment_window(&codes, window(9), &cfg, 1);
        assert_eq!(runs[&1], vec![9]);
    }

    #[test]
    fn test_no_tracked_epochs_returns_empty_lists() {
        let codes = [7, 7, 7, 7];
        let cfg = config(&[1, 2], 0.5, 60.0);
        let runs = segment_window(&codes, window(4), &cfg, 1);
        assert_eq!(runs[&1], Vec::<usize>::new());
        assert_eq!(runs[&2], Vec::<usize>::new());
    }

    #[test]
    fn test_clean_runs_partition_window() {
        // Two tracked codes, gaps too wide to absorb under a high cut
        let codes = [1, 1, 2, 2, 2, 1, 1];
        let cfg = config(&[1, 2], 0.0, 100_000.0);
        let runs = segment_window(&codes, window(7), &cfg, 1);

        assert_eq!(runs[&1], vec![2, 2]);
        assert_eq!(runs[&2], vec![3]);
        let total: usize = runs.values().flatten().sum();
        assert_eq!(total, 7);
        assert!(runs.values().flatten().all(|&len| len >= 1));
    }

    #[test]
    fn test_untracked_prefix_skipped() {
        let codes = [7, 7, 1, 1, 1];
        let cfg = config(&[1], 0.5, 60.0);
        let runs = segment_window(&codes, window(5), &cfg, 1);
        assert_eq!(runs[&1], vec![3]);
    }

    #[test]
    fn test_run_closes_when_code_never_returns() {
        // The long 3-tail forces closure; no tracked code remains after it
        let codes = [1, 1, 1, 3, 1, 1, 3, 3, 3, 3];
        let cfg = config(&[1], 0.5, 60.0);
        let runs = segment_window(&codes, window(10), &cfg, 1);
        // Flip at index 3 absorbed, run closes at 6 with the residual dropped
        assert_eq!(runs[&1], vec![6]);
    }

    #[test]
    fn test_lookahead_adjustment_on_noisy_close() {
        // Noise budget allows one absorbed epoch, then the run closes on the
        // epoch after it: that epoch was not the run's code, so the recorded
        // length steps back by one and the next run opens at length two.
        let codes = [1, 1, 1, 2, 2, 2, 1, 1];
        let cfg = config(&[1], 0.5, 60.0);
        let runs = segment_window(&codes, window(8), &cfg, 1);
        assert_eq!(runs[&1], vec![3, 1, 4]);
    }

    #[test]
    fn test_noise_tolerance_zero_closes_on_any_flip_past_cut() {
        let codes = [1, 1, 1, 2, 1, 1, 1, 1, 1];
        let cfg = config(&[1], 0.0, 60.0);
        let runs = segment_window(&codes, window(9), &cfg, 1);
        // cut is one epoch here, so the flip is judged by the noise rule and
        // zero tolerance rejects it; the flip epoch opens the next run
        assert_eq!(runs[&1], vec![3, 6]);
    }

    #[test]
    fn test_windowed_segmentation_ignores_outside_epochs() {
        let codes = [1, 1, 1, 1, 2, 2, 1, 1, 1, 1];
        let cfg = config(&[1], 0.0, 100_000.0);
        let runs = segment_window(&codes, Window { start: 4, end: 10 }, &cfg, 1);
        assert_eq!(runs[&1], vec![4]);
    }

    #[test]
    fn test_categorize_runs_inclusive_bounds_finite_top() {
        // 30s epochs: buckets are [0,2] and [3,10] in epoch units
        let mut runs = BTreeMap::new();
        runs.insert(1u8, vec![1, 2, 3, 5, 20]);
        let cfg = config(&[1], 0.5, 60.0);

        let counts = categorize_runs(&runs, &cfg, 2);
        // 20 epochs exceeds the top bucket and is not counted anywhere
        assert_eq!(counts[&1], vec![2, 2]);
    }

    #[test]
    fn test_categorize_ranges_sums_and_splits_at_boundaries() {
        // One long run of 1s, interrupted only by the carved-out gap
        let codes = vec![1u8; 20];
        let cfg = config(&[1], 0.5, 60.0);
        let ranges = [Window { start: 0, end: 8 }, Window { start: 12, end: 20 }];

        let counts = categorize_ranges(&codes, &ranges, &cfg, 2);
        // Two 8-epoch bouts (240s each), both in the second bucket
        assert_eq!(counts[&1], vec![0, 2]);
    }

    #[test]
    fn test_categorize_empty_ranges_yields_zero_counts() {
        let codes = vec![1u8; 4];
        let cfg = config(&[1], 0.5, 60.0);
        let counts = categorize_ranges(&codes, &[], &cfg, 2);
        assert_eq!(counts[&1], vec![0, 0]);
    }
}
