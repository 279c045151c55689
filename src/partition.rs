//! Shift partitioning
//!
//! Separates genuine work shifts from incidental short bursts and carves the
//! off-shift span following each real shift. Short bursts never interrupt a
//! between-shift section on their own; they are cut out of it, leaving an
//! ordered list of sub-ranges.

use std::collections::BTreeMap;

use crate::types::Window;

/// Result of partitioning mapped shift windows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftPartition {
    /// Real shifts, merged where adjacent, renumbered `1..N` by start
    pub shifts: BTreeMap<u32, Window>,
    /// Between-shift sub-ranges following each real shift; empty when the
    /// shift has no gap after it
    pub between: BTreeMap<u32, Vec<Window>>,
}

/// Partition mapped shift windows into real shifts and between-shift spans.
///
/// Windows longer than `min_shift_epochs` are real; the rest are short
/// bursts. The between span after real shift `i` runs to the next real
/// shift's start, capped at one day past the shift's end and at the recording
/// length; short bursts overlapping the span are carved out.
pub fn partition_shifts(
    windows: &BTreeMap<u32, Window>,
    min_shift_epochs: usize,
    epochs_per_day: usize,
    total_len: usize,
) -> ShiftPartition {
    let mut real: Vec<Window> = windows
        .values()
        .filter(|w| w.len() > min_shift_epochs)
        .copied()
        .collect();
    real.sort_by_key(|w| w.start);

    let mut short: Vec<Window> = windows
        .values()
        .filter(|w| w.len() <= min_shift_epochs)
        .copied()
        .collect();
    short.sort_by_key(|w| w.start);

    let merged = merge_adjacent(&real);

    let mut between = BTreeMap::new();
    for (i, shift) in merged.iter().enumerate() {
        let cap = (shift.end + epochs_per_day).min(total_len);
        let section_end = match merged.get(i + 1) {
            Some(next) => next.start.min(cap),
            None => cap,
        };
        between.insert(i as u32 + 1, carve_span(shift.end, section_end, &short));
    }

    let shifts = merged
        .into_iter()
        .enumerate()
        .map(|(i, w)| (i as u32 + 1, w))
        .collect();
    ShiftPartition { shifts, between }
}

/// Merge real shifts whose start touches or overlaps the previous shift's
/// end. Idempotent: merging an already-merged list changes nothing.
pub fn merge_adjacent(shifts: &[Window]) -> Vec<Window> {
    let mut merged: Vec<Window> = Vec::with_capacity(shifts.len());
    for shift in shifts {
        match merged.last_mut() {
            Some(last) if shift.start <= last.end => {
                last.end = last.end.max(shift.end);
            }
            _ => merged.push(*shift),
        }
    }
    merged
}

/// Split `[span_start, span_end)` into sub-ranges around the short bursts
/// overlapping it. Bursts must be sorted by start; a burst straddling the
/// span end clips the span rather than being ignored.
fn carve_span(span_start: usize, span_end: usize, short: &[Window]) -> Vec<Window> {
    let mut ranges = Vec::new();
    let mut pos = span_start;
    for burst in short {
        if burst.start >= span_end {
            break;
        }
        if burst.end <= pos {
            continue;
        }
        if burst.start > pos {
            ranges.push(Window {
                start: pos,
                end: burst.start,
            });
        }
        pos = burst.end;
    }
    if pos < span_end {
        ranges.push(Window {
            start: pos,
            end: span_end,
        });
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn windows(pairs: &[(usize, usize)]) -> BTreeMap<u32, Window> {
        pairs
            .iter()
            .enumerate()
            .map(|(i, &(start, end))| (i as u32 + 1, Window { start, end }))
            .collect()
    }

    const EPD: usize = 1440;

    #[test]
    fn test_adjacent_real_shifts_merge_with_empty_between() {
        let input = windows(&[(100, 500), (500, 900)]);
        let partition = partition_shifts(&input, 60, EPD, 900);

        assert_eq!(partition.shifts.len(), 1);
        assert_eq!(partition.shifts[&1], Window { start: 100, end: 900 });
        assert_eq!(partition.between[&1], Vec::<Window>::new());
    }

    #[test]
    fn test_no_real_shifts_is_noop() {
        let input = windows(&[(100, 130), (300, 320)]);
        let partition = partition_shifts(&input, 60, EPD, 5000);

        assert!(partition.shifts.is_empty());
        assert!(partition.between.is_empty());
    }

    #[test]
    fn test_last_shift_span_is_one_day_capped_at_recording() {
        let input = windows(&[(0, 480)]);

        let partition = partition_shifts(&input, 60, EPD, 10_000);
        assert_eq!(partition.between[&1], vec![Window { start: 480, end: 480 + EPD }]);

        let partition = partition_shifts(&input, 60, EPD, 1000);
        assert_eq!(partition.between[&1], vec![Window { start: 480, end: 1000 }]);
    }

    #[test]
    fn test_short_bursts_carved_into_sub_ranges() {
        // One real shift, two short bursts inside its between span
        let input = windows(&[(0, 480), (600, 630), (800, 850)]);
        let partition = partition_shifts(&input, 60, EPD, 1920);

        assert_eq!(
            partition.between[&1],
            vec![
                Window { start: 480, end: 600 },
                Window { start: 630, end: 800 },
                Window { start: 850, end: 1920 },
            ]
        );
    }

    #[test]
    fn test_burst_straddling_span_cap_is_clipped() {
        // Span capped at the recording length (1000); burst crosses the cap
        let input = windows(&[(0, 480), (950, 1010)]);
        let partition = partition_shifts(&input, 60, EPD, 1000);

        assert_eq!(partition.between[&1], vec![Window { start: 480, end: 950 }]);
    }

    #[test]
    fn test_burst_at_span_start_consumed_without_empty_range() {
        let input = windows(&[(0, 480), (480, 500)]);
        let partition = partition_shifts(&input, 60, EPD, 1920);

        assert_eq!(partition.between[&1], vec![Window { start: 500, end: 480 + EPD }]);
    }

    #[test]
    fn test_gap_longer_than_a_day_caps_before_next_shift() {
        let input = windows(&[(0, 480), (4000, 4500)]);
        let partition = partition_shifts(&input, 60, EPD, 10_000);

        assert_eq!(partition.shifts.len(), 2);
        assert_eq!(partition.between[&1], vec![Window { start: 480, end: 480 + EPD }]);
    }

    #[test]
    fn test_merge_adjacent_is_idempotent() {
        let real = vec![
            Window { start: 0, end: 100 },
            Window { start: 90, end: 250 },
            Window { start: 250, end: 300 },
            Window { start: 400, end: 500 },
        ];
        let once = merge_adjacent(&real);
        assert_eq!(
            once,
            vec![Window { start: 0, end: 300 }, Window { start: 400, end: 500 }]
        );
        assert_eq!(merge_adjacent(&once), once);
    }

    #[test]
    fn test_between_ranges_union_covers_candidate_span() {
        let input = windows(&[(0, 480), (600, 630), (900, 950), (2000, 2600)]);
        let partition = partition_shifts(&input, 60, EPD, 3000);

        let ranges = &partition.between[&1];
        // Ordered, non-overlapping
        for pair in ranges.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
        // Union of sub-ranges plus carved bursts covers [480, 1920) up to the
        // next shift's start, here capped by the day bound
        let covered: usize = ranges.iter().map(Window::len).sum();
        let bursts: usize = [(600, 630), (900, 950)]
            .iter()
            .map(|(s, e)| e - s)
            .sum::<usize>();
        assert_eq!(covered + bursts, 1920 - 480);
    }
}
