//! Shift mapping
//!
//! Maps validated shift datetimes onto epoch indices. Start times resolve to
//! the first epoch at or after them (a start past the recording drops the
//! shift); end times clamp to one past the last epoch. Mapped windows are
//! renumbered to contiguous `1..N` in chronological start order.

use std::collections::BTreeMap;

use tracing::warn;

use crate::epochs::EpochSeries;
use crate::types::{QcRecord, ShiftRecord, Window};

/// Map validated shift records to epoch-index windows.
///
/// Per-shift epoch counts land in the QC record keyed by the original shift
/// number; the returned mapping is renumbered chronologically.
pub fn map_shifts(
    records: &[ShiftRecord],
    series: &EpochSeries,
    qc: &mut QcRecord,
) -> BTreeMap<u32, Window> {
    let mut mapped: Vec<(u32, Window)> = Vec::new();

    for record in records {
        let Some(start_idx) = series.first_at_or_after(record.start) else {
            warn!(shift = record.nr, "shift start past the recording, dropped");
            qc.warnings
                .push(format!("Shift {}: start time not found in data, skipped", record.nr));
            continue;
        };
        let end_idx = series.first_at_or_after(record.end).unwrap_or(series.len());

        if end_idx <= start_idx {
            qc.warnings.push(format!(
                "Shift {}: zero length after mapping to data, skipped",
                record.nr
            ));
            continue;
        }

        qc.shift_epochs.insert(record.nr, end_idx - start_idx);
        mapped.push((
            record.nr,
            Window {
                start: start_idx,
                end: end_idx,
            },
        ));
    }

    mapped.sort_by_key(|(_, w)| w.start);
    qc.nr_shifts = Some(mapped.len());

    mapped
        .into_iter()
        .enumerate()
        .map(|(i, (_, window))| (i as u32 + 1, window))
        .collect()
}
