//! Shift table parsing and validation
//!
//! The work-shift table arrives as one row per subject: a handful of prefix
//! columns followed by repeating fixed-width field blocks, in one of two
//! layouts that must be auto-detected. Parsing is deliberately forgiving —
//! a malformed block costs one shift and one QC warning, never the subject —
//! while the validator applies the drop/keep rules against the recording's
//! timespan.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::error::SegmentError;
use crate::types::{fmt_dt, ShiftRecord};

/// Recognized shift table layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftTableFormat {
    /// Repeating 5-column blocks: start date, start time, end date, end time,
    /// comment. Dates as `dd.mm.yyyy`, times as `HH:MM`.
    DateTime,
    /// Repeating 12-column blocks: shift number, start day/month/year, end
    /// day/month/year, start hour/minute, end hour/minute, comment. Years are
    /// 2-digit.
    Numeric,
}

impl ShiftTableFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftTableFormat::DateTime => "date_time",
            ShiftTableFormat::Numeric => "numeric",
        }
    }
}

/// In-memory shift-time table: header plus string cells.
///
/// Reading the table from file stays with the caller; empty cells normalize
/// to `None` at construction.
#[derive(Debug, Clone)]
pub struct ShiftTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl ShiftTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| cell.filter(|c| !c.trim().is_empty()))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }

    /// Locate the single row for `subject_id`.
    ///
    /// The id column is named `ID`, tolerating a leading byte-order marker;
    /// matching is exact string equality. Zero or multiple matches fail.
    pub fn find_subject(&self, subject_id: &str) -> Result<usize, SegmentError> {
        let id_col = self
            .columns
            .iter()
            .position(|c| c.trim_start_matches('\u{feff}') == "ID")
            .ok_or(SegmentError::MissingIdColumn)?;

        let matches: Vec<usize> = (0..self.rows.len())
            .filter(|&row| self.cell(row, id_col) == Some(subject_id))
            .collect();

        match matches.as_slice() {
            [row] => Ok(*row),
            _ => Err(SegmentError::SubjectLookup {
                id: subject_id.to_string(),
                count: matches.len(),
            }),
        }
    }
}

/// Auto-detect the table layout from column headers, falling back to data
/// inspection on the first few rows.
pub fn detect_format(table: &ShiftTable) -> Result<ShiftTableFormat, SegmentError> {
    let cols_lower: Vec<String> = table.columns.iter().map(|c| c.to_lowercase()).collect();

    let date_time_markers = ["start dato", "slutt dato", "dato start", "dato slutt", "start kl", "slutt kl"];
    let has_date_time_cols = cols_lower
        .iter()
        .any(|c| date_time_markers.iter().any(|m| c.contains(m)));
    let has_numeric_cols = cols_lower
        .iter()
        .any(|c| c.contains("dag_") || c.contains("måned") || c.contains("time_start"));

    if has_date_time_cols && !cols_lower.iter().any(|c| c.contains("dag_")) {
        return Ok(ShiftTableFormat::DateTime);
    }
    if has_numeric_cols {
        return Ok(ShiftTableFormat::Numeric);
    }

    // Headers were inconclusive; look at the first data block of up to five
    // rows. Field 4 is a start date in one layout and a weekday in the other.
    for row in 0..table.row_count().min(5) {
        let Some(value) = table.cell(row, 3) else {
            continue;
        };
        if NaiveDate::parse_from_str(value.trim(), "%d.%m.%Y").is_ok() {
            return Ok(ShiftTableFormat::DateTime);
        }
        if let Some(weekday) = parse_int_cell(value) {
            if (1..=7).contains(&weekday) {
                if let Some(day) = table.cell(row, 5).and_then(parse_int_cell) {
                    if (1..=31).contains(&day) {
                        return Ok(ShiftTableFormat::Numeric);
                    }
                }
            }
        }
    }

    Err(SegmentError::FormatUndetected)
}

/// Parse all shift blocks from one subject's row.
///
/// Scanning stops at the first block with no data at all; a block with some
/// but not all fields present is recorded as an incomplete-data warning and
/// produces no record.
pub fn parse_subject_shifts(
    table: &ShiftTable,
    row: usize,
    format: ShiftTableFormat,
    warnings: &mut Vec<String>,
) -> Vec<ShiftRecord> {
    let (prefix, block_width) = match format {
        ShiftTableFormat::DateTime => (3, 5),
        ShiftTableFormat::Numeric => (4, 12),
    };
    let row_len = table.rows.get(row).map_or(0, Vec::len);

    let mut shifts = Vec::new();
    let mut shift_nr = 0u32;
    let mut col = prefix;
    while col + block_width <= row_len {
        // The trailing comment column and, in the numeric layout, the leading
        // shift-number column are not data.
        let data_range = match format {
            ShiftTableFormat::DateTime => col..col + 4,
            ShiftTableFormat::Numeric => col + 1..col + 11,
        };
        let cells: Vec<Option<&str>> = data_range.clone().map(|c| table.cell(row, c)).collect();

        if cells.iter().all(Option::is_none) {
            break;
        }
        shift_nr += 1;

        if cells.iter().any(Option::is_none) {
            let missing: Vec<&str> = data_range
                .zip(&cells)
                .filter(|(_, cell)| cell.is_none())
                .map(|(c, _)| table.columns.get(c).map_or("?", String::as_str))
                .collect();
            warnings.push(format!(
                "Shift {shift_nr}: incomplete data, missing fields: [{}]",
                missing.join(", ")
            ));
            col += block_width;
            continue;
        }

        let fields: Vec<&str> = cells.into_iter().flatten().collect();
        match parse_block(&fields, format, shift_nr, warnings) {
            Ok((start, end)) => shifts.push(ShiftRecord::new(shift_nr, start, end)),
            Err(detail) => warnings.push(format!("Shift {shift_nr}: invalid date/time ({detail})")),
        }
        col += block_width;
    }

    debug!(shift_count = shifts.len(), "parsed shift blocks");
    shifts
}

fn parse_block(
    fields: &[&str],
    format: ShiftTableFormat,
    shift_nr: u32,
    warnings: &mut Vec<String>,
) -> Result<(NaiveDateTime, NaiveDateTime), String> {
    match format {
        ShiftTableFormat::DateTime => {
            let start = parse_date_time(fields[0], fields[1])?;
            let end = parse_date_time(fields[2], fields[3])?;
            Ok((start, end))
        }
        ShiftTableFormat::Numeric => {
            let values = fields
                .iter()
                .map(|f| parse_int_cell(f).ok_or_else(|| format!("not a number: '{f}'")))
                .collect::<Result<Vec<i64>, String>>()?;
            let [s_day, s_month, s_year, e_day, e_month, e_year, s_hour, s_min, e_hour, e_min] =
                values[..]
            else {
                return Err(format!("expected 10 fields, got {}", values.len()));
            };
            if s_year > 99 || e_year > 99 {
                warnings.push(format!(
                    "Shift {shift_nr}: year values ({s_year}, {e_year}) look like full years, expected 2-digit"
                ));
            }
            let start = build_date_time(s_year, s_month, s_day, s_hour, s_min)?;
            let end = build_date_time(e_year, e_month, e_day, e_hour, e_min)?;
            Ok((start, end))
        }
    }
}

fn parse_date_time(date: &str, time: &str) -> Result<NaiveDateTime, String> {
    let joined = format!("{} {}", date.trim(), time.trim());
    NaiveDateTime::parse_from_str(&joined, "%d.%m.%Y %H:%M")
        .map_err(|e| format!("'{joined}': {e}"))
}

fn build_date_time(year: i64, month: i64, day: i64, hour: i64, min: i64) -> Result<NaiveDateTime, String> {
    NaiveDate::from_ymd_opt((2000 + year) as i32, month as u32, day as u32)
        .and_then(|d| d.and_hms_opt(hour as u32, min as u32, 0))
        .ok_or_else(|| format!("no such date/time: {day}.{month}.{year} {hour}:{min}"))
}

/// Numeric cells may carry float formatting (`"4.0"`)
fn parse_int_cell(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(v);
    }
    let f = trimmed.parse::<f64>().ok()?;
    (f.fract() == 0.0).then_some(f as i64)
}

/// Apply the validation rules to parsed records, in order: non-positive
/// duration drops, over-24h warns, entirely-outside drops, partially-outside
/// warns and annotates for clamping, and overlapping survivors warn.
///
/// Returns the surviving records sorted by start time.
pub fn validate_shifts(
    records: Vec<ShiftRecord>,
    data_start: NaiveDateTime,
    data_end: NaiveDateTime,
    warnings: &mut Vec<String>,
) -> Vec<ShiftRecord> {
    let mut kept = Vec::new();

    for mut record in records {
        let nr = record.nr;
        if record.end <= record.start {
            warnings.push(format!(
                "Shift {nr}: non-positive duration ({} to {}), removed",
                fmt_dt(&record.start),
                fmt_dt(&record.end)
            ));
            continue;
        }
        if (record.end - record.start).num_seconds() > 86_400 {
            warnings.push(format!(
                "Shift {nr}: duration exceeds 24h ({} to {})",
                fmt_dt(&record.start),
                fmt_dt(&record.end)
            ));
        }
        if record.end <= data_start || record.start >= data_end {
            warnings.push(format!(
                "Shift {nr}: entirely outside data range ({} to {}), removed",
                fmt_dt(&record.start),
                fmt_dt(&record.end)
            ));
            continue;
        }
        if record.start < data_start {
            warnings.push(format!(
                "Shift {nr}: starts before data ({}), will be clamped",
                fmt_dt(&record.start)
            ));
            record.starts_before_data = true;
        }
        if record.end > data_end {
            warnings.push(format!(
                "Shift {nr}: ends after data ({}), will be clamped",
                fmt_dt(&record.end)
            ));
            record.ends_after_data = true;
        }
        kept.push(record);
    }

    kept.sort_by_key(|r| r.start);
    for pair in kept.windows(2) {
        if pair[0].end > pair[1].start {
            warnings.push(format!(
                "Shift {} and {}: overlapping time periods",
                pair[0].nr, pair[1].nr
            ));
        }
    }

    kept
}
