//! CSV persistence for raw signal rows and peak statistics.
//!
//! Column names and order are fixed; downstream spreadsheets and scripts
//! depend on them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::series::SignalSeries;
use crate::stats::{PeakMetrics, WellStatisticsRecord};
use crate::well::WellKey;

/// Header of the raw per-well signal CSV.
pub const SIGNAL_COLUMNS: [&str; 7] = [
    "Plate",
    "Well",
    "Column",
    "Row",
    "Row Number",
    "Time (s)",
    "Contractile_Movement (nm)",
];

/// Header of the per-plate peak statistics CSV.
pub const PEAKSTATS_COLUMNS: [&str; 9] = [
    "Plate",
    "Well",
    "Row",
    "Row Number",
    "Column",
    "Peak Amplitude (nm)",
    "Peak Width (s)",
    "Peak Frequency (bpm)",
    "Peak Spacing (s)",
];

/// One sample of one well's motion signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    #[serde(rename = "Plate")]
    pub plate: String,
    #[serde(rename = "Well")]
    pub well: String,
    #[serde(rename = "Column")]
    pub column: String,
    #[serde(rename = "Row")]
    pub row: String,
    #[serde(rename = "Row Number")]
    pub row_number: u32,
    #[serde(rename = "Time (s)")]
    pub time_secs: f64,
    #[serde(rename = "Contractile_Movement (nm)")]
    pub movement_nm: f64,
}

/// One well's peak statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakStatsRow {
    #[serde(rename = "Plate")]
    pub plate: String,
    #[serde(rename = "Well")]
    pub well: String,
    #[serde(rename = "Row")]
    pub row: String,
    #[serde(rename = "Row Number")]
    pub row_number: u32,
    #[serde(rename = "Column")]
    pub column: String,
    #[serde(rename = "Peak Amplitude (nm)")]
    pub amplitude_nm: f64,
    #[serde(rename = "Peak Width (s)")]
    pub width_secs: f64,
    #[serde(rename = "Peak Frequency (bpm)")]
    pub frequency_bpm: f64,
    #[serde(rename = "Peak Spacing (s)")]
    pub spacing_secs: f64,
}

/// Convert one well's series into raw CSV rows.
pub fn signal_rows(key: &WellKey, series: &SignalSeries) -> Vec<SignalRow> {
    let well = &key.well;
    series
        .iter()
        .map(|(time_secs, movement_nm)| SignalRow {
            plate: key.plate.clone(),
            well: well.to_string(),
            column: well.column().to_string(),
            row: well.row().to_string(),
            row_number: well.row_number(),
            time_secs,
            movement_nm,
        })
        .collect()
}

impl From<&WellStatisticsRecord> for PeakStatsRow {
    fn from(record: &WellStatisticsRecord) -> Self {
        let PeakMetrics {
            amplitude,
            width_secs,
            frequency_bpm,
            spacing_secs,
        } = record.metrics;
        Self {
            plate: record.plate.clone(),
            well: record.well.to_string(),
            row: record.well.row().to_string(),
            row_number: record.well.row_number(),
            column: record.well.column().to_string(),
            amplitude_nm: amplitude,
            width_secs,
            frequency_bpm,
            spacing_secs,
        }
    }
}

/// Write raw signal rows. The file appears only once fully written.
pub fn write_signal_csv(path: &Path, rows: &[SignalRow]) -> Result<(), TableError> {
    write_rows(path, &SIGNAL_COLUMNS, rows)
}

/// Write peak statistics rows. The file appears only once fully written.
pub fn write_peakstats_csv(path: &Path, rows: &[PeakStatsRow]) -> Result<(), TableError> {
    write_rows(path, &PEAKSTATS_COLUMNS, rows)
}

/// Read a raw signal CSV, rejecting files with any other header.
pub fn read_signal_csv(path: &Path) -> Result<Vec<SignalRow>, TableError> {
    read_rows(path, &SIGNAL_COLUMNS)
}

/// Read a peak statistics CSV.
pub fn read_peakstats_csv(path: &Path) -> Result<Vec<PeakStatsRow>, TableError> {
    read_rows(path, &PEAKSTATS_COLUMNS)
}

fn write_rows<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<(), TableError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| TableError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let tmp_path = partial_path(path);
    let csv_err = |source| TableError::Csv {
        path: tmp_path.clone(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&tmp_path)
        .map_err(csv_err)?;
    writer.write_record(header).map_err(csv_err)?;
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer.flush().map_err(|e| TableError::Io {
        path: tmp_path.clone(),
        source: e,
    })?;
    drop(writer);

    std::fs::rename(&tmp_path, path).map_err(|e| TableError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

fn read_rows<T: for<'de> Deserialize<'de>>(
    path: &Path,
    header: &[&str],
) -> Result<Vec<T>, TableError> {
    let csv_err = |source| TableError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    let found: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(str::to_string)
        .collect();
    if found != header {
        return Err(TableError::UnexpectedColumns {
            path: path.to_path_buf(),
            found,
        });
    }

    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(csv_err)
}

/// Sibling path used while a table is being written.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

/// Errors that can occur when reading or writing tables.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("Unexpected column names in {path}: {found:?}")]
    UnexpectedColumns { path: PathBuf, found: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::well::WellId;

    fn sample_key() -> WellKey {
        WellKey::new("Plate7", WellId::parse("B03").unwrap())
    }

    #[test]
    fn test_signal_rows_carry_identifiers() {
        let series = SignalSeries::from_samples([(0.0, 10.0), (0.025, 12.5)]).unwrap();
        let rows = signal_rows(&sample_key(), &series);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].plate, "Plate7");
        assert_eq!(rows[1].well, "B03");
        assert_eq!(rows[1].row, "B");
        assert_eq!(rows[1].row_number, 2);
        assert_eq!(rows[1].column, "03");
        assert_eq!(rows[1].movement_nm, 12.5);
    }

    #[test]
    fn test_signal_csv_header_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw").join("Plate7_B03.csv");
        let series = SignalSeries::from_samples([(0.0, 1.5), (0.025, 2.5)]).unwrap();
        let rows = signal_rows(&sample_key(), &series);

        write_signal_csv(&path, &rows).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content.lines().next().unwrap(),
            "Plate,Well,Column,Row,Row Number,Time (s),Contractile_Movement (nm)"
        );
        assert!(!partial_path(&path).exists());

        let reloaded = read_signal_csv(&path).unwrap();
        assert_eq!(reloaded, rows);
    }

    #[test]
    fn test_rogue_csv_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();
        assert!(matches!(
            read_signal_csv(&path),
            Err(TableError::UnexpectedColumns { .. })
        ));
    }

    #[test]
    fn test_peakstats_row_layout() {
        let record = WellStatisticsRecord::new(
            "Plate7",
            WellId::parse("C11").unwrap(),
            PeakMetrics {
                amplitude: 250.0,
                width_secs: 0.4,
                frequency_bpm: 60.0,
                spacing_secs: 0.6,
            },
        );
        let row = PeakStatsRow::from(&record);
        assert_eq!(row.row, "C");
        assert_eq!(row.row_number, 3);
        assert_eq!(row.column, "11");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Plate7_Cardio-Motion_peakstats.csv");
        write_peakstats_csv(&path, &[row.clone()]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content.lines().next().unwrap(),
            PEAKSTATS_COLUMNS.join(",")
        );
        assert_eq!(read_peakstats_csv(&path).unwrap(), vec![row]);
    }

    #[test]
    fn test_empty_table_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_peakstats_csv(&path, &[]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim_end(), PEAKSTATS_COLUMNS.join(","));
    }
}
