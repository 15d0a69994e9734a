//! Second stage: peak statistics from the per-well signal CSVs.
//!
//! Reads every `*.csv` in the raw directory, groups rows by plate and well
//! (first-seen order), and writes per plate:
//! - `<plate>_Cardio-Motion_raw.csv`: all raw rows of the plate
//! - `<plate>_Cardio-Motion_peakstats.csv`: one row per well

use std::path::{Path, PathBuf};

use cardiomotion_analysis_core::stats::{calc_peakstats, PeakStatsParams};
use cardiomotion_common::cancel::CancelToken;
use cardiomotion_common::error::{CardioError, CardioResult};
use cardiomotion_plate_model::series::SignalSeries;
use cardiomotion_plate_model::stats::PlateTable;
use cardiomotion_plate_model::table::{
    read_signal_csv, write_peakstats_csv, write_signal_csv, PeakStatsRow, SignalRow,
};
use cardiomotion_plate_model::well::{WellId, WellKey};

use crate::diagnostics::write_well_plot;
use crate::layout::OutputLayout;

/// Raw rows of one plate, grouped by well.
#[derive(Debug, Default)]
struct PlateRows {
    plate: String,
    rows: Vec<SignalRow>,
    wells: Vec<String>,
}

/// Compute and write peak statistics for every plate found in the raw
/// directory.
pub fn run_peak_stage(
    layout: &OutputLayout,
    params: &PeakStatsParams,
    emit_graph: bool,
    cancel: &CancelToken,
) -> CardioResult<Vec<PlateTable>> {
    params.validate()?;
    let plates = group_by_plate(read_raw_rows(&layout.raw_dir())?);
    tracing::info!(plates = plates.len(), "Plates found");

    let mut tables = Vec::with_capacity(plates.len());
    for plate in plates {
        cancel.check()?;
        tables.push(process_plate(layout, &plate, params, emit_graph, cancel)?);
    }
    Ok(tables)
}

fn process_plate(
    layout: &OutputLayout,
    plate: &PlateRows,
    params: &PeakStatsParams,
    emit_graph: bool,
    cancel: &CancelToken,
) -> CardioResult<PlateTable> {
    let _span = tracing::info_span!("plate", plate = %plate.plate).entered();

    let raw_path = layout.plate_raw_csv(&plate.plate);
    tracing::info!(path = %raw_path.display(), "Saving raw data");
    write_signal_csv(&raw_path, &plate.rows).map_err(|e| CardioError::table(e.to_string()))?;

    tracing::info!(wells = plate.wells.len(), "Processing wells");
    let mut table = PlateTable::with_capacity(plate.plate.clone(), plate.wells.len());
    for well in &plate.wells {
        cancel.check()?;
        let well_id = match WellId::parse(well) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(well = %well, error = %e, "Skipping well with malformed label");
                continue;
            }
        };
        let samples = plate
            .rows
            .iter()
            .filter(|r| &r.well == well)
            .map(|r| (r.time_secs, r.movement_nm));
        let series = match SignalSeries::from_unsorted(samples) {
            Ok(series) => series,
            Err(e) => {
                tracing::warn!(well = %well, error = %e, "Skipping well with malformed signal");
                continue;
            }
        };

        let analysis = calc_peakstats(&series, params)?;
        tracing::info!(well = %well, peaks = analysis.peaks.len(), "Peaks found");

        let key = WellKey::new(plate.plate.clone(), well_id.clone());
        if emit_graph {
            let path = layout.graph(&key);
            if let Err(e) = write_well_plot(&path, &series, &analysis.peaks) {
                tracing::warn!(well = %key, error = %e, "Failed to write diagnostic plot");
            }
        }
        table.push(well_id, analysis.metrics);
    }

    let rows: Vec<PeakStatsRow> = table.records.iter().map(PeakStatsRow::from).collect();
    let stats_path = layout.plate_peakstats_csv(&plate.plate);
    tracing::info!(path = %stats_path.display(), "Saving peak statistics");
    write_peakstats_csv(&stats_path, &rows).map_err(|e| CardioError::table(e.to_string()))?;

    Ok(table)
}

/// Every readable signal CSV in `raw_dir`, files in name order.
fn read_raw_rows(raw_dir: &Path) -> CardioResult<Vec<SignalRow>> {
    tracing::info!(dir = %raw_dir.display(), "Loading directory");
    let mut files: Vec<PathBuf> = std::fs::read_dir(raw_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "csv"))
        .collect();
    files.sort();

    let mut rows = Vec::new();
    for path in files {
        match read_signal_csv(&path) {
            Ok(file_rows) => {
                tracing::info!(path = %path.display(), "Loaded");
                rows.extend(file_rows);
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring unreadable signal file"),
        }
    }
    Ok(rows)
}

fn group_by_plate(rows: Vec<SignalRow>) -> Vec<PlateRows> {
    let mut plates: Vec<PlateRows> = Vec::new();
    for row in rows {
        let index = match plates.iter().position(|p| p.plate == row.plate) {
            Some(index) => index,
            None => {
                plates.push(PlateRows {
                    plate: row.plate.clone(),
                    ..PlateRows::default()
                });
                plates.len() - 1
            }
        };
        let plate = &mut plates[index];
        if !plate.wells.contains(&row.well) {
            plate.wells.push(row.well.clone());
        }
        plate.rows.push(row);
    }
    plates
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardiomotion_plate_model::table::{read_peakstats_csv, signal_rows};

    fn write_well(layout: &OutputLayout, plate: &str, well: &str, samples: &[(f64, f64)]) {
        let key = WellKey::new(plate, WellId::parse(well).unwrap());
        let series = SignalSeries::from_samples(samples.iter().copied()).unwrap();
        write_signal_csv(&layout.well_csv(&key), &signal_rows(&key, &series)).unwrap();
    }

    fn triangle_wave(n: usize) -> Vec<(f64, f64)> {
        (0..n)
            .map(|i| {
                let phase = (i % 10) as f64;
                (i as f64 * 0.1, 100.0 * (1.0 - (phase - 5.0).abs() / 5.0))
            })
            .collect()
    }

    fn params() -> PeakStatsParams {
        PeakStatsParams {
            min_prominence: 10.0,
            min_width_frames: 1.0,
            cutoff: 0.5,
        }
    }

    #[test]
    fn test_plates_and_wells_written() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        layout.create().unwrap();
        write_well(&layout, "P1", "A01", &triangle_wave(40));
        write_well(&layout, "P1", "A02", &[(0.0, 1.0), (0.1, 1.0), (0.2, 1.0)]);
        write_well(&layout, "P2", "B01", &triangle_wave(30));
        std::fs::write(layout.raw_dir().join("notes.csv"), "x,y\n1,2\n").unwrap();

        let tables = run_peak_stage(&layout, &params(), false, &CancelToken::new()).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].plate, "P1");
        assert_eq!(tables[0].len(), 2);

        let a01 = tables[0].get(&WellId::parse("A01").unwrap()).unwrap();
        // Peaks every 10 samples at 0.1 s.
        assert!((a01.metrics.frequency_bpm - 60.0).abs() < 1e-9);
        assert!((a01.metrics.amplitude - 100.0).abs() < 1e-9);
        let a02 = tables[0].get(&WellId::parse("A02").unwrap()).unwrap();
        assert_eq!(a02.metrics.frequency_bpm, 0.0);

        let stats = read_peakstats_csv(&layout.plate_peakstats_csv("P1")).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].well, "A01");
        let raw = read_signal_csv(&layout.plate_raw_csv("P1")).unwrap();
        assert_eq!(raw.len(), 43);
    }

    #[test]
    fn test_rows_out_of_order_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        layout.create().unwrap();
        let mut samples = triangle_wave(40);
        samples.reverse();
        let key = WellKey::new("P1", WellId::parse("C03").unwrap());
        let rows: Vec<SignalRow> = samples
            .iter()
            .map(|&(t, v)| SignalRow {
                plate: "P1".into(),
                well: "C03".into(),
                column: "03".into(),
                row: "C".into(),
                row_number: 3,
                time_secs: t,
                movement_nm: v,
            })
            .collect();
        write_signal_csv(&layout.well_csv(&key), &rows).unwrap();

        let tables = run_peak_stage(&layout, &params(), false, &CancelToken::new()).unwrap();
        let record = &tables[0].records[0];
        assert!((record.metrics.frequency_bpm - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_graphs_written_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        layout.create().unwrap();
        write_well(&layout, "P1", "A01", &triangle_wave(30));
        run_peak_stage(&layout, &params(), true, &CancelToken::new()).unwrap();
        let key = WellKey::new("P1", WellId::parse("A01").unwrap());
        assert!(layout.graph(&key).exists());
    }
}
