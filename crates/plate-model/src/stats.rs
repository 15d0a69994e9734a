//! Per-well peak statistics and per-plate tables.

use serde::{Deserialize, Serialize};

use crate::well::WellId;

/// Summary of the contraction peaks found in one well's signal.
///
/// All fields are `0.0` when too few peaks were found to compute them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PeakMetrics {
    /// Median peak prominence, in signal units (nm).
    pub amplitude: f64,
    /// Median peak width, in seconds.
    pub width_secs: f64,
    /// Beat frequency, in beats per minute.
    pub frequency_bpm: f64,
    /// Median gap between the trailing edge of one peak and the leading edge
    /// of the next, in seconds.
    pub spacing_secs: f64,
}

impl PeakMetrics {
    pub const ZERO: Self = Self {
        amplitude: 0.0,
        width_secs: 0.0,
        frequency_bpm: 0.0,
        spacing_secs: 0.0,
    };
}

/// One row of a plate's statistics table.
#[derive(Debug, Clone, PartialEq)]
pub struct WellStatisticsRecord {
    pub plate: String,
    pub well: WellId,
    pub metrics: PeakMetrics,
}

impl WellStatisticsRecord {
    pub fn new(plate: impl Into<String>, well: WellId, metrics: PeakMetrics) -> Self {
        Self {
            plate: plate.into(),
            well,
            metrics,
        }
    }
}

/// Statistics for every well of one plate, in processing order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateTable {
    pub plate: String,
    pub records: Vec<WellStatisticsRecord>,
}

impl PlateTable {
    pub fn new(plate: impl Into<String>) -> Self {
        Self {
            plate: plate.into(),
            records: Vec::new(),
        }
    }

    pub fn with_capacity(plate: impl Into<String>, wells: usize) -> Self {
        Self {
            plate: plate.into(),
            records: Vec::with_capacity(wells),
        }
    }

    pub fn push(&mut self, well: WellId, metrics: PeakMetrics) {
        self.records
            .push(WellStatisticsRecord::new(self.plate.clone(), well, metrics));
    }

    pub fn get(&self, well: &WellId) -> Option<&WellStatisticsRecord> {
        self.records.iter().find(|r| &r.well == well)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_metrics_are_default() {
        assert_eq!(PeakMetrics::default(), PeakMetrics::ZERO);
    }

    #[test]
    fn test_plate_table_records_carry_plate() {
        let mut table = PlateTable::with_capacity("P1", 2);
        let a1 = WellId::parse("A01").unwrap();
        table.push(a1.clone(), PeakMetrics::ZERO);
        table.push(
            WellId::parse("A02").unwrap(),
            PeakMetrics {
                amplitude: 120.0,
                ..PeakMetrics::ZERO
            },
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&a1).unwrap().plate, "P1");
        assert_eq!(
            table
                .get(&WellId::parse("A02").unwrap())
                .unwrap()
                .metrics
                .amplitude,
            120.0
        );
    }
}
