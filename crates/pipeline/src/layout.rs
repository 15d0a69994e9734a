//! Where a run reads and writes its files.

use std::path::{Path, PathBuf};

use cardiomotion_plate_model::well::WellKey;

/// Destination directory created inside the source when none is given.
pub const DEFAULT_DEST_NAME: &str = "Cardio-Motion_Data";
/// Per-well signal CSVs, one file per well.
pub const RAW_DIR_NAME: &str = "Raw Well level data";
pub const GRAPHS_DIR_NAME: &str = "graphs";
pub const RUN_SUMMARY_NAME: &str = "Cardio-Motion_run.json";

/// Output paths for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    dest: PathBuf,
}

impl OutputLayout {
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self { dest: dest.into() }
    }

    /// `dest`, or `<source>/Cardio-Motion_Data` when not given.
    pub fn resolve(source: &Path, dest: Option<&Path>) -> Self {
        match dest {
            Some(dest) => Self::new(dest),
            None => Self::new(source.join(DEFAULT_DEST_NAME)),
        }
    }

    /// Create the destination and raw-data directories.
    pub fn create(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.raw_dir())
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.dest.join(RAW_DIR_NAME)
    }

    pub fn well_csv(&self, key: &WellKey) -> PathBuf {
        self.raw_dir().join(format!("{}.csv", key.file_stem()))
    }

    pub fn plate_raw_csv(&self, plate: &str) -> PathBuf {
        self.dest.join(format!("{plate}_Cardio-Motion_raw.csv"))
    }

    pub fn plate_peakstats_csv(&self, plate: &str) -> PathBuf {
        self.dest.join(format!("{plate}_Cardio-Motion_peakstats.csv"))
    }

    pub fn graph(&self, key: &WellKey) -> PathBuf {
        self.dest
            .join(GRAPHS_DIR_NAME)
            .join(format!("{}.png", key.file_stem()))
    }

    pub fn run_summary(&self) -> PathBuf {
        self.dest.join(RUN_SUMMARY_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardiomotion_plate_model::well::WellId;

    #[test]
    fn test_paths() {
        let layout = OutputLayout::resolve(Path::new("/scans/run1"), None);
        assert_eq!(layout.dest(), Path::new("/scans/run1/Cardio-Motion_Data"));
        let key = WellKey::new("P1", WellId::parse("B07").unwrap());
        assert_eq!(
            layout.well_csv(&key),
            Path::new("/scans/run1/Cardio-Motion_Data/Raw Well level data/P1_B07.csv")
        );
        assert_eq!(
            layout.plate_peakstats_csv("P1"),
            Path::new("/scans/run1/Cardio-Motion_Data/P1_Cardio-Motion_peakstats.csv")
        );
        assert_eq!(
            layout.graph(&key),
            Path::new("/scans/run1/Cardio-Motion_Data/graphs/P1_B07.png")
        );

        let explicit = OutputLayout::resolve(Path::new("/scans/run1"), Some(Path::new("/out")));
        assert_eq!(explicit.plate_raw_csv("P1"), Path::new("/out/P1_Cardio-Motion_raw.csv"));
    }
}
