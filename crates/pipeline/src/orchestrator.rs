//! Plate/well orchestration.

use chrono::Utc;

use cardiomotion_analysis_core::extractor::MotionSignalExtractor;
use cardiomotion_analysis_core::flow::single_threaded_backend;
use cardiomotion_common::cancel::CancelToken;
use cardiomotion_common::config::resolve_worker_count;
use cardiomotion_common::error::{CardioError, CardioResult};
use cardiomotion_image_source::discovery::{find_images, ImageCatalog, WellImages};
use cardiomotion_image_source::error::SourceError;
use cardiomotion_image_source::loader::load_well;
use cardiomotion_image_source::metadata::load_metadata;
use cardiomotion_plate_model::series::SignalSeries;
use cardiomotion_plate_model::table::{signal_rows, write_signal_csv};
use cardiomotion_plate_model::well::WellKey;

use crate::config::PipelineConfig;
use crate::layout::OutputLayout;
use crate::outcome::{RunSummary, WellOutcome, WellReport};
use crate::peak_stage::run_peak_stage;

/// Runs both stages over one source directory.
///
/// Owns the worker pool for the whole run; every well's frame loading and
/// optical flow execute on it.
pub struct Pipeline {
    config: PipelineConfig,
    layout: OutputLayout,
    pool: rayon::ThreadPool,
    extractor: MotionSignalExtractor,
    cancel: CancelToken,
}

impl Pipeline {
    /// Validate the configuration and build the worker pool. Fails before any
    /// file is touched if a parameter is invalid.
    pub fn new(mut config: PipelineConfig, cancel: CancelToken) -> CardioResult<Self> {
        config.sanitise_fps();
        config.validate()?;
        if !config.source_dir.is_dir() {
            return Err(CardioError::FileNotFound {
                path: config.source_dir.clone(),
            });
        }

        let extractor = MotionSignalExtractor::new(config.flow)?;
        single_threaded_backend()?;
        let layout = OutputLayout::resolve(&config.source_dir, config.dest_dir.as_deref());
        let workers = resolve_worker_count(config.workers);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("cardiomotion-worker-{i}"))
            .build()
            .map_err(|e| CardioError::config(format!("failed to build worker pool: {e}")))?;
        tracing::debug!(workers, "Worker pool ready");

        Ok(Self {
            config,
            layout,
            pool,
            extractor,
            cancel,
        })
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the signal stage then the peak stage.
    ///
    /// Returns `CardioError::Cancelled` if the cancel token fires; files
    /// already completed stay on disk and are skipped by the next run.
    pub fn run(&self) -> CardioResult<RunSummary> {
        let started_at = Utc::now();
        let source = &self.config.source_dir;

        self.layout.create()?;
        tracing::info!(dir = %self.layout.dest().display(), "Output directory");

        tracing::info!(dir = %source.display(), "Loading directory");
        let metadata = load_metadata(source, self.config.camera_pixel_size_nm);
        let fps = self.config.resolve_fps(&metadata);
        let scale = self.config.resolve_scale(&metadata);
        tracing::info!(fps, scale_nm_per_px = scale, "Acquisition parameters");

        let catalog = find_images(source, fps)?;
        let wells = self.signal_stage(&catalog, scale)?;
        tracing::info!("Finished signal calculation");

        tracing::info!("Finding peaks");
        let params = self.config.peak_params(fps);
        let tables = run_peak_stage(&self.layout, &params, self.config.emit_graph, &self.cancel)?;

        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            source_dir: source.clone(),
            dest_dir: self.layout.dest().to_path_buf(),
            fps,
            scale_nm_per_px: scale,
            wells,
            tables,
        };
        self.write_summary(&summary);
        Ok(summary)
    }

    fn signal_stage(&self, catalog: &ImageCatalog, scale: f64) -> CardioResult<Vec<WellReport>> {
        tracing::info!(plates = catalog.plates.len(), "Number of plates to process");
        let mut reports = Vec::new();
        for plate in &catalog.plates {
            tracing::info!(plate = %plate.plate, wells = plate.wells.len(), "Processing plate");
            for well in &plate.wells {
                self.cancel.check()?;
                let outcome = self.process_well(well, scale)?;
                reports.push(WellReport {
                    plate: plate.plate.clone(),
                    well: well.well.to_string(),
                    outcome,
                });
            }
        }
        Ok(reports)
    }

    /// Produce one well's signal CSV.
    ///
    /// Only cancellation is returned as `Err`; every other failure is logged
    /// and reported as an outcome so sibling wells carry on.
    pub fn process_well(&self, well: &WellImages, scale: f64) -> CardioResult<WellOutcome> {
        let key = WellKey::new(well.plate.clone(), well.well.clone());
        let _span = tracing::info_span!("well", well = %key).entered();

        let path = self.layout.well_csv(&key);
        if path.is_file() {
            tracing::info!(path = %path.display(), "File already exists, skipping");
            return Ok(WellOutcome::AlreadyDone);
        }

        tracing::info!(frames = well.len(), "Processing well");
        match self.pool.install(|| self.compute_well(well, &key, scale)) {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                tracing::error!(error = %e, "Exception while processing well");
                Ok(WellOutcome::Failed(e.to_string()))
            }
        }
    }

    fn compute_well(&self, well: &WellImages, key: &WellKey, scale: f64) -> CardioResult<WellOutcome> {
        let loaded = match load_well(well, &self.cancel) {
            Ok(loaded) => loaded,
            Err(e @ SourceError::NoFrames { .. }) => {
                tracing::warn!(error = %e, "Skipping well");
                return Ok(WellOutcome::Skipped(e.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let signal = self
            .extractor
            .extract_cancellable(&loaded.frames, &self.cancel)?;
        let series = SignalSeries::new(loaded.times.clone(), signal)
            .map_err(|e| CardioError::analysis(e.to_string()))?
            .scaled(scale);

        let path = self.layout.well_csv(key);
        tracing::info!(path = %path.display(), "Finished processing, saving");
        write_signal_csv(&path, &signal_rows(key, &series))
            .map_err(|e| CardioError::table(e.to_string()))?;

        Ok(WellOutcome::Completed {
            frames: loaded.frames.len(),
            dropped: loaded.dropped(),
        })
    }

    fn write_summary(&self, summary: &RunSummary) {
        let path = self.layout.run_summary();
        let result = serde_json::to_string_pretty(summary)
            .map_err(CardioError::from)
            .and_then(|json| std::fs::write(&path, json).map_err(CardioError::from));
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write run summary");
        }
    }
}
