//! Batch georeferencing of a whole flight list.
//!
//! # Pipeline
//!
//! 1. **Sequential stage**: valid records are threaded through a
//!    [`FlightLine`](crate::flight::FlightLine) so each photo gets its
//!    rotation from the previous center. Rejected input rows keep their slot.
//! 2. **Parallel stage**: each photo is loaded, cropped, rotated, written and
//!    georeferenced independently on the rayon pool.
//!
//! A failing photo never stops the batch. Every failure is logged and ends up
//! in the [`BatchReport`] at the position of its input row.

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use thiserror::Error;

use crate::config::{ConfigError, GeorefConfig};
use crate::flight::flight_line;
use crate::geometry::{compute_anchor, AffineTransform, CropGeometry, CropWindow, GroundShift};
use crate::heading::{GeometryError, RotationAngle};
use crate::raster::{self, GeoTiffDataset, ResourceError};
use crate::record::{read_records, PhotoRecord, RejectedRow};
use crate::srs::{SpatialReference, SpatialReferenceError};
use crate::transform::{crop_centered, rotate_clockwise};
use crate::GroundPoint;

/// Why a single photo could not be georeferenced.
#[derive(Debug, Error)]
pub enum PhotoError {
    #[error(transparent)]
    Input(#[from] RejectedRow),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    SpatialReference(#[from] SpatialReferenceError),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// What was written for a successfully georeferenced photo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoAnchorSummary {
    /// Total rotation applied to the pixels, degrees clockwise.
    pub rotation_deg: f64,
    pub upper_left: GroundPoint,
    pub lower_right: GroundPoint,
    pub raster_width: u32,
    pub raster_height: u32,
    pub transform: AffineTransform,
}

/// Outcome for one input row.
#[derive(Debug)]
pub struct PhotoReport {
    /// 1-based line number in the input.
    pub row: usize,
    /// Photo filename, if the row got far enough to have one.
    pub filename: Option<String>,
    /// Output raster path, for rows that reached the output stage.
    pub output: Option<PathBuf>,
    pub outcome: Result<GeoAnchorSummary, PhotoError>,
}

impl PhotoReport {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Per-row outcomes of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub photos: Vec<PhotoReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.photos.iter().filter(|p| p.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.photos.len() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &PhotoReport> {
        self.photos.iter().filter(|p| !p.is_ok())
    }
}

/// Work item handed from the sequential stage to the parallel stage.
enum PlannedPhoto {
    Rejected(RejectedRow),
    Photo {
        record: PhotoRecord,
        rotation: Result<RotationAngle, GeometryError>,
        output: Result<PathBuf, ResourceError>,
    },
}

/// Georeferences flight lists with one fixed configuration.
#[derive(Debug)]
pub struct Georeferencer {
    config: GeorefConfig,
    window: CropWindow,
    shift: GroundShift,
    /// Parsed once; a bad definition fails each photo when it is applied.
    srs: Result<SpatialReference, SpatialReferenceError>,
    pool: Option<rayon::ThreadPool>,
}

impl Georeferencer {
    pub fn new(config: GeorefConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let srs = SpatialReference::from_wkt(&config.wkt);
        if let Err(e) = &srs {
            log::warn!("Coordinate system definition is unusable, no photo can be georeferenced: {e}");
        }

        let pool = match config.jobs {
            Some(jobs) => Some(
                ThreadPoolBuilder::new()
                    .num_threads(jobs)
                    .thread_name(|idx| format!("aerotile-{idx}"))
                    .build()
                    .map_err(|e| ConfigError::Invalid {
                        field: "jobs",
                        reason: format!("failed to build thread pool: {e}"),
                    })?,
            ),
            None => None,
        };

        Ok(Self {
            window: config.crop_window(),
            shift: config.shift(),
            config,
            srs,
            pool,
        })
    }

    pub fn config(&self) -> &GeorefConfig {
        &self.config
    }

    /// Read a flight list with the configured layout and process it.
    pub fn run_reader<R: Read>(&self, reader: R) -> BatchReport {
        self.run(read_records(reader, &self.config.record_layout()))
    }

    /// Process parsed rows, in flight order.
    pub fn run(&self, rows: Vec<Result<PhotoRecord, RejectedRow>>) -> BatchReport {
        if let Err(e) = fs::create_dir_all(&self.config.output_dir) {
            log::error!(
                "Failed to create output directory {}: {e}",
                self.config.output_dir.display()
            );
        }

        let planned = self.plan(rows);
        log::info!("Georeferencing {} photos", planned.len());

        let photos = match &self.pool {
            Some(pool) => pool.install(|| self.process_all(planned)),
            None => self.process_all(planned),
        };

        let report = BatchReport { photos };
        log::info!(
            "Finished: {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );
        report
    }

    /// Output raster path for a photo filename.
    pub fn output_path(&self, filename: &str) -> PathBuf {
        let stem = Path::new(filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.to_string());
        self.config
            .output_dir
            .join(format!("{}{stem}.tif", self.config.output_prefix))
    }

    /// Sequential stage: derive every photo's rotation in flight order and
    /// assign output paths.
    ///
    /// Distinct filenames can share a stem (`x/a.png`, `y/a.jpg`). The first
    /// row keeps the output path and later rows fail with
    /// [`ResourceError::DuplicateOutput`].
    fn plan(&self, rows: Vec<Result<PhotoRecord, RejectedRow>>) -> Vec<PlannedPhoto> {
        let mut slots = Vec::with_capacity(rows.len());
        let mut records = Vec::new();
        for row in rows {
            match row {
                Ok(record) => {
                    slots.push(None);
                    records.push(record);
                }
                Err(rejected) => slots.push(Some(PlannedPhoto::Rejected(rejected))),
            }
        }

        let extra = self.config.extra_rotation_deg;
        let mut claimed: HashMap<PathBuf, usize> = HashMap::new();
        let mut steps = flight_line(records).map(|step| {
            let rotation = step.rotation(extra);
            let path = self.output_path(&step.record.filename);
            let output = match claimed.get(&path) {
                Some(&first_row) => Err(ResourceError::DuplicateOutput { path, first_row }),
                None => {
                    claimed.insert(path.clone(), step.record.row);
                    Ok(path)
                }
            };
            if let Ok(angle) = &rotation {
                log::debug!(
                    "{}: rotation {:.3} deg",
                    step.record.filename,
                    angle.degrees()
                );
            }
            PlannedPhoto::Photo {
                record: step.record,
                rotation,
                output,
            }
        });

        slots
            .into_iter()
            .filter_map(|slot| slot.or_else(|| steps.next()))
            .collect()
    }

    fn process_all(&self, planned: Vec<PlannedPhoto>) -> Vec<PhotoReport> {
        planned
            .into_par_iter()
            .map(|photo| self.process(photo))
            .collect()
    }

    fn process(&self, photo: PlannedPhoto) -> PhotoReport {
        let report = match photo {
            PlannedPhoto::Rejected(rejected) => PhotoReport {
                row: rejected.row,
                filename: rejected.filename.clone(),
                output: None,
                outcome: Err(PhotoError::Input(rejected)),
            },
            PlannedPhoto::Photo {
                record,
                rotation,
                output: Ok(output),
            } => {
                let outcome = self.georeference(&record, rotation, &output);
                PhotoReport {
                    row: record.row,
                    filename: Some(record.filename),
                    output: Some(output),
                    outcome,
                }
            }
            PlannedPhoto::Photo {
                record,
                output: Err(e),
                ..
            } => PhotoReport {
                row: record.row,
                filename: Some(record.filename),
                output: None,
                outcome: Err(e.into()),
            },
        };

        if let Err(e) = &report.outcome {
            log::error!(
                "{} (row {}): {e}",
                report.filename.as_deref().unwrap_or("<unnamed>"),
                report.row
            );
        }
        report
    }

    /// Parallel stage for one photo.
    ///
    /// The pixels are written before any georeferencing is applied; a
    /// spatial reference failure leaves that plain raster behind.
    fn georeference(
        &self,
        record: &PhotoRecord,
        rotation: Result<RotationAngle, GeometryError>,
        output: &Path,
    ) -> Result<GeoAnchorSummary, PhotoError> {
        let rotation = rotation?;

        let source = raster::load_source(&self.config.images_dir.join(&record.filename))?;
        if !self.window.fits_within(source.width(), source.height()) {
            log::warn!(
                "{}: {}x{} source is smaller than the {}x{} crop window, ground pixel size will be overstated",
                record.filename,
                source.width(),
                source.height(),
                self.window.width,
                self.window.height
            );
        }
        let cropped = crop_centered(&source, self.window);
        let rotated = rotate_clockwise(&cropped, rotation.degrees(), self.config.filter);
        let written = raster::write_pixels(output, &rotated)?;

        let geometry = CropGeometry::new(self.window, record.resolution);
        let anchor = compute_anchor(record.center, rotation, &geometry, self.shift);

        let mut dataset = GeoTiffDataset::open_for_update(&written)?;
        let srs = self.srs.as_ref().map_err(Clone::clone)?;
        dataset.set_spatial_reference(srs);

        let (raster_width, raster_height) = dataset.raster_size();
        let transform = anchor.transform(raster_width, raster_height);
        dataset.set_geo_transform(transform);
        dataset.commit()?;

        log::debug!(
            "{}: upper-left ({:.3}, {:.3}), lower-right ({:.3}, {:.3})",
            record.filename,
            anchor.upper_left.x,
            anchor.upper_left.y,
            anchor.lower_right.x,
            anchor.lower_right.y
        );

        Ok(GeoAnchorSummary {
            rotation_deg: rotation.degrees(),
            upper_left: anchor.upper_left,
            lower_right: anchor.lower_right,
            raster_width,
            raster_height,
            transform,
        })
    }
}
