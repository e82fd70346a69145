//! Process-wide georeferencing parameters.
//!
//! Loaded from a TOML file; every field is optional and falls back to the
//! defaults below. The CLI applies its flags on top of the loaded value.
//!
//! ```toml
//! crop_width = 1500
//! crop_height = 1000
//! default_resolution = 0.16
//! extra_rotation_deg = 0.0
//! images_dir = "photos"
//! output_dir = "output"
//! filter = "lanczos3"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{CropWindow, GroundShift};
use crate::record::RecordLayout;
use crate::srs::GTM_WKT;
use crate::transform::InterpolationFilter;

/// Errors loading or validating a [`GeorefConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Parameters shared by every photo of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeorefConfig {
    /// Crop window width, pixels.
    pub crop_width: u32,
    /// Crop window height, pixels.
    pub crop_height: u32,
    /// Ground sample resolution (m/px) for rows without one.
    pub default_resolution: f64,
    /// Constant rotation added to every flight heading, degrees.
    pub extra_rotation_deg: f64,
    /// Ground shift along the photo's own x axis.
    pub x_shift: f64,
    /// Ground shift along the photo's own y axis.
    pub y_shift: f64,
    /// Directory the filenames in the flight list are relative to.
    pub images_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Prepended to each output filename.
    pub output_prefix: String,
    /// 0-indexed column holding the per-photo resolution.
    pub resolution_column: usize,
    pub has_header: bool,
    pub filter: InterpolationFilter,
    /// WKT1 definition of the target projected coordinate system.
    pub wkt: String,
    /// Worker threads for the per-photo stage. `None` uses rayon's default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
}

impl Default for GeorefConfig {
    fn default() -> Self {
        Self {
            crop_width: 1500,
            crop_height: 1000,
            default_resolution: 0.16,
            extra_rotation_deg: 0.0,
            x_shift: 0.0,
            y_shift: 0.0,
            images_dir: PathBuf::from("."),
            output_dir: PathBuf::from("output"),
            output_prefix: "new_".to_string(),
            resolution_column: 7,
            has_header: false,
            filter: InterpolationFilter::default(),
            wkt: GTM_WKT.to_string(),
            jobs: None,
        }
    }
}

impl GeorefConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Check the numeric parameters.
    ///
    /// The WKT is not checked here: a bad definition fails each photo at
    /// georeferencing time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.crop_window().is_empty() {
            return Err(ConfigError::Invalid {
                field: "crop window",
                reason: format!(
                    "{}x{} must be non-empty",
                    self.crop_width, self.crop_height
                ),
            });
        }

        if !(self.default_resolution.is_finite() && self.default_resolution > 0.0) {
            return Err(ConfigError::Invalid {
                field: "default_resolution",
                reason: format!("{} must be a positive number", self.default_resolution),
            });
        }

        let finite = [
            ("extra_rotation_deg", self.extra_rotation_deg),
            ("x_shift", self.x_shift),
            ("y_shift", self.y_shift),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{value} is not finite"),
                });
            }
        }

        if self.jobs == Some(0) {
            return Err(ConfigError::Invalid {
                field: "jobs",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    pub fn crop_window(&self) -> CropWindow {
        CropWindow::new(self.crop_width, self.crop_height)
    }

    pub fn shift(&self) -> GroundShift {
        GroundShift::new(self.x_shift, self.y_shift)
    }

    pub fn record_layout(&self) -> RecordLayout {
        RecordLayout {
            resolution_column: self.resolution_column,
            default_resolution: self.default_resolution,
            has_header: self.has_header,
        }
    }
}
