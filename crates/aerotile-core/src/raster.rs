//! Two-phase GeoTIFF output.
//!
//! Pixels and georeferencing are written in separate phases:
//!
//! 1. [`write_pixels`] stores the rotated photo as a plain TIFF and returns a
//!    [`WrittenRaster`] receipt.
//! 2. [`GeoTiffDataset::open_for_update`] takes that receipt, so metadata can
//!    only ever be stamped onto a raster whose pixel write succeeded. The
//!    spatial reference and affine transform are staged on the dataset and
//!    [`GeoTiffDataset::commit`] rewrites the file with the GeoTIFF tags.
//!
//! If phase 2 fails the phase 1 file is left in place, without georeferencing.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbImage};
use thiserror::Error;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tiff::ColorType;

use crate::geometry::AffineTransform;
use crate::srs::{GeoKeyDirectory, SpatialReference};

/// Errors reading source photos or writing output rasters.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The source photo does not exist.
    #[error("source image not found: {}", .0.display())]
    SourceMissing(PathBuf),

    /// The source photo exists but could not be decoded.
    #[error("failed to decode {}: {message}", .path.display())]
    Decode { path: PathBuf, message: String },

    /// The output raster could not be written or rewritten.
    #[error("failed to write {}: {message}", .path.display())]
    Write { path: PathBuf, message: String },

    /// Another photo of the same batch already writes this output path.
    #[error("output {} is already written by row {first_row}", .path.display())]
    DuplicateOutput { path: PathBuf, first_row: usize },

    /// The output raster is not the 8-bit RGB layout this crate writes.
    #[error("unsupported raster layout in {}: {message}", .path.display())]
    UnsupportedLayout { path: PathBuf, message: String },
}

/// Load a source photo as 8-bit RGB.
pub fn load_source(path: &Path) -> Result<RgbImage, ResourceError> {
    if !path.is_file() {
        return Err(ResourceError::SourceMissing(path.to_path_buf()));
    }

    let img = image::open(path).map_err(|e| ResourceError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(img.into_rgb8())
}

/// Receipt for a raster whose pixel content has been stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenRaster {
    path: PathBuf,
    width: u32,
    height: u32,
}

impl WrittenRaster {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Phase 1: store pixel content as a TIFF.
pub fn write_pixels(path: &Path, image: &RgbImage) -> Result<WrittenRaster, ResourceError> {
    image
        .save_with_format(path, ImageFormat::Tiff)
        .map_err(|e| ResourceError::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    log::debug!(
        "Wrote {}x{} pixels to {}",
        image.width(),
        image.height(),
        path.display()
    );

    Ok(WrittenRaster {
        path: path.to_path_buf(),
        width: image.width(),
        height: image.height(),
    })
}

/// Phase 2: a written raster opened to receive georeferencing.
#[derive(Debug)]
pub struct GeoTiffDataset {
    path: PathBuf,
    pixels: RgbImage,
    keys: Option<GeoKeyDirectory>,
    transform: Option<AffineTransform>,
}

impl GeoTiffDataset {
    /// Open a raster written by [`write_pixels`] for update.
    pub fn open_for_update(raster: &WrittenRaster) -> Result<Self, ResourceError> {
        let path = raster.path();
        let read_err = |message: String| ResourceError::Decode {
            path: path.to_path_buf(),
            message,
        };

        let file = File::open(path).map_err(|e| read_err(e.to_string()))?;
        let mut decoder = Decoder::new(BufReader::new(file)).map_err(|e| read_err(e.to_string()))?;

        let (width, height) = decoder.dimensions().map_err(|e| read_err(e.to_string()))?;
        let color = decoder.colortype().map_err(|e| read_err(e.to_string()))?;
        if color != ColorType::RGB(8) {
            return Err(ResourceError::UnsupportedLayout {
                path: path.to_path_buf(),
                message: format!("expected 8-bit RGB, found {color:?}"),
            });
        }

        let data = match decoder.read_image().map_err(|e| read_err(e.to_string()))? {
            DecodingResult::U8(data) => data,
            _ => {
                return Err(ResourceError::UnsupportedLayout {
                    path: path.to_path_buf(),
                    message: "expected 8-bit samples".to_string(),
                })
            }
        };

        let pixels = RgbImage::from_raw(width, height, data).ok_or_else(|| {
            ResourceError::UnsupportedLayout {
                path: path.to_path_buf(),
                message: "pixel buffer does not match raster size".to_string(),
            }
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            pixels,
            keys: None,
            transform: None,
        })
    }

    /// Raster size in pixels as (width, height).
    pub fn raster_size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn set_spatial_reference(&mut self, srs: &SpatialReference) {
        self.keys = Some(GeoKeyDirectory::from_srs(srs));
    }

    pub fn set_geo_transform(&mut self, transform: AffineTransform) {
        self.transform = Some(transform);
    }

    /// Rewrite the raster with the staged georeferencing tags.
    ///
    /// The file is written next to the existing raster and renamed over it, so a
    /// failed commit leaves the phase 1 raster intact.
    pub fn commit(self) -> Result<PathBuf, ResourceError> {
        let tmp = self.path.with_extension("tif.partial");
        let write_err = |message: String| ResourceError::Write {
            path: self.path.clone(),
            message,
        };

        let result = self.encode(&tmp).map_err(|e| write_err(e.to_string()));
        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        fs::rename(&tmp, &self.path).map_err(|e| write_err(e.to_string()))?;
        log::debug!("Georeferenced {}", self.path.display());
        Ok(self.path)
    }

    fn encode(&self, out: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let file = BufWriter::new(File::create(out)?);
        let mut encoder = TiffEncoder::new(file)?;
        let (width, height) = self.pixels.dimensions();
        let mut image = encoder.new_image::<colortype::RGB8>(width, height)?;

        {
            let dir = image.encoder();
            if let Some(transform) = &self.transform {
                if transform.is_axis_aligned() {
                    dir.write_tag(Tag::ModelPixelScaleTag, &transform.pixel_scale()[..])?;
                    dir.write_tag(Tag::ModelTiepointTag, &transform.tiepoint()[..])?;
                } else {
                    let matrix = model_transformation(transform);
                    dir.write_tag(Tag::ModelTransformationTag, &matrix[..])?;
                }
            }
            if let Some(keys) = &self.keys {
                dir.write_tag(Tag::GeoKeyDirectoryTag, &keys.directory[..])?;
                if !keys.doubles.is_empty() {
                    dir.write_tag(Tag::GeoDoubleParamsTag, &keys.doubles[..])?;
                }
                if !keys.ascii.is_empty() {
                    dir.write_tag(Tag::GeoAsciiParamsTag, keys.ascii.as_str())?;
                }
            }
        }

        image.write_data(self.pixels.as_raw())?;
        Ok(())
    }
}

/// 4x4 row-major `ModelTransformationTag` matrix for a general affine.
fn model_transformation(t: &AffineTransform) -> [f64; 16] {
    let mut matrix = [0.0; 16];
    matrix[..4].copy_from_slice(&[t.a(), t.b(), 0.0, t.c()]);
    matrix[4..8].copy_from_slice(&[t.d(), t.e(), 0.0, t.f()]);
    matrix[15] = 1.0;
    matrix
}
