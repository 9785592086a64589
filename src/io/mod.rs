//! Image and triangulation I/O.
//!
//! # Supported Formats
//!
//! | Format | Extension | Load | Save |
//! |--------|-----------|------|------|
//! | PNG | `.png` | ✓ | ✓ |
//! | Netpbm | `.pgm`, `.ppm`, `.pnm` | ✓ | ✓ |
//! | JPEG | `.jpg`, `.jpeg` | ✓ | ✓ |
//! | BMP | `.bmp` | ✓ | ✓ |
//!
//! Images with colour channels load as [`ColorMode::Color`], the others as
//! [`ColorMode::Grayscale`]. Regularized triangulations are exported with
//! [`ply::save`].
//!
//! ```no_run
//! use tvmesh::io::{load, save};
//!
//! let raster = load("input.ppm").unwrap();
//! save(&raster, "copy.png").unwrap();
//! ```

pub mod ply;
mod raster;

pub use raster::Raster;

use std::path::Path;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};

use crate::algo::tv::calculus::ColorMode;
use crate::error::{Result, TvError};

/// Supported image file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Portable Network Graphics.
    Png,
    /// Netpbm (PGM for grayscale, PPM for colour).
    Pnm,
    /// JPEG.
    Jpeg,
    /// Windows bitmap.
    Bmp,
}

impl Format {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Format::Png),
            "pgm" | "ppm" | "pnm" => Some(Format::Pnm),
            "jpg" | "jpeg" => Some(Format::Jpeg),
            "bmp" => Some(Format::Bmp),
            _ => None,
        }
    }

    /// Detect format from file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Format::Png => ImageFormat::Png,
            Format::Pnm => ImageFormat::Pnm,
            Format::Jpeg => ImageFormat::Jpeg,
            Format::Bmp => ImageFormat::Bmp,
        }
    }
}

fn detect(path: &Path) -> Result<Format> {
    Format::from_path(path).ok_or_else(|| TvError::UnsupportedFormat {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(none)")
            .to_string(),
    })
}

/// Load an image with automatic format detection.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Raster> {
    let path = path.as_ref();
    let format = detect(path)?;
    let image = image::open(path).map_err(|e| TvError::LoadError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let raster = from_dynamic(&image)?;
    log::info!(
        "Image <{}> ({:?}) size={}x{} color={}",
        path.display(),
        format,
        raster.width(),
        raster.height(),
        raster.mode() == ColorMode::Color
    );
    Ok(raster)
}

/// Save an image with automatic format detection.
///
/// Grayscale rasters are written with one channel.
pub fn save<P: AsRef<Path>>(raster: &Raster, path: P) -> Result<()> {
    let path = path.as_ref();
    let format = detect(path)?;
    let image = to_dynamic(raster)?;
    image
        .save_with_format(path, format.image_format())
        .map_err(|e| TvError::SaveError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

fn from_dynamic(image: &DynamicImage) -> Result<Raster> {
    let mode = if image.color().has_color() {
        ColorMode::Color
    } else {
        ColorMode::Grayscale
    };
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    Raster::from_rgb(width as usize, height as usize, mode, rgb.into_raw())
}

fn to_dynamic(raster: &Raster) -> Result<DynamicImage> {
    let (width, height) = (raster.width() as u32, raster.height() as u32);
    let image = match raster.mode() {
        ColorMode::Color => RgbImage::from_raw(width, height, raster.as_rgb().to_vec()).map(DynamicImage::ImageRgb8),
        ColorMode::Grayscale => {
            let luma = raster.as_rgb().chunks_exact(3).map(|px| px[0]).collect();
            GrayImage::from_raw(width, height, luma).map(DynamicImage::ImageLuma8)
        }
    };
    image.ok_or_else(|| TvError::InvalidState("raster size does not match its buffer".to_string()))
}
