//! In-memory 8-bit images.

use crate::algo::tv::calculus::{ColorMode, Value};
use crate::error::{Result, TvError};

/// An 8-bit RGB image, row-major, with a colour mode.
///
/// Grayscale rasters still store three channels; [`Raster::value`] then
/// replicates channel 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: usize,
    height: usize,
    mode: ColorMode,
    data: Vec<u8>,
}

impl Raster {
    /// A black raster.
    pub fn new(width: usize, height: usize, mode: ColorMode) -> Self {
        Self {
            width,
            height,
            mode,
            data: vec![0; 3 * width * height],
        }
    }

    /// Wrap interleaved RGB bytes.
    pub fn from_rgb(width: usize, height: usize, mode: ColorMode, data: Vec<u8>) -> Result<Self> {
        if data.len() != 3 * width * height {
            return Err(TvError::SizeMismatch {
                what: "RGB bytes",
                expected: 3 * width * height,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            mode,
            data,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Grayscale or colour.
    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    /// Interleaved RGB bytes.
    pub fn as_rgb(&self) -> &[u8] {
        &self.data
    }

    /// RGB bytes of pixel `(x, y)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> [u8; 3] {
        let i = 3 * (y * self.width + x);
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Overwrite pixel `(x, y)`.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        let i = 3 * (y * self.width + x);
        self.data[i..i + 3].copy_from_slice(&rgb);
    }

    /// Sample of pixel `(x, y)`.
    pub fn value(&self, x: usize, y: usize) -> Value {
        let [r, g, b] = self.get(x, y);
        match self.mode {
            ColorMode::Grayscale => Value::repeat(r as f64),
            ColorMode::Color => Value::new(r as f64, g as f64, b as f64),
        }
    }
}
