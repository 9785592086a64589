//! Quantization of the regularized values.

use crate::error::{Result, TvError};
use crate::mesh::MeshIndex;

use super::TvTriangulation;

impl<I: MeshIndex> TvTriangulation<I> {
    /// Snap every channel of every value to the nearest of `levels`
    /// uniformly spaced levels in `[0, 255]`.
    ///
    /// All face energies are recomputed afterwards.
    pub fn quantize(&mut self, levels: usize) -> Result<()> {
        if levels < 2 {
            return Err(TvError::invalid_param("levels", levels, "at least 2 levels are needed"));
        }
        let step = 255.0 / (levels - 1) as f64;
        for u in &mut self.u {
            for c in u.iter_mut() {
                *c = ((*c / step).round() * step).clamp(0.0, 255.0);
            }
        }
        self.reset_queues();
        let energy = self.recompute_energy();
        log::info!("Quantized to {} levels, TV(u) = {:.6}", levels, energy);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::algo::tv::calculus::{ColorMode, Value};
    use crate::algo::tv::{TvOptions, TvTriangulation};
    use crate::error::TvError;
    use crate::io::Raster;

    fn gradient_image() -> TvTriangulation {
        let mut raster = Raster::new(5, 4, ColorMode::Color);
        for y in 0..4 {
            for x in 0..5 {
                let v = (x * 50 + y * 13) as u8;
                raster.set(x, y, [v, 255 - v, v / 2]);
            }
        }
        TvTriangulation::from_raster(&raster, &TvOptions::default()).unwrap()
    }

    #[test]
    fn test_binary_levels() {
        let mut tvt = gradient_image();
        tvt.quantize(2).unwrap();
        for u in tvt.values() {
            for c in u.iter() {
                assert!(*c == 0.0 || *c == 255.0);
            }
        }
    }

    #[test]
    fn test_idempotent() {
        let mut tvt = gradient_image();
        tvt.quantize(5).unwrap();
        let once = tvt.values().to_vec();
        let energy = tvt.energy();
        tvt.quantize(5).unwrap();
        assert_eq!(tvt.values(), &once[..]);
        assert_eq!(tvt.energy(), energy);
    }

    #[test]
    fn test_clamps_out_of_range() {
        let mut tvt = gradient_image();
        tvt.u[0] = Value::new(-30.0, 300.0, 128.0);
        tvt.quantize(256).unwrap();
        assert_eq!(tvt.values()[0], Value::new(0.0, 255.0, 128.0));
    }

    #[test]
    fn test_energy_is_recomputed() {
        let mut tvt = gradient_image();
        tvt.quantize(3).unwrap();
        let sum: f64 = tvt.face_energies().iter().sum();
        assert!((tvt.energy() - sum).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_single_level() {
        let mut tvt = gradient_image();
        assert!(matches!(tvt.quantize(1), Err(TvError::InvalidParameter { .. })));
        assert!(tvt.quantize(0).is_err());
    }
}
