//! The full regularization: denoise, quantize, then alternate flips and
//! denoising.

use crate::algo::Progress;
use crate::error::Result;
use crate::mesh::MeshIndex;

use super::denoise::DenoiseOptions;
use super::flip::{FlipOptions, FlipSummary};
use super::TvTriangulation;

/// Options for [`TvTriangulation::regularize`].
#[derive(Debug, Clone)]
pub struct RegularizeOptions {
    /// Denoising parameters; a non-positive `lambda` skips denoising.
    pub denoise: DenoiseOptions,

    /// Flip optimizer parameters.
    pub flip: FlipOptions,

    /// Number of quantization levels, `None` to keep the values as they are.
    pub quantize: Option<usize>,

    /// Number of flip rounds. Every round after the first starts with
    /// another denoising pass.
    pub alternations: usize,
}

impl Default for RegularizeOptions {
    fn default() -> Self {
        Self {
            denoise: DenoiseOptions::default(),
            flip: FlipOptions::default(),
            quantize: Some(256),
            alternations: 1,
        }
    }
}

impl RegularizeOptions {
    /// Set the denoising options.
    pub fn with_denoise(mut self, denoise: DenoiseOptions) -> Self {
        self.denoise = denoise;
        self
    }

    /// Set the flip options.
    pub fn with_flip(mut self, flip: FlipOptions) -> Self {
        self.flip = flip;
        self
    }

    /// Set the number of quantization levels.
    pub fn with_quantize(mut self, levels: Option<usize>) -> Self {
        self.quantize = levels;
        self
    }

    /// Set the number of alternated rounds.
    pub fn with_alternations(mut self, alternations: usize) -> Self {
        self.alternations = alternations;
        self
    }

    /// Rounds actually performed. Quantized values are not denoised again,
    /// so anything but the full 256 levels allows a single round.
    pub fn effective_alternations(&self) -> usize {
        if self.quantize != Some(256) && self.alternations != 1 {
            1
        } else {
            self.alternations
        }
    }
}

/// What a [`TvTriangulation::regularize`] run did.
#[derive(Debug, Clone, Default)]
pub struct RegularizeSummary {
    /// Energy after the initial denoising and quantization.
    pub initial_energy: f64,
    /// One entry per flip round.
    pub rounds: Vec<FlipSummary>,
    /// Energy at the end.
    pub energy: f64,
}

impl<I: MeshIndex> TvTriangulation<I> {
    /// Denoise, quantize, then run the flip optimizer, optionally
    /// alternating with further denoising passes.
    pub fn regularize(&mut self, options: &RegularizeOptions) -> Result<RegularizeSummary> {
        self.regularize_with_progress(options, &Progress::none())
    }

    /// [`regularize`](Self::regularize) with progress reporting.
    pub fn regularize_with_progress(
        &mut self,
        options: &RegularizeOptions,
        progress: &Progress,
    ) -> Result<RegularizeSummary> {
        options.denoise.validate()?;

        if options.denoise.is_active() {
            self.tv_pass_with_progress(&options.denoise, progress)?;
        }
        if let Some(levels) = options.quantize {
            self.quantize(levels)?;
        }

        let rounds = options.effective_alternations();
        if rounds != options.alternations {
            log::warn!("Quantization is not compatible with alternating TV and flips; running a single round");
        }

        let mut summary = RegularizeSummary {
            initial_energy: self.tv_energy,
            ..Default::default()
        };
        for n in 0..rounds {
            if n > 0 && options.denoise.is_active() {
                self.tv_pass_with_progress(&options.denoise, progress)?;
            }
            log::info!("Flip round {}/{}", n + 1, rounds);
            summary.rounds.push(self.optimize_with_progress(&options.flip, progress));
        }
        summary.energy = self.tv_energy;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::tv::calculus::ColorMode;
    use crate::algo::tv::flip::EqualStrategy;
    use crate::algo::tv::TvOptions;
    use crate::io::Raster;

    fn checker() -> TvTriangulation {
        let mut raster = Raster::new(6, 6, ColorMode::Color);
        for y in 0..6 {
            for x in 0..6 {
                let on = (x / 2 + y / 3) % 2 == 0;
                raster.set(x, y, if on { [250, 30, 30] } else { [20, 20, 200] });
            }
        }
        TvTriangulation::from_raster(&raster, &TvOptions::default().with_seed(1)).unwrap()
    }

    #[test]
    fn test_alternation_rule() {
        let options = RegularizeOptions::default().with_alternations(3);
        assert_eq!(options.effective_alternations(), 3);
        assert_eq!(options.clone().with_quantize(Some(8)).effective_alternations(), 1);
        assert_eq!(options.clone().with_quantize(None).effective_alternations(), 1);
        assert_eq!(options.with_alternations(0).effective_alternations(), 0);
    }

    #[test]
    fn test_default_run() {
        let mut tvt = checker();
        let before = tvt.energy();
        let summary = tvt.regularize(&RegularizeOptions::default()).unwrap();

        assert_eq!(summary.rounds.len(), 1);
        assert_eq!(summary.initial_energy, before);
        assert!(summary.energy <= before + 1e-9);
        assert_eq!(summary.energy, tvt.energy());
        assert!(tvt.mesh().is_valid());
    }

    #[test]
    fn test_alternating_rounds() {
        let mut tvt = checker();
        let options = RegularizeOptions::default()
            .with_denoise(DenoiseOptions::default().with_lambda(0.1))
            .with_flip(FlipOptions::default().with_strategy(EqualStrategy::Ignore))
            .with_alternations(2);
        let summary = tvt.regularize(&options).unwrap();

        assert_eq!(summary.rounds.len(), 2);
        let sum: f64 = tvt.face_energies().iter().sum();
        assert!((tvt.energy() - sum).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_denoise_options() {
        let mut tvt = checker();
        let options = RegularizeOptions::default().with_denoise(DenoiseOptions::default().with_dt(0.3));
        assert!(tvt.regularize(&options).is_err());
    }
}
