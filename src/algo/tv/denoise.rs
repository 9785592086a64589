//! TV denoising of the vertex values by dual ascent.
//!
//! With `lambda` the fidelity weight and `f` the raw samples, each iteration
//! computes `G = grad(div(p) - lambda * f)` and updates every face with the
//! projected step
//!
//! ```text
//! p' = (p + dt * G) / (1 + dt * |G|)
//! ```
//!
//! until the largest change falls below the tolerance. The denoised values
//! are then `u = f - div(p) / lambda`. The dual field is kept between calls,
//! so a second pass continues where the first stopped.
//!
//! The triangulation is not modified.

use crate::algo::Progress;
use crate::error::{Result, TvError};
use crate::mesh::MeshIndex;

use super::calculus::{divergence, gradient_field, norm_field, ColorMode, VectorValue};
use super::TvTriangulation;

/// Options for [`TvTriangulation::tv_pass`].
#[derive(Debug, Clone)]
pub struct DenoiseOptions {
    /// Fidelity weight. Values `<= 0` mean exact fidelity (`u = f`).
    pub lambda: f64,

    /// Dual step size; must lie in `(0, 0.25)` for the iteration to be stable.
    pub dt: f64,

    /// Stop once the largest per-face dual change is at most this.
    pub tolerance: f64,

    /// Maximum number of dual iterations.
    pub max_iterations: usize,

    /// Compute the per-face gradients in parallel.
    pub parallel: bool,
}

impl Default for DenoiseOptions {
    fn default() -> Self {
        Self {
            lambda: 0.0,
            dt: 0.248,
            tolerance: 0.01,
            max_iterations: 10,
            parallel: false,
        }
    }
}

impl DenoiseOptions {
    /// Set the fidelity weight.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    /// Set the dual step size.
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Set the stopping tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set whether gradients are computed in parallel.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Whether a pass with these options changes anything.
    pub fn is_active(&self) -> bool {
        self.lambda > 0.0
    }

    /// Reject step sizes and tolerances the iteration cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.dt > 0.0 && self.dt < 0.25) {
            return Err(TvError::invalid_param("dt", self.dt, "must lie in (0, 0.25)"));
        }
        if self.tolerance < 0.0 || self.tolerance.is_nan() {
            return Err(TvError::invalid_param(
                "tolerance",
                self.tolerance,
                "must be non-negative",
            ));
        }
        Ok(())
    }
}

impl<I: MeshIndex> TvTriangulation<I> {
    /// Run one denoising pass and return the last dual change.
    ///
    /// Face energies and the total are recomputed from the new values.
    pub fn tv_pass(&mut self, options: &DenoiseOptions) -> Result<f64> {
        self.tv_pass_with_progress(options, &Progress::none())
    }

    /// [`tv_pass`](Self::tv_pass) with progress reporting per iteration.
    pub fn tv_pass_with_progress(&mut self, options: &DenoiseOptions, progress: &Progress) -> Result<f64> {
        options.validate()?;
        if !options.is_active() {
            self.u.clone_from(&self.image);
            self.reset_queues();
            self.recompute_energy();
            return Ok(0.0);
        }

        let mode = self.norm.mode;
        let lambda = options.lambda;
        let dt = options.dt;
        log::info!("TV(u) = {:.6} before denoising", self.tv_energy);

        let lf: Vec<_> = self.image.iter().map(|v| lambda * *v).collect();
        let mut diff_p;
        let mut n = 0;
        loop {
            let dp_lf: Vec<_> = divergence(&self.mesh, &self.p, mode)
                .into_iter()
                .zip(&lf)
                .map(|(d, l)| d - l)
                .collect();
            let g = gradient_field(&self.mesh, &dp_lf, mode, options.parallel);
            let ng = norm_field(&self.norm, &g);

            diff_p = 0.0f64;
            for (f, (gf, ngf)) in g.iter().zip(&ng).enumerate() {
                let alpha = 1.0 / (1.0 + dt * ngf);
                if alpha <= 0.0 {
                    log::warn!("Face {} alpha={}", f, alpha);
                }
                let old = self.p[f];
                let new = alpha * (old + dt * *gf);
                diff_p = diff_p.max(self.norm.vector_norm(&(new - old)));
                self.p[f] = new;
            }

            log::debug!("Iter n={} diff_p={:.6} tol={}", n, diff_p, options.tolerance);
            n += 1;
            progress.report(n, options.max_iterations, "TV denoising");
            if diff_p <= options.tolerance || n >= options.max_iterations {
                break;
            }
        }

        let dp = divergence(&self.mesh, &self.p, mode);
        for ((u, f), d) in self.u.iter_mut().zip(&self.image).zip(&dp) {
            *u = *f - *d / lambda;
        }
        if mode == ColorMode::Grayscale {
            for u in &mut self.u {
                u[1] = u[0];
                u[2] = u[0];
            }
        }

        // New values: every arc has to be examined again.
        self.reset_queues();
        let energy = self.recompute_energy();
        log::info!("TV(u) = {:.6} after {} denoising iterations", energy, n);
        Ok(diff_p)
    }

    /// Reset the dual field to zero, dropping the warm start.
    pub fn reset_dual(&mut self) {
        self.p = vec![VectorValue::zeros(); self.mesh.num_faces()];
    }
}
