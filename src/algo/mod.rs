//! Image regularization algorithms.
//!
//! - [`tv`]: total-variation regularization of image triangulations, with
//!   TV denoising of the vertex values and energy-driven edge flips.
//! - [`progress`]: progress callbacks shared by the long-running loops.

pub mod progress;
pub mod tv;

pub use progress::Progress;
