//! Progress callbacks for the long-running loops (denoising iterations and
//! flip passes).
//!
//! # Example
//!
//! ```
//! use tvmesh::algo::Progress;
//!
//! let progress = Progress::new(|current, total, message| {
//!     eprintln!("{}: {}/{}", message, current, total);
//! });
//! progress.report(1, 10, "Flipping edges");
//! ```

/// A callback receiving `(current, total, message)` updates.
///
/// `total` is an upper bound (an iteration cap), so a loop that converges
/// early jumps straight to its final report.
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, &str) + Send + Sync>,
}

impl Progress {
    /// Wrap a callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Forward an update to the callback.
    #[inline]
    pub fn report(&self, current: usize, total: usize, message: &str) {
        (self.callback)(current, total, message);
    }

    /// A reporter that ignores every update.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_report_forwards_arguments() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress = Progress::new(move |current, total, message| {
            sink.lock().unwrap().push((current, total, message.to_string()));
        });

        progress.report(2, 5, "TV denoising");
        assert_eq!(*seen.lock().unwrap(), vec![(2, 5, "TV denoising".to_string())]);

        Progress::none().report(0, 0, "ignored");
    }
}
