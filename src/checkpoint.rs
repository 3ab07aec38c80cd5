//! Weight persistence and best-model tracking.
//!
//! Checkpoints live under `<run_dir>/net_weights/`. Two triggers:
//!
//! - periodic: `step_<n>.mpk`, one file per trigger, never overwritten,
//! - best-so-far: a fixed `best_results.mpk` plus a sibling
//!   `best_results.txt` recording the step and error. Later best saves
//!   supersede the previous ones in place.
//!
//! Files are burn named-mpk records at full precision. Directory creation is
//! idempotent.

use burn_core as burn;

use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::Backend;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::Result;

/// Subdirectory of the run folder holding all weight files.
pub const WEIGHTS_DIR: &str = "net_weights";

/// Persists network weights under a run directory.
#[derive(Debug, Clone)]
pub struct Checkpointer {
    dir: PathBuf,
}

impl Checkpointer {
    /// Create (if absent) `<run_dir>/net_weights/`.
    pub fn new(run_dir: &Path) -> Result<Self> {
        let dir = run_dir.join(WEIGHTS_DIR);
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Periodic checkpoint under a step-tagged name.
    pub fn save_step<B: Backend, M: Module<B>>(&self, net: &M, step: usize) -> Result<PathBuf> {
        let path = self.dir.join(format!("step_{step}"));
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::default();
        net.clone().save_file(path.clone(), &recorder)?;
        info!(step, "periodic checkpoint written");
        Ok(path.with_extension("mpk"))
    }

    /// Best-so-far checkpoint under the fixed name, with a text record of the
    /// step and error alongside it.
    pub fn save_best<B: Backend, M: Module<B>>(
        &self,
        net: &M,
        step: usize,
        error: f32,
    ) -> Result<PathBuf> {
        let path = self.dir.join("best_results");
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::default();
        net.clone().save_file(path.clone(), &recorder)?;
        fs::write(
            self.dir.join("best_results.txt"),
            format!("step: {step} ;  Error: {error:.3e}"),
        )?;
        info!(step, error, "best checkpoint written");
        Ok(path.with_extension("mpk"))
    }
}

/// Monotonically non-increasing best-error policy.
///
/// `observe` reports whether the evaluation strictly improved on everything
/// seen so far. A NaN error never improves.
#[derive(Debug, Clone)]
pub struct BestTracker {
    best: f32,
}

impl BestTracker {
    pub fn new() -> Self {
        Self { best: f32::INFINITY }
    }

    pub fn best(&self) -> f32 {
        self.best
    }

    pub fn observe(&mut self, error: f32) -> bool {
        if error < self.best {
            self.best = error;
            true
        } else {
            false
        }
    }
}

impl Default for BestTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use burn_nn::LinearConfig;
    use proptest::prelude::*;

    type B = NdArray<f32>;

    #[test]
    fn directory_creation_is_idempotent() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let a = Checkpointer::new(tmp.path()).expect("first");
        let b = Checkpointer::new(tmp.path()).expect("second");
        assert_eq!(a.dir(), b.dir());
        assert!(tmp.path().join(WEIGHTS_DIR).is_dir());
    }

    #[test]
    fn save_step_and_save_best_produce_the_contracted_files() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let ckpt = Checkpointer::new(tmp.path()).expect("checkpointer");
        let net = LinearConfig::new(4, 2).init::<B>(&Default::default());

        let step_path = ckpt.save_step(&net, 4999).expect("save_step");
        assert!(step_path.is_file());
        assert!(step_path.ends_with("step_4999.mpk"));

        let best_path = ckpt.save_best(&net, 4999, 1.2345e-2).expect("save_best");
        assert!(best_path.is_file());
        assert!(best_path.ends_with("best_results.mpk"));

        let txt = std::fs::read_to_string(ckpt.dir().join("best_results.txt")).expect("txt");
        assert_eq!(txt, format!("step: 4999 ;  Error: {:.3e}", 1.2345e-2f32));
    }

    #[test]
    fn later_best_saves_supersede_in_place() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let ckpt = Checkpointer::new(tmp.path()).expect("checkpointer");
        let net = LinearConfig::new(3, 3).init::<B>(&Default::default());

        ckpt.save_best(&net, 10, 0.5).expect("first best");
        ckpt.save_best(&net, 20, 0.25).expect("second best");

        let txt = std::fs::read_to_string(ckpt.dir().join("best_results.txt")).expect("txt");
        assert!(txt.starts_with("step: 20 ;"), "stale record: {txt}");
    }

    #[test]
    fn best_tracker_ignores_nan_and_non_improvements() {
        let mut tracker = BestTracker::new();
        assert!(tracker.observe(0.5));
        assert!(!tracker.observe(0.5));
        assert!(!tracker.observe(f32::NAN));
        assert!(tracker.observe(0.1));
        assert_eq!(tracker.best(), 0.1);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            .. ProptestConfig::default()
        })]
        #[test]
        fn prop_best_tracker_equals_the_running_minimum(
            errors in prop::collection::vec(0.0f32..100.0f32, 1..64),
        ) {
            let mut tracker = BestTracker::new();
            let mut running_min = f32::INFINITY;
            for &e in &errors {
                let improved = tracker.observe(e);
                prop_assert_eq!(improved, e < running_min);
                running_min = running_min.min(e);
                prop_assert_eq!(tracker.best(), running_min);
                // Never regresses.
                prop_assert!(tracker.best() <= running_min);
            }
        }
    }
}
