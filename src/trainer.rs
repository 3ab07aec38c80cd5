//! The iterate-evaluate-checkpoint driver.
//!
//! A [`Trainer`] owns the network, the grid operators, both datasets, and the
//! observability sink for the lifetime of a run. One `train()` call executes
//! the configured number of steps, fully sequentially:
//!
//! - composite loss on the training set, backward, one Adam step,
//! - every `save_every` steps: a periodic checkpoint,
//! - every `test_every` steps: held-out loss, reconstruction error,
//!   best-model bookkeeping, diagnostics to the sink,
//! - every 100 steps: a one-line overwritten console progress report.
//!
//! Errors surface immediately; a failed step aborts the whole run. There is
//! no retry or recovery logic anywhere in the loop.

use burn_core as burn;

use burn::module::AutodiffModule;
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Tensor, TensorData};
use burn_autodiff::Autodiff;
use burn_ndarray::NdArray;
use burn_optim::{AdamConfig, GradientsParams, LearningRate, Optimizer};
use chrono::Local;
use ndarray::{ArrayView2, ArrayView4};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::checkpoint::{BestTracker, Checkpointer};
use crate::grid::GridOps;
use crate::loss::composite_loss;
use crate::net::FieldNet;
use crate::track::{MetricSink, NoopSink};
use crate::{eval, plots, snapshot, Error, Result};

/// Default backend for these training loops: ndarray + autodiff.
pub type DefaultBackend = Autodiff<NdArray<f32>>;

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Adam learning rate at step 0.
    pub lr: f64,
    /// Learning rate at the final step; the per-step rate decays linearly
    /// from `lr` to `lr_min` over the run.
    pub lr_min: f64,
    /// Weight of the latent smoothness term. Zero disables it.
    pub smooth_phi: f32,
    /// Parent directory for run folders.
    pub log_folder: PathBuf,
    /// Number of optimizer steps.
    pub trainsteps: usize,
    /// Held-out evaluation cadence.
    pub test_every: usize,
    /// Periodic checkpoint cadence.
    pub save_every: usize,
    /// Prefix of the timestamped run folder name.
    pub log_base_name: String,
    /// Source tree to copy into the run folder for reproducibility; `None`
    /// disables the snapshot.
    pub snapshot_sources: Option<PathBuf>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            lr: 1e-3,
            lr_min: 1e-4,
            smooth_phi: 5e-4,
            log_folder: PathBuf::from("./train_results_local"),
            trainsteps: 100_000,
            test_every: 1_000,
            save_every: 5_000,
            log_base_name: String::new(),
            snapshot_sources: None,
        }
    }
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.lr > 0.0) || !self.lr.is_finite() {
            return Err(Error::Domain("lr must be positive and finite"));
        }
        if !(self.lr_min > 0.0) || self.lr_min > self.lr {
            return Err(Error::Domain("lr_min must satisfy 0 < lr_min <= lr"));
        }
        if !(self.smooth_phi >= 0.0) || !self.smooth_phi.is_finite() {
            return Err(Error::Domain("smooth_phi must be nonnegative and finite"));
        }
        if self.trainsteps == 0 || self.test_every == 0 || self.save_every == 0 {
            return Err(Error::Domain(
                "trainsteps, test_every and save_every must be >= 1",
            ));
        }
        Ok(())
    }
}

/// Ordered training and evaluation logs of one run.
#[derive(Debug, Clone)]
pub struct TrainReport {
    /// `(loss, step)` for every step, in order.
    pub train_loss: Vec<(f32, usize)>,
    /// `(loss, step)` for every held-out evaluation, in order.
    pub test_loss: Vec<(f32, usize)>,
    /// Best relative reconstruction error observed on the test set.
    pub best_error: f32,
    pub run_dir: PathBuf,
}

/// A training session over a fixed grid and dataset pair.
pub struct Trainer<B: AutodiffBackend, M, S = NoopSink> {
    net: M,
    grid: GridOps<B>,
    train_set: Tensor<B, 4>,
    test_set: Tensor<B, 4>,
    config: TrainerConfig,
    sink: S,
}

fn to_tensor4<B: Backend>(device: &B::Device, x: &ArrayView4<f32>) -> Tensor<B, 4> {
    let (n, c, h, w) = x.dim();
    let data = x.as_standard_layout();
    Tensor::from_data(
        TensorData::new(data.as_slice().unwrap_or(&[]).to_vec(), [n, c, h, w]),
        device,
    )
}

/// 5 significant digits, the progress-line format.
fn sig5(x: f32) -> String {
    format!("{x:.4e}")
}

impl<B, M, S> Trainer<B, M, S>
where
    B: AutodiffBackend,
    M: FieldNet<B> + AutodiffModule<B>,
    M::InnerModule: FieldNet<B::InnerBackend>,
    S: MetricSink,
{
    /// Build a session: derive the grid operators, move both datasets to the
    /// device, validate shapes against the grid.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        net: M,
        x: &ArrayView2<f32>,
        y: &ArrayView2<f32>,
        train_set: &ArrayView4<f32>,
        test_set: &ArrayView4<f32>,
        config: TrainerConfig,
        device: &B::Device,
        sink: S,
    ) -> Result<Self> {
        config.validate()?;
        let grid = GridOps::from_coordinates(x, y, device)?;
        let (rows, cols) = grid.shape();

        let (n_train, _, h, w) = train_set.dim();
        if n_train == 0 {
            return Err(Error::Domain("train_set must be non-empty"));
        }
        if (h, w) != (rows, cols) {
            return Err(Error::Shape("train_set spatial dims must match the grid"));
        }
        let (n_test, _, h, w) = test_set.dim();
        if n_test == 0 {
            return Err(Error::Domain("test_set must be non-empty"));
        }
        if (h, w) != (rows, cols) {
            return Err(Error::Shape("test_set spatial dims must match the grid"));
        }

        Ok(Self {
            net,
            grid,
            train_set: to_tensor4(device, train_set),
            test_set: to_tensor4(device, test_set),
            config,
            sink,
        })
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn net(&self) -> &M {
        &self.net
    }

    /// Linear decay from `lr` to `lr_min` across the run.
    fn lr_at(&self, step: usize) -> LearningRate {
        if self.config.trainsteps <= 1 {
            return self.config.lr;
        }
        let progress = step as f64 / (self.config.trainsteps - 1) as f64;
        self.config.lr - (self.config.lr - self.config.lr_min) * progress
    }

    /// Composite loss on the held-out set, gradients disabled. Does not
    /// touch optimizer or parameter state.
    pub fn test(&self) -> Result<f32> {
        eval::held_out_loss(
            &self.net.valid(),
            &self.grid.valid(),
            self.test_set.clone().inner(),
            self.config.smooth_phi,
        )
    }

    /// Relative reconstruction error on `data`, gradients disabled.
    pub fn reco_error(&self, data: Tensor<B::InnerBackend, 4>) -> f32 {
        eval::reco_error(&self.net.valid(), data)
    }

    /// Run the configured number of steps and return the loss logs.
    pub fn train(&mut self) -> Result<TrainReport> {
        let stamp = Local::now().format("%Y_%m_%d__%H-%M");
        let run_dir = self
            .config
            .log_folder
            .join(format!("{}{stamp}", self.config.log_base_name));
        fs::create_dir_all(&run_dir)?;
        info!(run_dir = %run_dir.display(), trainsteps = self.config.trainsteps, "training run started");

        if let Some(root) = &self.config.snapshot_sources {
            let copied = snapshot::snapshot_sources(root, &run_dir.join("code_snapshot"))?;
            debug!(copied, "source snapshot written");
        }
        fs::write(
            run_dir.join("run_config.json"),
            serde_json::to_string_pretty(&self.config)?,
        )?;

        let ckpt = Checkpointer::new(&run_dir)?;
        let mut optim = AdamConfig::new().init::<B, M>();
        let mut best = BestTracker::new();

        let mut train_log: Vec<(f32, usize)> = Vec::with_capacity(self.config.trainsteps);
        let mut test_log: Vec<(f32, usize)> = Vec::new();
        let mut test_loss = 0.0f32;

        for step in 0..self.config.trainsteps {
            let loss = composite_loss(
                &self.net,
                &self.grid,
                self.train_set.clone(),
                self.config.smooth_phi,
            )?;
            let loss_val: f32 = loss.clone().into_scalar().elem();

            // Gradients are produced fresh by each backward; burn has no
            // zero_grad counterpart to call.
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &self.net);
            self.net = optim.step(self.lr_at(step), self.net.clone(), grads);

            train_log.push((loss_val, step));

            if (step + 1) % self.config.save_every == 0 {
                ckpt.save_step(&self.net, step)?;
            }

            if (step + 1) % self.config.test_every == 0 {
                test_loss = self.test()?;
                test_log.push((test_loss, step));

                let reco_error = self.reco_error(self.test_set.clone().inner());
                if best.observe(reco_error) {
                    ckpt.save_best(&self.net, step, reco_error)?;
                }
                self.emit_eval_diagnostics(step, test_loss, reco_error);
            }

            self.sink.scalar("train_loss", loss_val, step + 1);

            if step % 100 == 0 {
                print!(
                    "\r{step}: loss={}; test_loss={}",
                    sig5(loss_val),
                    sig5(test_loss)
                );
                io::stdout().flush().ok();
            }
        }

        info!(best_error = best.best(), "training run finished");
        Ok(TrainReport {
            train_loss: train_log,
            test_loss: test_log,
            best_error: best.best(),
            run_dir,
        })
    }

    fn emit_eval_diagnostics(&mut self, step: usize, test_loss: f32, reco_error: f32) {
        if self.sink.wants_figures() {
            let net = self.net.valid();
            let test_set = self.test_set.clone().inner();
            let [n_test, _, _, _] = test_set.dims();

            let truth = test_set.clone().narrow(0, step % n_test, 1);
            let fig = plots::reconstruction_figure(&net, truth);
            self.sink.figure("reconstruction", &fig, step);

            if let Some(fig) = plots::modes_figure(&net) {
                self.sink.figure("modes", &fig, step);
            }
            if let Some(fig) = plots::latents_figure(&net, test_set) {
                self.sink.figure("latents", &fig, step);
            }
        }
        self.sink.scalar("test/loss", test_loss, step + 1);
        self.sink.scalar("test/rel_Error", reco_error, step + 1);
    }
}
