//! Train a small bottleneck autoencoder on synthetic traveling-wave
//! snapshots.
//!
//! Run: cargo run --example train_synthetic

use burn_core as burn;

use burn::module::Module;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use burn_nn::{Linear, LinearConfig};
use fieldae::net::{FieldNet, FieldNetOutput};
use fieldae::track::NoopSink;
use fieldae::trainer::{DefaultBackend, Trainer, TrainerConfig};
use ndarray::{Array2, Array4};

#[derive(Module, Debug)]
struct LinearAe<B: Backend> {
    enc: Linear<B>,
    dec: Linear<B>,
}

impl<B: Backend> LinearAe<B> {
    fn new(device: &B::Device, h: usize, w: usize, k: usize) -> Self {
        Self {
            enc: LinearConfig::new(h * w, k).init(device),
            dec: LinearConfig::new(k, h * w).init(device),
        }
    }
}

impl<B: Backend> FieldNet<B> for LinearAe<B> {
    fn forward(&self, batch: Tensor<B, 4>) -> FieldNetOutput<B> {
        let [n, _, h, w] = batch.dims();
        let code = self.enc.forward(batch.flatten::<2>(1, 3));
        let reconstruction = self.dec.forward(code.clone()).reshape([n, 1, h, w]);
        FieldNetOutput {
            phi: reconstruction.clone(),
            reconstruction,
            code: Some(code),
        }
    }
}

fn main() {
    let rows = 16usize;
    let cols = 16usize;

    // Uniform unit-spaced mesh.
    let x = Array2::from_shape_fn((rows, cols), |(_, j)| j as f32);
    let y = Array2::from_shape_fn((rows, cols), |(i, _)| i as f32);

    // Traveling wave q(x, t) = sin(2 pi (x / L - t / T)) modulated along y.
    let snapshots = |n: usize, offset: f32| {
        Array4::from_shape_fn((n, 1, rows, cols), |(s, _, i, j)| {
            let phase = j as f32 / cols as f32 - (s as f32 + offset) / n as f32;
            (2.0 * std::f32::consts::PI * phase).sin()
                * (std::f32::consts::PI * i as f32 / rows as f32).sin()
        })
    };
    let train_set = snapshots(8, 0.0);
    let test_set = snapshots(8, 0.5);

    let device = Default::default();
    let net = LinearAe::<DefaultBackend>::new(&device, rows, cols, 3);

    let config = TrainerConfig {
        lr: 2e-3,
        lr_min: 2e-4,
        smooth_phi: 5e-4,
        trainsteps: 2_000,
        test_every: 200,
        save_every: 1_000,
        log_folder: "./train_results_local".into(),
        log_base_name: "wave_ae_".to_string(),
        ..Default::default()
    };

    let mut trainer = Trainer::<DefaultBackend, _, _>::new(
        net,
        &x.view(),
        &y.view(),
        &train_set.view(),
        &test_set.view(),
        config,
        &device,
        NoopSink,
    )
    .expect("trainer construction should succeed");

    let report = trainer.train().expect("training should succeed");

    println!();
    println!(
        "trained {} steps: final loss = {:.4e}, best test error = {:.4e}",
        report.train_loss.len(),
        report.train_loss.last().map(|&(l, _)| l).unwrap_or(f32::NAN),
        report.best_error
    );
    println!("run artifacts in {}", report.run_dir.display());
}
