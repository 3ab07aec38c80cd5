//! Gradient-free held-out metrics.
//!
//! These helpers are generic over a plain (non-autodiff) backend and take the
//! network by `&` reference, so they cannot touch optimizer or parameter
//! state. The trainer reaches them through `AutodiffModule::valid()` and
//! `Tensor::inner()`, which is this stack's way of saying "inference mode,
//! gradients disabled".

use burn_core as burn;

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};

use crate::grid::GridOps;
use crate::loss::composite_loss;
use crate::net::FieldNet;
use crate::Result;

/// Composite loss on a held-out set, as a plain scalar.
pub fn held_out_loss<B: Backend, N: FieldNet<B>>(
    net: &N,
    ops: &GridOps<B>,
    data: Tensor<B, 4>,
    smooth_phi: f32,
) -> Result<f32> {
    let loss = composite_loss(net, ops, data, smooth_phi)?;
    Ok(loss.into_scalar().elem())
}

/// Relative reconstruction error `||data - reco||_F / ||data||_F`.
///
/// Unsquared, whole-batch. This is the human-interpretable model-quality
/// metric used for best-model selection, distinct from the training loss.
pub fn reco_error<B: Backend, N: FieldNet<B>>(net: &N, data: Tensor<B, 4>) -> f32 {
    let reco = net.reconstruct(data.clone());
    let num = (data.clone() - reco).powf_scalar(2.0).sum().sqrt();
    let den = data.powf_scalar(2.0).sum().sqrt();
    (num / den).into_scalar().elem()
}
