//! The network collaborator contract.
//!
//! The architecture itself (encoder, decoder, bottleneck, mode extraction) is
//! external. This module pins down the one call convention the training loop
//! relies on:
//!
//! - a forward pass over a `[batch, channels, h, w]` batch yields a
//!   [`FieldNetOutput`]: the reconstruction, the latent field `phi`, and the
//!   low-dimensional `code` when the architecture has a bottleneck,
//! - mode extraction is a declared capability (`modes` returns `None` when the
//!   decoder has no named spatial basis fields), not a probed attribute.
//!
//! Weight persistence is not part of this trait: every `Module` already
//! persists through burn records, and file naming belongs to the checkpoint
//! component.

use burn_core as burn;

use burn::module::Module;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Everything a forward pass produces.
#[derive(Debug, Clone)]
pub struct FieldNetOutput<B: Backend> {
    /// Reconstructed batch, same shape as the input.
    pub reconstruction: Tensor<B, 4>,
    /// Intermediate latent field, spatially structured (not a flat vector).
    pub phi: Tensor<B, 4>,
    /// Compact code `[batch, k]`; present only for bottleneck architectures.
    pub code: Option<Tensor<B, 2>>,
}

/// An autoencoder-style network over 2D field batches.
pub trait FieldNet<B: Backend>: Module<B> {
    /// Full forward pass.
    fn forward(&self, batch: Tensor<B, 4>) -> FieldNetOutput<B>;

    /// Default call: reconstruction only.
    fn reconstruct(&self, batch: Tensor<B, 4>) -> Tensor<B, 4> {
        self.forward(batch).reconstruction
    }

    /// Named spatial basis fields `[k, h, w]` extracted from the decoder, if
    /// the architecture exposes them. Used as the smoothness target when
    /// present.
    fn modes(&self) -> Option<Tensor<B, 3>> {
        None
    }
}
