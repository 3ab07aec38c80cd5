//! Loss construction: reconstruction error, latent smoothness, composite.
//!
//! All three objectives are ratios of squared Frobenius norms, which makes
//! them invariant to a uniform rescaling of the data:
//!
//! - reconstruction: \(\|\hat q - q\|_F^2 / \|q\|_F^2\)
//! - smoothness: \(\||\nabla f|\|_F^2 / \|f\|_F^2\)
//!
//! Whether a loss is computed under gradient tracking is a type-level choice:
//! instantiate these functions with an autodiff backend to train, or with the
//! inner backend for gradient-free evaluation. There is no `grad` flag.

use burn_core as burn;

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};

use crate::grid::GridOps;
use crate::net::FieldNet;
use crate::{Error, Result};

/// Squared relative reconstruction error over the whole batch.
///
/// Exactly zero iff `q_hat == q`; strictly positive otherwise.
pub fn reconstruction_loss<B: Backend>(q_hat: Tensor<B, 4>, q: Tensor<B, 4>) -> Tensor<B, 1> {
    let num = (q_hat - q.clone()).powf_scalar(2.0).sum();
    let den = q.powf_scalar(2.0).sum();
    num / den
}

/// Squared relative gradient-magnitude norm of a `[n, 1, h, w]` field.
///
/// The field is replication-padded and convolved with the grid's `Dx`/`Dy`
/// stencils; the per-point gradient magnitude is the Euclidean norm across
/// the two directions. A field with exactly zero norm contributes a defined
/// zero loss (the derivative ratio would be 0/0 otherwise).
pub fn smoothness_loss<B: Backend>(
    ops: &GridOps<B>,
    field: Tensor<B, 4>,
) -> Result<Tensor<B, 1>> {
    let [_, channels, _, _] = field.dims();
    if channels != 1 {
        return Err(Error::Shape("smoothness fields must be [n, 1, h, w]"));
    }

    let field_norm_sq: f32 = field.clone().powf_scalar(2.0).sum().into_scalar().elem();
    if field_norm_sq == 0.0 {
        return Ok(Tensor::zeros([1], &field.device()));
    }

    let dfield_dx = ops.grad_x(field.clone());
    let dfield_dy = ops.grad_y(field.clone());
    let abs_grad = Tensor::cat(vec![dfield_dx, dfield_dy], 1)
        .powf_scalar(2.0)
        .sum_dim(1)
        .sqrt();

    let num = abs_grad.powf_scalar(2.0).sum();
    let den = field.powf_scalar(2.0).sum();
    Ok(num / den)
}

/// Composite training objective.
///
/// Reconstruction error of the network's output against the input batch, plus
/// `smooth_phi` times the smoothness of the decoder's modes (when exposed) or
/// of the latent field `phi` otherwise. A zero weight skips the smoothness
/// computation entirely.
pub fn composite_loss<B: Backend, N: FieldNet<B>>(
    net: &N,
    ops: &GridOps<B>,
    batch: Tensor<B, 4>,
    smooth_phi: f32,
) -> Result<Tensor<B, 1>> {
    let out = net.forward(batch.clone());
    let mut loss = reconstruction_loss(out.reconstruction, batch);
    if smooth_phi != 0.0 {
        let target = match net.modes() {
            Some(modes) => modes.unsqueeze_dim::<4>(1),
            None => out.phi,
        };
        loss = loss + smoothness_loss(ops, target)?.mul_scalar(smooth_phi);
    }
    Ok(loss)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::module::Module;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;
    use ndarray::Array2;
    use proptest::prelude::*;

    type B = NdArray<f32>;

    #[derive(Module, Debug, Clone)]
    struct IdentityNet;

    impl<Bk: Backend> FieldNet<Bk> for IdentityNet {
        fn forward(&self, batch: Tensor<Bk, 4>) -> crate::net::FieldNetOutput<Bk> {
            crate::net::FieldNetOutput {
                reconstruction: batch.clone(),
                phi: batch,
                code: None,
            }
        }
    }

    fn unit_grid(rows: usize, cols: usize) -> GridOps<B> {
        let x = Array2::from_shape_fn((rows, cols), |(_, j)| j as f32);
        let y = Array2::from_shape_fn((rows, cols), |(i, _)| i as f32);
        GridOps::from_coordinates(&x.view(), &y.view(), &Default::default()).expect("unit grid")
    }

    fn tensor4(values: Vec<f32>, shape: [usize; 4]) -> Tensor<B, 4> {
        Tensor::from_data(TensorData::new(values, shape), &Default::default())
    }

    fn scalar(t: Tensor<B, 1>) -> f32 {
        t.into_scalar().elem()
    }

    #[test]
    fn reconstruction_loss_is_zero_for_exact_match() {
        let q = tensor4(vec![1.0, 2.0, 3.0, 4.0], [1, 1, 2, 2]);
        assert_eq!(scalar(reconstruction_loss(q.clone(), q)), 0.0);
    }

    #[test]
    fn reconstruction_loss_is_positive_for_any_mismatch() {
        let q = tensor4(vec![1.0, 2.0, 3.0, 4.0], [1, 1, 2, 2]);
        let q_hat = tensor4(vec![1.0, 2.0, 3.0, 4.5], [1, 1, 2, 2]);
        assert!(scalar(reconstruction_loss(q_hat, q)) > 0.0);
    }

    #[test]
    fn smoothness_loss_of_constant_field_is_zero() {
        let ops = unit_grid(6, 6);
        let field = tensor4(vec![2.5; 36], [1, 1, 6, 6]);
        assert_eq!(scalar(smoothness_loss(&ops, field).unwrap()), 0.0);
    }

    #[test]
    fn smoothness_loss_of_zero_field_is_the_sentinel_zero() {
        let ops = unit_grid(4, 4);
        let field = tensor4(vec![0.0; 16], [1, 1, 4, 4]);
        assert_eq!(scalar(smoothness_loss(&ops, field).unwrap()), 0.0);
    }

    #[test]
    fn smoothness_loss_rejects_multichannel_fields() {
        let ops = unit_grid(4, 4);
        let field = tensor4(vec![1.0; 32], [1, 2, 4, 4]);
        assert!(smoothness_loss(&ops, field).is_err());
    }

    #[test]
    fn smoothness_loss_of_a_ramp_matches_hand_computation() {
        // f[i, j] = i on a 3x3 unit grid. Row-axis differences are 1 except
        // on the replicated top row; column-axis differences are all 0.
        // Gradient magnitude squared sums to 6, field norm squared to 15.
        let ops = unit_grid(3, 3);
        let field = tensor4(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0], [1, 1, 3, 3]);
        let got = scalar(smoothness_loss(&ops, field).unwrap());
        assert!((got - 6.0 / 15.0).abs() <= 1e-6, "got {got}");
    }

    #[test]
    fn composite_loss_of_identity_net_is_zero_for_any_weight() {
        let ops = unit_grid(5, 5);
        let batch = tensor4(vec![1.0; 2 * 25], [2, 1, 5, 5]);
        for weight in [0.0f32, 5e-4, 0.5, 10.0] {
            let loss = composite_loss(&IdentityNet, &ops, batch.clone(), weight).unwrap();
            assert_eq!(scalar(loss), 0.0, "weight {weight}");
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            .. ProptestConfig::default()
        })]
        #[test]
        fn prop_reconstruction_loss_is_scale_invariant(
            q in prop::collection::vec(-10.0f32..10.0f32, 16),
            q_hat in prop::collection::vec(-10.0f32..10.0f32, 16),
            scale in prop_oneof![0.05f32..20.0f32, -20.0f32..-0.05f32],
        ) {
            prop_assume!(q.iter().any(|&v| v != 0.0));

            let qt = tensor4(q.clone(), [1, 1, 4, 4]);
            let qh = tensor4(q_hat.clone(), [1, 1, 4, 4]);
            let qt_s = tensor4(q.iter().map(|v| v * scale).collect(), [1, 1, 4, 4]);
            let qh_s = tensor4(q_hat.iter().map(|v| v * scale).collect(), [1, 1, 4, 4]);

            let base = scalar(reconstruction_loss(qh, qt));
            let scaled = scalar(reconstruction_loss(qh_s, qt_s));

            let tol = 1e-4 * (1.0 + base.abs());
            prop_assert!(
                (base - scaled).abs() <= tol,
                "scale invariance violated: base={base} scaled={scaled}"
            );
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            .. ProptestConfig::default()
        })]
        #[test]
        fn prop_losses_are_nonnegative(
            q in prop::collection::vec(-5.0f32..5.0f32, 16),
            q_hat in prop::collection::vec(-5.0f32..5.0f32, 16),
        ) {
            prop_assume!(q.iter().any(|&v| v != 0.0));

            let ops = unit_grid(4, 4);
            let reco = scalar(reconstruction_loss(
                tensor4(q_hat, [1, 1, 4, 4]),
                tensor4(q.clone(), [1, 1, 4, 4]),
            ));
            let smooth = scalar(smoothness_loss(&ops, tensor4(q, [1, 1, 4, 4])).unwrap());
            prop_assert!(reco >= 0.0);
            prop_assert!(smooth >= 0.0);
        }
    }
}
