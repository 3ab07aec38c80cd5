//! Diagnostic figure payloads.
//!
//! A [`Figure`] is data, not pixels: a list of titled 2D panels extracted
//! from the network's current state. How (or whether) a panel is rendered is
//! entirely up to the [`crate::track::MetricSink`] it is forwarded to.

use burn_core as burn;

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use ndarray::Array2;

use crate::net::FieldNet;

/// One titled 2D panel.
#[derive(Debug, Clone)]
pub struct Panel {
    pub title: String,
    pub data: Array2<f32>,
}

/// An ordered set of panels forming one diagnostic figure.
#[derive(Debug, Clone)]
pub struct Figure {
    pub panels: Vec<Panel>,
}

fn to_host<B: Backend>(t: Tensor<B, 2>) -> Array2<f32> {
    let [h, w] = t.dims();
    let values = t.into_data().to_vec::<f32>().expect("panel to_vec");
    Array2::from_shape_vec((h, w), values).expect("panel shape")
}

/// First channel of the `idx`-th sample as a host array.
fn sample_slice<B: Backend>(t: &Tensor<B, 4>, idx: usize) -> Array2<f32> {
    let [_, _, h, w] = t.dims();
    to_host(t.clone().narrow(0, idx, 1).narrow(1, 0, 1).reshape([h, w]))
}

/// Reconstruction panel: `phi`, `q_hat`, `q`, `|q_hat - q|` for one sample.
pub fn reconstruction_figure<B: Backend, N: FieldNet<B>>(
    net: &N,
    truth: Tensor<B, 4>,
) -> Figure {
    let out = net.forward(truth.clone());
    let residual = (out.reconstruction.clone() - truth.clone()).abs();
    Figure {
        panels: vec![
            Panel {
                title: "phi".into(),
                data: sample_slice(&out.phi, 0),
            },
            Panel {
                title: "q_hat".into(),
                data: sample_slice(&out.reconstruction, 0),
            },
            Panel {
                title: "q".into(),
                data: sample_slice(&truth, 0),
            },
            Panel {
                title: "|q_hat - q|".into(),
                data: sample_slice(&residual, 0),
            },
        ],
    }
}

/// One panel per decoder mode; `None` when the network exposes none.
pub fn modes_figure<B: Backend, N: FieldNet<B>>(net: &N) -> Option<Figure> {
    let modes = net.modes()?;
    let [k, h, w] = modes.dims();
    let panels = (0..k)
        .map(|n| Panel {
            title: format!("mode {n}"),
            data: to_host(modes.clone().narrow(0, n, 1).reshape([h, w])),
        })
        .collect();
    Some(Figure { panels })
}

/// Latent code trajectories `[n_samples, k]` over a dataset; `None` for
/// networks without a bottleneck.
pub fn latents_figure<B: Backend, N: FieldNet<B>>(
    net: &N,
    data: Tensor<B, 4>,
) -> Option<Figure> {
    let code = net.forward(data).code?;
    Some(Figure {
        panels: vec![Panel {
            title: "code".into(),
            data: to_host(code),
        }],
    })
}
