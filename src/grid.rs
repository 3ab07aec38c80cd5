//! Grid geometry and discrete differential operators.
//!
//! A structured mesh is given as two same-shape 2D coordinate arrays `X`, `Y`
//! (axis-aligned, uniform spacing along each axis). From those we derive the
//! scalar spacings `dx`, `dy` and build 2-tap convolution stencils that
//! approximate first-order spatial derivatives:
//!
//! \[
//! \partial_x f \approx \frac{f_i - f_{i-1}}{\Delta x}
//! \]
//!
//! Fields are replication-padded by one cell on the leading edge of the
//! differentiated axis, so the derivative map has the same spatial size as the
//! input and the boundary row/column carries a zero derivative.
//!
//! The operators are constructed once per session and are immutable.

use burn_core as burn;

use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::module::conv2d;
use burn::tensor::ops::ConvOptions;
use burn::tensor::{Tensor, TensorData};
use ndarray::ArrayView2;

use crate::{Error, Result};

/// Differential operators derived from a coordinate grid.
#[derive(Debug, Clone)]
pub struct GridOps<B: Backend> {
    dx: f32,
    dy: f32,
    /// 2-tap stencil `[-1/dx, 1/dx]` of shape `[1, 1, 2, 1]`.
    dx_kernel: Tensor<B, 4>,
    /// 2-tap stencil `[-1/dy, 1/dy]` of shape `[1, 1, 1, 2]`.
    dy_kernel: Tensor<B, 4>,
    shape: (usize, usize),
}

/// Uniform spacing from the first two distinct neighboring values.
///
/// `primary` is tried first; a degenerate (zero) primary falls back to the
/// other sweep direction. This tolerates coordinate arrays organized as
/// either row-major or column-major spatial sweeps.
fn spacing(primary: f32, fallback: f32) -> Result<f32> {
    let d = if primary != 0.0 { primary } else { fallback };
    if d == 0.0 || !d.is_finite() {
        return Err(Error::Domain(
            "degenerate grid: both candidate spacings are zero or non-finite",
        ));
    }
    Ok(d)
}

impl<B: Backend> GridOps<B> {
    /// Build the operators from coordinate arrays `x`, `y` on `device`.
    ///
    /// Both arrays must have the same shape, at least 2x2.
    pub fn from_coordinates(
        x: &ArrayView2<f32>,
        y: &ArrayView2<f32>,
        device: &B::Device,
    ) -> Result<Self> {
        if x.dim() != y.dim() {
            return Err(Error::Shape("x and y must have the same shape"));
        }
        let (rows, cols) = x.dim();
        if rows < 2 || cols < 2 {
            return Err(Error::Domain("coordinate arrays must be at least 2x2"));
        }

        let dx = spacing(x[[0, 1]] - x[[0, 0]], x[[1, 0]] - x[[0, 0]])?;
        let dy = spacing(y[[1, 0]] - y[[0, 0]], y[[0, 1]] - y[[0, 0]])?;

        let dx_kernel = Tensor::from_data(
            TensorData::new(vec![-1.0 / dx, 1.0 / dx], [1, 1, 2, 1]),
            device,
        );
        let dy_kernel = Tensor::from_data(
            TensorData::new(vec![-1.0 / dy, 1.0 / dy], [1, 1, 1, 2]),
            device,
        );

        Ok(Self {
            dx,
            dy,
            dx_kernel,
            dy_kernel,
            shape: (rows, cols),
        })
    }

    pub fn dx(&self) -> f32 {
        self.dx
    }

    pub fn dy(&self) -> f32 {
        self.dy
    }

    /// Spatial shape `(rows, cols)` of the coordinate arrays.
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// First-order derivative along the row axis of a `[n, 1, h, w]` field.
    ///
    /// Output spatial size matches the input; row 0 has zero derivative from
    /// the replicated edge.
    pub fn grad_x(&self, field: Tensor<B, 4>) -> Tensor<B, 4> {
        let edge = field.clone().narrow(2, 0, 1);
        let padded = Tensor::cat(vec![edge, field], 2);
        conv2d(
            padded,
            self.dx_kernel.clone(),
            None,
            ConvOptions::new([1, 1], [0, 0], [1, 1], 1),
        )
    }

    /// First-order derivative along the column axis of a `[n, 1, h, w]` field.
    pub fn grad_y(&self, field: Tensor<B, 4>) -> Tensor<B, 4> {
        let edge = field.clone().narrow(3, 0, 1);
        let padded = Tensor::cat(vec![edge, field], 3);
        conv2d(
            padded,
            self.dy_kernel.clone(),
            None,
            ConvOptions::new([1, 1], [0, 0], [1, 1], 1),
        )
    }
}

impl<B: AutodiffBackend> GridOps<B> {
    /// The same operators on the inner backend, for gradient-free evaluation.
    pub fn valid(&self) -> GridOps<B::InnerBackend> {
        GridOps {
            dx: self.dx,
            dy: self.dy,
            dx_kernel: self.dx_kernel.clone().inner(),
            dy_kernel: self.dy_kernel.clone().inner(),
            shape: self.shape,
        }
    }
}
