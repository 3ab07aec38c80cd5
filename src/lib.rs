//! # fieldae
//!
//! Autoencoder training for 2D field snapshots.
//!
//! This crate is intentionally small:
//!
//! - it implements the **training loop** and **loss construction** for
//!   autoencoder-style networks over structured 2D field data (simulation
//!   snapshots on a fixed grid),
//! - it regularizes latent fields with a physics-motivated smoothness penalty
//!   built from finite-difference operators derived from the grid geometry,
//! - it does not provide network architectures or dataset pipelines (those
//!   belong to the caller; see [`net::FieldNet`] for the call contract).
//!
//! ## Public invariants (must not change)
//!
//! - **No hidden device state**: the compute device is an explicit argument at
//!   session construction and is never captured from process-wide defaults.
//! - **One network call convention**: a network returns a
//!   [`net::FieldNetOutput`]; bottleneck and direct variants differ only in
//!   whether `code` is present. No boolean-flag call sites.
//! - **Evaluation never mutates trainable state**: held-out metrics run on the
//!   inner (non-autodiff) backend through `&` references.
//! - **Loss logs are append-only** ordered `(value, step)` sequences; the
//!   best-error record is monotonically non-increasing.
//!
//! ## Module map
//!
//! - `grid`: spacing derivation + discrete differential operators
//! - `net`: the network collaborator contract
//! - `loss`: reconstruction / smoothness / composite objectives
//! - `eval`: gradient-free held-out metrics
//! - `checkpoint`: periodic + best-so-far weight persistence
//! - `track`: observability sink (scalars + figures), no-op by default
//! - `plots`: diagnostic figure payloads (rendering is the sink's business)
//! - `snapshot`: source-tree copy into the run directory
//! - `trainer`: the iterate-evaluate-checkpoint driver

use burn_core as burn;

pub mod checkpoint;
pub mod eval;
pub mod grid;
pub mod loss;
pub mod net;
pub mod plots;
pub mod snapshot;
pub mod track;
pub mod trainer;

/// fieldae error variants.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("shape mismatch: {0}")]
    Shape(&'static str),
    #[error("domain error: {0}")]
    Domain(&'static str),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("record error: {0}")]
    Record(#[from] burn::record::RecorderError),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
