//! Mixture families: the density and parameter-update side of a model.
//!
//! A [`Composer`](crate::Composer) never knows which probability law sits
//! behind a cluster. It asks two questions of the family it was built with:
//!
//! - **How likely is sample i under cluster k?** ([`DensityOracle`])
//! - **Given these responsibilities, what are the new parameters?** ([`ParameterUpdater`])
//!
//! ```text
//! f(xᵢ | θ) = Σₖ pₖ fₖ(xᵢ | θₖ)
//!                    ^^^^^^^^^^^
//!                    DensityOracle::ln_component_probability(i, k) = ln fₖ(xᵢ | θₖ)
//! ```
//!
//! The family is fixed when the composer is constructed; there is no runtime
//! type inspection. Two families ship with the crate:
//!
//! | Family | Data | Parameters |
//! |--------|------|------------|
//! | [`DiagGaussian`] | real-valued, `n × d` | per-cluster means and variances |
//! | [`Categorical`] | modalities `0..L`, `n × d` | per-cluster modality probabilities |

mod categorical;
mod gaussian;

pub use categorical::{Categorical, MAX_MODALITY};
pub use gaussian::DiagGaussian;

use ndarray::{Array1, Array2};
use rand::RngCore;

/// Log-density of a sample under one cluster.
pub trait DensityOracle {
    /// Natural log of the density of sample `i` under cluster `k`.
    ///
    /// Must be finite, or `f64::NEG_INFINITY` for an impossible observation.
    /// Never NaN.
    fn ln_component_probability(&self, i: usize, k: usize) -> f64;
}

/// Re-estimation of a family's parameters from soft assignments.
pub trait ParameterUpdater {
    /// Refit the parameters in place from the responsibilities `tik` and the
    /// cluster counts `nk` (column sums of `tik`).
    ///
    /// Returns `false` on a non-recoverable numeric failure, e.g. a cluster
    /// with no weight.
    fn update(&mut self, tik: &Array2<f64>, nk: &Array1<f64>) -> bool;
}

/// A complete mixture family, pluggable into a [`Composer`](crate::Composer).
pub trait Mixture: DensityOracle + ParameterUpdater + Clone + Send + Sync {
    /// Number of samples in the data set.
    fn nb_sample(&self) -> usize;

    /// Number of clusters.
    fn nb_cluster(&self) -> usize;

    /// Number of variables per sample.
    fn nb_variable(&self) -> usize;

    /// Number of free parameters of the family (proportions excluded).
    fn nb_free_parameters(&self) -> usize;

    /// First fit of the parameters, called with uniform responsibilities.
    ///
    /// The default delegates to [`ParameterUpdater::update`].
    fn initialize(&mut self, tik: &Array2<f64>, nk: &Array1<f64>) -> bool {
        self.update(tik, nk)
    }

    /// Draw random parameters.
    fn random_init(&mut self, tik: &Array2<f64>, nk: &Array1<f64>, rng: &mut dyn RngCore);
}
