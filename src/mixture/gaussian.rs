//! Diagonal Gaussian mixture family.
//!
//! Each cluster has its own mean and its own variance per variable:
//!
//! ```text
//! fₖ(x) = Πⱼ N(xʲ | μₖⱼ, σ²ₖⱼ)
//! ```
//!
//! **M-step** (weighted moments):
//! - μₖⱼ = Σᵢ tᵢₖ xᵢⱼ / nₖ
//! - σ²ₖⱼ = max(Σᵢ tᵢₖ (xᵢⱼ - μₖⱼ)² / nₖ, reg_var)
//!
//! The variance floor keeps a cluster sitting on a single point from
//! producing an infinite density.

use std::sync::Arc;

use super::{DensityOracle, Mixture, ParameterUpdater};
use crate::error::{Error, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::{Rng, RngCore};

/// Diagonal Gaussian family with cluster-specific variances.
#[derive(Debug, Clone)]
pub struct DiagGaussian {
    data: Arc<Array2<f64>>,
    nb_cluster: usize,
    mean: Array2<f64>,
    var: Array2<f64>,
    /// Lower bound on every variance.
    reg_var: f64,
}

impl DiagGaussian {
    /// Create the family over an `n × d` data matrix.
    pub fn new(data: Array2<f64>, nb_cluster: usize) -> Result<Self> {
        let (n, d) = data.dim();
        if n == 0 || d == 0 {
            return Err(Error::EmptyInput);
        }
        if nb_cluster == 0 {
            return Err(Error::InvalidParameter {
                name: "nb_cluster",
                message: "must be > 0",
            });
        }
        if nb_cluster > n {
            return Err(Error::InvalidClusterCount {
                requested: nb_cluster,
                n_items: n,
            });
        }
        if data.iter().any(|x| !x.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "data",
                message: "must be finite",
            });
        }
        Ok(Self {
            data: Arc::new(data),
            nb_cluster,
            mean: Array2::zeros((nb_cluster, d)),
            var: Array2::ones((nb_cluster, d)),
            reg_var: 1e-6,
        })
    }

    /// Create the family from row vectors.
    pub fn from_rows(data: &[Vec<f64>], nb_cluster: usize) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::EmptyInput);
        }
        let n = data.len();
        let d = data[0].len();
        let mut flat: Vec<f64> = Vec::with_capacity(n * d);
        for point in data {
            if point.len() != d {
                return Err(Error::DimensionMismatch {
                    expected: d,
                    found: point.len(),
                });
            }
            flat.extend(point);
        }
        let arr = Array2::from_shape_vec((n, d), flat).map_err(|e| Error::Other(e.to_string()))?;
        Self::new(arr, nb_cluster)
    }

    /// Set the variance floor.
    pub fn with_reg_var(mut self, reg_var: f64) -> Self {
        self.reg_var = reg_var;
        self
    }

    /// Cluster means, `K × d`.
    pub fn means(&self) -> &Array2<f64> {
        &self.mean
    }

    /// Cluster variances, `K × d`.
    pub fn variances(&self) -> &Array2<f64> {
        &self.var
    }

    /// The data the family was built on.
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    fn log_gaussian(
        point: &ArrayView1<'_, f64>,
        mean: &ArrayView1<'_, f64>,
        var: &ArrayView1<'_, f64>,
    ) -> f64 {
        let d = point.len() as f64;
        let mut log_prob = -0.5 * d * (2.0 * std::f64::consts::PI).ln();

        for j in 0..point.len() {
            let diff = point[j] - mean[j];
            log_prob -= 0.5 * var[j].ln();
            log_prob -= 0.5 * diff * diff / var[j];
        }

        log_prob
    }
}

impl DensityOracle for DiagGaussian {
    fn ln_component_probability(&self, i: usize, k: usize) -> f64 {
        Self::log_gaussian(&self.data.row(i), &self.mean.row(k), &self.var.row(k))
    }
}

impl ParameterUpdater for DiagGaussian {
    fn update(&mut self, tik: &Array2<f64>, nk: &Array1<f64>) -> bool {
        let d = self.data.ncols();
        for k in 0..self.nb_cluster {
            let weight = nk[k];
            if !(weight > 0.0) {
                return false;
            }
            let col = tik.column(k);

            let mut mean = Array1::<f64>::zeros(d);
            for (t, x) in col.iter().zip(self.data.axis_iter(Axis(0))) {
                mean.scaled_add(*t, &x);
            }
            mean /= weight;

            let mut var = Array1::<f64>::zeros(d);
            for (t, x) in col.iter().zip(self.data.axis_iter(Axis(0))) {
                for j in 0..d {
                    let diff = x[j] - mean[j];
                    var[j] += t * diff * diff;
                }
            }
            var.mapv_inplace(|v| (v / weight).max(self.reg_var));

            self.mean.row_mut(k).assign(&mean);
            self.var.row_mut(k).assign(&var);
        }
        true
    }
}

impl Mixture for DiagGaussian {
    fn nb_sample(&self) -> usize {
        self.data.nrows()
    }

    fn nb_cluster(&self) -> usize {
        self.nb_cluster
    }

    fn nb_variable(&self) -> usize {
        self.data.ncols()
    }

    fn nb_free_parameters(&self) -> usize {
        2 * self.nb_cluster * self.data.ncols()
    }

    /// Centers drawn among the samples, variances set to the overall variance.
    fn random_init(&mut self, _tik: &Array2<f64>, _nk: &Array1<f64>, rng: &mut dyn RngCore) {
        let n = self.data.nrows();
        let overall = self.data.var_axis(Axis(0), 0.0).mapv(|v| v.max(self.reg_var));
        for k in 0..self.nb_cluster {
            let idx = rng.random_range(0..n);
            self.mean.row_mut(k).assign(&self.data.row(idx));
            self.var.row_mut(k).assign(&overall);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_update_weighted_moments() {
        let data = array![[0.0], [2.0], [10.0], [12.0]];
        let mut g = DiagGaussian::new(data, 2).unwrap();
        let tik = array![[1.0, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 1.0]];
        let nk = tik.sum_axis(Axis(0));

        assert!(g.update(&tik, &nk));
        assert!((g.means()[[0, 0]] - 1.0).abs() < 1e-12);
        assert!((g.means()[[1, 0]] - 11.0).abs() < 1e-12);
        assert!((g.variances()[[0, 0]] - 1.0).abs() < 1e-12);
        assert!((g.variances()[[1, 0]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_update_fails_on_empty_cluster() {
        let data = array![[0.0], [1.0], [2.0]];
        let mut g = DiagGaussian::new(data, 2).unwrap();
        let tik = array![[1.0, 0.0], [1.0, 0.0], [1.0, 0.0]];
        let nk = tik.sum_axis(Axis(0));
        assert!(!g.update(&tik, &nk));
    }

    #[test]
    fn test_variance_floor() {
        let data = array![[3.0], [3.0], [3.0], [3.0]];
        let mut g = DiagGaussian::new(data, 1).unwrap().with_reg_var(1e-4);
        let tik = Array2::ones((4, 1));
        let nk = tik.sum_axis(Axis(0));
        assert!(g.update(&tik, &nk));
        assert_eq!(g.variances()[[0, 0]], 1e-4);
        assert!(g.ln_component_probability(0, 0).is_finite());
    }

    #[test]
    fn test_log_density_standard_normal() {
        let data = array![[0.0]];
        let g = DiagGaussian::new(data, 1).unwrap();
        // mean 0, variance 1 at construction
        let expected = -0.5 * (2.0 * std::f64::consts::PI).ln();
        assert!((g.ln_component_probability(0, 0) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_random_init_picks_samples() {
        let data = array![[0.0, 1.0], [5.0, 6.0], [9.0, 9.0]];
        let mut g = DiagGaussian::new(data.clone(), 2).unwrap();
        let tik = Array2::from_elem((3, 2), 0.5);
        let nk = tik.sum_axis(Axis(0));
        let mut rng = StdRng::seed_from_u64(7);
        g.random_init(&tik, &nk, &mut rng);
        for k in 0..2 {
            let m = g.means().row(k);
            assert!(data.axis_iter(Axis(0)).any(|row| row == m));
        }
    }

    #[test]
    fn test_invalid_construction() {
        assert!(DiagGaussian::from_rows(&[], 2).is_err());
        assert!(DiagGaussian::from_rows(&[vec![1.0], vec![1.0, 2.0]], 1).is_err());
        assert!(DiagGaussian::from_rows(&[vec![1.0]], 2).is_err());
        assert!(DiagGaussian::from_rows(&[vec![f64::NAN]], 1).is_err());
    }
}
