//! Categorical mixture family.
//!
//! Every variable takes a modality in `0..L`. Each cluster carries a single
//! probability vector over the modalities, shared by all variables:
//!
//! ```text
//! fₖ(x) = Πⱼ pₖ[xʲ]
//! ```
//!
//! A modality with zero probability under a cluster makes the sample
//! impossible there: the log-density is `-inf`, never NaN.

use std::sync::Arc;

use super::{DensityOracle, Mixture, ParameterUpdater};
use crate::error::{Error, Result};
use ndarray::{Array1, Array2};
use rand::{Rng, RngCore};
use rand_distr::Exp1;

/// Categorical family with cluster-specific modality probabilities.
/// Modalities must lie in `0..MAX_MODALITY`.
pub const MAX_MODALITY: usize = 1 << 16;

#[derive(Debug, Clone)]
pub struct Categorical {
    data: Arc<Array2<usize>>,
    nb_cluster: usize,
    nb_modality: usize,
    /// `K × L`, each row sums to 1.
    proba: Array2<f64>,
}

impl Categorical {
    /// Create the family over an `n × d` matrix of modalities.
    ///
    /// The number of modalities is one more than the largest value observed.
    pub fn new(data: Array2<usize>, nb_cluster: usize) -> Result<Self> {
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
        let max = data.iter().copied().max().unwrap_or(0);
        if max >= MAX_MODALITY {
            return Err(Error::InvalidParameter {
                name: "data",
                message: "modality out of range",
            });
        }
        let nb_modality = max + 1;
        Ok(Self {
            data: Arc::new(data),
            nb_cluster,
            nb_modality,
            proba: Array2::from_elem((nb_cluster, nb_modality), 1.0 / nb_modality as f64),
        })
    }

    /// Modality probabilities, `K × L`.
    pub fn proba(&self) -> &Array2<f64> {
        &self.proba
    }

    /// Number of modalities `L`.
    pub fn nb_modality(&self) -> usize {
        self.nb_modality
    }
}

impl DensityOracle for Categorical {
    fn ln_component_probability(&self, i: usize, k: usize) -> f64 {
        let mut sum = 0.0;
        for &l in self.data.row(i) {
            let prob = self.proba[[k, l]];
            if prob <= 0.0 {
                return f64::NEG_INFINITY;
            }
            sum += prob.ln();
        }
        sum
    }
}

impl ParameterUpdater for Categorical {
    fn update(&mut self, tik: &Array2<f64>, _nk: &Array1<f64>) -> bool {
        for k in 0..self.nb_cluster {
            let mut row = self.proba.row_mut(k);
            row.fill(0.0);
            for (i, sample) in self.data.rows().into_iter().enumerate() {
                let t = tik[[i, k]];
                for &l in sample {
                    row[l] += t;
                }
            }
            let sum = row.sum();
            if !(sum > 0.0) {
                return false;
            }
            row /= sum;
        }
        true
    }
}

impl Mixture for Categorical {
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
        self.nb_cluster * (self.nb_modality - 1)
    }

    /// Probability vectors drawn uniformly on the simplex.
    fn random_init(&mut self, _tik: &Array2<f64>, _nk: &Array1<f64>, rng: &mut dyn RngCore) {
        for mut row in self.proba.rows_mut() {
            row.mapv_inplace(|_| rng.sample::<f64, _>(Exp1));
            let sum = row.sum();
            row /= sum;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Axis};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_rejects_huge_modality() {
        let data = array![[0, 1], [usize::MAX, 0]];
        let err = Categorical::new(data, 1).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "data", .. }));

        let data = array![[0, MAX_MODALITY - 1], [1, 0]];
        assert_eq!(Categorical::new(data, 1).unwrap().nb_modality(), MAX_MODALITY);
    }

    #[test]
    fn test_zero_probability_is_neg_infinity() {
        let data = array![[0, 1], [2, 2]];
        let mut c = Categorical::new(data, 2).unwrap();
        let tik = array![[1.0, 0.0], [0.0, 1.0]];
        let nk = tik.sum_axis(Axis(0));
        assert!(c.update(&tik, &nk));

        // cluster 0 only saw modalities 0 and 1
        assert_eq!(c.ln_component_probability(1, 0), f64::NEG_INFINITY);
        assert!((c.ln_component_probability(1, 1) - 0.0).abs() < 1e-12);
        assert!((c.ln_component_probability(0, 0) - 2.0 * 0.5f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_update_fails_without_weight() {
        let data = array![[0], [1], [1]];
        let mut c = Categorical::new(data, 2).unwrap();
        let tik = array![[1.0, 0.0], [1.0, 0.0], [1.0, 0.0]];
        let nk = tik.sum_axis(Axis(0));
        assert!(!c.update(&tik, &nk));
    }

    #[test]
    fn test_random_init_rows_on_simplex() {
        let data = array![[0, 3], [1, 2], [2, 1]];
        let mut c = Categorical::new(data, 3).unwrap();
        let tik = Array2::from_elem((3, 3), 1.0 / 3.0);
        let nk = tik.sum_axis(Axis(0));
        let mut rng = StdRng::seed_from_u64(11);
        c.random_init(&tik, &nk, &mut rng);
        for row in c.proba().rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
            assert!(row.iter().all(|&p| p >= 0.0));
        }
        assert_eq!(c.nb_modality(), 4);
        assert_eq!(c.nb_free_parameters(), 9);
    }
}
