//! The mixture composer: responsibilities, labels, proportions and the
//! atomic steps of one EM-family iteration.
//!
//! # State
//!
//! | Field | Shape | Meaning |
//! |-------|-------|---------|
//! | `tik` | `n × K` | responsibilities, each row a distribution over clusters |
//! | `zi`  | `n` | hard label of each sample |
//! | `pk`  | `K` | mixture proportions, sum to 1 |
//! | `nk`  | `K` | column sums of `tik`, sum to `n` |
//!
//! # Steps
//!
//! - **E-step**: `tᵢₖ ∝ pₖ fₖ(xᵢ)`, evaluated in log space with the
//!   log-sum-exp trick; also sets `zᵢ = argmaxₖ tᵢₖ`.
//! - **MAP step**: `zᵢ = argmaxₖ tᵢₖ`, without touching `tik`.
//! - **C-step**: `tik` rows become one-hot at `zᵢ` (Classification EM).
//! - **S-step**: `zᵢ ~ Categorical(tᵢ·)`, then a C-step (Stochastic EM).
//! - **P-step**: `pₖ = mean of column k`.
//! - **Parameter update**: P-step, then the family refits itself.
//!
//! # Lifecycle
//!
//! ```text
//! Created ──initialize_step──▶ Initialized ──random_*_init──▶ ParamInitialized
//!                                   ▲                               │
//!                                   └───────── failed draw ─────────┘
//!
//! ParamInitialized ──finalize_step──▶ Finalized
//! any state ──reset──▶ Created, any state ──initialize_step──▶ Initialized
//! ```
//!
//! Structural failures (a random draw leaving a cluster with fewer than two
//! members, a family refusing to update) are returned as errors; the caller
//! decides whether to retry. A rejected draw leaves the composer on the
//! uniform model of `Initialized`, never on the draw itself.

use crate::error::{Error, Result};
use crate::mixture::{DensityOracle, Mixture};
use ndarray::{Array1, Array2, ArrayViewMut1, Axis};
use rand::{Rng, RngCore};
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Smallest cluster count accepted after a random initialization or a
/// classification step.
pub const MIN_CLUSTER_SIZE: f64 = 2.0;

/// Lifecycle of a [`Composer`]. Ordered: later states compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModelState {
    /// Freshly constructed, nothing computed.
    Created,
    /// Uniform responsibilities and proportions, family fitted to them.
    Initialized,
    /// Parameters drawn by an initializer; ready for an algorithm.
    ParamInitialized,
    /// Estimation done, likelihood recomputed.
    Finalized,
}

/// Owns the responsibility matrix, labels, proportions and cluster counts of
/// one candidate model, and delegates densities and parameter updates to its
/// mixture family.
#[derive(Debug, Clone)]
pub struct Composer<M> {
    mixture: M,
    tik: Array2<f64>,
    zi: Vec<usize>,
    pk: Array1<f64>,
    nk: Array1<f64>,
    state: ModelState,
    ln_likelihood: f64,
    nb_free_parameter: usize,
    nb_variable: usize,
}

impl<M: Mixture> Composer<M> {
    /// Wrap a mixture family. The composer starts in [`ModelState::Created`]
    /// with the minimal (unestimated) likelihood.
    pub fn new(mixture: M) -> Result<Self> {
        let n = mixture.nb_sample();
        let k = mixture.nb_cluster();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        if k == 0 {
            return Err(Error::InvalidParameter {
                name: "nb_cluster",
                message: "must be > 0",
            });
        }
        if k > n {
            return Err(Error::InvalidClusterCount {
                requested: k,
                n_items: n,
            });
        }
        Ok(Self::blank(mixture))
    }

    fn blank(mixture: M) -> Self {
        let n = mixture.nb_sample();
        let k = mixture.nb_cluster();
        Self {
            mixture,
            tik: Array2::zeros((n, k)),
            zi: vec![0; n],
            pk: Array1::zeros(k),
            nk: Array1::zeros(k),
            state: ModelState::Created,
            ln_likelihood: f64::MIN,
            nb_free_parameter: 0,
            nb_variable: 0,
        }
    }

    /// A fresh composer over the same family (data shared, parameters copied),
    /// in state [`ModelState::Created`].
    pub fn create(&self) -> Self {
        Self::blank(self.mixture.clone())
    }

    /// Discard any estimation and return to [`ModelState::Created`] with the
    /// minimal likelihood. Storage is kept.
    pub fn reset(&mut self) {
        self.tik.fill(0.0);
        self.zi.fill(0);
        self.pk.fill(0.0);
        self.nk.fill(0.0);
        self.state = ModelState::Created;
        self.ln_likelihood = f64::MIN;
    }

    /// Uniform proportions and responsibilities, first fit of the family,
    /// likelihood of that uniform model. Advances to [`ModelState::Initialized`].
    pub fn initialize_step(&mut self) {
        let k = self.nb_cluster() as f64;
        self.pk.fill(1.0 / k);
        self.tik.fill(1.0 / k);
        self.nk = self.tik.sum_axis(Axis(0));
        if !self.mixture.initialize(&self.tik, &self.nk) {
            debug!("mixture initialization refused uniform responsibilities, keeping defaults");
        }
        self.map_step();
        self.p_step();
        self.ln_likelihood = self.compute_ln_likelihood();
        self.nb_free_parameter = (self.nb_cluster() - 1) + self.mixture.nb_free_parameters();
        self.nb_variable = self.mixture.nb_variable();
        self.state = ModelState::Initialized;
    }

    /// E-step for sample `i`. Returns the sample's log-likelihood contribution.
    ///
    /// `nk` and the stored likelihood are not updated.
    pub fn e_step_at(&mut self, i: usize) -> f64 {
        let ln_pk = self.ln_pk();
        let (k, ll) = e_step_row(&self.mixture, &ln_pk, &self.pk, i, self.tik.row_mut(i));
        self.zi[i] = k;
        ll
    }

    /// E-step over all samples. Updates `tik`, `zi`, `nk` and the stored
    /// log-likelihood; returns the smallest cluster count.
    pub fn e_step(&mut self) -> f64 {
        let ln_pk = self.ln_pk();
        let pk = &self.pk;
        let mixture = &self.mixture;

        #[cfg(feature = "parallel")]
        let sum: f64 = self
            .tik
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .zip(self.zi.par_iter_mut())
            .enumerate()
            .map(|(i, (row, z))| {
                let (k, ll) = e_step_row(mixture, &ln_pk, pk, i, row);
                *z = k;
                ll
            })
            .sum();

        #[cfg(not(feature = "parallel"))]
        let sum: f64 = self
            .tik
            .axis_iter_mut(Axis(0))
            .zip(self.zi.iter_mut())
            .enumerate()
            .map(|(i, (row, z))| {
                let (k, ll) = e_step_row(mixture, &ln_pk, pk, i, row);
                *z = k;
                ll
            })
            .sum();

        self.ln_likelihood = sum;
        self.nk = self.tik.sum_axis(Axis(0));
        min_elt(&self.nk)
    }

    /// Set `zᵢ` to the argmax of row `i` of `tik`.
    pub fn map_step_at(&mut self, i: usize) {
        self.zi[i] = argmax(self.tik.row(i).iter().copied());
    }

    /// MAP labels for all samples.
    pub fn map_step(&mut self) {
        for i in 0..self.zi.len() {
            self.map_step_at(i);
        }
    }

    /// Replace row `i` of `tik` by the indicator of `zᵢ`.
    pub fn c_step_at(&mut self, i: usize) {
        let mut row = self.tik.row_mut(i);
        row.fill(0.0);
        row[self.zi[i]] = 1.0;
    }

    /// Classification step over all samples. Recomputes `nk` and returns the
    /// smallest cluster count.
    pub fn c_step(&mut self) -> f64 {
        for i in 0..self.zi.len() {
            self.c_step_at(i);
        }
        self.nk = self.tik.sum_axis(Axis(0));
        min_elt(&self.nk)
    }

    /// Draw `zᵢ` from the categorical distribution given by row `i` of `tik`.
    pub fn s_step_at(&mut self, i: usize, rng: &mut dyn RngCore) {
        let row = self.tik.row(i);
        let threshold = rng.random::<f64>() * row.sum();
        let mut cumsum = 0.0;
        let mut selected = None;
        for (k, &t) in row.iter().enumerate() {
            if t <= 0.0 {
                continue;
            }
            cumsum += t;
            selected = Some(k);
            if cumsum > threshold {
                break;
            }
        }
        if let Some(k) = selected {
            self.zi[i] = k;
        }
    }

    /// Stochastic step: sample every label, then a C-step. Returns the
    /// smallest cluster count.
    pub fn s_step(&mut self, rng: &mut dyn RngCore) -> f64 {
        for i in 0..self.zi.len() {
            self.s_step_at(i, rng);
        }
        self.c_step()
    }

    /// Maximum-likelihood proportions: column means of `tik`.
    pub fn p_step(&mut self) {
        if let Some(mean) = self.tik.mean_axis(Axis(0)) {
            self.pk = mean;
        }
    }

    /// P-step, then refit the family from the current `tik` and `nk`.
    pub fn param_update_step(&mut self) -> Result<()> {
        self.p_step();
        if self.mixture.update(&self.tik, &self.nk) {
            Ok(())
        } else {
            Err(Error::ParameterUpdateFailed)
        }
    }

    /// Uniformly random labels, one C-step, then parameter update and E-step.
    ///
    /// On failure the composer falls back to the uniform model of
    /// [`ModelState::Initialized`].
    pub fn random_class_init(&mut self, rng: &mut dyn RngCore) -> Result<()> {
        let drawn = self.draw_class(rng);
        self.settle_init(drawn)
    }

    /// Random responsibilities (uniform noise weighted by `pk`), MAP labels,
    /// then parameter update and E-step.
    ///
    /// On failure the composer falls back to the uniform model of
    /// [`ModelState::Initialized`].
    pub fn random_fuzzy_init(&mut self, rng: &mut dyn RngCore) -> Result<()> {
        let drawn = self.draw_fuzzy(rng);
        self.settle_init(drawn)
    }

    /// Random parameters drawn by the family, then an E-step.
    ///
    /// On failure the composer falls back to the uniform model of
    /// [`ModelState::Initialized`].
    pub fn random_param_init(&mut self, rng: &mut dyn RngCore) -> Result<()> {
        let drawn = self.draw_param(rng);
        self.settle_init(drawn)
    }

    fn draw_class(&mut self, rng: &mut dyn RngCore) -> Result<()> {
        if self.state < ModelState::Initialized {
            self.initialize_step();
        }
        let min_count = self.random_zi(rng);
        if min_count < MIN_CLUSTER_SIZE {
            return Err(Error::InitFailed {
                method: "random class",
                min_count,
            });
        }
        self.param_update_step()?;
        self.e_step();
        Ok(())
    }

    fn draw_fuzzy(&mut self, rng: &mut dyn RngCore) -> Result<()> {
        if self.state < ModelState::Initialized {
            self.initialize_step();
        }
        let min_count = self.random_tik(rng);
        if min_count < MIN_CLUSTER_SIZE {
            return Err(Error::InitFailed {
                method: "random fuzzy",
                min_count,
            });
        }
        self.map_step();
        self.param_update_step()?;
        self.e_step();
        Ok(())
    }

    fn draw_param(&mut self, rng: &mut dyn RngCore) -> Result<()> {
        if self.state < ModelState::Initialized {
            self.initialize_step();
        }
        self.mixture.random_init(&self.tik, &self.nk, rng);
        let min_count = self.e_step();
        if min_count < MIN_CLUSTER_SIZE {
            return Err(Error::InitFailed {
                method: "random parameters",
                min_count,
            });
        }
        Ok(())
    }

    /// A successful draw is ready for an algorithm. A rejected one must not
    /// leave its `tik`, `nk` or labels behind.
    fn settle_init(&mut self, drawn: Result<()>) -> Result<()> {
        match drawn {
            Ok(()) => {
                self.state = ModelState::ParamInitialized;
                Ok(())
            }
            Err(error) => {
                self.initialize_step();
                Err(error)
            }
        }
    }

    /// Recompute the likelihood from the current parameters and advance to
    /// [`ModelState::Finalized`].
    pub fn finalize_step(&mut self) {
        self.ln_likelihood = self.compute_ln_likelihood();
        self.state = ModelState::Finalized;
    }

    /// Observed-data log-likelihood `Σᵢ ln Σₖ pₖ fₖ(xᵢ)` of the current
    /// parameters. Does not modify `tik`.
    pub fn compute_ln_likelihood(&self) -> f64 {
        let ln_pk = self.ln_pk();
        let k = self.nb_cluster();
        let mixture = &self.mixture;
        let row = |i: usize| {
            let values: Vec<f64> = (0..k)
                .map(|c| sanitize(ln_pk[c] + mixture.ln_component_probability(i, c)))
                .collect();
            logsumexp(&values)
        };

        #[cfg(feature = "parallel")]
        let total: f64 = (0..self.nb_sample()).into_par_iter().map(row).sum();

        #[cfg(not(feature = "parallel"))]
        let total: f64 = (0..self.nb_sample()).map(row).sum();

        total
    }

    fn random_zi(&mut self, rng: &mut dyn RngCore) -> f64 {
        let k = self.nb_cluster();
        for z in self.zi.iter_mut() {
            *z = rng.random_range(0..k);
        }
        self.c_step()
    }

    fn random_tik(&mut self, rng: &mut dyn RngCore) -> f64 {
        for mut row in self.tik.rows_mut() {
            for (t, &p) in row.iter_mut().zip(self.pk.iter()) {
                *t = rng.random::<f64>() * p;
            }
            let sum = row.sum();
            if sum > 0.0 {
                row /= sum;
            } else {
                row.fill(1.0 / self.pk.len() as f64);
            }
        }
        self.nk = self.tik.sum_axis(Axis(0));
        min_elt(&self.nk)
    }

    fn ln_pk(&self) -> Vec<f64> {
        self.pk.iter().map(|p| p.ln()).collect()
    }

    /// The mixture family.
    pub fn mixture(&self) -> &M {
        &self.mixture
    }

    /// Responsibilities, `n × K`.
    pub fn tik(&self) -> &Array2<f64> {
        &self.tik
    }

    /// Hard labels.
    pub fn zi(&self) -> &[usize] {
        &self.zi
    }

    /// Mixture proportions.
    pub fn pk(&self) -> &Array1<f64> {
        &self.pk
    }

    /// Cluster counts (column sums of `tik`).
    pub fn nk(&self) -> &Array1<f64> {
        &self.nk
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ModelState {
        self.state
    }

    /// Stored log-likelihood. `f64::MIN` until something is estimated.
    pub fn ln_likelihood(&self) -> f64 {
        self.ln_likelihood
    }

    /// Number of free parameters, proportions included.
    pub fn nb_free_parameters(&self) -> usize {
        self.nb_free_parameter
    }

    /// Number of variables of the family.
    pub fn nb_variables(&self) -> usize {
        self.nb_variable
    }

    /// Number of samples.
    pub fn nb_sample(&self) -> usize {
        self.tik.nrows()
    }

    /// Number of clusters.
    pub fn nb_cluster(&self) -> usize {
        self.tik.ncols()
    }
}

/// One row of the E-step: returns `(argmax, ln Σₖ pₖ fₖ(xᵢ))`.
///
/// A sample impossible under every cluster gets the proportions as its row
/// and contributes `-inf`.
fn e_step_row<M: DensityOracle + ?Sized>(
    mixture: &M,
    ln_pk: &[f64],
    pk: &Array1<f64>,
    i: usize,
    mut row: ArrayViewMut1<'_, f64>,
) -> (usize, f64) {
    let mut max = f64::NEG_INFINITY;
    let mut kmax = 0;
    for (k, t) in row.iter_mut().enumerate() {
        let v = sanitize(ln_pk[k] + mixture.ln_component_probability(i, k));
        *t = v;
        if v > max {
            max = v;
            kmax = k;
        }
    }
    if max == f64::NEG_INFINITY {
        row.assign(pk);
        return (argmax(pk.iter().copied()), f64::NEG_INFINITY);
    }
    let mut sum = 0.0;
    for t in row.iter_mut() {
        *t = (*t - max).exp();
        sum += *t;
    }
    row /= sum;
    (kmax, max + sum.ln())
}

/// NaN is treated as an impossible observation; `+inf` is clamped.
fn sanitize(v: f64) -> f64 {
    if v.is_nan() {
        f64::NEG_INFINITY
    } else {
        v.min(f64::MAX)
    }
}

/// Log-sum-exp for numerical stability.
fn logsumexp(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NEG_INFINITY;
    }
    let max_val = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max_val.is_infinite() {
        return max_val;
    }
    max_val + values.iter().map(|&v| (v - max_val).exp()).sum::<f64>().ln()
}

/// First index of the largest value.
fn argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best = f64::NEG_INFINITY;
    let mut best_k = 0;
    for (k, v) in values.enumerate() {
        if v > best {
            best = v;
            best_k = k;
        }
    }
    best_k
}

fn min_elt(v: &Array1<f64>) -> f64 {
    v.iter().cloned().fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixture::{DiagGaussian, ParameterUpdater};
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn two_blobs() -> DiagGaussian {
        let mut rows = Vec::new();
        for i in 0..20 {
            rows.push(vec![0.1 * i as f64]);
            rows.push(vec![10.0 + 0.1 * i as f64]);
        }
        DiagGaussian::from_rows(&rows, 2).unwrap()
    }

    fn assert_rows_stochastic(tik: &Array2<f64>) {
        for row in tik.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9, "row sums to {}", row.sum());
            assert!(row.iter().all(|&t| t >= 0.0 && t.is_finite()));
        }
    }

    fn assert_nk_consistent<M: Mixture>(c: &Composer<M>) {
        let cols = c.tik().sum_axis(Axis(0));
        for (a, b) in cols.iter().zip(c.nk().iter()) {
            assert!((a - b).abs() < 1e-9);
        }
        assert!((c.nk().sum() - c.nb_sample() as f64).abs() < 1e-9);
    }

    /// Every sample is impossible under every cluster.
    #[derive(Debug, Clone)]
    struct Impossible {
        n: usize,
        row: usize,
    }

    impl DensityOracle for Impossible {
        fn ln_component_probability(&self, i: usize, _k: usize) -> f64 {
            if i == self.row {
                f64::NEG_INFINITY
            } else {
                -1.0
            }
        }
    }

    impl ParameterUpdater for Impossible {
        fn update(&mut self, _tik: &Array2<f64>, _nk: &Array1<f64>) -> bool {
            true
        }
    }

    impl Mixture for Impossible {
        fn nb_sample(&self) -> usize {
            self.n
        }
        fn nb_cluster(&self) -> usize {
            2
        }
        fn nb_variable(&self) -> usize {
            1
        }
        fn nb_free_parameters(&self) -> usize {
            0
        }
        fn random_init(&mut self, _: &Array2<f64>, _: &Array1<f64>, _: &mut dyn RngCore) {}
    }

    #[test]
    fn test_new_starts_unestimated() {
        let c = Composer::new(two_blobs()).unwrap();
        assert_eq!(c.state(), ModelState::Created);
        assert_eq!(c.ln_likelihood(), f64::MIN);
        assert_eq!(c.nb_sample(), 40);
        assert_eq!(c.nb_cluster(), 2);
    }

    #[test]
    fn test_initialize_step_is_uniform() {
        let mut c = Composer::new(two_blobs()).unwrap();
        c.initialize_step();
        assert_eq!(c.state(), ModelState::Initialized);
        assert!(c.pk().iter().all(|&p| (p - 0.5).abs() < 1e-12));
        assert!(c.tik().iter().all(|&t| (t - 0.5).abs() < 1e-12));
        assert_nk_consistent(&c);
        assert!(c.ln_likelihood().is_finite());
        // one free proportion + 2 * K * d
        assert_eq!(c.nb_free_parameters(), 1 + 4);
        assert_eq!(c.nb_variables(), 1);
    }

    #[test]
    fn test_e_step_keeps_rows_stochastic() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut c = Composer::new(two_blobs()).unwrap();
        c.random_class_init(&mut rng).unwrap();
        let ll = c.ln_likelihood();
        c.e_step();
        assert_rows_stochastic(c.tik());
        assert_nk_consistent(&c);
        assert!((c.ln_likelihood() - ll).abs() < 1e-9);
    }

    #[test]
    fn test_e_step_matches_likelihood() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut c = Composer::new(two_blobs()).unwrap();
        c.random_fuzzy_init(&mut rng).unwrap();
        c.param_update_step().unwrap();
        c.e_step();
        assert!((c.ln_likelihood() - c.compute_ln_likelihood()).abs() < 1e-6);
    }

    #[test]
    fn test_map_step_agrees_with_e_step() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut c = Composer::new(two_blobs()).unwrap();
        c.random_class_init(&mut rng).unwrap();
        c.param_update_step().unwrap();
        c.e_step();
        let from_e = c.zi().to_vec();
        c.map_step();
        assert_eq!(from_e, c.zi());
    }

    #[test]
    fn test_e_step_at_returns_row_contribution() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut c = Composer::new(two_blobs()).unwrap();
        c.random_class_init(&mut rng).unwrap();
        let total: f64 = (0..c.nb_sample()).map(|i| c.e_step_at(i)).sum();
        assert!((total - c.compute_ln_likelihood()).abs() < 1e-6);
    }

    #[test]
    fn test_c_step_one_hot() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut c = Composer::new(two_blobs()).unwrap();
        c.random_fuzzy_init(&mut rng).unwrap();
        let min = c.c_step();
        for (i, row) in c.tik().rows().into_iter().enumerate() {
            for (k, &t) in row.iter().enumerate() {
                let expected = if k == c.zi()[i] { 1.0 } else { 0.0 };
                assert_eq!(t, expected);
            }
        }
        assert_nk_consistent(&c);
        assert_eq!(min, c.nk().iter().cloned().fold(f64::INFINITY, f64::min));
    }

    #[test]
    fn test_s_step_respects_support() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut c = Composer::new(two_blobs()).unwrap();
        c.initialize_step();
        // force row 0 to put all mass on cluster 1
        c.tik.row_mut(0).assign(&ndarray::array![0.0, 1.0]);
        for _ in 0..20 {
            c.s_step_at(0, &mut rng);
            assert_eq!(c.zi()[0], 1);
        }
        c.s_step(&mut rng);
        assert_nk_consistent(&c);
        assert_rows_stochastic(c.tik());
    }

    #[test]
    fn test_p_step_column_means() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut c = Composer::new(two_blobs()).unwrap();
        c.random_class_init(&mut rng).unwrap();
        c.p_step();
        let n = c.nb_sample() as f64;
        for (p, nk) in c.pk().iter().zip(c.nk().iter()) {
            assert!((p - nk / n).abs() < 1e-9);
        }
        assert!((c.pk().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_random_inits_reach_param_initialized() {
        let mut rng = StdRng::seed_from_u64(8);
        for method in 0..3 {
            let mut c = Composer::new(two_blobs()).unwrap();
            match method {
                0 => c.random_class_init(&mut rng).unwrap(),
                1 => c.random_fuzzy_init(&mut rng).unwrap(),
                _ => c.random_param_init(&mut rng).unwrap(),
            }
            assert_eq!(c.state(), ModelState::ParamInitialized);
            assert_rows_stochastic(c.tik());
            assert_nk_consistent(&c);
        }
    }

    #[test]
    fn test_random_init_fails_on_tiny_clusters() {
        // three samples, two clusters: some cluster always has < 2 members
        let g = DiagGaussian::from_rows(&[vec![0.0], vec![1.0], vec![2.0]], 2).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..10 {
            let mut c = Composer::new(g.clone()).unwrap();
            let err = c.random_class_init(&mut rng).unwrap_err();
            assert!(matches!(err, Error::InitFailed { method: "random class", .. }));
            assert!(c.state() < ModelState::ParamInitialized);

            let mut c = Composer::new(g.clone()).unwrap();
            let err = c.random_fuzzy_init(&mut rng).unwrap_err();
            assert!(matches!(err, Error::InitFailed { method: "random fuzzy", .. }));
        }
    }

    #[test]
    fn test_rejected_reinit_falls_back_to_uniform() {
        // five samples, two clusters: a 2/3 split passes, 1/4 and 0/5 are rejected
        let rows: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64]).collect();
        let g = DiagGaussian::from_rows(&rows, 2).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut c = Composer::new(g).unwrap();

        let mut accepted = false;
        for _ in 0..200 {
            if c.random_class_init(&mut rng).is_ok() {
                accepted = true;
                break;
            }
        }
        assert!(accepted);
        assert_eq!(c.state(), ModelState::ParamInitialized);

        let mut rejected = false;
        for _ in 0..200 {
            if c.random_class_init(&mut rng).is_err() {
                rejected = true;
                break;
            }
        }
        assert!(rejected);
        assert_eq!(c.state(), ModelState::Initialized);
        for &t in c.tik().iter() {
            assert!((t - 0.5).abs() < 1e-12);
        }
        assert!((c.nk()[0] - 2.5).abs() < 1e-12 && (c.nk()[1] - 2.5).abs() < 1e-12);
        assert!((c.ln_likelihood() - c.compute_ln_likelihood()).abs() < 1e-9);

        // the other draws fall back the same way
        let mut c = Composer::new(DiagGaussian::from_rows(&rows[..3], 2).unwrap()).unwrap();
        c.initialize_step();
        assert!(c.random_fuzzy_init(&mut rng).is_err());
        assert_eq!(c.state(), ModelState::Initialized);
        assert!(c.tik().iter().all(|&t| (t - 0.5).abs() < 1e-12));
    }

    #[test]
    fn test_impossible_sample_stays_normalized() {
        let mut c = Composer::new(Impossible { n: 5, row: 2 }).unwrap();
        c.initialize_step();
        c.e_step();
        let row = c.tik().row(2);
        assert!(row.iter().all(|t| !t.is_nan()));
        assert!((row.sum() - 1.0).abs() < 1e-12);
        assert_eq!(c.ln_likelihood(), f64::NEG_INFINITY);
        assert_rows_stochastic(c.tik());
    }

    #[test]
    fn test_finalize_and_reset() {
        let mut rng = StdRng::seed_from_u64(10);
        let mut c = Composer::new(two_blobs()).unwrap();
        c.random_class_init(&mut rng).unwrap();
        c.finalize_step();
        assert_eq!(c.state(), ModelState::Finalized);
        assert!(c.ln_likelihood().is_finite());

        c.initialize_step();
        assert_eq!(c.state(), ModelState::Initialized);

        c.reset();
        assert_eq!(c.state(), ModelState::Created);
        assert_eq!(c.ln_likelihood(), f64::MIN);
    }

    #[test]
    fn test_create_is_fresh() {
        let mut rng = StdRng::seed_from_u64(12);
        let mut c = Composer::new(two_blobs()).unwrap();
        c.random_class_init(&mut rng).unwrap();
        let fresh = c.create();
        assert_eq!(fresh.state(), ModelState::Created);
        assert_eq!(fresh.ln_likelihood(), f64::MIN);
        assert_eq!(fresh.nb_sample(), c.nb_sample());
    }

    #[test]
    fn test_logsumexp_edge_cases() {
        assert_eq!(logsumexp(&[]), f64::NEG_INFINITY);
        assert_eq!(logsumexp(&[f64::NEG_INFINITY, f64::NEG_INFINITY]), f64::NEG_INFINITY);
        let v = logsumexp(&[1000.0, 1000.0]);
        assert!((v - (1000.0 + 2f64.ln())).abs() < 1e-9);
    }
}
