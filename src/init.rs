//! Initialization policies.
//!
//! An initializer takes a composer in any state and hands it back
//! parameter-initialized: proportions, parameters, responsibilities and
//! likelihood all consistent, ready for an [`Algorithm`] run.
//!
//! | Method | Draw |
//! |--------|------|
//! | [`InitMethod::RandomClass`] | uniform labels, one-hot `tik` |
//! | [`InitMethod::RandomFuzzy`] | uniform noise weighted by `pk`, rows normalized |
//! | [`InitMethod::RandomParam`] | parameters drawn by the mixture family |
//!
//! Every method fails when the draw leaves some cluster with fewer than two
//! members. An optional short algorithm may refine the start (the default is
//! 20 EM iterations); its failure fails the initialization.

use crate::algo::{AlgoParams, Algorithm};
use crate::composer::Composer;
use crate::error::Result;
use crate::mixture::Mixture;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Something that brings a composer to the parameter-initialized state.
pub trait Initializer {
    /// Initialize `composer`.
    fn run<M: Mixture>(&self, composer: &mut Composer<M>, rng: &mut dyn RngCore) -> Result<()>;
}

/// How the starting point is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitMethod {
    /// Random parameters from the mixture family.
    RandomParam,
    /// Random hard labels.
    #[default]
    RandomClass,
    /// Random soft responsibilities.
    RandomFuzzy,
}

/// Initializer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitParams {
    /// Random draw.
    pub method: InitMethod,
    /// Optional algorithm run right after the draw.
    pub init_algo: Option<AlgoParams>,
}

impl InitParams {
    /// Initializer using `method` and no refinement.
    pub fn new(method: InitMethod) -> Self {
        Self {
            method,
            init_algo: None,
        }
    }

    /// Refine each draw with `algo`.
    pub fn with_init_algo(mut self, algo: AlgoParams) -> Self {
        self.init_algo = Some(algo);
        self
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        match &self.init_algo {
            Some(algo) => algo.validate(),
            None => Ok(()),
        }
    }
}

impl Default for InitParams {
    /// Random class labels refined by 20 EM iterations.
    fn default() -> Self {
        Self::new(InitMethod::RandomClass).with_init_algo(AlgoParams::em(20, 1e-2))
    }
}

impl Initializer for InitParams {
    fn run<M: Mixture>(&self, composer: &mut Composer<M>, rng: &mut dyn RngCore) -> Result<()> {
        match self.method {
            InitMethod::RandomParam => composer.random_param_init(rng)?,
            InitMethod::RandomClass => composer.random_class_init(rng)?,
            InitMethod::RandomFuzzy => composer.random_fuzzy_init(rng)?,
        }
        if let Some(algo) = &self.init_algo {
            algo.run(composer, rng)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::ModelState;
    use crate::error::Error;
    use crate::mixture::DiagGaussian;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn blobs() -> DiagGaussian {
        let rows: Vec<Vec<f64>> = (0..30)
            .map(|i| vec![if i % 2 == 0 { 0.0 } else { 8.0 } + 0.01 * i as f64])
            .collect();
        DiagGaussian::from_rows(&rows, 2).unwrap()
    }

    #[test]
    fn test_each_method_ready_for_algorithm() {
        let mut rng = StdRng::seed_from_u64(31);
        for method in [InitMethod::RandomParam, InitMethod::RandomClass, InitMethod::RandomFuzzy] {
            let mut c = Composer::new(blobs()).unwrap();
            InitParams::new(method).run(&mut c, &mut rng).unwrap();
            assert_eq!(c.state(), ModelState::ParamInitialized);
            assert!(c.ln_likelihood().is_finite());
        }
    }

    #[test]
    fn test_init_algo_refines() {
        let mut rng = StdRng::seed_from_u64(32);
        let init = InitParams::new(InitMethod::RandomClass).with_init_algo(AlgoParams::sem(5));
        let mut c = Composer::new(blobs()).unwrap();
        init.run(&mut c, &mut rng).unwrap();
        assert_eq!(c.state(), ModelState::ParamInitialized);
    }

    #[test]
    fn test_failure_surfaces_as_init_error() {
        let g = DiagGaussian::from_rows(&[vec![0.0], vec![1.0], vec![2.0]], 2).unwrap();
        let mut rng = StdRng::seed_from_u64(33);
        let mut c = Composer::new(g).unwrap();
        let err = InitParams::default().run(&mut c, &mut rng).unwrap_err();
        assert!(matches!(err, Error::InitFailed { .. }));
    }
}
