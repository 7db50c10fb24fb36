//! Estimation algorithms driving a [`Composer`] to convergence.
//!
//! | Method | Iteration | Stops when |
//! |--------|-----------|------------|
//! | EM  | M-step, E-step | gain < `epsilon`, or `nb_iter_max` |
//! | CEM | C-step, M-step, E-step | gain < `epsilon`, or `nb_iter_max` |
//! | SEM | S-step, M-step, E-step | always `nb_iter_max` |
//!
//! EM increases the likelihood monotonically. CEM maximizes the classification
//! likelihood and usually stops in a handful of iterations. SEM never settles:
//! its random draws let it walk out of poor local optima, which makes it a good
//! short run ahead of a long EM.
//!
//! Reaching `nb_iter_max` is not a failure. A refused parameter update, a
//! cluster emptied by a C- or S-step, or a NaN likelihood is.

use crate::composer::{Composer, MIN_CLUSTER_SIZE};
use crate::error::{Error, Result};
use crate::mixture::Mixture;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Something that iterates composer steps to a stopping criterion.
pub trait Algorithm {
    /// Run on `composer`, which must already be parameter-initialized.
    fn run<M: Mixture>(&self, composer: &mut Composer<M>, rng: &mut dyn RngCore) -> Result<()>;
}

/// Which EM-family iteration to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgoMethod {
    /// Expectation-Maximization.
    #[default]
    Em,
    /// Classification EM.
    Cem,
    /// Stochastic EM.
    Sem,
}

impl AlgoMethod {
    /// Short display name.
    pub fn name(self) -> &'static str {
        match self {
            AlgoMethod::Em => "EM",
            AlgoMethod::Cem => "CEM",
            AlgoMethod::Sem => "SEM",
        }
    }
}

/// Configuration of one algorithm run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgoParams {
    /// Iteration kind.
    pub method: AlgoMethod,
    /// Maximum number of iterations.
    pub nb_iter_max: usize,
    /// Likelihood gain below which EM and CEM stop.
    pub epsilon: f64,
}

impl AlgoParams {
    /// EM with the given budget.
    pub fn em(nb_iter_max: usize, epsilon: f64) -> Self {
        Self {
            method: AlgoMethod::Em,
            nb_iter_max,
            epsilon,
        }
    }

    /// CEM with the given budget.
    pub fn cem(nb_iter_max: usize, epsilon: f64) -> Self {
        Self {
            method: AlgoMethod::Cem,
            nb_iter_max,
            epsilon,
        }
    }

    /// SEM running exactly `nb_iter` iterations.
    pub fn sem(nb_iter: usize) -> Self {
        Self {
            method: AlgoMethod::Sem,
            nb_iter_max: nb_iter,
            epsilon: 0.0,
        }
    }

    /// Set maximum iterations.
    pub fn with_nb_iter_max(mut self, nb_iter_max: usize) -> Self {
        self.nb_iter_max = nb_iter_max;
        self
    }

    /// Set convergence tolerance.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.nb_iter_max == 0 {
            return Err(Error::InvalidParameter {
                name: "nb_iter_max",
                message: "must be > 0",
            });
        }
        if !(self.epsilon >= 0.0) || !self.epsilon.is_finite() {
            return Err(Error::InvalidParameter {
                name: "epsilon",
                message: "must be finite and >= 0",
            });
        }
        Ok(())
    }

    fn run_em<M: Mixture>(&self, composer: &mut Composer<M>) -> Result<()> {
        let mut current = composer.ln_likelihood();
        for iter in 0..self.nb_iter_max {
            composer.param_update_step()?;
            composer.e_step();
            let ln_likelihood = checked(composer.ln_likelihood(), iter)?;
            if !(ln_likelihood - current >= self.epsilon) {
                trace!(iter, ln_likelihood, "EM converged");
                return Ok(());
            }
            current = ln_likelihood;
        }
        Ok(())
    }

    fn run_cem<M: Mixture>(&self, composer: &mut Composer<M>) -> Result<()> {
        let mut current = composer.ln_likelihood();
        for iter in 0..self.nb_iter_max {
            let min_count = composer.c_step();
            if min_count < MIN_CLUSTER_SIZE {
                return Err(Error::DegenerateCluster { min_count });
            }
            composer.param_update_step()?;
            composer.e_step();
            let ln_likelihood = checked(composer.ln_likelihood(), iter)?;
            if !(ln_likelihood - current >= self.epsilon) {
                trace!(iter, ln_likelihood, "CEM converged");
                return Ok(());
            }
            current = ln_likelihood;
        }
        Ok(())
    }

    fn run_sem<M: Mixture>(&self, composer: &mut Composer<M>, rng: &mut dyn RngCore) -> Result<()> {
        for iter in 0..self.nb_iter_max {
            let min_count = composer.s_step(rng);
            if min_count < MIN_CLUSTER_SIZE {
                return Err(Error::DegenerateCluster { min_count });
            }
            composer.param_update_step()?;
            composer.e_step();
            checked(composer.ln_likelihood(), iter)?;
        }
        Ok(())
    }
}

impl Default for AlgoParams {
    fn default() -> Self {
        Self::em(200, 1e-4)
    }
}

impl Algorithm for AlgoParams {
    fn run<M: Mixture>(&self, composer: &mut Composer<M>, rng: &mut dyn RngCore) -> Result<()> {
        match self.method {
            AlgoMethod::Em => self.run_em(composer),
            AlgoMethod::Cem => self.run_cem(composer),
            AlgoMethod::Sem => self.run_sem(composer, rng),
        }
    }
}

fn checked(ln_likelihood: f64, iter: usize) -> Result<f64> {
    if ln_likelihood.is_nan() {
        Err(Error::ConvergenceFailure { iterations: iter + 1 })
    } else {
        Ok(ln_likelihood)
    }
}
