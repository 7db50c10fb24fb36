//! Model-selection criteria.
//!
//! Comparing mixtures with different numbers of clusters (or different
//! families) on likelihood alone always favors the bigger model. Criteria
//! penalize the number of free parameters `p`; lower is better.
//!
//! | Criterion | Value |
//! |-----------|-------|
//! | AIC | `-2 lnL + 2p` |
//! | BIC | `-2 lnL + p ln n` |
//! | ICL | `BIC - 2 Σᵢₖ tᵢₖ ln tᵢₖ` |
//!
//! ICL adds the entropy of the soft partition to BIC, favoring models whose
//! clusters are well separated.

use crate::composer::Composer;
use crate::mixture::Mixture;
use serde::{Deserialize, Serialize};

/// A penalized-likelihood criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Akaike information criterion.
    Aic,
    /// Bayesian information criterion.
    #[default]
    Bic,
    /// Integrated completed likelihood.
    Icl,
}

impl Criterion {
    /// Value of the criterion for `composer`, from its stored likelihood.
    pub fn value<M: Mixture>(self, composer: &Composer<M>) -> f64 {
        let ln_l = composer.ln_likelihood();
        let p = composer.nb_free_parameters() as f64;
        let n = composer.nb_sample() as f64;
        match self {
            Criterion::Aic => -2.0 * ln_l + 2.0 * p,
            Criterion::Bic => -2.0 * ln_l + p * n.ln(),
            Criterion::Icl => {
                let entropy: f64 = composer
                    .tik()
                    .iter()
                    .filter(|&&t| t > 0.0)
                    .map(|&t| t * t.ln())
                    .sum();
                -2.0 * ln_l + p * n.ln() - 2.0 * entropy
            }
        }
    }
}
