//! Single-phase strategy: initialize, run one algorithm, keep the first success.

use std::sync::Arc;

use super::pool::CandidatePool;
use super::{conclude, default_long_algo, make_rng, recover, validate_nb_try, Strategy};
use crate::algo::{AlgoParams, Algorithm};
use crate::composer::Composer;
use crate::error::Result;
use crate::init::{InitParams, Initializer};
use crate::mixture::Mixture;
use crate::observe::{Observer, Phase, StrategyEvent, TracingObserver};
use serde::{Deserialize, Serialize};

const NAME: &str = "SimpleStrategy";

/// Configuration of a [`SimpleStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleStrategyParams {
    /// Number of tries.
    pub nb_try: usize,
    /// Initializer.
    pub init: InitParams,
    /// Estimation algorithm.
    pub algo: AlgoParams,
    /// Random seed.
    pub seed: Option<u64>,
}

impl SimpleStrategyParams {
    /// Set number of tries.
    pub fn with_nb_try(mut self, nb_try: usize) -> Self {
        self.nb_try = nb_try;
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        validate_nb_try(self.nb_try)?;
        self.init.validate()?;
        self.algo.validate()
    }
}

impl Default for SimpleStrategyParams {
    fn default() -> Self {
        Self {
            nb_try: 1,
            init: InitParams::default(),
            algo: default_long_algo(),
            seed: None,
        }
    }
}

/// For each try: initialize, run the algorithm; stop at the first try whose
/// algorithm succeeds.
#[derive(Debug, Clone)]
pub struct SimpleStrategy<I = InitParams, A = AlgoParams> {
    nb_try: usize,
    init: I,
    algo: A,
    seed: Option<u64>,
    observer: Arc<dyn Observer>,
}

impl<I: Initializer, A: Algorithm> SimpleStrategy<I, A> {
    /// Create a strategy with one try.
    pub fn new(init: I, algo: A) -> Self {
        Self {
            nb_try: 1,
            init,
            algo,
            seed: None,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Set number of tries.
    pub fn with_nb_try(mut self, nb_try: usize) -> Self {
        self.nb_try = nb_try;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Send events to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }
}

impl SimpleStrategy {
    /// Build from a configuration.
    pub fn from_params(params: &SimpleStrategyParams) -> Self {
        let mut strategy = Self::new(params.init, params.algo).with_nb_try(params.nb_try);
        strategy.seed = params.seed;
        strategy
    }
}

impl<M: Mixture, I: Initializer, A: Algorithm> Strategy<M> for SimpleStrategy<I, A> {
    fn run(&self, model: &mut Composer<M>) -> Result<()> {
        let observer = self.observer.as_ref();
        let mut rng = make_rng(self.seed);
        let (mut pool, slots) = CandidatePool::new(model, 1);
        let current = slots[0];
        let mut stored = false;

        for try_index in 0..self.nb_try {
            observer.on_event(&StrategyEvent::TryStarted {
                strategy: NAME,
                try_index,
            });
            let init = self.init.run(pool.get_mut(current), &mut *rng);
            if !recover(init, observer, NAME, None)? {
                continue;
            }
            let algo = self.algo.run(pool.get_mut(current), &mut *rng);
            if !recover(algo, observer, NAME, Some(Phase::Long))? {
                continue;
            }
            let ln_likelihood = pool.get(current).ln_likelihood();
            observer.on_event(&StrategyEvent::LongRunFinished {
                strategy: NAME,
                ln_likelihood,
            });
            if pool.store_into(model, current) {
                stored = true;
                observer.on_event(&StrategyEvent::ModelStored {
                    strategy: NAME,
                    ln_likelihood,
                });
            }
            break;
        }

        conclude(stored, observer, NAME, self.nb_try)
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
