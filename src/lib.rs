//! # mixt
//!
//! Mixture-model estimation by the EM family of algorithms, with multi-start
//! strategies to escape poor local optima.
//!
//! The engine is indifferent to the probability law of each cluster: a
//! [`Composer`] owns responsibilities, labels and proportions, and delegates
//! densities and parameter updates to a [`Mixture`] family fixed at
//! construction.
//!
//! ```text
//! Strategy ──▶ (Initializer ──▶ Algorithm) × N over candidate Composers ──▶ best Composer
//! ```
//!
//! - [`composer`]: E/MAP/C/S/P steps and the model lifecycle
//! - [`init`]: random-class, random-fuzzy and random-parameter starts
//! - [`algo`]: EM, CEM, SEM
//! - [`strategy`]: simple, short/long (XEM) and full restart policies
//! - [`mixture`]: the family contract, with diagonal Gaussian and categorical families
//! - [`criterion`]: AIC, BIC, ICL
//! - [`observe`]: strategy events and their sinks

pub mod algo;
pub mod composer;
pub mod criterion;
/// Error types used across `mixt`.
pub mod error;
pub mod init;
pub mod mixture;
pub mod observe;
pub mod strategy;

pub use algo::{AlgoMethod, AlgoParams, Algorithm};
pub use composer::{Composer, ModelState, MIN_CLUSTER_SIZE};
pub use criterion::Criterion;
pub use error::{Error, Result};
pub use init::{InitMethod, InitParams, Initializer};
pub use mixture::{Categorical, DensityOracle, DiagGaussian, Mixture, ParameterUpdater};
pub use observe::{NoopObserver, Observer, Phase, StrategyEvent, TracingObserver};
pub use strategy::{
    FullStrategy, FullStrategyParams, SimpleStrategy, SimpleStrategyParams, Strategy,
    StrategyParams, XemStrategy, XemStrategyParams,
};
