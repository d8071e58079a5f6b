//! Unconstrained minimization infrastructure for model fitting.
//!
//! # Overview
//!
//! Fitting a model is the minimization of a scalar [`Objective`] over a fixed-size parameter
//! array. The objective knows nothing about the optimizer and the optimizer knows nothing about
//! the model, so algorithms are swappable through [`MinimizerAlgorithm`].
//!
//! # Objective
//!
//! ```text
//! fn value(x: &[f64; NPARAMS]) -> f64
//! fn gradient(x: &[f64; NPARAMS], grad: &mut [f64; NPARAMS]) -> f64
//! ```
//!
//! `gradient` writes the gradient and returns the value at the same point. The default
//! implementation uses central finite differences, models with analytic derivatives (see
//! [`crate::LogPriceData`]) override it. Any `Fn(&[f64; NPARAMS]) -> f64` closure is an
//! objective.
//!
//! # Termination
//!
//! Every run ends with a [`TerminationReason`]:
//!
//! - converged: [`TerminationReason::CostTolerance`], [`TerminationReason::StepTolerance`],
//!   [`TerminationReason::GradientTolerance`],
//! - budget exhausted or stuck: [`TerminationReason::MaxIterations`],
//!   [`TerminationReason::MaxEvaluations`], [`TerminationReason::LineSearchFailed`],
//! - failed: [`TerminationReason::NonFiniteCost`], the objective is not finite at the starting
//!   point, or the gradient is not finite at the current point of [`BfgsMinimizer`]. Nelder-Mead
//!   evaluates no gradient, a simplex stuck among non-finite vertices runs out of its budget.
//!
//! Non-finite values at trial points are treated as worse than any finite value, so they are
//! rejected and never become the best-known point. The best-known cost is monotonically
//! non-increasing for all algorithms. No bounds are enforced.
//!
//! # Algorithms
//!
//! - [`NelderMeadMinimizer`]: adaptive Nelder-Mead simplex with restarts. Derivative-free.
//! - [`BfgsMinimizer`]: quasi-Newton BFGS with backtracking Armijo line search. Uses
//!   [`Objective::gradient`].

pub mod bfgs;
pub use bfgs::BfgsMinimizer;

pub mod curve_fit;
pub use curve_fit::{MinimizeResult, MinimizeTrait, MinimizerAlgorithm, TerminationReason};

mod finite_diff;
pub use finite_diff::central_difference;

pub mod nelder_mead;
pub use nelder_mead::NelderMeadMinimizer;

mod objective;
pub use objective::Objective;
