use crate::nl_fit::bfgs::BfgsMinimizer;
use crate::nl_fit::nelder_mead::NelderMeadMinimizer;
use crate::nl_fit::objective::Objective;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Why a minimization run stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum TerminationReason {
    /// Cost change fell below the tolerance
    CostTolerance,
    /// Parameter change fell below the tolerance
    StepTolerance,
    /// Gradient norm fell below the tolerance
    GradientTolerance,
    MaxIterations,
    MaxEvaluations,
    /// No sufficient decrease along a descent direction
    LineSearchFailed,
    /// Objective or its gradient is not finite at the current point
    NonFiniteCost,
}

impl TerminationReason {
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            Self::CostTolerance | Self::StepTolerance | Self::GradientTolerance
        )
    }

    pub fn is_numerical_failure(&self) -> bool {
        matches!(self, Self::NonFiniteCost)
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CostTolerance => "cost tolerance reached",
            Self::StepTolerance => "step tolerance reached",
            Self::GradientTolerance => "gradient tolerance reached",
            Self::MaxIterations => "maximum number of iterations reached",
            Self::MaxEvaluations => "maximum number of objective evaluations reached",
            Self::LineSearchFailed => "line search failed",
            Self::NonFiniteCost => "objective or its gradient is not finite",
        };
        f.write_str(s)
    }
}

/// Outcome of a single minimization run
#[derive(Clone, Debug, PartialEq)]
pub struct MinimizeResult<const NPARAMS: usize> {
    /// Best point found
    pub x: [f64; NPARAMS],
    /// Objective value at `x`
    pub cost: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: TerminationReason,
}

impl<const NPARAMS: usize> MinimizeResult<NPARAMS> {
    #[inline]
    pub fn is_converged(&self) -> bool {
        self.termination.is_converged()
    }
}

pub trait MinimizeTrait: Clone + Debug + Serialize + DeserializeOwned {
    /// Minimize `objective` starting from `x0`
    ///
    /// Must be deterministic for a fixed `x0` and fixed algorithm parameters.
    fn minimize<O, const NPARAMS: usize>(
        &self,
        objective: &O,
        x0: &[f64; NPARAMS],
    ) -> MinimizeResult<NPARAMS>
    where
        O: Objective<NPARAMS> + ?Sized;
}

/// Minimization algorithm
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum MinimizerAlgorithm {
    NelderMead(NelderMeadMinimizer),
    Bfgs(BfgsMinimizer),
}

impl MinimizeTrait for MinimizerAlgorithm {
    fn minimize<O, const NPARAMS: usize>(
        &self,
        objective: &O,
        x0: &[f64; NPARAMS],
    ) -> MinimizeResult<NPARAMS>
    where
        O: Objective<NPARAMS> + ?Sized,
    {
        match self {
            Self::NelderMead(m) => m.minimize(objective, x0),
            Self::Bfgs(m) => m.minimize(objective, x0),
        }
    }
}

impl MinimizerAlgorithm {
    pub fn max_iterations(&self) -> u32 {
        match self {
            Self::NelderMead(m) => m.max_iterations,
            Self::Bfgs(m) => m.max_iterations,
        }
    }

    pub fn set_max_iterations(&mut self, max_iterations: u32) {
        match self {
            Self::NelderMead(m) => m.max_iterations = max_iterations,
            Self::Bfgs(m) => m.max_iterations = max_iterations,
        }
    }
}

impl Default for MinimizerAlgorithm {
    fn default() -> Self {
        NelderMeadMinimizer::default().into()
    }
}

impl From<NelderMeadMinimizer> for MinimizerAlgorithm {
    fn from(value: NelderMeadMinimizer) -> Self {
        Self::NelderMead(value)
    }
}

impl From<BfgsMinimizer> for MinimizerAlgorithm {
    fn from(value: BfgsMinimizer) -> Self {
        Self::Bfgs(value)
    }
}
