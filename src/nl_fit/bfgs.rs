use crate::nl_fit::curve_fit::{MinimizeResult, MinimizeTrait, TerminationReason};
use crate::nl_fit::objective::{CountedObjective, Objective};

use ndarray::{Array2, ArrayView1};
use ordered_float::NotNan;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const ARMIJO_C1: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 60;

/// BFGS quasi-Newton minimizer
///
/// Keeps a dense approximation of the inverse Hessian and searches along the quasi-Newton
/// direction with backtracking line search on the Armijo condition. It uses
/// [Objective::gradient], which is analytic for [crate::LogPriceData] and central finite
/// differences for plain closures. Each gradient call counts as a single objective evaluation.
///
/// A non-finite gradient stops the run with [TerminationReason::NonFiniteCost], keeping the last
/// point where it was finite.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename = "Bfgs")]
pub struct BfgsMinimizer {
    pub max_iterations: u32,
    pub max_evaluations: u32,
    pub cost_tolerance: NotNan<f64>,
    pub step_tolerance: NotNan<f64>,
    pub gradient_tolerance: NotNan<f64>,
}

impl BfgsMinimizer {
    /// Create a new [BfgsMinimizer].
    ///
    /// # Arguments
    /// - `max_iterations`: maximum number of quasi-Newton steps
    /// - `max_evaluations`: maximum number of objective and gradient evaluations, checked between
    ///   iterations
    /// - `cost_tolerance`: tolerance on the cost change of an accepted step, relative to
    ///   `1 + |cost|`
    /// - `step_tolerance`: tolerance on the accepted step, relative to `max(|x_i|, 1)`
    /// - `gradient_tolerance`: tolerance on the max-norm of the gradient
    pub fn new(
        max_iterations: u32,
        max_evaluations: u32,
        cost_tolerance: f64,
        step_tolerance: f64,
        gradient_tolerance: f64,
    ) -> Self {
        assert!(cost_tolerance >= 0.0, "cost_tolerance must be non-negative");
        assert!(step_tolerance >= 0.0, "step_tolerance must be non-negative");
        assert!(
            gradient_tolerance >= 0.0,
            "gradient_tolerance must be non-negative"
        );
        Self {
            max_iterations,
            max_evaluations,
            cost_tolerance: NotNan::new(cost_tolerance).expect("cost_tolerance must not be NaN"),
            step_tolerance: NotNan::new(step_tolerance).expect("step_tolerance must not be NaN"),
            gradient_tolerance: NotNan::new(gradient_tolerance)
                .expect("gradient_tolerance must not be NaN"),
        }
    }

    #[inline]
    pub fn default_max_iterations() -> u32 {
        2_000
    }

    #[inline]
    pub fn default_max_evaluations() -> u32 {
        20_000
    }

    #[inline]
    pub fn default_cost_tolerance() -> f64 {
        1e-14
    }

    #[inline]
    pub fn default_step_tolerance() -> f64 {
        1e-12
    }

    #[inline]
    pub fn default_gradient_tolerance() -> f64 {
        1e-8
    }
}

impl Default for BfgsMinimizer {
    fn default() -> Self {
        Self::new(
            Self::default_max_iterations(),
            Self::default_max_evaluations(),
            Self::default_cost_tolerance(),
            Self::default_step_tolerance(),
            Self::default_gradient_tolerance(),
        )
    }
}

#[inline]
fn dot<const NPARAMS: usize>(a: &[f64; NPARAMS], b: &[f64; NPARAMS]) -> f64 {
    a.iter().zip(b.iter()).map(|(a, b)| a * b).sum()
}

#[inline]
fn max_norm(a: &[f64]) -> f64 {
    a.iter().fold(0.0, |acc, x| f64::max(acc, x.abs()))
}

impl MinimizeTrait for BfgsMinimizer {
    fn minimize<O, const NPARAMS: usize>(
        &self,
        objective: &O,
        x0: &[f64; NPARAMS],
    ) -> MinimizeResult<NPARAMS>
    where
        O: Objective<NPARAMS> + ?Sized,
    {
        let mut objective = CountedObjective::<O, NPARAMS>::new(objective);

        let mut x = *x0;
        let mut grad = [0.0; NPARAMS];
        let mut cost = objective.gradient(&x, &mut grad);
        if !cost.is_finite() {
            return MinimizeResult {
                x,
                cost,
                iterations: 0,
                evaluations: objective.evaluations,
                termination: TerminationReason::NonFiniteCost,
            };
        }

        let mut inv_hessian = Array2::<f64>::eye(NPARAMS);
        let mut is_identity = true;
        let mut iterations = 0_usize;

        let termination = loop {
            if !grad.iter().all(|g| g.is_finite()) {
                break TerminationReason::NonFiniteCost;
            }
            if max_norm(&grad) <= self.gradient_tolerance.into_inner() {
                break TerminationReason::GradientTolerance;
            }
            if iterations >= self.max_iterations as usize {
                break TerminationReason::MaxIterations;
            }
            if objective.evaluations >= self.max_evaluations as usize {
                break TerminationReason::MaxEvaluations;
            }
            iterations += 1;

            let h_grad = inv_hessian.dot(&ArrayView1::from(&grad[..]));
            let mut direction: [f64; NPARAMS] = std::array::from_fn(|i| -h_grad[i]);
            let mut slope = dot(&grad, &direction);
            if !(slope < 0.0) {
                inv_hessian = Array2::eye(NPARAMS);
                is_identity = true;
                direction = grad.map(|g| -g);
                slope = dot(&grad, &direction);
            }

            let mut alpha = if is_identity {
                f64::min(1.0, 1.0 / max_norm(&grad))
            } else {
                1.0
            };
            let mut accepted = None;
            for _ in 0..MAX_BACKTRACKS {
                let trial: [f64; NPARAMS] = std::array::from_fn(|i| x[i] + alpha * direction[i]);
                let trial_cost = objective.value_or_inf(&trial);
                if trial_cost < cost && trial_cost <= cost + ARMIJO_C1 * alpha * slope {
                    accepted = Some(trial);
                    break;
                }
                alpha *= 0.5;
            }
            let Some(x_new) = accepted else {
                if is_identity {
                    break TerminationReason::LineSearchFailed;
                }
                inv_hessian = Array2::eye(NPARAMS);
                is_identity = true;
                continue;
            };

            let mut grad_new = [0.0; NPARAMS];
            let cost_new = objective.gradient(&x_new, &mut grad_new);

            let step: [f64; NPARAMS] = std::array::from_fn(|i| x_new[i] - x[i]);
            let grad_change: [f64; NPARAMS] = std::array::from_fn(|i| grad_new[i] - grad[i]);
            let cost_change = cost - cost_new;
            let relative_step = step
                .iter()
                .zip(x.iter())
                .map(|(s, x)| s.abs() / x.abs().max(1.0))
                .fold(0.0, f64::max);

            x = x_new;
            cost = cost_new;
            grad = grad_new;

            if cost_change <= self.cost_tolerance.into_inner() * (1.0 + cost.abs()) {
                break TerminationReason::CostTolerance;
            }
            if relative_step <= self.step_tolerance.into_inner() {
                break TerminationReason::StepTolerance;
            }

            let sy = dot(&step, &grad_change);
            let yy = dot(&grad_change, &grad_change);
            // Curvature condition, otherwise the update loses positive definiteness
            if !(sy > f64::EPSILON * dot(&step, &step).sqrt() * yy.sqrt()) {
                continue;
            }
            if is_identity {
                inv_hessian *= sy / yy;
                is_identity = false;
            }
            let h_y = inv_hessian.dot(&ArrayView1::from(&grad_change[..]));
            let yhy = ArrayView1::from(&grad_change[..]).dot(&h_y);
            let ss_coeff = (sy + yhy) / (sy * sy);
            inv_hessian.indexed_iter_mut().for_each(|((i, j), h)| {
                *h += ss_coeff * step[i] * step[j] - (h_y[i] * step[j] + step[i] * h_y[j]) / sy
            });
        };

        MinimizeResult {
            x,
            cost,
            iterations,
            evaluations: objective.evaluations,
            termination,
        }
    }
}
