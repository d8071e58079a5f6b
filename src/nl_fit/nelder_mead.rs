use crate::nl_fit::curve_fit::{MinimizeResult, MinimizeTrait, TerminationReason};
use crate::nl_fit::objective::{CountedObjective, Objective};

use ordered_float::NotNan;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Nelder-Mead downhill simplex minimizer
///
/// Derivative-free, it only compares objective values, so it tolerates non-smooth regions of the
/// cost surface. Reflection, expansion, contraction and shrink coefficients depend on the
/// dimensionality as proposed by Gao & Han (2012) "Implementing the Nelder-Mead simplex
/// algorithm with adaptive parameters", which behaves better than the classic coefficients for
/// more than a couple of parameters.
///
/// The run converges when both the spread of the simplex costs and the relative size of the
/// simplex fall below the tolerances. After convergence the simplex is rebuilt around the best
/// vertex up to `max_restarts` times, stopping early if a restart doesn't improve the cost.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename = "NelderMead")]
pub struct NelderMeadMinimizer {
    pub max_iterations: u32,
    pub max_evaluations: u32,
    pub cost_tolerance: NotNan<f64>,
    pub step_tolerance: NotNan<f64>,
    pub initial_step: NotNan<f64>,
    pub max_restarts: u32,
}

impl NelderMeadMinimizer {
    /// Create a new [NelderMeadMinimizer].
    ///
    /// # Arguments
    /// - `max_iterations`: maximum number of simplex iterations
    /// - `max_evaluations`: maximum number of objective evaluations, checked between iterations
    /// - `cost_tolerance`: tolerance on the cost spread over the simplex, relative to
    ///   `1 + |best cost|`
    /// - `step_tolerance`: tolerance on the simplex size, relative to `max(|x_i|, 1)`
    /// - `initial_step`: initial simplex edge, relative to `max(|x0_i|, 1)`
    /// - `max_restarts`: maximum number of simplex rebuilds after convergence
    pub fn new(
        max_iterations: u32,
        max_evaluations: u32,
        cost_tolerance: f64,
        step_tolerance: f64,
        initial_step: f64,
        max_restarts: u32,
    ) -> Self {
        assert!(cost_tolerance >= 0.0, "cost_tolerance must be non-negative");
        assert!(step_tolerance >= 0.0, "step_tolerance must be non-negative");
        assert!(initial_step > 0.0, "initial_step must be positive");
        assert!(initial_step.is_finite(), "initial_step must be finite");
        Self {
            max_iterations,
            max_evaluations,
            cost_tolerance: NotNan::new(cost_tolerance).expect("cost_tolerance must not be NaN"),
            step_tolerance: NotNan::new(step_tolerance).expect("step_tolerance must not be NaN"),
            initial_step: NotNan::new(initial_step).expect("initial_step must not be NaN"),
            max_restarts,
        }
    }

    #[inline]
    pub fn default_max_iterations() -> u32 {
        20_000
    }

    #[inline]
    pub fn default_max_evaluations() -> u32 {
        40_000
    }

    #[inline]
    pub fn default_cost_tolerance() -> f64 {
        1e-10
    }

    #[inline]
    pub fn default_step_tolerance() -> f64 {
        1e-8
    }

    #[inline]
    pub fn default_initial_step() -> f64 {
        0.05
    }

    #[inline]
    pub fn default_max_restarts() -> u32 {
        2
    }

    fn initial_simplex<O, const NPARAMS: usize>(
        &self,
        x0: &[f64; NPARAMS],
        f0: f64,
        objective: &mut CountedObjective<O, NPARAMS>,
    ) -> Vec<([f64; NPARAMS], f64)>
    where
        O: Objective<NPARAMS> + ?Sized,
    {
        let step = self.initial_step.into_inner();
        let mut simplex = Vec::with_capacity(NPARAMS + 1);
        simplex.push((*x0, f0));
        for i in 0..NPARAMS {
            let mut x = *x0;
            x[i] += step * x0[i].abs().max(1.0);
            let f = objective.value_or_inf(&x);
            simplex.push((x, f));
        }
        simplex
    }

    fn is_converged<const NPARAMS: usize>(&self, simplex: &[([f64; NPARAMS], f64)]) -> bool {
        let (x_best, f_best) = &simplex[0];
        let f_spread = simplex
            .iter()
            .map(|(_, f)| f - f_best)
            .fold(0.0, f64::max);
        if f_spread > self.cost_tolerance.into_inner() * (1.0 + f_best.abs()) {
            return false;
        }
        let x_spread = simplex[1..]
            .iter()
            .flat_map(|(x, _)| {
                x.iter()
                    .zip(x_best.iter())
                    .map(|(a, b)| (a - b).abs() / b.abs().max(1.0))
            })
            .fold(0.0, f64::max);
        x_spread <= self.step_tolerance.into_inner()
    }
}

impl Default for NelderMeadMinimizer {
    fn default() -> Self {
        Self::new(
            Self::default_max_iterations(),
            Self::default_max_evaluations(),
            Self::default_cost_tolerance(),
            Self::default_step_tolerance(),
            Self::default_initial_step(),
            Self::default_max_restarts(),
        )
    }
}

/// `origin + coeff * (target - origin)`
#[inline]
fn affine<const NPARAMS: usize>(
    origin: &[f64; NPARAMS],
    target: &[f64; NPARAMS],
    coeff: f64,
) -> [f64; NPARAMS] {
    std::array::from_fn(|i| origin[i] + coeff * (target[i] - origin[i]))
}

impl MinimizeTrait for NelderMeadMinimizer {
    fn minimize<O, const NPARAMS: usize>(
        &self,
        objective: &O,
        x0: &[f64; NPARAMS],
    ) -> MinimizeResult<NPARAMS>
    where
        O: Objective<NPARAMS> + ?Sized,
    {
        let mut objective = CountedObjective::<O, NPARAMS>::new(objective);

        let f0 = objective.value(x0);
        if !f0.is_finite() {
            return MinimizeResult {
                x: *x0,
                cost: f0,
                iterations: 0,
                evaluations: objective.evaluations,
                termination: TerminationReason::NonFiniteCost,
            };
        }
        if NPARAMS == 0 {
            return MinimizeResult {
                x: *x0,
                cost: f0,
                iterations: 0,
                evaluations: objective.evaluations,
                termination: TerminationReason::StepTolerance,
            };
        }

        let n = NPARAMS as f64;
        let reflection = 1.0;
        let (expansion, contraction, shrinkage) = if NPARAMS > 1 {
            (1.0 + 2.0 / n, 0.75 - 0.5 / n, 1.0 - 1.0 / n)
        } else {
            (2.0, 0.5, 0.5)
        };

        let mut simplex = self.initial_simplex(x0, f0, &mut objective);
        let mut iterations = 0_usize;
        let mut restarts = 0;
        let mut cost_before_restart = f64::INFINITY;

        let termination = loop {
            // Costs are never NaN here, non-finite values are replaced with infinity
            simplex.sort_by(|a, b| a.1.total_cmp(&b.1));

            if self.is_converged(&simplex) {
                let (x_best, f_best) = simplex[0];
                let improvement = cost_before_restart - f_best;
                if restarts < self.max_restarts
                    && improvement > self.cost_tolerance.into_inner() * (1.0 + f_best.abs())
                {
                    restarts += 1;
                    cost_before_restart = f_best;
                    simplex = self.initial_simplex(&x_best, f_best, &mut objective);
                    continue;
                }
                break TerminationReason::CostTolerance;
            }
            if iterations >= self.max_iterations as usize {
                break TerminationReason::MaxIterations;
            }
            if objective.evaluations >= self.max_evaluations as usize {
                break TerminationReason::MaxEvaluations;
            }
            iterations += 1;

            let centroid: [f64; NPARAMS] = std::array::from_fn(|i| {
                simplex[..NPARAMS].iter().map(|(x, _)| x[i]).sum::<f64>() / n
            });
            let (x_worst, f_worst) = simplex[NPARAMS];
            let f_best = simplex[0].1;
            let f_second_worst = simplex[NPARAMS - 1].1;

            let x_reflected = affine(&centroid, &x_worst, -reflection);
            let f_reflected = objective.value_or_inf(&x_reflected);

            if f_reflected < f_best {
                let x_expanded = affine(&centroid, &x_reflected, expansion);
                let f_expanded = objective.value_or_inf(&x_expanded);
                simplex[NPARAMS] = if f_expanded < f_reflected {
                    (x_expanded, f_expanded)
                } else {
                    (x_reflected, f_reflected)
                };
                continue;
            }
            if f_reflected < f_second_worst {
                simplex[NPARAMS] = (x_reflected, f_reflected);
                continue;
            }

            let accepted = if f_reflected < f_worst {
                let x_contracted = affine(&centroid, &x_reflected, contraction);
                let f_contracted = objective.value_or_inf(&x_contracted);
                (f_contracted <= f_reflected).then_some((x_contracted, f_contracted))
            } else {
                let x_contracted = affine(&centroid, &x_worst, contraction);
                let f_contracted = objective.value_or_inf(&x_contracted);
                (f_contracted < f_worst).then_some((x_contracted, f_contracted))
            };
            match accepted {
                Some(vertex) => simplex[NPARAMS] = vertex,
                None => {
                    let x_best = simplex[0].0;
                    for vertex in simplex[1..].iter_mut() {
                        let x = affine(&x_best, &vertex.0, shrinkage);
                        *vertex = (x, objective.value_or_inf(&x));
                    }
                }
            }
        };

        let (x, cost) = simplex[0];
        MinimizeResult {
            x,
            cost,
            iterations,
            evaluations: objective.evaluations,
            termination,
        }
    }
}
