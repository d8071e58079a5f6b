use crate::cost::LogPriceData;
use crate::data::{Observation, Series};
use crate::error::LpplError;
use crate::inits::{LpplInits, MultiStart};
use crate::model::{LpplParams, NPARAMS};
use crate::nl_fit::{
    MinimizeResult, MinimizeTrait, MinimizerAlgorithm, NelderMeadMinimizer, TerminationReason,
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// LPPL fit of a price series
///
/// Minimizes the sum of squared residuals between observed log-prices and the
/// [LPPL model](crate::LpplParams) over all seven parameters, starting from the point given by
/// `inits` and, optionally, from the additional seeds of `multi_start`.
///
/// Parameters are not bounded. The critical time may drift before the last observation, where
/// the model is flat and the optimizer gets stuck.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct LpplFit {
    algorithm: MinimizerAlgorithm,
    inits: LpplInits,
    multi_start: MultiStart,
}

impl LpplFit {
    /// New [LpplFit] instance
    ///
    /// `algorithm` is the minimization method, see [MinimizerAlgorithm]. `inits` gives the
    /// primary starting point and `multi_start` the additional ones.
    pub fn new(algorithm: MinimizerAlgorithm, inits: LpplInits, multi_start: MultiStart) -> Self {
        Self {
            algorithm,
            inits,
            multi_start,
        }
    }

    /// Default [NelderMeadMinimizer] for [LpplFit]
    #[inline]
    pub fn default_algorithm() -> MinimizerAlgorithm {
        NelderMeadMinimizer::default().into()
    }

    #[inline]
    pub fn default_inits() -> LpplInits {
        LpplInits::Default
    }

    #[inline]
    pub fn default_multi_start() -> MultiStart {
        MultiStart::None
    }

    pub fn algorithm(&self) -> &MinimizerAlgorithm {
        &self.algorithm
    }

    pub fn inits(&self) -> &LpplInits {
        &self.inits
    }

    pub fn multi_start(&self) -> &MultiStart {
        &self.multi_start
    }

    /// Same fit with another minimization method
    pub fn with_algorithm(self, algorithm: impl Into<MinimizerAlgorithm>) -> Self {
        Self {
            algorithm: algorithm.into(),
            ..self
        }
    }

    pub fn doc() -> &'static str {
        LpplParams::doc()
    }

    /// All starting points for the series, the primary one goes first
    pub fn seeds(&self, series: &Series) -> Vec<LpplParams> {
        let primary = self.inits.params_from_series(series);
        self.multi_start.seeds(&primary)
    }

    /// Fit the model to a validated series
    ///
    /// Failure to converge isn't an error here, it is reported by [FitResult::status], use
    /// [FitResult::check] to turn it into one.
    pub fn fit(&self, series: &mut Series) -> Result<FitResult, LpplError> {
        let data = LogPriceData::from_series(series);
        let primary = self.inits.params_from_series(series);
        let seeds = self.multi_start.seeds(&primary);

        let mut best = self.algorithm.minimize(&data, &primary.to_array());
        let mut iterations = best.iterations;
        let mut evaluations = best.evaluations;
        for seed in seeds.iter().skip(1) {
            let result = self.algorithm.minimize(&data, &seed.to_array());
            iterations += result.iterations;
            evaluations += result.evaluations;
            if is_better(&result, &best) {
                best = result;
            }
        }

        Ok(FitResult {
            params: best.x.into(),
            cost: best.cost,
            status: best.termination.into(),
            iterations,
            evaluations,
            seeds: seeds.len(),
        })
    }

    /// Validate observations and fit the model to them
    pub fn fit_observations(&self, observations: &[Observation]) -> Result<FitResult, LpplError> {
        let mut series = Series::new(observations)?;
        self.fit(&mut series)
    }
}

impl Default for LpplFit {
    fn default() -> Self {
        Self::new(
            Self::default_algorithm(),
            Self::default_inits(),
            Self::default_multi_start(),
        )
    }
}

/// Converged run beats a non-converged one, otherwise lower finite cost wins
fn is_better(candidate: &MinimizeResult<NPARAMS>, current: &MinimizeResult<NPARAMS>) -> bool {
    if !candidate.cost.is_finite() {
        return false;
    }
    if !current.cost.is_finite() {
        return true;
    }
    match (candidate.is_converged(), current.is_converged()) {
        (true, false) => true,
        (false, true) => false,
        _ => candidate.cost < current.cost,
    }
}

/// How the fit ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum FitStatus {
    /// Tolerance met
    Converged(TerminationReason),
    /// Budget exhausted or no progress possible, parameters are the best found
    NonConvergence(TerminationReason),
    /// Cost or its gradient became non-finite, see [TerminationReason::NonFiniteCost]
    NumericalFailure,
}

impl FitStatus {
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged(_))
    }
}

impl From<TerminationReason> for FitStatus {
    fn from(reason: TerminationReason) -> Self {
        if reason.is_converged() {
            Self::Converged(reason)
        } else if reason.is_numerical_failure() {
            Self::NumericalFailure
        } else {
            Self::NonConvergence(reason)
        }
    }
}

/// Best-fit parameters with the fit diagnostics
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FitResult {
    pub params: LpplParams,
    /// Sum of squared log-price residuals at `params`
    pub cost: f64,
    pub status: FitStatus,
    /// Total over all seeds
    pub iterations: usize,
    /// Total over all seeds
    pub evaluations: usize,
    /// Number of starting points tried
    pub seeds: usize,
}

impl FitResult {
    #[inline]
    pub fn is_converged(&self) -> bool {
        self.status.is_converged()
    }

    /// Error for a non-converged fit
    pub fn check(&self) -> Result<&Self, LpplError> {
        match self.status {
            FitStatus::Converged(_) => Ok(self),
            FitStatus::NonConvergence(reason) => Err(LpplError::NonConvergence {
                reason,
                iterations: self.iterations,
            }),
            FitStatus::NumericalFailure => Err(LpplError::NumericalFailure { cost: self.cost }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nl_fit::BfgsMinimizer;
    use crate::tests::*;

    use approx::assert_relative_eq;
    use rayon::prelude::*;

    const PARAM: [f64; NPARAMS] = [120.0, 0.5, 7.0, 5.0, -0.05, 0.1, 1.0];
    const NOISE: f64 = 0.005;
    const N: usize = 100;

    fn synthetic_series(seed: u64) -> Vec<Observation> {
        let (timestamps, prices) = lppl_fit_test_util::synthetic_prices(&PARAM, N, NOISE, seed);
        observations(timestamps, prices)
    }

    fn check_recovery(result: &FitResult) {
        assert!(result.params.is_finite(), "{result:?}");
        assert!(
            (result.params.tc - PARAM[0]).abs() <= 0.05 * PARAM[0],
            "tc = {}",
            result.params.tc
        );
        assert!(
            result.cost <= 2.0 * N as f64 * NOISE.powi(2),
            "cost = {}",
            result.cost
        );
    }

    #[test]
    fn synthetic_recovery_bfgs() {
        let obs = synthetic_series(0);
        let fit = LpplFit::new(
            BfgsMinimizer::default().into(),
            LpplInits::fixed(LpplParams::new(125.0, 0.55, 7.3, 5.05, -0.06, 0.09, 0.9)),
            MultiStart::None,
        );
        let result = fit.fit_observations(&obs).unwrap();
        check_recovery(&result);
        assert_eq!(result.seeds, 1);
    }

    #[test]
    fn synthetic_recovery_nelder_mead() {
        let obs = synthetic_series(1);
        let mut init = PARAM;
        init[0] *= 1.03;
        let fit = LpplFit::new(
            LpplFit::default_algorithm(),
            LpplInits::fixed(init.into()),
            MultiStart::None,
        );
        let result = fit.fit_observations(&obs).unwrap();
        check_recovery(&result);
    }

    #[test]
    fn three_point_series_reproducible() {
        let obs = daily_observations(&[100.0, 110.0, 90.0]);
        let fit = LpplFit::default();
        let first = fit.fit_observations(&obs).unwrap();
        assert!(first.cost.is_finite());
        assert_ne!(first.status, FitStatus::NumericalFailure);

        let mut series = Series::new(&obs[..]).unwrap();
        let init_cost = LogPriceData::from_series(&mut series)
            .cost(&LpplInits::default_from_series(&series).to_array());
        assert!(first.cost <= init_cost);

        for _ in 0..3 {
            assert_eq!(fit.fit_observations(&obs).unwrap(), first);
        }
    }

    #[test]
    fn empty_series() {
        let result = LpplFit::default().fit_observations(&[]);
        assert_eq!(result, Err(LpplError::EmptySeries));
        assert!(result.unwrap_err().is_invalid_input());
    }

    #[test]
    fn non_positive_price() {
        let obs = daily_observations(&[100.0, 101.0, -3.0, 102.0]);
        let result = LpplFit::default().fit_observations(&obs);
        assert_eq!(
            result,
            Err(LpplError::NonPositivePrice {
                index: 2,
                price: -3.0
            })
        );
    }

    #[test]
    fn numerical_failure() {
        let obs = synthetic_series(2);
        let mut init = PARAM;
        init[1] = 1000.0;
        for algorithm in [
            MinimizerAlgorithm::from(NelderMeadMinimizer::default()),
            BfgsMinimizer::default().into(),
        ] {
            let fit = LpplFit::new(
                algorithm,
                LpplInits::fixed(init.into()),
                MultiStart::None,
            );
            let result = fit.fit_observations(&obs).unwrap();
            assert_eq!(result.status, FitStatus::NumericalFailure);
            assert_eq!(result.iterations, 0);
            assert_eq!(result.params, LpplParams::from(init));
            assert_eq!(
                result.check(),
                Err(LpplError::NumericalFailure {
                    cost: f64::INFINITY
                })
            );
        }
    }

    #[test]
    fn non_convergence() {
        let obs = synthetic_series(3);
        let fit = LpplFit::default().with_algorithm(NelderMeadMinimizer::new(
            1,
            NelderMeadMinimizer::default_max_evaluations(),
            NelderMeadMinimizer::default_cost_tolerance(),
            NelderMeadMinimizer::default_step_tolerance(),
            NelderMeadMinimizer::default_initial_step(),
            0,
        ));
        let result = fit.fit_observations(&obs).unwrap();
        assert_eq!(
            result.status,
            FitStatus::NonConvergence(TerminationReason::MaxIterations)
        );
        assert!(!result.is_converged());
        assert!(result.cost.is_finite());
        assert_eq!(
            result.check(),
            Err(LpplError::NonConvergence {
                reason: TerminationReason::MaxIterations,
                iterations: 1
            })
        );
    }

    #[test]
    fn multi_start_not_worse() {
        let obs = synthetic_series(4);
        let single = LpplFit::default().fit_observations(&obs).unwrap();
        let multi_start = MultiStart::grid(&[0.0, 50.0, 100.0], &[0.3, 0.5, 0.7], &[6.0, 8.0]);
        let multi = LpplFit::new(
            LpplFit::default_algorithm(),
            LpplFit::default_inits(),
            multi_start,
        )
        .fit_observations(&obs)
        .unwrap();
        assert_eq!(multi.seeds, 3 * 3 * 2);
        if single.is_converged() {
            assert!(multi.is_converged());
            assert!(multi.cost <= single.cost);
        } else {
            assert!(multi.is_converged() || multi.cost <= single.cost);
        }
        assert!(multi.evaluations > single.evaluations);
    }

    fn minimize_result(cost: f64, termination: TerminationReason) -> MinimizeResult<NPARAMS> {
        MinimizeResult {
            x: PARAM,
            cost,
            iterations: 10,
            evaluations: 20,
            termination,
        }
    }

    #[test]
    fn converged_seed_preferred() {
        use TerminationReason::*;

        let stalled = minimize_result(1.0, MaxIterations);
        let converged = minimize_result(2.0, CostTolerance);
        assert!(is_better(&converged, &stalled));
        assert!(!is_better(&stalled, &converged));

        let better_converged = minimize_result(1.5, StepTolerance);
        assert!(is_better(&better_converged, &converged));
        assert!(!is_better(&converged, &better_converged));
    }

    #[test]
    fn lowest_cost_without_converged_seeds() {
        use TerminationReason::*;

        let low = minimize_result(1.0, MaxIterations);
        let high = minimize_result(2.0, LineSearchFailed);
        assert!(is_better(&low, &high));
        assert!(!is_better(&high, &low));

        let failed = minimize_result(f64::INFINITY, NonFiniteCost);
        assert!(is_better(&high, &failed));
        assert!(!is_better(&failed, &high));
        let converged_nan = minimize_result(f64::NAN, CostTolerance);
        assert!(!is_better(&converged_nan, &high));
    }

    #[test]
    fn parallel_window_fits() {
        let obs = synthetic_series(5);
        let series = Series::new(&obs[..]).unwrap();
        let fit = LpplFit::default().with_algorithm(BfgsMinimizer::default());
        let windows: Vec<_> = (0..4).map(|i| (10 * i)..N).collect();

        let sequential: Vec<_> = windows
            .iter()
            .map(|range| fit.fit(&mut series.window(range.clone()).unwrap()).unwrap())
            .collect();
        let parallel: Vec<_> = windows
            .par_iter()
            .map(|range| fit.fit(&mut series.window(range.clone()).unwrap()).unwrap())
            .collect();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn synthetic_exact_model_cost() {
        let obs = lppl_observations(&PARAM, N);
        let fit = LpplFit::new(
            BfgsMinimizer::default().into(),
            LpplInits::fixed(PARAM.into()),
            MultiStart::None,
        );
        let result = fit.fit_observations(&obs).unwrap();
        assert_relative_eq!(result.cost, 0.0, epsilon = 1e-20);
        assert_relative_eq!(&result.params.to_array()[..], &PARAM[..], max_relative = 1e-10);
    }

    #[test]
    fn serde_json_round_trip() {
        let fits = [
            LpplFit::default(),
            LpplFit::new(
                BfgsMinimizer::new(10, 100, 1e-9, 1e-9, 1e-6).into(),
                LpplInits::partial([Some(200.0), None, None, None, None, None, None]),
                MultiStart::grid(&[0.0, 30.0], &[0.5], &[6.0, 9.0]),
            ),
        ];
        for fit in fits {
            let json = serde_json::to_string(&fit).unwrap();
            let back: LpplFit = serde_json::from_str(&json).unwrap();
            assert_eq!(back, fit);
        }

        let result = LpplFit::default()
            .fit_observations(&daily_observations(&[100.0, 110.0, 90.0, 95.0]))
            .unwrap();
        let json = serde_json::to_string(&result).unwrap();
        let back: FitResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, result.status);
        assert_eq!(back.evaluations, result.evaluations);
        assert_relative_eq!(back.cost, result.cost, max_relative = 1e-15);
        assert_relative_eq!(
            &back.params.to_array()[..],
            &result.params.to_array()[..],
            max_relative = 1e-15
        );
    }

    #[test]
    fn json_schema() {
        let schema = schemars::schema_for!(LpplFit);
        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains("NelderMead"));
        assert!(json.contains("Bfgs"));
    }
}
