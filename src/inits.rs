use crate::data::Series;
use crate::model::{LpplParams, NPARAMS};

use itertools::iproduct;
use ordered_float::NotNan;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Starting point of the LPPL fit
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[non_exhaustive]
pub enum LpplInits {
    /// Heuristic guess, see [LpplInits::default_from_series]
    Default,
    /// Fixed starting point
    Fixed(Box<LpplParams>),
    /// Fixed values for some of the parameters, the rest is filled with the heuristic guess
    Partial(Box<[Option<f64>; NPARAMS]>),
}

impl Default for LpplInits {
    fn default() -> Self {
        Self::Default
    }
}

impl LpplInits {
    pub fn fixed(params: LpplParams) -> Self {
        Self::Fixed(params.into())
    }

    /// Parameters are in the [LpplParams] order
    pub fn partial(params: [Option<f64>; NPARAMS]) -> Self {
        Self::Partial(params.into())
    }

    /// Heuristic starting point
    ///
    /// The critical time is put 30 days after the number of observations, other parameters are
    /// typical bubble values except `A` which is the log of the first price. The guess doesn't
    /// depend on the shape of the series.
    pub fn default_from_series(series: &Series) -> LpplParams {
        LpplParams {
            tc: series.lenf() + 30.0,
            m: 0.7,
            omega: 8.0,
            a: series.first().price.ln(),
            b: -1.0,
            c: 0.1,
            phi: 0.0,
        }
    }

    pub fn params_from_series(&self, series: &Series) -> LpplParams {
        match self {
            Self::Default => Self::default_from_series(series),
            Self::Fixed(params) => **params,
            Self::Partial(partial) => {
                let default = Self::default_from_series(series).to_array();
                let params: [f64; NPARAMS] =
                    std::array::from_fn(|i| partial[i].unwrap_or(default[i]));
                params.into()
            }
        }
    }
}

/// Additional starting points around the primary one
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum MultiStart {
    /// Primary starting point only
    None,
    /// Cartesian product of critical time shifts and `m` and `omega` values
    ///
    /// Each seed is the primary starting point with `tc` shifted by one of `tc_shifts` days and
    /// `m` and `omega` replaced. Seeds equal to the primary one are skipped.
    Grid {
        tc_shifts: Vec<NotNan<f64>>,
        m: Vec<NotNan<f64>>,
        omega: Vec<NotNan<f64>>,
    },
}

impl Default for MultiStart {
    fn default() -> Self {
        Self::None
    }
}

impl MultiStart {
    /// Grid of seeds, panics if any value is NaN
    pub fn grid(tc_shifts: &[f64], m: &[f64], omega: &[f64]) -> Self {
        let not_nan = |values: &[f64]| -> Vec<NotNan<f64>> {
            values
                .iter()
                .map(|&x| NotNan::new(x).expect("multi-start grid values must not be NaN"))
                .collect()
        };
        Self::Grid {
            tc_shifts: not_nan(tc_shifts),
            m: not_nan(m),
            omega: not_nan(omega),
        }
    }

    /// All starting points, the primary one goes first
    pub fn seeds(&self, primary: &LpplParams) -> Vec<LpplParams> {
        let mut seeds = vec![*primary];
        if let Self::Grid { tc_shifts, m, omega } = self {
            seeds.extend(
                iproduct!(tc_shifts, m, omega)
                    .map(|(tc_shift, &m, &omega)| LpplParams {
                        tc: primary.tc + tc_shift.into_inner(),
                        m: m.into_inner(),
                        omega: omega.into_inner(),
                        ..*primary
                    })
                    .filter(|seed| seed != primary),
            );
        }
        seeds
    }
}
