use crate::data::{Observation, Series};
use crate::error::LpplError;
use crate::model::{NPARAMS, lppl, lppl_derivatives};
use crate::nl_fit::Objective;

use ndarray::{Array1, Zip};

/// Sum of squared log-price residuals of the LPPL model
///
/// `time_index` must be the output of [crate::time_index] for the same observations. Inputs are
/// validated on every call, prefer [LogPriceData] when the cost is evaluated repeatedly.
pub fn cost(
    params: &[f64],
    observations: &[Observation],
    time_index: &[f64],
) -> Result<f64, LpplError> {
    let params: [f64; NPARAMS] = params
        .try_into()
        .map_err(|_| LpplError::WrongParameterCount {
            actual: params.len(),
        })?;
    if observations.len() != time_index.len() {
        return Err(LpplError::LengthMismatch {
            observations: observations.len(),
            time_index: time_index.len(),
        });
    }
    if let Some((index, obs)) = observations
        .iter()
        .enumerate()
        .find(|(_, obs)| !obs.is_price_valid())
    {
        return Err(LpplError::NonPositivePrice {
            index,
            price: obs.price,
        });
    }
    Ok(observations
        .iter()
        .zip(time_index)
        .map(|(obs, &t)| (obs.price.ln() - lppl(t, &params)).powi(2))
        .sum())
}

/// Elapsed time and log-price arrays captured by the fit objective
///
/// Both are derived once from a [Series], so the cost evaluation does nothing but the model
/// evaluation and the summation.
#[derive(Clone, Debug)]
pub struct LogPriceData {
    pub t: Array1<f64>,
    pub ln_price: Array1<f64>,
}

impl LogPriceData {
    pub fn from_series(series: &mut Series) -> Self {
        Self {
            t: series.get_t().clone(),
            ln_price: series.get_ln_price().clone(),
        }
    }

    #[inline]
    pub fn lenu(&self) -> usize {
        self.t.len()
    }

    /// Sum of squared residuals
    pub fn cost(&self, params: &[f64; NPARAMS]) -> f64 {
        Zip::from(&self.t)
            .and(&self.ln_price)
            .fold(0.0, |acc, &t, &ln_price| {
                acc + (ln_price - lppl(t, params)).powi(2)
            })
    }

    /// Sum of squared residuals and its gradient, which is written into `grad`
    pub fn cost_gradient(&self, params: &[f64; NPARAMS], grad: &mut [f64; NPARAMS]) -> f64 {
        *grad = [0.0; NPARAMS];
        let mut jac = [0.0; NPARAMS];
        let mut sum = 0.0;
        Zip::from(&self.t)
            .and(&self.ln_price)
            .for_each(|&t, &ln_price| {
                let residual = ln_price - lppl(t, params);
                sum += residual.powi(2);
                lppl_derivatives(t, params, &mut jac);
                for (g, d) in grad.iter_mut().zip(jac.iter()) {
                    *g -= 2.0 * residual * d;
                }
            });
        sum
    }

    /// Residuals of the observed log-price relative to the model
    pub fn residuals(&self, params: &[f64; NPARAMS]) -> Array1<f64> {
        Zip::from(&self.t)
            .and(&self.ln_price)
            .map_collect(|&t, &ln_price| ln_price - lppl(t, params))
    }
}

impl Objective<NPARAMS> for LogPriceData {
    #[inline]
    fn value(&self, x: &[f64; NPARAMS]) -> f64 {
        self.cost(x)
    }

    #[inline]
    fn gradient(&self, x: &[f64; NPARAMS], grad: &mut [f64; NPARAMS]) -> f64 {
        self.cost_gradient(x, grad)
    }
}
