use crate::data::observation::Observation;
use crate::data::time_index::time_index;
use crate::error::LpplError;

use ndarray::Array1;
use std::borrow::Cow;

/// Validated price time series to be fitted
///
/// The series caches derived arrays, like elapsed time and log-price, that's why a mutable
/// reference is required to get them. Observations themselves are never modified.
#[derive(Clone, Debug)]
pub struct Series<'a> {
    observations: Cow<'a, [Observation]>,
    t: Option<Array1<f64>>,
    ln_price: Option<Array1<f64>>,
}

macro_rules! series_getter {
    ($attr: ident, $getter: ident, $func: expr) => {
        // This lint is false-positive in macros
        // https://github.com/rust-lang/rust-clippy/issues/1553
        #[allow(clippy::redundant_closure_call)]
        pub fn $getter(&mut self) -> &Array1<f64> {
            if self.$attr.is_none() {
                self.$attr = Some($func(self));
            }
            self.$attr.as_ref().unwrap()
        }
    };
}

impl<'a> Series<'a> {
    /// Construct [Series] from a slice or a vector of observations
    ///
    /// Observations must be non-empty, sorted by time, and have positive finite prices.
    pub fn new(observations: impl Into<Cow<'a, [Observation]>>) -> Result<Self, LpplError> {
        let observations = observations.into();
        validate_observations(&observations)?;
        Ok(Self {
            observations,
            t: None,
            ln_price: None,
        })
    }

    /// Series length
    #[inline]
    pub fn lenu(&self) -> usize {
        self.observations.len()
    }

    /// Float approximating series length
    #[inline]
    pub fn lenf(&self) -> f64 {
        self.lenu() as f64
    }

    #[inline]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    #[inline]
    pub fn first(&self) -> &Observation {
        // Non-emptiness is checked by the constructor
        &self.observations[0]
    }

    #[inline]
    pub fn last(&self) -> &Observation {
        &self.observations[self.lenu() - 1]
    }

    /// Sub-series of observations in the index range, it is validated as a new series
    pub fn window(&self, range: std::ops::Range<usize>) -> Result<Series<'_>, LpplError> {
        Series::new(&self.observations[range])
    }

    series_getter!(t, get_t, |s: &mut Series| {
        // Sorting is checked by the constructor
        time_index(&s.observations).unwrap_or_default()
    });

    series_getter!(ln_price, get_ln_price, |s: &mut Series| {
        s.observations.iter().map(|obs| obs.price.ln()).collect()
    });
}

fn validate_observations(observations: &[Observation]) -> Result<(), LpplError> {
    if observations.is_empty() {
        return Err(LpplError::EmptySeries);
    }
    for (index, obs) in observations.iter().enumerate() {
        if !obs.is_price_valid() {
            return Err(LpplError::NonPositivePrice {
                index,
                price: obs.price,
            });
        }
        if index > 0 && obs.timestamp < observations[index - 1].timestamp {
            return Err(LpplError::UnsortedSeries { index });
        }
    }
    Ok(())
}
