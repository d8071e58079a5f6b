use crate::nl_fit::TerminationReason;

/// Error returned from the LPPL fitting core
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum LpplError {
    #[error("time series is empty")]
    EmptySeries,

    #[error("price must be positive and finite, found {price} at observation {index}")]
    NonPositivePrice { index: usize, price: f64 },

    #[error("observations must be sorted by time, observation {index} precedes its predecessor")]
    UnsortedSeries { index: usize },

    #[error("parameter vector must have exactly 7 components, found {actual}")]
    WrongParameterCount { actual: usize },

    #[error("time index length {time_index} differs from the number of observations {observations}")]
    LengthMismatch {
        observations: usize,
        time_index: usize,
    },

    #[error("objective or its gradient is not finite at the current point, cost {cost}")]
    NumericalFailure { cost: f64 },

    #[error("fit did not converge after {iterations} iterations: {reason}")]
    NonConvergence {
        reason: TerminationReason,
        iterations: usize,
    },
}

impl LpplError {
    /// True for errors caused by the input data or the parameter vector shape, which are
    /// detected before the optimizer starts
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::EmptySeries
                | Self::NonPositivePrice { .. }
                | Self::UnsortedSeries { .. }
                | Self::WrongParameterCount { .. }
                | Self::LengthMismatch { .. }
        )
    }
}

/// Error returned from [crate::io::load_observations]
#[cfg(feature = "csv")]
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("no valid rows found, {skipped} rows skipped")]
    NoRows { skipped: usize },
}

/// Why a CSV row was skipped by [crate::io::load_observations]
#[cfg(feature = "csv")]
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum SkipReason {
    #[error("missing column {0}")]
    MissingColumn(usize),

    #[error("cannot parse timestamp {value:?}: {message}")]
    InvalidTimestamp { value: String, message: String },

    #[error("cannot parse price {0:?}")]
    InvalidPrice(String),

    #[error("price must be positive and finite, found {0}")]
    NonPositivePrice(f64),

    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Error returned from [crate::plot::render_fit]
#[cfg(feature = "plot")]
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PlotError {
    #[error("cannot plot observations: {0}")]
    Input(#[from] LpplError),

    #[error("drawing failed: {0}")]
    Drawing(String),
}
