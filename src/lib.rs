#![doc = include_str!("../README.md")]

#[cfg(test)]
mod tests;

mod cost;
pub use cost::{LogPriceData, cost};

mod data;
pub use data::{Observation, Series, time_index};

mod error;
#[cfg(feature = "plot")]
pub use error::PlotError;
#[cfg(feature = "csv")]
pub use error::{LoadError, SkipReason};
pub use error::LpplError;

mod fit;
pub use fit::{FitResult, FitStatus, LpplFit};

mod inits;
pub use inits::{LpplInits, MultiStart};

#[cfg(feature = "csv")]
pub mod io;

mod model;
pub use model::{LpplParams, NPARAMS, lppl, lppl_derivatives};

pub mod nl_fit;
pub use nl_fit::{
    BfgsMinimizer, MinimizeResult, MinimizeTrait, MinimizerAlgorithm, NelderMeadMinimizer,
    Objective, TerminationReason,
};

#[cfg(feature = "plot")]
pub mod plot;

mod report;

pub use chrono;
pub use ndarray;
