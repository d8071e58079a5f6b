use crate::fit::{FitResult, FitStatus};
use crate::model::LpplParams;

use std::fmt;

impl LpplParams {
    /// Human-readable parameter values, one per line
    ///
    /// The critical time is printed with two decimals in days, the rest with four.
    pub fn report_lines(&self) -> Vec<String> {
        let [tc, rest @ ..] = Self::names();
        let values = self.to_array();
        std::iter::once(format!("{tc}: {:.2} days", values[0]))
            .chain(
                rest.iter()
                    .zip(values[1..].iter())
                    .map(|(name, value)| format!("{name}: {value:.4}")),
            )
            .collect()
    }
}

impl fmt::Display for FitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Converged(reason) => write!(f, "converged ({reason})"),
            Self::NonConvergence(reason) => write!(f, "not converged ({reason})"),
            Self::NumericalFailure => f.write_str("numerical failure"),
        }
    }
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.params.report_lines() {
            writeln!(f, "{line}")?;
        }
        writeln!(f, "cost: {:.6e}", self.cost)?;
        writeln!(f, "status: {}", self.status)?;
        write!(
            f,
            "iterations: {}, evaluations: {}, seeds: {}",
            self.iterations, self.evaluations, self.seeds
        )
    }
}
