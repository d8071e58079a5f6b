use crate::data::observation::Observation;
use crate::error::LpplError;

use ndarray::Array1;

const MILLISECONDS_PER_DAY: f64 = 86_400_000.0;

/// Elapsed time in days since the first observation
///
/// The first value is always zero, fractional days are kept with millisecond resolution. Gaps
/// between observations don't have to be uniform, but timestamps must not decrease.
pub fn time_index(observations: &[Observation]) -> Result<Array1<f64>, LpplError> {
    let start = observations.first().ok_or(LpplError::EmptySeries)?.timestamp;
    let mut previous = start;
    observations
        .iter()
        .enumerate()
        .map(|(index, obs)| {
            if obs.timestamp < previous {
                return Err(LpplError::UnsortedSeries { index });
            }
            previous = obs.timestamp;
            Ok((obs.timestamp - start).num_milliseconds() as f64 / MILLISECONDS_PER_DAY)
        })
        .collect()
}
