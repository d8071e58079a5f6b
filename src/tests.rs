pub use crate::data::Observation;
pub use crate::model::{NPARAMS, lppl};

pub use chrono::{DateTime, Duration, TimeZone, Utc};
pub use rand::prelude::*;

/// Midnight UTC of the first observation of the daily helpers
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap()
}

pub fn observations(timestamps: Vec<DateTime<Utc>>, prices: Vec<f64>) -> Vec<Observation> {
    assert_eq!(timestamps.len(), prices.len());
    timestamps.into_iter().zip(prices).map(Into::into).collect()
}

/// One observation per day starting from [t0]
pub fn daily_observations(prices: &[f64]) -> Vec<Observation> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &price)| Observation::new(t0() + Duration::days(i as i64), price))
        .collect()
}

/// Daily noiseless prices following the LPPL model
pub fn lppl_observations(param: &[f64; NPARAMS], n: usize) -> Vec<Observation> {
    let prices: Vec<_> = (0..n).map(|i| lppl(i as f64, param).exp()).collect();
    daily_observations(&prices)
}

pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    assert!(n > 1);
    let step = (end - start) / (n - 1) as f64;
    (0..n).map(|i| start + step * i as f64).collect()
}
