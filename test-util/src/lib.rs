use chrono::{DateTime, Duration, TimeZone, Utc};
use lppl_fit::lppl;
use rand::prelude::*;
use rand_distr::Normal;

/// Daily Bitcoin prices from 2025-03-11 to 2025-04-10 in the CoinMarketCap export format,
/// newest first
pub const COINMARKETCAP_SAMPLE: &str = include_str!("../data/bitcoin_coinmarketcap_sample.csv");

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap()
}

/// Daily prices following the LPPL model with log-normal noise
///
/// `noise` is the standard deviation of the log-price noise.
pub fn synthetic_prices(
    param: &[f64; 7],
    n: usize,
    noise: f64,
    seed: u64,
) -> (Vec<DateTime<Utc>>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, noise).unwrap();
    (0..n)
        .map(|i| {
            let timestamp = start() + Duration::days(i as i64);
            let ln_price = lppl(i as f64, param) + normal.sample(&mut rng);
            (timestamp, ln_price.exp())
        })
        .unzip()
}

/// Random walk sampled with random gaps from one hour to three days
pub fn irregular_prices(n: usize, seed: u64) -> (Vec<DateTime<Utc>>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut timestamp = start();
    let mut ln_price = 100.0_f64.ln();
    (0..n)
        .map(|_| {
            let item = (timestamp, ln_price.exp());
            timestamp += Duration::hours(rng.random_range(1..=72));
            ln_price += rng.random_range(-0.05..0.05);
            item
        })
        .unzip()
}
