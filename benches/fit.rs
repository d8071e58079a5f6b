use criterion::Criterion;
use lppl_fit::io::{CsvFormat, load_observations};
use lppl_fit::{
    BfgsMinimizer, LogPriceData, LpplFit, LpplInits, MinimizerAlgorithm, MultiStart,
    NelderMeadMinimizer, Observation, Series,
};
use lppl_fit_test_util::{COINMARKETCAP_SAMPLE, synthetic_prices};
use std::hint::black_box;

const PARAM: [f64; 7] = [120.0, 0.5, 7.0, 5.0, -0.05, 0.1, 1.0];

fn synthetic_observations(n: usize) -> Vec<Observation> {
    let (timestamps, prices) = synthetic_prices(&PARAM, n, 0.01, 0);
    timestamps.into_iter().zip(prices).map(Into::into).collect()
}

fn algorithms() -> [(&'static str, MinimizerAlgorithm); 2] {
    [
        ("Nelder-Mead", NelderMeadMinimizer::default().into()),
        ("BFGS", BfgsMinimizer::default().into()),
    ]
}

pub fn bench_cost(c: &mut Criterion) {
    for n in [30, 100, 1000] {
        let observations = synthetic_observations(n);
        let mut series = Series::new(&observations[..]).unwrap();
        let data = LogPriceData::from_series(&mut series);
        let mut grad = [0.0; 7];

        c.bench_function(&format!("LPPL cost, n = {n}"), |b| {
            b.iter(|| data.cost(black_box(&PARAM)));
        });
        c.bench_function(&format!("LPPL cost and gradient, n = {n}"), |b| {
            b.iter(|| data.cost_gradient(black_box(&PARAM), &mut grad));
        });
    }
}

pub fn bench_fit_synthetic(c: &mut Criterion) {
    let observations = synthetic_observations(100);
    let init = [125.0, 0.55, 7.3, 5.05, -0.06, 0.09, 0.9];

    for (name, algorithm) in algorithms() {
        let fit = LpplFit::new(algorithm, LpplInits::fixed(init.into()), MultiStart::None);
        c.bench_function(&format!("LPPL synthetic fit: {name}"), |b| {
            b.iter(|| fit.fit_observations(black_box(&observations)));
        });
    }
}

pub fn bench_fit_sample(c: &mut Criterion) {
    let loaded = load_observations(COINMARKETCAP_SAMPLE.as_bytes(), &CsvFormat::default()).unwrap();

    for (name, algorithm) in algorithms() {
        let fit = LpplFit::default().with_algorithm(algorithm);
        c.bench_function(&format!("LPPL CoinMarketCap sample fit: {name}"), |b| {
            b.iter(|| fit.fit(&mut loaded.series().unwrap()));
        });
    }
}
