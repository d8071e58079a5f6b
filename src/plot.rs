//! PNG rendering of observed prices against the fitted model

use crate::data::{Observation, time_index};
use crate::error::PlotError;
use crate::model::LpplParams;

use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PlotOptions {
    /// Image width, px
    pub width: u32,
    /// Image height, px
    pub height: u32,
    pub caption: String,
    /// Number of model evaluations along the time axis
    pub samples: usize,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            caption: "LPPL model".to_owned(),
            samples: 500,
        }
    }
}

/// Model price `exp(y(t))` sampled uniformly over `[0, t_max]`, non-finite values are dropped
pub fn model_curve(params: &LpplParams, t_max: f64, samples: usize) -> Vec<(f64, f64)> {
    let samples = samples.max(2);
    let step = t_max / (samples - 1) as f64;
    (0..samples)
        .map(|i| {
            let t = step * i as f64;
            (t, params.value(t).exp())
        })
        .filter(|(_, price)| price.is_finite())
        .collect()
}

/// Inclusive range of finite values padded by 5% on each side, `0..1` if there are none
fn padded_range(values: impl Iterator<Item = f64>) -> std::ops::Range<f64> {
    let (min, max) = values
        .filter(|x| x.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), x| {
            (min.min(x), max.max(x))
        });
    if min > max {
        return 0.0..1.0;
    }
    let pad = match max - min {
        width if width > 0.0 => 0.05 * width,
        _ => 0.05 * max.abs().max(1.0),
    };
    (min - pad)..(max + pad)
}

/// Draw observed prices as blue points and the model as a red line into a PNG file
pub fn render_fit(
    path: impl AsRef<Path>,
    observations: &[Observation],
    params: &LpplParams,
    options: &PlotOptions,
) -> Result<(), PlotError> {
    let t = time_index(observations)?;
    let t_max = t[t.len() - 1].max(1.0);
    let observed: Vec<_> = t
        .iter()
        .zip(observations)
        .map(|(&t, obs)| (t, obs.price))
        .collect();
    let model = model_curve(params, t_max, options.samples);
    let y_range = padded_range(observed.iter().chain(model.iter()).map(|&(_, price)| price));

    let drawing_error = |err: DrawingAreaErrorKind<_>| PlotError::Drawing(err.to_string());

    let root =
        BitMapBackend::new(path.as_ref(), (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE).map_err(drawing_error)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&options.caption, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..t_max, y_range)
        .map_err(drawing_error)?;
    chart
        .configure_mesh()
        .x_desc("Days since the first observation")
        .y_desc("Price")
        .draw()
        .map_err(drawing_error)?;
    chart
        .draw_series(
            observed
                .iter()
                .map(|&point| Circle::new(point, 3, BLUE.filled())),
        )
        .map_err(drawing_error)?
        .label("Observed")
        .legend(|(x, y)| Circle::new((x, y), 3, BLUE.filled()));
    chart
        .draw_series(LineSeries::new(model, &RED))
        .map_err(drawing_error)?
        .label("LPPL")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(drawing_error)?;
    root.present().map_err(drawing_error)?;
    Ok(())
}
