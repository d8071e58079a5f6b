use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single price quote
///
/// `price` must be positive, the log-price is what the model describes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl Observation {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }

    #[inline]
    pub fn is_price_valid(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }
}

impl From<(DateTime<Utc>, f64)> for Observation {
    fn from((timestamp, price): (DateTime<Utc>, f64)) -> Self {
        Self::new(timestamp, price)
    }
}
