mod observation;
pub use observation::Observation;

mod series;
pub use series::Series;

mod time_index;
pub use time_index::time_index;
