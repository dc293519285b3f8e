pub mod noise_model;
pub mod response;
pub mod store;
pub mod timeseries;

pub use noise_model::NoiseModel;
pub use response::{FrequencyResponse, PoleZeroResponse, ResponseUnit};
pub use store::MultiSeriesStore;
pub use timeseries::{TimeSeries, ONE_HZ_INTERVAL};
