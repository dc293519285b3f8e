pub mod fft;
pub mod least_squares;
pub mod stats;

pub use fft::FftHelper;
pub use least_squares::{LeastSquaresModel, LevenbergMarquardt, Optimum, SolverConfig};
pub use stats::{cosine_taper, demean, detrend, TAPER_WIDTH};
