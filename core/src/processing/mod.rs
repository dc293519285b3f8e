pub mod filter;
pub mod psd;

pub use filter::{band_filter, band_filter_series};
pub use psd::{power_spectral_density, spectral_calc, welch, SpectralEstimate};
