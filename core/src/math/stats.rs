use std::f64::consts::{PI, TAU};

/// Fractional width of the cosine taper applied before each FFT.
pub const TAPER_WIDTH: f64 = 0.10;

pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Subtracts the arithmetic mean in place.
pub fn demean(samples: &mut [f64]) {
    if samples.is_empty() {
        return;
    }
    let mean = mean(samples);
    samples.iter_mut().for_each(|value| *value -= mean);
}

/// Slope and intercept of the least-squares line through `(i, samples[i])`.
pub fn linear_fit(samples: &[f64]) -> (f64, f64) {
    let n = samples.len() as f64;
    if samples.len() < 2 {
        return (0.0, mean(samples));
    }

    let (mut sum_x, mut sum_y, mut sum_xx, mut sum_xy) = (0.0, 0.0, 0.0, 0.0);
    for (i, &value) in samples.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += value;
        sum_xx += x * x;
        sum_xy += x * value;
    }

    let del = sum_xx - sum_x * sum_x / n;
    let slope = (sum_xy - sum_x * sum_y / n) / del;
    let intercept = (sum_xx * sum_y - sum_x * sum_xy) / (del * n);
    (slope, intercept)
}

/// Removes the least-squares linear trend over sample index, in place.
pub fn detrend(samples: &mut [f64]) {
    let (slope, intercept) = linear_fit(samples);
    for (i, value) in samples.iter_mut().enumerate() {
        *value -= slope * i as f64 + intercept;
    }
}

/// Applies a cosine taper of fractional width `width` to both ends, in place.
///
/// Returns the power-loss term `Wss` used to rescale spectra computed from the
/// tapered data.
pub fn cosine_taper(samples: &mut [f64], width: f64) -> f64 {
    let len = samples.len();
    let ramp = width * len as f64;
    let mut wss = 0.0;

    let mut i = 0;
    while (i as f64) < ramp && i < len {
        let taper = 0.5 * (1.0 - (i as f64 * PI / ramp).cos());
        samples[i] *= taper;
        samples[len - i - 1] *= taper;
        wss += 2.0 * taper * taper;
        i += 1;
    }

    wss + (len as f64 - 2.0 * ramp)
}

/// Wraps an angle in radians into `[0, 2π)`.
pub fn wrap_radians(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Mean direction of a set of angles (radians), in `[0, 2π)`.
pub fn circular_mean(angles: &[f64]) -> f64 {
    if angles.is_empty() {
        return 0.0;
    }
    let (sin_sum, cos_sum) = angles
        .iter()
        .fold((0.0, 0.0), |(s, c), angle| (s + angle.sin(), c + angle.cos()));
    wrap_radians(sin_sum.atan2(cos_sum))
}

/// Sample standard deviation of the angles' signed offsets from `center`.
pub fn circular_deviation(angles: &[f64], center: f64) -> f64 {
    if angles.len() < 2 {
        return 0.0;
    }
    let sum_sq: f64 = angles
        .iter()
        .map(|angle| {
            let offset = (angle - center + PI).rem_euclid(TAU) - PI;
            offset * offset
        })
        .sum();
    (sum_sq / (angles.len() - 1) as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demean_leaves_zero_mean() {
        let mut samples = vec![3.0, -1.5, 8.25, 4.0, 10.0];
        demean(&mut samples);
        assert!(mean(&samples).abs() < 1e-12);
    }

    #[test]
    fn demean_ignores_empty_input() {
        let mut samples: Vec<f64> = Vec::new();
        demean(&mut samples);
        assert!(samples.is_empty());
    }

    #[test]
    fn detrend_removes_slope() {
        let mut samples: Vec<f64> = (0..200)
            .map(|i| 0.75 * i as f64 - 12.0 + (i as f64 * 0.3).sin())
            .collect();
        detrend(&mut samples);
        let (slope, intercept) = linear_fit(&samples);
        assert!(slope.abs() < 1e-10);
        assert!(intercept.abs() < 1e-8);
    }

    #[test]
    fn taper_matches_closed_form() {
        let len = 100;
        let width = 0.1;
        let mut samples = vec![1.0; len];
        let wss = cosine_taper(&mut samples, width);

        let ramp = width * len as f64;
        let expected: f64 = (0..10)
            .map(|i| {
                let taper = 0.5 * (1.0 - (i as f64 * PI / ramp).cos());
                2.0 * taper * taper
            })
            .sum::<f64>()
            + (len as f64 - 2.0 * ramp);

        assert!((wss - expected).abs() < 1e-12);
        assert_eq!(samples[0], 0.0);
        assert_eq!(samples[len - 1], 0.0);
        assert_eq!(samples[50], 1.0);
    }

    #[test]
    fn circular_mean_handles_wraparound() {
        let angles = [359.0_f64.to_radians(), 1.0_f64.to_radians()];
        let center = circular_mean(&angles);
        let offset = (center + PI).rem_euclid(TAU) - PI;
        assert!(offset.abs() < 1e-9);
        let spread = circular_deviation(&angles, center);
        assert!((spread - 2.0_f64.sqrt().to_radians()).abs() < 1e-9);
    }
}
