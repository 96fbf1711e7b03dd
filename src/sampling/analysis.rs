//! Post-processing of a finished run: response functions from the final
//! moments, and error bars from the sampled energy series.

use serde::Serialize;

use super::estimators::{EstimatorAccumulator, Observable};

/// Thermodynamic estimates derived from a finished accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thermodynamics {
    pub temperature: f64,
    /// `<e>` per site.
    pub energy: f64,
    /// Standard error of `<e>` from blocking.
    pub energy_error: f64,
    /// Integrated autocorrelation time of the energy series, in samples.
    pub autocorrelation_time: f64,
    /// `N (<e^2> - <e>^2) / T^2`.
    pub specific_heat: f64,
    /// `<m>` per site.
    pub magnetization: f64,
    /// `N (<m^2> - <m>^2) / T`.
    pub susceptibility: f64,
    pub staggered_magnetization: f64,
    pub staggered_susceptibility: f64,
    /// `1 - <m^4> / (3 <m^2>^2)`.
    pub binder_cumulant: f64,
}

impl Thermodynamics {
    pub fn from_estimators(estimators: &EstimatorAccumulator, temperature: f64) -> Self {
        let n = estimators.number_sites() as f64;
        let moment = |observable, power| estimators.moment(observable, power).unwrap_or(f64::NAN);

        let e1 = moment(Observable::Energy, 1);
        let e2 = moment(Observable::Energy, 2);
        let m1 = moment(Observable::Magnetization, 1);
        let m2 = moment(Observable::Magnetization, 2);
        let m4 = moment(Observable::Magnetization, 4);
        let s1 = moment(Observable::Staggered, 1);
        let s2 = moment(Observable::Staggered, 2);

        let energies = estimators.trace().energies();
        let autocorrelation_time = autocorrelation_time(&energies);

        Self {
            temperature,
            energy: e1,
            energy_error: blocking_error(&energies, autocorrelation_time),
            autocorrelation_time,
            specific_heat: n * (e2 - e1 * e1) / (temperature * temperature),
            magnetization: m1,
            susceptibility: n * (m2 - m1 * m1) / temperature,
            staggered_magnetization: s1,
            staggered_susceptibility: n * (s2 - s1 * s1) / temperature,
            binder_cumulant: 1.0 - m4 / (3.0 * m2 * m2),
        }
    }
}

/// Integrated autocorrelation time, summed over the initial positive sequence.
pub fn autocorrelation_time(series: &[f64]) -> f64 {
    let n = series.len();
    if n < 2 {
        return 1.0;
    }
    let mean = series.iter().sum::<f64>() / n as f64;
    let var = series.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n as f64;

    // a constant series leaves only rounding noise around its mean
    if var <= f64::EPSILON * mean.abs().max(1.0).powi(2) {
        return 1.0;
    }

    let mut tau = 1.0;
    for lag in 1..n / 2 {
        let rho: f64 = series[..n - lag]
            .iter()
            .zip(&series[lag..])
            .map(|(&x, &y)| (x - mean) * (y - mean))
            .sum::<f64>()
            / ((n - lag) as f64 * var);

        if rho < 0.0 {
            break;
        }
        tau += 2.0 * rho;
    }
    tau
}

/// Standard error of the mean from blocks of `ceil(2 tau)` samples.
///
/// Zero when fewer than two blocks fit in the series.
pub fn blocking_error(series: &[f64], autocorrelation_time: f64) -> f64 {
    let block_size = ((2.0 * autocorrelation_time).ceil() as usize).max(1);
    let n_blocks = series.len() / block_size;

    if n_blocks < 2 {
        return 0.0;
    }

    let block_means: Vec<f64> = series
        .chunks_exact(block_size)
        .map(|block| block.iter().sum::<f64>() / block_size as f64)
        .collect();

    let mean = block_means.iter().sum::<f64>() / n_blocks as f64;
    let variance = block_means.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / (n_blocks - 1) as f64;

    (variance / n_blocks as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_series() {
        let series = vec![0.7; 100];
        assert_relative_eq!(autocorrelation_time(&series), 1.0);
        assert_relative_eq!(blocking_error(&series, 1.0), 0.0);
    }

    #[test]
    fn test_frozen_series_with_inexact_mean() {
        // per-site energy of a frozen run with couplings that are not exact in binary
        let series = vec![-0.3 * 4.0 / 3.0; 1000];
        let tau = autocorrelation_time(&series);
        assert_relative_eq!(tau, 1.0);
        assert!(blocking_error(&series, tau) < 1e-12);
    }

    #[test]
    fn test_alternating_series_uncorrelated() {
        // lag-1 correlation is -1, so the sum stops immediately
        let series: Vec<f64> = (0..50).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert_relative_eq!(autocorrelation_time(&series), 1.0);
    }

    #[test]
    fn test_correlated_series() {
        // runs of 10 identical values: strongly correlated at short lags
        let series: Vec<f64> = (0..400).map(|i| ((i / 10) % 2) as f64).collect();
        assert!(autocorrelation_time(&series) > 3.0);
    }

    #[test]
    fn test_blocking_error_two_blocks() {
        let series = [0.0, 0.0, 2.0, 2.0];
        // block means 0 and 2, sample variance 2, error sqrt(2 / 2)
        assert_relative_eq!(blocking_error(&series, 1.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(blocking_error(&series, 2.0), 0.0);
    }

    #[test]
    fn test_thermodynamics_from_moments() {
        let mut estimators = EstimatorAccumulator::new(4, 1);
        // energy, magnetization, staggered, sublattice 0
        estimators.record_values(0, &[-1.0, 1.0, 1.0, 1.0]);
        estimators.record_values(1, &[-2.0, -1.0, -1.0, -1.0]);

        let thermo = Thermodynamics::from_estimators(&estimators, 2.0);
        assert_relative_eq!(thermo.energy, -1.5);
        // N (<e^2> - <e>^2) / T^2 = 4 * (2.5 - 2.25) / 4
        assert_relative_eq!(thermo.specific_heat, 0.25, epsilon = 1e-12);
        // N (<m^2> - <m>^2) / T = 4 * 1 / 2
        assert_relative_eq!(thermo.susceptibility, 2.0, epsilon = 1e-12);
        assert_relative_eq!(thermo.binder_cumulant, 2.0 / 3.0, epsilon = 1e-12);
    }
}
