//! Online moments of the sampled observables.
//!
//! Every tracked observable keeps one running mean per power in
//! [`MOMENT_POWERS`]. The slot of `(observable, power)` is fixed when the
//! accumulator is created; updates iterate over the table, never look anything
//! up by name.

use nalgebra::Vector3;
use serde::Serialize;

use crate::model::SpinModel;

/// Powers whose running means are tracked for every observable.
pub const MOMENT_POWERS: [i32; 4] = [1, 2, 3, 4];

/// A scalar quantity measured at every sample, per site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Observable {
    Energy,
    /// Order parameter of the total magnetization.
    Magnetization,
    /// Order parameter of the sublattice moments summed with alternating signs.
    Staggered,
    /// Order parameter of one sublattice.
    Sublattice(usize),
}

impl Observable {
    /// Every observable tracked for a lattice with `number_sublattices` sublattices.
    pub fn tracked(number_sublattices: usize) -> Vec<Observable> {
        let mut observables = vec![Self::Energy, Self::Magnetization, Self::Staggered];
        observables.extend((0..number_sublattices).map(Self::Sublattice));
        observables
    }

    pub fn name(&self) -> String {
        match self {
            Self::Energy => "energy".to_string(),
            Self::Magnetization => "magnetization".to_string(),
            Self::Staggered => "staggered".to_string(),
            Self::Sublattice(k) => format!("sublattice{k}"),
        }
    }

    /// Intensive value of the observable for one configuration.
    pub fn measure<M: SpinModel>(
        &self,
        energy: f64,
        magnetization: &[Vector3<f64>],
        number_sites: usize,
    ) -> f64 {
        let n = number_sites as f64;
        match self {
            Self::Energy => energy / n,
            Self::Magnetization => M::project(&magnetization.iter().sum::<Vector3<f64>>()) / n,
            Self::Staggered => M::project(&staggered_moment(magnetization)) / n,
            Self::Sublattice(k) => M::project(&magnetization[*k]) / n,
        }
    }
}

/// Sublattice moments summed with sign `+` on even ids and `-` on odd ids.
pub fn staggered_moment(magnetization: &[Vector3<f64>]) -> Vector3<f64> {
    magnetization
        .iter()
        .enumerate()
        .fold(Vector3::zeros(), |acc, (k, m)| if k % 2 == 0 { acc + m } else { acc - m })
}

/// Cumulative moving average after one more sample; `n` is the count before it.
pub fn update_running_mean(mean: f64, sample: f64, n: usize) -> f64 {
    mean + (sample - mean) / (n + 1) as f64
}

/// One sample as recorded in the trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRow {
    pub sweep: usize,
    /// Instantaneous energy per site.
    pub energy: f64,
    /// Instantaneous magnetization per site.
    pub magnetization: f64,
    /// Running moments after this sample, ordered like the trace columns.
    pub moments: Vec<f64>,
}

/// Sweep-indexed record of every sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationTrace {
    pub columns: Vec<String>,
    pub rows: Vec<TraceRow>,
}

impl SimulationTrace {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Instantaneous energies in sample order.
    pub fn energies(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.energy).collect()
    }

    pub fn magnetizations(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.magnetization).collect()
    }
}

/// Running moments of every tracked observable plus the sample trace.
#[derive(Debug, Clone)]
pub struct EstimatorAccumulator {
    number_sites: usize,
    observables: Vec<Observable>,
    /// `moments[o][p]` is the running mean of `x_o ^ MOMENT_POWERS[p]`.
    moments: Vec<[f64; MOMENT_POWERS.len()]>,
    samples: usize,
    trace: SimulationTrace,
}

impl EstimatorAccumulator {
    pub fn new(number_sites: usize, number_sublattices: usize) -> Self {
        let observables = Observable::tracked(number_sublattices);

        let mut columns = vec![
            "sweep".to_string(),
            "energy".to_string(),
            "magnetization".to_string(),
        ];
        for observable in &observables {
            for power in MOMENT_POWERS {
                columns.push(format!("{}_{}", observable.name(), power));
            }
        }

        Self {
            number_sites,
            moments: vec![[0.0; MOMENT_POWERS.len()]; observables.len()],
            observables,
            samples: 0,
            trace: SimulationTrace {
                columns,
                rows: Vec::new(),
            },
        }
    }

    pub fn number_sites(&self) -> usize {
        self.number_sites
    }

    pub fn observables(&self) -> &[Observable] {
        &self.observables
    }

    /// Number of samples taken so far.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Running mean of `x^power` for `power` in 1..=4.
    pub fn moment(&self, observable: Observable, power: i32) -> Option<f64> {
        let o = self.observables.iter().position(|&x| x == observable)?;
        let p = MOMENT_POWERS.iter().position(|&x| x == power)?;
        Some(self.moments[o][p])
    }

    pub fn trace(&self) -> &SimulationTrace {
        &self.trace
    }

    pub fn into_trace(self) -> SimulationTrace {
        self.trace
    }

    /// Measure every observable on a configuration and record the sample.
    pub fn record<M: SpinModel>(&mut self, sweep: usize, energy: f64, magnetization: &[Vector3<f64>]) {
        let values: Vec<f64> = self
            .observables
            .iter()
            .map(|o| o.measure::<M>(energy, magnetization, self.number_sites))
            .collect();
        self.record_values(sweep, &values);
    }

    /// Record a sample given one intensive value per tracked observable.
    pub fn record_values(&mut self, sweep: usize, values: &[f64]) {
        debug_assert_eq!(values.len(), self.observables.len());

        for (slots, &value) in self.moments.iter_mut().zip(values) {
            for (mean, power) in slots.iter_mut().zip(MOMENT_POWERS) {
                *mean = update_running_mean(*mean, value.powi(power), self.samples);
            }
        }
        self.samples += 1;

        let energy = self.instantaneous(Observable::Energy, values);
        let magnetization = self.instantaneous(Observable::Magnetization, values);
        self.trace.rows.push(TraceRow {
            sweep,
            energy,
            magnetization,
            moments: self.moments.iter().flatten().copied().collect(),
        });
    }

    fn instantaneous(&self, observable: Observable, values: &[f64]) -> f64 {
        self.observables
            .iter()
            .position(|&o| o == observable)
            .map_or(f64::NAN, |o| values[o])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Heisenberg, Ising};
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_sequence() {
        let mut mean = 0.0;
        for n in 0..1000 {
            mean = update_running_mean(mean, 0.3, n);
        }
        assert_relative_eq!(mean, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_running_mean_matches_average() {
        let xs = [1.0, -2.0, 0.5, 4.0, 3.25];
        let mean = xs
            .iter()
            .enumerate()
            .fold(0.0, |mean, (n, &x)| update_running_mean(mean, x, n));
        assert_relative_eq!(mean, xs.iter().sum::<f64>() / xs.len() as f64, epsilon = 1e-12);
    }

    #[test]
    fn test_columns() {
        let estimators = EstimatorAccumulator::new(8, 2);
        let columns = &estimators.trace().columns;
        assert_eq!(columns.len(), 3 + 5 * 4);
        assert_eq!(columns[3], "energy_1");
        assert_eq!(columns[7], "magnetization_1");
        assert_eq!(columns[22], "sublattice1_4");
    }

    #[test]
    fn test_moments_of_two_samples() {
        let mut estimators = EstimatorAccumulator::new(4, 1);
        estimators.record_values(0, &[-1.0, 0.5, 0.5, 0.5]);
        estimators.record_values(2, &[-2.0, -0.5, -0.5, -0.5]);

        assert_eq!(estimators.samples(), 2);
        assert_relative_eq!(estimators.moment(Observable::Energy, 1).unwrap(), -1.5);
        assert_relative_eq!(estimators.moment(Observable::Energy, 2).unwrap(), 2.5);
        assert_relative_eq!(estimators.moment(Observable::Magnetization, 1).unwrap(), 0.0);
        assert_relative_eq!(estimators.moment(Observable::Magnetization, 4).unwrap(), 0.0625);
        assert!(estimators.moment(Observable::Energy, 5).is_none());
        assert!(estimators.moment(Observable::Sublattice(3), 1).is_none());

        let rows = &estimators.trace().rows;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].sweep, 2);
        assert_relative_eq!(rows[1].energy, -2.0);
        assert_relative_eq!(rows[1].magnetization, -0.5);
        assert_eq!(rows[1].moments.len(), 4 * 4);
    }

    #[test]
    fn test_measure_ising() {
        let magnetization = [Vector3::new(0.0, 0.0, 3.0), Vector3::new(0.0, 0.0, -1.0)];
        let m = Observable::Magnetization.measure::<Ising>(-8.0, &magnetization, 4);
        let s = Observable::Staggered.measure::<Ising>(-8.0, &magnetization, 4);
        let e = Observable::Energy.measure::<Ising>(-8.0, &magnetization, 4);
        assert_relative_eq!(m, 0.5);
        assert_relative_eq!(s, 1.0);
        assert_relative_eq!(e, -2.0);
        // Ising keeps the sign of the magnetization
        let down = [Vector3::new(0.0, 0.0, -4.0)];
        assert_relative_eq!(Observable::Magnetization.measure::<Ising>(0.0, &down, 4), -1.0);
    }

    #[test]
    fn test_measure_heisenberg_uses_norm() {
        let magnetization = [Vector3::new(3.0, 0.0, 0.0), Vector3::new(0.0, -4.0, 0.0)];
        let m = Observable::Magnetization.measure::<Heisenberg>(0.0, &magnetization, 10);
        let sub = Observable::Sublattice(1).measure::<Heisenberg>(0.0, &magnetization, 10);
        assert_relative_eq!(m, 0.5);
        assert_relative_eq!(sub, 0.4);
    }
}
