use nalgebra::Vector3;
use rand::Rng;

use super::traits::SpinModel;
use crate::lattice::NeighborTable;

/// Ising spins, `s ∈ {-1, +1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ising;

impl SpinModel for Ising {
    type Spin = i8;

    const NAME: &'static str = "ising";
    const COMPONENTS: &'static [&'static str] = &["s"];

    fn random_spin<R: Rng + ?Sized>(rng: &mut R) -> i8 {
        if rng.gen::<bool>() {
            1
        } else {
            -1
        }
    }

    /// The only possible trial move is a flip.
    fn sample_trial<R: Rng + ?Sized>(current: &i8, _rng: &mut R) -> i8 {
        -current
    }

    fn dot(a: &i8, b: &i8) -> f64 {
        f64::from(a * b)
    }

    fn moment(spin: &i8) -> Vector3<f64> {
        Vector3::new(0.0, 0.0, f64::from(*spin))
    }

    /// Signed magnetization along the quantization axis.
    fn project(moment: &Vector3<f64>) -> f64 {
        moment.z
    }

    fn extend_components(spin: &i8, out: &mut Vec<f64>) {
        out.push(f64::from(*spin));
    }

    /// Flipping a spin negates every bond term, so `ΔE = -2 E_i`.
    fn energy_difference(table: &NeighborTable, state: &[i8], site: usize, _trial: &i8) -> f64 {
        -2.0 * Self::site_energy(table, state, site, &state[site])
    }
}
