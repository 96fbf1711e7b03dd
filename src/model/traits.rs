//! Traits shared by the spin models.

use nalgebra::Vector3;
use rand::Rng;

use crate::lattice::NeighborTable;

/// A classical spin model with pairwise bilinear couplings.
///
/// Implementors are zero-sized markers; the engine and driver are generic over
/// them, so the model is chosen once and never branched on inside the sweep loop.
pub trait SpinModel {
    /// Value stored for one site.
    type Spin: Copy + PartialEq + std::fmt::Debug;

    /// Lower-case model name, as accepted in run files.
    const NAME: &'static str;

    /// Column names of one site in a snapshot row.
    const COMPONENTS: &'static [&'static str];

    fn random_spin<R: Rng + ?Sized>(rng: &mut R) -> Self::Spin;

    /// Trial value for a site currently holding `current`.
    fn sample_trial<R: Rng + ?Sized>(current: &Self::Spin, rng: &mut R) -> Self::Spin;

    /// Scalar product of two spins.
    fn dot(a: &Self::Spin, b: &Self::Spin) -> f64;

    /// The spin as a 3-vector, for magnetization sums.
    fn moment(spin: &Self::Spin) -> Vector3<f64>;

    /// Scalar order parameter of a summed moment.
    fn project(moment: &Vector3<f64>) -> f64;

    /// Append the snapshot components of `spin` to `out`.
    fn extend_components(spin: &Self::Spin, out: &mut Vec<f64>);

    /// `E_i = Σ_j J_ij (s · s_j)` with `s` placed on `site`.
    fn site_energy(table: &NeighborTable, state: &[Self::Spin], site: usize, spin: &Self::Spin) -> f64 {
        table
            .interactions(site)
            .map(|(j, coupling)| coupling * Self::dot(spin, &state[j]))
            .sum()
    }

    /// Energy change of replacing the spin on `site` by `trial`.
    ///
    /// Both energies are evaluated against the same, unmodified neighbors.
    fn energy_difference(
        table: &NeighborTable,
        state: &[Self::Spin],
        site: usize,
        trial: &Self::Spin,
    ) -> f64 {
        Self::site_energy(table, state, site, trial)
            - Self::site_energy(table, state, site, &state[site])
    }
}
