//! Single-site Metropolis updates.
//!
//! The engine owns the spin state and the running (instantaneous) energy and
//! per-sublattice magnetization. Every accepted move updates them incrementally;
//! `reset_running_samples` recomputes both from scratch.

use nalgebra::Vector3;
use rand::Rng;

use crate::lattice::NeighborTable;
use crate::model::SpinModel;

/// A proposed, not yet committed, move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialMove<S> {
    pub site: usize,
    pub trial: S,
    pub delta_energy: f64,
}

/// Changes applied by an accepted move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptedMove {
    pub site: usize,
    pub sublattice: usize,
    pub delta_energy: f64,
    pub delta_moment: Vector3<f64>,
}

/// Metropolis criterion: downhill moves are always taken, uphill ones with
/// probability `exp(-ΔE / T)`.
///
/// `temperature` must be positive. No random number is drawn for downhill moves.
pub fn metropolis_accept<R: Rng + ?Sized>(delta_energy: f64, temperature: f64, rng: &mut R) -> bool {
    if delta_energy < 0.0 {
        return true;
    }
    rng.gen::<f64>() <= (-delta_energy / temperature).exp()
}

pub struct MetropolisEngine<'a, M: SpinModel> {
    table: &'a NeighborTable,
    state: Vec<M::Spin>,
    temperature: f64,
    energy: f64,
    magnetization: Vec<Vector3<f64>>,
    attempted: usize,
    accepted: usize,
}

impl<'a, M: SpinModel> MetropolisEngine<'a, M> {
    /// Engine over an explicit initial state (one spin per site of `table`).
    pub fn new(table: &'a NeighborTable, state: Vec<M::Spin>, temperature: f64) -> Self {
        debug_assert_eq!(state.len(), table.number_sites());
        let mut engine = Self {
            table,
            state,
            temperature,
            energy: 0.0,
            magnetization: vec![Vector3::zeros(); table.number_sublattices()],
            attempted: 0,
            accepted: 0,
        };
        engine.reset_running_samples();
        engine
    }

    /// Engine over a state drawn independently per site.
    pub fn random<R: Rng + ?Sized>(table: &'a NeighborTable, temperature: f64, rng: &mut R) -> Self {
        let state = (0..table.number_sites()).map(|_| M::random_spin(rng)).collect();
        Self::new(table, state, temperature)
    }

    pub fn table(&self) -> &'a NeighborTable {
        self.table
    }

    pub fn state(&self) -> &[M::Spin] {
        &self.state
    }

    pub fn spin(&self, site: usize) -> &M::Spin {
        &self.state[site]
    }

    pub fn number_sites(&self) -> usize {
        self.state.len()
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Running energy sample.
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Running magnetization sample of every sublattice.
    pub fn magnetization(&self) -> &[Vector3<f64>] {
        &self.magnetization
    }

    pub fn total_magnetization(&self) -> Vector3<f64> {
        self.magnetization.iter().sum()
    }

    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }

    pub fn acceptance_rate(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }
        self.accepted as f64 / self.attempted as f64
    }

    /// Pick a site uniformly and draw a trial spin for it.
    pub fn propose<R: Rng + ?Sized>(&self, rng: &mut R) -> TrialMove<M::Spin> {
        let site = rng.gen_range(0..self.state.len());
        self.propose_at(site, rng)
    }

    /// Draw a trial spin for a given site.
    pub fn propose_at<R: Rng + ?Sized>(&self, site: usize, rng: &mut R) -> TrialMove<M::Spin> {
        let trial = M::sample_trial(&self.state[site], rng);
        let delta_energy = M::energy_difference(self.table, &self.state, site, &trial);
        TrialMove {
            site,
            trial,
            delta_energy,
        }
    }

    /// Store the trial spin and fold the move into the running samples.
    pub fn commit(&mut self, mv: TrialMove<M::Spin>) -> AcceptedMove {
        let sublattice = self.table.sublattice_of(mv.site);
        let delta_moment = M::moment(&mv.trial) - M::moment(&self.state[mv.site]);

        self.state[mv.site] = mv.trial;
        self.energy += mv.delta_energy;
        self.magnetization[sublattice] += delta_moment;

        AcceptedMove {
            site: mv.site,
            sublattice,
            delta_energy: mv.delta_energy,
            delta_moment,
        }
    }

    /// One Metropolis step. Returns the applied changes when the move is accepted.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<AcceptedMove> {
        let mv = self.propose(rng);
        self.attempted += 1;
        if metropolis_accept(mv.delta_energy, self.temperature, rng) {
            self.accepted += 1;
            Some(self.commit(mv))
        } else {
            None
        }
    }

    /// `number_sites` steps. Returns the number of accepted moves.
    pub fn sweep<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let mut accepted = 0;
        for _ in 0..self.state.len() {
            if self.step(rng).is_some() {
                accepted += 1;
            }
        }
        accepted
    }

    /// Total energy recomputed from scratch; each bond appears twice in the table.
    pub fn full_state_energy(&self) -> f64 {
        let total: f64 = (0..self.state.len())
            .map(|site| M::site_energy(self.table, &self.state, site, &self.state[site]))
            .sum();
        0.5 * total
    }

    /// Per-sublattice spin sums recomputed from scratch.
    pub fn full_state_magnetization(&self) -> Vec<Vector3<f64>> {
        let mut magnetization = vec![Vector3::zeros(); self.table.number_sublattices()];
        for (site, spin) in self.state.iter().enumerate() {
            magnetization[self.table.sublattice_of(site)] += M::moment(spin);
        }
        magnetization
    }

    /// Replace the running samples by their exact values.
    pub fn reset_running_samples(&mut self) {
        self.energy = self.full_state_energy();
        self.magnetization = self.full_state_magnetization();
    }

    pub fn into_state(self) -> Vec<M::Spin> {
        self.state
    }
}
