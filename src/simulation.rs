//! Equilibration and production sweeps over one neighbor table.
//!
//! A [`Simulation`] is created in the equilibrating phase with a random initial
//! state drawn from a generator seeded by `params.seed`. Each call to
//! [`Simulation::advance`] performs one sweep and moves the phase forward:
//!
//! ```text
//! Equilibrating -> Producing -> Finished
//! ```
//!
//! The running energy and magnetization are recomputed from scratch once, when
//! production starts. Samples are taken after production sweeps whose 0-based
//! index is a multiple of `sample_interval`.

use std::fmt;
use std::str::FromStr;

use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpinError};
use crate::io::{write_trace_file, SnapshotWriter};
use crate::lattice::NeighborTable;
use crate::model::{Heisenberg, Ising, SpinModel};
use crate::sampling::{EstimatorAccumulator, MetropolisEngine, SimulationTrace, Thermodynamics};

/// Run parameters, as read from the `simulation` section of a run file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    pub seed: u64,
    pub mode: String,
    pub sweeps: usize,
    pub equilibration_sweeps: usize,
    pub sample_interval: usize,
    pub temperature: f64,
    #[serde(default)]
    pub trace_path: Option<String>,
    #[serde(default)]
    pub snapshot_path: Option<String>,
}

impl SimulationParams {
    pub fn validate(&self) -> Result<()> {
        if self.sweeps == 0 {
            return Err(SpinError::Config("sweeps must be positive".to_string()));
        }
        if self.sample_interval == 0 {
            return Err(SpinError::Config("sample_interval must be positive".to_string()));
        }
        self.mode.parse::<Mode>()?;
        Ok(())
    }
}

/// Supported spin models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Ising,
    Heisenberg,
}

impl FromStr for Mode {
    type Err = SpinError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            name if name == Ising::NAME => Ok(Self::Ising),
            name if name == Heisenberg::NAME => Ok(Self::Heisenberg),
            _ => Err(SpinError::UnsupportedMode(s.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ising => write!(f, "{}", Ising::NAME),
            Self::Heisenberg => write!(f, "{}", Heisenberg::NAME),
        }
    }
}

/// Where the driver is in its one-way life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// `completed` equilibration sweeps done so far.
    Equilibrating { completed: usize },
    /// `completed` production sweeps done so far.
    Producing { completed: usize },
    Finished,
}

/// Receives the full spin state after every production sweep.
pub trait SnapshotSink<M: SpinModel> {
    fn record(&mut self, sweep: usize, state: &[M::Spin]) -> Result<()>;
}

/// Output of a finished run.
#[derive(Debug, Clone)]
pub struct SimulationResults {
    pub mode: Mode,
    pub number_sites: usize,
    pub acceptance_rate: f64,
    pub estimators: EstimatorAccumulator,
    pub thermodynamics: Thermodynamics,
}

impl SimulationResults {
    pub fn trace(&self) -> &SimulationTrace {
        self.estimators.trace()
    }
}

pub struct Simulation<'a, M: SpinModel> {
    params: SimulationParams,
    mode: Mode,
    rng: Pcg64,
    engine: MetropolisEngine<'a, M>,
    estimators: EstimatorAccumulator,
    snapshots: Option<Box<dyn SnapshotSink<M> + 'a>>,
    phase: Phase,
}

impl<'a, M: SpinModel> Simulation<'a, M> {
    pub fn new(table: &'a NeighborTable, params: SimulationParams) -> Result<Self> {
        params.validate()?;
        let mode = params.mode.parse::<Mode>()?;
        if mode.to_string() != M::NAME {
            return Err(SpinError::Config(format!(
                "mode {mode} requested for a {} simulation",
                M::NAME
            )));
        }

        let mut rng = Pcg64::seed_from_u64(params.seed);
        let engine = MetropolisEngine::random(table, params.temperature, &mut rng);
        let estimators = EstimatorAccumulator::new(table.number_sites(), table.number_sublattices());

        let mut simulation = Self {
            params,
            mode,
            rng,
            engine,
            estimators,
            snapshots: None,
            phase: Phase::Equilibrating { completed: 0 },
        };
        if simulation.params.equilibration_sweeps == 0 {
            simulation.phase = simulation.begin_production();
        }
        Ok(simulation)
    }

    /// Send the state after every production sweep to `sink`.
    pub fn with_snapshots(mut self, sink: impl SnapshotSink<M> + 'a) -> Self {
        self.snapshots = Some(Box::new(sink));
        self
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn engine(&self) -> &MetropolisEngine<'a, M> {
        &self.engine
    }

    pub fn estimators(&self) -> &EstimatorAccumulator {
        &self.estimators
    }

    /// Total number of sweeps, equilibration included.
    pub fn total_sweeps(&self) -> usize {
        self.params.equilibration_sweeps + self.params.sweeps
    }

    /// Run one sweep and return the phase afterwards. Does nothing once finished.
    pub fn advance(&mut self) -> Result<Phase> {
        match self.phase {
            Phase::Equilibrating { completed } => {
                self.engine.sweep(&mut self.rng);
                self.phase = if completed + 1 < self.params.equilibration_sweeps {
                    Phase::Equilibrating {
                        completed: completed + 1,
                    }
                } else {
                    self.begin_production()
                };
            }
            Phase::Producing { completed } => {
                self.engine.sweep(&mut self.rng);

                let sweep = completed;
                if sweep % self.params.sample_interval == 0 {
                    self.estimators
                        .record::<M>(sweep, self.engine.energy(), self.engine.magnetization());
                }
                if let Some(sink) = self.snapshots.as_mut() {
                    sink.record(sweep, self.engine.state())?;
                }

                self.phase = if completed + 1 < self.params.sweeps {
                    Phase::Producing {
                        completed: completed + 1,
                    }
                } else {
                    Phase::Finished
                };
            }
            Phase::Finished => {}
        }
        Ok(self.phase)
    }

    /// Advance until finished.
    pub fn run(mut self) -> Result<SimulationResults> {
        while self.advance()? != Phase::Finished {}
        Ok(self.finish())
    }

    /// Only reachable through `run` and `drive`, after the last production sweep.
    fn finish(self) -> SimulationResults {
        let thermodynamics = Thermodynamics::from_estimators(&self.estimators, self.params.temperature);
        SimulationResults {
            mode: self.mode,
            number_sites: self.engine.number_sites(),
            acceptance_rate: self.engine.acceptance_rate(),
            estimators: self.estimators,
            thermodynamics,
        }
    }

    fn begin_production(&mut self) -> Phase {
        self.engine.reset_running_samples();
        Phase::Producing { completed: 0 }
    }
}

/// Run a simulation of the model named by `params.mode`, writing the trace and
/// snapshots to the configured paths.
///
/// `on_sweep` is called after every sweep with the phase reached.
pub fn run_simulation(
    table: &NeighborTable,
    params: &SimulationParams,
    on_sweep: impl FnMut(Phase),
) -> Result<SimulationResults> {
    let results = match params.mode.parse::<Mode>()? {
        Mode::Ising => drive::<Ising>(table, params, on_sweep)?,
        Mode::Heisenberg => drive::<Heisenberg>(table, params, on_sweep)?,
    };

    if let Some(path) = &params.trace_path {
        write_trace_file(path, results.trace())?;
    }
    Ok(results)
}

fn drive<M: SpinModel>(
    table: &NeighborTable,
    params: &SimulationParams,
    mut on_sweep: impl FnMut(Phase),
) -> Result<SimulationResults> {
    let mut simulation = Simulation::<M>::new(table, params.clone())?;
    if let Some(path) = &params.snapshot_path {
        simulation = simulation.with_snapshots(SnapshotWriter::create(path)?);
    }

    loop {
        let phase = simulation.advance()?;
        on_sweep(phase);
        if phase == Phase::Finished {
            break;
        }
    }
    Ok(simulation.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(mode: &str, equilibration_sweeps: usize, sweeps: usize, sample_interval: usize) -> SimulationParams {
        SimulationParams {
            seed: 1,
            mode: mode.to_string(),
            sweeps,
            equilibration_sweeps,
            sample_interval,
            temperature: 1.0,
            trace_path: None,
            snapshot_path: None,
        }
    }

    fn ring(n: usize) -> NeighborTable {
        let bonds: Vec<(usize, usize, f64)> = (0..n).map(|i| (i, (i + 1) % n, -1.0)).collect();
        NeighborTable::from_bonds(n, &bonds)
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(" Ising ".parse::<Mode>().unwrap(), Mode::Ising);
        assert_eq!("HEISENBERG".parse::<Mode>().unwrap(), Mode::Heisenberg);
        match "xy".parse::<Mode>() {
            Err(SpinError::UnsupportedMode(mode)) => assert_eq!(mode, "xy"),
            other => panic!("expected unsupported mode, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_params() {
        let table = ring(4);
        assert!(matches!(
            Simulation::<Ising>::new(&table, params("ising", 1, 0, 1)),
            Err(SpinError::Config(_))
        ));
        assert!(matches!(
            Simulation::<Ising>::new(&table, params("ising", 1, 5, 0)),
            Err(SpinError::Config(_))
        ));
    }

    #[test]
    fn test_phase_sequence() {
        let table = ring(8);
        let mut simulation = Simulation::<Ising>::new(&table, params("ising", 2, 3, 1)).unwrap();
        assert_eq!(simulation.phase(), Phase::Equilibrating { completed: 0 });

        let phases: Vec<Phase> = (0..6).map(|_| simulation.advance().unwrap()).collect();
        assert_eq!(
            phases,
            vec![
                Phase::Equilibrating { completed: 1 },
                Phase::Producing { completed: 0 },
                Phase::Producing { completed: 1 },
                Phase::Producing { completed: 2 },
                Phase::Finished,
                Phase::Finished,
            ]
        );
        assert_eq!(simulation.estimators().samples(), 3);
        assert_eq!(simulation.engine().attempted(), 5 * 8);
    }

    #[test]
    fn test_run_completes_a_partial_run() {
        let table = ring(8);
        let mut simulation = Simulation::<Ising>::new(&table, params("ising", 2, 5, 1)).unwrap();
        simulation.advance().unwrap();
        simulation.advance().unwrap();
        simulation.advance().unwrap();
        assert_eq!(simulation.phase(), Phase::Producing { completed: 1 });

        let results = simulation.run().unwrap();
        assert_eq!(results.estimators.samples(), 5);
        assert_eq!(results.trace().len(), 5);
    }

    #[test]
    fn test_mode_must_match_model() {
        let table = ring(4);
        assert!(matches!(
            Simulation::<Heisenberg>::new(&table, params("ising", 1, 1, 1)),
            Err(SpinError::Config(_))
        ));
    }

    #[test]
    fn test_no_equilibration_starts_producing() {
        let table = ring(8);
        let simulation = Simulation::<Ising>::new(&table, params("ising", 0, 3, 1)).unwrap();
        assert_eq!(simulation.phase(), Phase::Producing { completed: 0 });
    }

    #[test]
    fn test_sample_interval() {
        let table = ring(6);
        let results = Simulation::<Ising>::new(&table, params("ising", 3, 10, 3))
            .unwrap()
            .run()
            .unwrap();
        let sweeps: Vec<usize> = results.trace().rows.iter().map(|row| row.sweep).collect();
        assert_eq!(sweeps, vec![0, 3, 6, 9]);
        assert_eq!(results.estimators.samples(), 4);
    }

    struct Recorder<'r> {
        sweeps: &'r mut Vec<usize>,
    }

    impl SnapshotSink<Ising> for Recorder<'_> {
        fn record(&mut self, sweep: usize, state: &[i8]) -> Result<()> {
            assert_eq!(state.len(), 5);
            self.sweeps.push(sweep);
            Ok(())
        }
    }

    #[test]
    fn test_snapshot_every_production_sweep() {
        let table = ring(5);
        let mut sweeps = Vec::new();
        Simulation::<Ising>::new(&table, params("ising", 4, 6, 4))
            .unwrap()
            .with_snapshots(Recorder { sweeps: &mut sweeps })
            .run()
            .unwrap();
        assert_eq!(sweeps, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_dispatch_by_mode() {
        let table = ring(6);
        let mut calls = 0;
        let results = run_simulation(&table, &params("Heisenberg", 2, 4, 1), |_| calls += 1).unwrap();
        assert_eq!(results.mode, Mode::Heisenberg);
        assert_eq!(calls, 6);
        assert_eq!(results.trace().len(), 4);

        assert!(matches!(
            run_simulation(&table, &params("potts", 2, 4, 1), |_| {}),
            Err(SpinError::UnsupportedMode(_))
        ));
    }
}
