//! Rust Spins - Metropolis Monte Carlo for classical spin lattices
//!
//! This crate simulates Ising and Heisenberg models with pairwise couplings on
//! arbitrary periodic lattices. A structure and a cutoff radius are turned into a
//! [`NeighborTable`], single-site Metropolis sweeps are run over it, and the
//! running moments of the energy and magnetization are collected along the way.

pub mod error;
pub mod io;
pub mod lattice;
pub mod model;
pub mod sampling;
pub mod simulation;

// Re-export commonly used types at crate root
pub use error::{Result, SpinError};
pub use io::{read_run_config, write_trace, write_trace_file, RunConfig, SnapshotWriter, StructureConfig};
pub use lattice::{Coupling, Couplings, LatticeVector, NeighborTable, Neighborhood, Site, Structure};
pub use model::{Heisenberg, Ising, SpinModel};
pub use sampling::{EstimatorAccumulator, MetropolisEngine, Observable, SimulationTrace, Thermodynamics};
pub use simulation::{run_simulation, Mode, Phase, Simulation, SimulationParams, SimulationResults, SnapshotSink};
