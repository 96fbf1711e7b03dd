//! Sampling module - Metropolis updates, online estimators and their analysis.

mod analysis;
mod estimators;
mod metropolis;

pub use analysis::{autocorrelation_time, blocking_error, Thermodynamics};
pub use estimators::{
    staggered_moment, update_running_mean, EstimatorAccumulator, Observable, SimulationTrace, TraceRow,
    MOMENT_POWERS,
};
pub use metropolis::{metropolis_accept, AcceptedMove, MetropolisEngine, TrialMove};
