//! Spin models: the per-site state and how two spins interact.

mod heisenberg;
mod ising;
mod traits;

pub use heisenberg::Heisenberg;
pub use ising::Ising;
pub use traits::SpinModel;
