//! Lattice geometry and neighbor tables.

mod neighborhood;
mod structure;
mod table;

pub use neighborhood::{DistanceBins, NeighborPair, Neighborhood, Shell, Sublattices, DISTANCE_TOLERANCE};
pub use structure::{LatticeVector, Site, Structure};
pub use table::{Coupling, Couplings, NeighborTable};
