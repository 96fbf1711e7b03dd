//! Error types for lattice construction, configuration and output.

use std::fmt;

/// Errors surfaced before the Markov chain starts (or while writing results).
#[derive(Debug)]
pub enum SpinError {
    /// The neighbor search did not reconcile with the cell: some site has no
    /// neighbor, or a pair is reached through more than one periodic image.
    Geometry {
        /// The cutoff radius that was requested.
        cutoff: f64,
        /// What failed to reconcile.
        reason: String,
    },
    /// No coupling coefficient was supplied for a shell present in the geometry.
    UnresolvedInteraction {
        sublattice_i: String,
        sublattice_j: String,
        rank: usize,
    },
    /// Coefficients were supplied for both directions of a shell and disagree.
    AsymmetricCoupling {
        sublattice_i: String,
        sublattice_j: String,
        rank: usize,
        forward: f64,
        reverse: f64,
    },
    /// The requested spin model is not implemented.
    UnsupportedMode(String),
    /// The run file is malformed or inconsistent.
    Config(String),
    Io(std::io::Error),
    Csv(csv::Error),
}

impl fmt::Display for SpinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Geometry { cutoff, reason } => write!(
                f,
                "lattice has too few sites to use neighbor cutoff r={cutoff} ({reason}); \
                 either reduce the cutoff or enlarge the cell"
            ),
            Self::UnresolvedInteraction {
                sublattice_i,
                sublattice_j,
                rank,
            } => write!(
                f,
                "no interaction parameter for sublattice pair ({sublattice_i}, {sublattice_j}) \
                 at distance rank {rank}"
            ),
            Self::AsymmetricCoupling {
                sublattice_i,
                sublattice_j,
                rank,
                forward,
                reverse,
            } => write!(
                f,
                "interaction for ({sublattice_i}, {sublattice_j}) rank {rank} is {forward} \
                 but the reverse pair is {reverse}"
            ),
            Self::UnsupportedMode(mode) => {
                write!(f, "simulation mode {mode} is not supported")
            }
            Self::Config(reason) => write!(f, "invalid configuration: {reason}"),
            Self::Io(err) => write!(f, "i/o error: {err}"),
            Self::Csv(err) => write!(f, "csv error: {err}"),
        }
    }
}

impl std::error::Error for SpinError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Csv(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SpinError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for SpinError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<serde_yaml::Error> for SpinError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SpinError>;
