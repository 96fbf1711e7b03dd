//! Frozen neighbor table and the coupling coefficients that feed it.

use std::collections::HashMap;

use approx::abs_diff_eq;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpinError};

/// One coupling coefficient for the `rank`-th shell of a sublattice pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupling {
    pub sublattice_i: String,
    pub sublattice_j: String,
    #[serde(default)]
    pub rank: usize,
    pub value: f64,
}

/// Coupling coefficients keyed by `(sublattice_i, sublattice_j, rank)`.
///
/// A coefficient given for `(A, B, n)` also serves `(B, A, n)`.
#[derive(Debug, Clone, Default)]
pub struct Couplings {
    values: HashMap<(String, String, usize), f64>,
}

impl Couplings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sublattice_i: &str, sublattice_j: &str, rank: usize, value: f64) {
        self.values
            .insert((sublattice_i.to_string(), sublattice_j.to_string(), rank), value);
    }

    /// Builder form of [`Couplings::insert`].
    pub fn with(mut self, sublattice_i: &str, sublattice_j: &str, rank: usize, value: f64) -> Self {
        self.insert(sublattice_i, sublattice_j, rank, value);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Coefficient of a shell, looked up in either direction.
    pub fn resolve(&self, sublattice_i: &str, sublattice_j: &str, rank: usize) -> Result<f64> {
        let key = |a: &str, b: &str| (a.to_string(), b.to_string(), rank);
        let forward = self.values.get(&key(sublattice_i, sublattice_j)).copied();
        let reverse = self.values.get(&key(sublattice_j, sublattice_i)).copied();

        match (forward, reverse) {
            (Some(f), Some(r)) if !abs_diff_eq!(f, r, epsilon = 1e-12) => {
                Err(SpinError::AsymmetricCoupling {
                    sublattice_i: sublattice_i.to_string(),
                    sublattice_j: sublattice_j.to_string(),
                    rank,
                    forward: f,
                    reverse: r,
                })
            }
            (Some(value), _) | (None, Some(value)) => Ok(value),
            (None, None) => Err(SpinError::UnresolvedInteraction {
                sublattice_i: sublattice_i.to_string(),
                sublattice_j: sublattice_j.to_string(),
                rank,
            }),
        }
    }
}

impl FromIterator<Coupling> for Couplings {
    fn from_iter<T: IntoIterator<Item = Coupling>>(iter: T) -> Self {
        let mut couplings = Self::new();
        for c in iter {
            couplings.insert(&c.sublattice_i, &c.sublattice_j, c.rank, c.value);
        }
        couplings
    }
}

/// Read-only neighbor table used by the Metropolis engine.
///
/// The neighbors of site `i` occupy the contiguous run
/// `lookup_index[i] .. lookup_index[i] + count[i]` of `neighbors` and
/// `couplings`, ordered by increasing distance.
#[derive(Debug, Clone)]
pub struct NeighborTable {
    neighbors: Vec<usize>,
    couplings: Vec<f64>,
    lookup_index: Vec<usize>,
    count: Vec<usize>,
    sublattice: Vec<usize>,
    sublattice_labels: Vec<String>,
}

impl NeighborTable {
    pub(crate) fn from_raw_parts(
        neighbors: Vec<usize>,
        couplings: Vec<f64>,
        lookup_index: Vec<usize>,
        count: Vec<usize>,
        sublattice: Vec<usize>,
        sublattice_labels: Vec<String>,
    ) -> Self {
        Self {
            neighbors,
            couplings,
            lookup_index,
            count,
            sublattice,
            sublattice_labels,
        }
    }

    /// Table from an explicit list of undirected bonds `(i, j, J_ij)`.
    ///
    /// Every bond is stored in both directions. All sites share sublattice 0.
    pub fn from_bonds(number_sites: usize, bonds: &[(usize, usize, f64)]) -> Self {
        let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); number_sites];
        for &(i, j, value) in bonds {
            adjacency[i].push((j, value));
            adjacency[j].push((i, value));
        }

        let mut table = Self::from_raw_parts(
            Vec::new(),
            Vec::new(),
            Vec::with_capacity(number_sites),
            Vec::with_capacity(number_sites),
            vec![0; number_sites],
            vec!["X".to_string()],
        );
        for run in adjacency {
            table.lookup_index.push(table.neighbors.len());
            table.count.push(run.len());
            for (j, value) in run {
                table.neighbors.push(j);
                table.couplings.push(value);
            }
        }
        table
    }

    pub fn number_sites(&self) -> usize {
        self.count.len()
    }

    /// Total number of directed neighbor entries.
    pub fn number_entries(&self) -> usize {
        self.neighbors.len()
    }

    pub fn number_sublattices(&self) -> usize {
        self.sublattice_labels.len()
    }

    pub fn sublattice_of(&self, site: usize) -> usize {
        self.sublattice[site]
    }

    pub fn sublattices(&self) -> &[usize] {
        &self.sublattice
    }

    pub fn sublattice_labels(&self) -> &[String] {
        &self.sublattice_labels
    }

    /// Number of sites on each sublattice.
    pub fn sublattice_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.number_sublattices()];
        for &s in &self.sublattice {
            sizes[s] += 1;
        }
        sizes
    }

    pub fn lookup_index(&self) -> &[usize] {
        &self.lookup_index
    }

    pub fn count(&self) -> &[usize] {
        &self.count
    }

    pub fn neighbors(&self, site: usize) -> &[usize] {
        let start = self.lookup_index[site];
        &self.neighbors[start..start + self.count[site]]
    }

    pub fn couplings(&self, site: usize) -> &[f64] {
        let start = self.lookup_index[site];
        &self.couplings[start..start + self.count[site]]
    }

    /// `(j, J_ij)` for every neighbor `j` of `site`.
    pub fn interactions(&self, site: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.neighbors(site)
            .iter()
            .copied()
            .zip(self.couplings(site).iter().copied())
    }
}
