//! Periodic neighbor search.
//!
//! This is the first phase of neighbor-table construction: every pair of sites
//! within the cutoff (over all periodic images) is found, distances are merged
//! into shells, and pairs are grouped and sorted by `(i, shell, j)`. The second
//! phase, [`Neighborhood::attach_couplings`], turns the result into a frozen
//! [`NeighborTable`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::RangeInclusive;

use approx::abs_diff_eq;
use nalgebra::Vector3;

use super::structure::Structure;
use super::table::{Couplings, NeighborTable};
use crate::error::{Result, SpinError};

/// Two pair distances closer than this are treated as the same shell.
pub const DISTANCE_TOLERANCE: f64 = 1e-5;

/// Dense sublattice ids obtained by interning site labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Sublattices {
    /// Sublattice id of every site.
    pub ids: Vec<usize>,
    /// Label of every sublattice id, in order of first appearance.
    pub labels: Vec<String>,
}

impl Sublattices {
    /// Intern labels: two sites share an id iff their labels are identical.
    pub fn factorize(labels: &[String]) -> Self {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut distinct = Vec::new();
        let ids = labels
            .iter()
            .map(|label| {
                *index.entry(label.as_str()).or_insert_with(|| {
                    distinct.push(label.clone());
                    distinct.len() - 1
                })
            })
            .collect();

        Self {
            ids,
            labels: distinct,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Distinct pair distances, merged within [`DISTANCE_TOLERANCE`].
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceBins {
    centers: Vec<f64>,
}

impl DistanceBins {
    pub fn from_distances(distances: &[f64]) -> Self {
        let mut sorted = distances.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mut centers: Vec<f64> = Vec::new();
        let mut previous: Option<f64> = None;
        for d in sorted {
            match previous {
                Some(p) if abs_diff_eq!(d, p, epsilon = DISTANCE_TOLERANCE) => {}
                _ => centers.push(d),
            }
            previous = Some(d);
        }

        Self { centers }
    }

    /// Index of the shell whose representative distance is nearest to `distance`.
    pub fn bin_of(&self, distance: f64) -> usize {
        let upper = self
            .centers
            .windows(2)
            .position(|pair| distance < 0.5 * (pair[0] + pair[1]));
        upper.unwrap_or(self.centers.len().saturating_sub(1))
    }

    pub fn distance(&self, bin: usize) -> f64 {
        self.centers[bin]
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }
}

/// A neighbor pair `i → j` within one distance shell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborPair {
    pub i: usize,
    pub j: usize,
    pub sublattice_i: usize,
    pub sublattice_j: usize,
    pub distance_bin: usize,
    /// Number of periodic images of `j` at this distance from `i`.
    pub images: usize,
}

/// A unique `(sublattice_i, sublattice_j, distance)` combination.
///
/// `rank` orders the shells of one ordered sublattice pair by distance,
/// starting from 0 for the nearest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shell {
    pub sublattice_i: usize,
    pub sublattice_j: usize,
    pub distance_bin: usize,
    pub distance: f64,
    pub rank: usize,
}

/// Result of the periodic neighbor search, before couplings are attached.
#[derive(Debug, Clone)]
pub struct Neighborhood {
    cutoff: f64,
    sublattices: Sublattices,
    bins: DistanceBins,
    pairs: Vec<NeighborPair>,
    count: Vec<usize>,
    lookup_index: Vec<usize>,
    shells: Vec<Shell>,
}

#[derive(Debug, Clone, Copy)]
struct PairDistance {
    i: usize,
    j: usize,
    distance: f64,
}

impl Neighborhood {
    /// Find every neighbor pair within `cutoff` and group it by distance shell.
    ///
    /// Fails with [`SpinError::Geometry`] when some site has no neighbor, or when a
    /// site reaches another through more than one periodic image (the cell is too
    /// small for the cutoff).
    pub fn build(structure: &Structure, cutoff: f64) -> Result<Self> {
        let number_sites = structure.num_sites();
        let sublattices = Sublattices::factorize(&structure.sublattice_labels());

        let distances = find_pair_distances(structure, cutoff)?;
        let bins = DistanceBins::from_distances(
            &distances.iter().map(|p| p.distance).collect::<Vec<_>>(),
        );

        // (i, bin, j) -> images; BTreeMap keeps the (i, distance, j) ordering
        let mut grouped: BTreeMap<(usize, usize, usize), usize> = BTreeMap::new();
        for pair in &distances {
            *grouped
                .entry((pair.i, bins.bin_of(pair.distance), pair.j))
                .or_insert(0) += 1;
        }

        let pairs: Vec<NeighborPair> = grouped
            .into_iter()
            .map(|((i, distance_bin, j), images)| NeighborPair {
                i,
                j,
                sublattice_i: sublattices.ids[i],
                sublattice_j: sublattices.ids[j],
                distance_bin,
                images,
            })
            .collect();

        let total_images: usize = pairs.iter().map(|p| p.images).sum();
        if total_images != pairs.len() {
            // reconcile failed: report the first pair seen through several images
            let reason = pairs
                .iter()
                .find(|p| p.images > 1)
                .map(|p| {
                    format!(
                        "site {} sees site {} through {} periodic images at distance {:.6}",
                        p.i,
                        p.j,
                        p.images,
                        bins.distance(p.distance_bin)
                    )
                })
                .unwrap_or_default();
            return Err(SpinError::Geometry { cutoff, reason });
        }

        let mut count = vec![0; number_sites];
        let mut lookup_index = vec![0; number_sites];
        for (position, pair) in pairs.iter().enumerate() {
            if count[pair.i] == 0 {
                lookup_index[pair.i] = position;
            }
            count[pair.i] += 1;
        }

        if let Some(isolated) = count.iter().position(|&n| n == 0) {
            return Err(SpinError::Geometry {
                cutoff,
                reason: format!("site {isolated} has no neighbors"),
            });
        }

        let shells = rank_shells(&pairs, &bins);

        Ok(Self {
            cutoff,
            sublattices,
            bins,
            pairs,
            count,
            lookup_index,
            shells,
        })
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn number_sites(&self) -> usize {
        self.count.len()
    }

    pub fn sublattices(&self) -> &Sublattices {
        &self.sublattices
    }

    pub fn distance_bins(&self) -> &DistanceBins {
        &self.bins
    }

    /// Grouped pairs, sorted by `(i, distance_bin, j)`.
    pub fn pairs(&self) -> &[NeighborPair] {
        &self.pairs
    }

    /// Unique sublattice-pair shells, sorted by `(sublattice_i, sublattice_j, distance)`.
    pub fn shells(&self) -> &[Shell] {
        &self.shells
    }

    /// Labels of the two sublattices of a shell.
    pub fn shell_labels(&self, shell: &Shell) -> (&str, &str) {
        (
            &self.sublattices.labels[shell.sublattice_i],
            &self.sublattices.labels[shell.sublattice_j],
        )
    }

    /// Assign `values` to the shells in the order of [`Neighborhood::shells`].
    ///
    /// Shells beyond the end of `values` stay unassigned.
    pub fn couplings_in_shell_order(&self, values: &[f64]) -> Couplings {
        let mut couplings = Couplings::new();
        for (shell, &value) in self.shells.iter().zip(values) {
            let (label_i, label_j) = self.shell_labels(shell);
            couplings.insert(label_i, label_j, shell.rank, value);
        }
        couplings
    }

    /// Resolve one coefficient per shell and freeze the neighbor table.
    pub fn attach_couplings(&self, couplings: &Couplings) -> Result<NeighborTable> {
        let mut shell_values: HashMap<(usize, usize, usize), f64> = HashMap::new();
        for shell in &self.shells {
            let (label_i, label_j) = self.shell_labels(shell);
            let value = couplings.resolve(label_i, label_j, shell.rank)?;
            shell_values.insert((shell.sublattice_i, shell.sublattice_j, shell.distance_bin), value);
        }

        let neighbors = self.pairs.iter().map(|p| p.j).collect();
        let coefficients = self
            .pairs
            .iter()
            .map(|p| shell_values[&(p.sublattice_i, p.sublattice_j, p.distance_bin)])
            .collect();

        Ok(NeighborTable::from_raw_parts(
            neighbors,
            coefficients,
            self.lookup_index.clone(),
            self.count.clone(),
            self.sublattices.ids.clone(),
            self.sublattices.labels.clone(),
        ))
    }
}

/// Every `(i, j, d)` with `0 < d ≤ cutoff` over all periodic images of `j`.
///
/// Two distinct sites at the same position are a [`SpinError::Config`] error.
fn find_pair_distances(structure: &Structure, cutoff: f64) -> Result<Vec<PairDistance>> {
    let lattice = &structure.lattice;
    // |(f_j - f_i + n)_k| ≤ cutoff / spacing_k bounds the images worth visiting
    let extent: [f64; 3] = std::array::from_fn(|k| cutoff / lattice.interplanar_spacing(k));

    let mut distances = Vec::new();
    for (i, site_i) in structure.sites.iter().enumerate() {
        for (j, site_j) in structure.sites.iter().enumerate() {
            let delta = site_j.position - site_i.position;
            let ranges: [RangeInclusive<i64>; 3] =
                std::array::from_fn(|k| image_range(delta[k], extent[k]));

            for na in ranges[0].clone() {
                for nb in ranges[1].clone() {
                    for nc in ranges[2].clone() {
                        if i == j && na == 0 && nb == 0 && nc == 0 {
                            continue;
                        }
                        let image = delta + Vector3::new(na as f64, nb as f64, nc as f64);
                        let distance = lattice.to_cartesian(&image).norm();
                        if distance < DISTANCE_TOLERANCE {
                            return Err(SpinError::Config(format!(
                                "sites {i} ({}) and {j} ({}) share a position",
                                site_i.label(),
                                site_j.label()
                            )));
                        }
                        if distance <= cutoff {
                            distances.push(PairDistance { i, j, distance });
                        }
                    }
                }
            }
        }
    }
    Ok(distances)
}

fn image_range(delta: f64, extent: f64) -> RangeInclusive<i64> {
    let low = (-extent - delta).ceil() as i64;
    let high = (extent - delta).floor() as i64;
    low..=high
}

fn rank_shells(pairs: &[NeighborPair], bins: &DistanceBins) -> Vec<Shell> {
    let unique: BTreeSet<(usize, usize, usize)> = pairs
        .iter()
        .map(|p| (p.sublattice_i, p.sublattice_j, p.distance_bin))
        .collect();

    let mut shells = Vec::with_capacity(unique.len());
    let mut rank = 0;
    let mut current_pair = None;
    for (sublattice_i, sublattice_j, distance_bin) in unique {
        if current_pair == Some((sublattice_i, sublattice_j)) {
            rank += 1;
        } else {
            current_pair = Some((sublattice_i, sublattice_j));
            rank = 0;
        }
        shells.push(Shell {
            sublattice_i,
            sublattice_j,
            distance_bin,
            distance: bins.distance(distance_bin),
            rank,
        });
    }
    shells
}
