//! Periodic cells and the sites they contain.
//!
//! A `Structure` is a lattice (three cell vectors) plus a list of sites in
//! fractional coordinates. Each site carries a species name and an optional
//! sublattice tag; sites with identical `species + tag` labels belong to the same
//! sublattice.

use std::collections::HashMap;

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpinError};

/// Cell vectors of a periodic lattice.
///
/// Columns of `lattice_vector` are the cell vectors a, b, c. Rows of
/// `reciprocal_vector` are the dual vectors (a_i · b_j = δ_ij, no 2π factor).
#[derive(Debug, Clone, Copy)]
pub struct LatticeVector {
    pub lattice_vector: Matrix3<f64>,
    pub reciprocal_vector: Matrix3<f64>,
}

impl LatticeVector {
    /// Build a lattice from three cell vectors.
    pub fn new(a: Vector3<f64>, b: Vector3<f64>, c: Vector3<f64>) -> Result<Self> {
        let lattice = Matrix3::from_columns(&[a, b, c]);
        let reciprocal = lattice.try_inverse().ok_or_else(|| {
            SpinError::Config("lattice vectors are linearly dependent".to_string())
        })?;

        Ok(Self {
            lattice_vector: lattice,
            reciprocal_vector: reciprocal,
        })
    }

    /// Orthorhombic cell with edge lengths `a`, `b`, `c`.
    pub fn new_orthorhombic(a: f64, b: f64, c: f64) -> Result<Self> {
        Self::new(
            Vector3::new(a, 0.0, 0.0),
            Vector3::new(0.0, b, 0.0),
            Vector3::new(0.0, 0.0, c),
        )
    }

    /// Cell from edge lengths and inter-axial angles (alpha, beta, gamma) in degrees.
    ///
    /// `a` lies along x and `b` in the xy plane.
    pub fn from_lengths_and_angles(lengths: [f64; 3], angles: [f64; 3]) -> Result<Self> {
        let [a, b, c] = lengths;
        let [alpha, beta, gamma] = angles.map(f64::to_radians);

        let (cos_alpha, cos_beta, cos_gamma) = (alpha.cos(), beta.cos(), gamma.cos());
        let sin_gamma = gamma.sin();

        let cy = (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
        let cz_squared = 1.0 - cos_beta * cos_beta - cy * cy;
        if cz_squared <= 0.0 {
            return Err(SpinError::Config(format!(
                "cell angles {angles:?} do not describe a valid lattice"
            )));
        }

        Self::new(
            Vector3::new(a, 0.0, 0.0),
            Vector3::new(b * cos_gamma, b * sin_gamma, 0.0),
            Vector3::new(c * cos_beta, c * cy, c * cz_squared.sqrt()),
        )
    }

    pub fn to_cartesian(&self, fractional: &Vector3<f64>) -> Vector3<f64> {
        self.lattice_vector * fractional
    }

    /// Distance between the lattice planes normal to dual vector `axis`.
    pub fn interplanar_spacing(&self, axis: usize) -> f64 {
        1.0 / self.reciprocal_vector.row(axis).norm()
    }

    pub fn volume(&self) -> f64 {
        self.lattice_vector.determinant().abs()
    }

    /// Lattice of a supercell scaled by integer factors along each cell vector.
    fn scaled(&self, scale: [usize; 3]) -> Result<Self> {
        let columns: Vec<Vector3<f64>> = (0..3)
            .map(|axis| self.lattice_vector.column(axis) * scale[axis] as f64)
            .collect();
        Self::new(columns[0], columns[1], columns[2])
    }
}

/// A site of the cell in fractional coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub species: String,
    pub position: Vector3<f64>,
    #[serde(default)]
    pub sublattice: Option<String>,
}

impl Site {
    pub fn new(species: &str, position: Vector3<f64>) -> Self {
        Self {
            species: species.to_string(),
            position,
            sublattice: None,
        }
    }

    /// Sublattice label: the species name followed by the tag, if any.
    pub fn label(&self) -> String {
        match &self.sublattice {
            Some(tag) => format!("{}{}", self.species, tag),
            None => self.species.clone(),
        }
    }
}

/// Periodic cell plus its sites.
#[derive(Debug, Clone)]
pub struct Structure {
    pub lattice: LatticeVector,
    pub sites: Vec<Site>,
}

impl Structure {
    /// Create a structure, wrapping every fractional coordinate into [0, 1).
    pub fn new(lattice: LatticeVector, sites: Vec<Site>) -> Self {
        let sites = sites
            .into_iter()
            .map(|mut site| {
                site.position = site.position.map(wrap_unit);
                site
            })
            .collect();
        Self { lattice, sites }
    }

    pub fn num_sites(&self) -> usize {
        self.sites.len()
    }

    /// Copy of the structure with sublattice tags set for the given site indices.
    ///
    /// Sites not present in `tags` keep their current tag.
    pub fn label_sublattices(&self, tags: &HashMap<usize, String>) -> Self {
        let mut structure = self.clone();
        for (index, site) in structure.sites.iter_mut().enumerate() {
            if let Some(tag) = tags.get(&index) {
                site.sublattice = Some(tag.clone());
            }
        }
        structure
    }

    /// Replicate the cell `scale[k]` times along each cell vector.
    ///
    /// Sites are emitted site-major: all images of site 0, then all images of
    /// site 1, and so on.
    pub fn supercell(&self, scale: [usize; 3]) -> Result<Self> {
        if scale.iter().any(|&factor| factor == 0) {
            return Err(SpinError::Config(format!(
                "supercell factors must be positive, got {scale:?}"
            )));
        }

        let lattice = self.lattice.scaled(scale)?;
        let factors = Vector3::new(scale[0] as f64, scale[1] as f64, scale[2] as f64);

        let mut sites = Vec::with_capacity(self.num_sites() * scale.iter().product::<usize>());
        for site in &self.sites {
            for na in 0..scale[0] {
                for nb in 0..scale[1] {
                    for nc in 0..scale[2] {
                        let offset = Vector3::new(na as f64, nb as f64, nc as f64);
                        sites.push(Site {
                            species: site.species.clone(),
                            position: (site.position + offset).component_div(&factors),
                            sublattice: site.sublattice.clone(),
                        });
                    }
                }
            }
        }

        Ok(Self { lattice, sites })
    }

    pub fn cartesian_positions(&self) -> Vec<Vector3<f64>> {
        self.sites
            .iter()
            .map(|site| self.lattice.to_cartesian(&site.position))
            .collect()
    }

    pub fn sublattice_labels(&self) -> Vec<String> {
        self.sites.iter().map(Site::label).collect()
    }
}

fn wrap_unit(x: f64) -> f64 {
    let wrapped = x.rem_euclid(1.0);
    // rem_euclid can round up to exactly 1.0 for tiny negative inputs
    if wrapped >= 1.0 {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square_cell() -> Structure {
        let lattice = LatticeVector::new_orthorhombic(2.0, 2.0, 20.0).unwrap();
        let sites = vec![
            Site::new("Fe", Vector3::new(0.0, 0.0, 0.0)),
            Site::new("Fe", Vector3::new(0.5, 0.0, 0.0)),
            Site::new("Fe", Vector3::new(0.0, 0.5, 0.0)),
            Site::new("Fe", Vector3::new(0.5, 0.5, 0.0)),
        ];
        Structure::new(lattice, sites)
    }

    #[test]
    fn test_lengths_and_angles_cubic() {
        let lattice = LatticeVector::from_lengths_and_angles([3.0, 3.0, 3.0], [90.0; 3]).unwrap();
        assert_relative_eq!(lattice.lattice_vector[(0, 0)], 3.0, epsilon = 1e-12);
        assert_relative_eq!(lattice.lattice_vector[(1, 1)], 3.0, epsilon = 1e-12);
        assert_relative_eq!(lattice.lattice_vector[(2, 2)], 3.0, epsilon = 1e-12);
        assert_relative_eq!(lattice.lattice_vector[(0, 1)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(lattice.volume(), 27.0, epsilon = 1e-10);
    }

    #[test]
    fn test_hexagonal_cell() {
        let lattice =
            LatticeVector::from_lengths_and_angles([1.0, 1.0, 5.0], [90.0, 90.0, 120.0]).unwrap();
        let b = lattice.lattice_vector.column(1);
        assert_relative_eq!(b.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(b.x, -0.5, epsilon = 1e-12);
        assert_relative_eq!(lattice.volume(), 5.0 * 3f64.sqrt() / 2.0, epsilon = 1e-10);
        // spacing of planes normal to a* in a hexagonal cell is a·sin(60°)
        assert_relative_eq!(lattice.interplanar_spacing(0), 3f64.sqrt() / 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_invalid_angles() {
        assert!(LatticeVector::from_lengths_and_angles([1.0; 3], [10.0, 10.0, 120.0]).is_err());
    }

    #[test]
    fn test_supercell_sites() {
        let structure = square_cell().supercell([5, 5, 1]).unwrap();
        assert_eq!(structure.num_sites(), 100);
        assert_relative_eq!(structure.lattice.lattice_vector[(0, 0)], 10.0);
        for site in &structure.sites {
            assert!(site.position.iter().all(|&x| (0.0..1.0).contains(&x)));
        }
        // site-major ordering: the first 25 sites are images of site 0
        assert_relative_eq!(structure.sites[1].position.z, 0.0);
        assert_relative_eq!(structure.sites[1].position.y, 0.2, epsilon = 1e-12);
        assert_relative_eq!(structure.sites[25].position.x, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_supercell_factor() {
        assert!(matches!(
            square_cell().supercell([0, 1, 1]),
            Err(SpinError::Config(_))
        ));
    }

    #[test]
    fn test_sublattice_labels() {
        let tags: HashMap<usize, String> = [(0, "1"), (1, "2"), (2, "2")]
            .into_iter()
            .map(|(i, tag)| (i, tag.to_string()))
            .collect();
        let structure = square_cell().label_sublattices(&tags);
        assert_eq!(structure.sublattice_labels(), vec!["Fe1", "Fe2", "Fe2", "Fe"]);
    }

    #[test]
    fn test_positions_wrapped() {
        let lattice = LatticeVector::new_orthorhombic(1.0, 1.0, 1.0).unwrap();
        let structure = Structure::new(lattice, vec![Site::new("Ni", Vector3::new(-0.25, 1.5, 2.0))]);
        let position = structure.sites[0].position;
        assert_relative_eq!(position.x, 0.75);
        assert_relative_eq!(position.y, 0.5);
        assert_relative_eq!(position.z, 0.0);
    }
}
