// use serde_yaml to read a run file into the following structure
/*
simulation:
  seed: 42
  mode: ising
  sweeps: 400
  equilibration_sweeps: 100
  sample_interval: 1
  temperature: 1.0
  trace_path: trace.csv
structure:
  lengths: [2.0, 2.0, 20.0]
  angles: [90.0, 90.0, 90.0]
  supercell: [5, 5, 1]
  sites:
    - { species: Fe, position: [0.0, 0.0, 0.0], sublattice: "1" }
    - { species: Fe, position: [0.5, 0.0, 0.0], sublattice: "2" }
    - { species: Fe, position: [0.0, 0.5, 0.0], sublattice: "2" }
    - { species: Fe, position: [0.5, 0.5, 0.0], sublattice: "1" }
cutoff: 1.2
couplings:
  - { sublattice_i: Fe1, sublattice_j: Fe2, rank: 0, value: 1.0 }
*/

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpinError};
use crate::lattice::{Coupling, Couplings, LatticeVector, NeighborTable, Neighborhood, Site, Structure};
use crate::simulation::SimulationParams;

fn right_angles() -> [f64; 3] {
    [90.0; 3]
}

fn unit_supercell() -> [usize; 3] {
    [1; 3]
}

/// Periodic cell description of a run file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureConfig {
    pub lengths: [f64; 3],
    #[serde(default = "right_angles")]
    pub angles: [f64; 3],
    #[serde(default = "unit_supercell")]
    pub supercell: [usize; 3],
    pub sites: Vec<Site>,
}

impl StructureConfig {
    /// The supercell described by this section.
    pub fn build(&self) -> Result<Structure> {
        if self.sites.is_empty() {
            return Err(SpinError::Config("structure has no sites".to_string()));
        }
        let lattice = LatticeVector::from_lengths_and_angles(self.lengths, self.angles)?;
        Structure::new(lattice, self.sites.clone()).supercell(self.supercell)
    }
}

/// A complete run file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub simulation: SimulationParams,
    pub structure: StructureConfig,
    pub cutoff: f64,
    pub couplings: Vec<Coupling>,
}

impl RunConfig {
    pub fn couplings(&self) -> Couplings {
        self.couplings.iter().cloned().collect()
    }

    /// Build the structure, search its neighbors and attach the couplings.
    pub fn neighbor_table(&self) -> Result<NeighborTable> {
        if self.cutoff <= 0.0 {
            return Err(SpinError::Config(format!("cutoff must be positive, got {}", self.cutoff)));
        }
        let structure = self.structure.build()?;
        Neighborhood::build(&structure, self.cutoff)?.attach_couplings(&self.couplings())
    }
}

pub fn parse_run_config(text: &str) -> Result<RunConfig> {
    let config: RunConfig = serde_yaml::from_str(text)?;
    config.simulation.validate()?;
    Ok(config)
}

pub fn read_run_config(filename: &str) -> Result<RunConfig> {
    let text = std::fs::read_to_string(filename)?;
    parse_run_config(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const RUN_FILE: &str = r#"
simulation:
  seed: 42
  mode: Ising
  sweeps: 400
  equilibration_sweeps: 100
  sample_interval: 2
  temperature: 1.5
structure:
  lengths: [2.0, 2.0, 20.0]
  supercell: [3, 3, 1]
  sites:
    - { species: Fe, position: [0.0, 0.0, 0.0], sublattice: "1" }
    - { species: Fe, position: [0.5, 0.0, 0.0], sublattice: "2" }
    - { species: Fe, position: [0.0, 0.5, 0.0], sublattice: "2" }
    - { species: Fe, position: [0.5, 0.5, 0.0], sublattice: "1" }
cutoff: 1.2
couplings:
  - { sublattice_i: Fe1, sublattice_j: Fe2, rank: 0, value: 1.0 }
"#;

    #[test]
    fn test_parse_run_file() {
        let config = parse_run_config(RUN_FILE).unwrap();
        assert_eq!(config.simulation.seed, 42);
        assert_eq!(config.simulation.sample_interval, 2);
        assert!(config.simulation.trace_path.is_none());
        assert_eq!(config.structure.angles, [90.0; 3]);
        assert_eq!(config.structure.sites[1].label(), "Fe2");
        assert_relative_eq!(config.structure.sites[1].position.x, 0.5);
        assert_eq!(config.couplings.len(), 1);
    }

    #[test]
    fn test_neighbor_table_from_run_file() {
        let table = parse_run_config(RUN_FILE).unwrap().neighbor_table().unwrap();
        assert_eq!(table.number_sites(), 36);
        assert_eq!(table.sublattice_labels(), &["Fe1".to_string(), "Fe2".to_string()]);
        assert_eq!(table.sublattice_sizes(), vec![18, 18]);
        for site in 0..table.number_sites() {
            assert_eq!(table.couplings(site), &[1.0; 4]);
        }
    }

    #[test]
    fn test_invalid_run_files() {
        let zero_sample_interval = RUN_FILE.replace("sample_interval: 2", "sample_interval: 0");
        assert!(matches!(parse_run_config(&zero_sample_interval), Err(SpinError::Config(_))));

        let bad_mode = RUN_FILE.replace("mode: Ising", "mode: potts");
        assert!(matches!(parse_run_config(&bad_mode), Err(SpinError::UnsupportedMode(_))));

        let zero_supercell = RUN_FILE.replace("supercell: [3, 3, 1]", "supercell: [0, 3, 1]");
        let config = parse_run_config(&zero_supercell).unwrap();
        assert!(matches!(config.neighbor_table(), Err(SpinError::Config(_))));

        assert!(matches!(parse_run_config("simulation: ["), Err(SpinError::Config(_))));
    }
}
