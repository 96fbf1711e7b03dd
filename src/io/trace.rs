//! CSV output of the sample trace and of per-sweep spin snapshots.

use std::fs::File;
use std::io::Write;

use crate::error::Result;
use crate::model::SpinModel;
use crate::sampling::SimulationTrace;
use crate::simulation::SnapshotSink;

/// Header row, then one row per sample.
pub fn write_trace<W: Write>(writer: W, trace: &SimulationTrace) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(&trace.columns)?;

    for row in &trace.rows {
        let mut record = vec![row.sweep.to_string(), row.energy.to_string(), row.magnetization.to_string()];
        record.extend(row.moments.iter().map(f64::to_string));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_trace_file(path: &str, trace: &SimulationTrace) -> Result<()> {
    write_trace(File::create(path)?, trace)
}

/// Writes the spin components of every site, one row per sweep.
///
/// The header (`sweep`, then `<component>_<site>` for every site) is written
/// together with the first row.
pub struct SnapshotWriter<W: Write> {
    writer: csv::Writer<W>,
    header_written: bool,
    row: Vec<f64>,
}

impl SnapshotWriter<File> {
    pub fn create(path: &str) -> Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> SnapshotWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
            header_written: false,
            row: Vec::new(),
        }
    }

    pub fn write_state<M: SpinModel>(&mut self, sweep: usize, state: &[M::Spin]) -> Result<()> {
        if !self.header_written {
            let mut header = vec!["sweep".to_string()];
            for site in 0..state.len() {
                header.extend(M::COMPONENTS.iter().map(|c| format!("{c}_{site}")));
            }
            self.writer.write_record(&header)?;
            self.header_written = true;
        }

        self.row.clear();
        for spin in state {
            M::extend_components(spin, &mut self.row);
        }
        let record = std::iter::once(sweep.to_string()).chain(self.row.iter().map(f64::to_string));
        self.writer.write_record(record)?;
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|err| std::io::Error::new(err.error().kind(), err.error().to_string()).into())
    }
}

impl<M: SpinModel, W: Write> SnapshotSink<M> for SnapshotWriter<W> {
    fn record(&mut self, sweep: usize, state: &[M::Spin]) -> Result<()> {
        self.write_state::<M>(sweep, state)?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Heisenberg, Ising};
    use crate::sampling::EstimatorAccumulator;
    use nalgebra::Vector3;

    #[test]
    fn test_write_trace() {
        let mut estimators = EstimatorAccumulator::new(2, 1);
        estimators.record_values(0, &[-1.0, 0.5, 0.5, 0.5]);
        estimators.record_values(5, &[-2.0, 1.0, 1.0, 1.0]);

        let mut buffer = Vec::new();
        write_trace(&mut buffer, estimators.trace()).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("sweep,energy,magnetization,energy_1,energy_2"));
        assert!(lines[2].starts_with("5,-2,1,-1.5,2.5"));
        assert_eq!(lines[1].split(',').count(), 3 + 4 * 4);
    }

    #[test]
    fn test_snapshot_header_once() {
        let mut snapshots = SnapshotWriter::new(Vec::new());
        snapshots.write_state::<Ising>(0, &[1, -1, 1]).unwrap();
        snapshots.write_state::<Ising>(1, &[-1, -1, 1]).unwrap();
        let text = String::from_utf8(snapshots.into_inner().unwrap()).unwrap();
        assert_eq!(text, "sweep,s_0,s_1,s_2\n0,1,-1,1\n1,-1,-1,1\n");
    }

    #[test]
    fn test_heisenberg_snapshot_columns() {
        let mut snapshots = SnapshotWriter::new(Vec::new());
        SnapshotSink::<Heisenberg>::record(&mut snapshots, 0, &[Vector3::z(), Vector3::x()]).unwrap();
        let text = String::from_utf8(snapshots.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "sweep,sx_0,sy_0,sz_0,sx_1,sy_1,sz_1");
        assert_eq!(lines[1], "0,0,0,1,1,0,0");
    }
}
