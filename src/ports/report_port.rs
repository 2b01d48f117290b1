//! Reporting sink port trait.

use crate::domain::error::TrendsimError;
use crate::domain::metrics::Metrics;
use crate::domain::simulator::SimulationResult;
use crate::domain::sweep::SweepRun;

pub trait ReportPort {
    fn write(
        &self,
        result: &SimulationResult,
        metrics: &Metrics,
    ) -> Result<(), TrendsimError>;

    /// One row per run, in input order; failed runs are reported too.
    fn write_sweep(&self, runs: &[SweepRun]) -> Result<(), TrendsimError>;
}
