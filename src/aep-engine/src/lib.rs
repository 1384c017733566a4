//! The emissions engine: speciation, spatial allocation, plume rise,
//! temporal allocation and the pipeline orchestrator that fans a sector's
//! records across all four and marches the result through a run's time
//! window (§4, §5, §7).

pub mod pipeline;
pub mod plume;
pub mod report;
pub mod spatial;
pub mod speciation;
pub mod temporal;

pub use pipeline::{Engine, PipelineError, RunWindow, SectorJob, run_all};
pub use report::{Report, SectorFailure, SectorTally};
