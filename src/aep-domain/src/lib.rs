//! Shared domain types for the emissions processing pipeline: source
//! identity normalization, the record model, speciation profiles, spatial
//! surrogates and grids, and reporting periods.

pub mod control;
pub mod fips;
pub mod grid;
pub mod period;
pub mod pollutant;
pub mod profile;
pub mod record;
pub mod scc;
pub mod surrogate;
pub mod temporal;

pub use control::ControlData;
pub use grid::{Grid, GridCell, GridError, TimeZoneLayer};
pub use period::{Period, Unit, UnitError};
pub use pollutant::{EmissionFamily, Pollutant, PollutantType};
pub use profile::{SpecHolder, SpecType};
pub use record::{Dialect, EmissionValue, Geometry, PointGeometry, Record, StackParams};
pub use surrogate::{Surrogate, SurrogateError};
pub use temporal::{TemporalError, TemporalProfile};
