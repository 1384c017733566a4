pub mod inventory;
pub use inventory::{FileInventoryReader, Header as InventoryHeader, IdaKind, InventoryError, InventoryReader, MockInventoryReader};

pub mod reference;
pub use reference::{lookup_double_keyed, ComboEntry, ComboTable, GsrefEntry, GsrefTable, SpecKind, TrefEntry, TrefTable};

pub mod species_db;
pub use species_db::{ProfileSpeciesRow, SpeciesDb, SpeciesProperties, VocProfileHeader};

pub mod holiday;
pub use holiday::HolidaySet;

pub mod cem;
pub use cem::{CemRecord, CemTable};

pub mod temporal_profile;
pub use temporal_profile::{TemporalProfileError, TemporalProfileTable};
