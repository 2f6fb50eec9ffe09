//! Provisioning orchestration, API descriptor generation and row pass-through.

pub mod apis;
mod data;
mod provisioner;
mod stage;
mod validation;
pub use provisioner::{CatalogEvent, CreateTable, Provisioner, RegisterDatabase};
pub use stage::{ProvisionStage, StageTracker};
pub use validation::{parse_key, RowValidator, ValueClass};
