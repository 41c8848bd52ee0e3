//! Versioned schema upgrades.
//!
//! Two primitives cover the shipped steps: [`ensure_index`] creates an
//! index and accepts one that already exists, [`drop_field_where_exists`]
//! removes a field in id-scoped batches. Both can be re-run after a crash.

mod batch;
mod steps;
mod upgrader;

pub use batch::{IndexOutcome, MigrationReport, drop_field_where_exists, ensure_index};
pub use steps::{AddCloudIdIndex, CLOUD_ID_INDEX, DropSetTemplateVersion};
pub use upgrader::{StepOutcome, UpgradeStep, Upgrader};
