//! Canonical record model.
//!
//! Every extractor produces [`VariantRecord`]s and every plugin and summary
//! consumes a validated [`CanonicalTable`] built from them.
//!
//! # Modules
//!
//! - [`enums`]  - `PathogenicityClass`, `VariationType`, `ReferenceGenome`, `Chromosome`
//! - [`record`] - `VariantRecord` and its per-row checks
//! - [`table`]  - `CanonicalTable` (atomic validation, ground truth, CSV form, digest)
//! - [`error`]  - `ValidationError` / `ResolutionError`

pub mod enums;
pub mod error;
pub mod record;
pub mod table;

pub use enums::{Chromosome, PathogenicityClass, ReferenceGenome, VariationType};
pub use error::{ResolutionError, ValidationError, Violation};
pub use record::VariantRecord;
pub use table::{CanonicalTable, CSV_COLUMNS};
