//! Build history persistence for drydock.
//!
//! One immutable record is appended per completed pipeline run. Records
//! are flat, human-readable text files; append is the only mutation.
//! The [`BuildLedger`] trait is backend-agnostic, with a filesystem
//! implementation and an in-memory fake for testing in the `fakes`
//! module.

pub mod error;
pub mod fakes;
pub mod history;
pub mod record;

pub use error::{StoreError, StoreResult};
pub use history::{BuildLedger, FsBuildHistory};
pub use record::{BuildRecord, BuildState};
