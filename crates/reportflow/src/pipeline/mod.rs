//! Upload orchestration: per-run context, the sequential runner and the
//! bulk import coordinator.

pub mod bulk;
pub mod context;
pub mod runner;

pub use bulk::{BulkImportCoordinator, BulkImportReport, ImportOverrides, SkippedFile};
pub use context::RunContext;
pub use runner::{SlotSelection, UploadPipeline};
