// Processing: intermediate JSON arrays -> one consolidated, hashed artifact

pub mod steps;
pub mod transformer;

pub use steps::{Clean, Normalize, StagedRecord, Stamp, StepPipeline, TransformStep};
pub use transformer::{TransformReport, Transformer};
