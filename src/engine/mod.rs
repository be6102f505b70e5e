//! Detection pipeline: schema check, classification, spatial diff, merge.

pub mod classify;
pub mod detect;
pub mod merge;
pub mod schema;
pub mod spatial;
pub mod worker;

pub use classify::PairwiseClassifier;
pub use detect::{
    detect, Advisory, AdvisoryLevel, DetectionEngine, DetectionResult, DetectionSummary, Stage,
};
pub use merge::{merge, Report};
pub use schema::validate_layers;
pub use spatial::{DifferencePiece, SpatialDiffOutcome, SpatialDiffer};
pub use worker::{spawn_detection, DetectionHandle};
