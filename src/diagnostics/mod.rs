//! Serializable reports describing what each stage of a stitching run did.
//!
//! `StitchTrace` is the entry point returned with every composite; it bundles
//! timings, per-pair estimation reports, per-image feature statistics and the
//! blend steps of the fold.

pub mod blend;
pub mod estimation;
pub mod features;
pub mod pyramid;
pub mod timing;
pub mod trace;

pub use blend::BlendStage;
pub use estimation::{EstimationMethod, PairEstimation};
pub use features::{FeatureStage, MatchStage};
pub use pyramid::{PyramidLevelReport, PyramidStage};
pub use timing::{elapsed_ms, StageTiming, TimingBreakdown};
pub use trace::{InputDescriptor, StitchArtifacts, StitchTrace};
