//! AssetPack Core - asset model and stage contract
//!
//! This crate provides the pieces every pipeline stage shares: the
//! [`Asset`] record, typed [`Metadata`] flags used for cross-stage
//! signaling, and the [`Stage`] trait the pipeline drives.

pub mod asset;
pub mod metadata;
pub mod stage;

pub use asset::{split_extension, Asset};
pub use metadata::{Metadata, Tag};
pub use stage::{run_stage, run_stage_with_defaults, Stage, StageOutcome};
