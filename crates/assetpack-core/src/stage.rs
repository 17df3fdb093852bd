//! The contract between the pipeline and a transform stage.

use async_trait::async_trait;

use crate::asset::Asset;
use crate::metadata::Tag;

/// A named pipeline unit offering an applicability check and a transform.
///
/// The pipeline calls [`Stage::test`] first and only calls
/// [`Stage::transform`] for assets that pass. Nothing else about scheduling
/// is promised: transforms for different assets may run concurrently, so
/// implementations share only read-only state between calls.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Options handed back to the stage on every call.
    type Options: Send + Sync;
    /// Failure of a single asset's transform.
    type Error: std::error::Error + Send + Sync + 'static;

    fn name(&self) -> &'static str;

    /// Metadata tags other stages may set to influence this one.
    fn tags(&self) -> &[Tag] {
        &[]
    }

    /// Options the pipeline passes unless it has per-asset overrides.
    fn default_options(&self) -> &Self::Options;

    /// Whether `asset` should be handed to [`Stage::transform`].
    fn test(&self, asset: &Asset, options: &Self::Options) -> bool;

    /// Produce new assets from `asset`. The input is never modified.
    async fn transform(
        &self,
        asset: &Asset,
        options: &Self::Options,
    ) -> Result<Vec<Asset>, Self::Error>;
}

/// What happened to one asset passed through one stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    /// The stage did not apply; the asset passes through unchanged.
    Skipped,
    /// The stage ran and produced these assets.
    Completed(Vec<Asset>),
}

impl StageOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, StageOutcome::Skipped)
    }

    /// Produced assets; empty when skipped.
    pub fn into_assets(self) -> Vec<Asset> {
        match self {
            StageOutcome::Skipped => Vec::new(),
            StageOutcome::Completed(assets) => assets,
        }
    }
}

/// Run `stage` against `asset` the way the pipeline does: test, then
/// transform.
pub async fn run_stage<S: Stage>(
    stage: &S,
    asset: &Asset,
    options: &S::Options,
) -> Result<StageOutcome, S::Error> {
    if !stage.test(asset, options) {
        return Ok(StageOutcome::Skipped);
    }

    stage
        .transform(asset, options)
        .await
        .map(StageOutcome::Completed)
}

/// [`run_stage`] with the stage's own default options.
pub async fn run_stage_with_defaults<S: Stage>(
    stage: &S,
    asset: &Asset,
) -> Result<StageOutcome, S::Error> {
    run_stage(stage, asset, stage.default_options()).await
}
