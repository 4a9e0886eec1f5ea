//! Lazily loaded, process-wide model artifacts.
//!
//! RULES:
//!   - Each artifact is assigned at most once.
//!   - Concurrent first arrivals perform exactly one load.
//!   - Readers never lock once a value is in place.
//!   - A failed load leaves the holder empty; the next caller retries.

use crate::{
    config::ArtifactPaths,
    error::{ScoreError, ScoreResult},
    explainer::{load_background, LinearExplainer},
    percentile::PercentileIndex,
    pipeline::FeaturePipeline,
    surrogate::{LogisticSurrogate, SurrogateModel},
};
use std::sync::{Mutex, OnceLock, PoisonError};

/// Single-assignment holder with a fallible initializer.
#[derive(Debug)]
pub struct LazyArtifact<T> {
    cell: OnceLock<T>,
    init: Mutex<()>,
}

impl<T> LazyArtifact<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// A holder that is already populated.
    pub fn preloaded(value: T) -> Self {
        let holder = Self::new();
        let _ = holder.cell.set(value);
        holder
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn get_or_try_init<F>(&self, load: F) -> ScoreResult<&T>
    where
        F: FnOnce() -> ScoreResult<T>,
    {
        if let Some(value) = self.cell.get() {
            return Ok(value);
        }
        // A panic inside a loader leaves nothing half-written in the cell.
        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = self.cell.get() {
            return Ok(value);
        }
        let value = load()?;
        Ok(self.cell.get_or_init(|| value))
    }
}

impl<T> Default for LazyArtifact<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ArtifactCache {
    paths:       ArtifactPaths,
    surrogate:   LazyArtifact<Box<dyn SurrogateModel>>,
    pipeline:    LazyArtifact<FeaturePipeline>,
    explainer:   LazyArtifact<LinearExplainer>,
    percentiles: LazyArtifact<PercentileIndex>,
}

impl ArtifactCache {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths,
            surrogate:   LazyArtifact::new(),
            pipeline:    LazyArtifact::new(),
            explainer:   LazyArtifact::new(),
            percentiles: LazyArtifact::new(),
        }
    }

    /// Cache with an injected model. Pipeline, explainer and percentiles
    /// still load from `paths`.
    pub fn with_surrogate(paths: ArtifactPaths, model: Box<dyn SurrogateModel>) -> Self {
        Self {
            surrogate: LazyArtifact::preloaded(model),
            ..Self::new(paths)
        }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    pub fn surrogate(&self) -> ScoreResult<&dyn SurrogateModel> {
        let model = self.surrogate.get_or_try_init(|| {
            let model = LogisticSurrogate::load(&self.paths.surrogate())?;
            Ok(Box::new(model) as Box<dyn SurrogateModel>)
        })?;
        Ok(model.as_ref())
    }

    pub fn pipeline(&self) -> ScoreResult<&FeaturePipeline> {
        self.pipeline.get_or_try_init(|| {
            let pipeline = FeaturePipeline::load(&self.paths.preprocessor())?;
            if let Some(model) = self.surrogate.get() {
                check_feature_names(model.as_ref(), &pipeline)?;
            }
            Ok(pipeline)
        })
    }

    pub fn explainer(&self) -> ScoreResult<&LinearExplainer> {
        self.explainer.get_or_try_init(|| {
            let model = self.surrogate()?;
            let pipeline = self.pipeline()?;
            check_feature_names(model, pipeline)?;
            let background = load_background(&self.paths.background())?;
            let explainer = LinearExplainer::fit(model, pipeline, &background)?;
            log::info!(
                "Fitted linear explainer on {} background rows",
                background.len()
            );
            Ok(explainer)
        })
    }

    pub fn percentiles(&self) -> ScoreResult<&PercentileIndex> {
        self.percentiles
            .get_or_try_init(|| PercentileIndex::load(&self.paths.percentiles()))
    }

    /// Load every artifact now instead of on the first request.
    pub fn warm_up(&self) -> ScoreResult<()> {
        self.surrogate()?;
        self.pipeline()?;
        self.explainer()?;
        self.percentiles()?;
        log::info!("Artifacts for {} loaded", self.paths.model_version);
        Ok(())
    }
}

fn check_feature_names(model: &dyn SurrogateModel, pipeline: &FeaturePipeline) -> ScoreResult<()> {
    let names = model.feature_names();
    if names.is_empty() {
        return Ok(());
    }
    let encoded = pipeline.encoded_names();
    if names.len() != encoded.len() || names.iter().zip(&encoded).any(|(a, b)| a != b) {
        return Err(ScoreError::Resolution(format!(
            "surrogate was fitted on {} columns that do not match the pipeline's {}",
            names.len(),
            encoded.len()
        )));
    }
    Ok(())
}
