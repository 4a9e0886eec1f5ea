//! The scoring engine: one applicant in, probability and ranked reasons out.
//!
//! EXECUTION ORDER (fixed):
//!   1. Engineer features from the validated record
//!   2. Transform into the encoded vector
//!   3. Probability of default from the surrogate
//!   4. Threshold delta and risk class
//!   5. Linear attribution over the encoded vector
//!   6. Aggregate to business features, then consolidate reasons
//!
//! RULES:
//!   - score() has no side effects. The same record scores identically.
//!   - The threshold is read once when the engine is built.
//!   - A model output outside [0, 1] is an error, never clamped.
//!   - The engine is Send + Sync; share it behind Arc.

use crate::{
    applicant::RawApplicantRecord,
    artifacts::ArtifactCache,
    attribution::aggregate,
    config::{EngineConfig, ThresholdConfig},
    error::{ScoreError, ScoreResult},
    features::engineer,
    prediction::{PredictionRecord, RiskClass, ScoringResult},
    reasons::consolidate,
};

pub struct ScoringEngine {
    artifacts:   ArtifactCache,
    threshold:   ThresholdConfig,
    max_reasons: usize,
}

impl ScoringEngine {
    pub fn new(artifacts: ArtifactCache, threshold: ThresholdConfig, max_reasons: usize) -> Self {
        Self {
            artifacts,
            threshold,
            max_reasons,
        }
    }

    /// Bootstrap the threshold file if needed and wire the artifact cache.
    /// Model artifacts are not touched until the first score or warm_up().
    pub fn build(config: &EngineConfig) -> ScoreResult<Self> {
        let paths = config.paths();
        let threshold = ThresholdConfig::load_or_bootstrap(&paths.thresholds(), &config.model_version)?;
        log::info!(
            "Scoring engine {} ready: threshold {} ({}), max {} reasons",
            config.model_version,
            threshold.value,
            threshold.policy,
            config.max_reasons
        );
        Ok(Self::new(ArtifactCache::new(paths), threshold, config.max_reasons))
    }

    pub fn threshold(&self) -> &ThresholdConfig {
        &self.threshold
    }

    pub fn artifacts(&self) -> &ArtifactCache {
        &self.artifacts
    }

    pub fn max_reasons(&self) -> usize {
        self.max_reasons
    }

    pub fn warm_up(&self) -> ScoreResult<()> {
        self.artifacts.warm_up()
    }

    pub fn score(&self, raw: &RawApplicantRecord) -> ScoreResult<ScoringResult> {
        self.score_with_limit(raw, self.max_reasons)
    }

    pub fn score_with_limit(
        &self,
        raw: &RawApplicantRecord,
        max_reasons: usize,
    ) -> ScoreResult<ScoringResult> {
        let engineered = engineer(raw);
        let pipeline = self.artifacts.pipeline()?;
        let encoded = pipeline.transform(&engineered);

        let probability = self.artifacts.surrogate()?.predict_proba(&encoded)?;
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(ScoreError::InvalidPrediction { value: probability });
        }
        let threshold = self.threshold.value;

        let contributions = self.artifacts.explainer()?.contributions(&encoded)?;
        let rows = aggregate(pipeline.layout(), &encoded, &contributions, max_reasons)?;
        let reasons = consolidate(&rows, raw, &engineered, self.artifacts.percentiles()?);

        log::debug!(
            "Scored {} ({} reasons): p={probability:.4}",
            engineered.grade_term,
            reasons.len()
        );
        Ok(ScoringResult {
            probability_of_default: probability,
            decision_threshold:     threshold,
            threshold_delta:        probability - threshold,
            risk_class:             RiskClass::classify(probability, threshold),
            reasons,
        })
    }

    /// Score and wrap the result with request metadata for the prediction log.
    pub fn predict(&self, raw: &RawApplicantRecord, band: f64) -> ScoreResult<PredictionRecord> {
        let result = self.score(raw)?;
        Ok(PredictionRecord {
            request_id:          uuid::Uuid::new_v4().to_string(),
            timestamp:           chrono::Utc::now(),
            model_version:       self.artifacts.paths().model_version.clone(),
            threshold_policy:    self.threshold.policy.clone(),
            near_threshold_band: band,
            near_threshold_flag: result.is_near_threshold(band),
            raw_input:           raw.clone(),
            engineered:          engineer(raw),
            result,
        })
    }
}
