use crate::{
    error::{ScoreError, ScoreResult},
    types::ModelVersion,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MODELS_DIR: &str = "models";
pub const DEFAULT_MODEL_VERSION: &str = "v1";
pub const DEFAULT_NEAR_THRESHOLD_BAND: f64 = 0.02;
pub const DEFAULT_MAX_REASONS: usize = 5;
pub const DEFAULT_THRESHOLD_VALUE: f64 = 0.115;
pub const DEFAULT_THRESHOLD_POLICY: &str = "profit";

/// File locations of one model version's artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub models_dir:    PathBuf,
    pub model_version: ModelVersion,
}

impl ArtifactPaths {
    pub fn new(models_dir: impl Into<PathBuf>, model_version: impl Into<ModelVersion>) -> Self {
        Self {
            models_dir:    models_dir.into(),
            model_version: model_version.into(),
        }
    }

    fn file(&self, stem: &str, ext: &str) -> PathBuf {
        self.models_dir.join(format!("{stem}_{}.{ext}", self.model_version))
    }

    pub fn surrogate(&self) -> PathBuf {
        self.file("surrogate_lr", "json")
    }

    pub fn preprocessor(&self) -> PathBuf {
        self.file("surrogate_lr_preprocessor", "json")
    }

    pub fn background(&self) -> PathBuf {
        self.file("surrogate_background", "csv")
    }

    pub fn percentiles(&self) -> PathBuf {
        self.file("surrogate_percentiles", "csv")
    }

    pub fn thresholds(&self) -> PathBuf {
        self.file("surrogate_thresholds", "json")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub models_dir:          PathBuf,
    pub model_version:       ModelVersion,
    pub near_threshold_band: f64,
    pub max_reasons:         usize,
}

impl EngineConfig {
    pub fn new(models_dir: impl Into<PathBuf>, model_version: impl Into<ModelVersion>) -> Self {
        Self {
            models_dir:          models_dir.into(),
            model_version:       model_version.into(),
            near_threshold_band: DEFAULT_NEAR_THRESHOLD_BAND,
            max_reasons:         DEFAULT_MAX_REASONS,
        }
    }

    /// Read AURA_MODELS_DIR, AURA_MODEL_VERSION, AURA_NEAR_THRESHOLD_BAND
    /// and AURA_MAX_REASONS. Unset variables fall back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let models_dir = std::env::var("AURA_MODELS_DIR")
            .unwrap_or_else(|_| DEFAULT_MODELS_DIR.to_string());
        let model_version = std::env::var("AURA_MODEL_VERSION")
            .unwrap_or_else(|_| DEFAULT_MODEL_VERSION.to_string());

        let mut config = Self::new(models_dir, model_version);
        if let Ok(raw) = std::env::var("AURA_NEAR_THRESHOLD_BAND") {
            config.near_threshold_band = raw
                .parse()
                .map_err(|e| anyhow::anyhow!("AURA_NEAR_THRESHOLD_BAND={raw}: {e}"))?;
        }
        if let Ok(raw) = std::env::var("AURA_MAX_REASONS") {
            config.max_reasons = raw
                .parse()
                .map_err(|e| anyhow::anyhow!("AURA_MAX_REASONS={raw}: {e}"))?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Re-check after command-line overrides are applied.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.near_threshold_band.is_finite() || self.near_threshold_band < 0.0 {
            anyhow::bail!("near threshold band must be >= 0, got {}", self.near_threshold_band);
        }
        Ok(())
    }

    /// Config pointed at a test fixture directory.
    pub fn default_test(models_dir: impl Into<PathBuf>) -> Self {
        Self::new(models_dir, DEFAULT_MODEL_VERSION)
    }

    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths::new(self.models_dir.clone(), self.model_version.clone())
    }
}

// ── Decision threshold ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default)]
    pub model_version: ModelVersion,
    pub value:         f64,
    pub policy:        String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_set:      Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes:         Option<String>,
}

impl ThresholdConfig {
    pub fn default_for(model_version: &str) -> Self {
        Self {
            model_version: model_version.to_string(),
            value:         DEFAULT_THRESHOLD_VALUE,
            policy:        DEFAULT_THRESHOLD_POLICY.to_string(),
            date_set:      Some(chrono::Utc::now().date_naive().to_string()),
            notes:         Some("auto-created default threshold".to_string()),
        }
    }

    /// Write the default threshold record if none exists.
    /// Returns true when a file was created.
    pub fn bootstrap(path: &Path, model_version: &str) -> ScoreResult<bool> {
        if path.exists() {
            return Ok(false);
        }
        let config = Self::default_for(model_version);
        config.write(path)?;
        log::info!(
            "Created default threshold {} ({}) at {}",
            config.value,
            config.policy,
            path.display()
        );
        Ok(true)
    }

    /// Pure read. A missing file is an artifact error; call bootstrap()
    /// first to create the default. A record without a model_version takes
    /// the engine's.
    pub fn load(path: &Path, model_version: &str) -> ScoreResult<Self> {
        if !path.exists() {
            return Err(ScoreError::ArtifactMissing { path: path.to_path_buf() });
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScoreError::artifact_invalid(path, e.to_string()))?;
        let mut config: ThresholdConfig = serde_json::from_str(&content)
            .map_err(|e| ScoreError::artifact_invalid(path, e.to_string()))?;
        if config.model_version.trim().is_empty() {
            config.model_version = model_version.to_string();
        }
        if !config.value.is_finite() || !(0.0..=1.0).contains(&config.value) {
            return Err(ScoreError::artifact_invalid(
                path,
                format!("threshold {} is outside [0, 1]", config.value),
            ));
        }
        if config.policy.trim().is_empty() {
            return Err(ScoreError::artifact_invalid(path, "threshold policy is empty"));
        }
        log::debug!(
            "Loaded threshold {} ({}) for {} from {}",
            config.value,
            config.policy,
            config.model_version,
            path.display()
        );
        Ok(config)
    }

    pub fn load_or_bootstrap(path: &Path, model_version: &str) -> ScoreResult<Self> {
        Self::bootstrap(path, model_version)?;
        Self::load(path, model_version)
    }

    pub fn write(&self, path: &Path) -> ScoreResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
