//! Column transform pipeline and the typed feature layout it publishes.
//!
//! The persisted artifact lists transformer stages in output order. Each
//! stage emits sklearn-style column names: `<stage>__<feature>` for numeric
//! columns and `<stage>__grade_term_<category>` for one-hot indicators.
//!
//! RULE: encoded column names are parsed exactly once, when the pipeline is
//! loaded, into a FeatureLayout. Attribution code works from the layout and
//! never inspects column name strings.

use crate::{
    error::{ScoreError, ScoreResult},
    features::{EngineeredFeature, EngineeredRecord},
};
use anyhow::{anyhow, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One transformer stage as stored in the pipeline artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformerSpec {
    OneHot {
        name:       String,
        columns:    Vec<String>,
        categories: Vec<Vec<String>>,
    },
    StandardScaler {
        name:    String,
        columns: Vec<String>,
        mean:    Vec<f64>,
        scale:   Vec<f64>,
    },
    Passthrough {
        name:    String,
        columns: Vec<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineFile {
    pub transformers: Vec<TransformerSpec>,
}

// ── Layout ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    /// One-hot indicator for a single category.
    Indicator { category: String },
    Numeric,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedColumn {
    pub encoded_name: String,
    pub feature:      EngineeredFeature,
    pub kind:         ColumnKind,
}

impl EncodedColumn {
    pub fn is_indicator(&self) -> bool {
        matches!(self.kind, ColumnKind::Indicator { .. })
    }
}

/// Encoded column index → semantic feature, in pipeline output order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureLayout {
    columns: Vec<EncodedColumn>,
}

impl FeatureLayout {
    /// Resolve encoded column names. Any name that does not map onto a
    /// known engineered feature is a resolution error.
    pub fn resolve<S: AsRef<str>>(names: &[S]) -> ScoreResult<Self> {
        let columns = names
            .iter()
            .map(|name| resolve_column(name.as_ref()))
            .collect::<ScoreResult<Vec<_>>>()?;
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[EncodedColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.encoded_name.as_str()).collect()
    }
}

fn resolve_column(encoded_name: &str) -> ScoreResult<EncodedColumn> {
    let base = encoded_name
        .split_once("__")
        .map(|(_, base)| base)
        .unwrap_or(encoded_name);

    let grade_term = EngineeredFeature::GradeTerm.as_str();
    if let Some(category) = base
        .strip_prefix(grade_term)
        .and_then(|rest| rest.strip_prefix('_'))
    {
        return Ok(EncodedColumn {
            encoded_name: encoded_name.to_string(),
            feature:      EngineeredFeature::GradeTerm,
            kind:         ColumnKind::Indicator { category: category.to_string() },
        });
    }

    match EngineeredFeature::from_name(base) {
        Some(feature) if !feature.is_categorical() => Ok(EncodedColumn {
            encoded_name: encoded_name.to_string(),
            feature,
            kind: ColumnKind::Numeric,
        }),
        _ => Err(ScoreError::Resolution(format!(
            "encoded column '{encoded_name}' does not map to a known feature"
        ))),
    }
}

// ── Pipeline ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Stage {
    OneHot { feature: EngineeredFeature, categories: Vec<String> },
    Scale { feature: EngineeredFeature, mean: f64, scale: f64 },
    Passthrough { feature: EngineeredFeature },
}

/// Fitted column transformer: EngineeredRecord → encoded numeric vector.
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePipeline {
    stages: Vec<Stage>,
    layout: FeatureLayout,
}

impl FeaturePipeline {
    pub fn load(path: &Path) -> ScoreResult<Self> {
        if !path.exists() {
            return Err(ScoreError::ArtifactMissing { path: path.to_path_buf() });
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScoreError::artifact_invalid(path, e.to_string()))?;
        let file: PipelineFile = serde_json::from_str(&content)
            .map_err(|e| ScoreError::artifact_invalid(path, e.to_string()))?;
        let pipeline = Self::from_specs(file.transformers).map_err(|e| match e {
            ScoreError::Other(err) => ScoreError::artifact_invalid(path, format!("{err:#}")),
            other => other,
        })?;
        log::debug!(
            "Loaded transform pipeline with {} encoded columns from {}",
            pipeline.width(),
            path.display()
        );
        Ok(pipeline)
    }

    pub fn from_specs(specs: Vec<TransformerSpec>) -> ScoreResult<Self> {
        if specs.is_empty() {
            return Err(anyhow!("pipeline has no transformer stages").into());
        }
        let mut stages = Vec::new();
        let mut names = Vec::new();

        for spec in specs {
            match spec {
                TransformerSpec::OneHot { name, columns, categories } => {
                    if columns.len() != categories.len() {
                        return Err(anyhow!(
                            "one-hot stage '{name}' has {} columns but {} category lists",
                            columns.len(),
                            categories.len()
                        )
                        .into());
                    }
                    for (column, cats) in columns.iter().zip(categories) {
                        let feature = engineered_column(&name, column)?;
                        if !feature.is_categorical() {
                            return Err(anyhow!(
                                "one-hot stage '{name}' cannot encode numeric column '{column}'"
                            )
                            .into());
                        }
                        for cat in &cats {
                            names.push(format!("{name}__{column}_{cat}"));
                        }
                        stages.push(Stage::OneHot { feature, categories: cats });
                    }
                }
                TransformerSpec::StandardScaler { name, columns, mean, scale } => {
                    if mean.len() != columns.len() || scale.len() != columns.len() {
                        return Err(anyhow!(
                            "scaler stage '{name}' needs one mean and scale per column"
                        )
                        .into());
                    }
                    for ((column, mean), scale) in columns.iter().zip(mean).zip(scale) {
                        let feature = numeric_column(&name, column)?;
                        names.push(format!("{name}__{column}"));
                        stages.push(Stage::Scale { feature, mean, scale });
                    }
                }
                TransformerSpec::Passthrough { name, columns } => {
                    for column in &columns {
                        let feature = numeric_column(&name, column)?;
                        names.push(format!("{name}__{column}"));
                        stages.push(Stage::Passthrough { feature });
                    }
                }
            }
        }

        let layout = FeatureLayout::resolve(&names)?;
        Ok(Self { stages, layout })
    }

    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    pub fn encoded_names(&self) -> Vec<&str> {
        self.layout.names()
    }

    /// Number of encoded output columns.
    pub fn width(&self) -> usize {
        self.layout.len()
    }

    pub fn transform(&self, record: &EngineeredRecord) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.width());
        for stage in &self.stages {
            match stage {
                Stage::OneHot { categories, .. } => {
                    let hit = categories.iter().position(|c| *c == record.grade_term);
                    if hit.is_none() {
                        log::warn!(
                            "grade_term '{}' is not a known category; all indicators off",
                            record.grade_term
                        );
                    }
                    out.extend((0..categories.len()).map(|i| if Some(i) == hit { 1.0 } else { 0.0 }));
                }
                Stage::Scale { feature, mean, scale } => {
                    let value = record.numeric(*feature).unwrap_or_default();
                    // A zero scale means a constant column at fit time.
                    let scale = if *scale == 0.0 { 1.0 } else { *scale };
                    out.push((value - mean) / scale);
                }
                Stage::Passthrough { feature } => {
                    out.push(record.numeric(*feature).unwrap_or_default());
                }
            }
        }
        out
    }
}

fn engineered_column(stage: &str, column: &str) -> anyhow::Result<EngineeredFeature> {
    EngineeredFeature::from_name(column)
        .ok_or_else(|| anyhow!("stage '{stage}' references unknown column '{column}'"))
}

fn numeric_column(stage: &str, column: &str) -> anyhow::Result<EngineeredFeature> {
    let feature = engineered_column(stage, column)?;
    if feature.is_categorical() {
        bail!("stage '{stage}' cannot treat categorical column '{column}' as numeric");
    }
    Ok(feature)
}
