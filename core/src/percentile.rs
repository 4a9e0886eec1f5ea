//! Percentile index: maps a feature value to its population rank.
//!
//! Each table holds min/max bounds plus quantile anchors (p25, p50, p75 ...).
//! Ranks are interpolated linearly between consecutive anchors, with the
//! bounds acting as the 0.0 and 1.0 anchors. Explicit p0 and p100 anchors
//! are accepted and sit alongside the bounds.
//!
//! RULES:
//!   - value <= min is exactly 0.0, value >= max is exactly 1.0.
//!   - A feature without a table ranks as unknown (None), never as an error.
//!   - Tables are immutable after load.

use crate::{
    error::{ScoreError, ScoreResult},
    types::FeatureName,
};
use anyhow::{bail, Context};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct PercentileTable {
    min:     f64,
    max:     f64,
    /// (quantile fraction, value), ascending in both.
    anchors: Vec<(f64, f64)>,
}

impl PercentileTable {
    /// Anchors may arrive in any order; they are sorted by quantile and
    /// must then be monotonic in value and lie within [min, max].
    pub fn new(min: f64, max: f64, mut anchors: Vec<(f64, f64)>) -> anyhow::Result<Self> {
        if !min.is_finite() || !max.is_finite() || min > max {
            bail!("bounds must be finite with min <= max (min={min}, max={max})");
        }
        if anchors.is_empty() {
            bail!("at least one quantile anchor is required");
        }
        anchors.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut prev_q: Option<f64> = None;
        let mut prev_v = min;
        for &(q, v) in &anchors {
            if !(0.0..=1.0).contains(&q) || prev_q.is_some_and(|p| q <= p) {
                bail!("quantile {q} must be strictly increasing inside [0, 1]");
            }
            if !v.is_finite() || v < prev_v {
                bail!("anchor value {v} at quantile {q} breaks monotonic order");
            }
            prev_q = Some(q);
            prev_v = v;
        }
        if prev_v > max {
            bail!("highest anchor {prev_v} exceeds max {max}");
        }

        Ok(Self { min, max, anchors })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn anchors(&self) -> &[(f64, f64)] {
        &self.anchors
    }

    /// Fractional rank of `value` in [0, 1]. NaN ranks as unknown.
    pub fn rank(&self, value: f64) -> Option<f64> {
        if value.is_nan() {
            return None;
        }
        if value <= self.min {
            return Some(0.0);
        }
        if value >= self.max {
            return Some(1.0);
        }

        let (mut prev_q, mut prev_v) = (0.0, self.min);
        for &(q, v) in &self.anchors {
            if value <= v {
                if v == prev_v {
                    return Some(q);
                }
                let frac = (value - prev_v) / (v - prev_v);
                return Some(prev_q + frac * (q - prev_q));
            }
            prev_q = q;
            prev_v = v;
        }

        // Above the highest anchor, still below max.
        if self.max == prev_v {
            return Some(prev_q);
        }
        let frac = (value - prev_v) / (self.max - prev_v);
        Some(prev_q + frac * (1.0 - prev_q))
    }
}

/// Whole-point percentile, ties rounded to even.
pub fn to_percentile(fraction: f64) -> u8 {
    (fraction * 100.0).round_ties_even().clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone, Default)]
pub struct PercentileIndex {
    tables: HashMap<FeatureName, PercentileTable>,
}

impl PercentileIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, feature: impl Into<FeatureName>, table: PercentileTable) {
        self.tables.insert(feature.into(), table);
    }

    pub fn table(&self, feature: &str) -> Option<&PercentileTable> {
        self.tables.get(feature)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Fractional rank in [0, 1], or None when the feature has no table.
    pub fn lookup(&self, value: f64, feature: &str) -> Option<f64> {
        self.tables.get(feature)?.rank(value)
    }

    /// Rank rounded to a whole percentage point.
    pub fn percentile(&self, value: f64, feature: &str) -> Option<u8> {
        self.lookup(value, feature).map(to_percentile)
    }

    /// Load the percentile artifact. A missing file is not an error: the
    /// index comes back empty and every lookup reports unknown.
    pub fn load(path: &Path) -> ScoreResult<Self> {
        if !path.exists() {
            log::info!(
                "No percentile table at {}; percentiles will be reported as unknown",
                path.display()
            );
            return Ok(Self::empty());
        }
        let file = std::fs::File::open(path)
            .map_err(|e| ScoreError::artifact_invalid(path, e.to_string()))?;
        let index = Self::from_csv(file)
            .map_err(|e| ScoreError::artifact_invalid(path, format!("{e:#}")))?;
        log::debug!("Loaded {} percentile tables from {}", index.len(), path.display());
        Ok(index)
    }

    /// Parse `feature,min,max,pNN...` rows. Every `pNN` column is an anchor
    /// at quantile NN/100. Rows whose anchors are not monotonic are skipped
    /// with a warning. The first row for a feature wins.
    pub fn from_csv<R: Read>(reader: R) -> anyhow::Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv_reader.headers()?.clone();

        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .with_context(|| format!("percentile table has no '{name}' column"))
        };
        let feature_col = column("feature")?;
        let min_col = column("min")?;
        let max_col = column("max")?;
        let anchor_cols: Vec<(usize, f64)> = headers
            .iter()
            .enumerate()
            .filter_map(|(idx, h)| {
                let digits = h.strip_prefix('p')?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let pct: u32 = digits.parse().ok()?;
                if pct > 100 {
                    log::warn!("Ignoring percentile column '{h}': above p100");
                    return None;
                }
                Some((idx, f64::from(pct) / 100.0))
            })
            .collect();
        if anchor_cols.is_empty() {
            bail!("percentile table has no pNN anchor columns");
        }

        let mut index = Self::empty();
        for (line, record) in csv_reader.records().enumerate() {
            let record = record?;
            let feature = record.get(feature_col).unwrap_or_default().to_string();
            let number = |col: usize| -> anyhow::Result<f64> {
                let raw = record.get(col).unwrap_or_default();
                raw.parse::<f64>().with_context(|| {
                    format!("row {} ({feature}): '{raw}' is not a number", line + 1)
                })
            };
            let min = number(min_col)?;
            let max = number(max_col)?;
            let anchors = anchor_cols
                .iter()
                .map(|&(col, q)| number(col).map(|v| (q, v)))
                .collect::<anyhow::Result<Vec<_>>>()?;

            if index.tables.contains_key(&feature) {
                log::warn!("Duplicate percentile row for '{feature}' ignored");
                continue;
            }
            match PercentileTable::new(min, max, anchors) {
                Ok(table) => index.insert(feature, table),
                Err(e) => log::warn!("Skipping percentile table for '{feature}': {e}"),
            }
        }
        Ok(index)
    }
}
