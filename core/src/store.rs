//! SQLite prediction log.
//!
//! RULE: Only store.rs talks to the database.
//! The full PredictionRecord is kept as JSON; the columns beside it exist
//! for querying and are derived from the same record.

use rusqlite::{params, Connection, OptionalExtension};
use crate::{
    error::ScoreResult,
    prediction::{PredictionRecord, RiskClass},
};

pub struct PredictionStore {
    conn: Connection,
}

impl PredictionStore {
    /// Open (or create) the prediction database at `path`.
    pub fn open(path: &str) -> ScoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ScoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> ScoreResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_predictions.sql"))?;
        Ok(())
    }

    // ── Predictions ────────────────────────────────────────────

    pub fn insert_prediction(&self, record: &PredictionRecord) -> ScoreResult<()> {
        let payload = serde_json::to_string(record)?;
        let result = &record.result;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO prediction (
                request_id, created_at, model_version, threshold_policy, probability,
                decision_threshold, threshold_delta, risk_class, near_threshold, payload
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.request_id,
                record.timestamp.to_rfc3339(),
                record.model_version,
                record.threshold_policy,
                result.probability_of_default,
                result.decision_threshold,
                result.threshold_delta,
                result.risk_class.as_str(),
                record.near_threshold_flag,
                payload,
            ],
        )?;
        for (rank, reason) in result.reasons.iter().enumerate() {
            tx.execute(
                "INSERT INTO prediction_reason (
                    request_id, rank, raw_feature_key, reason_code, contribution, magnitude, direction
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.request_id,
                    rank as i64 + 1,
                    reason.raw_feature_key.as_str(),
                    reason.reason_code,
                    reason.contribution_score,
                    reason.magnitude.as_str(),
                    reason.direction.as_str(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn prediction_count(&self) -> ScoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM prediction", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn latest_prediction(&self) -> ScoreResult<Option<PredictionRecord>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM prediction ORDER BY created_at DESC, rowid DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        payload
            .map(|p| serde_json::from_str(&p).map_err(Into::into))
            .transpose()
    }

    pub fn predictions_by_risk_class(&self, class: RiskClass) -> ScoreResult<Vec<PredictionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT payload FROM prediction WHERE risk_class = ?1
             ORDER BY created_at ASC, rowid ASC"
        )?;
        let payloads = stmt
            .query_map(params![class.as_str()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        payloads
            .iter()
            .map(|p| serde_json::from_str(p).map_err(Into::into))
            .collect()
    }

    /// Reason codes by how often they ranked first, most frequent first.
    pub fn top_reason_counts(&self, limit: usize) -> ScoreResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT reason_code, COUNT(*) AS n FROM prediction_reason
             WHERE rank = 1
             GROUP BY reason_code
             ORDER BY n DESC, reason_code ASC
             LIMIT ?1"
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
