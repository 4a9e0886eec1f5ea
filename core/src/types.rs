//! Shared primitive types used across the scoring engine.

/// Version token shared by every artifact of one trained surrogate.
pub type ModelVersion = String;

/// Stable identifier for one scoring request.
pub type RequestId = String;

/// Name of a feature as it appears in artifact files.
pub type FeatureName = String;
