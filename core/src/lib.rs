pub mod applicant;
pub mod artifacts;
pub mod attribution;
pub mod config;
pub mod engine;
pub mod error;
pub mod explainer;
pub mod features;
pub mod percentile;
pub mod pipeline;
pub mod prediction;
pub mod reasons;
pub mod store;
pub mod surrogate;
pub mod types;
