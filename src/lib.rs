//! Heat-Stress Engine: frozen-baseline occupational heat-stress risk assessment
//!
//! Classifies heat-stress risk from environmental measurements and issues
//! conservative work/rest and hydration guidance.
//!
//! ## Architecture
//!
//! - **Baseline**: validated input frozen into an immutable WBGT value
//! - **Penalty Engine**: PPE, clothing, radiant, enclosure and site penalties layered on top
//! - **Classifier**: workload- and acclimatization-specific risk bands
//! - **Guidance**: per-band supervisor actions, work/rest regimen, hydration
//! - **Session**: one current baseline, what-if comparisons, audit rows
//!
//! Every stage is synchronous and side-effect free apart from `tracing` events.

pub mod baseline;
pub mod classifier;
pub mod config;
pub mod error;
pub mod guidance;
pub mod penalty;
pub mod physics_engine;
pub mod session;
pub mod types;

// Re-export engine configuration
pub use config::{ConfigError, EngineConfig};

// Re-export commonly used types
pub use types::{
    Acclimatization, EnvironmentalInput, PenaltyKind, PenaltyMode, RiskBand, SourceTag,
    UnitSystem, WorkloadContext, WorkloadIntensity,
};

// Re-export pipeline stages
pub use baseline::{BaselineCalculator, BaselineId, FrozenBaseline, ValidationError};
pub use classifier::{RiskClassification, RiskClassifier};
pub use error::EngineError;
pub use guidance::{GuidanceGenerator, GuidancePayload, WorkRestRegimen};
pub use penalty::{
    AdjustedAssessment, AppliedPenalty, PenaltyCatalog, PenaltyConflictError, PenaltyDescriptor,
    PenaltyEngine, PenaltyRules,
};
pub use session::{AssessmentReport, AssessmentSession, AuditRecord};
