//! Shared data structures for the heat-stress risk pipeline
//!
//! - `EnvironmentalInput`: one site/time measurement record
//! - `PenaltyKind` / `PenaltyMode` / `CombinationRule`: penalty taxonomy
//! - `RiskBand` / `WorkloadContext`: classification vocabulary
//! - `UnitSystem` and conversions between metric and imperial entry

mod environment;
mod penalty;
mod risk;
pub mod units;

pub use environment::*;
pub use penalty::*;
pub use risk::*;
pub use units::UnitSystem;
