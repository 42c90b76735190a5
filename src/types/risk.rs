//! Risk bands and workload context

use serde::{Deserialize, Serialize};

/// Heat-stress risk band, ordered from least to most severe
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Safe,
    Caution,
    Warning,
    Danger,
    Extreme,
}

impl RiskBand {
    pub const ALL: [RiskBand; 5] = [
        RiskBand::Safe,
        RiskBand::Caution,
        RiskBand::Warning,
        RiskBand::Danger,
        RiskBand::Extreme,
    ];

    /// Config key under `[guidance]`
    pub fn key(self) -> &'static str {
        match self {
            RiskBand::Safe => "safe",
            RiskBand::Caution => "caution",
            RiskBand::Warning => "warning",
            RiskBand::Danger => "danger",
            RiskBand::Extreme => "extreme",
        }
    }

    /// Next more severe band, `None` at the top
    pub fn escalate(self) -> Option<RiskBand> {
        match self {
            RiskBand::Safe => Some(RiskBand::Caution),
            RiskBand::Caution => Some(RiskBand::Warning),
            RiskBand::Warning => Some(RiskBand::Danger),
            RiskBand::Danger => Some(RiskBand::Extreme),
            RiskBand::Extreme => None,
        }
    }
}

impl std::fmt::Display for RiskBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskBand::Safe => write!(f, "SAFE"),
            RiskBand::Caution => write!(f, "CAUTION"),
            RiskBand::Warning => write!(f, "WARNING"),
            RiskBand::Danger => write!(f, "DANGER"),
            RiskBand::Extreme => write!(f, "EXTREME"),
        }
    }
}

/// Metabolic workload category (selects the threshold row)
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadIntensity {
    /// Sitting, light hand work, driving
    Light,
    /// Walking with moderate lifting, sustained hand/arm work
    #[default]
    Moderate,
    /// Heavy lifting, shovelling, climbing
    Heavy,
    /// Very intense activity at near-maximum pace
    VeryHeavy,
}

impl WorkloadIntensity {
    pub const ALL: [WorkloadIntensity; 4] = [
        WorkloadIntensity::Light,
        WorkloadIntensity::Moderate,
        WorkloadIntensity::Heavy,
        WorkloadIntensity::VeryHeavy,
    ];

    /// Config key under `[thresholds]`
    pub fn key(self) -> &'static str {
        match self {
            WorkloadIntensity::Light => "light",
            WorkloadIntensity::Moderate => "moderate",
            WorkloadIntensity::Heavy => "heavy",
            WorkloadIntensity::VeryHeavy => "very_heavy",
        }
    }
}

impl std::fmt::Display for WorkloadIntensity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkloadIntensity::Light => write!(f, "light"),
            WorkloadIntensity::Moderate => write!(f, "moderate"),
            WorkloadIntensity::Heavy => write!(f, "heavy"),
            WorkloadIntensity::VeryHeavy => write!(f, "very heavy"),
        }
    }
}

/// Worker heat-acclimatization status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Acclimatization {
    #[default]
    Acclimatized,
    /// New workers, or returning after more than a week away
    NotAcclimatized,
}

impl std::fmt::Display for Acclimatization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Acclimatization::Acclimatized => write!(f, "acclimatized"),
            Acclimatization::NotAcclimatized => write!(f, "not acclimatized"),
        }
    }
}

/// Who is doing the work: selects and shifts the threshold row
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
pub struct WorkloadContext {
    pub intensity: WorkloadIntensity,
    pub acclimatization: Acclimatization,
}

impl WorkloadContext {
    pub fn new(intensity: WorkloadIntensity, acclimatization: Acclimatization) -> Self {
        Self {
            intensity,
            acclimatization,
        }
    }

    pub fn acclimatized(intensity: WorkloadIntensity) -> Self {
        Self::new(intensity, Acclimatization::Acclimatized)
    }
}
