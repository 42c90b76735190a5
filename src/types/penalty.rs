//! Penalty classification enums: kind, mode, combination rule

use serde::{Deserialize, Serialize};

/// What a penalty represents.
///
/// The declaration order is the canonical application order: clothing and
/// PPE first, then radiant load, then the enclosure / vehicle factor, then
/// site-specific allowances.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyKind {
    /// Protective-equipment class (coveralls, chemical suit, encapsulating suit)
    Ppe,
    /// Additional clothing layers
    Clothing,
    /// Radiant load (hot surfaces, furnaces, direct sun on metal)
    Radiant,
    /// Vehicle cabin or enclosure factor
    Enclosure,
    /// Ad-hoc site allowance
    SiteSpecific,
}

impl PenaltyKind {
    pub const ALL: [PenaltyKind; 5] = [
        PenaltyKind::Ppe,
        PenaltyKind::Clothing,
        PenaltyKind::Radiant,
        PenaltyKind::Enclosure,
        PenaltyKind::SiteSpecific,
    ];

    /// Config key used under `[penalties.combination]` and `[penalties.caps]`
    pub fn key(self) -> &'static str {
        match self {
            PenaltyKind::Ppe => "ppe",
            PenaltyKind::Clothing => "clothing",
            PenaltyKind::Radiant => "radiant",
            PenaltyKind::Enclosure => "enclosure",
            PenaltyKind::SiteSpecific => "site_specific",
        }
    }
}

impl std::fmt::Display for PenaltyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PenaltyKind::Ppe => write!(f, "PPE"),
            PenaltyKind::Clothing => write!(f, "Clothing"),
            PenaltyKind::Radiant => write!(f, "Radiant"),
            PenaltyKind::Enclosure => write!(f, "Enclosure/Vehicle"),
            PenaltyKind::SiteSpecific => write!(f, "Site-specific"),
        }
    }
}

/// How a penalty's magnitude is applied
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyMode {
    /// Adds `magnitude` °C before the multiplicative stage
    Additive,
    /// Multiplies the running value by `magnitude` (≥ 1.0)
    Multiplicative,
}

impl std::fmt::Display for PenaltyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PenaltyMode::Additive => write!(f, "additive"),
            PenaltyMode::Multiplicative => write!(f, "multiplicative"),
        }
    }
}

/// What to do when several penalties of one kind are submitted together
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CombinationRule {
    /// Refuse the request (ambiguous stacking)
    #[default]
    Reject,
    /// Apply every member
    Sum,
    /// Apply only the strongest additive and strongest multiplicative member
    Max,
}

impl std::fmt::Display for CombinationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CombinationRule::Reject => write!(f, "reject"),
            CombinationRule::Sum => write!(f, "sum"),
            CombinationRule::Max => write!(f, "max"),
        }
    }
}
