//! Penalty Module - deterministic, non-decreasing WBGT adjustments
//!
//! Penalties model conditions the environmental baseline cannot see: PPE,
//! extra clothing layers, radiant sources, vehicle cabins and site
//! allowances. They are layered over a frozen baseline and never modify it.
//!
//! ## Composition
//!
//! ```text
//! adjusted = (baseline + Σ additive) × Π multiplicative
//! ```
//!
//! Penalties are applied in a canonical order (kind, then additive before
//! multiplicative, then id), so the caller's submission order never matters.
//! Every descriptor is non-decreasing by construction: additive magnitudes
//! are ≥ 0 and multipliers ≥ 1.0. Together with the multiplicative stage
//! leaving a running value ≤ 0 °C untouched, this makes
//! `adjusted ≥ baseline` hold for every penalty set.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use crate::baseline::FrozenBaseline;
use crate::config::{CombinationConfig, ConfigError, PenaltyCaps, PenaltyConfig, PenaltyDefinition};
use crate::types::{CombinationRule, PenaltyKind, PenaltyMode};

// ============================================================================
// Error Types
// ============================================================================

/// Ambiguous penalty stacking, rejected before any adjustment is computed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PenaltyConflictError {
    #[error("Conflicting {kind} penalties submitted together: {}", .ids.join(", "))]
    SameKind { kind: PenaltyKind, ids: Vec<String> },

    #[error("Penalty '{0}' submitted more than once")]
    DuplicateId(String),
}

// ============================================================================
// Descriptor
// ============================================================================

/// A validated penalty.
///
/// The only constructor is [`PenaltyDescriptor::new`], which refuses any
/// magnitude that could lower WBGT.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PenaltyDescriptor {
    id: String,
    label: String,
    kind: PenaltyKind,
    mode: PenaltyMode,
    magnitude: f64,
}

impl PenaltyDescriptor {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        kind: PenaltyKind,
        mode: PenaltyMode,
        magnitude: f64,
    ) -> Result<Self, ConfigError> {
        let id = id.into();
        let invalid = |reason: String| ConfigError::InvalidPenalty {
            id: id.clone(),
            reason,
        };

        if id.trim().is_empty() {
            return Err(invalid("id must not be empty".to_string()));
        }
        if !magnitude.is_finite() {
            return Err(invalid(format!("magnitude {magnitude} is not finite")));
        }
        match mode {
            PenaltyMode::Additive if magnitude < 0.0 => {
                return Err(invalid(format!(
                    "additive magnitude {magnitude} °C would lower WBGT (must be >= 0)"
                )));
            }
            PenaltyMode::Multiplicative if magnitude < 1.0 => {
                return Err(invalid(format!(
                    "multiplier {magnitude} would lower WBGT (must be >= 1.0)"
                )));
            }
            _ => {}
        }

        Ok(Self {
            id,
            label: label.into(),
            kind,
            mode,
            magnitude,
        })
    }

    pub fn from_definition(def: &PenaltyDefinition) -> Result<Self, ConfigError> {
        Self::new(def.id.clone(), def.label.clone(), def.kind, def.mode, def.magnitude)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> PenaltyKind {
        self.kind
    }

    pub fn mode(&self) -> PenaltyMode {
        self.mode
    }

    /// °C for additive penalties, factor for multiplicative ones
    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    fn canonical_key(&self) -> (PenaltyKind, PenaltyMode, &str) {
        (self.kind, self.mode, self.id.as_str())
    }
}

impl std::fmt::Display for PenaltyDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.mode {
            PenaltyMode::Additive => write!(f, "{} (+{:.1} °C)", self.label, self.magnitude),
            PenaltyMode::Multiplicative => write!(f, "{} (×{:.2})", self.label, self.magnitude),
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// The configured set of selectable penalties, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct PenaltyCatalog {
    entries: BTreeMap<String, PenaltyDescriptor>,
}

impl PenaltyCatalog {
    /// Build from TOML definitions, reporting every bad entry at once.
    pub fn from_definitions(defs: &[PenaltyDefinition]) -> Result<Self, ConfigError> {
        let mut entries = BTreeMap::new();
        let mut errors = Vec::new();

        for def in defs {
            match PenaltyDescriptor::from_definition(def) {
                Ok(descriptor) => {
                    if entries.contains_key(descriptor.id()) {
                        errors.push(ConfigError::DuplicatePenalty(def.id.clone()).to_string());
                    } else {
                        entries.insert(descriptor.id().to_string(), descriptor);
                    }
                }
                Err(e) => errors.push(e.to_string()),
            }
        }

        if errors.is_empty() {
            Ok(Self { entries })
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    pub fn get(&self, id: &str) -> Option<&PenaltyDescriptor> {
        self.entries.get(id)
    }

    /// Look up every id; the first unknown one fails the whole request.
    pub fn resolve<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<PenaltyDescriptor>, ConfigError> {
        ids.iter()
            .map(|id| {
                let id = id.as_ref();
                self.get(id)
                    .cloned()
                    .ok_or_else(|| ConfigError::UnknownPenalty(id.to_string()))
            })
            .collect()
    }

    /// Entries in canonical application order
    pub fn iter(&self) -> impl Iterator<Item = &PenaltyDescriptor> {
        let mut all: Vec<&PenaltyDescriptor> = self.entries.values().collect();
        all.sort_by(|a, b| a.canonical_key().cmp(&b.canonical_key()));
        all.into_iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Adjusted Assessment
// ============================================================================

/// One penalty as it was actually applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedPenalty {
    pub descriptor: PenaltyDescriptor,
    /// °C this penalty added to the running value
    pub contribution_c: f64,
    /// True when a per-kind or total cap reduced the contribution
    pub capped: bool,
}

/// A frozen baseline plus the penalties layered over it.
///
/// Created once per request and immutable afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct AdjustedAssessment {
    baseline: Arc<FrozenBaseline>,
    applied: Vec<AppliedPenalty>,
    superseded: Vec<PenaltyDescriptor>,
    additive_total_c: f64,
    multiplier: f64,
    adjusted_wbgt_c: f64,
}

impl AdjustedAssessment {
    pub fn baseline(&self) -> &Arc<FrozenBaseline> {
        &self.baseline
    }

    /// Applied penalties in canonical order
    pub fn applied(&self) -> &[AppliedPenalty] {
        &self.applied
    }

    /// Penalties dropped by a `max` combination rule
    pub fn superseded(&self) -> &[PenaltyDescriptor] {
        &self.superseded
    }

    /// Sum of additive contributions after caps (°C)
    pub fn additive_total_c(&self) -> f64 {
        self.additive_total_c
    }

    /// Product of applied multipliers
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn adjusted_wbgt_c(&self) -> f64 {
        self.adjusted_wbgt_c
    }

    /// adjusted − baseline (°C), never negative
    pub fn penalty_total_c(&self) -> f64 {
        self.adjusted_wbgt_c - self.baseline.wbgt_c()
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Combination rules and caps in effect for one engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PenaltyRules {
    pub combination: CombinationConfig,
    pub caps: PenaltyCaps,
}

impl PenaltyRules {
    pub fn from_config(config: &PenaltyConfig) -> Self {
        Self {
            combination: config.combination.clone(),
            caps: config.caps.clone(),
        }
    }
}

/// Applies penalty sets to frozen baselines.
#[derive(Debug, Clone, Default)]
pub struct PenaltyEngine {
    rules: PenaltyRules,
}

impl PenaltyEngine {
    pub fn new(rules: PenaltyRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &PenaltyRules {
        &self.rules
    }

    /// Layer `penalties` over `baseline`.
    ///
    /// Fails with [`PenaltyConflictError`] when the set is ambiguous under
    /// the configured combination rules; otherwise always succeeds.
    pub fn apply(
        &self,
        baseline: &Arc<FrozenBaseline>,
        penalties: &[PenaltyDescriptor],
    ) -> Result<AdjustedAssessment, PenaltyConflictError> {
        let mut ordered: Vec<&PenaltyDescriptor> = penalties.iter().collect();
        ordered.sort_by(|a, b| a.canonical_key().cmp(&b.canonical_key()));

        let mut seen = HashSet::new();
        for p in &ordered {
            if !seen.insert(p.id()) {
                return Err(PenaltyConflictError::DuplicateId(p.id().to_string()));
            }
        }

        let (kept, superseded) = self.combine(&ordered)?;

        // Additive stage: per-kind caps, then the total cap, in canonical order
        let mut applied = Vec::with_capacity(kept.len());
        let mut total_remaining = self.rules.caps.total_additive.unwrap_or(f64::INFINITY);
        let mut kind_remaining: BTreeMap<PenaltyKind, f64> = BTreeMap::new();
        let mut additive_total_c = 0.0;

        for p in kept.iter().filter(|p| p.mode() == PenaltyMode::Additive) {
            let kind_left = kind_remaining
                .entry(p.kind())
                .or_insert_with(|| self.rules.caps.cap_for(p.kind()).unwrap_or(f64::INFINITY));
            let contribution = p.magnitude().min(*kind_left).min(total_remaining).max(0.0);
            *kind_left -= contribution;
            total_remaining -= contribution;
            additive_total_c += contribution;
            applied.push(AppliedPenalty {
                descriptor: (*p).clone(),
                contribution_c: contribution,
                capped: contribution < p.magnitude(),
            });
        }

        // Multiplicative stage: a non-positive running value is left alone
        let mut running = baseline.wbgt_c() + additive_total_c;
        let mut multiplier = 1.0;
        for p in kept.iter().filter(|p| p.mode() == PenaltyMode::Multiplicative) {
            let next = if running > 0.0 { running * p.magnitude() } else { running };
            applied.push(AppliedPenalty {
                descriptor: (*p).clone(),
                contribution_c: next - running,
                capped: false,
            });
            multiplier *= p.magnitude();
            running = next;
        }

        // Restore canonical order (additive/multiplicative interleave by kind)
        applied.sort_by(|a, b| a.descriptor.canonical_key().cmp(&b.descriptor.canonical_key()));

        let mut adjusted_wbgt_c = running;
        debug_assert!(
            adjusted_wbgt_c >= baseline.wbgt_c(),
            "adjusted WBGT {adjusted_wbgt_c} fell below baseline {}",
            baseline.wbgt_c()
        );
        if adjusted_wbgt_c < baseline.wbgt_c() {
            error!(
                baseline_id = %baseline.id(),
                baseline_wbgt_c = baseline.wbgt_c(),
                adjusted_wbgt_c,
                "Penalty stage lowered WBGT; clamping to baseline"
            );
            adjusted_wbgt_c = baseline.wbgt_c();
        }

        debug!(
            baseline_id = %baseline.id(),
            penalties = applied.len(),
            additive_total_c,
            multiplier,
            adjusted_wbgt_c,
            "Penalties applied"
        );

        Ok(AdjustedAssessment {
            baseline: Arc::clone(baseline),
            applied,
            superseded: superseded.into_iter().cloned().collect(),
            additive_total_c,
            multiplier,
            adjusted_wbgt_c,
        })
    }

    /// Resolve same-kind groups according to the combination rules.
    ///
    /// Returns (kept, superseded), both in canonical order.
    #[allow(clippy::type_complexity)]
    fn combine<'a>(
        &self,
        ordered: &[&'a PenaltyDescriptor],
    ) -> Result<(Vec<&'a PenaltyDescriptor>, Vec<&'a PenaltyDescriptor>), PenaltyConflictError> {
        let mut kept = Vec::with_capacity(ordered.len());
        let mut superseded = Vec::new();

        for kind in PenaltyKind::ALL {
            let group: Vec<&PenaltyDescriptor> =
                ordered.iter().copied().filter(|p| p.kind() == kind).collect();
            if group.len() <= 1 {
                kept.extend(group);
                continue;
            }

            match self.rules.combination.rule_for(kind) {
                CombinationRule::Reject => {
                    return Err(PenaltyConflictError::SameKind {
                        kind,
                        ids: group.iter().map(|p| p.id().to_string()).collect(),
                    });
                }
                CombinationRule::Sum => kept.extend(group),
                CombinationRule::Max => {
                    for mode in [PenaltyMode::Additive, PenaltyMode::Multiplicative] {
                        let members: Vec<&PenaltyDescriptor> =
                            group.iter().copied().filter(|p| p.mode() == mode).collect();
                        // First of the largest wins, so ties resolve by id
                        let winner = members.iter().copied().reduce(|best, p| {
                            if p.magnitude() > best.magnitude() { p } else { best }
                        });
                        if let Some(winner) = winner {
                            kept.push(winner);
                            superseded.extend(members.into_iter().filter(|p| p.id() != winner.id()));
                        }
                    }
                }
            }
        }

        Ok((kept, superseded))
    }
}

// ============================================================================
// Tests
// ============================================================================
