//! Supervisor guidance generation
//!
//! Maps a `RiskClassification` to the configured guidance for its band and
//! writes a rationale that names the actual numbers behind the decision:
//! the frozen baseline, each applied penalty and its contribution, and the
//! threshold row that was used. No numeric computation happens here.

use serde::Serialize;

use crate::classifier::RiskClassification;
use crate::config::ConfigError;
use crate::physics_engine::strain_label;
use crate::types::units::{format_delta, format_temperature};
use crate::types::{Acclimatization, PenaltyMode, RiskBand, UnitSystem};

pub use crate::config::{GuidanceEntry, GuidanceTable};

/// Work/rest split for one hour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkRestRegimen {
    pub work_minutes: u32,
    pub rest_minutes: u32,
}

impl WorkRestRegimen {
    /// True when no work is permitted in the cycle
    pub fn is_stop_work(&self) -> bool {
        self.work_minutes == 0
    }
}

impl std::fmt::Display for WorkRestRegimen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_stop_work() {
            write!(f, "stop work")
        } else {
            write!(f, "{} min work / {} min rest per hour", self.work_minutes, self.rest_minutes)
        }
    }
}

/// Rendered guidance for one classification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuidancePayload {
    pub band: RiskBand,
    pub label: String,
    pub summary: String,
    pub actions: Vec<String>,
    pub regimen: WorkRestRegimen,
    pub hydration_ml_per_hour: u32,
    /// Human-readable explanation of how the band was reached
    pub rationale: String,
}

/// Renders guidance from the configured table.
#[derive(Debug, Clone, Default)]
pub struct GuidanceGenerator {
    table: GuidanceTable,
    units: UnitSystem,
}

impl GuidanceGenerator {
    pub fn new(table: GuidanceTable) -> Self {
        Self {
            table,
            units: UnitSystem::default(),
        }
    }

    /// Render temperatures in the rationale using `units`
    pub fn with_units(mut self, units: UnitSystem) -> Self {
        self.units = units;
        self
    }

    /// Guidance for `classification`.
    ///
    /// Fails only when the table has no entry for the band, which config
    /// validation rules out for any table loaded through `EngineConfig`.
    pub fn render(&self, classification: &RiskClassification) -> Result<GuidancePayload, ConfigError> {
        let entry = self
            .table
            .get(classification.band)
            .ok_or(ConfigError::MissingGuidance(classification.band))?;

        Ok(GuidancePayload {
            band: classification.band,
            label: entry.label.clone(),
            summary: entry.summary.clone(),
            actions: entry.actions.clone(),
            regimen: WorkRestRegimen {
                work_minutes: entry.work_minutes,
                rest_minutes: entry.rest_minutes,
            },
            hydration_ml_per_hour: entry.hydration_ml_per_hour,
            rationale: self.rationale(classification),
        })
    }

    fn rationale(&self, c: &RiskClassification) -> String {
        let temp = |v: f64| format_temperature(v, self.units);
        let mut parts = vec![format!("Baseline WBGT {}.", temp(c.baseline_wbgt_c))];

        if c.applied.is_empty() {
            parts.push("No penalties applied.".to_string());
        } else {
            let listed: Vec<String> = c
                .applied
                .iter()
                .map(|a| {
                    let mut s = match a.descriptor.mode() {
                        PenaltyMode::Additive => {
                            format!("{} {}", a.descriptor.label(), format_delta(a.contribution_c, self.units))
                        }
                        PenaltyMode::Multiplicative => format!(
                            "{} ×{:.2} ({})",
                            a.descriptor.label(),
                            a.descriptor.magnitude(),
                            format_delta(a.contribution_c, self.units)
                        ),
                    };
                    if a.capped {
                        s.push_str(" [capped]");
                    }
                    s
                })
                .collect();
            parts.push(format!("Penalties: {}.", listed.join("; ")));
        }

        parts.push(format!("Adjusted WBGT {}.", temp(c.adjusted_wbgt_c)));

        let row = format!("{} work", c.workload.intensity);
        let lower = c.thresholds.lower_bound(c.band);
        if c.band == RiskBand::Safe {
            parts.push(format!(
                "{} for {row} (below {}).",
                c.band,
                temp(c.thresholds.caution_c)
            ));
        } else {
            parts.push(format!("{} for {row} (at or above {}).", c.band, temp(lower)));
        }

        if c.workload.acclimatization == Acclimatization::NotAcclimatized {
            parts.push(format!(
                "Thresholds lowered {} for non-acclimatized workers.",
                format_delta(c.acclimatization_shift_c, self.units).trim_start_matches('+')
            ));
        }

        if let (Some(headroom), Some(next)) = (c.headroom_c, c.band.escalate()) {
            parts.push(format!(
                "{} to {next}.",
                format_delta(headroom, self.units).trim_start_matches('+')
            ));
        }

        parts.push(format!(
            "Strain index {:.0}/50 ({}).",
            c.strain_index,
            strain_label(c.strain_index)
        ));

        parts.join(" ")
    }
}
