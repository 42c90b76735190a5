//! Assessment Session - one frozen baseline, many penalty scenarios
//!
//! A session wires the four pipeline stages together and holds at most one
//! current baseline. Freezing new measurements replaces the baseline with a
//! new value (the old `Arc` stays valid for whoever still holds it), and a
//! request that names an old baseline id is refused instead of silently
//! combining old penalties with new conditions.
//!
//! ```ignore
//! let mut session = AssessmentSession::new(Arc::new(EngineConfig::load()?))?;
//! session.freeze(&input)?;
//! let report = session.assess(&["ppe_heavy"], WorkloadContext::default())?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::baseline::{BaselineCalculator, BaselineId, FrozenBaseline};
use crate::classifier::{RiskClassification, RiskClassifier};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::guidance::{GuidanceGenerator, GuidancePayload};
use crate::penalty::{PenaltyCatalog, PenaltyEngine, PenaltyRules};
use crate::types::{Acclimatization, EnvironmentalInput, WorkloadContext};

// ============================================================================
// Report
// ============================================================================

/// Presentation record: everything needed to display an assessment
/// without re-deriving any number.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentReport {
    pub generated_at: DateTime<Utc>,
    pub site: String,
    pub baseline: Arc<FrozenBaseline>,
    pub classification: RiskClassification,
    /// Ids dropped by a `max` combination rule
    pub superseded: Vec<String>,
    pub guidance: GuidancePayload,
}

impl AssessmentReport {
    /// Flatten into one audit log row
    pub fn audit_record(&self) -> AuditRecord {
        let input = self.baseline.input();
        let c = &self.classification;
        AuditRecord {
            timestamp: self.generated_at,
            site: self.site.clone(),
            source: input.source.to_string(),
            dry_bulb_c: input.dry_bulb_c,
            wet_bulb_c: input.wet_bulb_c,
            relative_humidity_pct: input.relative_humidity_pct,
            globe_c: input.globe_c,
            wind_speed_ms: input.wind_speed_ms,
            pressure_kpa: input.pressure_kpa,
            baseline_id: self.baseline.id().to_string(),
            baseline_wbgt_c: c.baseline_wbgt_c,
            penalties: c.applied.iter().map(|a| a.descriptor.id().to_string()).collect(),
            penalty_total_c: c.adjusted_wbgt_c - c.baseline_wbgt_c,
            adjusted_wbgt_c: c.adjusted_wbgt_c,
            workload: c.workload.intensity.key().to_string(),
            acclimatized: c.workload.acclimatization == Acclimatization::Acclimatized,
            band: c.band.to_string(),
            strain_index: c.strain_index,
        }
    }
}

// ============================================================================
// Audit Record
// ============================================================================

/// One flat row of the audit log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub site: String,
    pub source: String,
    pub dry_bulb_c: Option<f64>,
    pub wet_bulb_c: Option<f64>,
    pub relative_humidity_pct: Option<f64>,
    pub globe_c: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    pub pressure_kpa: Option<f64>,
    pub baseline_id: String,
    pub baseline_wbgt_c: f64,
    pub penalties: Vec<String>,
    pub penalty_total_c: f64,
    pub adjusted_wbgt_c: f64,
    pub workload: String,
    pub acclimatized: bool,
    pub band: String,
    pub strain_index: f64,
}

impl AuditRecord {
    pub const CSV_COLUMNS: [&'static str; 18] = [
        "timestamp",
        "site",
        "source",
        "dry_bulb_c",
        "wet_bulb_c",
        "relative_humidity_pct",
        "globe_c",
        "wind_speed_ms",
        "pressure_kpa",
        "baseline_id",
        "baseline_wbgt_c",
        "penalties",
        "penalty_total_c",
        "adjusted_wbgt_c",
        "workload",
        "acclimatized",
        "band",
        "strain_index",
    ];

    pub fn csv_header() -> String {
        Self::CSV_COLUMNS.join(",")
    }

    /// Row matching `csv_header()`. Absent measurements are empty cells;
    /// penalty ids are joined with `|`.
    pub fn csv_row(&self) -> String {
        let opt = |v: Option<f64>| v.map(|x| format!("{x:.2}")).unwrap_or_default();
        let fields = [
            self.timestamp.to_rfc3339(),
            csv_escape(&self.site),
            self.source.clone(),
            opt(self.dry_bulb_c),
            opt(self.wet_bulb_c),
            opt(self.relative_humidity_pct),
            opt(self.globe_c),
            opt(self.wind_speed_ms),
            opt(self.pressure_kpa),
            self.baseline_id.clone(),
            format!("{:.2}", self.baseline_wbgt_c),
            csv_escape(&self.penalties.join("|")),
            format!("{:.2}", self.penalty_total_c),
            format!("{:.2}", self.adjusted_wbgt_c),
            self.workload.clone(),
            self.acclimatized.to_string(),
            self.band.clone(),
            format!("{:.1}", self.strain_index),
        ];
        fields.join(",")
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

// ============================================================================
// Session
// ============================================================================

/// Owns the pipeline stages and the current frozen baseline.
pub struct AssessmentSession {
    config: Arc<EngineConfig>,
    calculator: BaselineCalculator,
    catalog: PenaltyCatalog,
    penalties: PenaltyEngine,
    classifier: RiskClassifier,
    guidance: GuidanceGenerator,
    current: Option<Arc<FrozenBaseline>>,
}

impl AssessmentSession {
    /// Build a session from a configuration, validating it first.
    pub fn new(config: Arc<EngineConfig>) -> Result<Self> {
        config.validate()?;
        let catalog = PenaltyCatalog::from_definitions(&config.penalties.catalog)?;
        Ok(Self {
            calculator: BaselineCalculator::new(config.baseline.clone()),
            catalog,
            penalties: PenaltyEngine::new(PenaltyRules::from_config(&config.penalties)),
            classifier: RiskClassifier::new(config.thresholds.clone(), config.acclimatization.clone()),
            guidance: GuidanceGenerator::new(config.guidance.clone()).with_units(config.output.units),
            current: None,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &PenaltyCatalog {
        &self.catalog
    }

    pub fn classifier(&self) -> &RiskClassifier {
        &self.classifier
    }

    /// The baseline assessments currently run against
    pub fn current_baseline(&self) -> Option<&Arc<FrozenBaseline>> {
        self.current.as_ref()
    }

    /// Freeze a new baseline and make it current.
    ///
    /// Rejected input also clears the current baseline: conditions have
    /// changed and the previous value no longer describes the site.
    pub fn freeze(&mut self, input: &EnvironmentalInput) -> Result<Arc<FrozenBaseline>> {
        match self.calculator.freeze(input) {
            Ok(baseline) => {
                if let Some(previous) = &self.current {
                    info!(previous = %previous.id(), current = %baseline.id(), "Baseline replaced");
                }
                self.current = Some(Arc::clone(&baseline));
                Ok(baseline)
            }
            Err(e) => {
                if self.current.take().is_some() {
                    warn!("Current baseline cleared after rejected input");
                }
                Err(e.into())
            }
        }
    }

    /// Freeze only when the measurements differ from the current baseline.
    pub fn freeze_if_changed(&mut self, input: &EnvironmentalInput) -> Result<Arc<FrozenBaseline>> {
        if let Some(current) = &self.current {
            if current.input().same_measurements(input) {
                return Ok(Arc::clone(current));
            }
        }
        self.freeze(input)
    }

    /// Run apply → classify → render against the current baseline.
    pub fn assess<S: AsRef<str>>(&self, penalty_ids: &[S], workload: WorkloadContext) -> Result<AssessmentReport> {
        let baseline = self.current.as_ref().ok_or(EngineError::NoBaseline)?;
        self.run(baseline, penalty_ids, workload)
    }

    /// Like [`assess`](Self::assess) but refuses when `baseline_id` is not
    /// the current baseline.
    pub fn assess_against<S: AsRef<str>>(
        &self,
        baseline_id: BaselineId,
        penalty_ids: &[S],
        workload: WorkloadContext,
    ) -> Result<AssessmentReport> {
        let baseline = self.current.as_ref().ok_or(EngineError::NoBaseline)?;
        if baseline.id() != baseline_id {
            return Err(EngineError::StaleBaseline {
                expected: baseline.id(),
                found: baseline_id,
            });
        }
        self.run(baseline, penalty_ids, workload)
    }

    /// What-if comparison: every penalty set against the same baseline.
    ///
    /// All-or-nothing: the first failing set fails the comparison.
    pub fn compare<S: AsRef<str>>(
        &self,
        penalty_sets: &[Vec<S>],
        workload: WorkloadContext,
    ) -> Result<Vec<AssessmentReport>> {
        let baseline = self.current.as_ref().ok_or(EngineError::NoBaseline)?;
        penalty_sets
            .iter()
            .map(|set| self.run(baseline, set, workload))
            .collect()
    }

    fn run<S: AsRef<str>>(
        &self,
        baseline: &Arc<FrozenBaseline>,
        penalty_ids: &[S],
        workload: WorkloadContext,
    ) -> Result<AssessmentReport> {
        let penalties = self.catalog.resolve(penalty_ids)?;
        let adjusted = self.penalties.apply(baseline, &penalties)?;
        let classification = self.classifier.classify(&adjusted, workload);
        let guidance = self.guidance.render(&classification)?;

        info!(
            baseline_id = %baseline.id(),
            site = %baseline.input().site,
            band = %classification.band,
            adjusted_wbgt_c = classification.adjusted_wbgt_c,
            penalties = classification.applied.len(),
            "Assessment complete"
        );

        Ok(AssessmentReport {
            generated_at: Utc::now(),
            site: baseline.input().site.clone(),
            baseline: Arc::clone(baseline),
            superseded: adjusted.superseded().iter().map(|p| p.id().to_string()).collect(),
            classification,
            guidance,
        })
    }
}
