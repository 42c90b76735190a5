//! Frozen Baseline Module - validated, immutable WBGT baselines
//!
//! A baseline is computed once from validated environmental input and then
//! locked: every later stage reads it through `Arc<FrozenBaseline>` and has
//! no way to mutate it. Adjustments for PPE, radiant load and the like are
//! layered on top by the penalty engine, never written back here.
//!
//! ## Architecture
//!
//! - `BaselineCalculator`: validates input and freezes a baseline
//! - `FrozenBaseline`: immutable WBGT value plus provenance
//! - `BaselineId`: identity of one freeze, used to detect stale references
//!
//! ## Usage
//!
//! ```ignore
//! let calculator = BaselineCalculator::new(config.baseline.clone());
//! let input = EnvironmentalInput::measured(38.0, 26.0, 40.0, 1.0, 101.3);
//! let baseline = calculator.freeze(&input)?;
//! assert!(baseline.wbgt_c() > 29.0);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{BaselineConfig, Bounds};
use crate::physics_engine::{calculate_wbgt, stull_wet_bulb, wind_corrected_globe, WbgtFormula};
use crate::types::EnvironmentalInput;

// ============================================================================
// Error Types
// ============================================================================

/// Environmental input rejected before a baseline could be frozen.
///
/// Every variant names the offending field so the caller can correct and
/// resubmit. No partial baseline is ever produced.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    Missing(&'static str),

    #[error("Field {field} is not a finite number ({value})")]
    NotFinite { field: &'static str, value: f64 },

    #[error("Field {field} = {value:.2} is outside plausible range [{min:.2}, {max:.2}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Implausible input: {0}")]
    Implausible(String),
}

// ============================================================================
// Baseline Identity
// ============================================================================

/// Identity of one frozen baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaselineId(Uuid);

impl BaselineId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for BaselineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BaselineId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ============================================================================
// Frozen Baseline
// ============================================================================

/// Locked WBGT baseline.
///
/// Fields are private and there is no `&mut self` method: once frozen, the
/// value cannot change for the rest of the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrozenBaseline {
    id: BaselineId,
    wbgt_c: f64,
    natural_wet_bulb_c: f64,
    effective_globe_c: f64,
    formula: WbgtFormula,
    wet_bulb_derived: bool,
    input: EnvironmentalInput,
    frozen_at: DateTime<Utc>,
}

impl FrozenBaseline {
    pub fn id(&self) -> BaselineId {
        self.id
    }

    /// Baseline WBGT (°C)
    pub fn wbgt_c(&self) -> f64 {
        self.wbgt_c
    }

    /// Natural wet-bulb used in the composition (measured or derived)
    pub fn natural_wet_bulb_c(&self) -> f64 {
        self.natural_wet_bulb_c
    }

    /// Globe temperature after optional wind damping
    pub fn effective_globe_c(&self) -> f64 {
        self.effective_globe_c
    }

    pub fn formula(&self) -> WbgtFormula {
        self.formula
    }

    /// True when wet-bulb was derived from relative humidity
    pub fn wet_bulb_derived(&self) -> bool {
        self.wet_bulb_derived
    }

    /// The validated input the baseline was computed from
    pub fn input(&self) -> &EnvironmentalInput {
        &self.input
    }

    pub fn frozen_at(&self) -> DateTime<Utc> {
        self.frozen_at
    }
}

// ============================================================================
// Calculator
// ============================================================================

/// Validated measurements in canonical units.
struct CheckedInput {
    dry_bulb_c: f64,
    wet_bulb_c: Option<f64>,
    relative_humidity_pct: Option<f64>,
    globe_c: f64,
    wind_speed_ms: f64,
}

/// Turns environmental input into frozen baselines.
#[derive(Debug, Clone, Default)]
pub struct BaselineCalculator {
    config: BaselineConfig,
}

impl BaselineCalculator {
    pub fn new(config: BaselineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BaselineConfig {
        &self.config
    }

    /// Validate `input` and freeze a new baseline.
    ///
    /// Each call yields a new `FrozenBaseline` with a fresh id, even for
    /// identical input.
    pub fn freeze(&self, input: &EnvironmentalInput) -> Result<Arc<FrozenBaseline>, ValidationError> {
        let checked = self.validate(input).inspect_err(|e| {
            warn!(site = %input.site, source = %input.source, error = %e, "Rejected environmental input");
        })?;

        let (natural_wet_bulb_c, wet_bulb_derived) = match checked.wet_bulb_c {
            Some(wb) => (wb, false),
            None => {
                // validate() guarantees one of the two moisture fields
                let rh = checked
                    .relative_humidity_pct
                    .ok_or(ValidationError::Missing("wet_bulb_c | relative_humidity_pct"))?;
                let derived = stull_wet_bulb(checked.dry_bulb_c, rh);
                debug!(dry_bulb_c = checked.dry_bulb_c, rh_pct = rh, wet_bulb_c = derived, "Derived wet-bulb from humidity");
                (derived, true)
            }
        };

        let effective_globe_c = if self.config.wind_correction {
            wind_corrected_globe(checked.dry_bulb_c, checked.globe_c, checked.wind_speed_ms)
        } else {
            checked.globe_c
        };

        let wbgt_c = calculate_wbgt(
            self.config.formula,
            natural_wet_bulb_c,
            effective_globe_c,
            checked.dry_bulb_c,
        );
        if !wbgt_c.is_finite() {
            return Err(ValidationError::Implausible(format!(
                "inputs produce a non-finite WBGT ({wbgt_c})"
            )));
        }

        let baseline = FrozenBaseline {
            id: BaselineId::new(),
            wbgt_c,
            natural_wet_bulb_c,
            effective_globe_c,
            formula: self.config.formula,
            wet_bulb_derived,
            input: input.clone(),
            frozen_at: Utc::now(),
        };

        info!(
            baseline_id = %baseline.id,
            site = %input.site,
            formula = %baseline.formula,
            wbgt_c = format!("{:.2}", baseline.wbgt_c),
            wet_bulb_derived,
            "Baseline frozen"
        );

        Ok(Arc::new(baseline))
    }

    /// Check presence, finiteness, bounds and physical consistency.
    fn validate(&self, input: &EnvironmentalInput) -> Result<CheckedInput, ValidationError> {
        let c = &self.config;

        let dry_bulb_c = Self::require("dry_bulb_c", input.dry_bulb_c, &c.dry_bulb_c)?;
        let globe_c = Self::require("globe_c", input.globe_c, &c.globe_c)?;
        let wind_speed_ms = Self::require("wind_speed_ms", input.wind_speed_ms, &c.wind_speed_ms)?;
        Self::require("pressure_kpa", input.pressure_kpa, &c.pressure_kpa)?;

        let wet_bulb_c = Self::optional("wet_bulb_c", input.wet_bulb_c, &c.wet_bulb_c)?;
        let relative_humidity_pct = Self::optional(
            "relative_humidity_pct",
            input.relative_humidity_pct,
            &c.relative_humidity_pct,
        )?;

        if wet_bulb_c.is_none() && relative_humidity_pct.is_none() {
            return Err(ValidationError::Missing("wet_bulb_c | relative_humidity_pct"));
        }

        if let Some(wb) = wet_bulb_c {
            if wb > dry_bulb_c + c.max_wet_bulb_excess_c {
                return Err(ValidationError::Implausible(format!(
                    "wet_bulb_c ({wb:.2}) exceeds dry_bulb_c ({dry_bulb_c:.2}) by more than {:.2} °C",
                    c.max_wet_bulb_excess_c
                )));
            }
        }

        Ok(CheckedInput {
            dry_bulb_c,
            wet_bulb_c,
            relative_humidity_pct,
            globe_c,
            wind_speed_ms,
        })
    }

    fn require(field: &'static str, value: Option<f64>, bounds: &Bounds) -> Result<f64, ValidationError> {
        let value = value.ok_or(ValidationError::Missing(field))?;
        Self::check(field, value, bounds)
    }

    fn optional(field: &'static str, value: Option<f64>, bounds: &Bounds) -> Result<Option<f64>, ValidationError> {
        value.map(|v| Self::check(field, v, bounds)).transpose()
    }

    fn check(field: &'static str, value: f64, bounds: &Bounds) -> Result<f64, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NotFinite { field, value });
        }
        if !bounds.contains(value) {
            return Err(ValidationError::OutOfRange {
                field,
                value,
                min: bounds.min,
                max: bounds.max,
            });
        }
        Ok(value)
    }
}

// ============================================================================
// Tests
// ============================================================================
