//! Engine Configuration - every regulatory parameter as an operator-tunable TOML value
//!
//! Each struct implements `Default` with the values in `defaults.rs`, so the
//! engine behaves identically with no config file present. Tables that the
//! engine must be able to look up exhaustively (thresholds per workload,
//! guidance per band) are maps: a table given in TOML replaces the built-in
//! one and must be complete, otherwise loading fails.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;
use crate::physics_engine::WbgtFormula;
use crate::types::{
    CombinationRule, PenaltyKind, PenaltyMode, RiskBand, UnitSystem, WorkloadIntensity,
};

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one deployment of the engine.
///
/// Load with `EngineConfig::load()` which searches:
/// 1. `$HEATSTRESS_CONFIG` env var
/// 2. `./heatstress.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Site identification
    #[serde(default)]
    pub site: SiteInfo,

    /// WBGT formula and input plausibility bounds
    #[serde(default)]
    pub baseline: BaselineConfig,

    /// Penalty catalog, combination rules and caps
    #[serde(default)]
    pub penalties: PenaltyConfig,

    /// Band lower bounds per workload intensity
    #[serde(default)]
    pub thresholds: ThresholdTable,

    /// Acclimatization adjustment
    #[serde(default)]
    pub acclimatization: AcclimatizationConfig,

    /// Guidance text and regimens per band
    #[serde(default)]
    pub guidance: GuidanceTable,

    /// Presentation defaults
    #[serde(default)]
    pub output: OutputConfig,
}

impl EngineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$HEATSTRESS_CONFIG` environment variable
    /// 2. `./heatstress.toml` in the current working directory
    /// 3. Built-in defaults
    ///
    /// Defaults are used only when no config file is present. A file that
    /// exists but cannot be read, parsed or validated is an error.
    pub fn load() -> Result<Self, ConfigError> {
        let env_path = std::env::var_os(defaults::CONFIG_ENV_VAR).map(PathBuf::from);
        Self::load_from_search(env_path.as_deref(), Path::new(defaults::LOCAL_CONFIG_FILE))
    }

    /// Search order of [`load`](Self::load) with explicit candidates.
    ///
    /// `env_path` names a file the operator asked for, so it must exist.
    /// `local_path` is optional: when it is absent the defaults apply.
    pub fn load_from_search(env_path: Option<&Path>, local_path: &Path) -> Result<Self, ConfigError> {
        if let Some(p) = env_path {
            let config = Self::load_from_file(p)?;
            info!(path = %p.display(), site = %config.site.name, "Loaded engine config from HEATSTRESS_CONFIG");
            return Ok(config);
        }

        if local_path.exists() {
            let config = Self::load_from_file(local_path)?;
            info!(path = %local_path.display(), site = %config.site.name, "Loaded engine config");
            return Ok(config);
        }

        info!("No heatstress.toml found, using built-in defaults");
        Ok(Self::default())
    }

    /// Load from a specific TOML file path.
    ///
    /// Unlike `load()`, this never falls back: an unreadable, unparsable or
    /// invalid file is an error.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        // Two-pass: check for unknown keys first (warnings only)
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save config to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Engine config saved");
        Ok(())
    }

    /// Validate every table for integrity.
    ///
    /// Rules:
    /// - Input bounds are finite with min < max
    /// - Every penalty definition is non-decreasing (additive ≥ 0, multiplier ≥ 1)
    /// - Every workload has a threshold row, strictly increasing by severity
    /// - Every band has a guidance entry with a full-hour regimen
    /// - Caps and the acclimatization shift are finite and ≥ 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        // Baseline bounds
        let b = &self.baseline;
        for (name, bounds) in b.named_bounds() {
            Self::check_bounds(name, bounds, &mut errors);
        }
        if b.wind_speed_ms.min < 0.0 {
            errors.push(format!(
                "baseline.wind_speed_ms.min ({:.1}) must be >= 0",
                b.wind_speed_ms.min
            ));
        }
        if b.relative_humidity_pct.min < 0.0 || b.relative_humidity_pct.max > 100.0 {
            errors.push("baseline.relative_humidity_pct must lie within 0-100 %".to_string());
        }
        if !b.max_wet_bulb_excess_c.is_finite() || b.max_wet_bulb_excess_c < 0.0 {
            errors.push(format!(
                "baseline.max_wet_bulb_excess_c ({}) must be finite and >= 0",
                b.max_wet_bulb_excess_c
            ));
        }

        // Penalty definitions are checked through the same constructor the
        // engine uses, so a definition that passes here cannot lower WBGT.
        if let Err(e) = crate::penalty::PenaltyCatalog::from_definitions(&self.penalties.catalog) {
            match e {
                ConfigError::Validation(list) => errors.extend(list),
                other => errors.push(other.to_string()),
            }
        }
        for (kind, cap) in self.penalties.caps.named_caps() {
            if let Some(cap) = cap {
                if !cap.is_finite() || cap < 0.0 {
                    errors.push(format!("penalties.caps.{kind} ({cap}) must be finite and >= 0"));
                }
            }
        }

        // Thresholds
        for workload in WorkloadIntensity::ALL {
            match self.thresholds.get(workload) {
                Some(row) => Self::check_escalation(row, workload.key(), &mut errors),
                None => errors.push(ConfigError::MissingThreshold(workload).to_string()),
            }
        }

        let shift = self.acclimatization.unacclimatized_shift_c;
        if !shift.is_finite() || shift < 0.0 {
            errors.push(format!(
                "acclimatization.unacclimatized_shift_c ({shift}) must be finite and >= 0"
            ));
        }

        // Guidance
        if let Err(e) = self.guidance.validate() {
            match e {
                ConfigError::Validation(list) => errors.extend(list),
                other => errors.push(other.to_string()),
            }
        }

        // Physical range validation
        let (range_errors, range_warnings) = super::validation::validate_physical_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_bounds(name: &str, bounds: &Bounds, errors: &mut Vec<String>) {
        if !bounds.min.is_finite() || !bounds.max.is_finite() {
            errors.push(format!(
                "baseline.{name}: bounds must be finite (got min={}, max={})",
                bounds.min, bounds.max
            ));
            return;
        }
        if bounds.min >= bounds.max {
            errors.push(format!(
                "baseline.{name}: min ({:.2}) must be < max ({:.2})",
                bounds.min, bounds.max
            ));
        }
    }

    fn check_escalation(row: &BandThresholds, name: &str, errors: &mut Vec<String>) {
        let values = row.as_array();
        // NaN/Inf comparisons silently pass, catch them explicitly
        if values.iter().any(|v| !v.is_finite()) {
            errors.push(format!("thresholds.{name}: values must be finite (got {values:?})"));
            return;
        }
        for pair in values.windows(2) {
            if pair[1] <= pair[0] {
                errors.push(format!(
                    "thresholds.{name}: bands must strictly increase \
                     (caution < warning < danger < extreme), got {values:?}"
                ));
                return;
            }
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

/// Configuration integrity failure.
///
/// Raised at load time; the only runtime path is `GuidanceGenerator::render`
/// meeting a table that was never validated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, std::io::Error),

    #[error("Config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),

    #[error("Penalty '{id}' rejected: {reason}")]
    InvalidPenalty { id: String, reason: String },

    #[error("Penalty id '{0}' is defined more than once")]
    DuplicatePenalty(String),

    #[error("Unknown penalty id '{0}' (not in the configured catalog)")]
    UnknownPenalty(String),

    #[error("No threshold row for workload '{}'", .0.key())]
    MissingThreshold(WorkloadIntensity),

    #[error("No guidance entry for band {0}")]
    MissingGuidance(RiskBand),
}

// ============================================================================
// Site Info
// ============================================================================

/// Identification metadata, not used for logic but appears in logs and reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteInfo {
    #[serde(default = "default_site_name")]
    pub name: String,

    /// Operator / employer
    #[serde(default)]
    pub operator: String,
}

fn default_site_name() -> String {
    "DEFAULT".to_string()
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            operator: String::new(),
        }
    }
}

// ============================================================================
// Baseline Config
// ============================================================================

/// Inclusive plausibility range for one physical quantity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// WBGT formula selection and input validation bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BaselineConfig {
    /// `outdoor` (solar load) or `indoor`
    #[serde(default)]
    pub formula: WbgtFormula,

    /// Damp the globe's radiant excess by wind speed before weighting
    #[serde(default = "default_true")]
    pub wind_correction: bool,

    #[serde(default = "default_dry_bulb_bounds")]
    pub dry_bulb_c: Bounds,

    #[serde(default = "default_wet_bulb_bounds")]
    pub wet_bulb_c: Bounds,

    #[serde(default = "default_globe_bounds")]
    pub globe_c: Bounds,

    #[serde(default = "default_wind_bounds")]
    pub wind_speed_ms: Bounds,

    #[serde(default = "default_pressure_bounds")]
    pub pressure_kpa: Bounds,

    #[serde(default = "default_rh_bounds")]
    pub relative_humidity_pct: Bounds,

    /// Largest tolerated wet-bulb − dry-bulb difference (°C)
    #[serde(default = "default_wet_bulb_excess")]
    pub max_wet_bulb_excess_c: f64,
}

fn default_true() -> bool { true }
fn default_dry_bulb_bounds() -> Bounds { Bounds::new(defaults::DRY_BULB_MIN_C, defaults::DRY_BULB_MAX_C) }
fn default_wet_bulb_bounds() -> Bounds { Bounds::new(defaults::WET_BULB_MIN_C, defaults::WET_BULB_MAX_C) }
fn default_globe_bounds() -> Bounds { Bounds::new(defaults::GLOBE_MIN_C, defaults::GLOBE_MAX_C) }
fn default_wind_bounds() -> Bounds { Bounds::new(defaults::WIND_MIN_MS, defaults::WIND_MAX_MS) }
fn default_pressure_bounds() -> Bounds { Bounds::new(defaults::PRESSURE_MIN_KPA, defaults::PRESSURE_MAX_KPA) }
fn default_rh_bounds() -> Bounds { Bounds::new(defaults::RH_MIN_PCT, defaults::RH_MAX_PCT) }
fn default_wet_bulb_excess() -> f64 { defaults::MAX_WET_BULB_EXCESS_C }

impl BaselineConfig {
    fn named_bounds(&self) -> [(&'static str, &Bounds); 6] {
        [
            ("dry_bulb_c", &self.dry_bulb_c),
            ("wet_bulb_c", &self.wet_bulb_c),
            ("globe_c", &self.globe_c),
            ("wind_speed_ms", &self.wind_speed_ms),
            ("pressure_kpa", &self.pressure_kpa),
            ("relative_humidity_pct", &self.relative_humidity_pct),
        ]
    }
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            formula: WbgtFormula::default(),
            wind_correction: default_true(),
            dry_bulb_c: default_dry_bulb_bounds(),
            wet_bulb_c: default_wet_bulb_bounds(),
            globe_c: default_globe_bounds(),
            wind_speed_ms: default_wind_bounds(),
            pressure_kpa: default_pressure_bounds(),
            relative_humidity_pct: default_rh_bounds(),
            max_wet_bulb_excess_c: default_wet_bulb_excess(),
        }
    }
}

// ============================================================================
// Penalty Config
// ============================================================================

/// One catalog entry as written in TOML.
///
/// Definitions are turned into `PenaltyDescriptor`s at load time; that
/// conversion is where a decreasing definition is rejected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PenaltyDefinition {
    /// Stable id used by callers (`ppe_encapsulating`)
    pub id: String,
    /// Human label (`Encapsulating suit`)
    pub label: String,
    pub kind: PenaltyKind,
    #[serde(default = "default_penalty_mode")]
    pub mode: PenaltyMode,
    /// °C for additive penalties, factor for multiplicative ones
    pub magnitude: f64,
}

fn default_penalty_mode() -> PenaltyMode {
    PenaltyMode::Additive
}

impl PenaltyDefinition {
    pub fn additive(id: &str, label: &str, kind: PenaltyKind, magnitude_c: f64) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            kind,
            mode: PenaltyMode::Additive,
            magnitude: magnitude_c,
        }
    }

    pub fn multiplicative(id: &str, label: &str, kind: PenaltyKind, factor: f64) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            kind,
            mode: PenaltyMode::Multiplicative,
            magnitude: factor,
        }
    }
}

/// Penalty catalog plus how members of one kind combine and are capped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PenaltyConfig {
    #[serde(default = "default_catalog")]
    pub catalog: Vec<PenaltyDefinition>,

    #[serde(default)]
    pub combination: CombinationConfig,

    #[serde(default)]
    pub caps: PenaltyCaps,
}

fn default_catalog() -> Vec<PenaltyDefinition> {
    use PenaltyKind::{Clothing, Enclosure, Ppe, Radiant, SiteSpecific};
    vec![
        PenaltyDefinition::additive("ppe_light", "Light PPE (cotton coveralls)", Ppe, 1.0),
        PenaltyDefinition::additive("ppe_moderate", "Moderate PPE (SMS coveralls, apron)", Ppe, 2.0),
        PenaltyDefinition::additive("ppe_heavy", "Heavy PPE (chemical-resistant suit)", Ppe, 3.0),
        PenaltyDefinition::additive("ppe_encapsulating", "Encapsulating suit", Ppe, 5.0),
        PenaltyDefinition::additive("clothing_extra_layer", "Additional clothing layer", Clothing, 1.0),
        PenaltyDefinition::additive("clothing_thermal", "Thermal / FR double layer", Clothing, 2.0),
        PenaltyDefinition::additive("radiant_hot_surfaces", "Hot surfaces nearby", Radiant, 2.0),
        PenaltyDefinition::additive("radiant_direct", "Direct radiant source", Radiant, 4.0),
        PenaltyDefinition::additive("radiant_extreme", "Extreme radiant (furnace, molten metal)", Radiant, 5.0),
        PenaltyDefinition::additive("enclosure_open_vehicle", "Open vehicle", Enclosure, 1.0),
        PenaltyDefinition::additive("enclosure_enclosed", "Enclosed space", Enclosure, 2.0),
        PenaltyDefinition::additive("enclosure_poorly_ventilated", "Poorly ventilated enclosure", Enclosure, 3.0),
        PenaltyDefinition::multiplicative("vehicle_cabin_no_ac", "Vehicle cabin, no A/C", Enclosure, 1.1),
        PenaltyDefinition::additive("site_minor", "Site allowance (minor)", SiteSpecific, 1.0),
        PenaltyDefinition::additive("site_moderate", "Site allowance (moderate)", SiteSpecific, 2.0),
        PenaltyDefinition::additive("site_severe", "Site allowance (severe)", SiteSpecific, 4.0),
    ]
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
            combination: CombinationConfig::default(),
            caps: PenaltyCaps::default(),
        }
    }
}

/// Combination rule per penalty kind.
///
/// Anything other than `reject` must be configured explicitly; the default
/// refuses ambiguous stacking except for site allowances, which sum.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CombinationConfig {
    #[serde(default)]
    pub ppe: CombinationRule,
    #[serde(default)]
    pub clothing: CombinationRule,
    #[serde(default)]
    pub radiant: CombinationRule,
    #[serde(default)]
    pub enclosure: CombinationRule,
    #[serde(default = "default_site_combination")]
    pub site_specific: CombinationRule,
}

fn default_site_combination() -> CombinationRule {
    CombinationRule::Sum
}

impl CombinationConfig {
    pub fn rule_for(&self, kind: PenaltyKind) -> CombinationRule {
        match kind {
            PenaltyKind::Ppe => self.ppe,
            PenaltyKind::Clothing => self.clothing,
            PenaltyKind::Radiant => self.radiant,
            PenaltyKind::Enclosure => self.enclosure,
            PenaltyKind::SiteSpecific => self.site_specific,
        }
    }
}

impl Default for CombinationConfig {
    fn default() -> Self {
        Self {
            ppe: CombinationRule::Reject,
            clothing: CombinationRule::Reject,
            radiant: CombinationRule::Reject,
            enclosure: CombinationRule::Reject,
            site_specific: default_site_combination(),
        }
    }
}

/// Upper limits on additive contributions (°C). `None` disables a cap
/// (written as `"off"` in TOML).
///
/// A cap only shrinks a non-negative contribution toward zero, so it can
/// never take the adjusted value below the baseline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PenaltyCaps {
    #[serde(default = "default_cap_ppe", with = "cap_setting")]
    pub ppe: Option<f64>,
    #[serde(default = "default_cap_clothing", with = "cap_setting")]
    pub clothing: Option<f64>,
    #[serde(default = "default_cap_radiant", with = "cap_setting")]
    pub radiant: Option<f64>,
    #[serde(default = "default_cap_enclosure", with = "cap_setting")]
    pub enclosure: Option<f64>,
    #[serde(default = "default_cap_site", with = "cap_setting")]
    pub site_specific: Option<f64>,
    /// Cap on the sum of all additive contributions
    #[serde(default = "default_cap_total", with = "cap_setting")]
    pub total_additive: Option<f64>,
}

/// TOML form of one cap: a number of °C, or `"off"` for no cap.
///
/// TOML has no null, so a disabled cap has to be spelled out; an omitted
/// key means the built-in cap.
mod cap_setting {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const OFF: &str = "off";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum CapValue {
        Limit(f64),
        Keyword(String),
    }

    pub fn serialize<S: Serializer>(cap: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match cap {
            Some(limit) => serializer.serialize_f64(*limit),
            None => serializer.serialize_str(OFF),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        match CapValue::deserialize(deserializer)? {
            CapValue::Limit(limit) => Ok(Some(limit)),
            CapValue::Keyword(word) if word == OFF => Ok(None),
            CapValue::Keyword(word) => Err(D::Error::custom(format!(
                "expected a cap in °C or \"{OFF}\", got \"{word}\""
            ))),
        }
    }
}

fn default_cap_ppe() -> Option<f64> { Some(defaults::CAP_PPE_C) }
fn default_cap_clothing() -> Option<f64> { Some(defaults::CAP_CLOTHING_C) }
fn default_cap_radiant() -> Option<f64> { Some(defaults::CAP_RADIANT_C) }
fn default_cap_enclosure() -> Option<f64> { Some(defaults::CAP_ENCLOSURE_C) }
fn default_cap_site() -> Option<f64> { Some(defaults::CAP_SITE_SPECIFIC_C) }
fn default_cap_total() -> Option<f64> { Some(defaults::CAP_TOTAL_ADDITIVE_C) }

impl PenaltyCaps {
    pub fn cap_for(&self, kind: PenaltyKind) -> Option<f64> {
        match kind {
            PenaltyKind::Ppe => self.ppe,
            PenaltyKind::Clothing => self.clothing,
            PenaltyKind::Radiant => self.radiant,
            PenaltyKind::Enclosure => self.enclosure,
            PenaltyKind::SiteSpecific => self.site_specific,
        }
    }

    /// No caps at all
    pub fn none() -> Self {
        Self {
            ppe: None,
            clothing: None,
            radiant: None,
            enclosure: None,
            site_specific: None,
            total_additive: None,
        }
    }

    fn named_caps(&self) -> [(&'static str, Option<f64>); 6] {
        [
            ("ppe", self.ppe),
            ("clothing", self.clothing),
            ("radiant", self.radiant),
            ("enclosure", self.enclosure),
            ("site_specific", self.site_specific),
            ("total_additive", self.total_additive),
        ]
    }
}

impl Default for PenaltyCaps {
    fn default() -> Self {
        Self {
            ppe: default_cap_ppe(),
            clothing: default_cap_clothing(),
            radiant: default_cap_radiant(),
            enclosure: default_cap_enclosure(),
            site_specific: default_cap_site(),
            total_additive: default_cap_total(),
        }
    }
}

// ============================================================================
// Thresholds
// ============================================================================

/// Lower bounds (°C WBGT) of each band above `Safe` for one workload row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BandThresholds {
    pub caution_c: f64,
    pub warning_c: f64,
    pub danger_c: f64,
    pub extreme_c: f64,
}

impl BandThresholds {
    pub const fn from_array(values: [f64; 4]) -> Self {
        Self {
            caution_c: values[0],
            warning_c: values[1],
            danger_c: values[2],
            extreme_c: values[3],
        }
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.caution_c, self.warning_c, self.danger_c, self.extreme_c]
    }

    /// Lower bound of `band`; `Safe` is unbounded below.
    pub fn lower_bound(&self, band: RiskBand) -> f64 {
        match band {
            RiskBand::Safe => f64::NEG_INFINITY,
            RiskBand::Caution => self.caution_c,
            RiskBand::Warning => self.warning_c,
            RiskBand::Danger => self.danger_c,
            RiskBand::Extreme => self.extreme_c,
        }
    }

    /// Every bound lowered by `delta_c` (a positive delta is more conservative).
    pub fn lowered_by(&self, delta_c: f64) -> Self {
        Self {
            caution_c: self.caution_c - delta_c,
            warning_c: self.warning_c - delta_c,
            danger_c: self.danger_c - delta_c,
            extreme_c: self.extreme_c - delta_c,
        }
    }
}

/// Threshold rows keyed by workload intensity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ThresholdTable {
    rows: BTreeMap<WorkloadIntensity, BandThresholds>,
}

impl ThresholdTable {
    pub fn new(rows: BTreeMap<WorkloadIntensity, BandThresholds>) -> Self {
        Self { rows }
    }

    pub fn get(&self, workload: WorkloadIntensity) -> Option<&BandThresholds> {
        self.rows.get(&workload)
    }

    pub fn set(&mut self, workload: WorkloadIntensity, row: BandThresholds) {
        self.rows.insert(workload, row);
    }

    pub fn remove(&mut self, workload: WorkloadIntensity) -> Option<BandThresholds> {
        self.rows.remove(&workload)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&WorkloadIntensity, &BandThresholds)> {
        self.rows.iter()
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        let rows = BTreeMap::from([
            (WorkloadIntensity::Light, BandThresholds::from_array(defaults::THRESHOLDS_LIGHT_C)),
            (WorkloadIntensity::Moderate, BandThresholds::from_array(defaults::THRESHOLDS_MODERATE_C)),
            (WorkloadIntensity::Heavy, BandThresholds::from_array(defaults::THRESHOLDS_HEAVY_C)),
            (WorkloadIntensity::VeryHeavy, BandThresholds::from_array(defaults::THRESHOLDS_VERY_HEAVY_C)),
        ]);
        Self { rows }
    }
}

/// Acclimatization adjustment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AcclimatizationConfig {
    /// Degrees every threshold is lowered for non-acclimatized workers
    #[serde(default = "default_unacclimatized_shift")]
    pub unacclimatized_shift_c: f64,
}

fn default_unacclimatized_shift() -> f64 {
    defaults::UNACCLIMATIZED_SHIFT_C
}

impl Default for AcclimatizationConfig {
    fn default() -> Self {
        Self {
            unacclimatized_shift_c: default_unacclimatized_shift(),
        }
    }
}

// ============================================================================
// Guidance
// ============================================================================

/// Supervisor guidance for one band.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuidanceEntry {
    /// Short category label shown next to the band
    pub label: String,
    /// One-sentence supervisor summary
    pub summary: String,
    /// Recommended actions, most important first
    #[serde(default)]
    pub actions: Vec<String>,
    /// Work minutes per hour
    pub work_minutes: u32,
    /// Rest minutes per hour
    pub rest_minutes: u32,
    /// Recommended fluid intake (mL per hour)
    pub hydration_ml_per_hour: u32,
}

/// Guidance entries keyed by band.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct GuidanceTable {
    entries: BTreeMap<RiskBand, GuidanceEntry>,
}

impl GuidanceTable {
    pub fn new(entries: BTreeMap<RiskBand, GuidanceEntry>) -> Self {
        Self { entries }
    }

    pub fn get(&self, band: RiskBand) -> Option<&GuidanceEntry> {
        self.entries.get(&band)
    }

    pub fn set(&mut self, band: RiskBand, entry: GuidanceEntry) {
        self.entries.insert(band, entry);
    }

    pub fn remove(&mut self, band: RiskBand) -> Option<GuidanceEntry> {
        self.entries.remove(&band)
    }

    /// Bands of the fixed enumeration with no entry
    pub fn missing_bands(&self) -> Vec<RiskBand> {
        RiskBand::ALL
            .into_iter()
            .filter(|band| !self.entries.contains_key(band))
            .collect()
    }

    /// Every band has an entry with a label, a full-hour regimen and a
    /// plausible hydration rate. All problems are reported together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        for band in RiskBand::ALL {
            match self.get(band) {
                Some(entry) => Self::check_entry(band, entry, &mut errors),
                None => errors.push(ConfigError::MissingGuidance(band).to_string()),
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_entry(band: RiskBand, entry: &GuidanceEntry, errors: &mut Vec<String>) {
        let key = band.key();
        if entry.label.trim().is_empty() {
            errors.push(format!("guidance.{key}.label must not be empty"));
        }
        if entry.work_minutes + entry.rest_minutes != defaults::REGIMEN_CYCLE_MINUTES {
            errors.push(format!(
                "guidance.{key}: work_minutes ({}) + rest_minutes ({}) must equal {}",
                entry.work_minutes,
                entry.rest_minutes,
                defaults::REGIMEN_CYCLE_MINUTES
            ));
        }
        if entry.hydration_ml_per_hour == 0
            || entry.hydration_ml_per_hour > defaults::MAX_HYDRATION_ML_PER_HOUR
        {
            errors.push(format!(
                "guidance.{key}.hydration_ml_per_hour ({}) must be within 1-{} mL/h",
                entry.hydration_ml_per_hour,
                defaults::MAX_HYDRATION_ML_PER_HOUR
            ));
        }
    }
}

fn guidance(
    label: &str,
    summary: &str,
    actions: &[&str],
    work_minutes: u32,
    hydration_ml_per_hour: u32,
) -> GuidanceEntry {
    GuidanceEntry {
        label: label.to_string(),
        summary: summary.to_string(),
        actions: actions.iter().map(|a| (*a).to_string()).collect(),
        work_minutes,
        rest_minutes: defaults::REGIMEN_CYCLE_MINUTES - work_minutes,
        hydration_ml_per_hour,
    }
}

impl Default for GuidanceTable {
    fn default() -> Self {
        let entries = BTreeMap::from([
            (
                RiskBand::Safe,
                guidance(
                    "Low environmental heat stress",
                    "Suitable for normal operations. Maintain hydration and routine supervision.",
                    &[
                        "Encourage fluids: about 250 mL every 30 minutes",
                        "Routine supervision",
                    ],
                    60,
                    500,
                ),
            ),
            (
                RiskBand::Caution,
                guidance(
                    "Heightened / Caution",
                    "Increase supervision, enforce hydration, consider work-rest cycles.",
                    &[
                        "Enforce scheduled breaks in shade",
                        "Provide 250 mL every 20 minutes; electrolytes every 2-3 hours",
                        "Buddy system for new or returning workers",
                        "Actively monitor for early symptoms",
                    ],
                    45,
                    750,
                ),
            ),
            (
                RiskBand::Warning,
                guidance(
                    "High strain warning",
                    "Restrict exposure, enforce shortened work-rest cycles, actively cool workers.",
                    &[
                        "Shorten work periods; rest in shade or cooled area",
                        "Provide 250-500 mL every 20 minutes; do not exceed 1.5 L/h",
                        "Reschedule heavy tasks to cooler hours",
                        "Supervisor checks every 30 minutes",
                    ],
                    30,
                    1_000,
                ),
            ),
            (
                RiskBand::Danger,
                guidance(
                    "Withdrawal threshold",
                    "Stop routine work. Only essential tasks with strict controls and medical watch.",
                    &[
                        "Stop routine work",
                        "Essential tasks only, short exposures with mandatory cooling",
                        "Medical watch; activate first-aid triggers on any red-flag symptom",
                        "Provide 250-500 mL every 20 minutes; do not exceed 1.5 L/h",
                    ],
                    15,
                    1_000,
                ),
            ),
            (
                RiskBand::Extreme,
                guidance(
                    "Withdrawal / Stop Work",
                    "Stop normal work. Only emergency tasks with strict controls and medical monitoring.",
                    &[
                        "Stop all non-emergency work",
                        "Emergency tasks only, under medical monitoring",
                        "Mandatory cooling interventions",
                        "Activate EMS for confusion, collapse or hot dry skin",
                    ],
                    0,
                    1_000,
                ),
            ),
        ]);
        Self { entries }
    }
}

// ============================================================================
// Output Config
// ============================================================================

/// Presentation defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// Units used when rendering temperatures into rationale text
    #[serde(default)]
    pub units: UnitSystem,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config: EngineConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.baseline.formula, WbgtFormula::Outdoor);
        assert_eq!(config.acclimatization.unacclimatized_shift_c, 2.0);
        assert_eq!(config.penalties.catalog.len(), default_catalog().len());
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[site]
name = "Refinery Unit 4"

[baseline]
formula = "indoor"

[penalties.combination]
radiant = "max"
"#;
        let config = EngineConfig::from_toml_str(toml_str).expect("partial TOML should load");
        assert_eq!(config.site.name, "Refinery Unit 4");
        assert_eq!(config.baseline.formula, WbgtFormula::Indoor);
        assert_eq!(config.penalties.combination.radiant, CombinationRule::Max);
        // Non-overridden values retain defaults
        assert!(config.baseline.wind_correction);
        assert_eq!(config.penalties.combination.ppe, CombinationRule::Reject);
        assert_eq!(config.penalties.combination.site_specific, CombinationRule::Sum);
        assert_eq!(config.thresholds, ThresholdTable::default());
    }

    #[test]
    fn test_validation_catches_inverted_thresholds() {
        let mut config = EngineConfig::default();
        config.thresholds.set(
            WorkloadIntensity::Heavy,
            BandThresholds::from_array([25.0, 24.0, 27.0, 30.0]),
        );
        let result = config.validate();
        assert!(result.is_err(), "Inverted thresholds should fail validation");
        if let Err(ConfigError::Validation(errors)) = result {
            assert!(errors.iter().any(|e| e.contains("thresholds.heavy")));
        }
    }

    #[test]
    fn test_validation_catches_equal_thresholds() {
        let mut config = EngineConfig::default();
        config.thresholds.set(
            WorkloadIntensity::Light,
            BandThresholds::from_array([27.5, 27.5, 31.0, 33.0]),
        );
        assert!(config.validate().is_err(), "Equal bounds make a band empty");
    }

    #[test]
    fn test_validation_catches_missing_threshold_row() {
        let mut config = EngineConfig::default();
        config.thresholds.remove(WorkloadIntensity::VeryHeavy);
        let Err(ConfigError::Validation(errors)) = config.validate() else {
            panic!("missing row must fail validation");
        };
        assert!(errors.iter().any(|e| e.contains("very_heavy")));
    }

    #[test]
    fn test_validation_catches_missing_guidance() {
        let mut config = EngineConfig::default();
        config.guidance.remove(RiskBand::Danger);
        let Err(ConfigError::Validation(errors)) = config.validate() else {
            panic!("missing guidance must fail validation");
        };
        assert!(errors.iter().any(|e| e.contains("DANGER")));
        assert_eq!(config.guidance.missing_bands(), vec![RiskBand::Danger]);
    }

    #[test]
    fn test_validation_catches_negative_penalty() {
        let mut config = EngineConfig::default();
        config.penalties.catalog.push(PenaltyDefinition::additive(
            "shade_cloth",
            "Shade cloth",
            PenaltyKind::SiteSpecific,
            -1.5,
        ));
        let Err(ConfigError::Validation(errors)) = config.validate() else {
            panic!("negative additive penalty must fail validation");
        };
        assert!(errors.iter().any(|e| e.contains("shade_cloth")));
    }

    #[test]
    fn test_validation_catches_sub_unity_multiplier() {
        let mut config = EngineConfig::default();
        config.penalties.catalog.push(PenaltyDefinition::multiplicative(
            "cooling_vest",
            "Cooling vest",
            PenaltyKind::Ppe,
            0.9,
        ));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_catches_bad_regimen() {
        let mut config = EngineConfig::default();
        let mut entry = config.guidance.get(RiskBand::Warning).cloned().expect("default entry");
        entry.rest_minutes = 10;
        config.guidance.set(RiskBand::Warning, entry);
        assert!(config.validate().is_err(), "30 + 10 minutes is not a full hour");
    }

    #[test]
    fn test_validation_catches_negative_shift() {
        let mut config = EngineConfig::default();
        config.acclimatization.unacclimatized_shift_c = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_guidance_table_is_rejected() {
        let toml_str = r#"
[guidance.safe]
label = "All clear"
summary = "Normal work"
work_minutes = 60
rest_minutes = 0
hydration_ml_per_hour = 500
"#;
        let result = EngineConfig::from_toml_str(toml_str);
        assert!(
            matches!(result, Err(ConfigError::Validation(_))),
            "A guidance table that omits bands must not load"
        );
    }

    #[test]
    fn test_roundtrip_toml() {
        let original = EngineConfig::default();
        let toml_str = original.to_toml().expect("serialization should work");
        let roundtripped: EngineConfig =
            toml::from_str(&toml_str).expect("deserialization should work");
        assert_eq!(original, roundtripped);
    }

    #[test]
    fn test_all_sections_serialize() {
        let toml_str = EngineConfig::default().to_toml().expect("serialization should work");
        assert!(toml_str.contains("[site]"), "Missing [site] section");
        assert!(toml_str.contains("[baseline]"), "Missing [baseline] section");
        assert!(toml_str.contains("[[penalties.catalog]]"), "Missing catalog");
        assert!(toml_str.contains("[thresholds.moderate]"), "Missing moderate row");
        assert!(toml_str.contains("[guidance.extreme]"), "Missing extreme guidance");
        assert!(toml_str.contains("unacclimatized_shift_c"));
    }

    #[test]
    fn test_disabled_caps_survive_roundtrip() {
        let mut config = EngineConfig::default();
        config.penalties.caps = PenaltyCaps::none();
        let toml_str = config.to_toml().expect("serialization should work");
        assert!(toml_str.contains("ppe = \"off\""), "disabled cap must be written: {toml_str}");
        let reloaded = EngineConfig::from_toml_str(&toml_str).expect("reload");
        assert_eq!(reloaded.penalties.caps, PenaltyCaps::none());
    }

    #[test]
    fn test_cap_can_be_switched_off_per_kind() {
        let toml_str = r#"
[penalties.caps]
radiant = "off"
total_additive = 12
"#;
        let config = EngineConfig::from_toml_str(toml_str).expect("valid caps");
        assert_eq!(config.penalties.caps.radiant, None);
        assert_eq!(config.penalties.caps.total_additive, Some(12.0));
        // Omitted keys keep the built-in cap
        assert_eq!(config.penalties.caps.ppe, Some(defaults::CAP_PPE_C));
    }

    #[test]
    fn test_unknown_cap_keyword_is_parse_error() {
        let result = EngineConfig::from_toml_str("[penalties.caps]\nppe = \"unlimited\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(..))));
    }

    #[test]
    fn test_guidance_table_validate_reports_every_problem() {
        assert!(GuidanceTable::default().validate().is_ok());

        let mut table = GuidanceTable::default();
        table.remove(RiskBand::Extreme);
        let mut entry = table.get(RiskBand::Caution).cloned().expect("default entry");
        entry.hydration_ml_per_hour = 2_000;
        table.set(RiskBand::Caution, entry);

        let Err(ConfigError::Validation(errors)) = table.validate() else {
            panic!("incomplete table must fail");
        };
        assert_eq!(errors.len(), 2, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("EXTREME")));
        assert!(errors.iter().any(|e| e.contains("guidance.caution.hydration_ml_per_hour")));
    }

    #[test]
    fn test_search_uses_defaults_only_without_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = EngineConfig::load_from_search(None, &dir.path().join("heatstress.toml"))
            .expect("no file means defaults");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_search_surfaces_invalid_local_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let local = dir.path().join("heatstress.toml");
        std::fs::write(
            &local,
            "[thresholds.light]\ncaution_c = 30.0\nwarning_c = 29.0\ndanger_c = 31.0\nextreme_c = 33.0\n",
        )
        .expect("write");
        assert!(matches!(
            EngineConfig::load_from_search(None, &local),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_search_requires_named_file_to_exist() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("site.toml");
        let local = dir.path().join("heatstress.toml");
        assert!(matches!(
            EngineConfig::load_from_search(Some(&missing), &local),
            Err(ConfigError::Io(..))
        ));
    }

    #[test]
    fn test_bounds_contains_is_inclusive() {
        let b = Bounds::new(0.0, 30.0);
        assert!(b.contains(0.0));
        assert!(b.contains(30.0));
        assert!(!b.contains(30.01));
    }
}
