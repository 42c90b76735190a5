//! Checks on `heatstress.toml` that serde alone cannot express.
//!
//! Misspelled keys would otherwise be dropped silently by `#[serde(default)]`
//! and the built-in table used in their place, so the raw document is first
//! walked as a `toml::Value` and every path not in the known set is reported
//! with the nearest valid key. Unknown keys only warn. Implausible bounds
//! and threshold values are checked afterwards on the typed config.

use std::collections::HashSet;

use crate::types::{RiskBand, WorkloadIntensity};

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

const STATIC_KEYS: &[&str] = &[
    // [site]
    "site",
    "site.name",
    "site.operator",
    // [baseline]
    "baseline",
    "baseline.formula",
    "baseline.wind_correction",
    "baseline.max_wet_bulb_excess_c",
    // [penalties]
    "penalties",
    "penalties.catalog",
    "penalties.combination",
    "penalties.combination.ppe",
    "penalties.combination.clothing",
    "penalties.combination.radiant",
    "penalties.combination.enclosure",
    "penalties.combination.site_specific",
    "penalties.caps",
    "penalties.caps.ppe",
    "penalties.caps.clothing",
    "penalties.caps.radiant",
    "penalties.caps.enclosure",
    "penalties.caps.site_specific",
    "penalties.caps.total_additive",
    // [thresholds], [guidance] (rows added below)
    "thresholds",
    "guidance",
    // [acclimatization]
    "acclimatization",
    "acclimatization.unacclimatized_shift_c",
    // [output]
    "output",
    "output.units",
];

const BOUNDED_FIELDS: &[&str] = &[
    "dry_bulb_c",
    "wet_bulb_c",
    "globe_c",
    "wind_speed_ms",
    "pressure_kpa",
    "relative_humidity_pct",
];

const THRESHOLD_FIELDS: &[&str] = &["caution_c", "warning_c", "danger_c", "extreme_c"];

const GUIDANCE_FIELDS: &[&str] = &[
    "label",
    "summary",
    "actions",
    "work_minutes",
    "rest_minutes",
    "hydration_ml_per_hour",
];

/// Returns the complete set of valid dotted key paths for `EngineConfig`.
///
/// Must track the struct hierarchy in engine_config.rs. Threshold and
/// guidance rows are expanded from the workload and band enumerations.
pub fn known_config_keys() -> HashSet<String> {
    let mut keys: HashSet<String> = STATIC_KEYS.iter().map(|k| (*k).to_string()).collect();

    for field in BOUNDED_FIELDS {
        keys.insert(format!("baseline.{field}"));
        keys.insert(format!("baseline.{field}.min"));
        keys.insert(format!("baseline.{field}.max"));
    }
    for workload in WorkloadIntensity::ALL {
        keys.insert(format!("thresholds.{}", workload.key()));
        for field in THRESHOLD_FIELDS {
            keys.insert(format!("thresholds.{}.{field}", workload.key()));
        }
    }
    for band in RiskBand::ALL {
        keys.insert(format!("guidance.{}", band.key()));
        for field in GUIDANCE_FIELDS {
            keys.insert(format!("guidance.{}.{field}", band.key()));
        }
    }
    keys
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Dotted paths of every table and key in `value`.
///
/// `[thresholds.heavy] caution_c = 23.0` yields `thresholds`,
/// `thresholds.heavy` and `thresholds.heavy.caution_c`. Arrays of tables
/// (the penalty catalog) are listed but not descended into.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Edit distance over chars.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties resolve to the lexicographically smallest key so the suggestion is
/// stable across runs.
pub fn suggest_correction(unknown: &str, known: &HashSet<String>) -> Option<String> {
    known
        .iter()
        .map(|k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.clone())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Warnings for every key in `raw_toml` the engine would ignore.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        // Malformed documents are reported by the typed parse
        Err(_) => return Vec::new(),
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Physical Range Validation
// ============================================================================

/// Validate physical ranges on a parsed `EngineConfig`.
///
/// Returns (errors, warnings): errors are impossible values that must
/// prevent startup; warnings are suspicious but not fatal.
pub fn validate_physical_ranges(
    config: &super::EngineConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Nothing on earth reads below -90 °C or above 60 °C air temperature
    let db = &config.baseline.dry_bulb_c;
    if db.min < -90.0 || db.max > 70.0 {
        errors.push(format!(
            "baseline.dry_bulb_c = [{:.1}, {:.1}] is outside physical range (-90 to 70 °C)",
            db.min, db.max
        ));
    }

    // Sea level is ~101.3 kPa; Everest summit ~34 kPa
    let p = &config.baseline.pressure_kpa;
    if p.min < 30.0 || p.max > 120.0 {
        errors.push(format!(
            "baseline.pressure_kpa = [{:.1}, {:.1}] is outside physical range (30-120 kPa)",
            p.min, p.max
        ));
    }

    // A caution bound below 15 °C WBGT would flag ordinary spring days
    for (workload, row) in config.thresholds.iter() {
        if row.caution_c < 15.0 || row.extreme_c > 40.0 {
            warnings.push(ValidationWarning {
                field: format!("thresholds.{}", workload.key()),
                message: format!(
                    "thresholds.{} spans {:.1}-{:.1} °C, outside typical WBGT guidance (15-40 °C)",
                    workload.key(),
                    row.caution_c,
                    row.extreme_c
                ),
                suggestion: None,
            });
        }
    }

    let shift = config.acclimatization.unacclimatized_shift_c;
    if shift > 5.0 {
        warnings.push(ValidationWarning {
            field: "acclimatization.unacclimatized_shift_c".to_string(),
            message: format!(
                "unacclimatized_shift_c = {shift:.1} is larger than typical (0-5 °C)"
            ),
            suggestion: None,
        });
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
