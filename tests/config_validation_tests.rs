//! Config Validation Tests
//!
//! Typo detection, range validation and file loading for `heatstress.toml`,
//! exercised independently from the assessment pipeline.

use std::io::Write;

use heatstress_engine::config::validation::{
    known_config_keys, suggest_correction, validate_physical_ranges, validate_unknown_keys,
};
use heatstress_engine::config::{ConfigError, EngineConfig};
use heatstress_engine::physics_engine::WbgtFormula;
use heatstress_engine::types::CombinationRule;
use heatstress_engine::{PenaltyKind, RiskBand, RiskClassifier, WorkloadContext, WorkloadIntensity};

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_threshold_row_warns_with_suggestion() {
    let toml_str = r#"
[thresholds.heavy]
cauton_c = 23.0
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("cauton_c"));
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("thresholds.heavy.caution_c")
    );
}

#[test]
fn typo_in_site_section_warns() {
    let toml_str = r#"
[site]
naem = "Foundry"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].suggestion.as_deref(), Some("site.name"));
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r#"
[site]
name = "Port Hedland Yard"
operator = "Ore Logistics"

[baseline]
formula = "outdoor"
wind_correction = true
max_wet_bulb_excess_c = 0.5

[baseline.wind_speed_ms]
min = 0.0
max = 25.0

[[penalties.catalog]]
id = "ppe_encapsulating"
label = "Encapsulating suit"
kind = "ppe"
mode = "additive"
magnitude = 5.0

[penalties.combination]
radiant = "max"
site_specific = "sum"

[penalties.caps]
ppe = 6.0
total_additive = 10.0

[thresholds.light]
caution_c = 27.5
warning_c = 29.5
danger_c = 31.0
extreme_c = 33.0

[acclimatization]
unacclimatized_shift_c = 2.0

[guidance.safe]
label = "Low"
summary = "Normal work"
actions = ["Drink water"]
work_minutes = 60
rest_minutes = 0
hydration_ml_per_hour = 500

[output]
units = "imperial"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(
        warnings.is_empty(),
        "Valid config should produce 0 warnings, got: {:?}",
        warnings.iter().map(|w| &w.field).collect::<Vec<_>>()
    );
}

#[test]
fn unknown_top_level_section_warns() {
    let warnings = validate_unknown_keys("[weather_api]\nkey = \"abc\"\n");
    assert!(warnings.iter().any(|w| w.field == "weather_api"));
}

#[test]
fn malformed_toml_yields_no_key_warnings() {
    // Parse errors are reported by serde, not by the key walker
    assert!(validate_unknown_keys("[site\nname = ").is_empty());
}

#[test]
fn suggestion_for_misspelled_band() {
    let known = known_config_keys();
    assert_eq!(
        suggest_correction("guidance.extrem", &known).as_deref(),
        Some("guidance.extreme")
    );
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn defaults_pass_range_validation() {
    let (errors, warnings) = validate_physical_ranges(&EngineConfig::default());
    assert!(errors.is_empty(), "{errors:?}");
    assert!(warnings.is_empty(), "{warnings:?}");
}

#[test]
fn implausible_dry_bulb_bound_is_error() {
    let mut config = EngineConfig::default();
    config.baseline.dry_bulb_c.max = 150.0;
    let (errors, _) = validate_physical_ranges(&config);
    assert!(errors.iter().any(|e| e.contains("dry_bulb_c")));
    assert!(config.validate().is_err());
}

// ============================================================================
// Loading
// ============================================================================

fn write_temp(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write");
    file
}

#[test]
fn load_from_file_applies_overrides() {
    let file = write_temp(
        r#"
[site]
name = "Smelter 2"

[baseline]
formula = "indoor"

[penalties.combination]
ppe = "max"
"#,
    );
    let config = EngineConfig::load_from_file(file.path()).expect("valid config");
    assert_eq!(config.site.name, "Smelter 2");
    assert_eq!(config.baseline.formula, WbgtFormula::Indoor);
    assert_eq!(
        config.penalties.combination.rule_for(PenaltyKind::Ppe),
        CombinationRule::Max
    );
    assert!(config.guidance.missing_bands().is_empty());
}

#[test]
fn load_from_file_rejects_decreasing_penalty() {
    let file = write_temp(
        r#"
[[penalties.catalog]]
id = "misting_fan"
label = "Misting fan"
kind = "site_specific"
magnitude = -2.0
"#,
    );
    match EngineConfig::load_from_file(file.path()) {
        Err(ConfigError::Validation(errors)) => {
            assert!(errors.iter().any(|e| e.contains("misting_fan")), "{errors:?}");
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[test]
fn load_from_file_rejects_incomplete_threshold_table() {
    let file = write_temp(
        r#"
[thresholds.moderate]
caution_c = 25.0
warning_c = 27.0
danger_c = 29.0
extreme_c = 32.0
"#,
    );
    match EngineConfig::load_from_file(file.path()) {
        Err(ConfigError::Validation(errors)) => {
            for workload in [WorkloadIntensity::Light, WorkloadIntensity::Heavy, WorkloadIntensity::VeryHeavy] {
                assert!(errors.iter().any(|e| e.contains(workload.key())), "{errors:?}");
            }
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[test]
fn load_from_file_reports_parse_errors_with_path() {
    let file = write_temp("[baseline]\nformula = \"sideways\"\n");
    let err = EngineConfig::load_from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(..)));
    assert!(err.to_string().contains(&file.path().display().to_string()));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = EngineConfig::load_from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(..)));
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("heatstress.toml");
    let mut config = EngineConfig::default();
    config.site.name = "Saved Site".to_string();
    config.save_to_file(&path).expect("save");
    let loaded = EngineConfig::load_from_file(&path).expect("load");
    assert_eq!(loaded, config);
    assert_eq!(
        loaded.guidance.get(RiskBand::Extreme).map(|g| g.work_minutes),
        Some(0)
    );
}

// ============================================================================
// Search Order
// ============================================================================

const STRICT_ROWS: &str = r#"
[thresholds.light]
caution_c = 22.0
warning_c = 24.0
danger_c = 26.0
extreme_c = 28.0

[thresholds.moderate]
caution_c = 20.0
warning_c = 22.0
danger_c = 24.0
extreme_c = 26.0

[thresholds.heavy]
caution_c = 19.0
warning_c = 21.0
danger_c = 23.0
extreme_c = 25.0

[thresholds.very_heavy]
caution_c = 18.0
warning_c = 20.0
danger_c = 22.0
extreme_c = 24.0
"#;

#[test]
fn site_table_with_one_bad_row_is_not_replaced_by_defaults() {
    let dir = tempfile::tempdir().expect("temp dir");
    let local = dir.path().join("heatstress.toml");
    let broken = STRICT_ROWS.replace("caution_c = 22.0", "caution_c = 25.0");
    std::fs::write(&local, broken).expect("write");

    match EngineConfig::load_from_search(None, &local) {
        Err(ConfigError::Validation(errors)) => {
            assert!(errors.iter().any(|e| e.contains("thresholds.light")), "{errors:?}");
        }
        other => panic!("invalid site config must be surfaced, got {other:?}"),
    }
}

#[test]
fn valid_site_table_is_used_over_defaults() {
    let dir = tempfile::tempdir().expect("temp dir");
    let local = dir.path().join("heatstress.toml");
    std::fs::write(&local, STRICT_ROWS).expect("write");

    let config = EngineConfig::load_from_search(None, &local).expect("valid site config");
    let classifier = RiskClassifier::new(config.thresholds.clone(), config.acclimatization.clone());
    let row = classifier.effective_thresholds(WorkloadContext::default());
    assert_eq!(RiskClassifier::band_for(26.0, &row), RiskBand::Extreme);
}
