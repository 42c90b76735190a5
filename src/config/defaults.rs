//! System-wide default constants.
//!
//! Centralises the regulatory-style parameters the engine ships with.
//! Every value here is overridable through `heatstress.toml`; the defaults
//! follow NIOSH / ACGIH-style WBGT guidance for acclimatized workers.

// ============================================================================
// Input plausibility bounds (canonical units)
// ============================================================================

pub const DRY_BULB_MIN_C: f64 = -40.0;
pub const DRY_BULB_MAX_C: f64 = 60.0;

pub const WET_BULB_MIN_C: f64 = -40.0;
pub const WET_BULB_MAX_C: f64 = 45.0;

/// Black globes in direct sun over hot metal can exceed 80 °C.
pub const GLOBE_MIN_C: f64 = -40.0;
pub const GLOBE_MAX_C: f64 = 90.0;

pub const WIND_MIN_MS: f64 = 0.0;
pub const WIND_MAX_MS: f64 = 30.0;

/// Covers high-altitude sites (~2000 m) through deep-pit mines.
pub const PRESSURE_MIN_KPA: f64 = 80.0;
pub const PRESSURE_MAX_KPA: f64 = 110.0;

pub const RH_MIN_PCT: f64 = 0.0;
pub const RH_MAX_PCT: f64 = 100.0;

/// Wet-bulb can read slightly above dry-bulb from sensor tolerance alone.
/// Anything beyond this margin is rejected as implausible.
pub const MAX_WET_BULB_EXCESS_C: f64 = 0.5;

// ============================================================================
// Risk band thresholds (lower bounds, °C WBGT)
// ============================================================================

/// `[caution, warning, danger, extreme]` for light work
pub const THRESHOLDS_LIGHT_C: [f64; 4] = [27.5, 29.5, 31.0, 33.0];
/// `[caution, warning, danger, extreme]` for moderate work
pub const THRESHOLDS_MODERATE_C: [f64; 4] = [25.0, 27.0, 29.0, 32.0];
/// `[caution, warning, danger, extreme]` for heavy work
pub const THRESHOLDS_HEAVY_C: [f64; 4] = [23.0, 25.5, 27.5, 30.0];
/// `[caution, warning, danger, extreme]` for very heavy work
pub const THRESHOLDS_VERY_HEAVY_C: [f64; 4] = [22.0, 24.5, 26.5, 29.0];

/// Every threshold drops by this much for workers who are not acclimatized.
pub const UNACCLIMATIZED_SHIFT_C: f64 = 2.0;

// ============================================================================
// Penalty caps (°C, additive contributions only)
// ============================================================================

pub const CAP_PPE_C: f64 = 6.0;
pub const CAP_CLOTHING_C: f64 = 3.0;
pub const CAP_RADIANT_C: f64 = 5.0;
pub const CAP_ENCLOSURE_C: f64 = 3.0;
pub const CAP_SITE_SPECIFIC_C: f64 = 4.0;
pub const CAP_TOTAL_ADDITIVE_C: f64 = 10.0;

// ============================================================================
// Guidance
// ============================================================================

/// Fluid intake above 1.5 L/h risks hyponatremia.
pub const MAX_HYDRATION_ML_PER_HOUR: u32 = 1_500;

/// Work + rest minutes of every regimen must cover one hour.
pub const REGIMEN_CYCLE_MINUTES: u32 = 60;

// ============================================================================
// Config search
// ============================================================================

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "HEATSTRESS_CONFIG";

/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "heatstress.toml";
