//! Wet Bulb Globe Temperature models
//!
//! Closed-form arithmetic only. Every function is pure and takes canonical
//! units (°C, %, m/s).

use serde::{Deserialize, Serialize};

/// WBGT weighting variant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WbgtFormula {
    /// Solar load present: 0.7·Tnwb + 0.2·Tg + 0.1·Tdb
    #[default]
    Outdoor,
    /// No solar load: 0.7·Tnwb + 0.3·Tg
    Indoor,
}

impl std::fmt::Display for WbgtFormula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WbgtFormula::Outdoor => write!(f, "outdoor"),
            WbgtFormula::Indoor => write!(f, "indoor"),
        }
    }
}

/// Wind speed floor for the globe damping factor (m/s)
pub const MIN_WIND_FOR_DAMPING_MS: f64 = 0.1;

/// Globe damping coefficient: f(v) = 1 / (1 + k·√v)
pub const GLOBE_DAMPING_COEFFICIENT: f64 = 0.4;

/// Wet-bulb temperature from dry-bulb and relative humidity (Stull, 2011).
///
/// Valid roughly for RH 5–99 % and −20…50 °C at sea-level pressure; the
/// result is an approximation of the natural wet-bulb used when no wet-bulb
/// reading is available.
pub fn stull_wet_bulb(dry_bulb_c: f64, rh_pct: f64) -> f64 {
    let t = dry_bulb_c;
    let rh = rh_pct;
    t * (0.151_977 * (rh + 8.313_659).sqrt()).atan() + (t + rh).atan() - (rh - 1.676_331).atan()
        + 0.003_918_38 * rh.powf(1.5) * (0.023_101 * rh).atan()
        - 4.686_035
}

/// Globe temperature with its radiant excess damped by air movement.
///
/// Tg' = Tdb + (Tg − Tdb) / (1 + 0.4·√max(v, 0.1))
pub fn wind_corrected_globe(dry_bulb_c: f64, globe_c: f64, wind_speed_ms: f64) -> f64 {
    let v = wind_speed_ms.max(MIN_WIND_FOR_DAMPING_MS);
    let damping = 1.0 / (1.0 + GLOBE_DAMPING_COEFFICIENT * v.sqrt());
    dry_bulb_c + (globe_c - dry_bulb_c) * damping
}

/// Outdoor WBGT (solar load)
pub fn wbgt_outdoor(natural_wet_bulb_c: f64, globe_c: f64, dry_bulb_c: f64) -> f64 {
    0.7 * natural_wet_bulb_c + 0.2 * globe_c + 0.1 * dry_bulb_c
}

/// Indoor WBGT (no solar load)
pub fn wbgt_indoor(natural_wet_bulb_c: f64, globe_c: f64) -> f64 {
    0.7 * natural_wet_bulb_c + 0.3 * globe_c
}

/// Dispatch on the configured formula
pub fn calculate_wbgt(
    formula: WbgtFormula,
    natural_wet_bulb_c: f64,
    globe_c: f64,
    dry_bulb_c: f64,
) -> f64 {
    match formula {
        WbgtFormula::Outdoor => wbgt_outdoor(natural_wet_bulb_c, globe_c, dry_bulb_c),
        WbgtFormula::Indoor => wbgt_indoor(natural_wet_bulb_c, globe_c),
    }
}

/// WBGT at which the strain surrogate starts rising (°C)
pub const STRAIN_INDEX_ONSET_C: f64 = 25.0;
/// WBGT span mapped onto the full surrogate scale (°C)
pub const STRAIN_INDEX_SPAN_C: f64 = 10.0;
/// Top of the surrogate scale
pub const STRAIN_INDEX_MAX: f64 = 50.0;

/// Cumulative heat-strain surrogate on a 0–50 scale.
///
/// Linear in WBGT between 25 °C (0) and 35 °C (50), clamped outside. This is
/// a screening aid, not a physiological model.
pub fn strain_index(wbgt_c: f64) -> f64 {
    let raw = (wbgt_c - STRAIN_INDEX_ONSET_C) / STRAIN_INDEX_SPAN_C * STRAIN_INDEX_MAX;
    raw.clamp(0.0, STRAIN_INDEX_MAX)
}

/// Coarse label for the strain surrogate
pub fn strain_label(index: f64) -> &'static str {
    if index < 15.0 {
        "low internal strain"
    } else if index < 30.0 {
        "mild heat accumulation"
    } else {
        "major heat strain risk"
    }
}
