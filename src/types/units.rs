//! Unit systems and conversions
//!
//! The engine works internally in °C, m/s and kPa. Imperial values are
//! converted at the boundary and converted back only for display.

use serde::{Deserialize, Serialize};

/// Display / entry unit system
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UnitSystem {
    /// °C, m/s, kPa
    #[default]
    Metric,
    /// °F, mph, inHg
    Imperial,
}

impl std::fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitSystem::Metric => write!(f, "metric"),
            UnitSystem::Imperial => write!(f, "imperial"),
        }
    }
}

const MS_PER_MPH: f64 = 2.23694;
const INHG_PER_KPA: f64 = 0.2953;

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

/// Convert a temperature *difference* (penalty, headroom) from °C to °F.
pub fn delta_celsius_to_fahrenheit(dc: f64) -> f64 {
    dc * 9.0 / 5.0
}

pub fn ms_to_mph(v: f64) -> f64 {
    v * MS_PER_MPH
}

pub fn mph_to_ms(v: f64) -> f64 {
    v / MS_PER_MPH
}

pub fn kpa_to_inhg(p: f64) -> f64 {
    p * INHG_PER_KPA
}

pub fn inhg_to_kpa(p: f64) -> f64 {
    p / INHG_PER_KPA
}

/// Format an absolute temperature stored in °C for the given unit system.
pub fn format_temperature(temp_c: f64, units: UnitSystem) -> String {
    match units {
        UnitSystem::Metric => format!("{temp_c:.1} °C"),
        UnitSystem::Imperial => format!("{:.1} °F", celsius_to_fahrenheit(temp_c)),
    }
}

/// Format a temperature difference stored in °C for the given unit system.
pub fn format_delta(delta_c: f64, units: UnitSystem) -> String {
    match units {
        UnitSystem::Metric => format!("{delta_c:+.1} °C"),
        UnitSystem::Imperial => format!("{:+.1} °F", delta_celsius_to_fahrenheit(delta_c)),
    }
}
