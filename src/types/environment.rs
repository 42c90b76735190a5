//! Environmental measurement record handed to the engine by a provider

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::units::{fahrenheit_to_celsius, inhg_to_kpa, mph_to_ms};

/// Where a measurement came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    /// Entered by a person at the site (handheld meter, WBGT monitor)
    #[default]
    Manual,
    /// Delivered by an automated weather / measurement feed
    AutomatedFeed,
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceTag::Manual => write!(f, "manual"),
            SourceTag::AutomatedFeed => write!(f, "automated_feed"),
        }
    }
}

/// One site/time environmental record.
///
/// Every physical quantity is optional so that a provider can mark a value
/// as explicitly absent. Nothing is zero-filled: validation happens when the
/// baseline is frozen, and a missing required field rejects the record.
///
/// Canonical units: °C, %, m/s, kPa.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentalInput {
    /// Dry-bulb air temperature (°C)
    #[serde(default)]
    pub dry_bulb_c: Option<f64>,
    /// Measured (natural) wet-bulb temperature (°C)
    #[serde(default)]
    pub wet_bulb_c: Option<f64>,
    /// Relative humidity (%), used to derive wet-bulb when it was not measured
    #[serde(default)]
    pub relative_humidity_pct: Option<f64>,
    /// Black-globe temperature (°C)
    #[serde(default)]
    pub globe_c: Option<f64>,
    /// Wind speed (m/s)
    #[serde(default)]
    pub wind_speed_ms: Option<f64>,
    /// Barometric pressure (kPa)
    #[serde(default)]
    pub pressure_kpa: Option<f64>,
    /// Measurement time
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub source: SourceTag,
    /// Free-form site / location label, carried into reports only
    #[serde(default)]
    pub site: String,
}

impl EnvironmentalInput {
    /// Record with every measurement absent, stamped now.
    pub fn empty(source: SourceTag) -> Self {
        Self {
            dry_bulb_c: None,
            wet_bulb_c: None,
            relative_humidity_pct: None,
            globe_c: None,
            wind_speed_ms: None,
            pressure_kpa: None,
            timestamp: Utc::now(),
            source,
            site: String::new(),
        }
    }

    /// Fully measured record (dry-bulb, wet-bulb, globe, wind, pressure).
    pub fn measured(
        dry_bulb_c: f64,
        wet_bulb_c: f64,
        globe_c: f64,
        wind_speed_ms: f64,
        pressure_kpa: f64,
    ) -> Self {
        Self {
            dry_bulb_c: Some(dry_bulb_c),
            wet_bulb_c: Some(wet_bulb_c),
            globe_c: Some(globe_c),
            wind_speed_ms: Some(wind_speed_ms),
            pressure_kpa: Some(pressure_kpa),
            ..Self::empty(SourceTag::Manual)
        }
    }

    /// Record built from weather-station style data: humidity instead of wet-bulb.
    pub fn from_humidity(
        dry_bulb_c: f64,
        relative_humidity_pct: f64,
        globe_c: f64,
        wind_speed_ms: f64,
        pressure_kpa: f64,
    ) -> Self {
        Self {
            dry_bulb_c: Some(dry_bulb_c),
            relative_humidity_pct: Some(relative_humidity_pct),
            globe_c: Some(globe_c),
            wind_speed_ms: Some(wind_speed_ms),
            pressure_kpa: Some(pressure_kpa),
            ..Self::empty(SourceTag::AutomatedFeed)
        }
    }

    /// Convert a record entered in °F / mph / inHg into canonical units.
    ///
    /// Absent fields stay absent; relative humidity is unit-free.
    pub fn from_imperial(imperial: &Self) -> Self {
        Self {
            dry_bulb_c: imperial.dry_bulb_c.map(fahrenheit_to_celsius),
            wet_bulb_c: imperial.wet_bulb_c.map(fahrenheit_to_celsius),
            relative_humidity_pct: imperial.relative_humidity_pct,
            globe_c: imperial.globe_c.map(fahrenheit_to_celsius),
            wind_speed_ms: imperial.wind_speed_ms.map(mph_to_ms),
            pressure_kpa: imperial.pressure_kpa.map(inhg_to_kpa),
            timestamp: imperial.timestamp,
            source: imperial.source,
            site: imperial.site.clone(),
        }
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = site.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Whether two records carry the same physical measurements.
    ///
    /// Timestamp, source and site are ignored: a re-submitted identical
    /// reading does not force a new baseline.
    pub fn same_measurements(&self, other: &Self) -> bool {
        self.dry_bulb_c == other.dry_bulb_c
            && self.wet_bulb_c == other.wet_bulb_c
            && self.relative_humidity_pct == other.relative_humidity_pct
            && self.globe_c == other.globe_c
            && self.wind_speed_ms == other.wind_speed_ms
            && self.pressure_kpa == other.pressure_kpa
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_absent_fields_stay_absent() {
        let json = r#"{ "dry_bulb_c": 35.0, "globe_c": 41.0, "source": "automated_feed" }"#;
        let input: EnvironmentalInput = serde_json::from_str(json).expect("valid record");
        assert_eq!(input.dry_bulb_c, Some(35.0));
        assert_eq!(input.wet_bulb_c, None);
        assert_eq!(input.wind_speed_ms, None);
        assert_eq!(input.source, SourceTag::AutomatedFeed);
    }

    #[test]
    fn test_from_imperial_converts_every_present_field() {
        let mut raw = EnvironmentalInput::empty(SourceTag::Manual);
        raw.dry_bulb_c = Some(100.4);
        raw.globe_c = Some(104.0);
        raw.wind_speed_ms = Some(2.23694);
        raw.pressure_kpa = Some(29.53);
        raw.relative_humidity_pct = Some(40.0);

        let metric = EnvironmentalInput::from_imperial(&raw);
        assert!((metric.dry_bulb_c.unwrap_or_default() - 38.0).abs() < 1e-9);
        assert!((metric.globe_c.unwrap_or_default() - 40.0).abs() < 1e-9);
        assert!((metric.wind_speed_ms.unwrap_or_default() - 1.0).abs() < 1e-9);
        assert!((metric.pressure_kpa.unwrap_or_default() - 100.0).abs() < 1e-6);
        assert_eq!(metric.relative_humidity_pct, Some(40.0));
        assert_eq!(metric.wet_bulb_c, None);
    }

    #[test]
    fn test_same_measurements_ignores_metadata() {
        let a = EnvironmentalInput::measured(32.0, 25.0, 36.0, 1.0, 101.3).with_site("Yard A");
        let b = EnvironmentalInput::measured(32.0, 25.0, 36.0, 1.0, 101.3).with_site("Yard B");
        let c = EnvironmentalInput::measured(32.5, 25.0, 36.0, 1.0, 101.3);
        assert!(a.same_measurements(&b));
        assert!(!a.same_measurements(&c));
    }
}
