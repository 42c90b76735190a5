//! Physics Engine Module
//!
//! Deterministic heat-load calculations. All math here is closed-form
//! psychrometrics and fixed weightings; nothing is learned or fitted.
//!
//! - `stull_wet_bulb()` - natural wet-bulb from dry-bulb + relative humidity
//! - `wind_corrected_globe()` - globe temperature damped by air movement
//! - `calculate_wbgt()` - outdoor / indoor WBGT composition
//! - `strain_index()` - 0–50 cumulative strain surrogate

pub mod wbgt_models;

pub use wbgt_models::{
    calculate_wbgt, stull_wet_bulb, strain_index, strain_label, wbgt_indoor, wbgt_outdoor,
    wind_corrected_globe, WbgtFormula,
};
