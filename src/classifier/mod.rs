//! Risk classification against workload-specific WBGT thresholds
//!
//! Pure mapping from an adjusted WBGT to a `RiskBand`. Thresholds are lower
//! bounds; a value exactly on a bound belongs to the more severe band.

use serde::Serialize;
use tracing::debug;

use crate::baseline::BaselineId;
use crate::penalty::{AdjustedAssessment, AppliedPenalty};
use crate::physics_engine::strain_index;
use crate::types::{Acclimatization, RiskBand, WorkloadContext};

pub use crate::config::{AcclimatizationConfig, BandThresholds, ThresholdTable};

/// Outcome of classifying one adjusted assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskClassification {
    pub band: RiskBand,
    pub adjusted_wbgt_c: f64,
    pub baseline_wbgt_c: f64,
    pub baseline_id: BaselineId,
    pub workload: WorkloadContext,
    /// Threshold row actually used, after any acclimatization shift
    pub thresholds: BandThresholds,
    /// Degrees the row was lowered by (0 for acclimatized workers)
    pub acclimatization_shift_c: f64,
    /// Distance to the next more severe band; `None` at `Extreme`
    pub headroom_c: Option<f64>,
    /// 0–50 cumulative strain surrogate
    pub strain_index: f64,
    pub applied: Vec<AppliedPenalty>,
}

/// Maps adjusted WBGT to risk bands.
#[derive(Debug, Clone, Default)]
pub struct RiskClassifier {
    thresholds: ThresholdTable,
    acclimatization: AcclimatizationConfig,
}

impl RiskClassifier {
    pub fn new(thresholds: ThresholdTable, acclimatization: AcclimatizationConfig) -> Self {
        Self {
            thresholds,
            acclimatization,
        }
    }

    /// Threshold row for `workload`, shifted for acclimatization.
    ///
    /// A row missing from the table (only possible when config validation
    /// was bypassed) falls back to the strictest row present, so the
    /// lookup can never make a classification less conservative.
    pub fn effective_thresholds(&self, workload: WorkloadContext) -> BandThresholds {
        let row = self.thresholds.get(workload.intensity).copied().unwrap_or_else(|| {
            self.thresholds
                .iter()
                .map(|(_, row)| *row)
                .reduce(|a, b| if b.caution_c < a.caution_c { b } else { a })
                .unwrap_or(BandThresholds::from_array([f64::NEG_INFINITY; 4]))
        });
        row.lowered_by(self.shift_for(workload))
    }

    fn shift_for(&self, workload: WorkloadContext) -> f64 {
        match workload.acclimatization {
            Acclimatization::Acclimatized => 0.0,
            Acclimatization::NotAcclimatized => self.acclimatization.unacclimatized_shift_c,
        }
    }

    /// Band for a raw WBGT value under `thresholds`.
    pub fn band_for(wbgt_c: f64, thresholds: &BandThresholds) -> RiskBand {
        if !wbgt_c.is_finite() {
            return RiskBand::Extreme;
        }
        RiskBand::ALL
            .into_iter()
            .rev()
            .find(|band| wbgt_c >= thresholds.lower_bound(*band))
            .unwrap_or(RiskBand::Safe)
    }

    /// Classify an adjusted assessment. Never fails.
    pub fn classify(
        &self,
        assessment: &AdjustedAssessment,
        workload: WorkloadContext,
    ) -> RiskClassification {
        let thresholds = self.effective_thresholds(workload);
        let adjusted = assessment.adjusted_wbgt_c();
        let band = Self::band_for(adjusted, &thresholds);
        let headroom_c = band
            .escalate()
            .map(|next| thresholds.lower_bound(next) - adjusted);

        debug!(
            baseline_id = %assessment.baseline().id(),
            adjusted_wbgt_c = adjusted,
            workload = %workload.intensity,
            acclimatization = %workload.acclimatization,
            band = %band,
            "Classified"
        );

        RiskClassification {
            band,
            adjusted_wbgt_c: adjusted,
            baseline_wbgt_c: assessment.baseline().wbgt_c(),
            baseline_id: assessment.baseline().id(),
            workload,
            thresholds,
            acclimatization_shift_c: self.shift_for(workload),
            headroom_c,
            strain_index: strain_index(adjusted),
            applied: assessment.applied().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WorkloadIntensity;

    fn moderate() -> BandThresholds {
        ThresholdTable::default()
            .get(WorkloadIntensity::Moderate)
            .copied()
            .expect("default row")
    }

    #[test]
    fn test_band_edges_go_to_more_severe_band() {
        let row = moderate();
        assert_eq!(RiskClassifier::band_for(24.99, &row), RiskBand::Safe);
        assert_eq!(RiskClassifier::band_for(25.0, &row), RiskBand::Caution);
        assert_eq!(RiskClassifier::band_for(27.0, &row), RiskBand::Warning);
        assert_eq!(RiskClassifier::band_for(29.0, &row), RiskBand::Danger);
        assert_eq!(RiskClassifier::band_for(32.0, &row), RiskBand::Extreme);
        assert_eq!(RiskClassifier::band_for(60.0, &row), RiskBand::Extreme);
        assert_eq!(RiskClassifier::band_for(-30.0, &row), RiskBand::Safe);
    }

    #[test]
    fn test_non_finite_is_extreme() {
        assert_eq!(RiskClassifier::band_for(f64::NAN, &moderate()), RiskBand::Extreme);
    }

    #[test]
    fn test_heavier_work_never_less_severe() {
        let classifier = RiskClassifier::default();
        for wbgt in [22.0, 24.0, 26.0, 28.0, 30.0, 31.0, 33.0] {
            let mut previous = RiskBand::Safe;
            for intensity in WorkloadIntensity::ALL {
                let row = classifier.effective_thresholds(WorkloadContext::acclimatized(intensity));
                let band = RiskClassifier::band_for(wbgt, &row);
                assert!(band >= previous, "{intensity} at {wbgt} gave {band} < {previous}");
                previous = band;
            }
        }
    }

    #[test]
    fn test_unacclimatized_shift_lowers_every_bound() {
        let classifier = RiskClassifier::default();
        let acc = classifier.effective_thresholds(WorkloadContext::acclimatized(WorkloadIntensity::Moderate));
        let not = classifier.effective_thresholds(WorkloadContext::new(
            WorkloadIntensity::Moderate,
            Acclimatization::NotAcclimatized,
        ));
        for (a, n) in acc.as_array().iter().zip(not.as_array()) {
            assert!((a - n - 2.0).abs() < 1e-9);
        }
        // 27.5 is Warning for acclimatized, Danger once shifted
        assert_eq!(RiskClassifier::band_for(27.5, &acc), RiskBand::Warning);
        assert_eq!(RiskClassifier::band_for(27.5, &not), RiskBand::Danger);
    }

    #[test]
    fn test_missing_row_falls_back_to_strictest() {
        let mut table = ThresholdTable::default();
        table.remove(WorkloadIntensity::Light);
        let classifier = RiskClassifier::new(table, AcclimatizationConfig::default());
        let row = classifier.effective_thresholds(WorkloadContext::acclimatized(WorkloadIntensity::Light));
        assert_eq!(row.caution_c, 22.0);
    }
}
