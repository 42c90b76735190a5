//! End-to-end scenarios through the public pipeline:
//! freeze → apply → classify → render.

use std::sync::Arc;

use heatstress_engine::config::{BaselineConfig, EngineConfig};
use heatstress_engine::{
    Acclimatization, AssessmentSession, BaselineCalculator, EngineError, EnvironmentalInput,
    FrozenBaseline, GuidanceGenerator, PenaltyCatalog, PenaltyConflictError, PenaltyEngine,
    PenaltyKind, PenaltyRules, RiskBand, RiskClassifier, ValidationError, WorkloadContext,
    WorkloadIntensity,
};

struct Pipeline {
    calculator: BaselineCalculator,
    catalog: PenaltyCatalog,
    engine: PenaltyEngine,
    classifier: RiskClassifier,
    guidance: GuidanceGenerator,
}

fn pipeline() -> Pipeline {
    let config = EngineConfig::default();
    Pipeline {
        calculator: BaselineCalculator::new(config.baseline.clone()),
        catalog: PenaltyCatalog::from_definitions(&config.penalties.catalog).expect("catalog"),
        engine: PenaltyEngine::new(PenaltyRules::from_config(&config.penalties)),
        classifier: RiskClassifier::new(config.thresholds.clone(), config.acclimatization.clone()),
        guidance: GuidanceGenerator::new(config.guidance.clone()),
    }
}

/// Baseline whose WBGT equals `wbgt_c` (all temperatures equal, no damping)
fn flat_baseline(wbgt_c: f64) -> Arc<FrozenBaseline> {
    let config = BaselineConfig {
        wind_correction: false,
        ..BaselineConfig::default()
    };
    BaselineCalculator::new(config)
        .freeze(&EnvironmentalInput::measured(wbgt_c, wbgt_c, wbgt_c, 1.0, 101.3))
        .expect("valid input")
}

#[test]
fn scenario_a_hot_yard_is_danger_with_guidance() {
    let p = pipeline();
    let input = EnvironmentalInput::measured(38.0, 26.0, 40.0, 1.0, 101.3);
    let baseline = p.calculator.freeze(&input).expect("valid input");
    assert!(
        (29.5..=30.5).contains(&baseline.wbgt_c()),
        "baseline {}",
        baseline.wbgt_c()
    );

    let adjusted = p.engine.apply(&baseline, &[]).expect("no penalties");
    assert_eq!(adjusted.adjusted_wbgt_c(), baseline.wbgt_c());

    let classification = p.classifier.classify(&adjusted, WorkloadContext::default());
    assert_eq!(classification.band, RiskBand::Danger);

    let guidance = p.guidance.render(&classification).expect("complete table");
    assert_eq!(guidance.band, RiskBand::Danger);
    assert_eq!(guidance.regimen.work_minutes, 15);
    assert_eq!(guidance.regimen.rest_minutes, 45);
}

#[test]
fn scenario_b_suit_in_cabin_escalates() {
    let p = pipeline();
    let baseline = flat_baseline(28.0);
    assert!((baseline.wbgt_c() - 28.0).abs() < 1e-9);

    let only_baseline = p.classifier.classify(
        &p.engine.apply(&baseline, &[]).expect("ok"),
        WorkloadContext::default(),
    );

    let penalties = p
        .catalog
        .resolve(&["ppe_encapsulating", "vehicle_cabin_no_ac"])
        .expect("known ids");
    let adjusted = p.engine.apply(&baseline, &penalties).expect("no conflict");
    assert!((adjusted.adjusted_wbgt_c() - 36.3).abs() < 1e-6);

    let classification = p.classifier.classify(&adjusted, WorkloadContext::default());
    assert!(classification.band > only_baseline.band);
    assert_eq!(classification.band, RiskBand::Extreme);

    // Individual contributions account for the whole adjustment
    let total: f64 = classification.applied.iter().map(|a| a.contribution_c).sum();
    assert!((total - (36.3 - 28.0)).abs() < 1e-6);
}

#[test]
fn scenario_c_wet_bulb_above_dry_bulb_is_rejected() {
    let p = pipeline();
    let input = EnvironmentalInput::measured(30.0, 34.0, 35.0, 1.0, 101.3);
    assert!(matches!(
        p.calculator.freeze(&input),
        Err(ValidationError::Implausible(_))
    ));

    // Through a session: no baseline is installed
    let mut session =
        AssessmentSession::new(Arc::new(EngineConfig::default())).expect("valid config");
    assert!(session.freeze(&input).is_err());
    assert!(session.current_baseline().is_none());
}

#[test]
fn scenario_d_two_ppe_classes_conflict() {
    let p = pipeline();
    let baseline = flat_baseline(28.0);
    let penalties = p
        .catalog
        .resolve(&["ppe_light", "ppe_encapsulating"])
        .expect("known ids");
    match p.engine.apply(&baseline, &penalties) {
        Err(PenaltyConflictError::SameKind { kind, ids }) => {
            assert_eq!(kind, PenaltyKind::Ppe);
            assert_eq!(ids.len(), 2);
        }
        other => panic!("expected SameKind conflict, got {other:?}"),
    }
}

#[test]
fn baseline_is_unchanged_by_downstream_stages() {
    let p = pipeline();
    let baseline = p
        .calculator
        .freeze(&EnvironmentalInput::measured(35.0, 27.0, 45.0, 0.5, 100.0))
        .expect("valid");
    let snapshot: FrozenBaseline = (*baseline).clone();

    for ids in [
        vec!["ppe_heavy"],
        vec!["radiant_extreme", "enclosure_enclosed"],
        vec!["site_minor", "site_severe", "vehicle_cabin_no_ac"],
    ] {
        let penalties = p.catalog.resolve(ids.as_slice()).expect("known ids");
        let adjusted = p.engine.apply(&baseline, &penalties).expect("no conflict");
        let classification = p.classifier.classify(&adjusted, WorkloadContext::default());
        p.guidance.render(&classification).expect("rendered");
    }

    assert_eq!(*baseline, snapshot);
}

#[test]
fn classification_is_idempotent() {
    let p = pipeline();
    let baseline = flat_baseline(27.3);
    let penalties = p.catalog.resolve(&["clothing_extra_layer"]).expect("known");
    let adjusted = p.engine.apply(&baseline, &penalties).expect("ok");
    let workload = WorkloadContext::new(WorkloadIntensity::Heavy, Acclimatization::NotAcclimatized);
    assert_eq!(
        p.classifier.classify(&adjusted, workload),
        p.classifier.classify(&adjusted, workload)
    );
}

#[test]
fn every_band_boundary_takes_more_severe_band() {
    let p = pipeline();
    for intensity in WorkloadIntensity::ALL {
        for acclimatization in [Acclimatization::Acclimatized, Acclimatization::NotAcclimatized] {
            let row = p
                .classifier
                .effective_thresholds(WorkloadContext::new(intensity, acclimatization));
            for band in &RiskBand::ALL[1..] {
                let bound = row.lower_bound(*band);
                assert_eq!(RiskClassifier::band_for(bound, &row), *band, "{intensity} at {bound}");
                assert!(RiskClassifier::band_for(bound - 1e-6, &row) < *band);
            }
        }
    }
}

#[test]
fn session_rejects_penalties_for_replaced_baseline() {
    let mut session =
        AssessmentSession::new(Arc::new(EngineConfig::default())).expect("valid config");
    let old = session
        .freeze(&EnvironmentalInput::measured(30.0, 22.0, 33.0, 2.0, 101.3))
        .expect("valid");
    session
        .freeze(&EnvironmentalInput::measured(36.0, 25.0, 42.0, 0.5, 101.3))
        .expect("valid");
    let result = session.assess_against(old.id(), &["ppe_heavy"], WorkloadContext::default());
    assert!(matches!(result, Err(EngineError::StaleBaseline { .. })));
}

#[test]
fn humidity_feed_reading_is_assessed() {
    let mut session =
        AssessmentSession::new(Arc::new(EngineConfig::default())).expect("valid config");
    let reading = EnvironmentalInput::from_humidity(33.0, 60.0, 45.0, 1.5, 100.8).with_site("Dock 4");
    session.freeze(&reading).expect("valid");
    let report = session
        .assess(&["ppe_moderate"], WorkloadContext::acclimatized(WorkloadIntensity::Light))
        .expect("assessed");
    assert!(report.baseline.wet_bulb_derived());
    assert_eq!(report.site, "Dock 4");
    let json = serde_json::to_value(&report).expect("serializable");
    assert!(json["classification"]["band"].is_string());
    assert!(json["guidance"]["regimen"]["work_minutes"].is_u64());
}

#[test]
fn imperial_reading_matches_metric() {
    let calc = BaselineCalculator::default();
    let metric = EnvironmentalInput::measured(38.0, 26.0, 40.0, 1.0, 101.3);
    let imperial = EnvironmentalInput::measured(100.4, 78.8, 104.0, 2.23694, 29.91389)
        .with_timestamp(metric.timestamp);
    let converted = EnvironmentalInput::from_imperial(&imperial);
    assert_eq!(converted.timestamp, metric.timestamp);
    let a = calc.freeze(&metric).expect("valid");
    let b = calc.freeze(&converted).expect("valid");
    assert!((a.wbgt_c() - b.wbgt_c()).abs() < 1e-3);
}
