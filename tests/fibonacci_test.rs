//! Fibonacci pipeline through the public API.

use fibscan::config::FibonacciConfig;
use fibscan::services::{ConfidenceScorer, FibonacciAnalyzer, LevelCalculator};
use fibscan::{FibSignal, LevelKind, SignalKind};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// =============================================================================
// Level Scenarios
// =============================================================================

#[test]
fn test_unit_range_levels() {
    let levels = LevelCalculator::default().calculate(100.0, 0.0, 70.0);

    let expected = [
        (0.0, 100.0),
        (23.6, 76.4),
        (38.2, 61.8),
        (50.0, 50.0),
        (61.8, 38.2),
        (76.4, 23.6),
        (100.0, 0.0),
    ];
    for (ratio, price) in expected {
        assert!(
            approx(levels.retracement(ratio).unwrap(), price),
            "retracement {}",
            ratio
        );
    }
    assert!(approx(levels.extension(161.8).unwrap(), 161.8));
    assert!(approx(levels.extension(100.0).unwrap(), 100.0));
}

#[test]
fn test_resistance_break_scenario() {
    let analysis = FibonacciAnalyzer::default().analyze(100.0, 0.0, 50.2);

    assert!(analysis.reliable);
    match analysis.primary_signal() {
        Some(FibSignal::ResistanceBreak {
            level,
            next_target: Some(target),
            ..
        }) => {
            assert_eq!(*level, 50.0);
            assert_eq!(target.kind, LevelKind::Retracement);
            assert_eq!(target.ratio, 38.2);
            assert!(approx(target.price, 61.8));
        }
        other => panic!("expected resistance break, got {:?}", other),
    }
}

#[test]
fn test_support_break_scenario() {
    let analysis = FibonacciAnalyzer::default().analyze(100.0, 0.0, 49.9);

    let signal = analysis.levels.signal(SignalKind::SupportBreak).unwrap();
    assert_eq!(signal.level(), 50.0);
    let target = signal.next_target().unwrap();
    assert_eq!(target.ratio, 61.8);
    assert!(approx(target.price, 38.2));
    assert!(!analysis.levels.has_signal(SignalKind::ResistanceBreak));
}

// =============================================================================
// Confidence Gate
// =============================================================================

#[test]
fn test_confidence_on_level_and_far_from_levels() {
    let analyzer = FibonacciAnalyzer::default();

    let on_level = analyzer.analyze(100.0, 0.0, 50.0);
    assert_eq!(on_level.confidence, 100.0);
    assert!(on_level.reliable);

    let far = analyzer.analyze(100.0, 0.0, 70.0);
    assert_eq!(far.confidence, 10.0);
    assert!(!far.reliable);
    assert!(far.levels.signals.is_empty());
}

#[test]
fn test_confidence_bounds_across_prices() {
    let calculator = LevelCalculator::default();
    let scorer = ConfidenceScorer::default();

    for i in 1..400 {
        let price = i as f64 * 0.5;
        let levels = calculator.calculate(100.0, 0.0, price);
        let result = scorer.score(price, &levels.retracements);
        assert!((10.0..=100.0).contains(&result.confidence), "price {}", price);
        assert_eq!(result.reliable, result.confidence > 80.0);
    }
}

#[test]
fn test_stricter_threshold_suppresses_signal() {
    let config = FibonacciConfig {
        reliability_threshold: 95.0,
        ..FibonacciConfig::default()
    };
    let analyzer = FibonacciAnalyzer::new(&config);

    // 0.4% away from 50: confidence 92.
    let analysis = analyzer.analyze(100.0, 0.0, 50.2);
    assert!(!analysis.reliable);
    assert!(analysis.levels.signals.is_empty());
}

#[test]
fn test_analysis_json_shape() {
    let analysis = FibonacciAnalyzer::default().analyze(100.0, 0.0, 50.2);
    let json = serde_json::to_value(&analysis).unwrap();

    assert_eq!(json["currentPrice"], 50.2);
    assert!(json["retracements"].is_array());
    assert!(json["extensions"].is_array());
    assert_eq!(json["signals"][0]["type"], "resistance_break");
    assert_eq!(json["signals"][0]["nextTarget"]["type"], "retracement");
    assert_eq!(json["reliable"], true);
}
