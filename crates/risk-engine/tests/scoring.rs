//! End-to-end scoring tests over synthetic artifact files.

use chrono::NaiveDate;
use feature_builder::DailyRecord;
use risk_engine::{
    score, ArtifactConfig, DecisionTree, FeatureSchema, GradientBoostedModel, InferenceContext,
    ModelArtifacts, RiskError, TreeExplainer, TreeNode, MIN_HISTORY_DAYS,
};
use std::collections::BTreeMap;
use std::fs;

fn leaf(value: f64, cover: f64) -> TreeNode {
    TreeNode {
        feature: None,
        threshold: 0.0,
        left: 0,
        right: 0,
        value,
        cover,
    }
}

fn split(feature: usize, threshold: f64, left: usize, right: usize, cover: f64) -> TreeNode {
    TreeNode {
        feature: Some(feature),
        threshold,
        left,
        right,
        value: 0.0,
        cover,
    }
}

/// A small ensemble over the schema the production trainer exports.
fn synthetic_model() -> GradientBoostedModel {
    let feature_names = [
        "hours_of_sleep",
        "stress_level",
        "medication_taken",
        "eeg_feature_1",
        "mri_lesion_present",
        "sleep_lag_1",
        "stress_lag_1",
        "medication_lag_1",
        "eeg_lag_1",
        "sleep_rolling_avg_3",
        "stress_rolling_avg_3",
        "sleep_rolling_avg_7",
        "stress_rolling_avg_7",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    GradientBoostedModel {
        version: "1.0".to_string(),
        schema: FeatureSchema::new(feature_names),
        base_score: 0.0,
        trees: vec![
            // Short sleep raises risk; a high weekly sleep average lowers it.
            DecisionTree {
                nodes: vec![
                    split(0, 6.5, 1, 2, 100.0),
                    leaf(0.8, 40.0),
                    split(11, 7.0, 3, 4, 60.0),
                    leaf(0.2, 30.0),
                    leaf(-0.6, 30.0),
                ],
            },
            DecisionTree {
                nodes: vec![
                    split(1, 2.5, 1, 2, 100.0),
                    leaf(-0.4, 55.0),
                    leaf(0.5, 45.0),
                ],
            },
            // Missed medication raises risk; high EEG feature raises it too.
            DecisionTree {
                nodes: vec![
                    split(2, 0.5, 1, 2, 100.0),
                    leaf(0.7, 20.0),
                    split(3, 120.0, 3, 4, 80.0),
                    leaf(-0.3, 50.0),
                    leaf(0.4, 30.0),
                ],
            },
        ],
    }
}

fn subtree_expectation(nodes: &[TreeNode], idx: usize, out: &mut [f64]) -> f64 {
    let node = &nodes[idx];
    let expectation = match node.feature {
        None => node.value,
        Some(_) => {
            let left = subtree_expectation(nodes, node.left, out);
            let right = subtree_expectation(nodes, node.right, out);
            (left * nodes[node.left].cover + right * nodes[node.right].cover) / node.cover
        }
    };
    out[idx] = expectation;
    expectation
}

/// Offline explainer fit: cover-weighted subtree expectations per node.
fn fit_explainer(model: &GradientBoostedModel) -> TreeExplainer {
    let node_expectations: Vec<Vec<f64>> = model
        .trees
        .iter()
        .map(|tree| {
            let mut out = vec![0.0; tree.nodes.len()];
            subtree_expectation(&tree.nodes, 0, &mut out);
            out
        })
        .collect();
    let expected_value =
        model.base_score + node_expectations.iter().map(|e| e[0]).sum::<f64>();
    TreeExplainer {
        model_version: model.version.clone(),
        expected_value,
        node_expectations,
    }
}

fn write_artifacts(
    dir: &std::path::Path,
    model: &GradientBoostedModel,
    explainer: &TreeExplainer,
) -> ArtifactConfig {
    let config = ArtifactConfig {
        models_dir: dir.to_path_buf(),
        version: model.version.clone(),
    };
    fs::write(config.model_path(), serde_json::to_vec(model).unwrap()).unwrap();
    fs::write(
        config.explainer_path(),
        serde_json::to_vec(explainer).unwrap(),
    )
    .unwrap();
    config
}

fn ten_day_history() -> Vec<DailyRecord> {
    let sleep = [7.0, 8.0, 5.0, 6.0, 7.0, 8.0, 9.0, 6.0, 5.0, 7.0];
    let stress = [2.0, 1.0, 4.0, 3.0, 2.0, 1.0, 1.0, 3.0, 4.0, 2.0];
    let medication = [1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0];
    let eeg = [100.0, 90.0, 150.0, 120.0, 110.0, 95.0, 85.0, 130.0, 160.0, 105.0];

    (0..10)
        .map(|i| DailyRecord {
            date: NaiveDate::from_ymd_opt(2026, 3, 1)
                .unwrap()
                .checked_add_days(chrono::Days::new(i as u64))
                .unwrap(),
            hours_of_sleep: sleep[i],
            stress_level: stress[i],
            medication_taken: medication[i],
            eeg_feature_1: eeg[i],
            covariates: BTreeMap::from([
                ("mri_lesion_present".to_string(), 1.0),
                // Dropped at projection: the model schema does not name it.
                ("patient_id".to_string(), 1.0),
            ]),
        })
        .collect()
}

fn loaded_context(dir: &std::path::Path) -> InferenceContext {
    let model = synthetic_model();
    let explainer = fit_explainer(&model);
    let config = write_artifacts(dir, &model, &explainer);
    InferenceContext::initialize(&config)
}

#[test]
fn artifacts_round_trip_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = loaded_context(dir.path());
    assert!(ctx.is_available());
}

#[test]
fn score_returns_bounded_risk_with_ranked_contributions() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = loaded_context(dir.path());

    let result = score(&ctx, &ten_day_history()).unwrap();

    assert!((0.0..=1.0).contains(&result.risk_score));
    // Last day: sleep 7h, weekly average 48/7, stress 2, medication taken,
    // eeg 105 -> margin 0.2 - 0.4 - 0.3 = -0.5.
    assert_eq!(result.risk_score, 0.3775);

    assert!(!result.feature_contributions.is_empty());
    let weights: BTreeMap<&str, f64> = result
        .feature_contributions
        .iter()
        .map(|(name, w)| (name.as_str(), *w))
        .collect();
    assert_eq!(weights.get("hours_of_sleep"), Some(&-0.4));
    assert!(!weights.contains_key("patient_id"));

    // Ordered by descending |weight|; the 0.4 tie keeps schema order.
    assert_eq!(result.feature_contributions[0].0, "stress_level");
    assert_eq!(result.feature_contributions[1].0, "hours_of_sleep");
    assert_eq!(result.feature_contributions[2].0, "sleep_rolling_avg_7");
    for pair in result.feature_contributions.windows(2) {
        assert!(pair[0].1.abs() >= pair[1].1.abs());
    }
}

#[test]
fn score_is_deterministic() {
    let model = synthetic_model();
    let explainer = fit_explainer(&model);
    let ctx = InferenceContext::from_artifacts(ModelArtifacts { model, explainer });
    let history = ten_day_history();
    assert_eq!(score(&ctx, &history).unwrap(), score(&ctx, &history).unwrap());
}

#[test]
fn contributions_reconstruct_the_raw_margin() {
    let model = synthetic_model();
    let explainer = fit_explainer(&model);
    explainer.validate_against(&model).unwrap();

    let table = feature_builder::build_features(&ten_day_history()).unwrap();
    let x = model.schema.project(table.last_row().unwrap()).unwrap();

    let contributions = explainer.contributions(&model, &x);
    let reconstructed = explainer.expected_value + contributions.iter().sum::<f64>();
    assert!((reconstructed - model.predict_margin(&x)).abs() < 1e-9);
}

#[test]
fn short_history_names_the_minimum() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = loaded_context(dir.path());

    let history: Vec<DailyRecord> = ten_day_history().into_iter().take(5).collect();
    let err = score(&ctx, &history).unwrap_err();

    assert!(matches!(
        err,
        RiskError::InsufficientHistory {
            minimum: MIN_HISTORY_DAYS,
            supplied: 5
        }
    ));
    assert!(!err.is_fatal());
    let message = err.to_string();
    assert!(message.contains("Insufficient data"), "{message}");
    assert!(message.contains('8'), "{message}");
}

#[test]
fn exactly_eight_days_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = loaded_context(dir.path());
    let history: Vec<DailyRecord> = ten_day_history().into_iter().take(8).collect();
    let result = score(&ctx, &history).unwrap();
    assert!((0.0..=1.0).contains(&result.risk_score));
}

#[test]
fn unsorted_history_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = loaded_context(dir.path());
    let mut history = ten_day_history();
    history.swap(3, 4);
    let err = score(&ctx, &history).unwrap_err();
    assert!(matches!(err, RiskError::Feature(_)));
    assert!(!err.is_fatal());
}

#[test]
fn missing_artifacts_fail_before_validation() {
    let dir = tempfile::tempdir().unwrap();
    let config = ArtifactConfig {
        models_dir: dir.path().to_path_buf(),
        version: "1.0".to_string(),
    };
    let ctx = InferenceContext::initialize(&config);
    assert!(!ctx.is_available());

    // Even an obviously invalid history reports the configuration error.
    let err = score(&ctx, &[]).unwrap_err();
    assert!(matches!(err, RiskError::ArtifactsUnavailable));
    assert!(err.is_fatal());
}

#[test]
fn corrupt_model_file_leaves_context_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let model = synthetic_model();
    let explainer = fit_explainer(&model);
    let config = write_artifacts(dir.path(), &model, &explainer);
    fs::write(config.model_path(), b"not json").unwrap();

    let ctx = InferenceContext::initialize(&config);
    assert!(!ctx.is_available());
}

#[test]
fn explainer_from_another_model_version_is_rejected() {
    let model = synthetic_model();
    let mut explainer = fit_explainer(&model);
    explainer.model_version = "0.9".to_string();

    let dir = tempfile::tempdir().unwrap();
    let config = write_artifacts(dir.path(), &model, &explainer);
    let err = ModelArtifacts::load(&config).unwrap_err();
    assert!(matches!(err, RiskError::ExplainerIncompatible(_)));
    assert!(err.is_fatal());
}

#[test]
fn schema_with_unknown_column_fails_loudly() {
    let mut model = synthetic_model();
    let mut names: Vec<String> = model.schema.names().to_vec();
    names.push("serum_level".to_string());
    model.schema = FeatureSchema::new(names);
    let explainer = fit_explainer(&model);

    let dir = tempfile::tempdir().unwrap();
    let config = write_artifacts(dir.path(), &model, &explainer);
    let ctx = InferenceContext::initialize(&config);
    assert!(ctx.is_available());

    let err = score(&ctx, &ten_day_history()).unwrap_err();
    assert!(matches!(err, RiskError::SchemaMismatch(name) if name == "serum_level"));
}
