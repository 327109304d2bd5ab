use approx::assert_abs_diff_eq;
use credisight_shap::{
    Artifacts, DecisionTree, ExplanationPipeline, FeaturePerturbation, FeatureRecord,
    ImputationStats, Node, PipelineConfig, PredictModel, Result, ShapError, TreeEnsemble,
    TreeShapConfig, HELOC_FEATURES,
};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

fn stump(feature: usize, threshold: f64, lo: f64, hi: f64, covers: (f64, f64)) -> DecisionTree {
    DecisionTree::new(vec![
        Node::Split {
            feature,
            threshold,
            default_left: true,
            left: 1,
            right: 2,
            cover: covers.0 + covers.1,
        },
        Node::Leaf { value: lo, cover: covers.0 },
        Node::Leaf { value: hi, cover: covers.1 },
    ])
    .unwrap()
}

fn depth_two(f0: usize, f1: usize, f2: usize, leaves: [f64; 4]) -> DecisionTree {
    DecisionTree::new(vec![
        Node::Split {
            feature: f0,
            threshold: 0.1,
            default_left: false,
            left: 1,
            right: 2,
            cover: 20.0,
        },
        Node::Split {
            feature: f1,
            threshold: -0.4,
            default_left: true,
            left: 3,
            right: 4,
            cover: 12.0,
        },
        Node::Split {
            feature: f2,
            threshold: 0.6,
            default_left: true,
            left: 5,
            right: 6,
            cover: 8.0,
        },
        Node::Leaf { value: leaves[0], cover: 5.0 },
        Node::Leaf { value: leaves[1], cover: 7.0 },
        Node::Leaf { value: leaves[2], cover: 6.0 },
        Node::Leaf { value: leaves[3], cover: 2.0 },
    ])
    .unwrap()
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn identity_stats(n: usize) -> ImputationStats {
    ImputationStats::new(vec![0.0; n], vec![0.0; n], vec![1.0; n]).unwrap()
}

/// A HELOC-shaped model: one stump per feature plus deeper trees reusing features.
fn heloc_artifacts() -> Artifacts {
    let n = HELOC_FEATURES.len();
    let mut trees: Vec<DecisionTree> = (0..n)
        .map(|i| {
            let w = 0.05 * (i as f64 + 1.0);
            stump(i, 0.0, -w, w * 0.8, (3.0 + i as f64, 4.0))
        })
        .collect();
    for k in 0..10 {
        trees.push(depth_two(
            k % n,
            (k * 7 + 3) % n,
            (k * 5 + 1) % n,
            [0.2 - 0.03 * k as f64, -0.1, 0.4, -0.35 + 0.02 * k as f64],
        ));
    }
    Artifacts {
        feature_order: names(&HELOC_FEATURES),
        stats: Some(
            ImputationStats::new(
                (0..n).map(|i| i as f64).collect(),
                (0..n).map(|i| i as f64 + 0.5).collect(),
                (0..n).map(|i| 1.0 + i as f64 / 10.0).collect(),
            )
            .unwrap(),
        ),
        ensemble: Some(TreeEnsemble::new(-0.4, n, trees).unwrap()),
        missing_sentinels: vec![-7.0, -8.0, -9.0],
        ..Artifacts::default()
    }
}

fn random_record(rng: &mut StdRng) -> FeatureRecord {
    HELOC_FEATURES
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let value = if rng.gen_bool(0.15) {
                None
            } else {
                Some(i as f64 + 2.0 * rng.sample::<f64, _>(StandardNormal))
            };
            (*name, value)
        })
        .collect()
}

#[test]
fn contributions_sum_to_margin_for_random_applicants() -> Result<()> {
    let artifacts = heloc_artifacts();
    let ensemble = artifacts.ensemble.clone().unwrap();
    let pipeline = ExplanationPipeline::new(artifacts, None)?;
    let mut rng = StdRng::seed_from_u64(2024);

    for _ in 0..100 {
        let record = random_record(&mut rng);
        let result = pipeline.explain(&record)?;
        assert_eq!(result.explanations.len(), HELOC_FEATURES.len());

        let margin = result.explained_margin();
        assert_abs_diff_eq!(1.0 / (1.0 + (-margin).exp()), result.probability, epsilon = 1e-9);
        assert_abs_diff_eq!(pipeline.predict(&record)?, result.probability, epsilon = 1e-12);

        let pre = credisight_shap::Preprocessor::new(names(&HELOC_FEATURES))
            .with_stats(heloc_artifacts().stats.unwrap())?
            .with_missing_sentinels(vec![-7.0, -8.0, -9.0]);
        let x = pre.transform(&record)?;
        assert_abs_diff_eq!(margin, ensemble.predict_margin(&x)?, epsilon = 1e-6);

        for pair in result.explanations.windows(2) {
            assert!(pair[0].shap_value.abs() >= pair[1].shap_value.abs());
        }
    }
    Ok(())
}

#[test]
fn interventional_pipeline_is_exact_too() -> Result<()> {
    let n = HELOC_FEATURES.len();
    let mut rng = StdRng::seed_from_u64(99);
    let background = Array2::from_shape_fn((30, n), |_| rng.sample::<f64, _>(StandardNormal));
    let config = PipelineConfig {
        shap: TreeShapConfig {
            perturbation: FeaturePerturbation::Interventional,
            ..TreeShapConfig::default()
        },
        ..PipelineConfig::default()
    };
    let pipeline = ExplanationPipeline::new(
        Artifacts { background: Some(background), ..heloc_artifacts() },
        Some(config),
    )?;
    for _ in 0..20 {
        let record = random_record(&mut rng);
        let result = pipeline.explain(&record)?;
        let probability = pipeline.predict(&record)?;
        let margin = (probability / (1.0 - probability)).ln();
        assert_abs_diff_eq!(result.explained_margin(), margin, epsilon = 1e-6);
    }
    Ok(())
}

#[test]
fn explanations_are_identical_across_threads() -> Result<()> {
    let pipeline = ExplanationPipeline::new(heloc_artifacts(), None)?;
    let mut rng = StdRng::seed_from_u64(5);
    let records: Vec<FeatureRecord> = (0..16).map(|_| random_record(&mut rng)).collect();
    let expected: Vec<_> = records.iter().map(|r| pipeline.explain(r)).collect::<Result<_>>()?;

    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for (record, want) in records.iter().zip(expected.iter()) {
                    let got = pipeline.explain(record).unwrap();
                    assert_eq!(got.probability.to_bits(), want.probability.to_bits());
                    assert_eq!(&got, want);
                }
            });
        }
    });
    Ok(())
}

#[test]
fn exact_ties_keep_canonical_order() -> Result<()> {
    let ensemble = TreeEnsemble::new(
        0.0,
        3,
        vec![stump(1, 0.0, -1.0, 1.0, (1.0, 1.0)), stump(0, 0.0, -1.0, 1.0, (1.0, 1.0))],
    )?;
    let pipeline = ExplanationPipeline::new(
        Artifacts {
            feature_order: names(&["A", "B", "C"]),
            stats: Some(identity_stats(3)),
            ensemble: Some(ensemble),
            ..Artifacts::default()
        },
        None,
    )?;
    let record = FeatureRecord::new()
        .with("C", Some(3.0))
        .with("B", Some(1.0))
        .with("A", Some(-1.0));
    let result = pipeline.explain(&record)?;
    let order: Vec<&str> = result.explanations.iter().map(|c| c.feature.as_str()).collect();
    assert_eq!(order, vec!["A", "B", "C"]);
    assert_abs_diff_eq!(result.explanations[0].shap_value, -1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(result.explanations[1].shap_value, 1.0, epsilon = 1e-12);
    assert_eq!(result.explanations[2].shap_value, 0.0);
    // Sum is zero: low-risk branch, one protective driver and one minor risk.
    assert_eq!(
        result.summary,
        "This is a low-risk profile, primarily due to positive factors like: A. \
         A minor risk was noted (B), but it was offset by the strong positive factors."
    );
    Ok(())
}

#[test]
fn flat_trees_give_the_low_signal_message() -> Result<()> {
    let ensemble = TreeEnsemble::new(0.7, 2, vec![stump(0, 0.0, 0.25, 0.25, (1.0, 3.0))])?;
    let pipeline = ExplanationPipeline::new(
        Artifacts {
            feature_order: names(&["A", "B"]),
            stats: Some(identity_stats(2)),
            ensemble: Some(ensemble),
            ..Artifacts::default()
        },
        None,
    )?;
    let result = pipeline.explain(&FeatureRecord::new().with("A", Some(2.0)).with("B", None))?;
    assert!(result.explanations.iter().all(|c| c.shap_value == 0.0));
    assert_abs_diff_eq!(result.base_value, 0.95);
    assert_eq!(
        result.summary,
        "The prediction is in line with the average; no significant factors were identified."
    );
    Ok(())
}

#[test]
fn driver_lists_are_punctuated_by_length() -> Result<()> {
    let ensemble = TreeEnsemble::new(
        0.0,
        3,
        vec![
            stump(0, 0.0, -3.0, 3.0, (1.0, 1.0)),
            stump(1, 0.0, -1.0, 1.0, (1.0, 1.0)),
            stump(2, 0.0, -0.5, 0.5, (1.0, 1.0)),
        ],
    )?;
    let pipeline = ExplanationPipeline::new(
        Artifacts {
            feature_order: names(&["Debt", "Inquiries", "Delinquency"]),
            stats: Some(identity_stats(3)),
            ensemble: Some(ensemble),
            ..Artifacts::default()
        },
        None,
    )?;
    let record = |a: f64, b: f64, c: f64| {
        FeatureRecord::new()
            .with("Debt", Some(a))
            .with("Inquiries", Some(b))
            .with("Delinquency", Some(c))
    };

    let one = pipeline.explain(&record(1.0, -1.0, -1.0))?;
    assert_eq!(
        one.summary,
        "This is a high-risk profile, primarily driven by: Debt. \
         While factors like Inquiries were a positive, it was not enough to offset the primary risk factors."
    );

    let two = pipeline.explain(&record(1.0, 1.0, -1.0))?;
    assert_eq!(
        two.summary,
        "This is a high-risk profile, primarily driven by: Debt and Inquiries. \
         While factors like Delinquency were a positive, it was not enough to offset the primary risk factors."
    );

    let three = pipeline.explain(&record(1.0, 1.0, 1.0))?;
    assert_eq!(
        three.summary,
        "This is a high-risk profile, primarily driven by: Debt, Inquiries, and Delinquency."
    );
    Ok(())
}

#[test]
fn missing_value_scenario() -> Result<()> {
    let pre = credisight_shap::Preprocessor::new(names(&["A"]))
        .with_stats(ImputationStats::new(vec![5.0], vec![5.0], vec![2.0])?)?;
    let x = pre.transform(&FeatureRecord::new().with("A", None))?;
    assert_eq!(x[0], 0.0);
    Ok(())
}

#[test]
fn record_without_a_required_key_is_rejected() -> Result<()> {
    let pipeline = ExplanationPipeline::new(heloc_artifacts(), None)?;
    let record: FeatureRecord = HELOC_FEATURES
        .iter()
        .skip(1)
        .map(|name| (*name, Some(1.0)))
        .collect();
    assert!(matches!(pipeline.predict(&record), Err(ShapError::SchemaMismatch(_))));
    assert!(matches!(pipeline.explain(&record), Err(ShapError::SchemaMismatch(_))));
    Ok(())
}

#[test]
fn result_serializes_with_response_field_names() -> Result<()> {
    let pipeline = ExplanationPipeline::new(heloc_artifacts(), None)?;
    let record: FeatureRecord = HELOC_FEATURES.iter().map(|name| (*name, None)).collect();
    let json = serde_json::to_value(pipeline.explain(&record)?).unwrap();
    assert!(json["base_value"].is_f64());
    assert!(json["summary"].is_string());
    assert_eq!(json["explanations"].as_array().map(Vec::len), Some(HELOC_FEATURES.len()));
    assert!(json["explanations"][0]["feature"].is_string());
    assert!(json["explanations"][0]["shap_value"].is_f64());
    Ok(())
}
