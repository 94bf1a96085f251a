use std::fs;
use std::path::{Path, PathBuf};

use approx::assert_abs_diff_eq;
use exobengal::adapters::ScaledModel;
use exobengal::config::ExoConfig;
use exobengal::{
    esi, Detector, ExoError, Label, ModelAdapter, ModelFamily, NeighborsAdapter, NetworkAdapter,
    TrainingSet,
};
use exobengal_core::Tensor;
use exobengal_neighbors::KNNClassifier;
use exobengal_nn::{Mlp, MlpConfig};
use exobengal_preprocessing::{Preprocessor, ScalerState, Transformer};

const HEADER: &str = "kepid,koi_disposition,koi_period,koi_prad,koi_teq,koi_srad,koi_slogg,koi_steff,koi_impact,koi_duration,koi_depth";

const EARTH_LIKE: [f64; 9] = [365.0, 1.1, 300.0, 1.0, 4.4, 5778.0, 0.1, 13.0, 84.0];
const HOT_GIANT: [f64; 9] = [1.2, 25.0, 2500.0, 1.8, 4.0, 6500.0, 0.95, 2.0, 9000.0];

fn row(id: usize, disposition: &str, values: &[f64]) -> String {
    let cells: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("{id},{disposition},{}", cells.join(","))
}

fn write_table(dir: &Path, rows: &[String]) -> PathBuf {
    let path = dir.join("cumulative.csv");
    let text = format!(
        "# exported from the exoplanet archive\n# columns described below\n{HEADER}\n{}\n",
        rows.join("\n")
    );
    fs::write(&path, text).unwrap();
    path
}

/// Sixty rows: planets near Earth's radius and temperature, false positives
/// large and hot.
fn synthetic_rows() -> Vec<String> {
    let mut rows = Vec::new();
    for i in 0..30 {
        let f = i as f64;
        let disposition = if i % 2 == 0 { "CONFIRMED" } else { "CANDIDATE" };
        rows.push(row(
            i,
            disposition,
            &[20.0 + f, 0.8 + 0.02 * f, 250.0 + 2.0 * f, 1.0, 4.4, 5600.0 + f, 0.2, 4.0, 150.0 + f],
        ));
        rows.push(row(
            100 + i,
            "FALSE POSITIVE",
            &[1.0 + 0.1 * f, 12.0 + f, 1400.0 + 20.0 * f, 1.6, 4.0, 6400.0, 0.9, 1.5, 4000.0 + 50.0 * f],
        ));
    }
    rows
}

fn identity_preprocessor() -> Preprocessor {
    Preprocessor::from_state(ScalerState {
        imputer_means: vec![0.0; 9],
        mean: vec![0.0; 9],
        scale: vec![1.0; 9],
    })
    .unwrap()
}

/// Network with zero weights whose output bias makes every score exactly 0.6.
fn constant_network() -> Mlp {
    let config = MlpConfig {
        hidden_layers: vec![],
        dropout: vec![],
        ..MlpConfig::default()
    };
    let mut value = serde_json::to_value(Mlp::new(9, config).unwrap()).unwrap();
    let layer = &mut value["layers"][0];
    layer["weight"]["data"] = serde_json::json!(vec![0.0; 9]);
    // sigmoid(ln 1.5) rounds to 0.6000000000000001; one ulp lower gives 0.6
    layer["bias"]["data"] = serde_json::json!([0.4054651081081643]);
    serde_json::from_value(value).unwrap()
}

fn quick_config(models: &Path) -> ExoConfig {
    let mut config = ExoConfig::with_models_dir(models);
    config.network.hidden_layers = vec![8, 4];
    config.network.epochs = 30;
    config.network.batch_size = 8;
    config.network.learning_rate = 0.01;
    config.forest.n_estimators = vec![5];
    config.forest.max_depth = vec![0];
    config.forest.min_samples_split = vec![2];
    config
}

#[test]
fn test_two_row_forest_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_table(
        dir.path(),
        &[row(1, "CONFIRMED", &EARTH_LIKE), row(2, "FALSE POSITIVE", &HOT_GIANT)],
    );
    let config = ExoConfig::with_models_dir(dir.path().join("models"));

    let trainer = Detector::new(config.clone());
    let report = trainer.train(ModelFamily::Forest, Some(data.as_path())).unwrap();
    assert_eq!(report.train_rows, 2);
    assert_eq!(report.test_rows, 0);
    assert!(report.evaluation.is_none());
    assert!(report.cv_score.is_none());
    assert!(dir.path().join("models/random_forest_classifier.json").exists());

    // a fresh detector loads the artifact on first use
    let detector = Detector::new(config);
    assert!(!detector.is_loaded(ModelFamily::Forest));
    let result = detector.random_forest(&EARTH_LIKE).unwrap();
    assert!(detector.is_loaded(ModelFamily::Forest));
    assert_eq!(result.prediction, Label::Planet);
    assert!(result.probability > 0.5);
    let score = result.esi.unwrap();
    assert!(score > 0.8);
    assert_eq!(score, esi(1.1, 300.0).unwrap());
}

#[test]
fn test_missing_artifacts_are_model_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let detector = Detector::new(ExoConfig::with_models_dir(dir.path()));
    for family in ModelFamily::ALL {
        match detector.predict_with(family, &EARTH_LIKE.into()) {
            Err(ExoError::ModelNotFound { family: f, .. }) => assert_eq!(f, family),
            other => panic!("expected ModelNotFound for {family}, got {other:?}"),
        }
        assert!(!detector.is_loaded(family));
    }
}

#[test]
fn test_forest_rejects_non_finite_input() {
    let dir = tempfile::tempdir().unwrap();
    let detector = Detector::new(ExoConfig::with_models_dir(dir.path()));
    let mut values = EARTH_LIKE;
    values[4] = f64::NAN;
    assert!(matches!(
        detector.random_forest(&values),
        Err(ExoError::InvalidInput(_))
    ));
}

#[test]
fn test_neighbors_boundary_is_inclusive() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExoConfig::with_models_dir(dir.path());

    // three of five stored rows are planets, so every query scores exactly 0.6
    let x = Tensor::from_vec2d(&vec![vec![0.0; 9]; 5]).unwrap();
    let mut knn = KNNClassifier::new(5);
    knn.fit(&x, &[1.0, 1.0, 1.0, 0.0, 0.0]).unwrap();
    let model = ScaledModel {
        model: knn,
        preprocessor: identity_preprocessor(),
    };
    NeighborsAdapter::new(config.clone()).persist(&model).unwrap();

    let result = Detector::new(config).neighbors(&EARTH_LIKE).unwrap();
    assert_eq!(result.probability, 0.6);
    assert_eq!(result.prediction, Label::Planet);
    assert!(result.esi.is_some());

    assert!(ModelFamily::Neighbors.decision_rule().is_positive(0.4, 0.6));
    assert!(!ModelFamily::Network.decision_rule().is_positive(0.4, 0.6));
}

#[test]
fn test_network_boundary_is_exclusive() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExoConfig::with_models_dir(dir.path());
    let model = ScaledModel {
        model: constant_network(),
        preprocessor: identity_preprocessor(),
    };
    NetworkAdapter::new(config.clone()).persist(&model).unwrap();

    let result = Detector::new(config).network(&EARTH_LIKE).unwrap();
    assert_eq!(result.probability, 0.6);
    assert_eq!(result.prediction, Label::NotPlanet);
    assert!(result.esi.is_none());
}

#[test]
fn test_scaled_families_reject_infinite_features() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExoConfig::with_models_dir(dir.path());

    // five planets at the origin, one false positive at all-ones
    let mut rows = vec![vec![0.0; 9]; 5];
    rows.push(vec![1.0; 9]);
    let mut knn = KNNClassifier::new(5);
    knn.fit(&Tensor::from_vec2d(&rows).unwrap(), &[1.0, 1.0, 1.0, 1.0, 1.0, 0.0])
        .unwrap();
    NeighborsAdapter::new(config.clone())
        .persist(&ScaledModel {
            model: knn,
            preprocessor: identity_preprocessor(),
        })
        .unwrap();
    NetworkAdapter::new(config.clone())
        .persist(&ScaledModel {
            model: constant_network(),
            preprocessor: identity_preprocessor(),
        })
        .unwrap();

    let detector = Detector::new(config);
    let mut values = [1.0; 9];
    values[0] = f64::INFINITY;
    for family in [ModelFamily::Network, ModelFamily::Neighbors] {
        assert!(
            matches!(
                detector.predict_with(family, &values.into()),
                Err(ExoError::InvalidInput(_))
            ),
            "{family} accepted an infinite feature"
        );
    }
    values[0] = f64::NEG_INFINITY;
    assert!(matches!(detector.neighbors(&values), Err(ExoError::InvalidInput(_))));

    // a missing value is still imputed
    values[0] = f64::NAN;
    assert_eq!(detector.network(&values).unwrap().probability, 0.6);
    assert!(detector.neighbors(&values).is_ok());
}

#[test]
fn test_network_and_neighbors_train_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_table(dir.path(), &synthetic_rows());
    let config = quick_config(&dir.path().join("models"));

    let trainer = Detector::new(config.clone());
    let reports = trainer.train_all(Some(data.as_path())).unwrap();
    assert_eq!(reports.len(), 3);
    for report in &reports {
        assert_eq!(report.train_rows + report.test_rows, 60);
        assert_eq!(report.test_rows, 12);
        let eval = report.evaluation.as_ref().unwrap();
        assert!(eval.roc_auc > 0.9, "{} auc {}", report.family, eval.roc_auc);
    }
    assert!(reports[1].final_loss.is_some());
    for file in [
        "random_forest_classifier.json",
        "mlp_model.json",
        "knn_model.json",
        "network_scaler.json",
        "neighbors_scaler.json",
    ] {
        assert!(dir.path().join("models").join(file).exists(), "{file} missing");
    }

    let planet = [30.0, 1.0, 270.0, 1.0, 4.4, 5610.0, 0.2, 4.0, 160.0];
    let reloaded = Detector::new(config);
    for family in [ModelFamily::Network, ModelFamily::Neighbors] {
        let fresh = trainer.predict_with(family, &planet.into()).unwrap();
        let loaded = reloaded.predict_with(family, &planet.into()).unwrap();
        assert_eq!(fresh.prediction, loaded.prediction);
        assert_abs_diff_eq!(fresh.probability, loaded.probability, epsilon = 1e-9);
    }

    let knn = reloaded.neighbors(&planet).unwrap();
    assert_eq!(knn.prediction, Label::Planet);
    assert_eq!(knn.probability, 1.0);
    assert_eq!(knn.esi, Some(esi(1.0, 270.0).unwrap()));

    let giant = reloaded.neighbors(&HOT_GIANT).unwrap();
    assert_eq!(giant.prediction, Label::NotPlanet);
    assert!(giant.esi.is_none());
}

#[test]
fn test_retraining_keeps_model_resident() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_table(dir.path(), &synthetic_rows());
    let detector = Detector::new(quick_config(dir.path()));

    detector.train(ModelFamily::Neighbors, Some(data.as_path())).unwrap();
    assert!(detector.is_loaded(ModelFamily::Neighbors));
    detector.train(ModelFamily::Neighbors, Some(data.as_path())).unwrap();
    assert!(detector.is_loaded(ModelFamily::Neighbors));
}

#[test]
fn test_unmapped_dispositions_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let mut rows = synthetic_rows();
    rows.push(row(900, "NOT DISPOSITIONED", &EARTH_LIKE));
    rows.push(row(901, "", &EARTH_LIKE));
    let data = write_table(dir.path(), &rows);

    let set = TrainingSet::load(&data).unwrap();
    assert_eq!(set.len(), 60);
    assert_eq!(set.dropped, 2);
    assert_eq!(set.positives(), 30);
    assert_eq!(set.frame.insolation.len(), 60);
}

#[test]
fn test_missing_column_is_data_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    fs::write(&path, "preamble\nkepid,koi_disposition,koi_prad\n1,CONFIRMED,1.0\n").unwrap();
    let detector = Detector::new(ExoConfig::with_models_dir(dir.path()));
    assert!(matches!(
        detector.train(ModelFamily::Forest, Some(path.as_path())),
        Err(ExoError::DataFormat(_))
    ));
}

#[test]
fn test_preprocessor_transform_matches_fit_transform() {
    let dir = tempfile::tempdir().unwrap();
    let set = TrainingSet::load(write_table(dir.path(), &synthetic_rows())).unwrap();
    let mut pre = Preprocessor::new();
    let all = pre.fit_transform(&set.frame.features).unwrap();
    let single = set.frame.features.select_rows(&[7]).unwrap();
    let one = pre.transform(&single).unwrap();
    for (a, b) in one.data().iter().zip(all.row_slice(7).unwrap()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
    }
}

#[test]
fn test_esi_properties() {
    assert_eq!(esi(1.0, 288.0).unwrap(), 1.0);
    for r in [0.1, 0.5, 1.0, 2.0, 10.0] {
        for t in [50.0, 200.0, 288.0, 600.0, 3000.0] {
            let value = esi(r, t).unwrap();
            assert!((0.0..=1.0).contains(&value), "esi({r}, {t}) = {value}");
        }
    }
    let radii = [1.0, 1.2, 1.5, 2.0, 4.0];
    for pair in radii.windows(2) {
        assert!(esi(pair[0], 288.0).unwrap() >= esi(pair[1], 288.0).unwrap());
    }
    let temps = [288.0, 250.0, 200.0, 100.0];
    for pair in temps.windows(2) {
        assert!(esi(1.0, pair[0]).unwrap() >= esi(1.0, pair[1]).unwrap());
    }
    assert!(matches!(esi(-1.0, 288.0), Err(ExoError::InvalidInput(_))));
    assert!(matches!(esi(1.0, -288.0), Err(ExoError::InvalidInput(_))));
    assert!(matches!(esi(f64::NAN, 288.0), Err(ExoError::InvalidInput(_))));
}
