// Train → persist → load → serve, through the public API only.

use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

use housing_predictor::application::handlers::Handlers;
use housing_predictor::application::predict_use_case::{InferenceEngine, ServeConfig};
use housing_predictor::data::preprocessor::{ImputeStrategy, QuantileRange};
use housing_predictor::domain::features::FeatureVector;
use housing_predictor::domain::traits::Predictor;
use housing_predictor::infra::artifact::ArtifactStore;
use housing_predictor::infra::cache::{CacheConfig, MemoryCache};
use housing_predictor::ml::model::Gamma;
use housing_predictor::ml::pipeline::{FittedPipeline, PipelineBuilder, PipelineParams};
use housing_predictor::PredictorError;

fn rows(n: usize) -> (Vec<FeatureVector>, Vec<f64>) {
    let mut x = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    for i in 0..n {
        let t = i as f64 / n as f64;
        x.push([1.0 + 7.0 * t, 5.0 + 40.0 * t, 4.0 + t, 1.0, 800.0, 2.5, 34.0 + 4.0 * t, -120.0]);
        y.push(0.5 + 3.0 * t);
    }
    (x, y)
}

fn fitted() -> FittedPipeline {
    let params = PipelineParams {
        strategy:       ImputeStrategy::Median,
        quantile_range: QuantileRange::new(25.0, 75.0),
        c:              10.0,
        gamma:          Gamma::Auto,
    };
    let (x, y) = rows(40);
    PipelineBuilder::default().build(&params).fit(&x, &y).unwrap()
}

struct Counting {
    inner: FittedPipeline,
    calls: AtomicUsize,
}

impl Predictor for Counting {
    fn predict(&self, rows: &[FeatureVector]) -> Vec<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.predict(rows)
    }
}

fn house() -> Value {
    json!({
        "MedInc": 4.5, "HouseAge": 25, "AveRooms": 4.5, "AveBedrms": 1.0,
        "Population": 800, "AveOccup": 2.5, "Latitude": 36.0, "Longitude": -120.0
    })
}

fn bytes(v: &Value) -> Vec<u8> {
    serde_json::to_vec(v).unwrap()
}

#[test]
fn test_saved_model_serves_predictions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.pkl");
    ArtifactStore::new(&path).save(&fitted()).unwrap();

    let config = ServeConfig { model_path: path, cache: CacheConfig::default() };
    let handlers = Handlers::new(InferenceEngine::from_config(&config).unwrap());

    let res = handlers.handle("POST", "/single-predict", &bytes(&house()));
    assert_eq!(res.status, 200);
    let prediction = res.body["prediction"].as_f64().unwrap();
    assert!(prediction.is_finite());

    let batch = json!({ "houses": [house(), house()] });
    let res = handlers.handle("POST", "/multiple-predict", &bytes(&batch));
    assert_eq!(res.status, 200);
    let predictions = res.body["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 2);
    assert!((predictions[0].as_f64().unwrap() - prediction).abs() < 1e-12);
}

#[test]
fn test_missing_artifact_is_fatal_for_serving() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.pkl");
    let config = ServeConfig { model_path: path.clone(), cache: CacheConfig::default() };
    let err = InferenceEngine::from_config(&config).err().unwrap();
    assert!(matches!(
        err.downcast_ref::<PredictorError>(),
        Some(PredictorError::ArtifactAbsent { .. })
    ));

    std::fs::write(&path, b"garbage").unwrap();
    let err = InferenceEngine::from_config(&config).err().unwrap();
    assert!(matches!(
        err.downcast_ref::<PredictorError>(),
        Some(PredictorError::ArtifactCorrupt { .. })
    ));
}

#[test]
fn test_invalid_inputs_are_rejected_with_locations() {
    let engine = InferenceEngine::new(
        Arc::new(fitted()),
        Arc::new(MemoryCache::new()),
        Duration::from_secs(60),
    );
    let handlers = Handlers::new(engine);

    let mut missing = house();
    missing.as_object_mut().unwrap().remove("MedInc");
    let res = handlers.single_predict(&bytes(&missing));
    assert_eq!(res.status, 422);
    assert_eq!(res.body["detail"][0]["type"], "missing");

    let mut negative = house();
    negative["MedInc"] = json!(-1.0);
    let res = handlers.single_predict(&bytes(&negative));
    assert_eq!(res.status, 422);
    assert_eq!(res.body["detail"][0]["type"], "value-error");

    let mut bad = house();
    bad["Latitude"] = json!(95.0);
    let batch = json!({ "houses": [house(), bad, house()] });
    let res = handlers.multiple_predict(&bytes(&batch));
    assert_eq!(res.status, 422);
    assert_eq!(res.body["detail"][0]["loc"], json!(["body", "houses", 1, "Latitude"]));
}

#[test]
fn test_repeated_request_is_served_from_cache() {
    let model = Arc::new(Counting { inner: fitted(), calls: AtomicUsize::new(0) });
    let engine = InferenceEngine::new(model.clone(), Arc::new(MemoryCache::new()), Duration::from_secs(60));
    let handlers = Handlers::new(engine);
    let body = bytes(&house());

    let first = handlers.single_predict(&body);
    let second = handlers.single_predict(&body);
    assert_eq!(first, second);
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);

    // Same record on the other route is a different request
    let batch = bytes(&json!({ "houses": [house()] }));
    handlers.multiple_predict(&batch);
    assert_eq!(model.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_expired_entries_are_recomputed() {
    let model = Arc::new(Counting { inner: fitted(), calls: AtomicUsize::new(0) });
    let engine = InferenceEngine::new(model.clone(), Arc::new(MemoryCache::new()), Duration::ZERO);
    let handlers = Handlers::new(engine);
    let body = bytes(&house());

    handlers.single_predict(&body);
    handlers.single_predict(&body);
    assert_eq!(model.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_empty_batch_skips_the_model() {
    let model = Arc::new(Counting { inner: fitted(), calls: AtomicUsize::new(0) });
    let engine = InferenceEngine::new(model.clone(), Arc::new(MemoryCache::new()), Duration::from_secs(60));
    let res = Handlers::new(engine).multiple_predict(br#"{"houses": []}"#);
    assert_eq!(res.status, 200);
    assert_eq!(res.body, json!({ "predictions": [] }));
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}
