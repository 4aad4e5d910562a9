// ============================================================
// Layer 2 — Request Handlers
// ============================================================
// The boundary an HTTP layer calls into. Takes a method, a path
// and the raw body bytes; returns the status code and JSON body
// to send back:
//
//   POST /single-predict    → 200 {"prediction": 2.41}
//   POST /multiple-predict  → 200 {"predictions": [2.41, 1.07]}
//   invalid input           → 422 {"detail": [{type, loc, msg, field}, ...]}
//   unknown path            → 404 {"detail": "Not Found"}
//   known path, not POST    → 405 {"detail": "Method Not Allowed"}
//   anything else failing   → 500 {"detail": "Internal Server Error"}
//
// Transport concerns (sockets, headers, process lifecycle) live
// outside this crate.

use serde::Serialize;
use serde_json::{json, Value};

use crate::application::predict_use_case::{InferenceEngine, Route, METHOD};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body:   Value,
}

impl ApiResponse {
    fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    fn detail(status: u16, message: &str) -> Self {
        Self::new(status, json!({ "detail": message }))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub struct Handlers {
    engine: InferenceEngine,
}

impl Handlers {
    pub fn new(engine: InferenceEngine) -> Self {
        Self { engine }
    }

    pub fn handle(&self, method: &str, path: &str, body: &[u8]) -> ApiResponse {
        let Some(route) = Route::from_path(path) else {
            return ApiResponse::detail(404, "Not Found");
        };
        // Methods are case-sensitive tokens
        if method != METHOD {
            return ApiResponse::detail(405, "Method Not Allowed");
        }
        self.dispatch(route, body)
    }

    pub fn single_predict(&self, body: &[u8]) -> ApiResponse {
        self.dispatch(Route::SinglePredict, body)
    }

    pub fn multiple_predict(&self, body: &[u8]) -> ApiResponse {
        self.dispatch(Route::MultiplePredict, body)
    }

    fn dispatch(&self, route: Route, body: &[u8]) -> ApiResponse {
        match self.engine.infer(route, body) {
            Ok(response) => match serde_json::to_value(&response) {
                Ok(value) => ApiResponse::new(200, value),
                Err(e) => {
                    tracing::error!("Cannot serialize response on {}: {}", route, e);
                    ApiResponse::detail(500, "Internal Server Error")
                }
            },
            Err(err) => match err.validation_failure() {
                Some(failure) => {
                    tracing::debug!("Rejected request on {}: {}", route, failure);
                    ApiResponse::new(422, json!({ "detail": failure.errors() }))
                }
                None => {
                    tracing::error!("Request on {} failed: {}", route, err);
                    ApiResponse::detail(500, "Internal Server Error")
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::FeatureVector;
    use crate::domain::traits::Predictor;
    use crate::infra::cache::MemoryCache;
    use std::sync::Arc;
    use std::time::Duration;

    struct Doubler;

    impl Predictor for Doubler {
        fn predict(&self, rows: &[FeatureVector]) -> Vec<f64> {
            rows.iter().map(|r| r[1] * 2.0).collect()
        }
    }

    fn handlers() -> Handlers {
        let engine = InferenceEngine::new(Arc::new(Doubler), Arc::new(MemoryCache::new()), Duration::from_secs(60));
        Handlers::new(engine)
    }

    fn house() -> Value {
        json!({
            "MedInc": 8.3252, "HouseAge": 41, "AveRooms": 6.98, "AveBedrms": 1.02,
            "Population": 322, "AveOccup": 2.55, "Latitude": 37.88, "Longitude": -122.23
        })
    }

    fn bytes(v: &Value) -> Vec<u8> {
        serde_json::to_vec(v).unwrap()
    }

    #[test]
    fn test_single_predict_ok() {
        let res = handlers().handle("POST", "/single-predict", &bytes(&house()));
        assert_eq!(res.status, 200);
        assert_eq!(res.body, json!({ "prediction": 82.0 }));
    }

    #[test]
    fn test_multiple_predict_ok() {
        let body = json!({ "houses": [house(), house()] });
        let res = handlers().multiple_predict(&bytes(&body));
        assert_eq!(res.status, 200);
        assert_eq!(res.body, json!({ "predictions": [82.0, 82.0] }));
    }

    #[test]
    fn test_missing_field_is_422() {
        let mut body = house();
        body.as_object_mut().unwrap().remove("MedInc");
        let res = handlers().single_predict(&bytes(&body));
        assert_eq!(res.status, 422);
        assert_eq!(res.body["detail"][0]["type"], "missing");
        assert_eq!(res.body["detail"][0]["msg"], "Field required");
        assert_eq!(res.body["detail"][0]["loc"], json!(["body", "MedInc"]));
    }

    #[test]
    fn test_unparseable_string_is_422() {
        let mut body = house();
        body["MedInc"] = json!("Hello world");
        let res = handlers().single_predict(&bytes(&body));
        assert_eq!(res.status, 422);
        assert_eq!(
            res.body["detail"][0]["msg"],
            "Input should be a valid number, unable to parse string as a number"
        );
    }

    #[test]
    fn test_negative_income_is_422() {
        let mut body = house();
        body["MedInc"] = json!(-8.3252);
        let res = handlers().single_predict(&bytes(&body));
        assert_eq!(res.status, 422);
        assert_eq!(res.body["detail"][0]["type"], "value-error");
        assert_eq!(res.body["detail"][0]["msg"], "Value error, MedInc Must Be Non-Negative");
    }

    #[test]
    fn test_malformed_json_is_422() {
        let res = handlers().single_predict(b"{\"MedInc\": ");
        assert_eq!(res.status, 422);
        assert_eq!(res.body["detail"][0]["type"], "json-invalid");
    }

    #[test]
    fn test_unknown_route_is_404() {
        let res = handlers().handle("POST", "/predict", b"{}");
        assert_eq!(res.status, 404);
        assert_eq!(res.body, json!({ "detail": "Not Found" }));
    }

    #[test]
    fn test_wrong_method_is_405() {
        let res = handlers().handle("GET", "/single-predict", b"");
        assert_eq!(res.status, 405);
        assert!(!res.is_success());
    }

    #[test]
    fn test_lowercase_method_is_405() {
        let res = handlers().handle("post", "/single-predict", &bytes(&house()));
        assert_eq!(res.status, 405);
        assert_eq!(res.body, json!({ "detail": "Method Not Allowed" }));
    }
}
