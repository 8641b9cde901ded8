use aeris_core::engine::outcome_to_json;
use aeris_core::{DroughtEngine, Polarization};
use wasm_bindgen::prelude::*;

/// Analyze a request JSON with the simulated sampler.
/// Returns the statistics JSON, or `{"error": {"kind", "message"}}`.
#[wasm_bindgen]
pub fn analyze(request_json: &str) -> String {
    let engine = DroughtEngine::default();
    outcome_to_json(&engine.analyze_json(request_json), false)
}

/// Plain-language summary of a simulated analysis.
/// Errors are returned as `{"error": {"kind", "message"}}` JSON.
#[wasm_bindgen]
pub fn summary(request_json: &str) -> String {
    let outcome = DroughtEngine::default().analyze_json(request_json);
    match &outcome {
        Ok(stats) => stats.summary(),
        Err(_) => outcome_to_json(&outcome, false),
    }
}

/// Severity legend JSON for "VV" or "VH".
#[wasm_bindgen]
pub fn legend(polarization: &str) -> Result<String, JsValue> {
    let pol: Polarization = polarization
        .parse()
        .map_err(|e: aeris_core::AnalysisError| JsValue::from_str(&e.to_string()))?;
    let legend = DroughtEngine::default().legend(pol);
    serde_json::to_string(&legend).map_err(|e| JsValue::from_str(&format!("Serialize failed: {e}")))
}

/// Built-in seasonal baseline table as JSON.
#[wasm_bindgen]
pub fn baselines() -> Result<String, JsValue> {
    serde_json::to_string(DroughtEngine::default().baselines())
        .map_err(|e| JsValue::from_str(&format!("Serialize failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_returns_statistics_or_error_json() {
        let ok = analyze(
            r#"{"polygon": {"type": "Polygon", "coordinates": [[[10.0, 45.0], [10.2, 45.0], [10.2, 45.2], [10.0, 45.0]]]},
                "date_range": {"start": "2022-08-01", "end": "2022-08-15"}}"#,
        );
        let v: serde_json::Value = serde_json::from_str(&ok).unwrap();
        assert_eq!(v["quality_flag"], "SIMULATED");

        let err: serde_json::Value = serde_json::from_str(&analyze("not json")).unwrap();
        assert_eq!(err["error"]["kind"], "INVALID_REQUEST");
    }

    #[test]
    fn summary_is_a_sentence_or_error_json() {
        let text = summary(
            r#"{"polygon": {"type": "Polygon", "coordinates": [[[10.0, 45.0], [10.2, 45.0], [10.2, 45.2], [10.0, 45.0]]]},
                "date_range": {"start": "2022-08-01", "end": "2022-08-15"}}"#,
        );
        assert!(text.contains("seasonal baseline"), "{text}");

        let err: serde_json::Value = serde_json::from_str(&summary("{}")).unwrap();
        assert_eq!(err["error"]["kind"], "INVALID_REQUEST");
    }

    #[test]
    fn baselines_serialize() {
        let v: serde_json::Value = serde_json::from_str(&baselines().unwrap()).unwrap();
        assert_eq!(v["bands"].as_array().unwrap().len(), 4);
    }
}
