//! Filter extraction: free text in, filter model out.
//!
//! The language understanding itself lives outside this crate. The pipeline
//! only needs something that implements [`FilterExtractor`]: a static model
//! supplied on the command line, or an HTTP endpoint that answers with the
//! filter model as JSON. Extractors are expected to be confidence-gated and
//! leave a dimension unset when unsure.

use std::time::Duration;

use serde_json::Value;

use crate::config::ExtractorConfig;
use crate::filter::FilterModel;
use crate::{ShopError, ShopResult};

pub trait FilterExtractor: Send + Sync {
    fn extract(&self, user_text: &str) -> ShopResult<FilterModel>;
}

/// Always returns the same filter model, whatever the text.
#[derive(Debug, Clone, Default)]
pub struct StaticExtractor {
    filters: FilterModel,
}

impl StaticExtractor {
    pub fn new(filters: FilterModel) -> Self {
        Self { filters }
    }
}

impl FilterExtractor for StaticExtractor {
    fn extract(&self, _user_text: &str) -> ShopResult<FilterModel> {
        Ok(self.filters.clone())
    }
}

/// Posts `{"text": ...}` to an endpoint and parses the filter model it returns.
///
/// The body may be the bare model, `{"filters": {...}}`, or text with the JSON
/// object embedded in it (language models like to wrap their answers).
#[derive(Debug, Clone)]
pub struct HttpExtractor {
    endpoint: String,
    timeout: Duration,
}

impl HttpExtractor {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ExtractorConfig) -> ShopResult<Self> {
        let endpoint = config.endpoint.clone().ok_or_else(|| {
            ShopError::Extraction("No extractor endpoint configured (extractor.endpoint)".into())
        })?;
        Ok(Self::new(endpoint, Duration::from_secs(config.timeout_secs)))
    }
}

impl FilterExtractor for HttpExtractor {
    fn extract(&self, user_text: &str) -> ShopResult<FilterModel> {
        let body = serde_json::json!({ "text": user_text });
        let payload = serde_json::to_vec(&body)?;

        let mut response = ureq::post(&self.endpoint)
            .header("content-type", "application/json")
            .config()
            .timeout_global(Some(self.timeout))
            .build()
            .send(payload.as_slice())
            .map_err(|e| {
                tracing::warn!(endpoint = %self.endpoint, "Extractor call failed: {}", e);
                ShopError::Extraction(format!("Extractor request failed: {}", e))
            })?;

        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ShopError::Extraction(format!("Extractor body unreadable: {}", e)))?;

        let filters = parse_extraction_response(&text)?;
        tracing::info!(
            constraints = filters.constraint_count(),
            "Filters extracted"
        );
        Ok(filters)
    }
}

/// Pull the filter model out of an extractor reply.
pub fn parse_extraction_response(response: &str) -> ShopResult<FilterModel> {
    let json_str = match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => response,
    };

    let value: Value = serde_json::from_str(json_str)
        .map_err(|e| ShopError::Extraction(format!("Failed to parse extraction: {}", e)))?;

    let model = match value {
        Value::Object(mut obj) if obj.contains_key("filters") => {
            obj.remove("filters").unwrap_or(Value::Null)
        }
        other => other,
    };
    if !model.is_object() {
        return Err(ShopError::Extraction(format!(
            "Extractor returned no filter object (got {})",
            model
        )));
    }
    // Shape errors belong to the extractor; oversized lists stay validation errors.
    FilterModel::from_value(model).map_err(|e| match e {
        ShopError::Serialization(e) => ShopError::Extraction(format!("Malformed filter object: {}", e)),
        other => other,
    })
}
