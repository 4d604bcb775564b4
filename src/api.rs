use reqwest::Client;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected status: {0}")]
    Status(u16),
    #[error("{0}")]
    Failed(String),
}

/// A Slack Web API method caller.
///
/// Implementations return the decoded response body as-is; checking the `ok`
/// flag is left to the caller via [`ensure_ok`].
#[allow(async_fn_in_trait)]
pub trait WebApi {
    async fn call(&self, method: &str, payload: Map<String, Value>) -> Result<Value, ApiError>;
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    token: String,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            http: Client::new(),
        }
    }
}

impl WebApi for ApiClient {
    async fn call(&self, method: &str, payload: Map<String, Value>) -> Result<Value, ApiError> {
        let url = format!("{}/{}", self.base_url, method);
        let fields = form_fields(&payload)?;
        debug!(method, fields = fields.len(), "calling web api");

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .form(&fields)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        Ok(response.json().await?)
    }
}

/// Flattens a payload into form fields. Nested values (blocks, attachments)
/// are sent as JSON strings, which is how the Web API expects them in
/// form-encoded requests.
fn form_fields(payload: &Map<String, Value>) -> Result<Vec<(String, String)>, ApiError> {
    let mut fields = Vec::with_capacity(payload.len());
    for (key, value) in payload {
        let value = match value {
            Value::Null => continue,
            Value::String(text) => text.clone(),
            Value::Bool(flag) => flag.to_string(),
            Value::Number(number) => number.to_string(),
            Value::Array(_) | Value::Object(_) => serde_json::to_string(value)?,
        };
        fields.push((key.clone(), value));
    }
    Ok(fields)
}

/// Fails with the API-provided error (or `<method> failed`) unless `ok` is true.
pub fn ensure_ok(method: &str, response: Value) -> Result<Value, ApiError> {
    if response.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(response);
    }
    let message = response
        .get("error")
        .and_then(Value::as_str)
        .filter(|error| !error.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{method} failed"));
    debug!(method, error = %message, "web api returned an error");
    Err(ApiError::Failed(message))
}

/// Request payload that only carries fields the caller explicitly supplied.
#[derive(Debug, Default, Clone)]
pub struct Payload {
    fields: Map<String, Value>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn optional<V: Into<Value>>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.fields.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ensure_ok_passes_successful_responses_through() {
        let response = json!({"ok": true, "ts": "1.0"});
        assert_eq!(ensure_ok("chat.postMessage", response.clone()).unwrap(), response);
    }

    #[test]
    fn ensure_ok_surfaces_api_error_code() {
        let err = ensure_ok("chat.delete", json!({"ok": false, "error": "message_not_found"}))
            .unwrap_err();
        assert_eq!(err.to_string(), "message_not_found");
    }

    #[test]
    fn ensure_ok_falls_back_to_method_name() {
        let err = ensure_ok("reactions.add", json!({"ok": false})).unwrap_err();
        assert_eq!(err.to_string(), "reactions.add failed");

        let err = ensure_ok("reactions.add", json!({"error": ""})).unwrap_err();
        assert_eq!(err.to_string(), "reactions.add failed");
    }

    #[test]
    fn payload_skips_absent_fields() {
        let payload = Payload::new()
            .field("channel", "C1")
            .optional("thread_ts", None::<&str>)
            .optional("mrkdwn", Some(true))
            .into_map();
        assert_eq!(Value::Object(payload), json!({"channel": "C1", "mrkdwn": true}));
    }

    #[test]
    fn form_fields_encode_nested_values_as_json() {
        let payload = Payload::new()
            .field("channel", "C1")
            .field("limit", 200)
            .field("inclusive", true)
            .field("blocks", json!([{"type": "divider"}]))
            .field("skipped", Value::Null)
            .into_map();
        let fields = form_fields(&payload).unwrap();
        assert_eq!(
            fields,
            vec![
                ("channel".to_string(), "C1".to_string()),
                ("limit".to_string(), "200".to_string()),
                ("inclusive".to_string(), "true".to_string()),
                ("blocks".to_string(), r#"[{"type":"divider"}]"#.to_string()),
            ]
        );
    }
}
