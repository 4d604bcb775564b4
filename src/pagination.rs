use serde_json::{Map, Value};
use tracing::debug;

use crate::api::{ensure_ok, ApiError, WebApi};

/// One paged listing: `method` is called with `params` plus `limit` and, after
/// the first page, `cursor`. Items are read from the response's `items_key`.
pub struct PageRequest<'a> {
    pub method: &'a str,
    pub items_key: &'a str,
    pub params: Map<String, Value>,
    pub limit: u32,
    pub all: bool,
}

/// Collects items across pages. Only follows `response_metadata.next_cursor`
/// when `all` is set, so a single page is fetched otherwise.
pub async fn collect_pages<A: WebApi>(api: &A, request: PageRequest<'_>) -> Result<Vec<Value>, ApiError> {
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let mut payload = request.params.clone();
        payload.insert("limit".to_string(), Value::from(request.limit));
        if let Some(cursor) = cursor.take() {
            payload.insert("cursor".to_string(), Value::String(cursor));
        }

        let response = ensure_ok(request.method, api.call(request.method, payload).await?)?;
        let page = match response.get(request.items_key) {
            Some(Value::Array(page)) => page.clone(),
            _ => Vec::new(),
        };
        let next = next_cursor(&response);
        debug!(
            method = request.method,
            items = page.len(),
            has_more = next.is_some(),
            "fetched page"
        );
        items.extend(page);

        match next {
            Some(next) if request.all => cursor = Some(next),
            _ => break,
        }
    }
    Ok(items)
}

fn next_cursor(response: &Value) -> Option<String> {
    response
        .get("response_metadata")
        .and_then(|metadata| metadata.get("next_cursor"))
        .and_then(Value::as_str)
        .filter(|cursor| !cursor.is_empty())
        .map(str::to_string)
}
