use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use serde_json::{Map, Value};

use crate::api::{ApiError, WebApi};

/// In-memory [`WebApi`] that replays queued responses per method and records
/// every call it receives.
#[derive(Default)]
pub struct FakeApi {
    responses: RefCell<HashMap<String, VecDeque<Result<Value, ApiError>>>>,
    calls: RefCell<Vec<(String, Map<String, Value>)>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: &str, response: Value) -> &Self {
        self.push(method, Ok(response))
    }

    pub fn fail(&self, method: &str, error: ApiError) -> &Self {
        self.push(method, Err(error))
    }

    pub fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.borrow().clone()
    }

    pub fn payloads(&self, method: &str) -> Vec<Value> {
        self.calls
            .borrow()
            .iter()
            .filter(|(called, _)| called == method)
            .map(|(_, payload)| Value::Object(payload.clone()))
            .collect()
    }

    fn push(&self, method: &str, response: Result<Value, ApiError>) -> &Self {
        self.responses
            .borrow_mut()
            .entry(method.to_string())
            .or_default()
            .push_back(response);
        self
    }
}

impl WebApi for FakeApi {
    async fn call(&self, method: &str, payload: Map<String, Value>) -> Result<Value, ApiError> {
        self.calls.borrow_mut().push((method.to_string(), payload));
        self.responses
            .borrow_mut()
            .get_mut(method)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| panic!("unexpected call to {method}"))
    }
}
