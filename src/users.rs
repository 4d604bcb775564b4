use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::api::{Payload, WebApi};

/// Display names resolved during one invocation.
#[derive(Debug, Default)]
pub struct UserNames {
    cache: HashMap<String, String>,
}

impl UserNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Display name for `user_id`, falling back to the id itself when the
    /// lookup fails. Failed lookups are not cached.
    pub async fn resolve<A: WebApi>(&mut self, api: &A, user_id: &str) -> String {
        if let Some(name) = self.cache.get(user_id) {
            debug!(user_id, "user name cache hit");
            return name.clone();
        }

        let payload = Payload::new().field("user", user_id).into_map();
        let response = match api.call("users.info", payload).await {
            Ok(response) => response,
            Err(error) => {
                warn!(user_id, %error, "users.info failed");
                return user_id.to_string();
            }
        };

        let user = match response.get("user") {
            Some(user) if user.is_object() && response.get("ok").and_then(Value::as_bool) == Some(true) => {
                user
            }
            _ => {
                let error = response.get("error").and_then(Value::as_str).unwrap_or("no user");
                warn!(user_id, error, "users.info returned no user");
                return user_id.to_string();
            }
        };

        let name = display_name(user).unwrap_or(user_id).to_string();
        self.cache.insert(user_id.to_string(), name.clone());
        name
    }
}

fn display_name(user: &Value) -> Option<&str> {
    let profile = user.get("profile");
    name_field(profile, "display_name")
        .or_else(|| name_field(profile, "real_name"))
        .or_else(|| name_field(Some(user), "name"))
}

fn name_field<'a>(value: Option<&'a Value>, key: &str) -> Option<&'a str> {
    value
        .and_then(|value| value.get(key))
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
}
