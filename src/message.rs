use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message as returned by the Web API. The schema is open, so the record
/// keeps every field and only exposes the few the enrichment pass reads.
/// Entries that are not JSON objects are carried through untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(Value);

impl From<Value> for Message {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl Message {
    pub fn user(&self) -> Option<&str> {
        self.str_field("user")
    }

    pub fn ts(&self) -> Option<&str> {
        self.str_field("ts")
    }

    pub fn thread_ts(&self) -> Option<&str> {
        self.str_field("thread_ts")
    }

    #[cfg(test)]
    pub fn user_name(&self) -> Option<&str> {
        self.str_field("user_name")
    }

    #[cfg(test)]
    pub fn thread(&self) -> Option<&Vec<Value>> {
        self.0.get("thread").and_then(Value::as_array)
    }

    /// First message of a reply thread: its `thread_ts` is its own `ts`.
    pub fn is_thread_root(&self) -> bool {
        matches!((self.thread_ts(), self.ts()), (Some(thread_ts), Some(ts)) if thread_ts == ts)
    }

    pub fn set_user_name(&mut self, name: String) {
        self.set_field("user_name", Value::String(name));
    }

    pub fn set_thread(&mut self, replies: Vec<Message>) {
        let replies = replies.into_iter().map(|reply| reply.0).collect();
        self.set_field("thread", Value::Array(replies));
    }

    fn set_field(&mut self, key: &str, value: Value) {
        if let Value::Object(fields) = &mut self.0 {
            fields.insert(key.to_string(), value);
        }
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }
}

pub fn messages_from_values(values: Vec<Value>) -> Vec<Message> {
    values.into_iter().map(Message::from).collect()
}
