use crate::api::{ApiError, Payload, WebApi};
use crate::message::{messages_from_values, Message};
use crate::pagination::{collect_pages, PageRequest};
use crate::users::UserNames;

/// Page size and exhaustive-pagination flag shared by history and thread reads.
#[derive(Clone, Copy, Debug)]
pub struct Paging {
    pub limit: u32,
    pub all: bool,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Enrichment {
    pub threads: bool,
    pub users: bool,
}

impl Enrichment {
    pub fn is_requested(self) -> bool {
        self.threads || self.users
    }
}

/// Replies of the thread rooted at `ts`, root included. Names are attached
/// when `resolve_users` is set.
pub async fn thread_messages<A: WebApi>(
    api: &A,
    names: &mut UserNames,
    channel: &str,
    ts: &str,
    paging: Paging,
    resolve_users: bool,
) -> Result<Vec<Message>, ApiError> {
    let params = Payload::new()
        .field("channel", channel)
        .field("ts", ts)
        .field("inclusive", true)
        .into_map();
    let values = collect_pages(
        api,
        PageRequest {
            method: "conversations.replies",
            items_key: "messages",
            params,
            limit: paging.limit,
            all: paging.all,
        },
    )
    .await?;

    let mut messages = messages_from_values(values);
    if resolve_users {
        for message in &mut messages {
            attach_user_name(api, names, message).await;
        }
    }
    Ok(messages)
}

/// Attaches display names and one level of thread replies, in message order.
pub async fn enrich_messages<A: WebApi>(
    api: &A,
    names: &mut UserNames,
    messages: Vec<Message>,
    enrichment: Enrichment,
    channel: Option<&str>,
    paging: Paging,
) -> Result<Vec<Message>, ApiError> {
    let mut enriched = Vec::with_capacity(messages.len());
    for mut message in messages {
        if enrichment.users {
            attach_user_name(api, names, &mut message).await;
        }
        if let (true, Some(channel)) = (enrichment.threads, channel) {
            if message.is_thread_root() {
                let root_ts = message.ts().unwrap_or_default().to_string();
                let thread =
                    thread_messages(api, names, channel, &root_ts, paging, enrichment.users).await?;
                message.set_thread(thread);
            }
        }
        enriched.push(message);
    }
    Ok(enriched)
}

async fn attach_user_name<A: WebApi>(api: &A, names: &mut UserNames, message: &mut Message) {
    if let Some(user_id) = message.user().map(str::to_string) {
        let name = names.resolve(api, &user_id).await;
        message.set_user_name(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;
    use serde_json::{json, Value};

    const PAGING: Paging = Paging {
        limit: 200,
        all: false,
    };

    fn messages(value: Value) -> Vec<Message> {
        let Value::Array(values) = value else {
            panic!("expected array");
        };
        messages_from_values(values)
    }

    fn to_json(messages: &[Message]) -> Value {
        serde_json::to_value(messages).unwrap()
    }

    #[tokio::test]
    async fn thread_replies_are_paged_with_inclusive_flag() {
        let api = FakeApi::new();
        api.respond(
            "conversations.replies",
            json!({"ok": true, "messages": [{"ts": "1.0", "thread_ts": "1.0"}, {"ts": "1.1", "thread_ts": "1.0"}]}),
        );

        let mut names = UserNames::new();
        let thread = thread_messages(&api, &mut names, "C1", "1.0", PAGING, false)
            .await
            .unwrap();
        assert_eq!(thread.len(), 2);
        assert_eq!(
            api.payloads("conversations.replies"),
            vec![json!({"channel": "C1", "ts": "1.0", "inclusive": true, "limit": 200})]
        );
    }

    #[tokio::test]
    async fn thread_replies_resolve_names_when_asked() {
        let api = FakeApi::new();
        api.respond(
            "conversations.replies",
            json!({"ok": true, "messages": [{"ts": "1.0", "user": "U1"}, {"ts": "1.1", "user": "U1"}, {"ts": "1.2"}]}),
        )
        .respond(
            "users.info",
            json!({"ok": true, "user": {"name": "ada", "profile": {"display_name": "Ada"}}}),
        );

        let mut names = UserNames::new();
        let thread = thread_messages(&api, &mut names, "C1", "1.0", PAGING, true)
            .await
            .unwrap();
        assert_eq!(
            to_json(&thread),
            json!([
                {"ts": "1.0", "user": "U1", "user_name": "Ada"},
                {"ts": "1.1", "user": "U1", "user_name": "Ada"},
                {"ts": "1.2"}
            ])
        );
        assert_eq!(api.payloads("users.info").len(), 1);
    }

    #[tokio::test]
    async fn thread_replies_pass_non_object_entries_through() {
        let api = FakeApi::new();
        api.respond(
            "conversations.replies",
            json!({"ok": true, "messages": [42, {"ts": "1.1"}]}),
        );

        let mut names = UserNames::new();
        let thread = thread_messages(&api, &mut names, "C1", "1.0", PAGING, true)
            .await
            .unwrap();
        assert_eq!(to_json(&thread), json!([42, {"ts": "1.1"}]));
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn only_thread_roots_get_their_replies_attached() {
        let api = FakeApi::new();
        api.respond(
            "conversations.replies",
            json!({"ok": true, "messages": [{"ts": "1.0", "thread_ts": "1.0"}, {"ts": "1.5", "thread_ts": "1.0"}]}),
        );

        let history = messages(json!([
            {"ts": "3.0"},
            {"ts": "2.0", "thread_ts": "1.0"},
            {"ts": "1.0", "thread_ts": "1.0"}
        ]));
        let mut names = UserNames::new();
        let enrichment = Enrichment {
            threads: true,
            users: false,
        };
        let enriched = enrich_messages(&api, &mut names, history, enrichment, Some("C1"), PAGING)
            .await
            .unwrap();

        assert!(enriched[0].thread().is_none());
        assert!(enriched[1].thread().is_none());
        assert_eq!(enriched[2].thread().map(Vec::len), Some(2));
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn thread_expansion_needs_a_channel() {
        let api = FakeApi::new();
        let history = messages(json!([{"ts": "1.0", "thread_ts": "1.0"}]));
        let mut names = UserNames::new();
        let enrichment = Enrichment {
            threads: true,
            users: false,
        };
        let enriched = enrich_messages(&api, &mut names, history.clone(), enrichment, None, PAGING)
            .await
            .unwrap();
        assert_eq!(enriched, history);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn names_are_resolved_in_threads_and_top_level() {
        let api = FakeApi::new();
        api.respond(
            "users.info",
            json!({"ok": true, "user": {"name": "ada", "profile": {"display_name": "Ada"}}}),
        )
        .respond(
            "conversations.replies",
            json!({"ok": true, "messages": [{"ts": "1.0", "thread_ts": "1.0", "user": "U1"}, {"ts": "1.1", "user": "U2"}]}),
        )
        .respond(
            "users.info",
            json!({"ok": true, "user": {"name": "bob", "profile": {"real_name": "Bob"}}}),
        );

        let history = messages(json!([{"ts": "1.0", "thread_ts": "1.0", "user": "U1"}]));
        let mut names = UserNames::new();
        let enrichment = Enrichment {
            threads: true,
            users: true,
        };
        let enriched = enrich_messages(&api, &mut names, history, enrichment, Some("C1"), PAGING)
            .await
            .unwrap();

        assert_eq!(
            to_json(&enriched),
            json!([{
                "ts": "1.0",
                "thread_ts": "1.0",
                "user": "U1",
                "user_name": "Ada",
                "thread": [
                    {"ts": "1.0", "thread_ts": "1.0", "user": "U1", "user_name": "Ada"},
                    {"ts": "1.1", "user": "U2", "user_name": "Bob"}
                ]
            }])
        );
        assert_eq!(api.payloads("users.info").len(), 2);
    }
}
