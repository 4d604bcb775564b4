use chrono::Utc;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::api::{ensure_ok, ApiError, Payload, WebApi};
use crate::dates;
use crate::history::{enrich_messages, thread_messages, Enrichment, Paging};
use crate::message::messages_from_values;
use crate::options::{Options, OptionsError};
use crate::pagination::{collect_pages, PageRequest};
use crate::table::{self, TableError, TableOptions};
use crate::users::UserNames;

const DEFAULT_PAGE_LIMIT: u32 = 200;
const DEFAULT_SEARCH_COUNT: u32 = 100;
const DEFAULT_CHANNEL_TYPES: &str = "public_channel,private_channel";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Options(#[from] OptionsError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("{0}")]
    Usage(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    ListChannels,
    Post,
    PostTable,
    Delete,
    Search,
    ChannelHistory,
    Thread,
    ReactionsAdd,
    ReactionsRemove,
}

impl Command {
    pub const ALL: [Command; 9] = [
        Command::ListChannels,
        Command::Post,
        Command::PostTable,
        Command::Delete,
        Command::Search,
        Command::ChannelHistory,
        Command::Thread,
        Command::ReactionsAdd,
        Command::ReactionsRemove,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|command| command.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::ListChannels => "list_channels",
            Command::Post => "post",
            Command::PostTable => "post_table",
            Command::Delete => "delete",
            Command::Search => "search",
            Command::ChannelHistory => "channel_history",
            Command::Thread => "thread",
            Command::ReactionsAdd => "reactions_add",
            Command::ReactionsRemove => "reactions_remove",
        }
    }
}

/// State for one command run: the API, the parsed options and the user name
/// cache shared by every lookup the command makes.
pub struct Session<'a, A> {
    api: &'a A,
    options: &'a Options,
    names: UserNames,
}

impl<'a, A: WebApi> Session<'a, A> {
    pub fn new(api: &'a A, options: &'a Options) -> Self {
        Self {
            api,
            options,
            names: UserNames::new(),
        }
    }

    pub async fn run(&mut self, command: Command) -> Result<Value, CommandError> {
        debug!(command = command.name(), "running command");
        match command {
            Command::ListChannels => self.list_channels().await,
            Command::Post => self.post_message().await,
            Command::PostTable => self.post_table().await,
            Command::Delete => self.delete_message().await,
            Command::Search => self.search_messages().await,
            Command::ChannelHistory => self.channel_history().await,
            Command::Thread => self.thread_replies().await,
            Command::ReactionsAdd => self.reaction("reactions.add").await,
            Command::ReactionsRemove => self.reaction("reactions.remove").await,
        }
    }

    async fn list_channels(&mut self) -> Result<Value, CommandError> {
        let types = self.options.get("types").unwrap_or(DEFAULT_CHANNEL_TYPES);
        let paging = self.paging()?;
        let params = Payload::new()
            .field("types", types)
            .field("exclude_archived", true)
            .into_map();
        let channels = collect_pages(
            self.api,
            PageRequest {
                method: "conversations.list",
                items_key: "channels",
                params,
                limit: paging.limit,
                all: paging.all,
            },
        )
        .await?;
        Ok(json!({ "channels": channels }))
    }

    async fn post_message(&mut self) -> Result<Value, CommandError> {
        let channel = self.options.require("channel")?;
        let text = self.options.text_input()?;
        let blocks = non_empty_array(self.options.json_or_file("blocks_json", "blocks_file")?);
        let attachments =
            non_empty_array(self.options.json_or_file("attachments_json", "attachments_file")?);

        if text.is_none() && blocks.is_none() && attachments.is_none() {
            return Err(CommandError::Usage(
                "Provide at least one content field: --text, --blocks_json/--blocks_file, or --attachments_json/--attachments_file"
                    .to_string(),
            ));
        }

        let payload = Payload::new()
            .field("channel", channel)
            .optional("text", text)
            .optional("blocks", blocks)
            .optional("attachments", attachments);
        let payload = self
            .threading_fields(payload)
            .optional("mrkdwn", self.options.explicit_flag("mrkdwn"))
            .optional("parse", self.options.get("parse"));
        self.post(payload).await
    }

    async fn post_table(&mut self) -> Result<Value, CommandError> {
        let channel = self.options.require("channel")?;
        let headers = self.options.json_or_file("headers_json", "headers_file")?;
        let rows = self.options.json_or_file("rows_json", "rows_file")?;
        let table_options = TableOptions {
            include_index: self.options.flag("include_index"),
            max_rows: self
                .options
                .number("max_rows")?
                .unwrap_or(table::DEFAULT_MAX_ROWS),
            max_col_width: self
                .options
                .number("max_col_width")?
                .unwrap_or(table::DEFAULT_MAX_COL_WIDTH),
        };
        let rendered = table::render_table(headers.as_ref(), rows.as_ref(), table_options)?;

        let mut parts = Vec::new();
        if let Some(title) = self.options.get("title") {
            parts.push(format!("*{title}*"));
        }
        if let Some(text) = self.options.get("text") {
            parts.push(text.to_string());
        }
        parts.push(format!("```\n{}\n```", rendered.text));
        if rendered.omitted_rows > 0 {
            parts.push(format!(
                "_+{} more row(s) omitted. Use --max_rows to raise the limit._",
                rendered.omitted_rows
            ));
        }

        let payload = Payload::new()
            .field("channel", channel)
            .field("text", parts.join("\n\n"))
            .field("mrkdwn", true);
        let payload = self.threading_fields(payload);
        self.post(payload).await
    }

    async fn delete_message(&mut self) -> Result<Value, CommandError> {
        let channel = self.options.require("channel")?;
        let ts = self.options.require("ts")?;
        let payload = Payload::new().field("channel", channel).field("ts", ts);
        self.call("chat.delete", payload).await
    }

    async fn search_messages(&mut self) -> Result<Value, CommandError> {
        let query = self.options.require("query")?;
        let count = self
            .options
            .number::<u32>("count")?
            .unwrap_or(DEFAULT_SEARCH_COUNT);
        let payload = Payload::new()
            .field("query", query)
            .field("count", count)
            .optional("sort", self.options.get("sort"))
            .optional("sort_dir", self.options.get("sort_dir"));
        let mut response = self.call("search.messages", payload).await?;
        Ok(response
            .get_mut("messages")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    async fn channel_history(&mut self) -> Result<Value, CommandError> {
        let channel = self.options.require("channel")?;
        let paging = self.paging()?;
        let enrichment = Enrichment {
            threads: self.options.flag("include_threads"),
            users: self.options.flag("resolve_users"),
        };
        let params = Payload::new()
            .field("channel", channel)
            .optional("oldest", self.history_bound("oldest")?)
            .optional("latest", self.history_bound("latest")?)
            .field("inclusive", true)
            .into_map();
        let values = collect_pages(
            self.api,
            PageRequest {
                method: "conversations.history",
                items_key: "messages",
                params,
                limit: paging.limit,
                all: paging.all,
            },
        )
        .await?;

        if !enrichment.is_requested() {
            return Ok(json!({ "messages": values }));
        }
        let messages = messages_from_values(values);
        let messages = enrich_messages(
            self.api,
            &mut self.names,
            messages,
            enrichment,
            Some(channel),
            paging,
        )
        .await?;
        Ok(json!({ "messages": messages }))
    }

    async fn thread_replies(&mut self) -> Result<Value, CommandError> {
        let (Some(channel), Some(ts)) = (self.options.get("channel"), self.options.get("ts")) else {
            return Err(CommandError::Usage("--channel and --ts are required".to_string()));
        };
        let paging = self.paging()?;
        let resolve_users = self.options.flag("resolve_users");
        let messages =
            thread_messages(self.api, &mut self.names, channel, ts, paging, resolve_users).await?;
        Ok(json!({ "messages": messages }))
    }

    async fn reaction(&mut self, method: &str) -> Result<Value, CommandError> {
        let (Some(channel), Some(ts), Some(name)) = (
            self.options.get("channel"),
            self.options.get("ts"),
            self.options.get("name"),
        ) else {
            return Err(CommandError::Usage(
                "--channel, --ts, and --name are required".to_string(),
            ));
        };
        let payload = Payload::new()
            .field("channel", channel)
            .field("timestamp", ts)
            .field("name", name);
        self.call(method, payload).await
    }

    fn paging(&self) -> Result<Paging, CommandError> {
        Ok(Paging {
            limit: self.options.number("limit")?.unwrap_or(DEFAULT_PAGE_LIMIT),
            all: self.options.flag("all"),
        })
    }

    fn history_bound(&self, key: &str) -> Result<Option<String>, CommandError> {
        let Some(raw) = self.options.get(key) else {
            return Ok(None);
        };
        dates::resolve_bound(raw, Utc::now())
            .map(Some)
            .map_err(|message| {
                OptionsError::InvalidTime {
                    flag: key.to_string(),
                    message,
                }
                .into()
            })
    }

    /// Thread and unfurl options shared by `post` and `post_table`.
    fn threading_fields(&self, payload: Payload) -> Payload {
        payload
            .optional("thread_ts", self.options.get("thread_ts"))
            .optional("reply_broadcast", self.options.explicit_flag("reply_broadcast"))
            .optional("unfurl_links", self.options.explicit_flag("unfurl_links"))
            .optional("unfurl_media", self.options.explicit_flag("unfurl_media"))
    }

    async fn post(&self, payload: Payload) -> Result<Value, CommandError> {
        self.call("chat.postMessage", payload).await
    }

    async fn call(&self, method: &str, payload: Payload) -> Result<Value, CommandError> {
        let response = self.api.call(method, payload.into_map()).await?;
        Ok(ensure_ok(method, response)?)
    }
}

fn non_empty_array(value: Option<Value>) -> Option<Value> {
    value.filter(|value| value.as_array().is_some_and(|items| !items.is_empty()))
}
