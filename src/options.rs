//! Generic `--key value` option parsing and the value coercions the
//! commands share.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

const FLAG_PREFIX: &str = "--";

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("Invalid arg key: {0}")]
    InvalidKey(String),
    #[error("--{0} is required")]
    Missing(String),
    #[error("Use only one of --{first} or --{second}")]
    Conflict { first: String, second: String },
    #[error("Invalid number for --{flag}: {value}")]
    InvalidNumber { flag: String, value: String },
    #[error("Invalid JSON in --{0}")]
    InvalidJson(String),
    #[error("Invalid JSON in --{flag} file ({path})")]
    InvalidJsonFile { flag: String, path: String },
    #[error("failed to read --{flag} ({path}): {source}")]
    Read {
        flag: String,
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Invalid time for --{flag}: {message}")]
    InvalidTime { flag: String, message: String },
}

/// Option map built from everything after the command name.
#[derive(Debug, Default, Clone)]
pub struct Options {
    values: HashMap<String, String>,
}

impl Options {
    pub fn parse<I, S>(args: I) -> Result<Self, OptionsError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut values = HashMap::new();
        let mut args = args.into_iter().map(Into::into).peekable();
        while let Some(key) = args.next() {
            let Some(name) = key.strip_prefix(FLAG_PREFIX) else {
                return Err(OptionsError::InvalidKey(key));
            };
            let name = name.to_string();
            let has_value = args
                .peek()
                .is_some_and(|value| !value.starts_with(FLAG_PREFIX));
            let value = if has_value {
                args.next().unwrap_or_default()
            } else {
                "true".to_string()
            };
            values.insert(name, value);
        }
        Ok(Self { values })
    }

    /// Returns the value for `key`; empty strings read as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn require(&self, key: &str) -> Result<&str, OptionsError> {
        self.get(key)
            .ok_or_else(|| OptionsError::Missing(key.to_string()))
    }

    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(is_truthy)
    }

    /// Coerced boolean, only when the flag was supplied.
    pub fn explicit_flag(&self, key: &str) -> Option<bool> {
        self.get(key).map(is_truthy)
    }

    pub fn number<T: FromStr>(&self, key: &str) -> Result<Option<T>, OptionsError> {
        let Some(raw) = self.get(key) else {
            return Ok(None);
        };
        raw.trim()
            .parse()
            .map(Some)
            .map_err(|_| OptionsError::InvalidNumber {
                flag: key.to_string(),
                value: raw.to_string(),
            })
    }

    pub fn json(&self, key: &str) -> Result<Option<Value>, OptionsError> {
        let Some(raw) = self.get(key) else {
            return Ok(None);
        };
        serde_json::from_str(raw)
            .map(Some)
            .map_err(|_| OptionsError::InvalidJson(key.to_string()))
    }

    pub fn json_file(&self, key: &str) -> Result<Option<Value>, OptionsError> {
        let Some(contents) = self.read_file(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|_| OptionsError::InvalidJsonFile {
                flag: key.to_string(),
                path: self.get(key).unwrap_or_default().to_string(),
            })
    }

    /// JSON supplied inline via `json_key` or as a file path via `file_key`.
    pub fn json_or_file(&self, json_key: &str, file_key: &str) -> Result<Option<Value>, OptionsError> {
        self.ensure_exclusive(json_key, file_key)?;
        match self.json(json_key)? {
            Some(value) => Ok(Some(value)),
            None => self.json_file(file_key),
        }
    }

    /// Message text from `--text` or `--text_file`, with escape sequences
    /// expanded when `--unescape_text` is set.
    pub fn text_input(&self) -> Result<Option<String>, OptionsError> {
        self.ensure_exclusive("text", "text_file")?;
        let text = match self.get("text") {
            Some(inline) => Some(inline.to_string()),
            None => self.read_file("text_file")?,
        };
        let Some(text) = text.filter(|text| !text.is_empty()) else {
            return Ok(None);
        };
        if self.flag("unescape_text") {
            return Ok(Some(unescape_text(&text)));
        }
        Ok(Some(text))
    }

    fn ensure_exclusive(&self, first: &str, second: &str) -> Result<(), OptionsError> {
        if self.get(first).is_some() && self.get(second).is_some() {
            return Err(OptionsError::Conflict {
                first: first.to_string(),
                second: second.to_string(),
            });
        }
        Ok(())
    }

    fn read_file(&self, key: &str) -> Result<Option<String>, OptionsError> {
        let Some(path) = self.get(key) else {
            return Ok(None);
        };
        fs::read_to_string(PathBuf::from(path))
            .map(Some)
            .map_err(|source| OptionsError::Read {
                flag: key.to_string(),
                path: path.to_string(),
                source,
            })
    }
}

pub fn is_truthy(value: &str) -> bool {
    matches!(value, "true" | "1" | "yes" | "y" | "on")
}

/// Expands literal `\r\n`, `\n`, `\r` and `\t` sequences, in that order.
pub fn unescape_text(value: &str) -> String {
    value
        .replace("\\r\\n", "\n")
        .replace("\\n", "\n")
        .replace("\\r", "\r")
        .replace("\\t", "\t")
}
