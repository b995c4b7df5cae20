use std::{env, path::Path, time::Duration};

use crate::{errors::Error, Result};

/// Default separator between the fields of one expense line.
pub const DEFAULT_FIELD_DELIMITER: char = '/';

/// Typed configuration, built once at startup and shared read-only.
#[derive(Clone, Debug)]
pub struct Config {
    // Required
    pub telegram_bot_token: String,
    pub script_url: String,
    pub secret: String,

    // Parsing
    pub field_delimiter: char,

    // Recorder; `None` keeps the HTTP client's own default.
    pub request_timeout: Option<Duration>,
}

impl Config {
    /// Load from the process environment. Call [`load_dotenv`] first to pick up a `.env` file.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| lookup(key).and_then(non_empty);

        let (telegram_bot_token, script_url, secret) =
            match (required("TOKEN"), required("SCRIPT_URL"), required("SECRET")) {
                (Some(token), Some(url), Some(secret)) => (token, url, secret),
                (token, url, secret) => {
                    let missing = [
                        ("TOKEN", token.is_none()),
                        ("SCRIPT_URL", url.is_none()),
                        ("SECRET", secret.is_none()),
                    ]
                    .into_iter()
                    .filter(|(_, absent)| *absent)
                    .map(|(key, _)| key)
                    .collect::<Vec<_>>()
                    .join(", ");
                    return Err(Error::Config(format!(
                        "missing required environment variables: {missing}"
                    )));
                }
            };

        let field_delimiter = match lookup("FIELD_DELIMITER") {
            None => DEFAULT_FIELD_DELIMITER,
            Some(raw) => parse_delimiter(&raw)?,
        };

        let request_timeout = match lookup("REQUEST_TIMEOUT_MS").and_then(non_empty) {
            None => None,
            Some(raw) => {
                let ms = raw.trim().parse::<u64>().map_err(|_| {
                    Error::Config(format!("REQUEST_TIMEOUT_MS must be an integer, got {raw:?}"))
                })?;
                Some(Duration::from_millis(ms))
            }
        };

        Ok(Self {
            telegram_bot_token: telegram_bot_token.trim().to_string(),
            script_url: script_url.trim().to_string(),
            secret,
            field_delimiter,
            request_timeout,
        })
    }
}

fn parse_delimiter(raw: &str) -> Result<char> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_whitespace() => Ok(c),
        _ => Err(Error::Config(format!(
            "FIELD_DELIMITER must be a single non-space character, got {raw:?}"
        ))),
    }
}

/// Merge `.env` from the working directory into the process environment.
///
/// Variables already set are kept. A missing file is fine; an unreadable one is not.
pub fn load_dotenv() -> Result<()> {
    load_dotenv_from(Path::new(".env"))
}

fn load_dotenv_from(path: &Path) -> Result<()> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(Error::Config(format!("{}: {e}", path.display()))),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
