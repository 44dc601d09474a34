//! Spoken web search: query → search URL → browser.

use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tracing::{debug, info};
use url::Url;

use crate::config::SearchConfig;
use crate::error::SearchError;

/// Something that can show a URL to the user.
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &Url) -> Result<(), SearchError>;
}

/// Launches an external opener such as `xdg-open` with the URL as last argument.
///
/// The child is not awaited; tokio reaps it in the background.
pub struct CommandOpener {
    program: String,
    args: Vec<String>,
}

impl CommandOpener {
    pub fn new(program: &str, args: &[String]) -> Self {
        Self {
            program: program.to_string(),
            args: args.to_vec(),
        }
    }
}

impl UrlOpener for CommandOpener {
    fn open(&self, url: &Url) -> Result<(), SearchError> {
        Command::new(&self.program)
            .args(&self.args)
            .arg(url.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| SearchError::Launch {
                program: self.program.clone(),
                source,
            })?;
        debug!("Launched {} for {url}", self.program);
        Ok(())
    }
}

pub struct WebSearch {
    engine: String,
    opener: Arc<dyn UrlOpener>,
}

impl WebSearch {
    pub fn new(engine: impl Into<String>, opener: Arc<dyn UrlOpener>) -> Self {
        Self {
            engine: engine.into(),
            opener,
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(
            config.engine.clone(),
            Arc::new(CommandOpener::new(&config.opener, &config.args)),
        )
    }

    /// Search URL for `query`, e.g. `https://www.google.com/search?q=rust+traits`.
    pub fn url_for(&self, query: &str) -> Result<Url, SearchError> {
        Url::parse_with_params(&self.engine, &[("q", query)]).map_err(|source| {
            SearchError::InvalidEngine {
                url: self.engine.clone(),
                source,
            }
        })
    }

    /// Build the URL for `query` and hand it to the opener.
    pub fn search(&self, query: &str) -> Result<Url, SearchError> {
        let url = self.url_for(query)?;
        self.opener.open(&url)?;
        info!("Opened web search for \"{query}\"");
        Ok(url)
    }
}
