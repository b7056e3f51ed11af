//! Recorded-response fetcher.
//!
//! Serves channel responses from JSON files on disk, in the same body format
//! the live API uses. Useful for demos, tests and offline development.
//!
//! ## Layout
//!
//! ```text
//! recordings/
//!   battery.json        # served on every fetch of the battery channel
//!   lock/               # served in name order, the last one repeating
//!     001.json
//!     002.json
//! ```
//!
//! A channel with neither a file nor a directory is reported as not
//! supported, like a vehicle without that endpoint.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use carwatch_poller::{FetchError, Fetcher};
use carwatch_types::{Channel, Snapshot};
use parking_lot::Mutex;

use crate::{kamereon, AdapterError};

/// Fetcher that replays recorded responses from a directory.
#[derive(Debug)]
pub struct ReplayFetcher {
    dir: PathBuf,
    description: String,
    cursors: Mutex<HashMap<Channel, usize>>,
    last_error: Mutex<Option<String>>,
}

impl ReplayFetcher {
    /// Create a fetcher reading from `dir`.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let description = format!("replay: {}", dir.display());
        Self {
            dir,
            description,
            cursors: Mutex::new(HashMap::new()),
            last_error: Mutex::new(None),
        }
    }

    /// Returns the directory being replayed.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The error of the last fetch, if it failed.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// Resolve the file to serve for a channel, advancing sequences.
    async fn next_file(&self, channel: Channel) -> Result<Option<PathBuf>, AdapterError> {
        let single = self.dir.join(format!("{}.json", channel.as_str()));
        if tokio::fs::try_exists(&single).await? {
            return Ok(Some(single));
        }

        let sequence_dir = self.dir.join(channel.as_str());
        let mut entries = match tokio::fs::read_dir(&sequence_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Ok(None);
        }

        let mut cursors = self.cursors.lock();
        let cursor = cursors.entry(channel).or_insert(0);
        let index = (*cursor).min(files.len() - 1);
        *cursor += 1;
        Ok(Some(files.swap_remove(index)))
    }

    async fn read(&self, channel: Channel) -> Result<Snapshot, FetchError> {
        let path = match self.next_file(channel).await {
            Ok(Some(path)) => path,
            Ok(None) => {
                return Err(FetchError::NotSupported(format!(
                    "no recording for {channel} in {}",
                    self.dir.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };

        let body = tokio::fs::read_to_string(&path)
            .await
            .map_err(AdapterError::from)?;
        kamereon::parse(channel, &body).map_err(FetchError::from)
    }
}

#[async_trait]
impl Fetcher for ReplayFetcher {
    async fn fetch(&self, channel: Channel) -> Result<Snapshot, FetchError> {
        let result = self.read(channel).await;
        *self.last_error.lock() = result.as_ref().err().map(|e| e.to_string());
        result
    }

    fn description(&self) -> &str {
        &self.description
    }
}
