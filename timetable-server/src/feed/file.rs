//! File-backed timetable feed for development without feed access.
//!
//! Reads the same JSON the remote feed serves, from a local file, on every
//! fetch. Editing the file between refreshes simulates timetable changes.

use std::path::{Path, PathBuf};

use crate::domain::RawClassItem;

use super::client::parse_feed_body;
use super::error::FetchError;
use super::session::SessionContext;

/// Timetable feed that serves class records from a JSON file.
#[derive(Debug, Clone)]
pub struct FileFeed {
    path: PathBuf,
}

impl FileFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all class records. The session is ignored.
    pub async fn fetch_classes(
        &self,
        _session: &SessionContext,
    ) -> Result<Vec<RawClassItem>, FetchError> {
        let body = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| FetchError::Io {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;

        parse_feed_body(&body)
    }
}
