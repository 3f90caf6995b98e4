//! Timetable feed access.
//!
//! The feed is an external collaborator: it returns loosely typed class
//! records for a session. Logging in and scraping the upstream page happen
//! elsewhere; this module only fetches records that are already JSON.

mod client;
mod error;
mod file;
mod session;

use std::future::Future;

use crate::domain::RawClassItem;

pub use client::{FeedClient, FeedClientConfig};
pub use error::FetchError;
pub use file::FileFeed;
pub use session::{SessionContext, SessionProvider, StaticSession};

/// Trait for fetching raw timetable records.
///
/// This abstraction allows the refresh pipeline to be tested with mock data.
pub trait TimetableSource: Send + Sync {
    fn fetch_classes(
        &self,
        session: &SessionContext,
    ) -> impl Future<Output = Result<Vec<RawClassItem>, FetchError>> + Send;
}

/// The feed chosen at startup.
#[derive(Debug, Clone)]
pub enum TimetableFeed {
    Http(FeedClient),
    File(FileFeed),
}

impl TimetableSource for TimetableFeed {
    async fn fetch_classes(
        &self,
        session: &SessionContext,
    ) -> Result<Vec<RawClassItem>, FetchError> {
        match self {
            TimetableFeed::Http(client) => client.fetch_classes(session).await,
            TimetableFeed::File(feed) => feed.fetch_classes(session).await,
        }
    }
}
