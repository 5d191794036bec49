//! Backend endpoints behind small traits.
//!
//! The paginator and the preference mutator never see HTTP directly.  They
//! talk to a [`FeedSource`] and a [`PreferenceSink`], which keeps their state
//! machines testable with in-memory fakes.  The real implementations
//! ([`FactSource`], [`RecommendationSink`]) sit on top of
//! [`AuthenticatedClient`](crate::client::AuthenticatedClient).
//!
//! ## For contributors: adding a new source
//!
//! 1. Create a new file in this directory.
//! 2. Define a struct and implement [`FeedSource`] for it.
//! 3. Add `mod` below and re-export the struct.
//! 4. Construct it where the feed view is mounted in `app.rs`.

mod fact;
mod feed_item;
mod recommendation;

pub use fact::FactSource;
pub use feed_item::FeedItem;
pub use recommendation::RecommendationSink;

use std::future::Future;

use crate::client::ClientError;

/// Produces feed items, one per call.
///
/// Fetches run on spawned tasks, so implementations must be
/// `Send + Sync + 'static` and return `Send` futures.
pub trait FeedSource: Send + Sync + 'static {
    /// Human-readable label used in logs.
    fn name(&self) -> &str;

    /// Fetch exactly one item.
    fn fetch_next(&self) -> impl Future<Output = Result<FeedItem, ClientError>> + Send;
}

/// Records like / unlike decisions.
pub trait PreferenceSink: Send + Sync + 'static {
    fn set_liked(
        &self,
        category: &str,
        liked: bool,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;
}
