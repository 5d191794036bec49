//! `GET /story/fact`: the item source behind the feed.
//!
//! The backend hands out one fact per call, wrapped as `{"fact": {...}}`.
//! There is no page cursor: every call is "the next one for this user".

use serde::Deserialize;

use super::{FeedItem, FeedSource};
use crate::client::{AuthenticatedClient, ClientError};

const FACT_PATH: &str = "/story/fact";

/// Response envelope of the fact endpoint.
#[derive(Debug, Deserialize)]
struct FactEnvelope {
    fact: FeedItem,
}

/// Feed source backed by the story service.
#[derive(Clone)]
pub struct FactSource {
    client: AuthenticatedClient,
    label: String,
}

impl FactSource {
    pub fn new(client: AuthenticatedClient) -> Self {
        Self {
            client,
            label: "story".to_string(),
        }
    }
}

impl FeedSource for FactSource {
    fn name(&self) -> &str {
        &self.label
    }

    async fn fetch_next(&self) -> Result<FeedItem, ClientError> {
        let FactEnvelope { fact } = self.client.get_json(FACT_PATH).await?;
        Ok(fact)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
