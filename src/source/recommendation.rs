//! `POST /recommendations/{like,unlike}`: where preferences are recorded.

use serde::Serialize;

use super::PreferenceSink;
use crate::client::{AuthenticatedClient, ClientError};

#[derive(Serialize)]
struct CategoryAction<'a> {
    category: &'a str,
}

/// Preference sink backed by the recommendation service.
#[derive(Clone)]
pub struct RecommendationSink {
    client: AuthenticatedClient,
}

impl RecommendationSink {
    pub fn new(client: AuthenticatedClient) -> Self {
        Self { client }
    }

    fn endpoint(liked: bool) -> &'static str {
        if liked {
            "/recommendations/like"
        } else {
            "/recommendations/unlike"
        }
    }
}

impl PreferenceSink for RecommendationSink {
    async fn set_liked(&self, category: &str, liked: bool) -> Result<(), ClientError> {
        self.client
            .post_json(Self::endpoint(liked), &CategoryAction { category })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStore;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn like_and_unlike_hit_their_endpoints() {
        let server = MockServer::start().await;
        for endpoint in ["/recommendations/like", "/recommendations/unlike"] {
            Mock::given(method("POST"))
                .and(path(endpoint))
                .and(body_json(serde_json::json!({"category": "science"})))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
                .expect(1)
                .mount(&server)
                .await;
        }

        let session = SessionStore::in_memory();
        session.set("tok");
        let sink = RecommendationSink::new(AuthenticatedClient::new(server.uri(), session));

        sink.set_liked("science", true).await.unwrap();
        sink.set_liked("science", false).await.unwrap();
    }
}
