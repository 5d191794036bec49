//! Authenticated HTTP pipeline.
//!
//! [`AuthenticatedClient`] is the only place that talks to the backend.  It
//! reads the token from [`SessionStore`] for every request, attaches it as a
//! bearer credential, and turns a `401 Unauthorized` into a global session
//! clear plus [`ClientError::Auth`].  Every other failure stays local to the
//! caller.

use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::SessionStore;

/// Failures surfaced by [`AuthenticatedClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The backend rejected the credential.  The session has already been
    /// cleared by the time the caller sees this.
    #[error("not authorized")]
    Auth,

    /// Any other non-success status.
    #[error("request failed ({status}): {}", .message.as_deref().unwrap_or("no details"))]
    Request {
        status: StatusCode,
        message: Option<String>,
    },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A success response whose body did not match the expected shape.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth)
    }

    /// The server-provided message, if there was one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Request { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// Shape of the backend's error bodies (`{"code": 16, "message": "..."}`).
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
}

/// HTTP client bound to one backend and one session.
///
/// Cheap to clone; clones share the connection pool and the session.
#[derive(Clone, Debug)]
pub struct AuthenticatedClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
}

impl AuthenticatedClient {
    pub fn new(base_url: impl Into<String>, session: SessionStore) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one request and classify the response.
    ///
    /// The token is read when the request is built; a request already in
    /// flight keeps the credential it was dispatched with.
    pub async fn request<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, ClientError>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.http.request(method.clone(), &url);
        if let Some(token) = self.session.get() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.inspect_err(|e| {
            tracing::debug!(%method, path, error = %e, "transport failure");
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            let cleared = self.session.clear();
            tracing::warn!(%method, path, cleared, "authorization rejected");
            return Err(ClientError::Auth);
        }

        let message = response
            .bytes()
            .await
            .ok()
            .and_then(|bytes| serde_json::from_slice::<ErrorBody>(&bytes).ok())
            .and_then(|body| body.message);
        tracing::debug!(%method, path, %status, ?message, "request failed");
        Err(ClientError::Request { status, message })
    }

    /// `GET path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.request::<()>(Method::GET, path, None).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// `POST path` with a JSON body, discarding the response body.
    pub async fn post_json<B>(&self, path: &str, body: &B) -> Result<(), ClientError>
    where
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, Some(body)).await?;
        Ok(())
    }

    // -- auth endpoints ------------------------------------------------------

    /// Exchange credentials for an access token and store it in the session.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let response = self
            .request(Method::POST, "/auth/login", Some(&Credentials { username, password }))
            .await?;
        let bytes = response.bytes().await?;
        let LoginResponse { access_token } = serde_json::from_slice(&bytes)?;
        self.session.set(access_token);
        Ok(())
    }

    /// Create an account.  Does not sign in.
    pub async fn register(&self, username: &str, password: &str) -> Result<(), ClientError> {
        self.post_json("/auth/register", &Credentials { username, password })
            .await
    }

    /// Forget the local session.
    pub fn logout(&self) {
        self.session.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, token: Option<&str>) -> AuthenticatedClient {
        let session = SessionStore::in_memory();
        if let Some(token) = token {
            session.set(token);
        }
        AuthenticatedClient::new(server.uri(), session)
    }

    #[tokio::test]
    async fn attaches_bearer_token_when_present() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/story/fact"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("secret"));
        let value: serde_json::Value = client.get_json("/story/fact").await.unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn omits_authorization_header_when_anonymous() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/story/fact"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let _: serde_json::Value = client.get_json("/story/fact").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn token_is_read_per_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let _: serde_json::Value = client.get_json("/a").await.unwrap();
        client.session().set("later");
        let _: serde_json::Value = client.get_json("/b").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert!(!requests[0].headers.contains_key("authorization"));
        assert_eq!(requests[1].headers["authorization"], "Bearer later");
    }

    #[tokio::test]
    async fn unauthorized_clears_session_and_returns_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/story/fact"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("stale"));
        let mut changes = client.session().subscribe();

        let err = client.get_json::<serde_json::Value>("/story/fact").await.unwrap_err();
        assert!(err.is_auth());
        assert!(client.session().get().is_none());
        assert!(changes.has_changed().unwrap());
    }

    #[tokio::test]
    async fn concurrent_unauthorized_responses_clear_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("stale"));
        let mut changes = client.session().subscribe();

        let (a, b, c) = tokio::join!(
            client.get_json::<serde_json::Value>("/a"),
            client.get_json::<serde_json::Value>("/b"),
            client.get_json::<serde_json::Value>("/c"),
        );
        assert!(a.unwrap_err().is_auth());
        assert!(b.unwrap_err().is_auth());
        assert!(c.unwrap_err().is_auth());

        // Exactly one transition: Some -> None.
        assert!(changes.has_changed().unwrap());
        changes.borrow_and_update();
        assert!(!changes.has_changed().unwrap());
    }

    #[tokio::test]
    async fn other_statuses_surface_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/recommendations/like"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({"code": 13, "message": "internal server error"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Some("tok"));
        let err = client
            .post_json("/recommendations/like", &serde_json::json!({"category": "history"}))
            .await
            .unwrap_err();

        match &err {
            ClientError::Request { status, message } => {
                assert_eq!(*status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(message.as_deref(), Some("internal server error"));
            }
            other => panic!("expected Request error, got {other:?}"),
        }
        assert_eq!(client.session().get().as_deref(), Some("tok"), "non-401 keeps the session");
    }

    #[tokio::test]
    async fn request_error_without_json_body_has_no_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let err = client.get_json::<serde_json::Value>("/missing").await.unwrap_err();
        assert!(err.server_message().is_none());
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn malformed_success_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let err = client.get_json::<serde_json::Value>("/story/fact").await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() {
        // Bind then drop a listener so the port is closed.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = AuthenticatedClient::new(format!("http://127.0.0.1:{port}"), SessionStore::in_memory());

        let err = client.get_json::<serde_json::Value>("/story/fact").await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }

    // -- auth endpoints ------------------------------------------------------

    #[tokio::test]
    async fn login_stores_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(serde_json::json!({"username": "ada", "password": "hunter22"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"accessToken": "fresh"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        client.login("ada", "hunter22").await.unwrap();
        assert_eq!(client.session().get().as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn failed_login_leaves_session_anonymous() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(serde_json::json!({"message": "invalid credentials"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let err = client.login("ada", "wrong").await.unwrap_err();
        assert_eq!(err.server_message(), Some("invalid credentials"));
        assert!(client.session().get().is_none());
    }

    #[tokio::test]
    async fn register_does_not_sign_in() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/register"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        client.register("ada", "hunter22").await.unwrap();
        assert!(client.session().get().is_none());
    }

    #[tokio::test]
    async fn logout_clears_session() {
        let server = MockServer::start().await;
        let client = client_for(&server, Some("tok"));
        client.logout();
        assert!(client.session().get().is_none());
    }

    #[test]
    fn trailing_slash_in_base_url_is_trimmed() {
        let client = AuthenticatedClient::new("http://localhost:8080/", SessionStore::in_memory());
        assert_eq!(client.base_url(), "http://localhost:8080");
    }
}
