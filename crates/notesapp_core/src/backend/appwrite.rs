//! Reqwest-backed adapter for the Appwrite REST API.
//!
//! This adapter owns transport details only: URL layout, project header,
//! session cookie, query encoding, and HTTP status mapping. It implements
//! both collaborator ports so one client (and one session cookie) serves the
//! whole app.

use crate::backend::{
    AuthGateway, CollectionRef, DocumentStore, QueryFilter, RemoteError, RemoteErrorKind,
    RemoteResult, SessionTicket,
};
use crate::config::BackendConfig;
use crate::model::identity::Identity;
use crate::model::note::RawDocument;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;

const PROJECT_HEADER: &str = "X-Appwrite-Project";
const PREVIEW_CHAR_LIMIT: usize = 160;

#[derive(Debug, Deserialize)]
struct SessionDto {
    #[serde(rename = "$id")]
    id: String,
    #[serde(rename = "userId")]
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct DocumentListDto {
    documents: Vec<RawDocument>,
}

#[derive(Debug, Deserialize)]
struct ErrorDto {
    message: String,
}

/// Appwrite client implementing [`AuthGateway`] and [`DocumentStore`].
///
/// Cloning is cheap and clones share the cookie store, so an auth clone and a
/// store clone act under the same session.
#[derive(Debug, Clone)]
pub struct AppwriteClient {
    http: Client,
    endpoint: String,
    project_id: String,
}

impl AppwriteClient {
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: &BackendConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .cookie_store(true)
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn documents_path(collection: &CollectionRef) -> String {
        format!(
            "/databases/{}/collections/{}/documents",
            collection.database_id, collection.collection_id
        )
    }

    async fn send(&self, request: RequestBuilder) -> RemoteResult<Vec<u8>> {
        let response = request
            .header(PROJECT_HEADER, self.project_id.as_str())
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        Ok(body.to_vec())
    }

    async fn send_json<T>(&self, request: RequestBuilder) -> RemoteResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let body = self.send(request).await?;
        serde_json::from_slice(&body)
            .map_err(|err| RemoteError::decode(format!("unexpected response payload: {err}")))
    }
}

#[async_trait]
impl AuthGateway for AppwriteClient {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> RemoteResult<Identity> {
        let body = json!({
            "userId": super::unique_id(),
            "email": email,
            "password": password,
            "name": name,
        });
        self.send_json(self.http.post(self.url("/account")).json(&body))
            .await
    }

    async fn create_session(&self, email: &str, password: &str) -> RemoteResult<SessionTicket> {
        let body = json!({ "email": email, "password": password });
        let session: SessionDto = self
            .send_json(
                self.http
                    .post(self.url("/account/sessions/email"))
                    .json(&body),
            )
            .await?;
        Ok(SessionTicket {
            session_id: session.id,
            user_id: session.user_id,
        })
    }

    async fn get_account(&self) -> RemoteResult<Identity> {
        self.send_json(self.http.get(self.url("/account"))).await
    }

    async fn delete_session(&self, session_id: &str) -> RemoteResult<()> {
        let path = format!("/account/sessions/{session_id}");
        self.send(self.http.delete(self.url(&path))).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for AppwriteClient {
    async fn list(
        &self,
        collection: &CollectionRef,
        filters: &[QueryFilter],
    ) -> RemoteResult<Vec<RawDocument>> {
        let queries = encode_queries(filters);
        let request = self
            .http
            .get(self.url(&Self::documents_path(collection)))
            .query(&queries);
        let listed: DocumentListDto = self.send_json(request).await?;
        Ok(listed.documents)
    }

    async fn create(
        &self,
        collection: &CollectionRef,
        document_id: &str,
        fields: &RawDocument,
    ) -> RemoteResult<RawDocument> {
        let body = json!({ "documentId": document_id, "data": fields });
        let request = self
            .http
            .post(self.url(&Self::documents_path(collection)))
            .json(&body);
        self.send_json(request).await
    }

    async fn update(
        &self,
        collection: &CollectionRef,
        document_id: &str,
        fields: &RawDocument,
    ) -> RemoteResult<RawDocument> {
        let path = format!("{}/{document_id}", Self::documents_path(collection));
        let request = self
            .http
            .patch(self.url(&path))
            .json(&json!({ "data": fields }));
        self.send_json(request).await
    }

    async fn delete(&self, collection: &CollectionRef, document_id: &str) -> RemoteResult<()> {
        let path = format!("{}/{document_id}", Self::documents_path(collection));
        self.send(self.http.delete(self.url(&path))).await?;
        Ok(())
    }
}

/// Encodes filters as repeated `queries[]` parameters holding JSON query objects.
fn encode_queries(filters: &[QueryFilter]) -> Vec<(&'static str, String)> {
    filters
        .iter()
        .map(|filter| {
            let query = match filter {
                QueryFilter::Equal { attribute, value } => json!({
                    "method": "equal",
                    "attribute": attribute,
                    "values": [value],
                }),
                QueryFilter::OrderDesc(attribute) => json!({
                    "method": "orderDesc",
                    "attribute": attribute,
                }),
            };
            ("queries[]", query.to_string())
        })
        .collect()
}

fn map_transport_error(error: reqwest::Error) -> RemoteError {
    if error.is_timeout() {
        RemoteError::new(RemoteErrorKind::Timeout, error.to_string())
    } else {
        RemoteError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> RemoteError {
    // Provider messages are shown to users as-is; anything else keeps the status.
    let message = match serde_json::from_slice::<ErrorDto>(body) {
        Ok(dto) if !dto.message.trim().is_empty() => dto.message,
        _ => {
            let preview = body_preview(body);
            if preview.is_empty() {
                format!("status {}", status.as_u16())
            } else {
                format!("status {}: {}", status.as_u16(), preview)
            }
        }
    };

    let kind = match status {
        StatusCode::UNAUTHORIZED => RemoteErrorKind::Unauthorized,
        StatusCode::NOT_FOUND => RemoteErrorKind::NotFound,
        StatusCode::CONFLICT => RemoteErrorKind::Conflict,
        StatusCode::TOO_MANY_REQUESTS => RemoteErrorKind::RateLimited,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => RemoteErrorKind::Timeout,
        _ if status.is_client_error() => RemoteErrorKind::InvalidRequest,
        _ => RemoteErrorKind::Server,
    };
    RemoteError::new(kind, message)
}

fn body_preview(body: &[u8]) -> String {
    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::{body_preview, encode_queries, map_status_error, AppwriteClient};
    use crate::backend::{CollectionRef, QueryFilter, RemoteErrorKind};
    use crate::config::BackendConfig;
    use reqwest::StatusCode;
    use serde_json::Value;

    #[test]
    fn encodes_owner_filter_and_newest_first_sort() {
        let queries = encode_queries(&[
            QueryFilter::equal("userId", "u1"),
            QueryFilter::order_desc("$createdAt"),
        ]);
        assert_eq!(queries.len(), 2);
        assert!(queries.iter().all(|(key, _)| *key == "queries[]"));

        let equal: Value = serde_json::from_str(&queries[0].1).unwrap();
        assert_eq!(equal["method"], "equal");
        assert_eq!(equal["attribute"], "userId");
        assert_eq!(equal["values"][0], "u1");

        let order: Value = serde_json::from_str(&queries[1].1).unwrap();
        assert_eq!(order["method"], "orderDesc");
        assert_eq!(order["attribute"], "$createdAt");
    }

    #[test]
    fn maps_statuses_to_remote_error_kinds() {
        let cases = [
            (StatusCode::UNAUTHORIZED, RemoteErrorKind::Unauthorized),
            (StatusCode::NOT_FOUND, RemoteErrorKind::NotFound),
            (StatusCode::CONFLICT, RemoteErrorKind::Conflict),
            (StatusCode::TOO_MANY_REQUESTS, RemoteErrorKind::RateLimited),
            (StatusCode::GATEWAY_TIMEOUT, RemoteErrorKind::Timeout),
            (StatusCode::BAD_REQUEST, RemoteErrorKind::InvalidRequest),
            (StatusCode::BAD_GATEWAY, RemoteErrorKind::Server),
        ];
        for (status, expected) in cases {
            assert_eq!(map_status_error(status, b"").kind, expected, "{status}");
        }
    }

    #[test]
    fn status_error_prefers_provider_message() {
        let error = map_status_error(
            StatusCode::UNAUTHORIZED,
            br#"{"message":"Invalid credentials.","code":401,"type":"user_invalid_credentials"}"#,
        );
        assert_eq!(error.message, "Invalid credentials.");

        let error = map_status_error(StatusCode::BAD_GATEWAY, b"<html>\n  upstream down\n</html>");
        assert_eq!(error.message, "status 502: <html> upstream down </html>");
    }

    #[test]
    fn body_preview_is_capped() {
        let long = "x".repeat(400);
        let preview = body_preview(long.as_bytes());
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 163);
    }

    #[test]
    fn document_urls_follow_collection_layout() {
        let config = BackendConfig {
            endpoint: "http://localhost/v1/".to_string(),
            ..BackendConfig::default()
        };
        let client = AppwriteClient::new(&config).unwrap();
        let path = AppwriteClient::documents_path(&CollectionRef::new("db", "notes"));
        assert_eq!(
            client.url(&path),
            "http://localhost/v1/databases/db/collections/notes/documents"
        );
    }
}
