//! Envelope-normalizing API client.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use heritage_auth::{IdentityProvider, IdentityRecord};

use crate::config::ClientConfig;
use crate::envelope::{interpret, Envelope, FailureMessages};
use crate::error::ApiError;
use crate::multipart::MultipartPayload;
use crate::query::QueryParams;
use crate::transport::{Method, RequestBody, ReqwestTransport, Transport, TransportRequest};

const CONTENT_TYPE: &str = "Content-Type";
const APPLICATION_JSON: &str = "application/json";

/// Client for the backend's `{success, message, data}` API.
///
/// Every call attaches the signed-in user's id (when there is one) and
/// normalizes failures into [`ApiError`]. Calls are independent: nothing is
/// queued, coalesced or retried.
#[derive(Clone)]
pub struct ApiClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    identity: Arc<dyn IdentityProvider>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            config,
            transport,
            identity,
        }
    }

    /// Client over `reqwest` with a default connection pool.
    pub fn with_reqwest(config: ClientConfig, identity: Arc<dyn IdentityProvider>) -> Self {
        Self::new(config, Arc::new(ReqwestTransport::new()), identity)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The identity requests are currently sent as.
    pub fn current_user(&self) -> Option<IdentityRecord> {
        self.identity.identity()
    }

    pub async fn get(&self, url: &str, params: &QueryParams) -> Result<Envelope, ApiError> {
        let url = params.append_to(url);
        self.request(Method::Get, &url, RequestBody::Empty).await
    }

    /// GET and deserialize the envelope's `data`.
    pub async fn get_data<T: DeserializeOwned>(&self, url: &str, params: &QueryParams) -> Result<T, ApiError> {
        self.get(url, params).await?.data_as()
    }

    pub async fn post<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<Envelope, ApiError> {
        let body = json_body(body)?;
        self.request(Method::Post, url, body).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<Envelope, ApiError> {
        let body = json_body(body)?;
        self.request(Method::Put, url, body).await
    }

    pub async fn del(&self, url: &str) -> Result<Envelope, ApiError> {
        self.request(Method::Delete, url, RequestBody::Empty).await
    }

    /// Multipart POST. No content type is set here; the transport supplies
    /// one carrying its boundary.
    pub async fn upload(&self, url: &str, payload: MultipartPayload) -> Result<Envelope, ApiError> {
        let request = TransportRequest {
            method: Method::Post,
            url: self.config.resolve(url),
            headers: self.identity_headers(),
            body: RequestBody::Multipart(payload),
        };
        self.dispatch(request, FailureMessages::UPLOAD).await
    }

    async fn request(&self, method: Method, url: &str, body: RequestBody) -> Result<Envelope, ApiError> {
        let mut headers = vec![(CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string())];
        headers.extend(self.identity_headers());

        let request = TransportRequest {
            method,
            url: self.config.resolve(url),
            headers,
            body,
        };
        self.dispatch(request, FailureMessages::REQUEST).await
    }

    fn identity_headers(&self) -> Vec<(String, String)> {
        match self.identity.identity() {
            Some(identity) => vec![(self.config.identity_header.clone(), identity.id.to_string())],
            None => Vec::new(),
        }
    }

    async fn dispatch(&self, request: TransportRequest, messages: FailureMessages) -> Result<Envelope, ApiError> {
        let method = request.method;
        let url = request.url.clone();
        tracing::debug!(%method, %url, signed_in = request.header(&self.config.identity_header).is_some(), "sending request");

        let response = self.transport.send(request).await.map_err(|err| {
            tracing::warn!(%method, %url, error = %err, "transport failed");
            ApiError::from(err)
        })?;

        interpret(&response, messages).inspect_err(|err| {
            tracing::warn!(%method, %url, status = response.status, message = %err, "request failed");
        })
    }
}

fn json_body<B: Serialize + ?Sized>(body: &B) -> Result<RequestBody, ApiError> {
    serde_json::to_vec(body)
        .map(RequestBody::Json)
        .map_err(|e| ApiError::new(format!("failed to serialize request body: {e}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use heritage_auth::{IdentityStore, Role, StaticIdentity};
    use heritage_core::UserId;

    use super::*;
    use crate::error::TransportError;
    use crate::transport::TransportResponse;

    /// Records every request and answers with a canned response.
    struct RecordingTransport {
        status: u16,
        body: String,
        seen: Mutex<Vec<TransportRequest>>,
    }

    impl RecordingTransport {
        fn answering(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                status,
                body: body.to_string(),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn last(&self) -> TransportRequest {
            self.seen.lock().unwrap().last().cloned().expect("no request sent")
        }

        fn count(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            Ok(TransportResponse::new(self.status, self.body.as_bytes().to_vec()))
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        async fn send(&self, _request: TransportRequest) -> Result<TransportResponse, TransportError> {
            Err(TransportError::Network("connection refused".into()))
        }
    }

    const OK: &str = r#"{"success": true, "data": {"id": 7}}"#;

    fn signed_in(id: i64) -> Arc<StaticIdentity> {
        Arc::new(StaticIdentity::signed_in(IdentityRecord::new(UserId::from(id), Role::Standard)))
    }

    fn client(transport: Arc<dyn Transport>, identity: Arc<dyn IdentityProvider>) -> ApiClient {
        ApiClient::new(ClientConfig::new("").unwrap(), transport, identity)
    }

    #[tokio::test]
    async fn get_serializes_params_into_url() {
        let transport = RecordingTransport::answering(200, OK);
        let api = client(transport.clone(), Arc::new(StaticIdentity::anonymous()));

        let params = QueryParams::new().with("a", "1").with("b", "two");
        api.get("/x", &params).await.unwrap();

        let sent = transport.last();
        assert_eq!(sent.method, Method::Get);
        assert_eq!(sent.url, "/x?a=1&b=two");
        assert_eq!(sent.body, RequestBody::Empty);
    }

    #[tokio::test]
    async fn get_returns_envelope_unmodified() {
        let transport = RecordingTransport::answering(200, OK);
        let api = client(transport, Arc::new(StaticIdentity::anonymous()));

        let env = api.get("/x", &QueryParams::new()).await.unwrap();
        assert_eq!(env.data, json!({"id": 7}));
        assert!(env.success);
    }

    #[tokio::test]
    async fn business_failure_on_every_verb() {
        let transport = RecordingTransport::answering(200, r#"{"success": false, "message": "bad input"}"#);
        let api = client(transport.clone(), Arc::new(StaticIdentity::anonymous()));

        let results = [
            api.get("/x", &QueryParams::new()).await,
            api.post("/x", &json!({})).await,
            api.put("/x", &json!({})).await,
            api.del("/x").await,
            api.upload("/x", MultipartPayload::new().text("k", "v")).await,
        ];
        for result in results {
            assert_eq!(result.unwrap_err().message(), "bad input");
        }
        assert_eq!(transport.count(), 5);
    }

    #[tokio::test]
    async fn identity_header_present_only_when_signed_in() {
        let transport = RecordingTransport::answering(200, OK);

        client(transport.clone(), signed_in(42)).del("/x/1").await.unwrap();
        assert_eq!(transport.last().header("X-User-Id"), Some("42"));

        client(transport.clone(), Arc::new(StaticIdentity::anonymous()))
            .del("/x/1")
            .await
            .unwrap();
        assert_eq!(transport.last().header("X-User-Id"), None);
    }

    #[tokio::test]
    async fn header_uses_persistent_fallback_identity() {
        let store = IdentityStore::in_memory();
        store
            .persistent_scope()
            .set(heritage_auth::IDENTITY_KEY, r#"{"id": "u-9", "role": "管理员"}"#)
            .unwrap();
        let transport = RecordingTransport::answering(200, OK);
        let api = client(transport.clone(), Arc::new(store.fallback_provider()));

        api.get("/x", &QueryParams::new()).await.unwrap();
        assert_eq!(transport.last().header("x-user-id"), Some("u-9"));
        assert_eq!(api.current_user().unwrap().role, Role::Admin);
    }

    #[tokio::test]
    async fn corrupt_stored_identity_sends_anonymous_request() {
        let store = IdentityStore::in_memory();
        store.session_scope().set(heritage_auth::IDENTITY_KEY, "not json").unwrap();
        let transport = RecordingTransport::answering(200, OK);
        let api = client(transport.clone(), Arc::new(store.fallback_provider()));

        api.get("/x", &QueryParams::new()).await.unwrap();
        assert_eq!(transport.last().header("X-User-Id"), None);
    }

    #[tokio::test]
    async fn mutating_verbs_send_json_with_content_type() {
        let transport = RecordingTransport::answering(200, OK);
        let api = client(transport.clone(), signed_in(1));

        api.post("/api/comments", &json!({"content": "精美"})).await.unwrap();
        let sent = transport.last();
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.header("content-type"), Some("application/json"));
        let RequestBody::Json(bytes) = sent.body else {
            panic!("expected json body");
        };
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"content": "精美"}));

        api.put("/api/profile", &json!({"signature": "hi"})).await.unwrap();
        assert_eq!(transport.last().method, Method::Put);
    }

    #[tokio::test]
    async fn upload_is_post_without_content_type() {
        let transport = RecordingTransport::answering(200, OK);
        let api = client(transport.clone(), signed_in(5));

        let payload = MultipartPayload::new().file("file", "a.png", vec![0u8; 4], Some("image/png"));
        api.upload("/api/upload", payload.clone()).await.unwrap();

        let sent = transport.last();
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.header("Content-Type"), None);
        assert_eq!(sent.header("X-User-Id"), Some("5"));
        assert_eq!(sent.body, RequestBody::Multipart(payload));
    }

    #[tokio::test]
    async fn upload_failure_uses_upload_message() {
        let transport = RecordingTransport::answering(413, "Payload Too Large");
        let api = client(transport, signed_in(5));
        let err = api.upload("/api/upload", MultipartPayload::new()).await.unwrap_err();
        assert_eq!(err.message(), "upload failed");
    }

    #[tokio::test]
    async fn non_success_status_extracts_message() {
        let transport = RecordingTransport::answering(401, r#"{"success": false, "message": "用户不存在"}"#);
        let api = client(transport, Arc::new(StaticIdentity::anonymous()));
        let err = api.post("/api/auth/login", &json!({"account": "x"})).await.unwrap_err();
        assert_eq!(err.to_string(), "用户不存在");
    }

    #[tokio::test]
    async fn transport_failure_is_an_api_error() {
        let api = client(Arc::new(FailingTransport), Arc::new(StaticIdentity::anonymous()));
        let err = api.get("/x", &QueryParams::new()).await.unwrap_err();
        assert_eq!(err.message(), "network error: connection refused");
    }

    #[tokio::test]
    async fn relative_urls_are_joined_to_base() {
        let transport = RecordingTransport::answering(200, OK);
        let config = ClientConfig::new("http://backend:8080").unwrap();
        let api = ApiClient::new(config, transport.clone(), Arc::new(StaticIdentity::anonymous()));

        api.get("/api/search", &QueryParams::from([("keyword", "瓷")])).await.unwrap();
        assert_eq!(transport.last().url, "http://backend:8080/api/search?keyword=%E7%93%B7");
    }

    #[tokio::test]
    async fn typed_data_helper() {
        #[derive(serde::Deserialize)]
        struct Created {
            id: u64,
        }
        let transport = RecordingTransport::answering(200, OK);
        let api = client(transport, Arc::new(StaticIdentity::anonymous()));
        let created: Created = api.get_data("/x", &QueryParams::new()).await.unwrap();
        assert_eq!(created.id, 7);
    }
}
