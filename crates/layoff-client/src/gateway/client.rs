use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::Instrument;

use super::request::{ApiRequest, QueryParams};
use super::response::{decode, decode_unit, failure_from_transport, ApiFailure};
use super::transport::{RawResponse, Transport};
use crate::session::SessionStore;

/// Authenticated API access for the domain stores.
///
/// Reads the bearer token from the session on every call and tears the
/// session down when the server answers 401. Never retries.
pub struct HttpGateway {
    transport: Arc<dyn Transport>,
    session: Arc<SessionStore>,
}

impl HttpGateway {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<SessionStore>) -> Self {
        Self { transport, session }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: impl Into<String>,
        query: QueryParams,
    ) -> Result<T, ApiFailure> {
        self.send(ApiRequest::get(path).with_query(query)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: impl Into<String>,
        body: &B,
    ) -> Result<T, ApiFailure> {
        self.send(ApiRequest::post(path).with_json(body)?).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: impl Into<String>,
        body: &B,
    ) -> Result<T, ApiFailure> {
        self.send(ApiRequest::put(path).with_json(body)?).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: impl Into<String>,
        body: &B,
    ) -> Result<T, ApiFailure> {
        self.send(ApiRequest::patch(path).with_json(body)?).await
    }

    /// DELETE whose response body is ignored.
    pub async fn delete(&self, path: impl Into<String>) -> Result<(), ApiFailure> {
        self.send_unit(ApiRequest::delete(path)).await
    }

    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiFailure> {
        let raw = self.dispatch(request).await?;
        decode(&raw)
    }

    pub async fn send_unit(&self, request: ApiRequest) -> Result<(), ApiFailure> {
        let raw = self.dispatch(request).await?;
        decode_unit(&raw)
    }

    async fn dispatch(&self, request: ApiRequest) -> Result<RawResponse, ApiFailure> {
        if let Err(e) = self.session.ensure_fresh().await {
            log::debug!("Session not fresh before request: {}", e);
        }
        let bearer = self.session.access_token();
        let request = request.with_bearer(bearer.clone());

        let span = tracing::info_span!(
            "api_request",
            method = %request.method,
            path = %request.path,
            request_id = %uuid::Uuid::new_v4(),
        );

        async move {
            log::debug!("Sending request (authenticated: {})", bearer.is_some());

            let raw = match self.transport.execute(request).await {
                Ok(raw) => raw,
                Err(e) => return Err(failure_from_transport(&e)),
            };

            if raw.status == 401 {
                log::warn!("Server answered 401");
                self.session.expire_unauthorized(bearer.as_ref());
                return Err(ApiFailure::session_expired());
            }

            log::debug!("Response status {}", raw.status);
            Ok(raw)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{endpoints, FailureKind, Method, TransportError, NETWORK_STATUS};
    use crate::session::SessionStatus;
    use crate::storage::{KeyValueStore, MemoryStorage, ACCESS_TOKEN_KEY, USER_KEY};
    use crate::testing::{restored_session, seed_session, ManualClock, MockTransport};

    struct Fixture {
        transport: Arc<MockTransport>,
        storage: Arc<MemoryStorage>,
        session: Arc<SessionStore>,
        gateway: HttpGateway,
    }

    fn fixture(seeded: bool) -> Fixture {
        let transport = Arc::new(MockTransport::new());
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::default());
        if seeded {
            seed_session(&storage, &clock, "T1");
        }
        let session = restored_session(transport.clone(), storage.clone(), clock);
        let gateway = HttpGateway::new(transport.clone(), session.clone());
        Fixture {
            transport,
            storage,
            session,
            gateway,
        }
    }

    #[tokio::test]
    async fn test_attaches_current_token() {
        let fx = fixture(true);
        fx.transport.respond(Method::Get, "/jobs/j1", 200, "null");

        let _: Option<u32> = fx.gateway.get("/jobs/j1", QueryParams::new()).await.unwrap();

        let sent = fx.transport.last_request(Method::Get, "/jobs/j1").unwrap();
        assert_eq!(sent.bearer.unwrap().expose(), "T1");
    }

    #[tokio::test]
    async fn test_anonymous_request_has_no_token() {
        let fx = fixture(false);
        fx.transport.respond(Method::Get, endpoints::JOBS, 200, "[]");

        let _: Vec<u32> = fx
            .gateway
            .get(endpoints::JOBS, QueryParams::new())
            .await
            .unwrap();

        let sent = fx.transport.last_request(Method::Get, endpoints::JOBS).unwrap();
        assert!(sent.bearer.is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_tears_session_down() {
        let fx = fixture(true);
        fx.transport.respond(
            Method::Get,
            endpoints::DASHBOARD,
            401,
            r#"{"message":"jwt expired"}"#,
        );

        let failure = fx
            .gateway
            .get::<serde_json::Value>(endpoints::DASHBOARD, QueryParams::new())
            .await
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::SessionExpired);
        assert_eq!(failure.status_code, 401);
        assert_eq!(fx.session.status(), SessionStatus::Failed);
        assert!(fx.session.access_token().is_none());
        assert!(fx.storage.get(ACCESS_TOKEN_KEY).unwrap().is_none());
        assert!(fx.storage.get(USER_KEY).unwrap().is_none());
        assert_eq!(fx.transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_network_failure_uses_sentinel() {
        let fx = fixture(true);
        fx.transport
            .fail(Method::Delete, "/goals/g1", TransportError::Unreachable("refused".into()));

        let failure = fx.gateway.delete("/goals/g1").await.unwrap_err();

        assert_eq!(failure.status_code, NETWORK_STATUS);
        assert_eq!(failure.kind, FailureKind::Unreachable);
        assert!(fx.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_server_rejection_keeps_session() {
        let fx = fixture(true);
        fx.transport.respond(
            Method::Patch,
            "/applications/a1",
            422,
            r#"{"message":"Invalid status"}"#,
        );

        let failure = fx
            .gateway
            .patch::<serde_json::Value, _>("/applications/a1", &serde_json::json!({"status": "x"}))
            .await
            .unwrap_err();

        assert_eq!(failure.message, "Invalid status");
        assert_eq!(failure.status_code, 422);
        assert!(fx.session.is_authenticated());
    }
}
