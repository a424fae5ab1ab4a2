//! Request handling for the auth subrequest endpoint.
//!
//! A fronting proxy forwards each protected request here (for nginx, via
//! `auth_request`) with the client's `Cookie` header and the claim headers
//! it derived from a validated JWT. The status code is the whole answer:
//! 2xx lets the request through, 401 turns it away, and 5xx signals that
//! the gatekeeper itself could not decide.

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode, header};
use http_body_util::Full;
use std::sync::Arc;
use tracing::{Instrument, Span, error, field, info_span, warn};
use turnstile_session::{Claims, CookieSettings, Decision};

use crate::config::ClaimHeaders;
use crate::state::AppState;

/// Response body type; every response here is empty or a short literal.
pub type Body = Full<Bytes>;

/// Store liveness probe.
pub const HEALTH_PATH: &str = "/healthz";

/// Answer one request.
///
/// `GET /healthz` probes the session store; any other request is a session
/// check. The request body is never read.
pub async fn handle_request<B>(req: Request<B>, state: Arc<AppState>) -> Response<Body> {
    let (parts, _body) = req.into_parts();

    let span = info_span!(
        "request",
        method = %parts.method,
        path = %parts.uri.path(),
        decision = field::Empty,
        status = field::Empty,
    );

    async move {
        let response = if parts.method == Method::GET && parts.uri.path() == HEALTH_PATH {
            health(&state).await
        } else {
            check_session(&parts, &state).await
        };

        Span::current().record("status", response.status().as_u16());
        response
    }
    .instrument(span)
    .await
}

async fn health(state: &AppState) -> Response<Body> {
    match state.engine.store().ping().await {
        Ok(()) => text(StatusCode::OK, "ok"),
        Err(e) => {
            warn!(error = %e, "Session store health check failed");
            text(StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    }
}

async fn check_session(parts: &Parts, state: &AppState) -> Response<Body> {
    let cookie = session_cookie(&parts.headers, &state.cookie);
    let claims = claims(&parts.headers, &state.claim_headers);

    match state.engine.decide(cookie, Some(&claims)).await {
        Ok(decision) => {
            Span::current().record("decision", decision.label());
            render(&decision, &state.cookie)
        }
        Err(e) => {
            error!(error = %e, "Session check failed");
            let status =
                StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            empty(status)
        }
    }
}

/// The session cookie across every `Cookie` header on the request.
fn session_cookie<'a>(headers: &'a HeaderMap, settings: &CookieSettings) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| settings.find(value))
}

fn claims(headers: &HeaderMap, names: &ClaimHeaders) -> Claims {
    Claims::from_parts(
        claim(headers, &names.subject),
        claim(headers, &names.audience),
    )
}

fn claim(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(String::from)
}

fn render(decision: &Decision, cookie: &CookieSettings) -> Response<Body> {
    match decision {
        Decision::Admit => empty(StatusCode::OK),
        Decision::AdmitNewSession { sid, .. } => {
            match HeaderValue::from_str(&cookie.set_cookie(sid)) {
                Ok(value) => {
                    let mut response = empty(StatusCode::OK);
                    response.headers_mut().insert(header::SET_COOKIE, value);
                    response
                }
                Err(_) => {
                    error!("Session cookie is not a valid header value");
                    empty(StatusCode::INTERNAL_SERVER_ERROR)
                }
            }
        }
        Decision::Deny | Decision::RejectExpired => empty(StatusCode::UNAUTHORIZED),
    }
}

fn empty(status: StatusCode) -> Response<Body> {
    response(status, Bytes::new())
}

fn text(status: StatusCode, body: &'static str) -> Response<Body> {
    let mut response = response(status, Bytes::from_static(body.as_bytes()));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

fn response(status: StatusCode, body: Bytes) -> Response<Body> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use std::time::Duration;
    use turnstile_session::testing::{FailingTokenGenerator, InstrumentedStore};
    use turnstile_session::{
        SessionEngine, SessionId, SessionRecord, SessionStore, StoreError, generate_session_id,
    };

    fn state(store: Arc<InstrumentedStore>) -> Arc<AppState> {
        Arc::new(AppState::with_store(store, &ServerConfig::default()))
    }

    fn request() -> http::request::Builder {
        Request::builder().method(Method::GET).uri("/protected/report")
    }

    fn set_cookie(response: &Response<Body>) -> Option<&str> {
        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn test_claims_issue_a_cookie() {
        let store = Arc::new(InstrumentedStore::new());
        let req = request()
            .header("X-Jwt-Claim-Sub", "alice")
            .header("X-Jwt-Claim-Aud", "teamA")
            .body(())
            .unwrap();

        let response = handle_request(req, state(store.clone())).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");

        let cookie = set_cookie(&response).unwrap();
        let sid = cookie
            .strip_prefix("sessionid=")
            .and_then(|rest| rest.strip_suffix("; Path=/; Secure; HttpOnly"))
            .unwrap();
        assert_eq!(sid.len(), 32);
        assert!(sid.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(store.inner().len(), 1);
    }

    #[tokio::test]
    async fn test_live_cookie_is_admitted_without_new_cookie() {
        let store = Arc::new(InstrumentedStore::new());
        let sid = generate_session_id().unwrap();
        store
            .inner()
            .set_with_ttl(&sid, &SessionRecord::new("alice", "teamA"), Duration::from_secs(60))
            .await
            .unwrap();

        let req = request()
            .header(header::COOKIE, format!("theme=dark; sessionid={}", sid))
            .body(())
            .unwrap();

        let response = handle_request(req, state(store)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie(&response).is_none());
    }

    #[tokio::test]
    async fn test_cookie_found_in_second_cookie_header() {
        let store = Arc::new(InstrumentedStore::new());
        let sid = generate_session_id().unwrap();
        store
            .inner()
            .set_with_ttl(&sid, &SessionRecord::new("alice", "teamA"), Duration::from_secs(60))
            .await
            .unwrap();

        let req = request()
            .header(header::COOKIE, "theme=dark")
            .header(header::COOKIE, format!("sessionid={}", sid))
            .body(())
            .unwrap();

        let response = handle_request(req, state(store)).await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_cookie_is_unauthorized() {
        let store = Arc::new(InstrumentedStore::new());
        let req = request()
            .header(header::COOKIE, "sessionid=abc123")
            .header("X-Jwt-Claim-Sub", "alice")
            .header("X-Jwt-Claim-Aud", "teamA")
            .body(())
            .unwrap();

        let response = handle_request(req, state(store.clone())).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(set_cookie(&response).is_none());
        assert!(store.inner().is_empty());
    }

    #[tokio::test]
    async fn test_missing_claims_are_unauthorized() {
        let store = Arc::new(InstrumentedStore::new());
        let req = request()
            .header("X-Jwt-Claim-Sub", "alice")
            .header("X-Jwt-Claim-Aud", "")
            .body(())
            .unwrap();

        let response = handle_request(req, state(store.clone())).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_claim_values_are_stored_verbatim() {
        let store = Arc::new(InstrumentedStore::new());
        let req = request()
            .header("X-Jwt-Claim-Sub", " alice ")
            .header("X-Jwt-Claim-Aud", "team A")
            .body(())
            .unwrap();

        let response = handle_request(req, state(store.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);

        let sid = set_cookie(&response)
            .and_then(|c| c.strip_prefix("sessionid="))
            .and_then(|rest| rest.split(';').next())
            .and_then(SessionId::parse)
            .unwrap();
        assert_eq!(
            store.get(&sid).await.unwrap(),
            Some(SessionRecord::new(" alice ", "team A"))
        );
    }

    #[tokio::test]
    async fn test_store_outage_is_service_unavailable() {
        let store = Arc::new(InstrumentedStore::new().fail_reads(StoreError::Timeout));
        let sid = generate_session_id().unwrap();
        let req = request()
            .header(header::COOKIE, format!("sessionid={}", sid))
            .body(())
            .unwrap();

        let response = handle_request(req, state(store)).await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_failed_write_is_internal_error_without_cookie() {
        let store = Arc::new(
            InstrumentedStore::new().fail_writes(StoreError::Command("READONLY".into())),
        );
        let req = request()
            .header("X-Jwt-Claim-Sub", "alice")
            .header("X-Jwt-Claim-Aud", "teamA")
            .body(())
            .unwrap();

        let response = handle_request(req, state(store)).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(set_cookie(&response).is_none());
    }

    #[tokio::test]
    async fn test_token_failure_is_internal_error_without_cookie() {
        let store = Arc::new(InstrumentedStore::new());
        let config = ServerConfig::default();
        let engine = SessionEngine::from_config(store.clone(), &config.session)
            .with_generator(Arc::new(FailingTokenGenerator));
        let state = Arc::new(AppState::new(
            engine,
            config.session.cookie.clone(),
            config.claims.clone(),
        ));

        let req = request()
            .header("X-Jwt-Claim-Sub", "alice")
            .header("X-Jwt-Claim-Aud", "teamA")
            .body(())
            .unwrap();

        let response = handle_request(req, state).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(set_cookie(&response).is_none());
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_custom_claim_headers() {
        let store = Arc::new(InstrumentedStore::new());
        let mut config = ServerConfig::default();
        config.claims.subject = "X-Remote-User".into();
        config.claims.audience = "X-Remote-Dir".into();
        let state = Arc::new(AppState::with_store(store.clone(), &config));

        let req = request()
            .header("x-remote-user", "alice")
            .header("x-remote-dir", "teamA")
            .body(())
            .unwrap();

        let response = handle_request(req, state).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie(&response).is_some());
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = handle_request(
            Request::get(HEALTH_PATH).body(()).unwrap(),
            state(Arc::new(InstrumentedStore::new())),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = handle_request(
            Request::get(HEALTH_PATH).body(()).unwrap(),
            state(Arc::new(
                InstrumentedStore::new().fail_reads(StoreError::Connection("refused".into())),
            )),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
