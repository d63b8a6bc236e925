//! 요청 인증 미들웨어.
//!
//! 모든 요청은 이 미들웨어를 통과하며 다음 단계를 거칩니다:
//!
//! 1. 공개 경로면 토큰 처리를 건너뛰고 익명 컨텍스트를 부여
//! 2. `Authorization: Bearer` 헤더에서 토큰 추출
//! 3. 토큰 디코딩 및 서명/만료/발급자/대상 검증
//! 4. 저장된 계정과 대조해 주체(Principal) 확인
//! 5. 컨텍스트를 request extension에 저장하고 정책 평가
//!
//! 2~4단계의 실패는 요청을 즉시 거부하지 않고 익명 컨텍스트로
//! 진행시킵니다. 익명 요청의 최종 허용 여부는 정책 테이블이
//! 결정합니다.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use crate::auth::identity::{resolve_identity, AuthContext, Principal};
use crate::auth::policy::PolicyDecision;
use crate::error::ApiErrorResponse;
use crate::state::AppState;

/// 인증 컨텍스트를 구성하고 접근 정책을 적용하는 미들웨어.
///
/// `axum::middleware::from_fn_with_state`로 라우터에 연결합니다.
pub async fn authenticate_request(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let context = if state.policy.is_public(&method, &path) {
        // 공개 경로는 헤더가 있어도 토큰을 검사하지 않습니다.
        AuthContext::Anonymous
    } else {
        build_context(&state, request.headers()).await
    };

    request.extensions_mut().insert(context.clone());

    match state.policy.decide(&method, &path, &context) {
        PolicyDecision::Permit => next.run(request).await,
        PolicyDecision::DenyUnauthenticated => {
            debug!(method = %method, path = %path, "Rejecting unauthenticated request");
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiErrorResponse::new("Authentication required")),
            )
                .into_response()
        }
        PolicyDecision::DenyForbidden => {
            let subject = context
                .principal()
                .map(|p| p.subject.clone())
                .unwrap_or_default();
            debug!(
                method = %method,
                path = %path,
                subject = %subject,
                "Rejecting request with insufficient authority"
            );
            (
                StatusCode::FORBIDDEN,
                Json(ApiErrorResponse::new("Access denied")),
            )
                .into_response()
        }
    }
}

/// 요청 헤더에서 인증 컨텍스트를 구성합니다.
///
/// 토큰이 없거나 어떤 검증 단계에서든 실패하면 익명 컨텍스트를
/// 반환합니다.
async fn build_context(state: &AppState, headers: &HeaderMap) -> AuthContext {
    let Some(header) = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok()) else {
        return AuthContext::Anonymous;
    };

    let Some(token) = header.strip_prefix("Bearer ") else {
        debug!("Authorization header without Bearer scheme");
        return AuthContext::Anonymous;
    };

    let claims = match state.token_codec.decode(token) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(error = %e, "Token rejected");
            return AuthContext::Anonymous;
        }
    };

    match &state.db_pool {
        Some(pool) => match resolve_identity(pool, &claims).await {
            Ok(principal) => AuthContext::Authenticated(principal),
            Err(e) => {
                debug!(subject = %claims.sub, error = %e, "Identity resolution failed");
                AuthContext::Anonymous
            }
        },
        // 저장소 없이 기동한 구성에서는 검증된 클레임만으로 주체를
        // 구성합니다.
        None => {
            if claims.roles.is_empty() {
                return AuthContext::Anonymous;
            }
            AuthContext::Authenticated(Principal {
                subject: claims.sub.clone(),
                roles: claims.roles.clone(),
                expires_at: claims.expires_at(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::CurrentIdentity;
    use crate::state::create_test_state;
    use axum::{
        body::Body,
        http::Request,
        middleware,
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt;

    async fn whoami(CurrentIdentity(principal): CurrentIdentity) -> String {
        principal.subject
    }

    fn test_app(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/health", get(|| async { "ok" }))
            .route("/api/v1/users/create", post(|| async { "created" }))
            .route("/api/v1/users/getAllUsers", get(|| async { "[]" }))
            .route("/api/v1/whoami", get(whoami))
            .layer(middleware::from_fn_with_state(state, authenticate_request))
    }

    #[tokio::test]
    async fn test_public_route_without_token() {
        let state = Arc::new(create_test_state());
        let app = test_app(state);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_route_without_token_is_unauthorized() {
        let state = Arc::new(create_test_state());
        let app = test_app(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/users/create")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ApiErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(!error.errors.is_empty());
        assert!(!error.timestamp.is_empty());
    }

    #[tokio::test]
    async fn test_user_token_forbidden_on_admin_route() {
        let state = Arc::new(create_test_state());
        let token = state
            .token_codec
            .encode("luna@x.com", &["ROLE_USER".to_string()])
            .unwrap();
        let app = test_app(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/users/create")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_token_permitted_on_admin_route() {
        let state = Arc::new(create_test_state());
        let token = state
            .token_codec
            .encode("admin@x.com", &["ROLE_ADMIN".to_string()])
            .unwrap();
        let app = test_app(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/users/create")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_user_token_permitted_on_read_route() {
        let state = Arc::new(create_test_state());
        let token = state
            .token_codec
            .encode("luna@x.com", &["ROLE_USER".to_string()])
            .unwrap();
        let app = test_app(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/users/getAllUsers")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_expired_token_is_unauthorized() {
        let state = Arc::new(create_test_state());
        let issued_at = chrono::Utc::now() - chrono::Duration::hours(3);
        let token = state
            .token_codec
            .encode_at("luna@x.com", &["ROLE_ADMIN".to_string()], issued_at)
            .unwrap();
        let app = test_app(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/users/create")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        // 만료된 토큰은 익명으로 취급되어 401이 됩니다.
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ApiErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(!error.errors.is_empty());
    }

    #[tokio::test]
    async fn test_tampered_token_is_unauthorized() {
        let state = Arc::new(create_test_state());
        let token = state
            .token_codec
            .encode("admin@x.com", &["ROLE_ADMIN".to_string()])
            .unwrap();

        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        let app = test_app(state);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/users/create")
                    .header("Authorization", format!("Bearer {}", tampered))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_header_without_bearer_scheme_is_anonymous() {
        let state = Arc::new(create_test_state());
        let app = test_app(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/users/create")
                    .header("Authorization", "Basic dXNlcjpwYXNz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_handler_sees_authenticated_principal() {
        let state = Arc::new(create_test_state());
        let token = state
            .token_codec
            .encode("luna@x.com", &["ROLE_USER".to_string()])
            .unwrap();
        let app = test_app(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/whoami")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"luna@x.com");
    }
}
