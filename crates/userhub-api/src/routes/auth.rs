//! 인증 API 라우트.
//!
//! 로그인과 회원 가입 엔드포인트를 제공합니다. 이 경로들은 공개
//! 경로로 등록되어 토큰 없이 호출할 수 있습니다.
//!
//! # 엔드포인트
//!
//! - `POST /api/v1/auth/login` - 자격 증명 확인 후 토큰 발급
//! - `POST /api/v1/auth/register` - 새 계정 등록 후 토큰 발급

use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use userhub_core::Phone;

use crate::auth::{verify_credentials, CredentialError};
use crate::error::{error_response, ApiErrorResponse, ApiResult};
use crate::repository::UserRepository;
use crate::routes::users::{create_account, CreateUserRequest, MessageResponse};
use crate::state::AppState;

// ==================== Request/Response 타입 ====================

/// 로그인 요청.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// 계정 이메일
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
    /// 비밀번호 (평문, TLS 전제)
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// 인증 성공 응답.
///
/// 발급된 토큰과 계정 요약을 담습니다.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthenticationResult {
    /// 계정 ID
    pub id: Uuid,
    /// 표시 이름
    pub name: String,
    /// 계정 이메일
    pub email: String,
    /// 부여된 역할 목록
    pub roles: Vec<String>,
    /// 전화번호 목록
    pub phones: Vec<Phone>,
    /// 발급된 JWT
    pub token: String,
}

// ==================== 핸들러 ====================

/// 로그인.
///
/// 이메일/비밀번호를 확인하고 JWT를 발급합니다. 실패 사유는 계정
/// 존재 여부와 무관하게 같은 메시지로 응답합니다.
///
/// POST /api/v1/auth/login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "로그인 성공", body = MessageResponse<AuthenticationResult>),
        (status = 400, description = "요청 형식 오류", body = ApiErrorResponse),
        (status = 401, description = "자격 증명 불일치", body = ApiErrorResponse),
        (status = 500, description = "서버 오류", body = ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<MessageResponse<AuthenticationResult>>> {
    request.validate().map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiErrorResponse::from_validation(&e)),
        )
    })?;

    let pool = state.db_pool.as_ref().ok_or_else(|| {
        error!("Database not available");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database not available")
    })?;

    let user = verify_credentials(pool, &request.email, &request.password)
        .await
        .map_err(|e| match e {
            CredentialError::InvalidCredentials => {
                error_response(StatusCode::UNAUTHORIZED, "Invalid email or password")
            }
            CredentialError::Database(e) => {
                error!(error = %e, "Credential lookup failed");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
            }
        })?;

    let token = state
        .token_codec
        .encode(&user.email, &user.roles)
        .map_err(|e| {
            error!(error = %e, "Token issuance failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Token issuance failed")
        })?;

    UserRepository::record_login(pool, &user.email, &token)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to record login");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        })?;

    info!(email = %user.email, "User logged in");

    Ok(Json(MessageResponse::new(
        "Login successful",
        AuthenticationResult {
            id: user.id,
            name: user.name,
            email: user.email,
            roles: user.roles,
            phones: user.phones,
            token,
        },
    )))
}

/// 회원 가입.
///
/// 계정 생성 공통 경로를 거친 뒤 토큰을 발급해 저장합니다. 역할을
/// 지정하지 않으면 ROLE_USER가 부여됩니다.
///
/// POST /api/v1/auth/register
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "가입 성공", body = MessageResponse<AuthenticationResult>),
        (status = 400, description = "요청 형식 오류", body = ApiErrorResponse),
        (status = 409, description = "이메일 중복", body = ApiErrorResponse),
        (status = 500, description = "서버 오류", body = ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse<AuthenticationResult>>)> {
    let created = create_account(&state, request).await?;

    let token = state
        .token_codec
        .encode(&created.email, &created.roles)
        .map_err(|e| {
            error!(error = %e, "Token issuance failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Token issuance failed")
        })?;

    let pool = state.db_pool.as_ref().ok_or_else(|| {
        error!("Database not available");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database not available")
    })?;

    UserRepository::record_login(pool, &created.email, &token)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to store issued token");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        })?;

    info!(email = %created.email, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "Registration successful",
            AuthenticationResult {
                id: created.id,
                name: created.name,
                email: created.email,
                roles: created.roles,
                phones: created.phones,
                token,
            },
        )),
    ))
}

/// 인증 라우터 생성.
pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use crate::state::create_test_state;

    fn auth_app() -> Router {
        let state = Arc::new(create_test_state());
        Router::new()
            .route("/api/v1/auth/login", post(login))
            .route("/api/v1/auth/register", post(register))
            .with_state(state)
    }

    async fn post_json(
        app: Router,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, ApiErrorResponse) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ApiErrorResponse = serde_json::from_slice(&bytes).unwrap();
        (status, error)
    }

    #[tokio::test]
    async fn test_login_rejects_blank_fields() {
        let (status, error) = post_json(
            auth_app(),
            "/api/v1/auth/login",
            serde_json::json!({ "email": "", "password": "" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.errors.len(), 2);
        assert!(error.errors.iter().any(|e| e == "email: email is required"));
        assert!(error
            .errors
            .iter()
            .any(|e| e == "password: password is required"));
    }

    #[tokio::test]
    async fn test_login_without_database_is_server_error() {
        let (status, error) = post_json(
            auth_app(),
            "/api/v1/auth/login",
            serde_json::json!({ "email": "luna@x.com", "password": "Secret1!" }),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.errors, vec!["Database not available".to_string()]);
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_email_format() {
        let (status, error) = post_json(
            auth_app(),
            "/api/v1/auth/register",
            serde_json::json!({
                "name": "Luna",
                "email": "not-an-email",
                "password": "Secret1!pass"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error.errors[0].starts_with("Invalid email format"));
    }

    #[tokio::test]
    async fn test_register_rejects_weak_password() {
        let (status, error) = post_json(
            auth_app(),
            "/api/v1/auth/register",
            serde_json::json!({
                "name": "Luna",
                "email": "luna@x.com",
                "password": "weak"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!error.errors.is_empty());
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_role_name() {
        let (status, error) = post_json(
            auth_app(),
            "/api/v1/auth/register",
            serde_json::json!({
                "name": "Luna",
                "email": "luna@x.com",
                "password": "Secret1!pass",
                "roles": ["admin"]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error
            .errors
            .iter()
            .any(|e| e.contains("invalid role name: admin")));
    }

    #[tokio::test]
    async fn test_register_rejects_blank_phone_fields() {
        let (status, error) = post_json(
            auth_app(),
            "/api/v1/auth/register",
            serde_json::json!({
                "name": "Luna",
                "email": "luna@x.com",
                "password": "Secret1!pass",
                "phones": [{ "number": "", "cityCode": "2", "countryCode": "82" }]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error
            .errors
            .iter()
            .any(|e| e.contains("phone fields must not be blank")));
    }
}
