//! OpenAPI 문서화 설정.
//!
//! utoipa를 사용하여 REST API의 OpenAPI 3.0 스펙을 생성합니다.
//! Swagger UI는 `/swagger-ui` 경로에서 사용 가능합니다.
//!
//! # 자동 생성 구조
//!
//! 각 라우트 모듈은 자체 스키마를 정의하고, 중앙 `ApiDoc`에서 집계합니다.
//! 새로운 엔드포인트를 추가할 때:
//!
//! 1. 응답/요청 타입에 `#[derive(ToSchema)]` 추가
//! 2. 핸들러에 `#[utoipa::path(...)]` 어노테이션 추가
//! 3. 이 파일의 `components(schemas(...))` 및 `paths(...)` 섹션에 추가

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use userhub_core::Phone;

use crate::error::ApiErrorResponse;
use crate::routes::{
    // Auth 모듈
    AuthenticationResult,
    // Health 모듈
    ComponentHealth,
    ComponentStatus,
    // Users 모듈
    CreateUserRequest,
    HealthResponse,
    LoginRequest,
    MessageResponse,
    UpdateEmailRequest,
    UpdateUserRequest,
    UserResponse,
};

// ==================== OpenAPI 문서 정의 ====================

/// UserHub API 문서.
///
/// 모든 엔드포인트와 스키마를 포함하는 OpenAPI 3.0 스펙입니다.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "UserHub API",
        version = "0.1.0",
        description = r#"
# UserHub 사용자 관리 REST API

계정 등록, 인증, 사용자 관리를 위한 REST API입니다.

## 주요 기능

- **인증**: 로그인/회원 가입과 JWT 발급
- **사용자 관리**: 계정 생성, 조회, 수정, 이메일 변경, 삭제
- **권한 제어**: 경로/메서드별 역할 기반 접근 제어

## 인증

`/api/v1/auth`와 헬스 체크를 제외한 모든 엔드포인트는 JWT Bearer
토큰 인증이 필요합니다.

1. `/api/v1/auth/login`으로 로그인합니다.
2. 응답의 `token` 값을 복사합니다.
3. `Authorization: Bearer <token>` 헤더를 포함해 호출합니다.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT"),
        contact(
            name = "UserHub Team",
            url = "https://github.com/user/userhub"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "로컬 개발 서버"),
    ),
    tags(
        (name = "health", description = "헬스 체크 - 서버 상태 확인"),
        (name = "auth", description = "인증 - 로그인/회원 가입 및 토큰 발급"),
        (name = "users", description = "사용자 관리 - 계정 CRUD")
    ),
    // ==================== 스키마 등록 ====================
    components(
        schemas(
            // ===== Health =====
            HealthResponse,
            ComponentHealth,
            ComponentStatus,

            // ===== Common =====
            ApiErrorResponse,
            Phone,

            // ===== Auth =====
            LoginRequest,
            AuthenticationResult,
            MessageResponse<AuthenticationResult>,

            // ===== Users =====
            CreateUserRequest,
            UpdateUserRequest,
            UpdateEmailRequest,
            UserResponse,
            MessageResponse<UserResponse>,
            MessageResponse<Vec<UserResponse>>,
            MessageResponse<String>,
        )
    ),
    // ==================== 경로 등록 ====================
    paths(
        // ===== Health =====
        crate::routes::health::health_check,
        crate::routes::health::health_ready,

        // ===== Auth =====
        crate::routes::auth::login,
        crate::routes::auth::register,

        // ===== Users =====
        crate::routes::users::create_user,
        crate::routes::users::get_user,
        crate::routes::users::get_all_users,
        crate::routes::users::update_user,
        crate::routes::users::update_user_email,
        crate::routes::users::delete_user,
    )
)]
pub struct ApiDoc;

// ==================== Swagger UI 라우터 ====================

/// Swagger UI 라우터 생성.
///
/// 다음 경로에 문서 UI를 마운트합니다:
/// - `/swagger-ui` - Swagger UI 대화형 문서
/// - `/api-docs/openapi.json` - OpenAPI JSON 스펙
pub fn swagger_ui_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}

// ==================== 테스트 ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_valid() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&spec).unwrap();

        // 기본 정보 확인
        assert!(json.contains("UserHub API"));
        assert!(json.contains("0.1.0"));

        // 태그 확인
        assert!(json.contains("health"));
        assert!(json.contains("auth"));
        assert!(json.contains("users"));

        // 경로 확인
        assert!(json.contains("/health"));
        assert!(json.contains("/health/ready"));
        assert!(json.contains("/api/v1/auth/login"));
        assert!(json.contains("/api/v1/auth/register"));
        assert!(json.contains("/api/v1/users/getUser/{email}"));
        assert!(json.contains("/api/v1/users/updateEmail/{email}/email"));
    }

    #[test]
    fn test_swagger_ui_router_creates() {
        let _router: Router<()> = swagger_ui_router();
    }

    #[test]
    fn test_openapi_contains_schemas() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_string(&spec).unwrap();

        // 스키마 확인
        assert!(json.contains("UserResponse"));
        assert!(json.contains("CreateUserRequest"));
        assert!(json.contains("ApiErrorResponse"));
        assert!(json.contains("Phone"));
        assert!(json.contains("AuthenticationResult"));
    }
}
