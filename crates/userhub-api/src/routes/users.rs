//! 사용자 관리 API 라우트.
//!
//! 계정 생성/조회/수정/삭제 엔드포인트를 제공합니다. 모든 경로는
//! 인증 미들웨어 뒤에 있으며, 필요한 권한은 정책 테이블이 정합니다.
//!
//! # 엔드포인트
//!
//! - `POST /api/v1/users/create` - 계정 생성 (ROLE_ADMIN)
//! - `GET /api/v1/users/getUser/{email}` - 단건 조회 (ROLE_USER, ROLE_ADMIN)
//! - `GET /api/v1/users/getAllUsers` - 전체 조회 (ROLE_USER, ROLE_ADMIN)
//! - `PUT /api/v1/users/update/{email}` - 프로필 수정 (ROLE_ADMIN)
//! - `PATCH /api/v1/users/updateEmail/{email}/email` - 이메일 변경 (ROLE_ADMIN)
//! - `DELETE /api/v1/users/delete/{email}` - 계정 삭제 (ROLE_ADMIN)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use userhub_core::{is_valid_role_name, Phone, Role, User, ROLE_USER};

use crate::auth::{hash_password, validate_password_strength, CurrentIdentity};
use crate::error::{error_response, ApiErrorResponse, ApiResult};
use crate::repository::{RoleRepository, UserRepository};
use crate::state::AppState;

// ==================== Request/Response 타입 ====================

/// 성공 응답 봉투.
///
/// 모든 성공 응답은 사람이 읽을 메시지와 데이터를 함께 담습니다.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse<T> {
    /// 결과 요약 메시지
    pub message: String,
    /// 응답 데이터
    pub data: T,
}

impl<T> MessageResponse<T> {
    /// 메시지와 데이터로 봉투를 만듭니다.
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

/// 계정 생성 요청.
///
/// 회원 가입과 관리자 생성 양쪽에서 같은 형식을 사용합니다.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    /// 표시 이름
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    /// 계정 이메일 (설정된 패턴으로 검사)
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
    /// 비밀번호 (강도 정책으로 검사)
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    /// 전화번호 목록 (선택)
    #[serde(default)]
    #[validate(custom(function = "validate_phones"))]
    pub phones: Vec<Phone>,
    /// 역할 이름 목록 (선택, 비어 있으면 ROLE_USER 부여)
    #[serde(default)]
    #[validate(custom(function = "validate_role_names"))]
    pub roles: Vec<String>,
}

/// 프로필 수정 요청.
///
/// 모든 필드는 선택이며, 없는 필드는 기존 값을 유지합니다.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    /// 새 표시 이름
    #[validate(length(min = 1, message = "name must not be blank"))]
    pub name: Option<String>,
    /// 교체할 전화번호 목록 (빈 목록은 무시)
    #[validate(custom(function = "validate_phones"))]
    pub phones: Option<Vec<Phone>>,
    /// 교체할 역할 목록 (빈 목록은 무시)
    #[validate(custom(function = "validate_role_names"))]
    pub roles: Option<Vec<String>>,
}

/// 이메일 변경 요청.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateEmailRequest {
    /// 새 이메일
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
}

/// 사용자 응답.
///
/// 비밀번호와 저장된 토큰은 절대 노출하지 않습니다.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// 계정 ID
    pub id: Uuid,
    /// 표시 이름
    pub name: String,
    /// 계정 이메일
    pub email: String,
    /// 전화번호 목록
    pub phones: Vec<Phone>,
    /// 부여된 역할 목록
    pub roles: Vec<String>,
    /// 생성 시각
    pub created: DateTime<Utc>,
    /// 마지막 수정 시각
    pub modified: DateTime<Utc>,
    /// 마지막 로그인 시각
    pub last_login: DateTime<Utc>,
    /// 활성 여부
    pub is_active: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phones: user.phones,
            roles: user.roles,
            created: user.created,
            modified: user.modified,
            last_login: user.last_login,
            is_active: user.is_active,
        }
    }
}

fn validate_phones(phones: &[Phone]) -> Result<(), ValidationError> {
    for phone in phones {
        if phone.number.trim().is_empty()
            || phone.city_code.trim().is_empty()
            || phone.country_code.trim().is_empty()
        {
            return Err(ValidationError::new("phone_fields")
                .with_message("phone fields must not be blank".into()));
        }
    }
    Ok(())
}

fn validate_role_names(roles: &[String]) -> Result<(), ValidationError> {
    for role in roles {
        if !is_valid_role_name(role) {
            return Err(ValidationError::new("role_name")
                .with_message(format!("invalid role name: {}", role).into()));
        }
    }
    Ok(())
}

// ==================== 공통 로직 ====================

/// 경로나 본문으로 받은 이메일의 형식을 검사합니다.
fn check_email_format(state: &AppState, email: &str) -> ApiResult<()> {
    if !state.email_regex.is_match(email) {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid email format: {}", email),
        ));
    }
    Ok(())
}

/// 역할 이름 목록을 카탈로그와 대조해 역할 레코드로 바꿉니다.
///
/// 존재하지 않는 이름이 섞여 있으면 거부합니다.
async fn resolve_roles(
    pool: &PgPool,
    names: &[String],
) -> ApiResult<Vec<Role>> {
    let roles = RoleRepository::find_by_names(pool, names).await.map_err(|e| {
        error!(error = %e, "Role lookup failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
    })?;

    if roles.len() != names.len() {
        let known: Vec<&str> = roles.iter().map(|r| r.name.as_str()).collect();
        let missing: Vec<String> = names
            .iter()
            .filter(|name| !known.contains(&name.as_str()))
            .cloned()
            .collect();
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("Unknown roles: {}", missing.join(", ")),
        ));
    }

    Ok(roles)
}

/// 계정 생성의 공통 경로.
///
/// 형식 검사, 중복 확인, 역할 결정, 해싱, 저장까지를 담당합니다.
/// 회원 가입과 관리자 생성이 같은 규칙을 공유합니다.
pub(crate) async fn create_account(
    state: &AppState,
    request: CreateUserRequest,
) -> ApiResult<User> {
    request.validate().map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiErrorResponse::from_validation(&e)),
        )
    })?;

    check_email_format(state, &request.email)?;

    validate_password_strength(&request.password, &state.config.validation)
        .map_err(|msg| error_response(StatusCode::BAD_REQUEST, msg))?;

    let pool = state.db_pool.as_ref().ok_or_else(|| {
        error!("Database not available");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database not available")
    })?;

    let exists = UserRepository::exists_by_email(pool, &request.email)
        .await
        .map_err(|e| {
            error!(error = %e, "Email lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        })?;

    if exists {
        return Err(error_response(
            StatusCode::CONFLICT,
            format!("Email already registered: {}", request.email),
        ));
    }

    let mut role_names = if request.roles.is_empty() {
        vec![ROLE_USER.to_string()]
    } else {
        request.roles
    };
    role_names.sort();
    role_names.dedup();

    let roles = resolve_roles(pool, &role_names).await?;

    let password_hash = hash_password(&request.password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Password hashing failed")
    })?;

    let user = User::new(request.name, request.email, password_hash)
        .with_phones(request.phones)
        .with_roles(role_names);

    let created = UserRepository::create(pool, &user, &roles).await.map_err(|e| {
        error!(error = %e, "User creation failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
    })?;

    Ok(created)
}

// ==================== 핸들러 ====================

/// 계정 생성 (관리자).
///
/// POST /api/v1/users/create
#[utoipa::path(
    post,
    path = "/api/v1/users/create",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "생성 성공", body = MessageResponse<UserResponse>),
        (status = 400, description = "요청 형식 오류", body = ApiErrorResponse),
        (status = 401, description = "인증 필요", body = ApiErrorResponse),
        (status = 403, description = "권한 부족", body = ApiErrorResponse),
        (status = 409, description = "이메일 중복", body = ApiErrorResponse),
        (status = 500, description = "서버 오류", body = ApiErrorResponse)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse<UserResponse>>)> {
    let created = create_account(&state, request).await?;

    info!(email = %created.email, "User created");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "User created successfully",
            UserResponse::from(created),
        )),
    ))
}

/// 이메일로 단건 조회.
///
/// GET /api/v1/users/getUser/{email}
#[utoipa::path(
    get,
    path = "/api/v1/users/getUser/{email}",
    params(
        ("email" = String, Path, description = "조회할 계정 이메일")
    ),
    responses(
        (status = 200, description = "조회 성공", body = MessageResponse<UserResponse>),
        (status = 400, description = "이메일 형식 오류", body = ApiErrorResponse),
        (status = 401, description = "인증 필요", body = ApiErrorResponse),
        (status = 404, description = "계정 없음", body = ApiErrorResponse),
        (status = 500, description = "서버 오류", body = ApiErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> ApiResult<Json<MessageResponse<UserResponse>>> {
    check_email_format(&state, &email)?;

    let pool = state.db_pool.as_ref().ok_or_else(|| {
        error!("Database not available");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database not available")
    })?;

    let user = UserRepository::find_by_email(pool, &email)
        .await
        .map_err(|e| {
            error!(error = %e, "User lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        })?
        .ok_or_else(|| {
            error_response(
                StatusCode::NOT_FOUND,
                format!("User not found: {}", email),
            )
        })?;

    Ok(Json(MessageResponse::new(
        "User found successfully",
        UserResponse::from(user),
    )))
}

/// 전체 사용자 조회.
///
/// GET /api/v1/users/getAllUsers
#[utoipa::path(
    get,
    path = "/api/v1/users/getAllUsers",
    responses(
        (status = 200, description = "조회 성공", body = MessageResponse<Vec<UserResponse>>),
        (status = 401, description = "인증 필요", body = ApiErrorResponse),
        (status = 500, description = "서버 오류", body = ApiErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_all_users(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<MessageResponse<Vec<UserResponse>>>> {
    let pool = state.db_pool.as_ref().ok_or_else(|| {
        error!("Database not available");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database not available")
    })?;

    let users = UserRepository::find_all(pool).await.map_err(|e| {
        error!(error = %e, "User listing failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
    })?;

    let data: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();

    Ok(Json(MessageResponse::new(
        "User list fetched successfully",
        data,
    )))
}

/// 프로필 수정.
///
/// 경로의 이메일로 계정을 찾고, 본문에 있는 필드만 바꿉니다.
/// 비활성 계정은 수정할 수 없습니다.
///
/// PUT /api/v1/users/update/{email}
#[utoipa::path(
    put,
    path = "/api/v1/users/update/{email}",
    params(
        ("email" = String, Path, description = "수정할 계정 이메일")
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "수정 성공", body = MessageResponse<UserResponse>),
        (status = 400, description = "요청 형식 오류 또는 비활성 계정", body = ApiErrorResponse),
        (status = 401, description = "인증 필요", body = ApiErrorResponse),
        (status = 403, description = "권한 부족", body = ApiErrorResponse),
        (status = 404, description = "계정 없음", body = ApiErrorResponse),
        (status = 500, description = "서버 오류", body = ApiErrorResponse)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<Json<MessageResponse<UserResponse>>> {
    check_email_format(&state, &email)?;

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

    let mut user = UserRepository::find_by_email(pool, &email)
        .await
        .map_err(|e| {
            error!(error = %e, "User lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        })?
        .ok_or_else(|| {
            error_response(
                StatusCode::NOT_FOUND,
                format!("User not found: {}", email),
            )
        })?;

    if !user.is_active {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("User is inactive: {}", email),
        ));
    }

    if let Some(name) = request.name {
        user.name = name;
    }

    if let Some(phones) = request.phones {
        if !phones.is_empty() {
            user.phones = phones;
        }
    }

    if let Some(roles) = request.roles {
        if !roles.is_empty() {
            let mut names = roles;
            names.sort();
            names.dedup();
            user.roles = names;
        }
    }

    let roles = resolve_roles(pool, &user.roles).await?;

    let updated = UserRepository::update_profile(pool, &user, &roles)
        .await
        .map_err(|e| {
            error!(error = %e, "User update failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        })?;

    info!(email = %updated.email, "User updated");

    Ok(Json(MessageResponse::new(
        "User updated successfully",
        UserResponse::from(updated),
    )))
}

/// 이메일 변경.
///
/// PATCH /api/v1/users/updateEmail/{email}/email
#[utoipa::path(
    patch,
    path = "/api/v1/users/updateEmail/{email}/email",
    params(
        ("email" = String, Path, description = "현재 계정 이메일")
    ),
    request_body = UpdateEmailRequest,
    responses(
        (status = 200, description = "변경 성공", body = MessageResponse<UserResponse>),
        (status = 400, description = "이메일 형식 오류", body = ApiErrorResponse),
        (status = 401, description = "인증 필요", body = ApiErrorResponse),
        (status = 403, description = "권한 부족", body = ApiErrorResponse),
        (status = 404, description = "계정 없음", body = ApiErrorResponse),
        (status = 409, description = "새 이메일 중복", body = ApiErrorResponse),
        (status = 500, description = "서버 오류", body = ApiErrorResponse)
    ),
    tag = "users"
)]
pub async fn update_user_email(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
    Json(request): Json<UpdateEmailRequest>,
) -> ApiResult<Json<MessageResponse<UserResponse>>> {
    check_email_format(&state, &email)?;
    check_email_format(&state, &request.email)?;

    let pool = state.db_pool.as_ref().ok_or_else(|| {
        error!("Database not available");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database not available")
    })?;

    UserRepository::find_by_email(pool, &email)
        .await
        .map_err(|e| {
            error!(error = %e, "User lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        })?
        .ok_or_else(|| {
            error_response(
                StatusCode::NOT_FOUND,
                format!("User not found: {}", email),
            )
        })?;

    let exists = UserRepository::exists_by_email(pool, &request.email)
        .await
        .map_err(|e| {
            error!(error = %e, "Email lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        })?;

    if exists {
        return Err(error_response(
            StatusCode::CONFLICT,
            format!("Email already registered: {}", request.email),
        ));
    }

    let updated = UserRepository::update_email(pool, &email, &request.email)
        .await
        .map_err(|e| {
            error!(error = %e, "Email update failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        })?
        .ok_or_else(|| {
            error_response(
                StatusCode::NOT_FOUND,
                format!("User not found: {}", email),
            )
        })?;

    info!(old_email = %email, new_email = %updated.email, "User email updated");

    Ok(Json(MessageResponse::new(
        "Email updated successfully",
        UserResponse::from(updated),
    )))
}

/// 계정 삭제.
///
/// DELETE /api/v1/users/delete/{email}
#[utoipa::path(
    delete,
    path = "/api/v1/users/delete/{email}",
    params(
        ("email" = String, Path, description = "삭제할 계정 이메일")
    ),
    responses(
        (status = 200, description = "삭제 성공", body = MessageResponse<String>),
        (status = 400, description = "이메일 형식 오류", body = ApiErrorResponse),
        (status = 401, description = "인증 필요", body = ApiErrorResponse),
        (status = 403, description = "권한 부족", body = ApiErrorResponse),
        (status = 404, description = "계정 없음", body = ApiErrorResponse),
        (status = 500, description = "서버 오류", body = ApiErrorResponse)
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    CurrentIdentity(actor): CurrentIdentity,
    Path(email): Path<String>,
) -> ApiResult<Json<MessageResponse<String>>> {
    check_email_format(&state, &email)?;

    let pool = state.db_pool.as_ref().ok_or_else(|| {
        error!("Database not available");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database not available")
    })?;

    let deleted = UserRepository::delete_by_email(pool, &email)
        .await
        .map_err(|e| {
            error!(error = %e, "User deletion failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        })?;

    if !deleted {
        return Err(error_response(
            StatusCode::NOT_FOUND,
            format!("User not found: {}", email),
        ));
    }

    info!(actor = %actor.subject, email = %email, "User deleted");

    Ok(Json(MessageResponse::new(
        "User deleted successfully",
        email,
    )))
}

/// 사용자 라우터 생성.
pub fn users_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create", post(create_user))
        .route("/getUser/{email}", get(get_user))
        .route("/getAllUsers", get(get_all_users))
        .route("/update/{email}", put(update_user))
        .route("/updateEmail/{email}/email", patch(update_user_email))
        .route("/delete/{email}", delete(delete_user))
}
