//! 요청 주체(Principal)와 신원 확인.
//!
//! 토큰 클레임을 실제 계정과 대조해 요청 범위의 인증 컨텍스트를
//! 구성합니다. 컨텍스트는 request extension으로만 전달되며 전역
//! 상태를 사용하지 않습니다.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashSet;
use tracing::warn;

use crate::auth::jwt::Claims;
use crate::error::ApiErrorResponse;
use crate::repository::UserRepository;

/// 인증된 요청 주체.
///
/// 역할 목록은 토큰에 내장된 것을 그대로 사용합니다. 계정 조회는
/// 존재/활성 여부 확인에만 쓰입니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// 사용자 이메일
    pub subject: String,
    /// 부여된 역할 이름
    pub roles: Vec<String>,
    /// 토큰 만료 시각
    pub expires_at: DateTime<Utc>,
}

impl Principal {
    /// 주어진 역할을 보유하는지 확인합니다.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// 나열된 역할 중 하나 이상을 보유하는지 확인합니다.
    pub fn has_any_role(&self, required: &[String]) -> bool {
        required.iter().any(|r| self.has_role(r))
    }

    /// 나열된 역할을 모두 보유하는지 확인합니다.
    pub fn has_all_roles(&self, required: &[String]) -> bool {
        required.iter().all(|r| self.has_role(r))
    }
}

/// 요청 범위 인증 컨텍스트.
///
/// 모든 요청은 미들웨어를 통과하면서 정확히 하나의 컨텍스트를 갖게
/// 됩니다.
#[derive(Debug, Clone, Default)]
pub enum AuthContext {
    /// 익명 요청 (토큰 없음 또는 검증 실패)
    #[default]
    Anonymous,
    /// 신원이 확인된 요청
    Authenticated(Principal),
}

impl AuthContext {
    /// 인증된 컨텍스트인지 확인합니다.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthContext::Authenticated(_))
    }

    /// 인증된 주체를 반환합니다.
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            AuthContext::Authenticated(principal) => Some(principal),
            AuthContext::Anonymous => None,
        }
    }
}

/// 신원 확인 에러.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("계정을 찾을 수 없습니다: {0}")]
    NotFound(String),
    #[error("비활성화된 계정입니다: {0}")]
    Inactive(String),
    #[error("부여된 역할이 없습니다: {0}")]
    NoRoles(String),
    #[error("데이터베이스 에러: {0}")]
    Database(String),
}

/// 토큰 클레임을 저장된 계정과 대조해 Principal을 생성합니다.
///
/// 계정이 없거나, 비활성이거나, 역할이 비어 있으면 실패합니다. 토큰의
/// 역할 목록이 저장된 역할과 다르면 경고만 남기고 토큰 쪽을 신뢰합니다.
///
/// # Errors
///
/// 계정 상태가 주체로 쓰기에 부적합하면 [`IdentityError`]를 반환합니다.
pub async fn resolve_identity(pool: &PgPool, claims: &Claims) -> Result<Principal, IdentityError> {
    if claims.roles.is_empty() {
        return Err(IdentityError::NoRoles(claims.sub.clone()));
    }

    let identity = UserRepository::find_identity(pool, &claims.sub)
        .await
        .map_err(|e| IdentityError::Database(e.to_string()))?
        .ok_or_else(|| IdentityError::NotFound(claims.sub.clone()))?;

    if !identity.is_active {
        return Err(IdentityError::Inactive(claims.sub.clone()));
    }

    if identity.roles.is_empty() {
        return Err(IdentityError::NoRoles(claims.sub.clone()));
    }

    let stored: HashSet<&str> = identity.roles.iter().map(String::as_str).collect();
    if claims.roles.iter().any(|r| !stored.contains(r.as_str())) {
        warn!(
            subject = %claims.sub,
            token_roles = ?claims.roles,
            stored_roles = ?identity.roles,
            "Token roles differ from stored roles"
        );
    }

    Ok(Principal {
        subject: claims.sub.clone(),
        roles: claims.roles.clone(),
        expires_at: claims.expires_at(),
    })
}

/// 인증된 주체를 요구하는 추출기.
///
/// # 사용 예시
///
/// ```rust,ignore
/// async fn delete_user(
///     CurrentIdentity(principal): CurrentIdentity,
///     Path(email): Path<String>,
/// ) -> impl IntoResponse {
///     info!(actor = %principal.subject, "deleting {}", email);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Principal);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ApiErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthContext>() {
            Some(AuthContext::Authenticated(principal)) => {
                Ok(CurrentIdentity(principal.clone()))
            }
            _ => Err((
                StatusCode::UNAUTHORIZED,
                Json(ApiErrorResponse::new("Authentication required")),
            )),
        }
    }
}
