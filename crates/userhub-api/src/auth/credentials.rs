//! 로그인 자격 증명 검증.
//!
//! 이메일/비밀번호 조합을 저장된 계정과 대조합니다. 계정이 존재하지
//! 않는 경우에도 더미 해시에 대해 검증을 수행해, 응답 시간이나 에러
//! 메시지로 계정 존재 여부가 드러나지 않게 합니다.

use sqlx::PgPool;
use tracing::debug;

use userhub_core::domain::User;

use crate::auth::password::{dummy_hash, verify_password};
use crate::repository::UserRepository;

/// 자격 증명 검증 에러.
///
/// 잘못된 이메일과 잘못된 비밀번호는 의도적으로 구분하지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("이메일 또는 비밀번호가 올바르지 않습니다")]
    InvalidCredentials,
    #[error("데이터베이스 에러: {0}")]
    Database(String),
}

/// 이메일/비밀번호를 검증하고 계정을 반환합니다.
///
/// # Errors
///
/// 계정이 없거나, 비밀번호가 틀리거나, 계정이 비활성 상태면
/// [`CredentialError::InvalidCredentials`]를 반환합니다. 세 경우 모두
/// 같은 에러이므로 호출자는 구분할 수 없습니다.
pub async fn verify_credentials(
    pool: &PgPool,
    email: &str,
    password: &str,
) -> Result<User, CredentialError> {
    let user = UserRepository::find_by_email(pool, email)
        .await
        .map_err(|e| CredentialError::Database(e.to_string()))?;

    match user {
        Some(user) => {
            verify_password(password, &user.password)
                .map_err(|_| CredentialError::InvalidCredentials)?;

            if !user.is_active {
                debug!(email = %email, "Login attempt for inactive account");
                return Err(CredentialError::InvalidCredentials);
            }

            Ok(user)
        }
        None => {
            // 계정이 없어도 해시 검증 비용은 동일하게 지불합니다.
            let _ = verify_password(password, dummy_hash());
            debug!(email = %email, "Login attempt for unknown account");
            Err(CredentialError::InvalidCredentials)
        }
    }
}
