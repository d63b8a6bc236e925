//! 비밀번호 해싱 유틸리티.
//!
//! Argon2 기반 비밀번호 해싱 및 검증, 설정 기반 강도 검사.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use once_cell::sync::Lazy;

use userhub_core::config::ValidationConfig;

/// 비밀번호 처리 에러.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("비밀번호 해싱 실패")]
    HashingFailed,
    #[error("비밀번호 검증 실패")]
    VerificationFailed,
    #[error("잘못된 해시 형식")]
    InvalidHashFormat,
}

/// 비밀번호 해싱.
///
/// Argon2id 알고리즘을 사용하여 비밀번호를 해싱합니다.
/// 솔트는 자동으로 생성됩니다.
///
/// # Arguments
///
/// * `password` - 해싱할 평문 비밀번호
///
/// # Returns
///
/// PHC 형식의 해시 문자열 (솔트 포함)
///
/// # Example
///
/// ```rust,ignore
/// let hash = hash_password("my_secure_password").unwrap();
/// // "$argon2id$v=19$m=19456,t=2,p=1$..."
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| PasswordError::HashingFailed)?;

    Ok(hash.to_string())
}

/// 비밀번호 검증.
///
/// 저장된 해시와 입력된 비밀번호를 비교합니다. 비교는 Argon2 검증기
/// 내부에서 상수 시간으로 수행됩니다.
///
/// # Arguments
///
/// * `password` - 검증할 평문 비밀번호
/// * `hash` - 저장된 PHC 형식 해시
///
/// # Returns
///
/// 비밀번호가 일치하면 Ok(()), 불일치하면 Err
///
/// # Example
///
/// ```rust,ignore
/// let hash = hash_password("my_password").unwrap();
/// assert!(verify_password("my_password", &hash).is_ok());
/// assert!(verify_password("wrong_password", &hash).is_err());
/// ```
pub fn verify_password(password: &str, hash: &str) -> Result<(), PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| PasswordError::VerificationFailed)
}

static DUMMY_HASH: Lazy<String> =
    Lazy::new(|| hash_password("userhub-dummy-password").unwrap_or_default());

/// 계정 존재 여부와 무관하게 동일한 검증 비용을 지불하기 위한 해시.
///
/// 로그인 시 계정이 없으면 이 해시에 대해 검증을 수행해 응답 시간으로
/// 계정 존재를 추측할 수 없게 합니다.
pub fn dummy_hash() -> &'static str {
    &DUMMY_HASH
}

/// 비밀번호 강도 검증.
///
/// 설정된 정책을 충족하는지 확인합니다.
///
/// # Returns
///
/// 유효하면 Ok(()), 유효하지 않으면 에러 메시지와 함께 Err
pub fn validate_password_strength(
    password: &str,
    policy: &ValidationConfig,
) -> Result<(), String> {
    if password.chars().count() < policy.password_min_length {
        return Err(format!(
            "password must be at least {} characters",
            policy.password_min_length
        ));
    }

    if policy.password_require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
        return Err("password must contain at least one uppercase letter".to_string());
    }

    if policy.password_require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
        return Err("password must contain at least one lowercase letter".to_string());
    }

    if policy.password_require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("password must contain at least one digit".to_string());
    }

    if policy.password_require_special
        && !password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace())
    {
        return Err("password must contain at least one special character".to_string());
    }

    Ok(())
}
