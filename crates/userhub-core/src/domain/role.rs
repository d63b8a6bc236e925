//! 권한 역할(Role) 정의.
//!
//! 역할 이름은 `ROLE_` 프리픽스 뒤에 대문자 알파벳이 이어지는 형식만
//! 허용됩니다 (예: `ROLE_USER`, `ROLE_ADMIN`).

use serde::{Deserialize, Serialize};

/// 일반 사용자 역할.
pub const ROLE_USER: &str = "ROLE_USER";

/// 관리자 역할.
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";

/// 저장된 역할 항목.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
pub struct Role {
    /// 역할 ID
    pub id: i64,
    /// 역할 이름 (`ROLE_[A-Z]+`)
    pub name: String,
}

/// 역할 이름이 허용된 형식인지 검사합니다.
///
/// # Example
///
/// ```
/// use userhub_core::domain::is_valid_role_name;
///
/// assert!(is_valid_role_name("ROLE_ADMIN"));
/// assert!(!is_valid_role_name("admin"));
/// assert!(!is_valid_role_name("ROLE_"));
/// ```
pub fn is_valid_role_name(name: &str) -> bool {
    match name.strip_prefix("ROLE_") {
        Some(rest) => !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_uppercase()),
        None => false,
    }
}
