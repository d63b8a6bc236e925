//! 사용자 계정 애그리거트.
//!
//! 이 모듈은 계정과 관련된 타입을 정의합니다:
//! - `User` - 전화번호와 역할을 포함한 계정 레코드

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Phone;

/// 사용자 계정.
///
/// `password` 필드는 항상 해시된 값을 담으며 직렬화에서 제외됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// 계정 ID
    pub id: Uuid,
    /// 표시 이름
    pub name: String,
    /// 이메일 (로그인 식별자, 유일)
    pub email: String,
    /// 비밀번호 해시 (PHC 문자열)
    #[serde(skip_serializing, default)]
    pub password: String,
    /// 마지막으로 발급된 토큰
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub token: Option<String>,
    /// 활성 상태
    pub is_active: bool,
    /// 생성 시각
    pub created: DateTime<Utc>,
    /// 마지막 수정 시각
    pub modified: DateTime<Utc>,
    /// 마지막 로그인 시각
    pub last_login: DateTime<Utc>,
    /// 등록된 전화번호
    #[serde(default)]
    pub phones: Vec<Phone>,
    /// 부여된 역할 이름
    #[serde(default)]
    pub roles: Vec<String>,
}

impl User {
    /// 새 계정을 생성합니다.
    ///
    /// 생성/수정/마지막 로그인 시각은 현재 시각으로, 계정은 활성 상태로
    /// 초기화됩니다. `password`에는 이미 해시된 값을 전달해야 합니다.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            password: password_hash.into(),
            token: None,
            is_active: true,
            created: now,
            modified: now,
            last_login: now,
            phones: Vec::new(),
            roles: Vec::new(),
        }
    }

    /// 전화번호를 설정합니다.
    pub fn with_phones(mut self, phones: Vec<Phone>) -> Self {
        self.phones = phones;
        self
    }

    /// 역할을 설정합니다.
    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    /// 주어진 역할을 보유하는지 확인합니다.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// 인증 주체로 사용할 수 있는 계정인지 확인합니다.
    ///
    /// 비활성 계정과 역할이 없는 계정은 요청 컨텍스트에 바인딩될 수
    /// 없습니다.
    pub fn is_resolvable(&self) -> bool {
        self.is_active && !self.roles.is_empty()
    }

    /// 로그인 성공을 기록합니다.
    ///
    /// 마지막 로그인/수정 시각을 갱신하고 발급된 토큰을 저장합니다.
    pub fn record_login(&mut self, token: impl Into<String>, now: DateTime<Utc>) {
        self.last_login = now;
        self.modified = now;
        self.token = Some(token.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_is_active() {
        let user = User::new("Luna", "luna@x.com", "$argon2id$hash");

        assert!(user.is_active);
        assert_eq!(user.created, user.modified);
        assert_eq!(user.created, user.last_login);
        assert!(user.token.is_none());
    }

    #[test]
    fn test_has_role() {
        let user = User::new("Luna", "luna@x.com", "hash")
            .with_roles(vec!["ROLE_USER".to_string()]);

        assert!(user.has_role("ROLE_USER"));
        assert!(!user.has_role("ROLE_ADMIN"));
    }

    #[test]
    fn test_resolvable_requires_active_and_roles() {
        let mut user = User::new("Luna", "luna@x.com", "hash")
            .with_roles(vec!["ROLE_USER".to_string()]);
        assert!(user.is_resolvable());

        user.is_active = false;
        assert!(!user.is_resolvable());

        user.is_active = true;
        user.roles.clear();
        assert!(!user.is_resolvable());
    }

    #[test]
    fn test_record_login_updates_timestamps() {
        let mut user = User::new("Luna", "luna@x.com", "hash");
        let before_modified = user.modified;

        let now = Utc::now() + chrono::Duration::seconds(5);
        user.record_login("token-abc", now);

        assert_eq!(user.token.as_deref(), Some("token-abc"));
        assert_eq!(user.last_login, now);
        assert!(user.modified > before_modified);
    }

    #[test]
    fn test_password_not_serialized() {
        let user = User::new("Luna", "luna@x.com", "super-secret-hash");
        let json = serde_json::to_string(&user).unwrap();

        assert!(!json.contains("super-secret-hash"));
        assert!(!json.contains("password"));
    }
}
