//! 선언적 접근 제어 정책.
//!
//! 엔드포인트별 요구 권한을 코드에 흩어진 검사 대신 하나의 규칙
//! 테이블로 선언합니다. 규칙은 위에서부터 순서대로 평가되며 첫 번째
//! 일치가 적용됩니다.

use axum::http::Method;

use userhub_core::config::AuthConfig;
use userhub_core::domain::{ROLE_ADMIN, ROLE_USER};

use crate::auth::identity::AuthContext;

/// 엔드포인트가 요구하는 권한.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequiredAuthority {
    /// 인증 불필요
    Public,
    /// 역할과 무관하게 인증만 필요
    Authenticated,
    /// 나열된 역할 중 하나 이상 필요
    AnyOf(Vec<String>),
    /// 나열된 역할 전부 필요
    AllOf(Vec<String>),
}

/// 단일 경로 규칙.
#[derive(Debug, Clone)]
pub struct RouteRule {
    /// 제한할 HTTP 메서드 (None이면 모든 메서드에 적용)
    pub method: Option<Method>,
    /// 경로 프리픽스
    pub prefix: String,
    /// 요구 권한
    pub authority: RequiredAuthority,
}

impl RouteRule {
    /// 모든 메서드에 적용되는 규칙을 생성합니다.
    pub fn new(prefix: impl Into<String>, authority: RequiredAuthority) -> Self {
        Self {
            method: None,
            prefix: prefix.into(),
            authority,
        }
    }

    /// 특정 메서드에만 적용되는 규칙을 생성합니다.
    pub fn for_method(
        method: Method,
        prefix: impl Into<String>,
        authority: RequiredAuthority,
    ) -> Self {
        Self {
            method: Some(method),
            prefix: prefix.into(),
            authority,
        }
    }

    fn matches(&self, method: &Method, path: &str) -> bool {
        let method_matches = match &self.method {
            Some(m) => m == method,
            None => true,
        };
        method_matches && path.starts_with(self.prefix.as_str())
    }
}

/// 정책 평가 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// 요청 허용
    Permit,
    /// 거부 - 인증 필요 (401)
    DenyUnauthenticated,
    /// 거부 - 권한 부족 (403)
    DenyForbidden,
}

/// 라우트 접근 정책 테이블.
///
/// 기동 시 한 번 생성되어 이후 변경되지 않으므로 요청 간에 공유해도
/// 안전합니다.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: Vec<RouteRule>,
    /// 어떤 규칙과도 일치하지 않는 경로에 적용되는 권한
    fallback: RequiredAuthority,
}

impl AccessPolicy {
    /// 규칙 목록과 기본 권한으로 정책을 생성합니다.
    pub fn new(rules: Vec<RouteRule>, fallback: RequiredAuthority) -> Self {
        Self { rules, fallback }
    }

    /// 인증 설정으로부터 이 서비스의 정책 테이블을 구성합니다.
    ///
    /// 공개 경로 프리픽스는 설정에서 오고, 사용자 CRUD 엔드포인트의
    /// 역할 요구 사항이 뒤따릅니다. 나머지 경로는 인증만 요구합니다.
    pub fn from_config(config: &AuthConfig) -> Self {
        let mut rules: Vec<RouteRule> = config
            .public_paths
            .iter()
            .map(|prefix| RouteRule::new(prefix.clone(), RequiredAuthority::Public))
            .collect();

        let admin_only = RequiredAuthority::AnyOf(vec![ROLE_ADMIN.to_string()]);
        let any_user =
            RequiredAuthority::AnyOf(vec![ROLE_USER.to_string(), ROLE_ADMIN.to_string()]);

        rules.extend([
            RouteRule::for_method(Method::POST, "/api/v1/users/create", admin_only.clone()),
            RouteRule::for_method(Method::GET, "/api/v1/users/getUser", any_user.clone()),
            RouteRule::for_method(Method::GET, "/api/v1/users/getAllUsers", any_user),
            RouteRule::for_method(Method::PUT, "/api/v1/users/update", admin_only.clone()),
            RouteRule::for_method(
                Method::PATCH,
                "/api/v1/users/updateEmail",
                admin_only.clone(),
            ),
            RouteRule::for_method(Method::DELETE, "/api/v1/users/delete", admin_only),
        ]);

        Self::new(rules, RequiredAuthority::Authenticated)
    }

    /// 경로가 요구하는 권한을 반환합니다.
    pub fn required_authority(&self, method: &Method, path: &str) -> &RequiredAuthority {
        self.rules
            .iter()
            .find(|rule| rule.matches(method, path))
            .map(|rule| &rule.authority)
            .unwrap_or(&self.fallback)
    }

    /// 인증 없이 접근 가능한 경로인지 확인합니다.
    pub fn is_public(&self, method: &Method, path: &str) -> bool {
        *self.required_authority(method, path) == RequiredAuthority::Public
    }

    /// 요청을 허용할지 결정합니다.
    ///
    /// 인증 여부를 권한 검사보다 먼저 판단하므로, 미인증 요청은 부족한
    /// 권한과 무관하게 항상 `DenyUnauthenticated`가 됩니다.
    pub fn decide(&self, method: &Method, path: &str, context: &AuthContext) -> PolicyDecision {
        let authority = self.required_authority(method, path);

        if *authority == RequiredAuthority::Public {
            return PolicyDecision::Permit;
        }

        let Some(principal) = context.principal() else {
            return PolicyDecision::DenyUnauthenticated;
        };

        let allowed = match authority {
            RequiredAuthority::Public | RequiredAuthority::Authenticated => true,
            RequiredAuthority::AnyOf(roles) => principal.has_any_role(roles),
            RequiredAuthority::AllOf(roles) => principal.has_all_roles(roles),
        };

        if allowed {
            PolicyDecision::Permit
        } else {
            PolicyDecision::DenyForbidden
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::from_config(&AuthConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::Principal;
    use chrono::Utc;

    fn authenticated(roles: &[&str]) -> AuthContext {
        AuthContext::Authenticated(Principal {
            subject: "luna@x.com".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        })
    }

    #[test]
    fn test_public_paths_permit_anonymous() {
        let policy = AccessPolicy::default();

        assert_eq!(
            policy.decide(&Method::POST, "/api/v1/auth/login", &AuthContext::Anonymous),
            PolicyDecision::Permit
        );
        assert_eq!(
            policy.decide(&Method::GET, "/health", &AuthContext::Anonymous),
            PolicyDecision::Permit
        );
        assert_eq!(
            policy.decide(&Method::GET, "/swagger-ui/index.html", &AuthContext::Anonymous),
            PolicyDecision::Permit
        );
    }

    #[test]
    fn test_anonymous_is_rejected_before_authority_check() {
        let policy = AccessPolicy::default();

        // 권한이 전혀 없는 요청은 403이 아니라 401이어야 합니다.
        assert_eq!(
            policy.decide(&Method::POST, "/api/v1/users/create", &AuthContext::Anonymous),
            PolicyDecision::DenyUnauthenticated
        );
        assert_eq!(
            policy.decide(&Method::DELETE, "/api/v1/users/delete/a@b.cl", &AuthContext::Anonymous),
            PolicyDecision::DenyUnauthenticated
        );
    }

    #[test]
    fn test_user_role_forbidden_on_admin_endpoints() {
        let policy = AccessPolicy::default();
        let user = authenticated(&["ROLE_USER"]);

        assert_eq!(
            policy.decide(&Method::POST, "/api/v1/users/create", &user),
            PolicyDecision::DenyForbidden
        );
        assert_eq!(
            policy.decide(&Method::DELETE, "/api/v1/users/delete/a@b.cl", &user),
            PolicyDecision::DenyForbidden
        );
        assert_eq!(
            policy.decide(&Method::PUT, "/api/v1/users/update/a@b.cl", &user),
            PolicyDecision::DenyForbidden
        );
    }

    #[test]
    fn test_admin_role_permitted_on_admin_endpoints() {
        let policy = AccessPolicy::default();
        let admin = authenticated(&["ROLE_ADMIN"]);

        assert_eq!(
            policy.decide(&Method::POST, "/api/v1/users/create", &admin),
            PolicyDecision::Permit
        );
        assert_eq!(
            policy.decide(&Method::PATCH, "/api/v1/users/updateEmail/a@b.cl/email", &admin),
            PolicyDecision::Permit
        );
    }

    #[test]
    fn test_read_endpoints_accept_user_or_admin() {
        let policy = AccessPolicy::default();

        assert_eq!(
            policy.decide(
                &Method::GET,
                "/api/v1/users/getUser/luna@x.com",
                &authenticated(&["ROLE_USER"])
            ),
            PolicyDecision::Permit
        );
        assert_eq!(
            policy.decide(
                &Method::GET,
                "/api/v1/users/getAllUsers",
                &authenticated(&["ROLE_ADMIN"])
            ),
            PolicyDecision::Permit
        );
        assert_eq!(
            policy.decide(
                &Method::GET,
                "/api/v1/users/getAllUsers",
                &AuthContext::Anonymous
            ),
            PolicyDecision::DenyUnauthenticated
        );
    }

    #[test]
    fn test_method_is_part_of_the_match() {
        let policy = AccessPolicy::default();
        let user = authenticated(&["ROLE_USER"]);

        // GET 규칙은 다른 메서드에 적용되지 않고 기본 권한으로 넘어갑니다.
        assert_eq!(
            policy.decide(&Method::POST, "/api/v1/users/getAllUsers", &user),
            PolicyDecision::Permit
        );
    }

    #[test]
    fn test_unmatched_paths_require_authentication() {
        let policy = AccessPolicy::default();

        assert_eq!(
            policy.decide(&Method::GET, "/api/v1/unknown", &AuthContext::Anonymous),
            PolicyDecision::DenyUnauthenticated
        );
        assert_eq!(
            policy.decide(&Method::GET, "/api/v1/unknown", &authenticated(&["ROLE_USER"])),
            PolicyDecision::Permit
        );
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let policy = AccessPolicy::new(
            vec![
                RouteRule::new("/api/admin", RequiredAuthority::AnyOf(vec![
                    "ROLE_ADMIN".to_string(),
                ])),
                RouteRule::new("/api", RequiredAuthority::Public),
            ],
            RequiredAuthority::Authenticated,
        );

        assert_eq!(
            policy.decide(&Method::GET, "/api/admin/panel", &AuthContext::Anonymous),
            PolicyDecision::DenyUnauthenticated
        );
        assert_eq!(
            policy.decide(&Method::GET, "/api/open", &AuthContext::Anonymous),
            PolicyDecision::Permit
        );
    }

    #[test]
    fn test_all_of_requires_every_role() {
        let policy = AccessPolicy::new(
            vec![RouteRule::new(
                "/api/audit",
                RequiredAuthority::AllOf(vec![
                    "ROLE_ADMIN".to_string(),
                    "ROLE_USER".to_string(),
                ]),
            )],
            RequiredAuthority::Authenticated,
        );

        assert_eq!(
            policy.decide(&Method::GET, "/api/audit", &authenticated(&["ROLE_ADMIN"])),
            PolicyDecision::DenyForbidden
        );
        assert_eq!(
            policy.decide(
                &Method::GET,
                "/api/audit",
                &authenticated(&["ROLE_ADMIN", "ROLE_USER"])
            ),
            PolicyDecision::Permit
        );
    }

    #[test]
    fn test_is_public() {
        let policy = AccessPolicy::default();

        assert!(policy.is_public(&Method::POST, "/api/v1/auth/register"));
        assert!(policy.is_public(&Method::GET, "/api-docs/openapi.json"));
        assert!(!policy.is_public(&Method::GET, "/api/v1/users/getAllUsers"));
    }
}
