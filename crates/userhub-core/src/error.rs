//! 사용자 서비스의 에러 타입.
//!
//! 이 모듈은 서비스 전반에서 사용되는 에러 타입을 정의합니다.

use thiserror::Error;

/// 핵심 서비스 에러.
#[derive(Debug, Error)]
pub enum UserHubError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 유효성 검사 에러
    #[error("유효성 검사 에러: {0}")]
    Validation(String),

    /// 인증 에러
    #[error("인증 에러: {0}")]
    Authentication(String),

    /// 권한 에러
    #[error("권한 에러: {0}")]
    Authorization(String),

    /// 토큰 에러
    #[error("토큰 에러: {0}")]
    Token(String),

    /// 데이터베이스 에러
    #[error("데이터베이스 에러: {0}")]
    Database(String),

    /// 중복 값 에러
    #[error("중복 값 에러: {0}")]
    Conflict(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 찾을 수 없음
    #[error("찾을 수 없음: {0}")]
    NotFound(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 사용자 서비스 작업을 위한 Result 타입.
pub type UserHubResult<T> = Result<T, UserHubError>;

impl UserHubError {
    /// 프로세스를 중단해야 하는 에러인지 확인합니다.
    pub fn is_fatal(&self) -> bool {
        matches!(self, UserHubError::Config(_))
    }

    /// 클라이언트 입력에서 비롯된 에러인지 확인합니다.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            UserHubError::Validation(_)
                | UserHubError::Authentication(_)
                | UserHubError::Authorization(_)
                | UserHubError::Token(_)
                | UserHubError::Conflict(_)
                | UserHubError::NotFound(_)
        )
    }
}

impl From<serde_json::Error> for UserHubError {
    fn from(err: serde_json::Error) -> Self {
        UserHubError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_fatal() {
        let config_err = UserHubError::Config("missing secret".to_string());
        assert!(config_err.is_fatal());

        let auth_err = UserHubError::Authentication("bad credentials".to_string());
        assert!(!auth_err.is_fatal());
    }

    #[test]
    fn test_error_client() {
        let conflict_err = UserHubError::Conflict("email taken".to_string());
        assert!(conflict_err.is_client_error());

        let db_err = UserHubError::Database("connection refused".to_string());
        assert!(!db_err.is_client_error());
    }
}
