//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 모든 API 핸들러에서 공유되는 상태를 관리합니다.
//! Arc로 래핑되어 여러 요청 간에 안전하게 공유됩니다.

use regex::Regex;
use userhub_core::AppConfig;

use crate::auth::{AccessPolicy, TokenCodec};

/// 애플리케이션 공유 상태.
///
/// 이 구조체는 모든 API 핸들러에서 접근할 수 있는 공유 리소스를 포함합니다.
/// Axum의 State extractor를 통해 핸들러에 주입됩니다.
#[derive(Clone)]
pub struct AppState {
    /// 로드된 전체 설정 (유효성 검사 정책 포함)
    pub config: AppConfig,

    /// 데이터베이스 연결 풀 (PostgreSQL)
    pub db_pool: Option<sqlx::PgPool>,

    /// 토큰 발급/검증기
    pub token_codec: TokenCodec,

    /// 경로/메서드별 필요 권한 테이블
    pub policy: AccessPolicy,

    /// 시작 시점에 컴파일된 이메일 형식 정규식
    pub email_regex: Regex,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 새로운 AppState 생성.
    ///
    /// 토큰 검증기와 이메일 정규식은 기동 시점에 이미 만들어져 있어야
    /// 합니다. 권한 테이블은 설정의 공개 경로 목록으로부터 구성됩니다.
    pub fn new(config: AppConfig, token_codec: TokenCodec, email_regex: Regex) -> Self {
        let policy = AccessPolicy::from_config(&config.auth);

        Self {
            config,
            db_pool: None,
            token_codec,
            policy,
            email_regex,
            started_at: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 데이터베이스 연결 설정.
    pub fn with_db_pool(mut self, pool: sqlx::PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// 데이터베이스 연결 설정 여부 확인.
    pub fn has_db_pool(&self) -> bool {
        self.db_pool.is_some()
    }

    /// 서버 업타임(초) 반환.
    pub fn uptime_secs(&self) -> i64 {
        chrono::Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds()
    }

    /// 데이터베이스 연결 상태 확인.
    pub async fn is_db_healthy(&self) -> bool {
        if let Some(pool) = &self.db_pool {
            sqlx::query("SELECT 1").fetch_one(pool).await.is_ok()
        } else {
            false
        }
    }
}

/// 테스트용 AppState 생성 헬퍼.
///
/// 실제 DB 연결 없이 테스트할 수 있는 최소한의 상태를 생성합니다.
/// 미들웨어는 풀이 없으면 검증된 토큰 클레임만으로 주체를 구성하므로
/// 라우터 테스트를 그대로 돌릴 수 있습니다.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state() -> AppState {
    let mut config = AppConfig::default();
    config.auth.secret = "test-secret-key-for-router-tests-at-least-32-chars".to_string();

    let token_codec =
        TokenCodec::from_config(&config.auth).expect("Failed to create TokenCodec for test");
    let email_regex =
        Regex::new(&config.validation.email_pattern).expect("Failed to compile email pattern");

    AppState::new(config, token_codec, email_regex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_state_has_no_pool() {
        let state = create_test_state();
        assert!(!state.has_db_pool());
        assert!(!state.version.is_empty());
    }

    #[tokio::test]
    async fn test_db_health_without_pool() {
        let state = create_test_state();
        assert!(!state.is_db_healthy().await);
    }
}
