//! Repository pattern for database operations.
//!
//! 데이터베이스 접근 로직을 라우트 핸들러에서 분리하여 관리합니다.
//! 모든 Repository는 static methods 패턴을 사용합니다.

pub mod roles;
pub mod users;

pub use roles::{RoleRecord, RoleRepository};
pub use users::{UserIdentityRow, UserRepository, UserRow};

use sqlx::PgPool;

/// 내장된 마이그레이션을 실행합니다. 서버 기동 시 한 번 호출됩니다.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}
