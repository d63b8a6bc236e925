//! Role catalog repository.

use sqlx::PgPool;

use userhub_core::Role;

/// Database representation of a role row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoleRecord {
    pub id: i64,
    pub name: String,
}

impl From<RoleRecord> for Role {
    fn from(record: RoleRecord) -> Self {
        Role {
            id: record.id,
            name: record.name,
        }
    }
}

/// Role repository for database operations.
pub struct RoleRepository;

impl RoleRepository {
    /// Resolve role names against the catalog.
    ///
    /// 반환 개수가 요청 개수보다 적으면 알 수 없는 역할이 섞여 있다는
    /// 뜻입니다. 호출자가 개수를 비교해 거부합니다.
    pub async fn find_by_names(pool: &PgPool, names: &[String]) -> Result<Vec<Role>, sqlx::Error> {
        let records = sqlx::query_as::<_, RoleRecord>(
            "SELECT id, name FROM roles WHERE name = ANY($1) ORDER BY name",
        )
        .bind(names)
        .fetch_all(pool)
        .await?;

        Ok(records.into_iter().map(Role::from).collect())
    }

    /// Get every role in the catalog.
    pub async fn find_all(pool: &PgPool) -> Result<Vec<Role>, sqlx::Error> {
        let records =
            sqlx::query_as::<_, RoleRecord>("SELECT id, name FROM roles ORDER BY name")
                .fetch_all(pool)
                .await?;

        Ok(records.into_iter().map(Role::from).collect())
    }
}
