//! User persistence repository.
//!
//! Handles database operations for accounts, their phone numbers and
//! their role assignments.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use userhub_core::{Phone, Role, User};

/// Database representation of a user account row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub token: Option<String>,
    pub is_active: bool,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

impl UserRow {
    /// 행에 전화번호와 역할을 합쳐 도메인 사용자로 변환합니다.
    fn into_user(self, phones: Vec<Phone>, roles: Vec<String>) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            password: self.password,
            token: self.token,
            is_active: self.is_active,
            created: self.created,
            modified: self.modified,
            last_login: self.last_login,
            phones,
            roles,
        }
    }
}

/// Phone number row attached to a user.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PhoneRow {
    user_id: Uuid,
    number: String,
    city_code: String,
    country_code: String,
}

impl From<PhoneRow> for Phone {
    fn from(row: PhoneRow) -> Self {
        Phone {
            number: row.number,
            city_code: row.city_code,
            country_code: row.country_code,
        }
    }
}

/// Activation state and role names for one account.
///
/// 인증 미들웨어가 토큰 주체를 대조할 때 전체 계정 행을 읽지 않고
/// 이 축약 형태만 조회합니다.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserIdentityRow {
    pub is_active: bool,
    pub roles: Vec<String>,
}

/// User repository for database operations.
pub struct UserRepository;

impl UserRepository {
    /// Get a user by email, including phones and roles.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let phones = Self::phones_for(pool, row.id).await?;
        let roles = Self::roles_for(pool, row.id).await?;

        Ok(Some(row.into_user(phones, roles)))
    }

    /// Get all users ordered by creation time, including phones and roles.
    pub async fn find_all(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        let rows = sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY created")
            .fetch_all(pool)
            .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let phone_rows = sqlx::query_as::<_, PhoneRow>(
            r#"
            SELECT user_id, number, city_code, country_code
            FROM phones
            WHERE user_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        let role_rows = sqlx::query_as::<_, (Uuid, String)>(
            r#"
            SELECT ur.user_id, r.name
            FROM users_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = ANY($1)
            ORDER BY r.name
            "#,
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        let mut phones_by_user: std::collections::HashMap<Uuid, Vec<Phone>> =
            std::collections::HashMap::new();
        for phone_row in phone_rows {
            phones_by_user
                .entry(phone_row.user_id)
                .or_default()
                .push(phone_row.into());
        }

        let mut roles_by_user: std::collections::HashMap<Uuid, Vec<String>> =
            std::collections::HashMap::new();
        for (user_id, name) in role_rows {
            roles_by_user.entry(user_id).or_default().push(name);
        }

        let users = rows
            .into_iter()
            .map(|row| {
                let phones = phones_by_user.remove(&row.id).unwrap_or_default();
                let roles = roles_by_user.remove(&row.id).unwrap_or_default();
                row.into_user(phones, roles)
            })
            .collect();

        Ok(users)
    }

    /// Get the activation flag and role names for an account.
    pub async fn find_identity(
        pool: &PgPool,
        email: &str,
    ) -> Result<Option<UserIdentityRow>, sqlx::Error> {
        let identity = sqlx::query_as::<_, UserIdentityRow>(
            r#"
            SELECT u.is_active,
                   COALESCE(
                       array_agg(r.name) FILTER (WHERE r.name IS NOT NULL),
                       ARRAY[]::VARCHAR[]
                   ) AS roles
            FROM users u
            LEFT JOIN users_roles ur ON ur.user_id = u.id
            LEFT JOIN roles r ON r.id = ur.role_id
            WHERE u.email = $1
            GROUP BY u.id
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(identity)
    }

    /// Check if a user exists by email.
    pub async fn exists_by_email(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
        let result: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(pool)
                .await?;

        Ok(result.0)
    }

    /// Save a new user with phones and resolved role assignments.
    ///
    /// 사용자 행, 전화번호, 역할 연결을 한 트랜잭션으로 기록합니다.
    pub async fn create(pool: &PgPool, user: &User, roles: &[Role]) -> Result<User, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, name, email, password, token, is_active, created, modified, last_login)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.token)
        .bind(user.is_active)
        .bind(user.created)
        .bind(user.modified)
        .bind(user.last_login)
        .fetch_one(&mut *tx)
        .await?;

        for phone in &user.phones {
            sqlx::query(
                r#"
                INSERT INTO phones (user_id, number, city_code, country_code)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(row.id)
            .bind(&phone.number)
            .bind(&phone.city_code)
            .bind(&phone.country_code)
            .execute(&mut *tx)
            .await?;
        }

        for role in roles {
            sqlx::query("INSERT INTO users_roles (user_id, role_id) VALUES ($1, $2)")
                .bind(row.id)
                .bind(role.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        let role_names = roles.iter().map(|r| r.name.clone()).collect();
        Ok(row.into_user(user.phones.clone(), role_names))
    }

    /// Persist an updated profile: name, phones and role assignments.
    ///
    /// 전화번호와 역할 연결은 통째로 교체합니다. 변경 시각은 갱신되고
    /// 계정은 활성 상태로 유지됩니다.
    pub async fn update_profile(
        pool: &PgPool,
        user: &User,
        roles: &[Role],
    ) -> Result<User, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET name = $2, is_active = TRUE, modified = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM phones WHERE user_id = $1")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        for phone in &user.phones {
            sqlx::query(
                r#"
                INSERT INTO phones (user_id, number, city_code, country_code)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(user.id)
            .bind(&phone.number)
            .bind(&phone.city_code)
            .bind(&phone.country_code)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM users_roles WHERE user_id = $1")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        for role in roles {
            sqlx::query("INSERT INTO users_roles (user_id, role_id) VALUES ($1, $2)")
                .bind(user.id)
                .bind(role.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        let role_names = roles.iter().map(|r| r.name.clone()).collect();
        Ok(row.into_user(user.phones.clone(), role_names))
    }

    /// Change the email address of an account.
    pub async fn update_email(
        pool: &PgPool,
        current_email: &str,
        new_email: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $2, modified = NOW()
            WHERE email = $1
            "#,
        )
        .bind(current_email)
        .bind(new_email)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Self::find_by_email(pool, new_email).await
    }

    /// Record a successful login: last_login timestamp and issued token.
    pub async fn record_login(pool: &PgPool, email: &str, token: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET last_login = NOW(), modified = NOW(), token = $2
            WHERE email = $1
            "#,
        )
        .bind(email)
        .bind(token)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Delete a user by email.
    ///
    /// Phones and role assignments are removed by cascade.
    pub async fn delete_by_email(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE email = $1")
            .bind(email)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn phones_for(pool: &PgPool, user_id: Uuid) -> Result<Vec<Phone>, sqlx::Error> {
        let rows = sqlx::query_as::<_, PhoneRow>(
            r#"
            SELECT user_id, number, city_code, country_code
            FROM phones
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(Phone::from).collect())
    }

    async fn roles_for(pool: &PgPool, user_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT r.name
            FROM users_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
