use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::IdentityDirectory;
use crate::database::{models::UserProfile, utils::sql};

const USER_COLUMNS: &str = r#"
    id,
    full_name,
    email,
    department,
    role,
    eligible_for_shift_work
"#;

/// Identity lookups served from the `users` table.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityDirectory for PgUserDirectory {
    /// Get a user profile by ID
    async fn get_user(&self, id: Uuid) -> Result<Option<UserProfile>> {
        let user = sqlx::query_as::<_, UserProfile>(&sql(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<UserProfile>> {
        let users = sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY full_name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}
