use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::models::User;

use super::StoreError;

const USER_COLUMNS: &str = "id, email, full_name, role, is_active, created_at, updated_at";

/// Identity and enrollment lookups owned by the surrounding platform.
#[async_trait]
pub(crate) trait AccessDirectory: Send + Sync {
    async fn find_user(&self, user_id: &str) -> Result<Option<User>, StoreError>;

    async fn is_enrolled(&self, student_id: &str, course_id: &str) -> Result<bool, StoreError>;
}

pub(crate) struct PgAccessDirectory {
    pool: PgPool,
}

impl PgAccessDirectory {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessDirectory for PgAccessDirectory {
    async fn find_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    async fn is_enrolled(&self, student_id: &str, course_id: &str) -> Result<bool, StoreError> {
        let enrolled: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM enrollments
                WHERE course_id = $1 AND student_id = $2 AND is_active = TRUE
            )",
        )
        .bind(course_id)
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(enrolled)
    }
}
