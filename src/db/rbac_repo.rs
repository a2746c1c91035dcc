// src/db/rbac_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::tenancy::AppRole};

#[derive(Clone)]
pub struct RbacRepository {
    pool: PgPool,
}

impl RbacRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// `true` se o usuário tiver pelo menos um dos papéis.
    pub async fn user_has_any_role(
        &self,
        user_id: Uuid,
        roles: &[AppRole],
    ) -> Result<bool, AppError> {
        let has_role = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM user_roles WHERE user_id = $1 AND role = ANY($2))",
        )
            .bind(user_id)
            .bind(roles)
            .fetch_one(&self.pool)
            .await?;

        Ok(has_role)
    }
}
