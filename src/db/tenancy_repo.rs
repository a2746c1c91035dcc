// src/db/tenancy_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::tenancy::Profile};

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolve o usuário para a sua (única) academia.
    /// Esta é a verificação de autorização mais importante: o tenant vem daqui,
    /// nunca de um valor global.
    pub async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT id, tenant_id, full_name, email, created_at, updated_at FROM profiles WHERE id = $1",
        )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(profile)
    }
}
