// src/services/auth.rs

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::TenantRepository,
    models::{auth::Claims, tenancy::Profile},
};

// O login fica no provedor de autenticação; aqui só validamos o token
// e resolvemos o usuário para a sua academia.
#[derive(Clone)]
pub struct AuthService {
    tenant_repo: TenantRepository,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(tenant_repo: TenantRepository, jwt_secret: String) -> Self {
        Self { tenant_repo, jwt_secret }
    }

    /// Valida assinatura e expiração. Devolve o ID do usuário (`sub`).
    pub fn validate_token(&self, token: &str) -> Result<Uuid, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // O provedor envia `aud` ("authenticated"), que não usamos.
        validation.validate_aud = false;

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )?;

        Ok(token_data.claims.sub)
    }

    pub async fn resolve_profile(&self, user_id: Uuid) -> Result<Profile, AppError> {
        self.tenant_repo
            .find_profile(user_id)
            .await?
            .ok_or(AppError::ProfileNotFound)
    }
}
