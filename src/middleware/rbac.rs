// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::tenancy::AppRole,
};

/// 1. O Trait que define quem pode acessar a rota
pub trait RoleDef: Send + Sync + 'static {
    fn allowed() -> &'static [AppRole];
    fn slug() -> &'static str;
}

/// 2. O Extractor (Guardião)
pub struct RequireRole<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_headers(&parts.headers);

        // A. Usuário (colocado pelo tenant_guard)
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or_else(|| AppError::InvalidToken.to_api_error(&locale))?;

        // B. Verifica no Banco
        let has_role = app_state
            .rbac_repo
            .user_has_any_role(user.0, T::allowed())
            .await
            .map_err(|e| e.to_api_error(&locale))?;

        if !has_role {
            return Err(AppError::MissingRole(T::slug()).to_api_error(&locale));
        }

        Ok(RequireRole(PhantomData))
    }
}

// ---
// DEFINIÇÃO DOS PAPÉIS (TIPOS)
// ---

// Balcão: quem pode registrar e consultar vendas.
pub struct SalesOperator;
impl RoleDef for SalesOperator {
    fn allowed() -> &'static [AppRole] {
        &[AppRole::Admin, AppRole::Staff]
    }
    fn slug() -> &'static str { "admin|staff" }
}

// Cadastro e reposição de produtos: só a gerência.
pub struct InventoryManager;
impl RoleDef for InventoryManager {
    fn allowed() -> &'static [AppRole] {
        &[AppRole::Admin]
    }
    fn slug() -> &'static str { "admin" }
}
