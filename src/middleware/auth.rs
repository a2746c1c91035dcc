// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        i18n::Locale,
        tenancy::{tenant_id_from_headers, TenantContext},
    },
};

// Autenticação + academia. O tenant do cabeçalho precisa bater com o do perfil;
// sem cabeçalho, vale o tenant do perfil.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    mut request: axum::extract::Request,
    next: Next,
) -> Result<Response, ApiError> {
    let locale = Locale::from_headers(request.headers());

    let (user_id, tenant_id) = resolve_tenant(&app_state, request.headers())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    request.extensions_mut().insert(AuthenticatedUser(user_id));
    request.extensions_mut().insert(TenantContext(tenant_id));
    Ok(next.run(request).await)
}

async fn resolve_tenant(
    app_state: &AppState,
    headers: &HeaderMap,
) -> Result<(Uuid, Uuid), AppError> {
    let user_id = authenticate(app_state, headers)?;
    let requested_tenant = tenant_id_from_headers(headers)?;

    let profile = app_state.auth_service.resolve_profile(user_id).await?;

    if let Some(tenant_id) = requested_tenant {
        if tenant_id != profile.tenant_id {
            tracing::warn!(%user_id, %tenant_id, "acesso negado a outra academia");
            return Err(AppError::TenantMismatch);
        }
    }

    Ok((user_id, profile.tenant_id))
}

fn authenticate(app_state: &AppState, headers: &HeaderMap) -> Result<Uuid, AppError> {
    let bearer = headers
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AppError::InvalidToken)?;

    app_state.auth_service.validate_token(bearer.token())
}

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Uuid);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or(AppError::InvalidToken)
    }
}
