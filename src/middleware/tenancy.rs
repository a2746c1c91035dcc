// src/middleware/tenancy.rs

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::common::error::AppError;

// O nome do nosso cabeçalho HTTP customizado
const TENANT_ID_HEADER: &str = "x-tenant-id";

// O tenant já conferido pelo `tenant_guard` (nunca o valor cru do cabeçalho).
#[derive(Debug, Clone, Copy)]
pub struct TenantContext(pub Uuid);

/// Lê o X-Tenant-ID, se vier. Presente e inválido é erro.
pub fn tenant_id_from_headers(headers: &HeaderMap) -> Result<Option<Uuid>, AppError> {
    let Some(value) = headers.get(TENANT_ID_HEADER) else {
        return Ok(None);
    };

    let value_str = value.to_str().map_err(|_| AppError::InvalidTenantHeader)?;
    let tenant_id = Uuid::parse_str(value_str.trim()).map_err(|_| AppError::InvalidTenantHeader)?;

    Ok(Some(tenant_id))
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Rota sem tenant_guard: trata como acesso negado, não como erro interno.
        parts
            .extensions
            .get::<TenantContext>()
            .copied()
            .ok_or(AppError::TenantMismatch)
    }
}
