// src/handlers/inventory.rs

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::begin_rls_transaction,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{InventoryManager, RequireRole},
        tenancy::TenantContext,
    },
    models::inventory::{CreateProductRequest, Product, UpdateProductRequest},
};

// GET /api/products
#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Inventory",
    params(
        ("x-tenant-id" = Option<Uuid>, Header, description = "ID da Academia")
    ),
    responses(
        (status = 200, description = "Produtos da academia com saldo e status", body = Vec<Product>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut tx = begin_rls_transaction(&app_state.db_pool, tenant.0, user.0)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let products = app_state
        .inventory_service
        .get_all_products(&mut *tx, tenant.0)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(products)))
}

// POST /api/products
#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Inventory",
    request_body = CreateProductRequest,
    params(
        ("x-tenant-id" = Option<Uuid>, Header, description = "ID da Academia")
    ),
    responses(
        (status = 201, description = "Produto cadastrado (status calculado pelo estoque)", body = Product),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireRole<InventoryManager>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(|rejection| AppError::from(rejection).to_api_error(&locale))?;

    // Validação padrão do Validator
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let mut tx = begin_rls_transaction(&app_state.db_pool, tenant.0, user.0)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let product = app_state
        .inventory_service
        .create_product(&mut *tx, tenant.0, &payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(product)))
}

// PUT /api/products/{id}
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    tag = "Inventory",
    request_body = UpdateProductRequest,
    params(
        ("id" = Uuid, Path, description = "ID do produto"),
        ("x-tenant-id" = Option<Uuid>, Header, description = "ID da Academia")
    ),
    responses(
        (status = 200, description = "Produto atualizado (status recalculado)", body = Product),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Produto não encontrado nesta academia")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_product(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireRole<InventoryManager>,
    Path(product_id): Path<Uuid>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(|rejection| AppError::from(rejection).to_api_error(&locale))?;

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let mut tx = begin_rls_transaction(&app_state.db_pool, tenant.0, user.0)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let product = app_state
        .inventory_service
        .update_product(&mut *tx, tenant.0, product_id, &payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(product)))
}

// DELETE /api/products/{id}
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    tag = "Inventory",
    params(
        ("id" = Uuid, Path, description = "ID do produto"),
        ("x-tenant-id" = Option<Uuid>, Header, description = "ID da Academia")
    ),
    responses(
        (status = 204, description = "Produto excluído"),
        (status = 404, description = "Produto não encontrado nesta academia"),
        (status = 409, description = "Produto já tem vendas registradas")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_product(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireRole<InventoryManager>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut tx = begin_rls_transaction(&app_state.db_pool, tenant.0, user.0)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    app_state
        .inventory_service
        .delete_product(&mut *tx, tenant.0, product_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}
