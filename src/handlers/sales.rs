// src/handlers/sales.rs

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::begin_rls_transaction,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{RequireRole, SalesOperator},
        tenancy::TenantContext,
    },
    models::sales::{CommitSaleReceipt, CommitSaleRequest, Sale, SaleDetail},
};

// POST /api/sales
#[utoipa::path(
    post,
    path = "/api/sales",
    tag = "Sales",
    request_body = CommitSaleRequest,
    responses(
        (status = 201, description = "Venda registrada e estoque baixado", body = CommitSaleReceipt),
        (status = 400, description = "Carrinho inválido"),
        (status = 409, description = "Estoque alterado por outra venda; repita a operação"),
        (status = 422, description = "Estoque insuficiente, produto indisponível ou aluno inexistente"),
        (status = 503, description = "Falha ou tempo limite do banco; nada foi gravado")
    ),
    params(
        ("x-tenant-id" = Option<Uuid>, Header, description = "ID da Academia")
    ),
    security(("api_jwt" = []))
)]
pub async fn commit_sale(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireRole<SalesOperator>,
    payload: Result<Json<CommitSaleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // JSON malformado cai na mesma taxonomia (400 + details), no idioma do cliente
    let Json(payload) = payload.map_err(|rejection| AppError::from(rejection).to_api_error(&locale))?;

    // Validação, preço e transação ficam todos no Service
    let receipt = app_state
        .sale_service
        .commit_sale(tenant.0, user.0, &payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListSalesQuery {
    /// Máximo de vendas (1 a 100, padrão 50)
    pub limit: Option<i64>,
}

// GET /api/sales
#[utoipa::path(
    get,
    path = "/api/sales",
    tag = "Sales",
    params(
        ListSalesQuery,
        ("x-tenant-id" = Option<Uuid>, Header, description = "ID da Academia")
    ),
    responses(
        (status = 200, description = "Vendas mais recentes", body = Vec<Sale>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_sales(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireRole<SalesOperator>,
    Query(query): Query<ListSalesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut tx = begin_rls_transaction(&app_state.db_pool, tenant.0, user.0)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let sales = app_state
        .sale_service
        .list_sales(&mut *tx, tenant.0, query.limit)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(sales)))
}

// GET /api/sales/{id}
#[utoipa::path(
    get,
    path = "/api/sales/{id}",
    tag = "Sales",
    params(
        ("id" = Uuid, Path, description = "ID da venda"),
        ("x-tenant-id" = Option<Uuid>, Header, description = "ID da Academia")
    ),
    responses(
        (status = 200, description = "Venda com seus itens", body = SaleDetail),
        (status = 404, description = "Venda não encontrada nesta academia")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_sale(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireRole<SalesOperator>,
    Path(sale_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut tx = begin_rls_transaction(&app_state.db_pool, tenant.0, user.0)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let detail = app_state
        .sale_service
        .get_sale_detail(&mut *tx, tenant.0, sale_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(detail)))
}
