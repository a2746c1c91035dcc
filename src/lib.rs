// src/lib.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::auth::tenant_guard;

/// Monta o router completo. Usado pelo binário e pelos testes de integração.
pub fn build_router(app_state: AppState) -> Router {
    // Tudo abaixo exige token e academia conferida
    let protected_routes = Router::new()
        // Balcão: registrar e consultar vendas
        .route("/api/sales"
               ,post(handlers::sales::commit_sale)
               .get(handlers::sales::list_sales)
        )
        .route("/api/sales/{id}", get(handlers::sales::get_sale))
        // Estoque: consulta para todos, cadastro só para a gerência (RequireRole)
        .route("/api/products"
               ,get(handlers::inventory::list_products)
               .post(handlers::inventory::create_product)
        )
        .route("/api/products/{id}"
               ,put(handlers::inventory::update_product)
               .delete(handlers::inventory::delete_product)
        )
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .merge(protected_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}
