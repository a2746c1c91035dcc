// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Sales ---
        handlers::sales::commit_sale,
        handlers::sales::list_sales,
        handlers::sales::get_sale,

        // --- Inventory ---
        handlers::inventory::list_products,
        handlers::inventory::create_product,
        handlers::inventory::update_product,
        handlers::inventory::delete_product,
    ),
    components(
        schemas(
            // --- Inventory ---
            models::inventory::ProductStatus,
            models::inventory::Product,
            models::inventory::ProductStock,
            models::inventory::CreateProductRequest,
            models::inventory::UpdateProductRequest,

            // --- Sales ---
            models::sales::PaymentMethod,
            models::sales::CartLine,
            models::sales::CommitSaleRequest,
            models::sales::Sale,
            models::sales::SaleItem,
            models::sales::CommitSaleReceipt,
            models::sales::SaleDetail,
        )
    ),
    tags(
        (name = "Sales", description = "Vendas do balcão (PDV)"),
        (name = "Inventory", description = "Produtos e Estoque")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
