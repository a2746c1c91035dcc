// src/services/inventory_service.rs

use sqlx::{Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::InventoryRepository,
    models::inventory::{CreateProductRequest, Product, ProductStatus, UpdateProductRequest},
};

#[derive(Clone)]
pub struct InventoryService {
    inventory_repo: InventoryRepository,
    low_stock_threshold: i32,
}

impl InventoryService {
    pub fn new(inventory_repo: InventoryRepository, low_stock_threshold: i32) -> Self {
        Self { inventory_repo, low_stock_threshold }
    }

    // Lista usada pelo PDV para montar o carrinho e atualizar a tela depois da venda.
    pub async fn get_all_products<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.inventory_repo.get_all_products(executor, tenant_id).await
    }

    // --- CREATE PRODUCT ---
    // O status nasce do estoque inicial, com o mesmo piso usado na venda.
    pub async fn create_product<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        request: &CreateProductRequest,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let status = ProductStatus::from_stock(request.stock_quantity, self.low_stock_threshold);

        let product = self.inventory_repo
            .create_product(
                executor,
                tenant_id,
                request.name.trim(),
                request.description.as_deref(),
                request.price,
                request.stock_quantity,
                status,
            )
            .await?;

        tracing::info!(product_id = %product.id, stock = product.stock_quantity, status = ?product.status, "produto cadastrado");
        Ok(product)
    }

    // --- UPDATE PRODUCT (inclui reposição de estoque) ---
    // Trava a linha para não cruzar com uma venda em andamento.
    pub async fn update_product(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        product_id: Uuid,
        request: &UpdateProductRequest,
    ) -> Result<Product, AppError> {
        let current = self.inventory_repo
            .get_products_for_update(&mut *conn, tenant_id, &[product_id])
            .await?
            .into_iter()
            .next()
            .ok_or(AppError::ProductNotFound(product_id))?;

        let merged = request.apply_to(current, self.low_stock_threshold);

        let updated = self.inventory_repo
            .update_product(&mut *conn, tenant_id, &merged)
            .await?
            .ok_or(AppError::ProductNotFound(product_id))?;

        tracing::info!(%product_id, stock = updated.stock_quantity, status = ?updated.status, "produto atualizado");
        Ok(updated)
    }

    // --- DELETE PRODUCT ---
    // Produto com vendas fica: os itens de venda apontam para ele.
    pub async fn delete_product(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<(), AppError> {
        let locked = self.inventory_repo
            .get_products_for_update(&mut *conn, tenant_id, &[product_id])
            .await?;
        if locked.is_empty() {
            return Err(AppError::ProductNotFound(product_id));
        }

        if self.inventory_repo.product_has_sales(&mut *conn, tenant_id, product_id).await? {
            return Err(AppError::ProductInUse(product_id));
        }

        if !self.inventory_repo.delete_product(&mut *conn, tenant_id, product_id).await? {
            return Err(AppError::ProductNotFound(product_id));
        }

        tracing::info!(%product_id, "produto excluído");
        Ok(())
    }
}
