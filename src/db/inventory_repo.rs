// src/db/inventory_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::inventory::{Product, ProductStatus, ProductStock},
};

// Sem pool própria: toda query roda no executor (transação RLS) recebido.
#[derive(Clone, Default)]
pub struct InventoryRepository;

impl InventoryRepository {
    pub fn new() -> Self {
        Self
    }

    // ---
    // Funções de "Leitura"
    // ---

    pub async fn get_all_products<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE tenant_id = $1 ORDER BY name ASC",
        )
            .bind(tenant_id)
            .fetch_all(executor)
            .await?;
        Ok(products)
    }

    /// Relê os produtos do carrinho travando as linhas (FOR UPDATE) até o fim da transação.
    /// Sempre em ordem de id: duas vendas com os mesmos produtos travam na mesma ordem.
    /// Produtos de outro tenant simplesmente não voltam.
    pub async fn get_products_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_ids: &[Uuid],
    ) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE tenant_id = $1 AND id = ANY($2)
            ORDER BY id
            FOR UPDATE
            "#,
        )
            .bind(tenant_id)
            .bind(product_ids)
            .fetch_all(executor)
            .await?;
        Ok(products)
    }

    // ---
    // Funções de "Escrita" (Transacionais)
    // ---

    /// Baixa o estoque e grava o novo status numa única query.
    /// A condição `stock_quantity >= $3` garante que o saldo nunca fica negativo:
    /// se outra transação consumiu o estoque, nenhuma linha volta (None).
    pub async fn decrement_stock<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        new_status: ProductStatus,
    ) -> Result<Option<ProductStock>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let stock = sqlx::query_as::<_, ProductStock>(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity - $3,
                status = $4,
                updated_at = NOW()
            WHERE id = $2 AND tenant_id = $1 AND stock_quantity >= $3
            RETURNING id, stock_quantity, status
            "#,
        )
            .bind(tenant_id)
            .bind(product_id)
            .bind(quantity)
            .bind(new_status)
            .fetch_optional(executor)
            .await?;

        Ok(stock)
    }

    // ---
    // Cadastro (CRUD do estoque)
    // ---

    pub async fn create_product<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        name: &str,
        description: Option<&str>,
        price: Decimal,
        stock_quantity: i32,
        status: ProductStatus,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (tenant_id, name, description, price, stock_quantity, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(name)
            .bind(description)
            .bind(price)
            .bind(stock_quantity)
            .bind(status)
            .fetch_one(executor)
            .await?;

        Ok(product)
    }

    /// Grava os valores finais (já mesclados pelo Service). None = produto não existe no tenant.
    pub async fn update_product<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product: &Product,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = $3,
                description = $4,
                price = $5,
                stock_quantity = $6,
                status = $7,
                updated_at = NOW()
            WHERE id = $2 AND tenant_id = $1
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(product.id)
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price)
            .bind(product.stock_quantity)
            .bind(product.status)
            .fetch_optional(executor)
            .await?;

        Ok(updated)
    }

    pub async fn product_has_sales<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let has_sales = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM sale_items si
                JOIN sales s ON s.id = si.sale_id
                WHERE s.tenant_id = $1 AND si.product_id = $2
            )
            "#,
        )
            .bind(tenant_id)
            .bind(product_id)
            .fetch_one(executor)
            .await?;

        Ok(has_sales)
    }

    /// `true` se alguma linha foi apagada.
    pub async fn delete_product<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM products WHERE id = $2 AND tenant_id = $1")
            .bind(tenant_id)
            .bind(product_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
