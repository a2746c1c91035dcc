// src/db/sales_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::sales::{PaymentMethod, Sale, SaleItem},
};

const SALE_COLUMNS: &str =
    "id, tenant_id, student_id, created_by, payment_method, total_amount, created_at";

#[derive(Clone, Default)]
pub struct SalesRepository;

impl SalesRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  ESCRITA (sempre dentro da transação do commit)
    // =========================================================================

    pub async fn create_sale<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        student_id: Option<Uuid>,
        created_by: Uuid,
        payment_method: PaymentMethod,
        total_amount: Decimal,
    ) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            r#"
            INSERT INTO sales (tenant_id, student_id, created_by, payment_method, total_amount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {SALE_COLUMNS}
            "#
        ))
            .bind(tenant_id)
            .bind(student_id)
            .bind(created_by)
            .bind(payment_method)
            .bind(total_amount)
            .fetch_one(executor)
            .await?;

        Ok(sale)
    }

    pub async fn add_sale_item<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        unit_price: Decimal,
        total_price: Decimal,
        position: i32,
    ) -> Result<SaleItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, SaleItem>(
            r#"
            INSERT INTO sale_items (sale_id, product_id, quantity, unit_price, total_price, position)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, sale_id, product_id, quantity, unit_price, total_price
            "#,
        )
            .bind(sale_id)
            .bind(product_id)
            .bind(quantity)
            .bind(unit_price)
            .bind(total_price)
            .bind(position)
            .fetch_one(executor)
            .await?;

        Ok(item)
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    /// Aluno precisa existir e ser da mesma academia.
    pub async fn student_belongs_to_tenant<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        student_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM students WHERE id = $1 AND tenant_id = $2)",
        )
            .bind(student_id)
            .bind(tenant_id)
            .fetch_one(executor)
            .await?;

        Ok(exists)
    }

    pub async fn list_sales<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            r#"
            SELECT {SALE_COLUMNS} FROM sales
            WHERE tenant_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#
        ))
            .bind(tenant_id)
            .bind(limit)
            .fetch_all(executor)
            .await?;

        Ok(sales)
    }

    pub async fn get_sale<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        sale_id: Uuid,
    ) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = $1 AND tenant_id = $2"
        ))
            .bind(sale_id)
            .bind(tenant_id)
            .fetch_optional(executor)
            .await?;

        Ok(sale)
    }

    pub async fn list_sale_items<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        sale_id: Uuid,
    ) -> Result<Vec<SaleItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT si.id, si.sale_id, si.product_id, si.quantity, si.unit_price, si.total_price
            FROM sale_items si
            JOIN sales s ON s.id = si.sale_id
            WHERE s.tenant_id = $1 AND si.sale_id = $2
            ORDER BY si.position ASC
            "#,
        )
            .bind(tenant_id)
            .bind(sale_id)
            .fetch_all(executor)
            .await?;

        Ok(items)
    }
}
