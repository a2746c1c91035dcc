// Cadastro de produtos contra um Postgres de verdade.
// Precisam de TEST_DATABASE_URL e rodam só com `cargo test -- --ignored`.

use std::time::Duration;

use gym_backend::{
    common::error::AppError,
    db::{InventoryRepository, SalesRepository},
    models::{
        inventory::{CreateProductRequest, ProductStatus, UpdateProductRequest},
        sales::{CartLine, CommitSaleRequest},
    },
    services::{inventory_service::InventoryService, sale_service::SaleService},
};
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

const LOW_STOCK_THRESHOLD: i32 = 5;

async fn setup() -> (PgPool, InventoryService) {
    let url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL deve apontar para um Postgres de teste");
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("Falha ao conectar no banco de teste");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Falha ao rodar as migrações");

    (pool, InventoryService::new(InventoryRepository::new(), LOW_STOCK_THRESHOLD))
}

async fn create_tenant(pool: &PgPool) -> Uuid {
    sqlx::query_scalar("INSERT INTO tenants (name) VALUES ($1) RETURNING id")
        .bind(format!("Academia {}", Uuid::new_v4()))
        .fetch_one(pool)
        .await
        .unwrap()
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn new_product(name: &str, price: &str, stock: i32) -> CreateProductRequest {
    CreateProductRequest {
        name: name.to_string(),
        description: None,
        price: dec(price),
        stock_quantity: stock,
    }
}

#[tokio::test]
#[ignore = "precisa de TEST_DATABASE_URL"]
async fn created_product_gets_status_from_initial_stock() {
    let (pool, service) = setup().await;
    let tenant = create_tenant(&pool).await;

    let full = service.create_product(&pool, tenant, &new_product("  Whey  ", "120.00", 20)).await.unwrap();
    let few = service.create_product(&pool, tenant, &new_product("Creatina", "80.00", 2)).await.unwrap();
    let none = service.create_product(&pool, tenant, &new_product("Luva", "35.00", 0)).await.unwrap();

    assert_eq!(full.name, "Whey");
    assert_eq!(full.tenant_id, tenant);
    assert_eq!(full.status, ProductStatus::InStock);
    assert_eq!(few.status, ProductStatus::LowStock);
    assert_eq!(none.status, ProductStatus::OutOfStock);

    let listed = service.get_all_products(&pool, tenant).await.unwrap();
    assert_eq!(listed.len(), 3);
}

#[tokio::test]
#[ignore = "precisa de TEST_DATABASE_URL"]
async fn restock_through_update_recomputes_status() {
    let (pool, service) = setup().await;
    let tenant = create_tenant(&pool).await;
    let product = service.create_product(&pool, tenant, &new_product("Whey", "120.00", 0)).await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let restocked = service
        .update_product(
            &mut tx,
            tenant,
            product.id,
            &UpdateProductRequest { stock_quantity: Some(12), ..Default::default() },
        )
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(restocked.stock_quantity, 12);
    assert_eq!(restocked.status, ProductStatus::InStock);
    assert_eq!(restocked.price, dec("120.00"));
    assert_eq!(restocked.name, "Whey");
}

#[tokio::test]
#[ignore = "precisa de TEST_DATABASE_URL"]
async fn product_of_another_tenant_cannot_be_changed() {
    let (pool, service) = setup().await;
    let owner = create_tenant(&pool).await;
    let other = create_tenant(&pool).await;
    let product = service.create_product(&pool, owner, &new_product("Whey", "120.00", 10)).await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let err = service
        .update_product(
            &mut tx,
            other,
            product.id,
            &UpdateProductRequest { price: Some(dec("1.00")), ..Default::default() },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ProductNotFound(id) if id == product.id));

    let err = service.delete_product(&mut tx, other, product.id).await.unwrap_err();
    assert!(matches!(err, AppError::ProductNotFound(_)));
    tx.rollback().await.unwrap();

    let listed = service.get_all_products(&pool, owner).await.unwrap();
    assert_eq!(listed[0].price, dec("120.00"));
}

#[tokio::test]
#[ignore = "precisa de TEST_DATABASE_URL"]
async fn sold_product_cannot_be_deleted() {
    let (pool, service) = setup().await;
    let tenant = create_tenant(&pool).await;
    let sold = service.create_product(&pool, tenant, &new_product("Whey", "120.00", 10)).await.unwrap();
    let unsold = service.create_product(&pool, tenant, &new_product("Luva", "35.00", 10)).await.unwrap();

    let sales = SaleService::new(
        pool.clone(),
        SalesRepository::new(),
        InventoryRepository::new(),
        LOW_STOCK_THRESHOLD,
        Duration::from_secs(10),
    );
    let cart = CommitSaleRequest {
        student_id: None,
        payment_method: "cash".to_string(),
        lines: vec![CartLine { product_id: sold.id, quantity: 1 }],
    };
    sales.commit_sale(tenant, Uuid::new_v4(), &cart).await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let err = service.delete_product(&mut tx, tenant, sold.id).await.unwrap_err();
    assert!(matches!(err, AppError::ProductInUse(id) if id == sold.id));
    assert!(!err.is_retryable());

    service.delete_product(&mut tx, tenant, unsold.id).await.unwrap();
    tx.commit().await.unwrap();

    let remaining: Vec<Uuid> = service
        .get_all_products(&pool, tenant)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(remaining, vec![sold.id]);
}
