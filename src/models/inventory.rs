// src/models/inventory.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// NUMERIC(10, 2): 99.999.999,99
pub const MAX_PRODUCT_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

// --- Status do Produto ---
// Derivado do estoque. Gravado no banco para as telas de listagem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "product_status", rename_all = "snake_case")] // Banco
#[serde(rename_all = "snake_case")] // JSON
pub enum ProductStatus {
    InStock,    // Vira "in_stock"
    LowStock,   // Vira "low_stock"
    OutOfStock, // Vira "out_of_stock"
}

impl ProductStatus {
    /// Calcula o status a partir do saldo.
    /// Zero é sempre "esgotado"; abaixo do piso configurado é "estoque baixo".
    pub fn from_stock(stock_quantity: i32, low_stock_threshold: i32) -> Self {
        if stock_quantity <= 0 {
            ProductStatus::OutOfStock
        } else if stock_quantity < low_stock_threshold {
            ProductStatus::LowStock
        } else {
            ProductStatus::InStock
        }
    }

    pub fn allows_sale(&self) -> bool {
        !matches!(self, ProductStatus::OutOfStock)
    }
}

// --- Produto ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Camiseta Academia")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "49.90")]
    pub price: Decimal,
    #[schema(example = 12)]
    pub stock_quantity: i32,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Saldo após a venda ---
// O que o frontend precisa para atualizar a tela sem recarregar a lista inteira.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductStock {
    #[sqlx(rename = "id")]
    pub product_id: Uuid,
    pub stock_quantity: i32,
    pub status: ProductStatus,
}

// ---
// Payloads do cadastro de produtos
// ---
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200, message = "O nome deve ter entre 1 e 200 caracteres."))]
    #[schema(example = "Camiseta Academia")]
    pub name: String,

    pub description: Option<String>,

    #[validate(custom(function = "validate_price"))]
    #[schema(example = "49.90")]
    pub price: Decimal,

    #[validate(range(min = 0, message = "O estoque não pode ser negativo."))]
    #[serde(default)]
    #[schema(example = 12)]
    pub stock_quantity: i32,
}

// Atualização parcial: campo ausente mantém o valor atual.
// O status nunca vem do cliente; é recalculado a partir do estoque final.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200, message = "O nome deve ter entre 1 e 200 caracteres."))]
    pub name: Option<String>,

    pub description: Option<String>,

    #[validate(custom(function = "validate_price"))]
    pub price: Option<Decimal>,

    #[validate(range(min = 0, message = "O estoque não pode ser negativo."))]
    pub stock_quantity: Option<i32>,
}

impl UpdateProductRequest {
    /// Aplica o payload sobre o produto atual e recalcula o status.
    pub fn apply_to(&self, mut product: Product, low_stock_threshold: i32) -> Product {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(description) = &self.description {
            product.description = Some(description.clone());
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock_quantity {
            product.stock_quantity = stock;
        }
        product.status = ProductStatus::from_stock(product.stock_quantity, low_stock_threshold);
        product
    }
}

/// Preço precisa caber em NUMERIC(10, 2): não negativo, até 2 casas decimais.
pub fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    let fits = !price.is_sign_negative() && *price <= MAX_PRODUCT_PRICE && price.normalize().scale() <= 2;
    if !fits {
        let mut err = ValidationError::new("price");
        err.message = Some("O preço deve estar entre 0 e 99999999.99, com até 2 casas decimais.".into());
        return Err(err);
    }
    Ok(())
}
