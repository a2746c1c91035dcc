// src/models/sales.rs

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::inventory::ProductStock;

// --- Forma de Pagamento ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,   // Dinheiro
    Credit, // Cartão de Crédito
    Debit,  // Cartão de Débito
    Pix,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Credit => "credit",
            PaymentMethod::Debit => "debit",
            PaymentMethod::Pix => "pix",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPaymentMethod(pub String);

impl FromStr for PaymentMethod {
    type Err = UnknownPaymentMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "credit" => Ok(PaymentMethod::Credit),
            "debit" => Ok(PaymentMethod::Debit),
            "pix" => Ok(PaymentMethod::Pix),
            _ => Err(UnknownPaymentMethod(s.to_string())),
        }
    }
}

fn validate_payment_method(value: &str) -> Result<(), ValidationError> {
    if value.parse::<PaymentMethod>().is_err() {
        let mut err = ValidationError::new("payment_method");
        err.add_param("value".into(), &value);
        err.message = Some("Forma de pagamento inválida. Use cash, credit, debit ou pix.".into());
        return Err(err);
    }
    Ok(())
}

// ---
// Payload: o carrinho montado no frontend
// ---
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: Uuid,

    #[validate(range(min = 1, message = "A quantidade deve ser no mínimo 1."))]
    #[schema(example = 2)]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommitSaleRequest {
    // Venda avulsa (sem aluno) é permitida.
    pub student_id: Option<Uuid>,

    #[validate(custom(function = "validate_payment_method"))]
    #[schema(example = "pix")]
    pub payment_method: String,

    #[validate(length(min = 1, message = "O carrinho está vazio."), nested)]
    pub lines: Vec<CartLine>,
}

impl CommitSaleRequest {
    /// Só deve ser chamado depois de `validate()`.
    pub fn parsed_payment_method(&self) -> Result<PaymentMethod, UnknownPaymentMethod> {
        self.payment_method.parse()
    }

    /// Soma as quantidades por produto, em ordem de id.
    /// A ordem é a mesma usada nos locks, o que evita deadlock entre vendas concorrentes.
    pub fn quantities_by_product(&self) -> BTreeMap<Uuid, i64> {
        let mut totals = BTreeMap::new();
        for line in &self.lines {
            *totals.entry(line.product_id).or_insert(0i64) += i64::from(line.quantity);
        }
        totals
    }
}

// --- Venda ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub student_id: Option<Uuid>,
    pub created_by: Uuid,
    pub payment_method: PaymentMethod,
    #[schema(example = "129.70")]
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

// --- Item da Venda ---
// O preço unitário é uma cópia do preço do produto no momento da venda.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    #[schema(example = 2)]
    pub quantity: i32,
    #[schema(example = "49.90")]
    pub unit_price: Decimal,
    #[schema(example = "99.80")]
    pub total_price: Decimal,
}

// Resposta do commit
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommitSaleReceipt {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub products: Vec<ProductStock>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}
