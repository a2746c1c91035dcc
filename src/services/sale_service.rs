// src/services/sale_service.rs

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use rust_decimal::Decimal;
use sqlx::{Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    common::{
        db_utils::{begin_rls_transaction, set_local_statement_timeout},
        error::{amount_out_of_range, AppError, MAX_STORED_AMOUNT},
    },
    db::{InventoryRepository, SalesRepository},
    models::{
        inventory::{Product, ProductStatus},
        sales::{CartLine, CommitSaleReceipt, CommitSaleRequest, PaymentMethod, Sale, SaleDetail},
    },
};

// Um conflito de concorrência é repetido uma vez (do zero) e depois devolvido ao cliente.
const MAX_COMMIT_ATTEMPTS: u32 = 2;

pub const DEFAULT_SALES_PAGE: i64 = 50;
pub const MAX_SALES_PAGE: i64 = 100;

// Linha do carrinho com o preço do banco, capturado no momento da venda.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

#[derive(Clone)]
pub struct SaleService {
    pool: PgPool,
    sales_repo: SalesRepository,
    inventory_repo: InventoryRepository,
    low_stock_threshold: i32,
    commit_timeout: Duration,
}

impl SaleService {
    pub fn new(
        pool: PgPool,
        sales_repo: SalesRepository,
        inventory_repo: InventoryRepository,
        low_stock_threshold: i32,
        commit_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            sales_repo,
            inventory_repo,
            low_stock_threshold,
            commit_timeout,
        }
    }

    // --- COMMIT DA VENDA ---
    // Venda + itens + baixa de estoque + status numa única transação.
    // Qualquer erro derruba a transação (drop = ROLLBACK): nada parcial fica gravado.
    #[tracing::instrument(
        name = "commit_sale",
        skip(self, request),
        fields(tenant_id = %tenant_id, created_by = %created_by, lines = request.lines.len())
    )]
    pub async fn commit_sale(
        &self,
        tenant_id: Uuid,
        created_by: Uuid,
        request: &CommitSaleRequest,
    ) -> Result<CommitSaleReceipt, AppError> {
        tracing::debug!("venda recebida, validando carrinho");

        // ValidationError sai antes de tocar no banco
        request.validate()?;
        let payment_method = request.parsed_payment_method().map_err(|e| {
            let mut errors = ValidationErrors::new();
            let mut err = ValidationError::new("payment_method");
            err.message = Some(format!("Forma de pagamento inválida: {}", e.0).into());
            errors.add("payment_method", err);
            AppError::ValidationError(errors)
        })?;

        let mut attempt = 1;
        loop {
            let result = self
                .commit_with_deadline(tenant_id, created_by, payment_method, request)
                .await;

            match &result {
                Ok(receipt) => {
                    tracing::info!(
                        sale_id = %receipt.sale.id,
                        total = %receipt.sale.total_amount,
                        attempt,
                        "venda confirmada"
                    );
                }
                Err(AppError::ConcurrencyConflict { product_id }) if attempt < MAX_COMMIT_ATTEMPTS => {
                    tracing::warn!(?product_id, attempt, "conflito de estoque, repetindo a venda do início");
                    attempt += 1;
                    continue;
                }
                Err(e) if is_rejection(e) => {
                    tracing::info!(error = %e, "venda rejeitada");
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "venda desfeita (rollback)");
                }
            }

            return result;
        }
    }

    // O deadline cobre a tentativa inteira. Estourou: o future é descartado,
    // a transação cai junto e o Postgres faz o rollback.
    async fn commit_with_deadline(
        &self,
        tenant_id: Uuid,
        created_by: Uuid,
        payment_method: PaymentMethod,
        request: &CommitSaleRequest,
    ) -> Result<CommitSaleReceipt, AppError> {
        tokio::time::timeout(
            self.commit_timeout,
            self.commit_attempt(tenant_id, created_by, payment_method, request),
        )
            .await
            .map_err(|_| AppError::StorageTimeout)?
    }

    async fn commit_attempt(
        &self,
        tenant_id: Uuid,
        created_by: Uuid,
        payment_method: PaymentMethod,
        request: &CommitSaleRequest,
    ) -> Result<CommitSaleReceipt, AppError> {
        let mut tx = begin_rls_transaction(&self.pool, tenant_id, created_by).await?;
        set_local_statement_timeout(&mut *tx, self.commit_timeout).await?;

        // 1. Aluno (opcional) precisa ser da mesma academia
        if let Some(student_id) = request.student_id {
            let belongs = self.sales_repo
                .student_belongs_to_tenant(&mut *tx, tenant_id, student_id)
                .await?;
            if !belongs {
                return Err(AppError::StudentNotFound(student_id));
            }
        }

        // 2. Relê e trava os produtos (nunca confia no cache do frontend)
        let requested = request.quantities_by_product();
        let product_ids: Vec<Uuid> = requested.keys().copied().collect();
        let locked = self.inventory_repo
            .get_products_for_update(&mut *tx, tenant_id, &product_ids)
            .await?;

        check_availability(&requested, &locked)?;

        let products: HashMap<Uuid, Product> = locked.into_iter().map(|p| (p.id, p)).collect();

        // 3. Preço vem do banco, não do cliente
        let (priced_lines, total_amount) = price_lines(&request.lines, &products)?;

        tracing::debug!(%total_amount, "carrinho validado, gravando");

        // 4. Venda + itens
        let sale = self.sales_repo
            .create_sale(&mut *tx, tenant_id, request.student_id, created_by, payment_method, total_amount)
            .await?;

        let mut items = Vec::with_capacity(priced_lines.len());
        for (position, line) in priced_lines.iter().enumerate() {
            let item = self.sales_repo
                .add_sale_item(
                    &mut *tx,
                    sale.id,
                    line.product_id,
                    line.quantity,
                    line.unit_price,
                    line.total_price,
                    position as i32,
                )
                .await?;
            items.push(item);
        }

        // 5. Baixa de estoque + novo status
        let mut stocks = Vec::with_capacity(requested.len());
        for (product_id, quantity) in &requested {
            let product = products
                .get(product_id)
                .ok_or(AppError::ProductUnavailable { product_id: *product_id, product_name: None })?;

            let (quantity, expected_stock) = remaining_stock(product, *quantity)?;
            let new_status = ProductStatus::from_stock(expected_stock, self.low_stock_threshold);

            let updated = self.inventory_repo
                .decrement_stock(&mut *tx, tenant_id, *product_id, quantity, new_status)
                .await?
                .ok_or(AppError::ConcurrencyConflict { product_id: Some(*product_id) })?;

            // Com a linha travada isso não deveria acontecer; se acontecer, desfaz tudo.
            if updated.stock_quantity != expected_stock {
                return Err(AppError::ConcurrencyConflict { product_id: Some(*product_id) });
            }

            stocks.push(updated);
        }

        // 6. Confirma
        tx.commit().await?;

        Ok(CommitSaleReceipt {
            sale,
            items,
            products: stocks,
        })
    }

    // --- CONSULTAS ---

    pub async fn list_sales<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.sales_repo.list_sales(executor, tenant_id, clamp_page_size(limit)).await
    }

    pub async fn get_sale_detail(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        sale_id: Uuid,
    ) -> Result<SaleDetail, AppError> {
        let sale = self.sales_repo
            .get_sale(&mut *conn, tenant_id, sale_id)
            .await?
            .ok_or(AppError::SaleNotFound(sale_id))?;

        let items = self.sales_repo.list_sale_items(&mut *conn, tenant_id, sale_id).await?;

        Ok(SaleDetail { sale, items })
    }
}

// Erros de regra de negócio: o carrinho foi recusado, não houve falha de infraestrutura.
fn is_rejection(e: &AppError) -> bool {
    matches!(
        e,
        AppError::ValidationError(_)
            | AppError::StudentNotFound(_)
            | AppError::ProductUnavailable { .. }
            | AppError::InsufficientStock { .. }
    )
}

/// Confere, para cada produto do carrinho (já somado), se ele é do tenant,
/// se pode ser vendido e se há saldo.
pub fn check_availability(
    requested: &BTreeMap<Uuid, i64>,
    locked: &[Product],
) -> Result<(), AppError> {
    let by_id: HashMap<Uuid, &Product> = locked.iter().map(|p| (p.id, p)).collect();

    for (product_id, quantity) in requested {
        // Não encontrado = não existe ou é de outra academia
        let product = by_id.get(product_id).ok_or(AppError::ProductUnavailable {
            product_id: *product_id,
            product_name: None,
        })?;

        if !product.status.allows_sale() {
            return Err(AppError::ProductUnavailable {
                product_id: product.id,
                product_name: Some(product.name.clone()),
            });
        }

        if i64::from(product.stock_quantity) < *quantity {
            return Err(AppError::InsufficientStock {
                product_id: product.id,
                product_name: product.name.clone(),
                requested: *quantity,
                available: product.stock_quantity,
            });
        }
    }

    Ok(())
}

/// Precifica cada linha com o preço atual do produto.
/// Devolve as linhas e o total da venda (soma exata dos totais das linhas).
/// Totais que não cabem no banco são recusados aqui, antes de qualquer escrita.
pub fn price_lines(
    lines: &[CartLine],
    products: &HashMap<Uuid, Product>,
) -> Result<(Vec<PricedLine>, Decimal), AppError> {
    let mut priced = Vec::with_capacity(lines.len());
    let mut total = Decimal::ZERO;

    for line in lines {
        let product = products.get(&line.product_id).ok_or(AppError::ProductUnavailable {
            product_id: line.product_id,
            product_name: None,
        })?;

        let unit_price = product.price;
        let total_price = unit_price
            .checked_mul(Decimal::from(line.quantity))
            .filter(|t| *t <= MAX_STORED_AMOUNT)
            .ok_or_else(amount_out_of_range)?;
        total = total
            .checked_add(total_price)
            .filter(|t| *t <= MAX_STORED_AMOUNT)
            .ok_or_else(amount_out_of_range)?;

        priced.push(PricedLine {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price,
            total_price,
        });
    }

    Ok((priced, total))
}

// Quantidade a baixar (i32) e o saldo esperado depois da baixa.
fn remaining_stock(product: &Product, quantity: i64) -> Result<(i32, i32), AppError> {
    let insufficient = || AppError::InsufficientStock {
        product_id: product.id,
        product_name: product.name.clone(),
        requested: quantity,
        available: product.stock_quantity,
    };

    let quantity = i32::try_from(quantity).map_err(|_| insufficient())?;
    let remaining = product.stock_quantity - quantity;
    if remaining < 0 {
        return Err(insufficient());
    }
    Ok((quantity, remaining))
}

pub fn clamp_page_size(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_SALES_PAGE).clamp(1, MAX_SALES_PAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::i18n::Locale;
    use chrono::Utc;
    use std::str::FromStr;

    fn product(name: &str, price: &str, stock: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            price: Decimal::from_str(price).unwrap(),
            stock_quantity: stock,
            status: ProductStatus::from_stock(stock, 5),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(p: &Product, quantity: i32) -> CartLine {
        CartLine { product_id: p.id, quantity }
    }

    fn index(products: &[Product]) -> HashMap<Uuid, Product> {
        products.iter().cloned().map(|p| (p.id, p)).collect()
    }

    fn request(lines: Vec<CartLine>) -> CommitSaleRequest {
        CommitSaleRequest {
            student_id: None,
            payment_method: "cash".to_string(),
            lines,
        }
    }

    #[test]
    fn prices_shirt_and_shaker_cart() {
        let a = product("Camiseta Academia", "49.90", 5);
        let b = product("Shaker Proteína", "29.90", 5);
        let lines = vec![line(&a, 2), line(&b, 1)];

        let (priced, total) = price_lines(&lines, &index(&[a.clone(), b.clone()])).unwrap();

        assert_eq!(total, Decimal::from_str("129.70").unwrap());
        assert_eq!(priced[0].total_price, Decimal::from_str("99.80").unwrap());
        assert_eq!(priced[1].total_price, Decimal::from_str("29.90").unwrap());
        assert_eq!(priced.iter().map(|l| l.total_price).sum::<Decimal>(), total);
    }

    #[test]
    fn unit_price_comes_from_product_row() {
        let a = product("Toalha Esportiva", "39.90", 10);
        let (priced, _) = price_lines(&[line(&a, 3)], &index(&[a.clone()])).unwrap();
        assert_eq!(priced[0].unit_price, a.price);
        assert_eq!(priced[0].quantity, 3);
    }

    #[test]
    fn totals_that_do_not_fit_storage_are_rejected_before_writing() {
        // 99.999.999,99 x 200 passa de NUMERIC(12, 2)
        let expensive = product("Esteira Profissional", "99999999.99", 500);
        let err = price_lines(&[line(&expensive, 200)], &index(&[expensive.clone()])).unwrap_err();
        assert!(!err.is_retryable());
        let details = err.to_api_error(&Locale::default()).details.unwrap();
        assert!(details["totalAmount"].is_array());

        // Cada linha cabe, mas a soma não
        let a = product("A", "99999999.99", 500);
        let b = product("B", "99999999.99", 500);
        let err = price_lines(&[line(&a, 60), line(&b, 60)], &index(&[a.clone(), b.clone()])).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        // No limite exato ainda passa
        let edge = product("Limite", "99999999.99", 500);
        let (_, total) = price_lines(&[line(&edge, 100)], &index(&[edge.clone()])).unwrap();
        assert_eq!(total, Decimal::from_str("9999999999.00").unwrap());
    }

    #[test]
    fn sufficient_stock_passes() {
        let a = product("A", "10.00", 5);
        let b = product("B", "10.00", 1);
        let req = request(vec![line(&a, 5), line(&b, 1)]);
        assert!(check_availability(&req.quantities_by_product(), &[a, b]).is_ok());
    }

    #[test]
    fn insufficient_stock_names_product() {
        let c = product("Produto C", "15.00", 3);
        let req = request(vec![line(&c, 10)]);

        let err = check_availability(&req.quantities_by_product(), &[c.clone()]).unwrap_err();
        match err {
            AppError::InsufficientStock { product_id, product_name, requested, available } => {
                assert_eq!(product_id, c.id);
                assert_eq!(product_name, "Produto C");
                assert_eq!(requested, 10);
                assert_eq!(available, 3);
            }
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[test]
    fn duplicate_lines_are_checked_against_combined_quantity() {
        let a = product("A", "10.00", 4);
        let req = request(vec![line(&a, 3), line(&a, 2)]);
        let err = check_availability(&req.quantities_by_product(), &[a]).unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { requested: 5, available: 4, .. }));
    }

    #[test]
    fn missing_product_is_unavailable() {
        let a = product("A", "10.00", 4);
        let ghost = Uuid::new_v4();
        let req = request(vec![line(&a, 1), CartLine { product_id: ghost, quantity: 1 }]);

        let err = check_availability(&req.quantities_by_product(), &[a]).unwrap_err();
        assert!(matches!(err, AppError::ProductUnavailable { product_id, product_name: None } if product_id == ghost));
    }

    #[test]
    fn out_of_stock_status_is_unavailable() {
        let mut a = product("A", "10.00", 8);
        a.status = ProductStatus::OutOfStock;
        let req = request(vec![line(&a, 1)]);

        let err = check_availability(&req.quantities_by_product(), &[a]).unwrap_err();
        assert!(matches!(err, AppError::ProductUnavailable { product_name: Some(_), .. }));
    }

    #[test]
    fn remaining_stock_never_negative() {
        let a = product("A", "10.00", 3);
        assert_eq!(remaining_stock(&a, 3).unwrap(), (3, 0));
        assert_eq!(remaining_stock(&a, 1).unwrap(), (1, 2));
        assert!(remaining_stock(&a, 4).is_err());
        assert!(remaining_stock(&a, i64::from(i32::MAX) + 1).is_err());
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(clamp_page_size(None), DEFAULT_SALES_PAGE);
        assert_eq!(clamp_page_size(Some(0)), 1);
        assert_eq!(clamp_page_size(Some(10)), 10);
        assert_eq!(clamp_page_size(Some(5_000)), MAX_SALES_PAGE);
    }

    #[test]
    fn rejections_are_business_errors_only() {
        assert!(is_rejection(&AppError::StudentNotFound(Uuid::new_v4())));
        assert!(!is_rejection(&AppError::StorageTimeout));
        assert!(!is_rejection(&AppError::ConcurrencyConflict { product_id: None }));
    }
}
