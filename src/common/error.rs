// src/common/error.rs

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use thiserror::Error;
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::middleware::i18n::Locale;

// Códigos SQLSTATE do Postgres que indicam corrida entre transações.
const PG_SERIALIZATION_FAILURE: &str = "40001";
const PG_DEADLOCK_DETECTED: &str = "40P01";
const PG_CHECK_VIOLATION: &str = "23514";
const PG_QUERY_CANCELED: &str = "57014";
// Valor não cabe na coluna NUMERIC: erro do pedido, nunca de infraestrutura.
const PG_NUMERIC_OUT_OF_RANGE: &str = "22003";
// Classe 08: conexão caiu no meio do caminho.
const PG_CONNECTION_EXCEPTION_CLASS: &str = "08";

// Maior valor que cabe em NUMERIC(12, 2) (totais de venda e de item).
pub const MAX_STORED_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] ValidationErrors),

    // Corpo JSON malformado (campo ausente, tipo errado, número fora do i32...)
    #[error("Corpo da requisição inválido: {0}")]
    InvalidBody(String),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Perfil não encontrado para o usuário")]
    ProfileNotFound,

    #[error("Cabeçalho X-Tenant-ID inválido")]
    InvalidTenantHeader,

    #[error("O usuário não pertence a esta academia")]
    TenantMismatch,

    #[error("Papel necessário ausente: {0}")]
    MissingRole(&'static str),

    #[error("Aluno {0} não encontrado")]
    StudentNotFound(Uuid),

    #[error("Venda {0} não encontrada")]
    SaleNotFound(Uuid),

    #[error("Produto {0} não encontrado")]
    ProductNotFound(Uuid),

    #[error("Produto {0} já tem vendas registradas")]
    ProductInUse(Uuid),

    #[error("Produto {product_id} indisponível para venda")]
    ProductUnavailable {
        product_id: Uuid,
        product_name: Option<String>,
    },

    #[error("Estoque insuficiente para {product_name} ({product_id}): pedido {requested}, disponível {available}")]
    InsufficientStock {
        product_id: Uuid,
        product_name: String,
        requested: i64,
        available: i32,
    },

    // Outra venda alterou o mesmo produto entre a leitura e a escrita.
    #[error("Conflito de concorrência no estoque")]
    ConcurrencyConflict { product_id: Option<Uuid> },

    // Erro de transporte/armazenamento. Não usa #[from]: ver `From<sqlx::Error>` abaixo.
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Tempo limite da transação excedido")]
    StorageTimeout,

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        let code = e
            .as_database_error()
            .and_then(|db_err| db_err.code())
            .map(|c| c.into_owned());

        match code.as_deref() {
            // O CHECK (stock_quantity >= 0) só dispara se o saldo mudou depois da leitura.
            Some(PG_SERIALIZATION_FAILURE) | Some(PG_DEADLOCK_DETECTED) | Some(PG_CHECK_VIOLATION) => {
                AppError::ConcurrencyConflict { product_id: None }
            }
            // statement_timeout
            Some(PG_QUERY_CANCELED) => AppError::StorageTimeout,
            Some(PG_NUMERIC_OUT_OF_RANGE) => amount_out_of_range(),
            _ => AppError::DatabaseError(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidBody(rejection.body_text())
    }
}

/// Total acima do que o banco consegue guardar. Determinístico: repetir não adianta.
pub fn amount_out_of_range() -> AppError {
    let mut err = ValidationError::new("amount_out_of_range");
    err.message = Some(format!("O valor total não pode passar de {}.", MAX_STORED_AMOUNT).into());
    let mut errors = ValidationErrors::new();
    errors.add("totalAmount", err);
    AppError::ValidationError(errors)
}

// Só falhas de transporte/pool: o mesmo pedido pode dar certo numa nova tentativa.
fn is_transient(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db_err) => db_err
            .code()
            .is_some_and(|code| code.starts_with(PG_CONNECTION_EXCEPTION_CLASS)),
        _ => false,
    }
}

impl AppError {
    /// Conflitos, timeouts e falhas de transporte podem ser repetidos com segurança:
    /// nada parcial fica gravado.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::ConcurrencyConflict { .. } | AppError::StorageTimeout => true,
            AppError::DatabaseError(e) => is_transient(e),
            _ => false,
        }
    }

    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let en = locale.is_english();
        let pick = |pt: &str, en_msg: &str| if en { en_msg.to_string() } else { pt.to_string() };

        match self {
            AppError::ValidationError(errors) => ApiError {
                status: StatusCode::BAD_REQUEST,
                error: pick("Um ou mais campos são inválidos.", "One or more fields are invalid."),
                details: Some(validation_details(errors)),
            },
            AppError::InvalidBody(reason) => ApiError {
                status: StatusCode::BAD_REQUEST,
                error: pick("Corpo da requisição inválido.", "Invalid request body."),
                details: Some(json!({ "body": [reason] })),
            },
            AppError::InvalidToken => ApiError::new(
                StatusCode::UNAUTHORIZED,
                pick("Token de autenticação inválido ou ausente.", "Missing or invalid authentication token."),
            ),
            AppError::JwtError(_) => ApiError::new(
                StatusCode::UNAUTHORIZED,
                pick("Token de autenticação inválido ou ausente.", "Missing or invalid authentication token."),
            ),
            AppError::ProfileNotFound => ApiError::new(
                StatusCode::FORBIDDEN,
                pick("Perfil do usuário não encontrado.", "User profile not found."),
            ),
            AppError::InvalidTenantHeader => ApiError::new(
                StatusCode::BAD_REQUEST,
                pick("Cabeçalho X-Tenant-ID inválido (não é um UUID).", "Invalid X-Tenant-ID header (not a UUID)."),
            ),
            AppError::TenantMismatch => ApiError::new(
                StatusCode::FORBIDDEN,
                pick("Você não tem acesso a esta academia.", "You do not have access to this gym."),
            ),
            AppError::MissingRole(roles) => ApiError {
                status: StatusCode::FORBIDDEN,
                error: pick("Você não tem permissão para esta ação.", "You are not allowed to perform this action."),
                details: Some(json!({ "requiredRole": roles })),
            },
            AppError::StudentNotFound(id) => ApiError {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                error: pick("Aluno não encontrado.", "Student not found."),
                details: Some(json!({ "studentId": id })),
            },
            AppError::SaleNotFound(id) => ApiError {
                status: StatusCode::NOT_FOUND,
                error: pick("Venda não encontrada.", "Sale not found."),
                details: Some(json!({ "saleId": id })),
            },
            AppError::ProductNotFound(id) => ApiError {
                status: StatusCode::NOT_FOUND,
                error: pick("Produto não encontrado.", "Product not found."),
                details: Some(json!({ "productId": id })),
            },
            AppError::ProductInUse(id) => ApiError {
                status: StatusCode::CONFLICT,
                error: pick(
                    "O produto já tem vendas registradas e não pode ser excluído.",
                    "The product has recorded sales and cannot be deleted.",
                ),
                details: Some(json!({ "productId": id, "retryable": false })),
            },
            AppError::ProductUnavailable { product_id, product_name } => ApiError {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                error: pick("Produto indisponível para venda.", "Product is not available for sale."),
                details: Some(json!({ "productId": product_id, "productName": product_name })),
            },
            AppError::InsufficientStock { product_id, product_name, requested, available } => ApiError {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                error: if en {
                    format!("Insufficient stock for '{}'.", product_name)
                } else {
                    format!("Estoque insuficiente para '{}'.", product_name)
                },
                details: Some(json!({
                    "productId": product_id,
                    "productName": product_name,
                    "requested": requested,
                    "available": available,
                })),
            },
            AppError::ConcurrencyConflict { product_id } => ApiError {
                status: StatusCode::CONFLICT,
                error: pick(
                    "O estoque foi alterado por outra venda. Tente novamente.",
                    "Stock was changed by another sale. Please retry.",
                ),
                details: Some(json!({ "productId": product_id, "retryable": self.is_retryable() })),
            },
            AppError::DatabaseError(e) if !is_transient(e) => {
                tracing::error!("Erro de banco de dados: {:?}", e);
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    error: pick("Ocorreu um erro inesperado.", "An unexpected error occurred."),
                    details: Some(json!({ "retryable": false })),
                }
            }
            AppError::DatabaseError(e) => {
                tracing::error!("Erro de armazenamento: {}", e);
                ApiError {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    error: pick(
                        "Falha ao gravar no banco de dados. Nada foi salvo; tente novamente.",
                        "Storage failure. Nothing was saved; please retry.",
                    ),
                    details: Some(json!({ "retryable": self.is_retryable() })),
                }
            }
            AppError::StorageTimeout => {
                tracing::error!("Transação excedeu o tempo limite");
                ApiError {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    error: pick(
                        "O banco de dados demorou demais para responder. Nada foi salvo; tente novamente.",
                        "The database took too long to respond. Nothing was saved; please retry.",
                    ),
                    details: Some(json!({ "retryable": self.is_retryable() })),
                }
            }
            AppError::InternalServerError(e) => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    pick("Ocorreu um erro inesperado.", "An unexpected error occurred."),
                )
            }
        }
    }
}

// Resposta de erro padrão da API.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: String) -> Self {
        Self { status, error, details: None }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

// Sem Accept-Language (ex: rejeição de middleware), responde no idioma padrão.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}

// Achata os erros do validator em { "campo": ["mensagem"], "lines[1].quantity": [...] }.
fn validation_details(errors: &ValidationErrors) -> Value {
    let mut details = Map::new();
    collect_validation_errors(errors, "", &mut details);
    Value::Object(details)
}

fn collect_validation_errors(errors: &ValidationErrors, prefix: &str, out: &mut Map<String, Value>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                let messages: Vec<Value> = field_errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .map(Value::String)
                    .collect();
                out.insert(path, Value::Array(messages));
            }
            ValidationErrorsKind::Struct(inner) => {
                collect_validation_errors(inner, &path, out);
            }
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_validation_errors(inner, &format!("{}[{}]", path, index), out);
                }
            }
        }
    }
}
