use std::time::Duration;

use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::common::error::AppError;

// ---
// Helper RLS: A "Chave" para o Banco de Dados
// ---
/// Define as variáveis RLS (`app.tenant_id`, `app.user_id`) na transação corrente.
/// `set_config(..., true)` vale só até o COMMIT/ROLLBACK, então precisa ser chamado
/// depois do BEGIN, nunca numa conexão solta da pool.
async fn set_rls_context(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    user_id: Uuid,
) -> Result<(), AppError> {
    sqlx::query("SELECT set_config('app.tenant_id', $1, true), set_config('app.user_id', $2, true)")
        .bind(tenant_id.to_string())
        .bind(user_id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Abre uma transação já com o contexto RLS aplicado.
/// O tenant é sempre passado explicitamente; o RLS é só uma segunda barreira.
pub(crate) async fn begin_rls_transaction(
    pool: &PgPool,
    tenant_id: Uuid,
    user_id: Uuid,
) -> Result<Transaction<'static, Postgres>, AppError> {
    let mut tx = pool.begin().await?;
    set_rls_context(&mut *tx, tenant_id, user_id).await?;
    Ok(tx)
}

/// Limita cada comando da transação no próprio servidor.
/// Se o cliente sumir, o Postgres cancela sozinho em vez de segurar os locks.
pub(crate) async fn set_local_statement_timeout(
    conn: &mut PgConnection,
    timeout: Duration,
) -> Result<(), AppError> {
    sqlx::query("SELECT set_config('statement_timeout', $1, true)")
        .bind(format!("{}ms", timeout.as_millis()))
        .execute(&mut *conn)
        .await?;

    Ok(())
}
