// src/config.rs

use std::{env, fmt::Display, str::FromStr, time::Duration};

use anyhow::{anyhow, Context};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{InventoryRepository, RbacRepository, SalesRepository, TenantRepository},
    services::{auth::AuthService, inventory_service::InventoryService, sale_service::SaleService},
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;
const DEFAULT_SALE_COMMIT_TIMEOUT_SECS: u64 = 10;

// Configuração lida do ambiente (.env em desenvolvimento)
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub low_stock_threshold: i32,
    pub sale_commit_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Monta a configuração a partir de qualquer fonte chave -> valor.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?;
        let low_stock_threshold = parse_or(&lookup, "LOW_STOCK_THRESHOLD", DEFAULT_LOW_STOCK_THRESHOLD)?;
        let timeout_secs = parse_or(&lookup, "SALE_COMMIT_TIMEOUT_SECS", DEFAULT_SALE_COMMIT_TIMEOUT_SECS)?;

        if low_stock_threshold < 0 {
            return Err(anyhow!("LOW_STOCK_THRESHOLD não pode ser negativo"));
        }
        if timeout_secs == 0 {
            return Err(anyhow!("SALE_COMMIT_TIMEOUT_SECS deve ser maior que zero"));
        }

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr,
            db_max_connections,
            low_stock_threshold,
            sale_commit_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Valor inválido para {}: '{}' ({})", key, raw, e)),
        None => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub rbac_repo: RbacRepository,
    pub inventory_service: InventoryService,
    pub sale_service: SaleService,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::from_pool(db_pool, settings))
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_pool(db_pool: PgPool, settings: &Settings) -> Self {
        let tenant_repo = TenantRepository::new(db_pool.clone());
        let rbac_repo = RbacRepository::new(db_pool.clone());
        let inventory_repo = InventoryRepository::new();
        let sales_repo = SalesRepository::new();

        let auth_service = AuthService::new(tenant_repo, settings.jwt_secret.clone());
        let inventory_service = InventoryService::new(inventory_repo.clone(), settings.low_stock_threshold);
        let sale_service = SaleService::new(
            db_pool.clone(),
            sales_repo,
            inventory_repo,
            settings.low_stock_threshold,
            settings.sale_commit_timeout,
        );

        Self {
            db_pool,
            auth_service,
            rbac_repo,
            inventory_service,
            sale_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> anyhow::Result<Settings> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/gym"),
        ("JWT_SECRET", "segredo"),
    ];

    #[test]
    fn defaults_are_applied() {
        let s = settings(&REQUIRED).unwrap();
        assert_eq!(s.bind_addr, "0.0.0.0:3000");
        assert_eq!(s.db_max_connections, 5);
        assert_eq!(s.low_stock_threshold, 5);
        assert_eq!(s.sale_commit_timeout, Duration::from_secs(10));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("LOW_STOCK_THRESHOLD", "10"));
        vars.push(("SALE_COMMIT_TIMEOUT_SECS", " 3 "));
        let s = settings(&vars).unwrap();
        assert_eq!(s.low_stock_threshold, 10);
        assert_eq!(s.sale_commit_timeout, Duration::from_secs(3));
    }

    #[test]
    fn missing_database_url_fails() {
        let err = settings(&[("JWT_SECRET", "segredo")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn invalid_numbers_fail() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("LOW_STOCK_THRESHOLD", "muitos"));
        assert!(settings(&vars).is_err());

        let mut vars = REQUIRED.to_vec();
        vars.push(("SALE_COMMIT_TIMEOUT_SECS", "0"));
        assert!(settings(&vars).is_err());
    }
}
