//! PostgreSQL driver adapter
//!
//! Pool construction and the [`CatalogSource`] implementation that runs
//! catalog queries on a deadpool-managed connection.

use crate::analyser::dialect::QueryName;
use crate::analyser::executor::{CatalogRow, CatalogSource};
use crate::connection::ConnectionParams;
use crate::error::AppError;
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use serde_json::Value;
use tokio_postgres::types::Type;
use tokio_postgres::{NoTls, Row};
use tracing::debug;

/// Create a connection pool, with TLS when the connection string asks for it
pub fn create_pool(params: &ConnectionParams, max_size: usize) -> Result<Pool, AppError> {
    let mut cfg = Config::new();
    cfg.host = Some(params.host.clone());
    cfg.port = Some(params.port);
    cfg.user = Some(params.user.clone());
    cfg.password = Some(params.password.clone());
    cfg.dbname = Some(params.database.clone());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(PoolConfig::new(max_size.max(1)));

    if params.use_tls {
        let certs = rustls_native_certs::load_native_certs();
        let mut root_store = rustls::RootCertStore::empty();
        for cert in certs.certs {
            root_store.add(cert).ok();
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);
        cfg.create_pool(Some(Runtime::Tokio1), tls)
            .map_err(|e| AppError::Config(format!("Failed to create TLS pool: {}", e)))
    } else {
        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| AppError::Config(format!("Failed to create pool: {}", e)))
    }
}

#[async_trait]
impl CatalogSource for Pool {
    async fn query(&self, name: QueryName, sql: &str) -> Result<Vec<CatalogRow>, AppError> {
        let client = self.get().await?;
        let rows = client.query(sql, &[]).await?;
        debug!(query = %name, rows = rows.len(), "Catalog rows fetched");

        rows.iter().map(catalog_row).collect()
    }
}

fn catalog_row(row: &Row) -> Result<CatalogRow, AppError> {
    let mut out = CatalogRow::new();
    for (idx, column) in row.columns().iter().enumerate() {
        out.insert(column.name(), cell_value(row, idx, column.type_())?);
    }
    Ok(out)
}

/// Map one cell to a JSON scalar; types without a mapping become text or null
fn cell_value(row: &Row, idx: usize, ty: &Type) -> Result<Value, AppError> {
    let value = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(idx)?.map(Value::from)
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx)?.map(Value::from)
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx)?.map(Value::from)
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx)?.map(Value::from)
    } else if *ty == Type::OID {
        row.try_get::<_, Option<u32>>(idx)?.map(Value::from)
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(idx)?.map(|v| Value::from(f64::from(v)))
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(idx)?.map(Value::from)
    } else if *ty == Type::CHAR {
        // "char" is a single signed byte
        row.try_get::<_, Option<i8>>(idx)?
            .map(|v| Value::from(char::from(v as u8).to_string()))
    } else {
        row.try_get::<_, Option<String>>(idx).ok().flatten().map(Value::from)
    };

    Ok(value.unwrap_or(Value::Null))
}
