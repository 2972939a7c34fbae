use crate::config::PostgresSettings;
use crate::database::models::{IndicatorRowUpdate, QuoteRow};
use crate::database::schema;
use crate::indicators::frame::{Cell, ColumnKind};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};

pub struct PostgresManager {
    pool: PgPool,
}

impl PostgresManager {
    pub async fn connect(settings: &PostgresSettings) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect(&settings.url())
            .await
            .context("failed to create database connection pool")?;
        Ok(Self { pool })
    }

    /// A worker process keeps its own private connection instead of sharing
    /// the service pool: one connection, opened and dropped with the process.
    pub async fn connect_single(settings: &PostgresSettings) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&settings.url())
            .await
            .context("failed to open worker database connection")?;
        Ok(Self { pool })
    }

    // Create tables if they don't exist
    pub async fn init_tables(&self) -> Result<()> {
        sqlx::query(schema::CREATE_QUOTES_TABLE)
            .execute(&self.pool)
            .await
            .context("failed to create quotes table")?;
        sqlx::query(schema::CREATE_INDICATORS_TABLE)
            .execute(&self.pool)
            .await
            .context("failed to create indicators table")?;
        info!("Database tables initialized successfully");
        Ok(())
    }

    /// Make sure every stored column the configuration maps to exists on the
    /// indicators table with the matching SQL type.
    pub async fn ensure_indicator_columns(&self, columns: &[(String, ColumnKind)]) -> Result<()> {
        for (name, kind) in columns {
            sqlx::query(&schema::indicator_column_ddl(name, *kind))
                .execute(&self.pool)
                .await
                .with_context(|| format!("failed to provision indicator column \"{name}\""))?;
        }
        debug!("Provisioned {} indicator columns", columns.len());
        Ok(())
    }

    // Full ordered history for one security, cast to double precision for
    // calculation.
    pub async fn fetch_quote_history(&self, security: i64) -> Result<Vec<QuoteRow>> {
        let rows = sqlx::query_as::<_, QuoteRow>(
            "SELECT date, open::double precision, high::double precision, \
             low::double precision, close::double precision, \
             split_adjusted_open::double precision, split_adjusted_high::double precision, \
             split_adjusted_low::double precision, split_adjusted_close::double precision, \
             adjusted_close::double precision, volume::double precision \
             FROM quotes WHERE security = $1 ORDER BY date ASC",
        )
        .bind(security)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("failed to fetch quote history for security {security}"))?;
        Ok(rows)
    }

    /// Insert or update the merged indicator row for `(security, date)`.
    /// Every column present in the update overwrites the stored value;
    /// columns not present are left untouched on an existing row.
    pub async fn upsert_indicator_row(
        &self,
        security: i64,
        update: &IndicatorRowUpdate,
    ) -> Result<()> {
        let sql = if update.values.is_empty() {
            "INSERT INTO indicators (security, date) VALUES ($1, $2) \
             ON CONFLICT ON CONSTRAINT indicators_security_date_uq DO NOTHING"
                .to_string()
        } else {
            let columns = update
                .values
                .iter()
                .map(|value| format!("\"{}\"", value.column))
                .collect::<Vec<_>>()
                .join(", ");
            let placeholders = (3..update.values.len() + 3)
                .map(|i| format!("${i}"))
                .collect::<Vec<_>>()
                .join(", ");
            let assignments = update
                .values
                .iter()
                .map(|value| format!("\"{0}\" = EXCLUDED.\"{0}\"", value.column))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "INSERT INTO indicators (security, date, {columns}) VALUES ($1, $2, {placeholders}) \
                 ON CONFLICT ON CONSTRAINT indicators_security_date_uq DO UPDATE SET {assignments}"
            )
        };

        let mut query = sqlx::query(&sql).bind(security).bind(update.date);
        for value in &update.values {
            query = match (value.kind, value.cell) {
                (ColumnKind::Float, Some(Cell::Float(v))) => query.bind(v),
                (ColumnKind::Float, _) => query.bind(Option::<f64>::None),
                (ColumnKind::Bool, Some(Cell::Bool(v))) => query.bind(v),
                (ColumnKind::Bool, _) => query.bind(Option::<bool>::None),
                (ColumnKind::Date, Some(Cell::Date(v))) => query.bind(v),
                (ColumnKind::Date, _) => query.bind(Option::<NaiveDate>::None),
            };
        }
        query
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to upsert indicator row for security {security}"))?;
        Ok(())
    }
}
