use crate::indicators::frame::{Cell, ColumnKind};
use chrono::NaiveDate;
use sqlx::FromRow;

/// One trading day of a security's quote history. Stored as NUMERIC, fetched
/// cast to double precision for calculation.
#[derive(Debug, Clone, FromRow)]
pub struct QuoteRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub split_adjusted_open: f64,
    pub split_adjusted_high: f64,
    pub split_adjusted_low: f64,
    pub split_adjusted_close: f64,
    pub adjusted_close: f64,
    pub volume: f64,
}

/// One merged indicator value destined for a stored column.
#[derive(Debug, Clone)]
pub struct IndicatorValue {
    pub column: String,
    pub kind: ColumnKind,
    pub cell: Option<Cell>,
}

/// The merged most-recent-row record for one security, keyed by the most
/// recent daily date. Upserted as a whole; columns not present are left
/// untouched on an existing row.
#[derive(Debug, Clone)]
pub struct IndicatorRowUpdate {
    pub date: NaiveDate,
    pub values: Vec<IndicatorValue>,
}
