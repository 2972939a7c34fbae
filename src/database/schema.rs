// SQL schema for the two tables this subsystem touches. Indicator value
// columns are provisioned dynamically from the indicator configuration, so
// the indicators table starts with just its key.

use crate::indicators::frame::ColumnKind;

pub const CREATE_QUOTES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS quotes (
    security BIGINT NOT NULL,
    date DATE NOT NULL,
    open NUMERIC,
    high NUMERIC,
    low NUMERIC,
    close NUMERIC,
    split_adjusted_open NUMERIC,
    split_adjusted_high NUMERIC,
    split_adjusted_low NUMERIC,
    split_adjusted_close NUMERIC,
    adjusted_close NUMERIC,
    volume NUMERIC,
    CONSTRAINT quotes_security_date_uq UNIQUE (security, date)
);
"#;

pub const CREATE_INDICATORS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS indicators (
    security BIGINT NOT NULL,
    date DATE NOT NULL,
    CONSTRAINT indicators_security_date_uq UNIQUE (security, date)
);
"#;

pub fn indicator_column_ddl(column: &str, kind: ColumnKind) -> String {
    let sql_type = match kind {
        ColumnKind::Float => "DOUBLE PRECISION",
        ColumnKind::Bool => "BOOLEAN",
        ColumnKind::Date => "DATE",
    };
    format!("ALTER TABLE indicators ADD COLUMN IF NOT EXISTS \"{column}\" {sql_type}")
}
