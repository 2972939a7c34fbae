use crate::database::models::{IndicatorRowUpdate, IndicatorValue, QuoteRow};
use crate::database::postgres::PostgresManager;
use crate::indicators::config::IndicatorConfigEntry;
use crate::indicators::frame::QuoteFrame;
use crate::indicators::resample::{resample, Timeframe};
use anyhow::Result;
use tracing::{debug, info, warn};

/// Securities with fewer rows than this are skipped without writing anything;
/// too little history is not an error.
pub const MIN_HISTORY_ROWS: usize = 10;

/// Runs the full indicator pipeline for one security: fetch history, resample
/// into the three timeframes, apply every configured indicator, merge the
/// most recent values and upsert them.
pub struct IndicatorCalculator {
    db: PostgresManager,
    entries: Vec<IndicatorConfigEntry>,
}

impl IndicatorCalculator {
    pub fn new(db: PostgresManager, entries: Vec<IndicatorConfigEntry>) -> Self {
        Self { db, entries }
    }

    pub async fn calculate(&self, security: i64) -> Result<()> {
        debug!("calculate(security={security})");
        let rows = self.db.fetch_quote_history(security).await?;
        match compute_indicator_row(&self.entries, &rows) {
            None => {
                info!(
                    "Skipping indicator calculation for security {security}: only {} quotes",
                    rows.len()
                );
                Ok(())
            }
            Some(update) => {
                debug!(
                    "Indicator data for security {security} on {}: {} columns",
                    update.date,
                    update.values.len()
                );
                self.db.upsert_indicator_row(security, &update).await?;
                Ok(())
            }
        }
    }
}

/// The storage-free stages of the pipeline. Returns `None` when the history
/// is too short to calculate anything.
pub fn compute_indicator_row(
    entries: &[IndicatorConfigEntry],
    rows: &[QuoteRow],
) -> Option<IndicatorRowUpdate> {
    if rows.len() < MIN_HISTORY_ROWS {
        return None;
    }

    let daily = QuoteFrame::from_rows(rows);
    let weekly = resample(&daily, Timeframe::Weekly);
    let monthly = resample(&daily, Timeframe::Monthly);
    let mut frames = [daily, weekly, monthly];

    // Entries run in configuration order against their timeframe's frame, and
    // each updated frame replaces the previous one, so later entries can use
    // earlier outputs as sources.
    for entry in entries {
        debug!(
            "Calculating indicator {} ({})",
            entry.function.name, entry.interval
        );
        let frame = &mut frames[entry.interval.index()];
        match (entry.function.apply)(frame, &entry.parameters) {
            Ok(()) => {
                for (column, _) in entry.function.columns {
                    match entry.mapping.get(*column) {
                        Some(stored) => frame.rename_column(column, stored),
                        None => frame.drop_column(column),
                    }
                }
            }
            Err(e) => {
                warn!(
                    "Calculating indicator {} ({}) was not successful: {e}",
                    entry.function.name, entry.interval
                );
                for (column, kind) in entry.function.columns {
                    frame.set_null_column(column, *kind);
                }
            }
        }
    }

    // Merge the most recent row of every frame, keyed by the most recent
    // daily date. Later timeframes overwrite duplicate stored names but keep
    // the original insertion position.
    let date = *frames[0].dates.last()?;
    let mut values: Vec<IndicatorValue> = Vec::new();
    for frame in &frames {
        for column in frame.columns() {
            let cell = column.cells.last().copied().flatten();
            match values.iter_mut().find(|v| v.column == column.name) {
                Some(existing) => {
                    existing.kind = column.kind;
                    existing.cell = cell;
                }
                None => values.push(IndicatorValue {
                    column: column.name.clone(),
                    kind: column.kind,
                    cell,
                }),
            }
        }
    }

    Some(IndicatorRowUpdate { date, values })
}
