use crate::config::Settings;
use crate::database::postgres::PostgresManager;
use crate::indicators::calculator::IndicatorCalculator;
use crate::indicators::config::load_indicator_config;
use crate::indicators::registry::IndicatorRegistry;
use crate::processor::job::{BackgroundJob, JobResult};
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// Worker-process entry: run the full indicator pipeline for one security on
/// a private storage connection, log the result and exit. Failures surface
/// only here; the scheduler just sees the process end.
pub async fn run_calculation(security: i64, job_id: Option<Uuid>) -> Result<()> {
    let settings = Settings::load()?;
    let registry = IndicatorRegistry::new();
    let entries = load_indicator_config(Path::new(&settings.indicators.config_file), &registry)
        .context("invalid indicator configuration")?;
    let db = PostgresManager::connect_single(&settings.postgres).await?;
    let calculator = IndicatorCalculator::new(db, entries);

    let mut job = BackgroundJob::for_quotes(security);
    if let Some(id) = job_id {
        job.uuid = id;
    }
    info!("Calculating indicators for security {security} (job {})", job.uuid);

    let result = match calculator.calculate(security).await {
        Ok(()) => JobResult::success(job),
        Err(e) => JobResult::failure(job, format!("{e:#}")),
    };
    if result.success {
        info!(
            "Job successfully finished | \"{}\" with id {}",
            result.job.table, result.job.uuid
        );
        Ok(())
    } else {
        warn!(
            "Job error | \"{}\" with id {}, error={}",
            result.job.table,
            result.job.uuid,
            result.error.as_deref().unwrap_or("unknown")
        );
        Err(anyhow!("indicator calculation failed for security {security}"))
    }
}
