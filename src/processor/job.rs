use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A queued background job. The field names are the backup-file wire format,
/// so they stay exactly as serialized to disk. `uuid` is generated at
/// creation and never reused; a job is immutable once queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundJob {
    pub timestamp: i64,
    pub uuid: Uuid,
    pub table: String,
    pub id1: Option<i64>,
    pub id2: Option<i64>,
    pub date1: Option<NaiveDate>,
    pub date2: Option<NaiveDate>,
    #[serde(default)]
    pub data: Value,
}

impl BackgroundJob {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().timestamp(),
            uuid: Uuid::new_v4(),
            table: table.into(),
            id1: None,
            id2: None,
            date1: None,
            date2: None,
            data: Value::Object(serde_json::Map::new()),
        }
    }

    /// The job emitted after a quotes update: recalculate indicators for the
    /// security behind `id1`.
    pub fn for_quotes(security: i64) -> Self {
        Self::new("quotes").with_primary_id(security)
    }

    pub fn with_primary_id(mut self, id: i64) -> Self {
        self.id1 = Some(id);
        self
    }

    pub fn with_secondary_id(mut self, id: i64) -> Self {
        self.id2 = Some(id);
        self
    }

    pub fn with_date_range(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date1 = Some(from);
        self.date2 = Some(to);
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// Outcome of one worker execution. Produced and logged inside the worker
/// process only; the scheduler never sees it.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub timestamp: i64,
    pub job: BackgroundJob,
    pub success: bool,
    pub error: Option<String>,
}

impl JobResult {
    pub fn success(job: BackgroundJob) -> Self {
        Self {
            timestamp: Utc::now().timestamp(),
            job,
            success: true,
            error: None,
        }
    }

    pub fn failure(job: BackgroundJob, error: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().timestamp(),
            job,
            success: false,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_backup_field_names() {
        let job = BackgroundJob::for_quotes(42);
        let value = serde_json::to_value(&job).unwrap();
        let object = value.as_object().unwrap();
        for field in ["timestamp", "uuid", "table", "id1", "id2", "date1", "date2", "data"] {
            assert!(object.contains_key(field), "missing field {field}");
        }
        assert_eq!(object.len(), 8);
        assert_eq!(object["table"], "quotes");
        assert_eq!(object["id1"], 42);
    }

    #[test]
    fn round_trips_through_json() {
        let job = BackgroundJob::new("quotes")
            .with_primary_id(7)
            .with_secondary_id(9)
            .with_date_range(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            )
            .with_data(serde_json::json!({ "reason": "import" }));
        let raw = serde_json::to_string(&job).unwrap();
        let restored: BackgroundJob = serde_json::from_str(&raw).unwrap();
        assert_eq!(restored, job);
    }

    #[test]
    fn every_job_gets_a_fresh_uuid() {
        let a = BackgroundJob::for_quotes(1);
        let b = BackgroundJob::for_quotes(1);
        assert_ne!(a.uuid, b.uuid);
    }

    #[test]
    fn results_keep_the_originating_job() {
        let job = BackgroundJob::for_quotes(5);
        let ok = JobResult::success(job.clone());
        assert!(ok.success);
        assert_eq!(ok.job, job);
        assert_eq!(ok.error, None);

        let failed = JobResult::failure(job.clone(), "fetch failed");
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("fetch failed"));
    }
}
