use super::Reporter;
use crate::domain::TelemetryError;
use crate::domain::report::{ReportRecord, is_unset};
use crate::identity::{PROJECT_ID_KEY, USER_ID_COMMENT, USER_ID_KEY};
use chrono::Utc;
use uuid::Uuid;

impl Reporter {
    /// Fills every field the checkpoint service needs but the caller left out.
    ///
    /// Fields that already hold a value are never overwritten, so running this
    /// twice yields the same record. When the record ends up carrying a CI
    /// name, `user_id` is cleared: the two are never sent together.
    pub async fn fill_defaults(
        &self,
        mut record: ReportRecord,
    ) -> Result<ReportRecord, TelemetryError> {
        if is_unset(&record.run_id) {
            record.run_id = Some(Uuid::new_v4().to_string());
        }
        if record.date_time.is_none() {
            record.date_time = Some(Utc::now());
        }
        if is_unset(&record.arch) {
            record.arch = Some(self.host.arch.clone());
        }
        if is_unset(&record.os) {
            record.os = Some(self.host.os.clone());
        }

        if is_unset(&record.ci) {
            record.ci = self.ci.detect();
        }
        if record.ci.is_some() {
            record.user_id = None;
        } else if is_unset(&record.user_id) {
            let user_id = self
                .user_identity
                .get_or_create(USER_ID_KEY, Some(USER_ID_COMMENT))
                .await?;
            record.user_id = Some(user_id);
        }

        if is_unset(&record.project_id) {
            let project_id = self.project_identity.get_or_create(PROJECT_ID_KEY, None).await?;
            record.project_id = Some(project_id);
        }

        Ok(record)
    }
}
