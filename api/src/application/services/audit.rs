use crate::application::ports::activity_log_repository::ActivityLogRepository;
use crate::domain::activity::activity_log::NewActivity;

/// Appends to the activity log. Failures are logged, never propagated.
pub async fn record<R>(repo: &R, entry: NewActivity)
where
    R: ActivityLogRepository + ?Sized,
{
    let action = entry.action.clone();
    let subject = entry.subject.clone();
    if let Err(err) = repo.record(entry).await {
        tracing::warn!(error = ?err, %action, %subject, "activity_log_record_failed");
    }
}
