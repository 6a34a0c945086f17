use serde_json::Value;
use uuid::Uuid;

use crate::state::AppState;

/// Record an admin/user action in the audit trail. Best-effort: a failed
/// insert is logged at warn and never fails the calling request.
pub async fn log_audit(
    state: &AppState,
    user_id: Option<Uuid>,
    action: &str,
    resource: &str,
    metadata: Value,
) {
    let result = sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(action)
    .bind(resource)
    .bind(metadata)
    .execute(&state.pool)
    .await;

    if let Err(err) = result {
        tracing::warn!(error = %err, action, "audit log failed");
    }
}
