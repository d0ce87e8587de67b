use axum::{extract::State, http::HeaderMap, Json};
use chrono::NaiveTime;
use serde::Deserialize;
use shared::{QuestionSet, ReminderTemplate, WorkspaceSettings};

use crate::{
    db::SettingsRow,
    error::AppError,
    reminders::send_reminder,
    routes::auth::require_admin,
    state::AppState,
};

/// Read the workspace settings, creating defaults on first access.
/// GET /settings
pub async fn get_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<WorkspaceSettings>, AppError> {
    let admin = require_admin(&state, &headers).await?;
    let settings = state.db.get_or_create_settings(&admin.id).await?;
    Ok(Json(settings.into_settings()?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub questions: QuestionSet,
    pub submission_deadline: String,
    pub email_reminders: bool,
    pub reminder_template: ReminderTemplate,
}

/// PUT /settings
pub async fn update_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<Json<WorkspaceSettings>, AppError> {
    let admin = require_admin(&state, &headers).await?;

    if NaiveTime::parse_from_str(&req.submission_deadline, "%H:%M:%S").is_err() {
        return Err(AppError::BadRequest(
            "Submission deadline must be HH:MM:SS".to_string(),
        ));
    }

    // Ensure the row exists so update never silently misses.
    let existing = state.db.get_or_create_settings(&admin.id).await?;

    let row = SettingsRow {
        id: existing.id,
        admin_id: admin.id.clone(),
        questions: serde_json::to_string(&req.questions)
            .map_err(|e| AppError::Internal(e.to_string()))?,
        submission_deadline: req.submission_deadline,
        email_reminders: req.email_reminders,
        reminder_subject: req.reminder_template.subject,
        reminder_body: req.reminder_template.body,
    };
    state.db.update_settings(&row).await?;
    tracing::info!("Workspace settings updated for admin {}", admin.id);

    Ok(Json(row.into_settings()?))
}

/// Send the current reminder template to the admin's own address so they can
/// preview what members will receive.
/// POST /settings/reminder-test
pub async fn reminder_test(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let admin = require_admin(&state, &headers).await?;
    let settings = state
        .db
        .get_or_create_settings(&admin.id)
        .await?
        .into_settings()?;

    let deadline = NaiveTime::parse_from_str(&settings.submission_deadline, "%H:%M:%S")
        .map_err(|_| {
            AppError::Internal(format!(
                "Invalid submission deadline in settings: {}",
                settings.submission_deadline
            ))
        })?;

    let recipient = admin.into_member();
    send_reminder(
        state.mailer.as_ref(),
        &recipient,
        &settings.reminder_template,
        deadline,
    )
    .await
    .map_err(|e| AppError::Internal(format!("Failed to send test email: {}", e)))?;

    Ok(Json(serde_json::json!({ "success": true })))
}
