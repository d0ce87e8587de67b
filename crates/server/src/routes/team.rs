use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::{Duration, NaiveTime, Utc};
use rand::Rng;
use serde::Deserialize;
use shared::{
    filter_team_members, resolve_date_window, CustomRange, DateSelection, Invitation,
    ReminderTemplate, ReviewFilter, StatusFilter, TeamMember, WorkspaceSettings,
};
use uuid::Uuid;

use crate::{
    db::{format_ts, InvitationRow},
    error::AppError,
    mail::{MailSender, OutboundEmail},
    reminders::{send_reminder, send_reminders, ReminderSummary},
    routes::auth::require_admin,
    state::AppState,
};

const INVITATION_EXPIRY_DAYS: i64 = 7;

/// GET /team/members
pub async fn list_members(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<TeamMember>>, AppError> {
    let admin = require_admin(&state, &headers).await?;
    let members = state
        .db
        .list_team_members(&admin.id)
        .await?
        .into_iter()
        .map(|row| row.into_member())
        .collect();
    Ok(Json(members))
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub email: String,
}

/// Invite a new member. If a pending invitation for this email already
/// exists, it is returned instead of creating a duplicate.
/// POST /team/invitations
pub async fn create_invitation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<InviteRequest>,
) -> Result<Json<Invitation>, AppError> {
    let admin = require_admin(&state, &headers).await?;

    if !req.email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }

    if let Some(existing_user) = state.db.get_user_by_email(&req.email).await? {
        if existing_user.invited_by.as_deref() == Some(admin.id.as_str()) {
            return Err(AppError::BadRequest(
                "This person is already a member of your team".to_string(),
            ));
        }
        return Err(AppError::BadRequest("Email already registered".to_string()));
    }

    if let Some(existing) = state.db.get_pending_invitation(&admin.id, &req.email).await? {
        return Ok(Json(existing.into_invitation()?));
    }

    // Generate 8-character alphanumeric invitation code
    let code: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(8)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();

    let now = Utc::now();
    let invitation = InvitationRow {
        id: Uuid::new_v4().to_string(),
        code: code.clone(),
        email: req.email.clone(),
        role: "member".to_string(),
        status: "pending".to_string(),
        invited_by: admin.id.clone(),
        created_at: format_ts(now),
        expires_at: format_ts(now + Duration::days(INVITATION_EXPIRY_DAYS)),
    };
    state.db.create_invitation(&invitation).await?;
    tracing::info!("Invitation {} created for {}", invitation.id, req.email);

    // Send the invitation email; a transport failure is logged but never
    // fails the request, since the admin can re-share the code.
    if state.config.smtp.enabled {
        let admin_name = admin.clone().into_member().display_name().to_string();
        let accept_url = format!(
            "{}/accept-invitation?code={}",
            state.config.server.public_url, code
        );
        let text = format!(
            "{} invited you to join their team on Briefly.\n\nAccept the invitation and set \
             your password here:\n{}\n\nThis invitation expires in {} days.",
            admin_name, accept_url, INVITATION_EXPIRY_DAYS
        );
        let email = OutboundEmail {
            to: req.email.clone(),
            subject: format!("{} invited you to Briefly", admin_name),
            html: Some(text.replace('\n', "<br>")),
            text,
        };
        if let Err(e) = state.mailer.send(email).await {
            tracing::error!("Failed to send invitation email to {}: {}", req.email, e);
        }
    } else {
        tracing::warn!("SMTP not configured, invitation code for {}: {}", req.email, code);
    }

    Ok(Json(invitation.into_invitation()?))
}

/// GET /team/invitations
pub async fn list_invitations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Invitation>>, AppError> {
    let admin = require_admin(&state, &headers).await?;
    let invitations = state
        .db
        .list_invitations(&admin.id)
        .await?
        .into_iter()
        .map(|row| row.into_invitation())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(invitations))
}

/// Withdraw a pending invitation. Accepted invitations cannot be deleted.
/// DELETE /team/invitations/:id
pub async fn delete_invitation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(invitation_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let admin = require_admin(&state, &headers).await?;
    let deleted = state.db.delete_invitation(&invitation_id, &admin.id).await?;
    if !deleted {
        return Err(AppError::NotFound(
            "No pending invitation with that id".to_string(),
        ));
    }
    tracing::info!("Invitation {} deleted by {}", invitation_id, admin.id);
    Ok(Json(serde_json::json!({ "success": true })))
}

fn parse_deadline(settings: &WorkspaceSettings) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(&settings.submission_deadline, "%H:%M:%S").map_err(|_| {
        AppError::Internal(format!(
            "Invalid submission deadline in settings: {}",
            settings.submission_deadline
        ))
    })
}

fn reminder_template(settings: &WorkspaceSettings) -> ReminderTemplate {
    settings.reminder_template.clone()
}

/// Send a reminder email to every member who has not submitted today's brief,
/// one at a time with a fixed delay between sends.
/// POST /team/reminders
pub async fn send_team_reminders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ReminderSummary>, AppError> {
    let admin = require_admin(&state, &headers).await?;
    let settings = state
        .db
        .get_or_create_settings(&admin.id)
        .await?
        .into_settings()?;
    if !settings.email_reminders {
        return Err(AppError::BadRequest(
            "Email reminders are disabled for this workspace".to_string(),
        ));
    }
    let deadline = parse_deadline(&settings)?;

    let window = resolve_date_window(DateSelection::Today, &CustomRange::default(), Utc::now());
    let members: Vec<TeamMember> = state
        .db
        .list_team_members(&admin.id)
        .await?
        .into_iter()
        .map(|row| row.into_member())
        .collect();
    let member_ids: Vec<String> = members.iter().map(|m| m.id.clone()).collect();
    let briefs = state
        .db
        .list_team_briefs(&member_ids, &window)
        .await?
        .into_iter()
        .map(|row| row.into_brief())
        .collect::<Result<Vec<_>, _>>()?;

    let pending = filter_team_members(&members, &briefs, StatusFilter::Pending, ReviewFilter::All);
    tracing::info!(
        "Sending reminders to {} pending members for admin {}",
        pending.len(),
        admin.id
    );

    let delay = std::time::Duration::from_millis(state.config.reminders.send_delay_ms);
    let summary = send_reminders(
        state.mailer.as_ref(),
        &pending,
        &reminder_template(&settings),
        deadline,
        delay,
    )
    .await;

    Ok(Json(summary))
}

/// Send a reminder to a single member of the admin's team.
/// POST /team/reminders/:member_id
pub async fn send_member_reminder(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(member_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let admin = require_admin(&state, &headers).await?;
    let settings = state
        .db
        .get_or_create_settings(&admin.id)
        .await?
        .into_settings()?;
    let deadline = parse_deadline(&settings)?;

    let member = state
        .db
        .get_user_by_id(&member_id)
        .await?
        .filter(|u| u.invited_by.as_deref() == Some(admin.id.as_str()))
        .ok_or_else(|| AppError::NotFound("No such member on your team".to_string()))?
        .into_member();

    send_reminder(
        state.mailer.as_ref(),
        &member,
        &reminder_template(&settings),
        deadline,
    )
    .await
    .map_err(|e| AppError::Internal(format!("Failed to send reminder: {}", e)))?;

    Ok(Json(serde_json::json!({ "success": true })))
}
