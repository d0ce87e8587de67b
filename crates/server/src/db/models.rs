use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use shared::{
    Brief, Invitation, InvitationStatus, Notification, QuestionSet, ReminderTemplate, TeamMember,
    WorkspaceSettings,
};
use sqlx::FromRow;

/// Timestamps are stored as RFC 3339 strings with a `+00:00` offset so that
/// SQLite range filters can compare them lexicographically.
pub(crate) fn format_ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339()
}

pub(crate) fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("invalid timestamp in database: {}", s))
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub role: String,
    pub invited_by: Option<String>,
    pub created_at: String,
}

impl UserRow {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }

    pub fn into_member(self) -> TeamMember {
        TeamMember {
            id: self.id,
            name: self.name,
            email: self.email,
            avatar_url: self.avatar_url,
            role: self.role,
            invited_by: self.invited_by,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct BriefRow {
    pub id: String,
    pub user_id: String,
    pub accomplishments: String,
    pub blockers: String,
    pub priorities: String,
    pub question4_response: Option<String>,
    pub question5_response: Option<String>,
    pub submitted_at: String,
    pub reviewed_at: Option<String>,
    pub reviewed_by: Option<String>,
    pub admin_notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl BriefRow {
    pub fn into_brief(self) -> Result<Brief> {
        Ok(Brief {
            id: self.id,
            user_id: self.user_id,
            accomplishments: self.accomplishments,
            blockers: self.blockers,
            priorities: self.priorities,
            question4_response: self.question4_response,
            question5_response: self.question5_response,
            submitted_at: parse_ts(&self.submitted_at)?,
            reviewed_at: self.reviewed_at.as_deref().map(parse_ts).transpose()?,
            reviewed_by: self.reviewed_by,
            admin_notes: self.admin_notes,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct InvitationRow {
    pub id: String,
    pub code: String,
    pub email: String,
    pub role: String,
    pub status: String,
    pub invited_by: String,
    pub created_at: String,
    pub expires_at: String,
}

impl InvitationRow {
    pub fn is_pending(&self) -> bool {
        self.status == "pending"
    }

    pub fn into_invitation(self) -> Result<Invitation> {
        let status = match self.status.as_str() {
            "accepted" => InvitationStatus::Accepted,
            _ => InvitationStatus::Pending,
        };
        Ok(Invitation {
            id: self.id,
            code: self.code,
            email: self.email,
            role: self.role,
            status,
            invited_by: self.invited_by,
            created_at: parse_ts(&self.created_at)?,
            expires_at: parse_ts(&self.expires_at)?,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SettingsRow {
    pub id: String,
    pub admin_id: String,
    /// Question set serialized as JSON.
    pub questions: String,
    pub submission_deadline: String,
    pub email_reminders: bool,
    pub reminder_subject: String,
    pub reminder_body: String,
}

impl SettingsRow {
    pub fn into_settings(self) -> Result<WorkspaceSettings> {
        let questions: QuestionSet = serde_json::from_str(&self.questions)
            .context("invalid question set in database")?;
        Ok(WorkspaceSettings {
            id: self.id,
            admin_id: self.admin_id,
            questions,
            submission_deadline: self.submission_deadline,
            email_reminders: self.email_reminders,
            reminder_template: ReminderTemplate {
                subject: self.reminder_subject,
                body: self.reminder_body,
            },
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub message: String,
    pub read: bool,
    pub created_at: String,
}

impl NotificationRow {
    pub fn into_notification(self) -> Result<Notification> {
        Ok(Notification {
            id: self.id,
            sender_id: self.sender_id,
            recipient_id: self.recipient_id,
            message: self.message,
            read: self.read,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}
