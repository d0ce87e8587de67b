use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Domain records (wire representation, server <-> web UI)
// ============================================================================

/// A team member as seen by the admin dashboard. `name` is optional because
/// invited members may not have filled in a display name yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub role: String,
    pub invited_by: Option<String>,
}

impl TeamMember {
    /// Display name for greetings and reminder emails, falling back to the
    /// local part of the email address.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.email.split('@').next().unwrap_or(&self.email),
        }
    }
}

/// A submitted daily brief. Immutable after submission except for the review
/// fields, which an admin sets exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brief {
    pub id: String,
    pub user_id: String,
    pub accomplishments: String,
    pub blockers: String,
    pub priorities: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question4_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question5_response: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Brief {
    pub fn is_reviewed(&self) -> bool {
        self.reviewed_by.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
        }
    }
}

/// A pending grant allowing a new member to join a workspace. The `code` is
/// emailed to the invitee and redeemed when they set a password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: String,
    pub code: String,
    pub email: String,
    pub role: String,
    pub status: InvitationStatus,
    pub invited_by: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Invitation {
    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// The per-workspace question set. The first three questions are always
/// present; workspaces may add up to two custom questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSet {
    pub accomplishments: String,
    pub blockers: String,
    pub priorities: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question5: Option<String>,
}

impl Default for QuestionSet {
    fn default() -> Self {
        Self {
            accomplishments: "What did you accomplish today?".to_string(),
            blockers: "What blockers are you facing?".to_string(),
            priorities: "What are your priorities for tomorrow?".to_string(),
            question4: None,
            question5: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderTemplate {
    pub subject: String,
    pub body: String,
}

impl Default for ReminderTemplate {
    fn default() -> Self {
        Self {
            subject: "Reminder: your daily brief is due".to_string(),
            body: "Hi {{name}},\\n\\nYou haven't submitted today's brief yet. \
                   Please submit it before {{deadline}}.\\n\\nThanks!"
                .to_string(),
        }
    }
}

/// One record per admin workspace; mutated only by that admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    pub id: String,
    pub admin_id: String,
    pub questions: QuestionSet,
    /// Submission deadline as `HH:MM:SS`.
    pub submission_deadline: String,
    pub email_reminders: bool,
    pub reminder_template: ReminderTemplate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Admin dashboard filters and statistics
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Submitted,
    Pending,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewFilter {
    #[default]
    All,
    Reviewed,
    Pending,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSelection {
    #[default]
    Today,
    Yesterday,
    Week,
    Custom,
}

/// Custom date range, both bounds as calendar days.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CustomRange {
    pub start: Option<chrono::NaiveDate>,
    pub end: Option<chrono::NaiveDate>,
}

/// Ephemeral filter state held by the dashboard; never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterOptions {
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default)]
    pub review: ReviewFilter,
    #[serde(default)]
    pub date: DateSelection,
    #[serde(default)]
    pub custom_range: CustomRange,
}

/// Submission statistics for a date window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefStats {
    pub total_members: usize,
    pub submitted_count: usize,
    pub pending_count: usize,
    pub submission_rate: f64,
}

// ============================================================================
// Live notification feed (server -> web, over WebSocket)
// ============================================================================

/// Events pushed to a subscribed web client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationFeed {
    /// Current number of unread notifications for the subscriber.
    UnreadCount { count: i64 },
    /// A new notification was just created for the subscriber.
    Notification { notification: Notification },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_email_local_part() {
        let member = TeamMember {
            id: "m1".to_string(),
            name: None,
            email: "jamie@example.com".to_string(),
            avatar_url: None,
            role: "member".to_string(),
            invited_by: Some("a1".to_string()),
        };
        assert_eq!(member.display_name(), "jamie");

        let named = TeamMember {
            name: Some("Jamie".to_string()),
            ..member
        };
        assert_eq!(named.display_name(), "Jamie");
    }

    #[test]
    fn test_filter_options_defaults() {
        let opts: FilterOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts.status, StatusFilter::All);
        assert_eq!(opts.review, ReviewFilter::All);
        assert_eq!(opts.date, DateSelection::Today);
    }

    #[test]
    fn test_notification_feed_serialization() {
        let msg = NotificationFeed::UnreadCount { count: 3 };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"unread_count\""));
        assert!(json.contains("\"count\":3"));
    }

    #[test]
    fn test_invitation_status_round_trip() {
        let json = serde_json::to_string(&InvitationStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
        let status: InvitationStatus = serde_json::from_str("\"accepted\"").unwrap();
        assert_eq!(status, InvitationStatus::Accepted);
    }
}
