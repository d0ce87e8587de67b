use anyhow::Result;
use chrono::{DateTime, Utc};
use shared::{DateWindow, QuestionSet, ReminderTemplate};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use uuid::Uuid;

mod models;

pub use models::*;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(path: &str) -> Result<Self> {
        // Ensure the directory exists
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", path);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await?;

        Ok(Self { pool })
    }

    #[cfg(test)]
    pub async fn new_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                name TEXT,
                password_hash TEXT NOT NULL,
                avatar_url TEXT,
                role TEXT NOT NULL DEFAULT 'member',
                invited_by TEXT REFERENCES users(id),
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS briefs (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id),
                accomplishments TEXT NOT NULL,
                blockers TEXT NOT NULL,
                priorities TEXT NOT NULL,
                question4_response TEXT,
                question5_response TEXT,
                submitted_at TEXT NOT NULL,
                reviewed_at TEXT,
                reviewed_by TEXT REFERENCES users(id),
                admin_notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS invitations (
                id TEXT PRIMARY KEY,
                code TEXT UNIQUE NOT NULL,
                email TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'member',
                status TEXT NOT NULL DEFAULT 'pending',
                invited_by TEXT NOT NULL REFERENCES users(id),
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS workspace_settings (
                id TEXT PRIMARY KEY,
                admin_id TEXT UNIQUE NOT NULL REFERENCES users(id),
                questions TEXT NOT NULL,
                submission_deadline TEXT NOT NULL,
                email_reminders INTEGER NOT NULL DEFAULT 1,
                reminder_subject TEXT NOT NULL,
                reminder_body TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                sender_id TEXT NOT NULL REFERENCES users(id),
                recipient_id TEXT NOT NULL REFERENCES users(id),
                message TEXT NOT NULL,
                read INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("Database migrations completed");
        Ok(())
    }

    // User operations
    pub async fn create_user(&self, user: &UserRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, password_hash, avatar_url, role, invited_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(&user.avatar_url)
        .bind(&user.role)
        .bind(&user.invited_by)
        .bind(&user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Members belonging to an admin's workspace, in a stable order.
    pub async fn list_team_members(&self, admin_id: &str) -> Result<Vec<UserRow>> {
        let members = sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users WHERE invited_by = ? AND role = 'member' ORDER BY created_at ASC",
        )
        .bind(admin_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    // Brief operations
    pub async fn create_brief(&self, brief: &BriefRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO briefs (
                id, user_id, accomplishments, blockers, priorities,
                question4_response, question5_response,
                submitted_at, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&brief.id)
        .bind(&brief.user_id)
        .bind(&brief.accomplishments)
        .bind(&brief.blockers)
        .bind(&brief.priorities)
        .bind(&brief.question4_response)
        .bind(&brief.question5_response)
        .bind(&brief.submitted_at)
        .bind(&brief.created_at)
        .bind(&brief.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_brief(&self, id: &str) -> Result<Option<BriefRow>> {
        let brief = sqlx::query_as::<_, BriefRow>("SELECT * FROM briefs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(brief)
    }

    /// The brief a user submitted within a window, if any. Used for the
    /// one-brief-per-day check and for per-member lookups.
    pub async fn get_brief_for_user_in_window(
        &self,
        user_id: &str,
        window: &DateWindow,
    ) -> Result<Option<BriefRow>> {
        let brief = sqlx::query_as::<_, BriefRow>(
            "SELECT * FROM briefs WHERE user_id = ? AND submitted_at >= ? AND submitted_at < ? LIMIT 1",
        )
        .bind(user_id)
        .bind(format_ts(window.start))
        .bind(format_ts(window.end))
        .fetch_optional(&self.pool)
        .await?;
        Ok(brief)
    }

    pub async fn list_briefs_for_user(&self, user_id: &str) -> Result<Vec<BriefRow>> {
        let briefs = sqlx::query_as::<_, BriefRow>(
            "SELECT * FROM briefs WHERE user_id = ? ORDER BY submitted_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(briefs)
    }

    /// Briefs submitted by the given members within the window. Fails closed:
    /// an empty member list returns no rows without touching the store, so an
    /// unscoped date-only query can never happen.
    pub async fn list_team_briefs(
        &self,
        member_ids: &[String],
        window: &DateWindow,
    ) -> Result<Vec<BriefRow>> {
        if member_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; member_ids.len()].join(", ");
        let sql = format!(
            "SELECT * FROM briefs WHERE user_id IN ({}) AND submitted_at >= ? AND submitted_at < ? ORDER BY submitted_at DESC",
            placeholders
        );

        let mut query = sqlx::query_as::<_, BriefRow>(&sql);
        for id in member_ids {
            query = query.bind(id);
        }
        let briefs = query
            .bind(format_ts(window.start))
            .bind(format_ts(window.end))
            .fetch_all(&self.pool)
            .await?;
        Ok(briefs)
    }

    /// Marks a brief reviewed. The review fields are set exactly once; a brief
    /// that is already reviewed is left untouched and `false` is returned.
    pub async fn review_brief(
        &self,
        id: &str,
        reviewer_id: &str,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE briefs
            SET reviewed_at = ?, reviewed_by = ?, admin_notes = ?, updated_at = ?
            WHERE id = ? AND reviewed_by IS NULL
            "#,
        )
        .bind(format_ts(now))
        .bind(reviewer_id)
        .bind(notes)
        .bind(format_ts(now))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // Invitation operations
    pub async fn create_invitation(&self, invitation: &InvitationRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO invitations (id, code, email, role, status, invited_by, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&invitation.id)
        .bind(&invitation.code)
        .bind(&invitation.email)
        .bind(&invitation.role)
        .bind(&invitation.status)
        .bind(&invitation.invited_by)
        .bind(&invitation.created_at)
        .bind(&invitation.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_invitation(&self, id: &str) -> Result<Option<InvitationRow>> {
        let invitation = sqlx::query_as::<_, InvitationRow>("SELECT * FROM invitations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(invitation)
    }

    pub async fn get_invitation_by_code(&self, code: &str) -> Result<Option<InvitationRow>> {
        let invitation =
            sqlx::query_as::<_, InvitationRow>("SELECT * FROM invitations WHERE code = ?")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;
        Ok(invitation)
    }

    pub async fn get_pending_invitation(
        &self,
        admin_id: &str,
        email: &str,
    ) -> Result<Option<InvitationRow>> {
        let invitation = sqlx::query_as::<_, InvitationRow>(
            "SELECT * FROM invitations WHERE invited_by = ? AND email = ? AND status = 'pending'",
        )
        .bind(admin_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(invitation)
    }

    pub async fn list_invitations(&self, admin_id: &str) -> Result<Vec<InvitationRow>> {
        let invitations = sqlx::query_as::<_, InvitationRow>(
            "SELECT * FROM invitations WHERE invited_by = ? ORDER BY created_at DESC",
        )
        .bind(admin_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(invitations)
    }

    /// Deletes a pending invitation owned by the admin. Accepted invitations
    /// are kept as a record of how the member joined.
    pub async fn delete_invitation(&self, id: &str, admin_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM invitations WHERE id = ? AND invited_by = ? AND status = 'pending'",
        )
        .bind(id)
        .bind(admin_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn accept_invitation(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE invitations SET status = 'accepted' WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // Workspace settings operations
    pub async fn get_or_create_settings(&self, admin_id: &str) -> Result<SettingsRow> {
        if let Some(settings) =
            sqlx::query_as::<_, SettingsRow>("SELECT * FROM workspace_settings WHERE admin_id = ?")
                .bind(admin_id)
                .fetch_optional(&self.pool)
                .await?
        {
            return Ok(settings);
        }

        let template = ReminderTemplate::default();
        let settings = SettingsRow {
            id: Uuid::new_v4().to_string(),
            admin_id: admin_id.to_string(),
            questions: serde_json::to_string(&QuestionSet::default())?,
            submission_deadline: "17:00:00".to_string(),
            email_reminders: true,
            reminder_subject: template.subject,
            reminder_body: template.body,
        };

        sqlx::query(
            r#"
            INSERT INTO workspace_settings
                (id, admin_id, questions, submission_deadline, email_reminders, reminder_subject, reminder_body)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&settings.id)
        .bind(&settings.admin_id)
        .bind(&settings.questions)
        .bind(&settings.submission_deadline)
        .bind(settings.email_reminders)
        .bind(&settings.reminder_subject)
        .bind(&settings.reminder_body)
        .execute(&self.pool)
        .await?;

        tracing::info!("Created default workspace settings for admin {}", admin_id);
        Ok(settings)
    }

    pub async fn update_settings(&self, settings: &SettingsRow) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE workspace_settings
            SET questions = ?, submission_deadline = ?, email_reminders = ?,
                reminder_subject = ?, reminder_body = ?
            WHERE admin_id = ?
            "#,
        )
        .bind(&settings.questions)
        .bind(&settings.submission_deadline)
        .bind(settings.email_reminders)
        .bind(&settings.reminder_subject)
        .bind(&settings.reminder_body)
        .bind(&settings.admin_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // Notification operations
    pub async fn create_notification(&self, notification: &NotificationRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, sender_id, recipient_id, message, read, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&notification.id)
        .bind(&notification.sender_id)
        .bind(&notification.recipient_id)
        .bind(&notification.message)
        .bind(notification.read)
        .bind(&notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_notification(&self, id: &str) -> Result<Option<NotificationRow>> {
        let notification =
            sqlx::query_as::<_, NotificationRow>("SELECT * FROM notifications WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(notification)
    }

    pub async fn list_notifications(
        &self,
        recipient_id: &str,
        limit: i64,
    ) -> Result<Vec<NotificationRow>> {
        let notifications = sqlx::query_as::<_, NotificationRow>(
            "SELECT * FROM notifications WHERE recipient_id = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(recipient_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    pub async fn unread_count(&self, recipient_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = ? AND read = 0",
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Idempotent: marking an already-read notification is a no-op.
    pub async fn mark_notification_read(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE notifications SET read = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{resolve_date_window, CustomRange, DateSelection};

    async fn test_db() -> Database {
        let db = Database::new_in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        db
    }

    fn user(id: &str, role: &str, invited_by: Option<&str>) -> UserRow {
        UserRow {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            name: Some(id.to_string()),
            password_hash: "hash".to_string(),
            avatar_url: None,
            role: role.to_string(),
            invited_by: invited_by.map(str::to_string),
            created_at: format_ts(Utc::now()),
        }
    }

    fn brief(id: &str, user_id: &str, submitted_at: DateTime<Utc>) -> BriefRow {
        BriefRow {
            id: id.to_string(),
            user_id: user_id.to_string(),
            accomplishments: "shipped the thing".to_string(),
            blockers: "none".to_string(),
            priorities: "the next thing".to_string(),
            question4_response: None,
            question5_response: None,
            submitted_at: format_ts(submitted_at),
            reviewed_at: None,
            reviewed_by: None,
            admin_notes: None,
            created_at: format_ts(submitted_at),
            updated_at: format_ts(submitted_at),
        }
    }

    fn today_window() -> DateWindow {
        resolve_date_window(DateSelection::Today, &CustomRange::default(), Utc::now())
    }

    #[tokio::test]
    async fn test_submit_then_list_round_trip() {
        let db = test_db().await;
        db.create_user(&user("admin", "admin", None)).await.unwrap();
        db.create_user(&user("m1", "member", Some("admin"))).await.unwrap();

        db.create_brief(&brief("b1", "m1", Utc::now())).await.unwrap();

        let briefs = db.list_briefs_for_user("m1").await.unwrap();
        assert_eq!(briefs.len(), 1);
        let brief = briefs[0].clone().into_brief().unwrap();
        assert_eq!(brief.id, "b1");
        assert!(brief.reviewed_at.is_none());
        assert!(brief.reviewed_by.is_none());
    }

    #[tokio::test]
    async fn test_same_day_lookup_finds_todays_brief() {
        let db = test_db().await;
        db.create_user(&user("admin", "admin", None)).await.unwrap();
        db.create_user(&user("m1", "member", Some("admin"))).await.unwrap();
        db.create_brief(&brief("b1", "m1", Utc::now())).await.unwrap();

        let window = today_window();
        assert!(db
            .get_brief_for_user_in_window("m1", &window)
            .await
            .unwrap()
            .is_some());
        assert!(db
            .get_brief_for_user_in_window("m2", &window)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_review_fields_are_set_exactly_once() {
        let db = test_db().await;
        db.create_user(&user("admin", "admin", None)).await.unwrap();
        db.create_user(&user("m1", "member", Some("admin"))).await.unwrap();
        db.create_brief(&brief("b1", "m1", Utc::now())).await.unwrap();

        let first = db
            .review_brief("b1", "admin", Some("nice work"), Utc::now())
            .await
            .unwrap();
        assert!(first);

        let second = db.review_brief("b1", "admin", None, Utc::now()).await.unwrap();
        assert!(!second);

        let row = db.get_brief("b1").await.unwrap().unwrap();
        assert_eq!(row.reviewed_by.as_deref(), Some("admin"));
        assert_eq!(row.admin_notes.as_deref(), Some("nice work"));
    }

    #[tokio::test]
    async fn test_team_briefs_fail_closed_on_empty_member_list() {
        let db = test_db().await;
        db.create_user(&user("admin", "admin", None)).await.unwrap();
        db.create_user(&user("m1", "member", Some("admin"))).await.unwrap();
        db.create_brief(&brief("b1", "m1", Utc::now())).await.unwrap();

        let briefs = db.list_team_briefs(&[], &today_window()).await.unwrap();
        assert!(briefs.is_empty());
    }

    #[tokio::test]
    async fn test_team_briefs_are_scoped_to_member_ids_and_window() {
        let db = test_db().await;
        db.create_user(&user("admin", "admin", None)).await.unwrap();
        db.create_user(&user("m1", "member", Some("admin"))).await.unwrap();
        db.create_user(&user("outsider", "member", None)).await.unwrap();

        db.create_brief(&brief("b1", "m1", Utc::now())).await.unwrap();
        db.create_brief(&brief("b2", "outsider", Utc::now())).await.unwrap();
        db.create_brief(&brief("b3", "m1", Utc::now() - chrono::Duration::days(3)))
            .await
            .unwrap();

        let briefs = db
            .list_team_briefs(&["m1".to_string()], &today_window())
            .await
            .unwrap();
        assert_eq!(briefs.len(), 1);
        assert_eq!(briefs[0].id, "b1");
    }

    #[tokio::test]
    async fn test_mark_notification_read_is_idempotent() {
        let db = test_db().await;
        db.create_user(&user("admin", "admin", None)).await.unwrap();
        db.create_user(&user("m1", "member", Some("admin"))).await.unwrap();

        let notification = NotificationRow {
            id: "n1".to_string(),
            sender_id: "admin".to_string(),
            recipient_id: "m1".to_string(),
            message: "admin has reviewed your brief".to_string(),
            read: false,
            created_at: format_ts(Utc::now()),
        };
        db.create_notification(&notification).await.unwrap();
        assert_eq!(db.unread_count("m1").await.unwrap(), 1);

        db.mark_notification_read("n1").await.unwrap();
        db.mark_notification_read("n1").await.unwrap();

        let row = db.get_notification("n1").await.unwrap().unwrap();
        assert!(row.read);
        assert_eq!(db.unread_count("m1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_only_pending_invitations_can_be_deleted() {
        let db = test_db().await;
        db.create_user(&user("admin", "admin", None)).await.unwrap();

        let now = Utc::now();
        let invitation = InvitationRow {
            id: "i1".to_string(),
            code: "ABCD1234".to_string(),
            email: "new@example.com".to_string(),
            role: "member".to_string(),
            status: "pending".to_string(),
            invited_by: "admin".to_string(),
            created_at: format_ts(now),
            expires_at: format_ts(now + chrono::Duration::days(7)),
        };
        db.create_invitation(&invitation).await.unwrap();

        db.accept_invitation("i1").await.unwrap();
        assert!(!db.delete_invitation("i1", "admin").await.unwrap());

        let row = db.get_invitation("i1").await.unwrap().unwrap();
        assert_eq!(row.status, "accepted");
    }
}
