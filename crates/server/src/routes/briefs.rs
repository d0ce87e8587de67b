use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::{
    brief_for_member, compute_stats, count_submitted, filter_team_members, resolve_date_window,
    Brief, BriefStats, CustomRange, DateSelection, DateWindow, NotificationFeed, ReviewFilter,
    StatusFilter, TeamMember,
};
use uuid::Uuid;

use crate::{
    db::{format_ts, BriefRow, NotificationRow},
    error::AppError,
    routes::auth::{current_user, require_admin},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SubmitBriefRequest {
    pub accomplishments: String,
    pub blockers: String,
    pub priorities: String,
    #[serde(default)]
    pub question4_response: Option<String>,
    #[serde(default)]
    pub question5_response: Option<String>,
}

/// Submit today's brief. One brief per member per calendar day: a second
/// submission the same day is rejected rather than overwritten.
/// POST /briefs
pub async fn submit_brief(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SubmitBriefRequest>,
) -> Result<Json<Brief>, AppError> {
    let user = current_user(&state, &headers).await?;

    if req.accomplishments.trim().is_empty()
        || req.blockers.trim().is_empty()
        || req.priorities.trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "Accomplishments, blockers and priorities are required".to_string(),
        ));
    }

    let now = Utc::now();
    let today = resolve_date_window(DateSelection::Today, &CustomRange::default(), now);
    if state
        .db
        .get_brief_for_user_in_window(&user.id, &today)
        .await?
        .is_some()
    {
        return Err(AppError::BadRequest(
            "You have already submitted a brief today".to_string(),
        ));
    }

    let row = BriefRow {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        accomplishments: req.accomplishments,
        blockers: req.blockers,
        priorities: req.priorities,
        question4_response: req.question4_response,
        question5_response: req.question5_response,
        submitted_at: format_ts(now),
        reviewed_at: None,
        reviewed_by: None,
        admin_notes: None,
        created_at: format_ts(now),
        updated_at: format_ts(now),
    };
    state.db.create_brief(&row).await?;
    tracing::info!("Brief {} submitted by {}", row.id, user.id);

    Ok(Json(row.into_brief()?))
}

/// GET /briefs/mine
pub async fn my_briefs(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Brief>>, AppError> {
    let user = current_user(&state, &headers).await?;
    let briefs = state
        .db
        .list_briefs_for_user(&user.id)
        .await?
        .into_iter()
        .map(|row| row.into_brief())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(briefs))
}

#[derive(Debug, Deserialize)]
pub struct TeamBriefQuery {
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default)]
    pub review: ReviewFilter,
    #[serde(default)]
    pub date: DateSelection,
    #[serde(default)]
    pub start: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub end: Option<chrono::NaiveDate>,
}

impl TeamBriefQuery {
    fn resolve_window(&self) -> Result<DateWindow, AppError> {
        let now = Utc::now();
        if self.date == DateSelection::Custom {
            if let Some(start) = self.start {
                if start > now.date_naive() {
                    return Err(AppError::BadRequest(
                        "Custom range cannot start in the future".to_string(),
                    ));
                }
            }
        }
        let range = CustomRange {
            start: self.start,
            end: self.end,
        };
        Ok(resolve_date_window(self.date, &range, now))
    }
}

#[derive(Debug, Serialize)]
pub struct TeamBriefEntry {
    pub member: TeamMember,
    pub brief: Option<Brief>,
}

#[derive(Debug, Serialize)]
pub struct TeamBriefsResponse {
    pub window: DateWindow,
    pub members: Vec<TeamBriefEntry>,
}

/// Loads the admin's team and the team-scoped briefs for the resolved window.
async fn load_team_window(
    state: &AppState,
    admin_id: &str,
    window: &DateWindow,
) -> Result<(Vec<TeamMember>, Vec<Brief>), AppError> {
    let members: Vec<TeamMember> = state
        .db
        .list_team_members(admin_id)
        .await?
        .into_iter()
        .map(|row| row.into_member())
        .collect();

    let member_ids: Vec<String> = members.iter().map(|m| m.id.clone()).collect();
    let briefs = state
        .db
        .list_team_briefs(&member_ids, window)
        .await?
        .into_iter()
        .map(|row| row.into_brief())
        .collect::<Result<Vec<_>, _>>()?;

    Ok((members, briefs))
}

/// Admin dashboard listing: members matching the filters, each with their
/// brief for the window (if any).
/// GET /team/briefs
pub async fn team_briefs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TeamBriefQuery>,
) -> Result<Json<TeamBriefsResponse>, AppError> {
    let admin = require_admin(&state, &headers).await?;
    let window = query.resolve_window()?;
    let (members, briefs) = load_team_window(&state, &admin.id, &window).await?;

    let filtered = filter_team_members(&members, &briefs, query.status, query.review);
    let entries = filtered
        .into_iter()
        .map(|member| {
            let brief = brief_for_member(&briefs, &member.id).cloned();
            TeamBriefEntry { member, brief }
        })
        .collect();

    Ok(Json(TeamBriefsResponse {
        window,
        members: entries,
    }))
}

/// Submission statistics for the window. Counts are team-scoped: briefs from
/// authors outside the admin's team are never included.
/// GET /team/briefs/stats
pub async fn team_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TeamBriefQuery>,
) -> Result<Json<BriefStats>, AppError> {
    let admin = require_admin(&state, &headers).await?;
    let window = query.resolve_window()?;
    let (members, briefs) = load_team_window(&state, &admin.id, &window).await?;

    let submitted = count_submitted(&members, &briefs);
    Ok(Json(compute_stats(members.len(), submitted)))
}

#[derive(Debug, Deserialize, Default)]
pub struct ReviewBriefRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

/// Mark a brief reviewed, optionally with notes, and notify its author. The
/// review fields are set exactly once.
/// POST /briefs/:id/review
pub async fn review_brief(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(brief_id): Path<String>,
    Json(req): Json<ReviewBriefRequest>,
) -> Result<Json<Brief>, AppError> {
    let admin = require_admin(&state, &headers).await?;

    let brief = state
        .db
        .get_brief(&brief_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Brief not found".to_string()))?;

    let author = state
        .db
        .get_user_by_id(&brief.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Brief author not found".to_string()))?;
    if author.invited_by.as_deref() != Some(admin.id.as_str()) {
        return Err(AppError::Forbidden(
            "You can only review briefs from your own team".to_string(),
        ));
    }

    let reviewed = state
        .db
        .review_brief(&brief_id, &admin.id, req.notes.as_deref(), Utc::now())
        .await?;
    if !reviewed {
        return Err(AppError::BadRequest(
            "Brief has already been reviewed".to_string(),
        ));
    }

    // Fan out: persist the notification, then nudge any live subscriber.
    let reviewer_name = admin.clone().into_member().display_name().to_string();
    let notification = NotificationRow {
        id: Uuid::new_v4().to_string(),
        sender_id: admin.id.clone(),
        recipient_id: author.id.clone(),
        message: format!("{} has reviewed your brief", reviewer_name),
        read: false,
        created_at: format_ts(Utc::now()),
    };
    state.db.create_notification(&notification).await?;

    let unread = state.db.unread_count(&author.id).await?;
    state
        .notifications
        .push(&author.id, NotificationFeed::Notification {
            notification: notification.clone().into_notification()?,
        })
        .await;
    state
        .notifications
        .push(&author.id, NotificationFeed::UnreadCount { count: unread })
        .await;

    tracing::info!("Brief {} reviewed by {}", brief_id, admin.id);

    let updated = state
        .db
        .get_brief(&brief_id)
        .await?
        .ok_or_else(|| AppError::Internal("Reviewed brief disappeared".to_string()))?;
    Ok(Json(updated.into_brief()?))
}
