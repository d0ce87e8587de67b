//! Pure filtering and aggregation for the admin dashboard.
//!
//! Everything here is side-effect free: the server resolves a date window,
//! loads the team and its briefs for that window, and hands the rest to these
//! functions. All calendar math is done in UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    Brief, BriefStats, CustomRange, DateSelection, ReviewFilter, StatusFilter, TeamMember,
};

/// A half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Maps a named date selection to a concrete window.
///
/// - `today` is `[midnight today, midnight tomorrow)`
/// - `yesterday` is `[midnight yesterday, midnight today)`
/// - `week` is `[midnight seven days ago, midnight tomorrow)`
/// - `custom` spans from the start date through the whole end day
///
/// A custom selection with a missing or inverted range falls back to today's
/// window rather than erroring; range validation is the caller's job.
pub fn resolve_date_window(
    selection: DateSelection,
    custom_range: &CustomRange,
    now: DateTime<Utc>,
) -> DateWindow {
    let today = now.date_naive();
    let today_start = midnight(today);
    let tomorrow_start = midnight(today + Duration::days(1));

    match selection {
        DateSelection::Today => DateWindow {
            start: today_start,
            end: tomorrow_start,
        },
        DateSelection::Yesterday => DateWindow {
            start: midnight(today - Duration::days(1)),
            end: today_start,
        },
        DateSelection::Week => DateWindow {
            start: midnight(today - Duration::days(7)),
            end: tomorrow_start,
        },
        DateSelection::Custom => match (custom_range.start, custom_range.end) {
            (Some(start), Some(end)) if start <= end => DateWindow {
                start: midnight(start),
                end: midnight(end + Duration::days(1)),
            },
            _ => DateWindow {
                start: today_start,
                end: tomorrow_start,
            },
        },
    }
}

/// Finds the brief a member submitted within the supplied window, if any.
/// The brief list is assumed to already be restricted to the window, so only
/// ownership is checked; at most one brief per member is considered.
pub fn brief_for_member<'a>(briefs: &'a [Brief], member_id: &str) -> Option<&'a Brief> {
    briefs.iter().find(|b| b.user_id == member_id)
}

/// Applies the status and review filters to a member list.
///
/// The two filters compose with logical AND. Members without a brief in the
/// window match neither `reviewed` nor `pending` review filters; they appear
/// only under `all`. Input ordering is preserved.
pub fn filter_team_members(
    members: &[TeamMember],
    briefs: &[Brief],
    status: StatusFilter,
    review: ReviewFilter,
) -> Vec<TeamMember> {
    members
        .iter()
        .filter(|member| {
            let brief = brief_for_member(briefs, &member.id);

            let status_ok = match status {
                StatusFilter::All => true,
                StatusFilter::Submitted => brief.is_some(),
                StatusFilter::Pending => brief.is_none(),
            };

            let review_ok = match review {
                ReviewFilter::All => true,
                ReviewFilter::Reviewed => brief.is_some_and(|b| b.is_reviewed()),
                ReviewFilter::Pending => brief.is_some_and(|b| !b.is_reviewed()),
            };

            status_ok && review_ok
        })
        .cloned()
        .collect()
}

/// Counts members that submitted a brief in the window. This deliberately
/// counts by team ownership rather than by raw brief rows, so briefs from
/// outside the admin's team never inflate the numbers.
pub fn count_submitted(members: &[TeamMember], briefs: &[Brief]) -> usize {
    members
        .iter()
        .filter(|m| brief_for_member(briefs, &m.id).is_some())
        .count()
}

/// Derives submission statistics from the member and submission counts.
pub fn compute_stats(total_members: usize, submitted_count: usize) -> BriefStats {
    let submission_rate = if total_members > 0 {
        submitted_count as f64 / total_members as f64 * 100.0
    } else {
        0.0
    };
    BriefStats {
        total_members,
        submitted_count,
        pending_count: total_members.saturating_sub(submitted_count),
        submission_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn member(id: &str) -> TeamMember {
        TeamMember {
            id: id.to_string(),
            name: Some(format!("Member {}", id)),
            email: format!("{}@example.com", id),
            avatar_url: None,
            role: "member".to_string(),
            invited_by: Some("admin".to_string()),
        }
    }

    fn brief(user_id: &str, submitted_at: &str, reviewed: bool) -> Brief {
        let submitted = utc(submitted_at);
        Brief {
            id: format!("brief-{}", user_id),
            user_id: user_id.to_string(),
            accomplishments: "shipped things".to_string(),
            blockers: "none".to_string(),
            priorities: "more things".to_string(),
            question4_response: None,
            question5_response: None,
            submitted_at: submitted,
            reviewed_at: reviewed.then_some(submitted),
            reviewed_by: reviewed.then(|| "admin".to_string()),
            admin_notes: None,
            created_at: submitted,
            updated_at: submitted,
        }
    }

    #[test]
    fn test_today_window_is_independent_of_time_of_day() {
        for now in ["2026-08-24T00:00:00Z", "2026-08-24T13:37:42Z", "2026-08-24T23:59:59Z"] {
            let window =
                resolve_date_window(DateSelection::Today, &CustomRange::default(), utc(now));
            assert_eq!(window.start, utc("2026-08-24T00:00:00Z"));
            assert_eq!(window.end, utc("2026-08-25T00:00:00Z"));
        }
    }

    #[test]
    fn test_yesterday_window() {
        let window = resolve_date_window(
            DateSelection::Yesterday,
            &CustomRange::default(),
            utc("2026-08-24T09:00:00Z"),
        );
        assert_eq!(window.start, utc("2026-08-23T00:00:00Z"));
        assert_eq!(window.end, utc("2026-08-24T00:00:00Z"));
    }

    #[test]
    fn test_week_window_spans_seven_days_back_through_today() {
        let window = resolve_date_window(
            DateSelection::Week,
            &CustomRange::default(),
            utc("2026-08-24T09:00:00Z"),
        );
        assert_eq!(window.start, utc("2026-08-17T00:00:00Z"));
        assert_eq!(window.end, utc("2026-08-25T00:00:00Z"));
    }

    #[test]
    fn test_custom_window_includes_full_end_day() {
        let range = CustomRange {
            start: Some("2026-08-01".parse().unwrap()),
            end: Some("2026-08-03".parse().unwrap()),
        };
        let window =
            resolve_date_window(DateSelection::Custom, &range, utc("2026-08-24T09:00:00Z"));
        assert_eq!(window.start, utc("2026-08-01T00:00:00Z"));
        assert!(window.contains(utc("2026-08-03T23:59:59.999Z")));
        assert!(!window.contains(utc("2026-08-04T00:00:00Z")));
    }

    #[test]
    fn test_custom_window_falls_back_to_today_when_inverted_or_missing() {
        let now = utc("2026-08-24T09:00:00Z");
        let today = resolve_date_window(DateSelection::Today, &CustomRange::default(), now);

        let inverted = CustomRange {
            start: Some("2026-08-10".parse().unwrap()),
            end: Some("2026-08-01".parse().unwrap()),
        };
        assert_eq!(resolve_date_window(DateSelection::Custom, &inverted, now), today);

        let missing = CustomRange {
            start: Some("2026-08-10".parse().unwrap()),
            end: None,
        };
        assert_eq!(resolve_date_window(DateSelection::Custom, &missing, now), today);
    }

    #[test]
    fn test_window_is_half_open() {
        let window = resolve_date_window(
            DateSelection::Today,
            &CustomRange::default(),
            utc("2026-08-24T09:00:00Z"),
        );
        assert!(window.contains(utc("2026-08-24T00:00:00Z")));
        assert!(!window.contains(utc("2026-08-25T00:00:00Z")));
    }

    #[test]
    fn test_no_briefs_means_nobody_submitted() {
        let members = vec![member("a"), member("b")];
        let filtered =
            filter_team_members(&members, &[], StatusFilter::Submitted, ReviewFilter::All);
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_all_all_is_identity() {
        let members = vec![member("a"), member("b"), member("c")];
        let briefs = vec![brief("b", "2026-08-24T10:00:00Z", true)];
        let filtered = filter_team_members(&members, &briefs, StatusFilter::All, ReviewFilter::All);
        let ids: Vec<_> = filtered.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_review_filters_exclude_members_without_briefs() {
        let members = vec![member("a"), member("b"), member("c")];
        let briefs = vec![
            brief("a", "2026-08-24T10:00:00Z", true),
            brief("b", "2026-08-24T11:00:00Z", false),
        ];

        let reviewed =
            filter_team_members(&members, &briefs, StatusFilter::All, ReviewFilter::Reviewed);
        assert_eq!(reviewed.len(), 1);
        assert_eq!(reviewed[0].id, "a");

        let pending =
            filter_team_members(&members, &briefs, StatusFilter::All, ReviewFilter::Pending);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "b");
    }

    #[test]
    fn test_filters_compose_with_and() {
        // Five members, two submitted today, one of those reviewed.
        let members: Vec<_> = ["a", "b", "c", "d", "e"].iter().map(|&id| member(id)).collect();
        let briefs = vec![
            brief("a", "2026-08-24T10:00:00Z", true),
            brief("b", "2026-08-24T11:00:00Z", false),
        ];

        let filtered = filter_team_members(
            &members,
            &briefs,
            StatusFilter::Submitted,
            ReviewFilter::Reviewed,
        );
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "a");

        let stats = compute_stats(members.len(), count_submitted(&members, &briefs));
        assert_eq!(stats.total_members, 5);
        assert_eq!(stats.submitted_count, 2);
        assert_eq!(stats.pending_count, 3);
        assert_eq!(stats.submission_rate, 40.0);
    }

    #[test]
    fn test_submitted_count_ignores_briefs_from_outside_the_team() {
        let members = vec![member("a")];
        let briefs = vec![
            brief("a", "2026-08-24T10:00:00Z", false),
            brief("stranger", "2026-08-24T10:00:00Z", false),
        ];
        assert_eq!(count_submitted(&members, &briefs), 1);
    }

    #[test]
    fn test_stats_basic() {
        let stats = compute_stats(10, 4);
        assert_eq!(stats.pending_count, 6);
        assert_eq!(stats.submission_rate, 40.0);
    }

    #[test]
    fn test_stats_with_no_members() {
        let stats = compute_stats(0, 0);
        assert_eq!(stats.submission_rate, 0.0);
        assert_eq!(stats.pending_count, 0);
    }

    #[test]
    fn test_stats_pending_count_is_clamped() {
        let stats = compute_stats(2, 5);
        assert_eq!(stats.pending_count, 0);
    }
}
