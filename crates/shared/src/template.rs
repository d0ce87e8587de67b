//! Reminder template rendering.
//!
//! Templates are plain text with two placeholders: `{{name}}` (the member's
//! display name) and `{{deadline}}` (the workspace submission deadline,
//! rendered as `h:mm a`, e.g. `5:00 PM`). The template editor stores line
//! breaks as the literal two-character sequence `\n`; rendering turns those
//! into real line breaks before anything is sent.

use chrono::NaiveTime;

use crate::types::{ReminderTemplate, TeamMember};

/// A reminder ready to hand to the mail transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReminder {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Formats a deadline as `h:mm a`, e.g. `17:00:00` -> `5:00 PM`.
pub fn format_deadline(deadline: NaiveTime) -> String {
    deadline.format("%-I:%M %p").to_string()
}

fn substitute(input: &str, name: &str, deadline: &str) -> String {
    input
        .replace("{{name}}", name)
        .replace("{{deadline}}", deadline)
}

/// Renders a reminder template for one member. Both subject and body support
/// the placeholders; only the body gets line-break handling.
pub fn render_reminder(
    template: &ReminderTemplate,
    member: &TeamMember,
    deadline: NaiveTime,
) -> RenderedReminder {
    let name = member.display_name();
    let deadline = format_deadline(deadline);

    let subject = substitute(&template.subject, name, &deadline);
    let text = substitute(&template.body, name, &deadline).replace("\\n", "\n");
    let html = text.replace('\n', "<br>");

    RenderedReminder { subject, text, html }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jamie() -> TeamMember {
        TeamMember {
            id: "m1".to_string(),
            name: Some("Jamie".to_string()),
            email: "jamie@example.com".to_string(),
            avatar_url: None,
            role: "member".to_string(),
            invited_by: Some("admin".to_string()),
        }
    }

    fn deadline(s: &str) -> NaiveTime {
        s.parse().unwrap()
    }

    #[test]
    fn test_name_and_deadline_substitution() {
        let template = ReminderTemplate {
            subject: "Brief due at {{deadline}}".to_string(),
            body: "Hi {{name}}, deadline {{deadline}}".to_string(),
        };
        let rendered = render_reminder(&template, &jamie(), deadline("17:00:00"));
        assert_eq!(rendered.subject, "Brief due at 5:00 PM");
        assert_eq!(rendered.text, "Hi Jamie, deadline 5:00 PM");
    }

    #[test]
    fn test_morning_deadline_has_no_leading_zero() {
        assert_eq!(format_deadline(deadline("09:05:00")), "9:05 AM");
    }

    #[test]
    fn test_name_falls_back_to_email_local_part() {
        let mut member = jamie();
        member.name = None;
        let template = ReminderTemplate {
            subject: "Reminder".to_string(),
            body: "Hi {{name}}".to_string(),
        };
        let rendered = render_reminder(&template, &member, deadline("17:00:00"));
        assert_eq!(rendered.text, "Hi jamie");
    }

    #[test]
    fn test_literal_backslash_n_becomes_line_break() {
        let template = ReminderTemplate {
            subject: "Reminder".to_string(),
            body: "Line one\\nLine two".to_string(),
        };
        let rendered = render_reminder(&template, &jamie(), deadline("17:00:00"));
        assert_eq!(rendered.text, "Line one\nLine two");
        assert_eq!(rendered.html, "Line one<br>Line two");
    }
}
