//! Reminder dispatch sequencer.
//!
//! Reminders go out strictly one at a time: send, wait for the result, sleep
//! a fixed delay, move on. The delay is pacing for the mail transport's rate
//! limit, not a retry mechanism; a failed send is recorded per member and the
//! batch keeps going.

use std::time::Duration;

use chrono::NaiveTime;
use serde::Serialize;
use shared::{render_reminder, ReminderTemplate, TeamMember};

use crate::mail::{MailError, MailSender, OutboundEmail};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Sent,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberOutcome {
    pub member_id: String,
    pub email: String,
    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReminderSummary {
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
    pub outcomes: Vec<MemberOutcome>,
}

/// Renders the template for one member and sends it. No sequencing; used for
/// ad-hoc single sends and as the per-member step of the batch.
pub async fn send_reminder<M: MailSender>(
    mailer: &M,
    member: &TeamMember,
    template: &ReminderTemplate,
    deadline: NaiveTime,
) -> Result<(), MailError> {
    let rendered = render_reminder(template, member, deadline);
    mailer
        .send(OutboundEmail {
            to: member.email.clone(),
            subject: rendered.subject,
            text: rendered.text,
            html: Some(rendered.html),
        })
        .await
}

/// Sends a reminder to every pending member, one at a time, waiting `delay`
/// between consecutive sends. Per-member failures never abort the batch.
pub async fn send_reminders<M: MailSender>(
    mailer: &M,
    pending: &[TeamMember],
    template: &ReminderTemplate,
    deadline: NaiveTime,
    delay: Duration,
) -> ReminderSummary {
    let mut outcomes = Vec::with_capacity(pending.len());

    for (i, member) in pending.iter().enumerate() {
        let outcome = match send_reminder(mailer, member, template, deadline).await {
            Ok(()) => {
                tracing::info!("Reminder sent to {}", member.email);
                DeliveryOutcome::Sent
            }
            Err(e) => {
                tracing::warn!("Reminder to {} failed: {}", member.email, e);
                DeliveryOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        outcomes.push(MemberOutcome {
            member_id: member.id.clone(),
            email: member.email.clone(),
            outcome,
        });

        if i + 1 < pending.len() {
            tokio::time::sleep(delay).await;
        }
    }

    let sent = outcomes
        .iter()
        .filter(|o| matches!(o.outcome, DeliveryOutcome::Sent))
        .count();
    let summary = ReminderSummary {
        attempted: outcomes.len(),
        sent,
        failed: outcomes.len() - sent,
        outcomes,
    };
    tracing::info!(
        "Reminder batch finished: {} attempted, {} sent, {} failed",
        summary.attempted,
        summary.sent,
        summary.failed
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::future::Future;
    use std::sync::Mutex;

    struct MockMailer {
        fail_for: HashSet<String>,
        sent: Mutex<Vec<OutboundEmail>>,
    }

    impl MockMailer {
        fn new(fail_for: &[&str]) -> Self {
            Self {
                fail_for: fail_for.iter().map(|s| s.to_string()).collect(),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn recipients(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|e| e.to.clone()).collect()
        }
    }

    impl MailSender for MockMailer {
        fn send(
            &self,
            email: OutboundEmail,
        ) -> impl Future<Output = Result<(), MailError>> + Send {
            async move {
                let failed = self.fail_for.contains(&email.to);
                self.sent.lock().unwrap().push(email);
                if failed {
                    Err(MailError::Transport("smtp 550".to_string()))
                } else {
                    Ok(())
                }
            }
        }
    }

    fn member(id: &str) -> TeamMember {
        TeamMember {
            id: id.to_string(),
            name: Some(id.to_string()),
            email: format!("{}@example.com", id),
            avatar_url: None,
            role: "member".to_string(),
            invited_by: Some("admin".to_string()),
        }
    }

    fn deadline() -> NaiveTime {
        "17:00:00".parse().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_send_does_not_abort_the_batch() {
        let mailer = MockMailer::new(&["b@example.com"]);
        let pending = vec![member("a"), member("b"), member("c")];

        let summary = send_reminders(
            &mailer,
            &pending,
            &ReminderTemplate::default(),
            deadline(),
            Duration::from_millis(500),
        )
        .await;

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.sent, 2);
        assert_eq!(summary.failed, 1);
        assert!(matches!(summary.outcomes[1].outcome, DeliveryOutcome::Failed { .. }));

        // The third member is still attempted, in order, after the failure.
        assert_eq!(
            mailer.recipients(),
            vec!["a@example.com", "b@example.com", "c@example.com"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_waits_the_fixed_delay_between_sends() {
        let mailer = MockMailer::new(&[]);
        let pending = vec![member("a"), member("b"), member("c")];
        let start = tokio::time::Instant::now();

        send_reminders(
            &mailer,
            &pending,
            &ReminderTemplate::default(),
            deadline(),
            Duration::from_millis(500),
        )
        .await;

        // Two inter-send delays for three members; none after the last.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1000), "elapsed: {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(1500), "elapsed: {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_no_op() {
        let mailer = MockMailer::new(&[]);
        let summary = send_reminders(
            &mailer,
            &[],
            &ReminderTemplate::default(),
            deadline(),
            Duration::from_millis(500),
        )
        .await;
        assert_eq!(summary.attempted, 0);
        assert!(mailer.recipients().is_empty());
    }

    #[tokio::test]
    async fn test_single_reminder_renders_the_template() {
        let mailer = MockMailer::new(&[]);
        let template = ReminderTemplate {
            subject: "Brief due".to_string(),
            body: "Hi {{name}}, deadline {{deadline}}".to_string(),
        };

        send_reminder(&mailer, &member("jamie"), &template, deadline())
            .await
            .unwrap();

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "jamie@example.com");
        assert_eq!(sent[0].text, "Hi jamie, deadline 5:00 PM");
    }
}
