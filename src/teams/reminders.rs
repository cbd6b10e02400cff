//! # Match Reminders
//!
//! Accepted matches starting within the next 24 hours, and the notifiers
//! that deliver them.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::errors::{TeamError, TeamResult};
use super::models::{truncate_with_ellipsis, MatchStatus, PREVIEW_LEN};
use super::service::RosterService;

/// How far ahead reminders look
pub const REMINDER_WINDOW_HOURS: i64 = 24;

/// Reported when a pass finds nothing to send
pub const NOTHING_DUE: &str = "No upcoming accepted matches found for reminder window.";

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error(transparent)]
    Team(#[from] TeamError),

    #[error("Email error: {0}")]
    Email(String),
}

/// One upcoming match to remind both managers about
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reminder {
    pub request_id: Uuid,
    pub requester_name: String,
    pub receiver_name: String,
    pub match_time: DateTime<Utc>,
    pub location: String,
    /// Manager addresses; managers without an email are skipped
    pub recipients: Vec<String>,
}

impl Reminder {
    pub fn message(&self) -> String {
        // the location is cut at 50 characters and always followed by "..."
        let location: String = self.location.chars().take(PREVIEW_LEN).collect();
        format!(
            "[REMINDER] Match scheduled! {} vs {} is happening in less than 24 hours on {}. Location: {}...",
            self.requester_name,
            self.receiver_name,
            self.match_time.format("%Y-%m-%d %H:%M"),
            location
        )
    }

    pub fn subject(&self) -> String {
        format!(
            "Match reminder: {} vs {}",
            truncate_with_ellipsis(&self.requester_name, PREVIEW_LEN),
            truncate_with_ellipsis(&self.receiver_name, PREVIEW_LEN)
        )
    }
}

impl RosterService {
    /// Accepted requests with `now <= match_time < now + 24h`, soonest first
    pub fn upcoming_reminders(&self, now: DateTime<Utc>) -> TeamResult<Vec<Reminder>> {
        let until = now + Duration::hours(REMINDER_WINDOW_HOURS);

        let mut due: Vec<_> = self
            .requests
            .all_requests()?
            .into_iter()
            .filter(|r| r.status == MatchStatus::Accepted && r.match_time >= now && r.match_time < until)
            .collect();
        due.sort_by_key(|r| r.match_time);

        due.into_iter()
            .map(|request| -> TeamResult<Reminder> {
                let requester = self.team(request.requester_id)?;
                let receiver = self.team(request.receiver_id)?;

                let mut recipients = Vec::new();
                for manager_id in [requester.manager_id, receiver.manager_id] {
                    let email = self.users.find_by_id(manager_id)?.and_then(|u| u.email);
                    if let Some(email) = email {
                        if !recipients.contains(&email) {
                            recipients.push(email);
                        }
                    }
                }

                Ok(Reminder {
                    request_id: request.id,
                    requester_name: requester.name,
                    receiver_name: receiver.name,
                    match_time: request.match_time,
                    location: request.location,
                    recipients,
                })
            })
            .collect()
    }
}

// ==================
// Delivery
// ==================

/// SMTP settings for email reminders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Sender mailbox, e.g. `Roaster <noreply@example.com>`
    pub from: String,
}

fn default_smtp_port() -> u16 {
    587
}

/// Sends reminders over SMTP
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, ReminderError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| ReminderError::Email(format!("Invalid from address: {}", e)))?;

        let transport = match (&config.username, &config.password) {
            (Some(user), Some(password)) => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| ReminderError::Email(format!("SMTP relay error: {}", e)))?
                .credentials(Credentials::new(user.clone(), password.clone()))
                .port(config.port)
                .build(),
            // local development servers without auth or TLS
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .port(config.port)
                .build(),
        };

        Ok(Self { transport, from })
    }

    /// Send to every recipient; a bad address or failed send is logged and skipped
    async fn send(&self, reminder: &Reminder) -> usize {
        let mut sent = 0;
        for recipient in &reminder.recipients {
            match self.send_one(reminder, recipient).await {
                Ok(()) => sent += 1,
                Err(e) => warn!(
                    request_id = %reminder.request_id,
                    recipient = %recipient,
                    error = %e,
                    "reminder email not delivered"
                ),
            }
        }
        sent
    }

    async fn send_one(&self, reminder: &Reminder, recipient: &str) -> Result<(), ReminderError> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| ReminderError::Email(format!("Invalid to address: {}", e)))?;
        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(reminder.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(reminder.message())
            .map_err(|e| ReminderError::Email(format!("Failed to build email: {}", e)))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| ReminderError::Email(format!("Failed to send email: {}", e)))?;
        Ok(())
    }
}

/// Reminders kept in memory instead of sent
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    sent: Arc<RwLock<Vec<Reminder>>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Reminder> {
        self.sent.read().map(|s| s.clone()).unwrap_or_default()
    }

    fn push(&self, reminder: &Reminder) -> Result<(), ReminderError> {
        self.sent
            .write()
            .map_err(|_| ReminderError::Email("outbox lock poisoned".to_string()))?
            .push(reminder.clone());
        Ok(())
    }
}

/// Where reminders go
pub enum Notifier {
    /// Log each reminder at info
    Log,
    Smtp(SmtpNotifier),
    Memory(Outbox),
}

impl Notifier {
    /// SMTP when configured, logging otherwise
    pub fn from_config(smtp: Option<&SmtpConfig>) -> Result<Self, ReminderError> {
        match smtp {
            Some(config) => Ok(Notifier::Smtp(SmtpNotifier::new(config)?)),
            None => Ok(Notifier::Log),
        }
    }

    /// Deliver one reminder; returns how many notifications went out
    pub async fn deliver(&self, reminder: &Reminder) -> Result<usize, ReminderError> {
        match self {
            Notifier::Log => {
                info!(request_id = %reminder.request_id, "{}", reminder.message());
                Ok(1)
            }
            Notifier::Smtp(smtp) => {
                if reminder.recipients.is_empty() {
                    warn!(request_id = %reminder.request_id, "no manager email on file, reminder skipped");
                }
                Ok(smtp.send(reminder).await)
            }
            Notifier::Memory(outbox) => {
                outbox.push(reminder)?;
                Ok(1)
            }
        }
    }
}

/// Outcome of one reminder pass
#[derive(Debug, Clone, Default)]
pub struct ReminderReport {
    pub reminders: Vec<Reminder>,
    pub delivered: usize,
}

impl ReminderReport {
    pub fn summary(&self) -> String {
        if self.reminders.is_empty() {
            NOTHING_DUE.to_string()
        } else {
            format!(
                "Successfully checked and sent {} reminders.",
                self.reminders.len()
            )
        }
    }
}

/// Find every due reminder and hand it to the notifier
pub async fn send_reminders(
    service: &RosterService,
    notifier: &Notifier,
    now: DateTime<Utc>,
) -> Result<ReminderReport, ReminderError> {
    let reminders = service.upcoming_reminders(now)?;

    let mut delivered = 0;
    for reminder in &reminders {
        match notifier.deliver(reminder).await {
            Ok(count) => delivered += count,
            Err(e) => warn!(request_id = %reminder.request_id, error = %e, "reminder not delivered"),
        }
    }
    service.metrics.add_reminders_sent(delivered as u64);

    info!(due = reminders.len(), delivered, "reminder pass complete");
    Ok(ReminderReport { reminders, delivered })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{PasswordPolicy, User, UserRepository};
    use crate::teams::requests::NewMatchRequest;
    use crate::teams::service::tests::Fixture;

    fn reminder(location: &str) -> Reminder {
        Reminder {
            request_id: Uuid::new_v4(),
            requester_name: "Dragons".to_string(),
            receiver_name: "Tigers".to_string(),
            match_time: DateTime::parse_from_rfc3339("2024-05-01T18:30:00Z")
                .unwrap()
                .with_timezone(&Utc),
            location: location.to_string(),
            recipients: vec![],
        }
    }

    #[test]
    fn test_message_format() {
        assert_eq!(
            reminder("Central Park").message(),
            "[REMINDER] Match scheduled! Dragons vs Tigers is happening in less than 24 hours on 2024-05-01 18:30. Location: Central Park..."
        );

        let long = reminder(&"x".repeat(80)).message();
        assert!(long.ends_with(&format!("Location: {}...", "x".repeat(50))));
    }

    #[test]
    fn test_report_summary() {
        assert_eq!(ReminderReport::default().summary(), NOTHING_DUE);
        let report = ReminderReport {
            reminders: vec![reminder("")],
            delivered: 1,
        };
        assert_eq!(report.summary(), "Successfully checked and sent 1 reminders.");
    }

    #[tokio::test]
    async fn test_only_accepted_matches_within_window() {
        let fx = Fixture::new();
        let alice = fx.user("alice");
        let bob = User::new(
            "bob",
            "password123",
            Some("bob@example.com".to_string()),
            &PasswordPolicy::default(),
        )
        .unwrap();
        fx.store.create(&bob).unwrap();

        let dragons = fx.team(alice, "Dragons", 2);
        let tigers = fx.team(bob.id, "Tigers", 2);
        let owls = fx.team(bob.id, "Owls", 2);

        let soon = Utc::now() + Duration::hours(5);
        let later = Utc::now() + Duration::hours(30);
        let request = |receiver: Uuid, when| NewMatchRequest {
            requester_id: dragons.id,
            receiver_id: receiver,
            match_time: when,
            location: "Central Park".to_string(),
        };

        let due = fx.service.create_request(alice, request(tigers.id, soon)).unwrap();
        fx.service.accept_request(bob.id, due.id).unwrap();
        // pending, so not due
        fx.service.create_request(alice, request(owls.id, soon)).unwrap();

        let now = Utc::now();
        let reminders = fx.service.upcoming_reminders(now).unwrap();
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].request_id, due.id);
        assert_eq!(reminders[0].recipients, vec!["bob@example.com".to_string()]);

        // past the window
        assert!(fx.service.upcoming_reminders(later).unwrap().is_empty());

        let outbox = Outbox::new();
        let report = send_reminders(&fx.service, &Notifier::Memory(outbox.clone()), now)
            .await
            .unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(outbox.sent().len(), 1);
        assert_eq!(fx.metrics.snapshot().reminders_sent, 1);
    }

    #[tokio::test]
    async fn test_log_notifier_counts_reminders() {
        let delivered = Notifier::Log.deliver(&reminder("Field 3")).await.unwrap();
        assert_eq!(delivered, 1);
    }

    #[tokio::test]
    async fn test_bad_address_does_not_stop_the_pass() {
        let fx = Fixture::new();
        let alice = User::new(
            "alice",
            "password123",
            Some("alice@example.com".to_string()),
            &PasswordPolicy::default(),
        )
        .unwrap();
        fx.store.create(&alice).unwrap();
        let bob = fx.user("bob");

        // stored before addresses were validated
        let mut carol = User::new("carol", "password123", None, &PasswordPolicy::default()).unwrap();
        carol.email = Some("not an email".to_string());
        fx.store.create(&carol).unwrap();

        let dragons = fx.team(carol.id, "Dragons", 2);
        let tigers = fx.team(bob, "Tigers", 2);
        let owls = fx.team(alice.id, "Owls", 2);

        let soon = Utc::now() + Duration::hours(3);
        for receiver in [&tigers, &owls] {
            let request = fx
                .service
                .create_request(
                    carol.id,
                    NewMatchRequest {
                        requester_id: dragons.id,
                        receiver_id: receiver.id,
                        match_time: soon,
                        location: String::new(),
                    },
                )
                .unwrap();
            fx.service.accept_request(receiver.manager_id, request.id).unwrap();
        }

        // nothing listens on port 1, so alice's reminder fails at send time
        let notifier = Notifier::from_config(Some(&SmtpConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            username: None,
            password: None,
            from: "Roaster <noreply@example.com>".to_string(),
        }))
        .unwrap();

        let report = send_reminders(&fx.service, &notifier, Utc::now()).await.unwrap();
        assert_eq!(report.reminders.len(), 2);
        assert_eq!(report.delivered, 0);
    }

    #[test]
    fn test_smtp_config_defaults() {
        let config: SmtpConfig =
            serde_json::from_str(r#"{"host": "localhost", "from": "Roaster <noreply@example.com>"}"#).unwrap();
        assert_eq!(config.port, 587);
        assert!(config.username.is_none());
    }
}
