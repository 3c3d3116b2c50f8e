use std::env;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub redis_url: Option<String>,
    pub notification_queue: String,
    pub notification_webhook_url: Option<String>,
    pub notification_timeout_seconds: u64,
    pub directory_seed_path: Option<String>,
    pub public_base_url: String,
    pub confirmation_lead_minutes: i64,
    pub confirmation_expiry_grace_minutes: i64,
    pub offer_timeout_minutes: i64,
    pub reminder_window_minutes: i64,
    pub confirmation_job_interval_seconds: u64,
    pub reminder_job_interval_seconds: u64,
    pub offer_timeout_job_interval_seconds: u64,
    pub released_slot_rescan: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            redis_url: None,
            notification_queue: "notificacao-agenda-queue".to_string(),
            notification_webhook_url: None,
            notification_timeout_seconds: 10,
            directory_seed_path: None,
            public_base_url: "http://localhost:3000".to_string(),
            confirmation_lead_minutes: 30,
            confirmation_expiry_grace_minutes: 0,
            offer_timeout_minutes: 120,
            reminder_window_minutes: 24 * 60 + 30,
            confirmation_job_interval_seconds: 3600,
            reminder_job_interval_seconds: 60,
            offer_timeout_job_interval_seconds: 1800,
            released_slot_rescan: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| {
                warn!("BIND_ADDR not set, using default {}", defaults.bind_addr);
                defaults.bind_addr.clone()
            }),
            redis_url: optional_var("REDIS_URL"),
            notification_queue: env::var("NOTIFICATION_QUEUE")
                .unwrap_or_else(|_| defaults.notification_queue.clone()),
            notification_webhook_url: optional_var("NOTIFICATION_WEBHOOK_URL"),
            notification_timeout_seconds: parsed_var(
                "NOTIFICATION_TIMEOUT_SECONDS",
                defaults.notification_timeout_seconds,
            ),
            directory_seed_path: optional_var("DIRECTORY_SEED_PATH"),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| defaults.public_base_url.clone()),
            confirmation_lead_minutes: parsed_var(
                "CONFIRMATION_LEAD_MINUTES",
                defaults.confirmation_lead_minutes,
            ),
            confirmation_expiry_grace_minutes: parsed_var(
                "CONFIRMATION_EXPIRY_GRACE_MINUTES",
                defaults.confirmation_expiry_grace_minutes,
            ),
            offer_timeout_minutes: parsed_var("OFFER_TIMEOUT_MINUTES", defaults.offer_timeout_minutes),
            reminder_window_minutes: parsed_var(
                "REMINDER_WINDOW_MINUTES",
                defaults.reminder_window_minutes,
            ),
            confirmation_job_interval_seconds: parsed_var(
                "CONFIRMATION_JOB_INTERVAL_SECONDS",
                defaults.confirmation_job_interval_seconds,
            ),
            reminder_job_interval_seconds: parsed_var(
                "REMINDER_JOB_INTERVAL_SECONDS",
                defaults.reminder_job_interval_seconds,
            ),
            offer_timeout_job_interval_seconds: parsed_var(
                "OFFER_TIMEOUT_JOB_INTERVAL_SECONDS",
                defaults.offer_timeout_job_interval_seconds,
            ),
            released_slot_rescan: parsed_var("RELEASED_SLOT_RESCAN", defaults.released_slot_rescan),
        }
        .sanitized();

        if !config.is_notification_configured() {
            warn!("No notification transport configured - notifications will only be logged");
        }

        config
    }

    /// Replace values the jobs cannot run with by their defaults: intervals
    /// and timeouts must be positive, time windows must not be negative.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();

        positive(
            "CONFIRMATION_JOB_INTERVAL_SECONDS",
            &mut self.confirmation_job_interval_seconds,
            defaults.confirmation_job_interval_seconds,
        );
        positive(
            "REMINDER_JOB_INTERVAL_SECONDS",
            &mut self.reminder_job_interval_seconds,
            defaults.reminder_job_interval_seconds,
        );
        positive(
            "OFFER_TIMEOUT_JOB_INTERVAL_SECONDS",
            &mut self.offer_timeout_job_interval_seconds,
            defaults.offer_timeout_job_interval_seconds,
        );
        positive(
            "NOTIFICATION_TIMEOUT_SECONDS",
            &mut self.notification_timeout_seconds,
            defaults.notification_timeout_seconds,
        );

        non_negative(
            "CONFIRMATION_LEAD_MINUTES",
            &mut self.confirmation_lead_minutes,
            defaults.confirmation_lead_minutes,
        );
        non_negative(
            "CONFIRMATION_EXPIRY_GRACE_MINUTES",
            &mut self.confirmation_expiry_grace_minutes,
            defaults.confirmation_expiry_grace_minutes,
        );
        non_negative(
            "REMINDER_WINDOW_MINUTES",
            &mut self.reminder_window_minutes,
            defaults.reminder_window_minutes,
        );
        // A zero offer window would expire every offer on the next pass.
        if self.offer_timeout_minutes <= 0 {
            warn!(
                "OFFER_TIMEOUT_MINUTES must be positive (got {}), using default {}",
                self.offer_timeout_minutes, defaults.offer_timeout_minutes
            );
            self.offer_timeout_minutes = defaults.offer_timeout_minutes;
        }

        self
    }

    pub fn notification_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.notification_timeout_seconds)
    }

    pub fn is_notification_configured(&self) -> bool {
        self.redis_url.is_some() || self.notification_webhook_url.is_some()
    }

    pub fn slot_release_policy(&self) -> SlotReleasePolicy {
        SlotReleasePolicy {
            confirmation_lead: Duration::minutes(self.confirmation_lead_minutes),
            confirmation_expiry_grace: Duration::minutes(self.confirmation_expiry_grace_minutes),
            offer_timeout: Duration::minutes(self.offer_timeout_minutes),
            reminder_window: Duration::minutes(self.reminder_window_minutes),
            released_slot_rescan: self.released_slot_rescan,
        }
    }

    pub fn job_schedule(&self) -> JobSchedule {
        JobSchedule {
            confirmation_expiry_every: StdDuration::from_secs(self.confirmation_job_interval_seconds),
            reminder_every: StdDuration::from_secs(self.reminder_job_interval_seconds),
            offer_timeout_every: StdDuration::from_secs(self.offer_timeout_job_interval_seconds),
        }
    }
}

/// Time windows that drive confirmation, reminders and offers.
#[derive(Debug, Clone)]
pub struct SlotReleasePolicy {
    /// `confirmation_deadline = scheduled_at - confirmation_lead`
    pub confirmation_lead: Duration,
    /// Look-ahead applied by the confirmation-expiry job when selecting overdue appointments.
    pub confirmation_expiry_grace: Duration,
    pub offer_timeout: Duration,
    pub reminder_window: Duration,
    pub released_slot_rescan: bool,
}

impl Default for SlotReleasePolicy {
    fn default() -> Self {
        AppConfig::default().slot_release_policy()
    }
}

#[derive(Debug, Clone)]
pub struct JobSchedule {
    pub confirmation_expiry_every: StdDuration,
    pub reminder_every: StdDuration,
    pub offer_timeout_every: StdDuration,
}

impl Default for JobSchedule {
    fn default() -> Self {
        AppConfig::default().job_schedule()
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parsed_var<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

fn positive(key: &str, value: &mut u64, default: u64) {
    if *value == 0 {
        warn!("{} must be positive, using default {}", key, default);
        *value = default;
    }
}

fn non_negative(key: &str, value: &mut i64, default: i64) {
    if *value < 0 {
        warn!("{} must not be negative (got {}), using default {}", key, value, default);
        *value = default;
    }
}
