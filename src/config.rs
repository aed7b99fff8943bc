use anyhow::{bail, Result};
use chrono::Duration as ChronoDuration;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::broadcast::dispatcher::{is_valid_country_code, DEFAULT_COUNTRY_CODE};
use crate::models::alert::Severity;

const MAX_RETRIES_LIMIT: u32 = 10;
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Broadcast tuning, loaded once and read-only for the process lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastPolicy {
    pub suppression_radius_km: f64,
    pub suppression_duration: ChronoDuration,
    /// Default selection radius (SMS-class urgency).
    pub dispatch_radius_km: f64,
    /// Wider radius used for critical alerts. Independent of `dispatch_radius_km`.
    pub notification_radius_km: f64,
    pub worker_pool_size: usize,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub send_timeout: Duration,
}

impl Default for BroadcastPolicy {
    fn default() -> Self {
        Self {
            suppression_radius_km: 200.0,
            suppression_duration: ChronoDuration::hours(12),
            dispatch_radius_km: 50.0,
            notification_radius_km: 200.0,
            worker_pool_size: 10,
            max_retries: 2,
            backoff_base: Duration::from_millis(500),
            send_timeout: Duration::from_secs(10),
        }
    }
}

impl BroadcastPolicy {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        let suppression_duration = suppression_hours(env_parse(
            "SUPPRESSION_DURATION_HOURS",
            d.suppression_duration.num_hours(),
        ))?;
        Ok(Self {
            suppression_radius_km: env_parse("SUPPRESSION_RADIUS_KM", d.suppression_radius_km),
            suppression_duration,
            dispatch_radius_km: env_parse("DISPATCH_RADIUS_KM", d.dispatch_radius_km),
            notification_radius_km: env_parse("NOTIFICATION_RADIUS_KM", d.notification_radius_km),
            worker_pool_size: env_parse("WORKER_POOL_SIZE", d.worker_pool_size),
            max_retries: env_parse("DISPATCH_MAX_RETRIES", d.max_retries),
            backoff_base: Duration::from_millis(env_parse(
                "DISPATCH_BACKOFF_MS",
                d.backoff_base.as_millis() as u64,
            )),
            send_timeout: Duration::from_secs(env_parse(
                "DISPATCH_TIMEOUT_SECS",
                d.send_timeout.as_secs(),
            )),
        })
    }

    pub fn validate(&self) -> Result<()> {
        for (name, radius) in [
            ("SUPPRESSION_RADIUS_KM", self.suppression_radius_km),
            ("DISPATCH_RADIUS_KM", self.dispatch_radius_km),
            ("NOTIFICATION_RADIUS_KM", self.notification_radius_km),
        ] {
            if !radius.is_finite() || radius <= 0.0 {
                bail!("{name} must be a positive number, got {radius}");
            }
        }
        if self.suppression_duration <= ChronoDuration::zero() {
            bail!("SUPPRESSION_DURATION_HOURS must be positive");
        }
        if self.worker_pool_size == 0 {
            bail!("WORKER_POOL_SIZE must be at least 1");
        }
        if self.send_timeout.is_zero() {
            bail!("DISPATCH_TIMEOUT_SECS must be positive");
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            bail!(
                "DISPATCH_MAX_RETRIES must be at most {MAX_RETRIES_LIMIT}, got {}",
                self.max_retries
            );
        }
        if self.backoff_base > MAX_BACKOFF {
            bail!(
                "DISPATCH_BACKOFF_MS must be at most {}, got {}",
                MAX_BACKOFF.as_millis(),
                self.backoff_base.as_millis()
            );
        }
        Ok(())
    }

    /// Selection radius for an alert of the given severity.
    pub fn radius_for(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => self.notification_radius_km,
            _ => self.dispatch_radius_km,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub api_base: String,
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    /// Prefix for recipient numbers stored without a leading `+`.
    pub default_country_code: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub gateway_url: String,
    pub token: Option<String>,
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub kafka_bootstrap_servers: String,
    pub kafka_topic: String,
    pub kafka_group_id: String,
    pub kafka_auto_offset_reset: String,
    pub kafka_sasl_mechanism: String,
    pub kafka_username: String,
    pub kafka_password: String,
    pub kafka_security_protocol: String,
    pub kafka_max_retries: u32,
    pub kafka_circuit_breaker_cooldown: u64,
    pub database_url: String,
    pub db_max_connections: u32,
    pub twilio: TwilioConfig,
    pub email: EmailConfig,
    pub policy: BroadcastPolicy,
    pub log_level: String,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let kafka_bootstrap_servers =
            env::var("KAFKA_BOOTSTRAP_SERVERS").unwrap_or_else(|_| "localhost:9092".to_string());
        let kafka_topic = env::var("KAFKA_TOPIC").unwrap_or_else(|_| "disaster-alerts".to_string());
        let kafka_group_id =
            env::var("KAFKA_GROUP_ID").unwrap_or_else(|_| "disaster-broadcast".to_string());
        let kafka_auto_offset_reset =
            env::var("KAFKA_AUTO_OFFSET_RESET").unwrap_or_else(|_| "latest".to_string());
        let kafka_sasl_mechanism =
            env::var("KAFKA_SASL_MECHANISM").unwrap_or_else(|_| "SCRAM-SHA-256".to_string());
        let kafka_username = env::var("KAFKA_USERNAME").unwrap_or_default();
        let kafka_password = env::var("KAFKA_PASSWORD").unwrap_or_default();
        let kafka_security_protocol =
            env::var("KAFKA_SECURITY_PROTOCOL").unwrap_or_else(|_| "SASL_PLAINTEXT".to_string());
        let kafka_max_retries = env_parse("KAFKA_MAX_RETRIES", 5);
        let kafka_circuit_breaker_cooldown = env_parse("KAFKA_CIRCUIT_BREAKER_COOLDOWN", 300);

        let db_host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
        let db_port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
        let db_name = env::var("DB_DATABASE").unwrap_or_else(|_| "disaster_alerts".to_string());
        let db_user = env::var("DB_USER").unwrap_or_else(|_| "alerts".to_string());
        let db_pwd = env::var("DB_PWD").unwrap_or_else(|_| "alerts".to_string());

        let database_url = format!(
            "postgres://{}:{}@{}:{}/{}",
            db_user, db_pwd, db_host, db_port, db_name
        );
        let db_max_connections = env_parse("DB_MAX_CONNECTIONS", 20);

        let twilio = TwilioConfig {
            api_base: env::var("TWILIO_API_BASE")
                .unwrap_or_else(|_| "https://api.twilio.com".to_string()),
            account_sid: env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            auth_token: env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            from_number: env::var("TWILIO_FROM_NUMBER").unwrap_or_default(),
            default_country_code: env::var("SMS_DEFAULT_COUNTRY_CODE")
                .map(|c| c.trim().to_string())
                .unwrap_or_else(|_| DEFAULT_COUNTRY_CODE.to_string()),
        };
        if !is_valid_country_code(&twilio.default_country_code) {
            bail!(
                "SMS_DEFAULT_COUNTRY_CODE must be '+' followed by 1-3 digits, got {:?}",
                twilio.default_country_code
            );
        }

        let email = EmailConfig {
            gateway_url: env::var("EMAIL_GATEWAY_URL")
                .unwrap_or_else(|_| "http://localhost:8025/send".to_string()),
            token: env::var("EMAIL_GATEWAY_TOKEN").ok().filter(|t| !t.is_empty()),
            from_address: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "alerts@disaster-broadcast.local".to_string()),
        };

        let policy = BroadcastPolicy::from_env()?;
        policy.validate()?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            kafka_bootstrap_servers,
            kafka_topic,
            kafka_group_id,
            kafka_auto_offset_reset,
            kafka_sasl_mechanism,
            kafka_username,
            kafka_password,
            kafka_security_protocol,
            kafka_max_retries,
            kafka_circuit_breaker_cooldown,
            database_url,
            db_max_connections,
            twilio,
            email,
            policy,
            log_level,
        })
    }
}

fn suppression_hours(hours: i64) -> Result<ChronoDuration> {
    match ChronoDuration::try_hours(hours) {
        Some(d) => Ok(d),
        None => bail!("SUPPRESSION_DURATION_HOURS is out of range, got {hours}"),
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_values() {
        let p = BroadcastPolicy::default();
        assert_eq!(p.suppression_radius_km, 200.0);
        assert_eq!(p.suppression_duration, ChronoDuration::hours(12));
        assert_eq!(p.dispatch_radius_km, 50.0);
        assert_eq!(p.notification_radius_km, 200.0);
        assert_eq!(p.worker_pool_size, 10);
        assert_eq!(p.max_retries, 2);
        assert_eq!(p.backoff_base, Duration::from_millis(500));
        assert_eq!(p.send_timeout, Duration::from_secs(10));
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_radii_are_independent() {
        let p = BroadcastPolicy {
            dispatch_radius_km: 30.0,
            ..BroadcastPolicy::default()
        };
        assert_eq!(p.radius_for(Severity::Low), 30.0);
        assert_eq!(p.radius_for(Severity::High), 30.0);
        assert_eq!(p.radius_for(Severity::Critical), 200.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_radius = BroadcastPolicy {
            suppression_radius_km: f64::NAN,
            ..BroadcastPolicy::default()
        };
        assert!(bad_radius.validate().is_err());

        let no_workers = BroadcastPolicy {
            worker_pool_size: 0,
            ..BroadcastPolicy::default()
        };
        assert!(no_workers.validate().is_err());

        let no_window = BroadcastPolicy {
            suppression_duration: ChronoDuration::zero(),
            ..BroadcastPolicy::default()
        };
        assert!(no_window.validate().is_err());
    }

    #[test]
    fn test_validate_caps_retry_budget_and_backoff() {
        let at_limit = BroadcastPolicy {
            max_retries: 10,
            backoff_base: Duration::from_secs(60),
            ..BroadcastPolicy::default()
        };
        assert!(at_limit.validate().is_ok());

        let too_many_retries = BroadcastPolicy {
            max_retries: 11,
            ..BroadcastPolicy::default()
        };
        assert!(too_many_retries.validate().is_err());

        let huge_backoff = BroadcastPolicy {
            backoff_base: Duration::from_millis(u64::MAX),
            ..BroadcastPolicy::default()
        };
        assert!(huge_backoff.validate().is_err());
    }

    #[test]
    fn test_out_of_range_duration_hours_is_rejected() {
        assert!(suppression_hours(i64::MAX).is_err());
        assert_eq!(suppression_hours(12).unwrap(), ChronoDuration::hours(12));
    }
}
