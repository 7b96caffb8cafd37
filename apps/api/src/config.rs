use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::interview::machine::{InterviewPolicy, ScoreAggregation};

/// One year.
const MAX_INVITE_VALIDITY_HOURS: i64 = 24 * 365;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub invite_validity_hours: i64,
    pub pass_threshold: f64,
    pub stage1_questions: usize,
    pub stage2_questions: usize,
    pub score_aggregation: ScoreAggregation,
    pub evaluation_timeout_secs: u64,
    pub evaluation_max_attempts: u32,
    pub interview_base_url: String,
    pub notify_webhook_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            invite_validity_hours: parse_env("INVITE_VALIDITY_HOURS", 48)?,
            pass_threshold: parse_env("PASS_THRESHOLD", 60.0)?,
            stage1_questions: parse_env("STAGE1_QUESTIONS", 3)?,
            stage2_questions: parse_env("STAGE2_QUESTIONS", 3)?,
            score_aggregation: parse_env("SCORE_AGGREGATION", ScoreAggregation::Cumulative)?,
            evaluation_timeout_secs: parse_env("EVALUATION_TIMEOUT_SECS", 30)?,
            evaluation_max_attempts: parse_env("EVALUATION_MAX_ATTEMPTS", 3)?,
            interview_base_url: std::env::var("INTERVIEW_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000/interview".to_string()),
            notify_webhook_url: std::env::var("NOTIFY_WEBHOOK_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        };
        config.check()?;
        Ok(config)
    }

    /// Interview rules derived from configuration.
    pub fn policy(&self) -> InterviewPolicy {
        InterviewPolicy {
            pass_threshold: self.pass_threshold,
            stage1_questions: self.stage1_questions,
            stage2_questions: self.stage2_questions,
            score_aggregation: self.score_aggregation,
            invite_validity: chrono::Duration::hours(self.invite_validity_hours),
            evaluation_timeout: Duration::from_secs(self.evaluation_timeout_secs),
        }
    }

    fn check(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.pass_threshold) {
            return Err(anyhow!("PASS_THRESHOLD must be within 0..=100"));
        }
        if self.stage1_questions == 0 || self.stage2_questions == 0 {
            return Err(anyhow!("STAGE1_QUESTIONS and STAGE2_QUESTIONS must be at least 1"));
        }
        if !(1..=MAX_INVITE_VALIDITY_HOURS).contains(&self.invite_validity_hours) {
            return Err(anyhow!(
                "INVITE_VALIDITY_HOURS must be within 1..={MAX_INVITE_VALIDITY_HOURS}"
            ));
        }
        if self.evaluation_max_attempts == 0 {
            return Err(anyhow!("EVALUATION_MAX_ATTEMPTS must be at least 1"));
        }
        Ok(())
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{key} has an invalid value '{raw}': {e}")),
        Err(_) => Ok(default),
    }
}
