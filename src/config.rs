use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::env;
use std::str::FromStr;

/// Thresholds used by violation detection and the attendance summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionConfig {
    pub late_tolerance_minutes: i64,
    pub early_tolerance_minutes: i64,
    pub moderate_threshold_minutes: i64,
    pub major_threshold_minutes: i64,
    pub explanation_overdue_days: i64,
    pub review_overdue_days: i64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            late_tolerance_minutes: 15,
            early_tolerance_minutes: 15,
            moderate_threshold_minutes: 30,
            major_threshold_minutes: 60,
            explanation_overdue_days: 3,
            review_overdue_days: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceConfig {
    pub max_file_size_bytes: i64,
    pub max_total_size_bytes: i64,
    pub allowed_content_types: Vec<String>,
    pub max_filename_length: usize,
    pub signed_url_minutes: i64,
    pub storage_root: String,
    pub public_base_url: String,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 2 * 1024 * 1024,
            max_total_size_bytes: 5 * 1024 * 1024,
            allowed_content_types: [
                "image/jpeg",
                "image/jpg",
                "image/png",
                "image/gif",
                "image/bmp",
                "application/pdf",
                "application/msword",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                "application/vnd.ms-excel",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                "text/plain",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            max_filename_length: 255,
            signed_url_minutes: 30,
            storage_root: "./uploads".to_string(),
            public_base_url: "http://localhost:8080/files".to_string(),
        }
    }
}

impl EvidenceConfig {
    pub fn is_allowed_content_type(&self, content_type: &str) -> bool {
        let content_type = content_type.trim().to_ascii_lowercase();
        self.allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&content_type))
    }

    /// JSON body limit large enough for a full evidence batch in base64
    pub fn max_request_bytes(&self) -> usize {
        let total = self.max_total_size_bytes.max(0) as usize;
        total / 3 * 4 + 64 * 1024
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PayrollConfig {
    pub standard_hours_per_day: i64,
    pub standard_days_per_month: i64,
    pub lunch_break_minutes: i64,
    pub overtime_multiplier: BigDecimal,
    pub weekend_multiplier: BigDecimal,
    pub holiday_multiplier: BigDecimal,
    pub late_penalty_rate: BigDecimal,
    pub absent_penalty_rate: BigDecimal,
    pub default_social_insurance_rate: BigDecimal,
    pub default_health_insurance_rate: BigDecimal,
    pub default_unemployment_insurance_rate: BigDecimal,
    pub currency_scale: i64,
    pub overtime_warning_hours: i64,
    pub holidays: BTreeSet<NaiveDate>,
}

impl Default for PayrollConfig {
    fn default() -> Self {
        Self {
            standard_hours_per_day: 8,
            standard_days_per_month: 22,
            lunch_break_minutes: 60,
            overtime_multiplier: decimal("1.5"),
            weekend_multiplier: decimal("1.5"),
            holiday_multiplier: decimal("2.0"),
            late_penalty_rate: decimal("0.01"),
            absent_penalty_rate: decimal("0.05"),
            default_social_insurance_rate: decimal("0.08"),
            default_health_insurance_rate: decimal("0.015"),
            default_unemployment_insurance_rate: decimal("0.01"),
            currency_scale: 2,
            overtime_warning_hours: 100,
            holidays: BTreeSet::new(),
        }
    }
}

impl PayrollConfig {
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_days: i64,
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub detection: DetectionConfig,
    pub evidence: EvidenceConfig,
    pub payroll: PayrollConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_env_only()
    }

    /// Load configuration from environment variables only (without loading .env files)
    /// This is useful for testing where you want to control the environment directly
    pub fn from_env_only() -> Result<Self> {
        let detection_defaults = DetectionConfig::default();
        let evidence_defaults = EvidenceConfig::default();
        let payroll_defaults = PayrollConfig::default();

        let detection = DetectionConfig {
            late_tolerance_minutes: parsed_or(
                "LATE_TOLERANCE_MINUTES",
                detection_defaults.late_tolerance_minutes,
            )?,
            early_tolerance_minutes: parsed_or(
                "EARLY_TOLERANCE_MINUTES",
                detection_defaults.early_tolerance_minutes,
            )?,
            moderate_threshold_minutes: parsed_or(
                "MODERATE_THRESHOLD_MINUTES",
                detection_defaults.moderate_threshold_minutes,
            )?,
            major_threshold_minutes: parsed_or(
                "MAJOR_THRESHOLD_MINUTES",
                detection_defaults.major_threshold_minutes,
            )?,
            explanation_overdue_days: parsed_or(
                "EXPLANATION_OVERDUE_DAYS",
                detection_defaults.explanation_overdue_days,
            )?,
            review_overdue_days: parsed_or(
                "REVIEW_OVERDUE_DAYS",
                detection_defaults.review_overdue_days,
            )?,
        };

        if detection.moderate_threshold_minutes > detection.major_threshold_minutes {
            anyhow::bail!("MODERATE_THRESHOLD_MINUTES must not exceed MAJOR_THRESHOLD_MINUTES");
        }

        let evidence = EvidenceConfig {
            max_file_size_bytes: parsed_or(
                "EVIDENCE_MAX_FILE_BYTES",
                evidence_defaults.max_file_size_bytes,
            )?,
            max_total_size_bytes: parsed_or(
                "EVIDENCE_MAX_TOTAL_BYTES",
                evidence_defaults.max_total_size_bytes,
            )?,
            allowed_content_types: match env::var("EVIDENCE_ALLOWED_TYPES") {
                Ok(raw) => split_list(&raw),
                Err(_) => evidence_defaults.allowed_content_types,
            },
            max_filename_length: evidence_defaults.max_filename_length,
            signed_url_minutes: parsed_or(
                "EVIDENCE_SIGNED_URL_MINUTES",
                evidence_defaults.signed_url_minutes,
            )?,
            storage_root: env::var("EVIDENCE_STORAGE_ROOT")
                .unwrap_or(evidence_defaults.storage_root),
            public_base_url: env::var("EVIDENCE_PUBLIC_BASE_URL")
                .unwrap_or(evidence_defaults.public_base_url),
        };

        let payroll = PayrollConfig {
            standard_hours_per_day: parsed_or(
                "PAYROLL_HOURS_PER_DAY",
                payroll_defaults.standard_hours_per_day,
            )?,
            standard_days_per_month: parsed_or(
                "PAYROLL_DAYS_PER_MONTH",
                payroll_defaults.standard_days_per_month,
            )?,
            overtime_multiplier: parsed_or(
                "PAYROLL_OVERTIME_MULTIPLIER",
                payroll_defaults.overtime_multiplier.clone(),
            )?,
            weekend_multiplier: parsed_or(
                "PAYROLL_WEEKEND_MULTIPLIER",
                payroll_defaults.weekend_multiplier.clone(),
            )?,
            holiday_multiplier: parsed_or(
                "PAYROLL_HOLIDAY_MULTIPLIER",
                payroll_defaults.holiday_multiplier.clone(),
            )?,
            currency_scale: parsed_or("PAYROLL_CURRENCY_SCALE", payroll_defaults.currency_scale)?,
            holidays: match env::var("PAYROLL_HOLIDAYS") {
                Ok(raw) => parse_holidays(&raw)?,
                Err(_) => payroll_defaults.holidays.clone(),
            },
            ..payroll_defaults
        };

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://@localhost:5432/attendance_payroll".to_string()),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                "your-super-secret-jwt-key-change-this-in-production-12345".to_string()
            }),
            jwt_expiration_days: env::var("JWT_EXPIRATION_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            detection,
            evidence,
            payroll,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn decimal(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap_or_default()
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_holidays(raw: &str) -> Result<BTreeSet<NaiveDate>> {
    split_list(raw)
        .iter()
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("Invalid date in PAYROLL_HOLIDAYS: {}", s))
        })
        .collect()
}
