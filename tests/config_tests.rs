use std::env;

use attendance_payroll::config::Config;
use pretty_assertions::assert_eq;
use serial_test::serial;

mod common;

const KEYS: [&str; 12] = [
    "DATABASE_URL",
    "JWT_SECRET",
    "JWT_EXPIRATION_DAYS",
    "HOST",
    "PORT",
    "ENVIRONMENT",
    "LATE_TOLERANCE_MINUTES",
    "MODERATE_THRESHOLD_MINUTES",
    "MAJOR_THRESHOLD_MINUTES",
    "EVIDENCE_MAX_FILE_BYTES",
    "EVIDENCE_ALLOWED_TYPES",
    "PAYROLL_HOLIDAYS",
];

// Clears every key for the duration of `f`, then puts the originals back
fn with_clean_env(f: impl FnOnce()) {
    let original: Vec<(&str, Option<String>)> =
        KEYS.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in KEYS {
        unsafe {
            env::remove_var(key);
        }
    }

    f();

    unsafe {
        for (key, value) in original {
            match value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

#[test]
#[serial]
fn test_config_from_env_with_defaults() {
    common::setup_test_env();

    with_clean_env(|| {
        let config = Config::from_env_only().unwrap();

        assert_eq!(
            config.database_url,
            "postgres://@localhost:5432/attendance_payroll"
        );
        assert_eq!(config.jwt_expiration_days, 30);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.environment, "development");

        assert_eq!(config.detection.late_tolerance_minutes, 15);
        assert_eq!(config.detection.moderate_threshold_minutes, 30);
        assert_eq!(config.detection.major_threshold_minutes, 60);
        assert_eq!(config.evidence.max_file_size_bytes, 2 * 1024 * 1024);
        assert_eq!(config.evidence.max_total_size_bytes, 5 * 1024 * 1024);
        assert_eq!(config.payroll.standard_days_per_month, 22);
        assert!(config.payroll.holidays.is_empty());
    });
}

#[test]
#[serial]
fn test_config_from_env_with_custom_values() {
    common::setup_test_env();

    with_clean_env(|| {
        unsafe {
            env::set_var("DATABASE_URL", "postgres://db/payroll");
            env::set_var("JWT_SECRET", "test-secret");
            env::set_var("JWT_EXPIRATION_DAYS", "7");
            env::set_var("HOST", "0.0.0.0");
            env::set_var("PORT", "3000");
            env::set_var("ENVIRONMENT", "production");
            env::set_var("LATE_TOLERANCE_MINUTES", "5");
            env::set_var("EVIDENCE_ALLOWED_TYPES", "image/png, application/PDF");
            env::set_var("PAYROLL_HOLIDAYS", "2024-01-01,2024-04-30");
        }

        let config = Config::from_env_only().unwrap();

        assert_eq!(config.database_url, "postgres://db/payroll");
        assert_eq!(config.jwt_secret, "test-secret");
        assert_eq!(config.jwt_expiration_days, 7);
        assert_eq!(config.server_address(), "0.0.0.0:3000");
        assert!(config.is_production());

        assert_eq!(config.detection.late_tolerance_minutes, 5);
        assert_eq!(
            config.evidence.allowed_content_types,
            vec!["image/png".to_string(), "application/pdf".to_string()]
        );
        assert!(config.evidence.is_allowed_content_type("Application/Pdf"));
        assert!(!config.evidence.is_allowed_content_type("text/plain"));
        assert_eq!(config.payroll.holidays.len(), 2);
        assert!(config.payroll.is_holiday(common::date(2024, 4, 30)));
    });
}

#[test]
#[serial]
fn test_config_invalid_port_falls_back() {
    with_clean_env(|| {
        unsafe {
            env::set_var("PORT", "invalid_port");
            env::set_var("JWT_EXPIRATION_DAYS", "invalid_number");
        }

        let config = Config::from_env_only().unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.jwt_expiration_days, 30);
    });
}

#[test]
#[serial]
fn test_config_rejects_malformed_thresholds() {
    with_clean_env(|| {
        unsafe {
            env::set_var("LATE_TOLERANCE_MINUTES", "soon");
        }
        assert!(Config::from_env_only().is_err());
    });

    with_clean_env(|| {
        unsafe {
            env::set_var("MODERATE_THRESHOLD_MINUTES", "90");
            env::set_var("MAJOR_THRESHOLD_MINUTES", "60");
        }
        assert!(Config::from_env_only().is_err());
    });

    with_clean_env(|| {
        unsafe {
            env::set_var("PAYROLL_HOLIDAYS", "2024-13-01");
        }
        assert!(Config::from_env_only().is_err());
    });
}

#[test]
fn test_config_environment_detection() {
    let mut config = common::test_config();

    config.environment = "production".to_string();
    assert!(config.is_production());
    assert!(!config.is_development());

    config.environment = "development".to_string();
    assert!(!config.is_production());
    assert!(config.is_development());
}

#[test]
fn test_request_limit_covers_base64_batch() {
    let config = common::test_config();
    let limit = config.evidence.max_request_bytes();

    assert!(limit > config.evidence.max_total_size_bytes as usize * 4 / 3);
}
