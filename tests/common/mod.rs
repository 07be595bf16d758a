#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use fake::Fake;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use uuid::Uuid;

use attendance_payroll::config::{Config, DetectionConfig, EvidenceConfig, PayrollConfig};
use attendance_payroll::database::models::*;
use attendance_payroll::database::repositories::{
    AttendanceRepository, MemoryStore, ShiftRepository,
};
use attendance_payroll::services::{FileStorage, MemoryFileStorage};
use attendance_payroll::{AppState, Repositories};

pub fn setup_test_env() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/attendance_payroll_test".to_string(),
        jwt_secret: "test-jwt-secret-key-that-is-long-enough".to_string(),
        jwt_expiration_days: 1,
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        detection: DetectionConfig::default(),
        evidence: EvidenceConfig::default(),
        payroll: PayrollConfig::default(),
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn at(date: NaiveDate, time: &str) -> NaiveDateTime {
    date.and_time(NaiveTime::parse_from_str(time, "%H:%M").unwrap())
}

pub fn money(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap()
}

/// In-memory application wired exactly like production, minus Postgres
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub storage: Arc<MemoryFileStorage>,
    pub config: Config,
    pub state: AppState,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_config(test_config(), MemoryFileStorage::new()).await
    }

    pub async fn with_config(config: Config, storage: MemoryFileStorage) -> Self {
        setup_test_env();

        let store = Arc::new(MemoryStore::new());
        let storage = Arc::new(storage);
        let dyn_storage: Arc<dyn FileStorage> = storage.clone();
        let state = AppState::new(Repositories::in_memory(store.clone()), dyn_storage, &config);

        Self {
            store,
            storage,
            config,
            state,
        }
    }

    pub async fn user(&self, role: UserRole) -> UserProfile {
        self.user_with_id(Uuid::new_v4(), role, None).await
    }

    pub async fn user_with_id(
        &self,
        id: Uuid,
        role: UserRole,
        department: Option<&str>,
    ) -> UserProfile {
        let user = UserProfile {
            id,
            full_name: Name().fake(),
            email: SafeEmail().fake(),
            department: department.map(str::to_string),
            role,
            eligible_for_shift_work: true,
        };
        self.store.add_user(user.clone()).await;
        user
    }

    pub async fn employee(&self) -> UserProfile {
        self.user(UserRole::Employee).await
    }

    pub async fn manager(&self) -> UserProfile {
        self.user(UserRole::Manager).await
    }

    pub async fn shift(&self, start: &str, end: &str) -> WorkShift {
        self.store
            .create_shift(WorkShiftInput {
                name: format!("Shift {}", Uuid::new_v4()),
                start_time: NaiveTime::parse_from_str(start, "%H:%M").unwrap(),
                end_time: NaiveTime::parse_from_str(end, "%H:%M").unwrap(),
                break_minutes: Some(60),
                description: None,
            })
            .await
            .unwrap()
    }

    /// Open-ended assignment of `user` to `shift` starting on `from`
    pub async fn assign(&self, user: &UserProfile, shift: &WorkShift, from: NaiveDate) -> ShiftAssignment {
        self.assign_between(user, shift, from, None).await
    }

    pub async fn assign_between(
        &self,
        user: &UserProfile,
        shift: &WorkShift,
        from: NaiveDate,
        to: Option<NaiveDate>,
    ) -> ShiftAssignment {
        self.store
            .create_assignment_if_no_overlap(ShiftAssignmentInput {
                user_id: user.id,
                shift_id: shift.id,
                start_date: from,
                end_date: to,
                created_by: None,
            })
            .await
            .unwrap()
            .expect("assignment overlaps an existing one")
    }

    pub async fn attendance(
        &self,
        user: &UserProfile,
        day: NaiveDate,
        check_in: Option<&str>,
        check_out: Option<&str>,
    ) -> AttendanceLog {
        self.store
            .insert_if_absent(AttendanceLogInput {
                user_id: user.id,
                log_date: day,
                check_in: check_in.map(|t| at(day, t)),
                check_out: check_out.map(|t| at(day, t)),
                notes: None,
            })
            .await
            .unwrap()
            .expect("attendance log already exists")
    }

    /// A late arrival violation for `user` on `day`, produced through detection
    pub async fn late_violation(&self, user: &UserProfile, day: NaiveDate) -> Violation {
        let shift = self.shift("08:00", "17:00").await;
        self.assign_between(user, &shift, day, Some(day)).await;
        self.attendance(user, day, Some("08:45"), Some("17:00")).await;

        let mut created = self
            .state
            .detection_service
            .detect_for_user(user.id, day)
            .await
            .unwrap();
        assert_eq!(created.len(), 1);
        created.remove(0)
    }

    pub async fn salary_structure(
        &self,
        user: &UserProfile,
        base: &str,
        effective: NaiveDate,
        manager: &UserProfile,
    ) -> SalaryStructure {
        self.state
            .salary_structure_service
            .create(monthly_structure(user.id, base, effective), manager)
            .await
            .unwrap()
    }
}

pub fn monthly_structure(user_id: Uuid, base: &str, effective: NaiveDate) -> SalaryStructureInput {
    SalaryStructureInput {
        user_id,
        salary_type: SalaryType::Monthly,
        base_salary: money(base),
        hourly_rate: None,
        overtime_rate: None,
        holiday_rate: None,
        weekend_rate: None,
        transport_allowance: money("0"),
        meal_allowance: money("0"),
        phone_allowance: money("0"),
        other_allowances: money("0"),
        social_insurance_rate: None,
        health_insurance_rate: None,
        unemployment_insurance_rate: None,
        personal_income_tax: money("0"),
        other_deductions: money("0"),
        effective_date: effective,
        end_date: None,
        notes: None,
        created_by: None,
    }
}

pub fn pdf_upload(name: &str, size: usize) -> EvidenceUpload {
    EvidenceUpload {
        file_name: name.to_string(),
        content_type: "application/pdf".to_string(),
        content: vec![b'x'; size],
        description: None,
        kind: None,
    }
}

pub fn image_upload(name: &str, size: usize) -> EvidenceUpload {
    EvidenceUpload {
        file_name: name.to_string(),
        content_type: "image/png".to_string(),
        content: vec![0u8; size],
        description: Some("photo".to_string()),
        kind: None,
    }
}
