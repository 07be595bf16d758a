use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceLog {
    pub id: Uuid,                           // UUID primary key
    pub user_id: Uuid,                      // UUID for user references
    pub log_date: NaiveDate,                // DATE, unique with user_id
    pub check_in: Option<NaiveDateTime>,    // TIMESTAMP (local wall clock)
    pub check_out: Option<NaiveDateTime>,   // TIMESTAMP (local wall clock)
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>, // TIMESTAMPTZ
    pub updated_at: DateTime<Utc>, // TIMESTAMPTZ
}

impl AttendanceLog {
    /// Arrived later than the expected start plus tolerance
    pub fn is_late(&self, expected_start: NaiveDateTime, tolerance_minutes: i64) -> bool {
        self.check_in
            .is_some_and(|check_in| check_in > expected_start + Duration::minutes(tolerance_minutes))
    }

    /// Left earlier than the expected end minus tolerance
    pub fn is_early_departure(&self, expected_end: NaiveDateTime, tolerance_minutes: i64) -> bool {
        self.check_out
            .is_some_and(|check_out| check_out < expected_end - Duration::minutes(tolerance_minutes))
    }

    /// Minutes between check-in and check-out, zero unless both are present
    pub fn worked_minutes(&self) -> i64 {
        match (self.check_in, self.check_out) {
            (Some(check_in), Some(check_out)) if check_out > check_in => {
                (check_out - check_in).num_minutes()
            }
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceLogInput {
    pub user_id: Uuid,
    pub log_date: NaiveDate,
    pub check_in: Option<NaiveDateTime>,
    pub check_out: Option<NaiveDateTime>,
    pub notes: Option<String>,
}
