use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::date_ranges_overlap;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkShift {
    pub id: Uuid,             // UUID primary key
    pub name: String,         // VARCHAR(100), unique
    pub start_time: NaiveTime, // TIME
    pub end_time: NaiveTime,   // TIME
    pub break_minutes: i32,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>, // TIMESTAMPTZ
    pub updated_at: DateTime<Utc>, // TIMESTAMPTZ
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkShiftInput {
    pub name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub break_minutes: Option<i32>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShiftAssignment {
    pub id: Uuid,                    // UUID primary key
    pub user_id: Uuid,               // UUID for user references
    pub shift_id: Uuid,              // UUID for work_shifts references
    pub start_date: NaiveDate,       // DATE
    pub end_date: Option<NaiveDate>, // DATE, inclusive; open-ended when NULL
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>, // TIMESTAMPTZ
    pub updated_at: DateTime<Utc>, // TIMESTAMPTZ
}

impl ShiftAssignment {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.is_active && self.start_date <= date && self.end_date.is_none_or(|end| date <= end)
    }

    pub fn overlaps_with(&self, start: NaiveDate, end: Option<NaiveDate>) -> bool {
        date_ranges_overlap(self.start_date, self.end_date, start, end)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftAssignmentInput {
    pub user_id: Uuid,
    pub shift_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_by: Option<Uuid>,
}

/// An active assignment joined with the shift window it expects.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledShift {
    pub assignment_id: Uuid,
    pub user_id: Uuid,
    pub shift_id: Uuid,
    pub shift_name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub break_minutes: i32,
}

impl ScheduledShift {
    pub fn from_parts(assignment: &ShiftAssignment, shift: &WorkShift) -> Self {
        Self {
            assignment_id: assignment.id,
            user_id: assignment.user_id,
            shift_id: shift.id,
            shift_name: shift.name.clone(),
            start_time: shift.start_time,
            end_time: shift.end_time,
            break_minutes: shift.break_minutes,
        }
    }

    pub fn crosses_midnight(&self) -> bool {
        self.end_time <= self.start_time
    }

    pub fn expected_start(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.start_time)
    }

    /// Overnight shifts end on the following calendar day
    pub fn expected_end(&self, date: NaiveDate) -> NaiveDateTime {
        let end = date.and_time(self.end_time);
        if self.crosses_midnight() {
            end + Duration::days(1)
        } else {
            end
        }
    }
}
