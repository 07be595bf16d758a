use chrono::NaiveDate;

pub mod attendance;
pub mod evidence;
pub mod explanation;
pub(crate) mod macros;
pub mod payroll;
pub mod salary;
pub mod shift;
pub mod stats;
pub mod user;
pub mod violation;

// Re-export all models for easy importing
pub use attendance::*;
pub use evidence::*;
pub use explanation::*;
pub use payroll::*;
pub use salary::*;
pub use shift::*;
pub use stats::*;
pub use user::*;
pub use violation::*;

/// Inclusive date ranges where a missing end means open-ended.
pub fn date_ranges_overlap(
    a_start: NaiveDate,
    a_end: Option<NaiveDate>,
    b_start: NaiveDate,
    b_end: Option<NaiveDate>,
) -> bool {
    let a_end = a_end.unwrap_or(NaiveDate::MAX);
    let b_end = b_end.unwrap_or(NaiveDate::MAX);
    a_start <= b_end && b_start <= a_end
}
