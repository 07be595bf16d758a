//! Persistence seams for the compliance and payroll services.
//!
//! Every cross-entity read the services make goes through one of these traits. The `Pg*`
//! types back them with Postgres; [`MemoryStore`] backs all of them in process.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

use crate::database::models::{
    AttendanceLog, AttendanceLogInput, Evidence, Explanation, ExplanationFilter,
    ExplanationStatus, NewEvidence, NewExplanation, NewViolation, Payroll, PayrollFilter,
    PayrollPeriod, PayrollStatus, PayrollWrite, RemovedExplanation, SalaryStructure,
    SalaryStructureInput, ScheduledShift, ShiftAssignment, ShiftAssignmentInput, UserProfile,
    Violation, ViolationFilter, ViolationStatus, ViolationType, WorkShift, WorkShiftInput,
};

pub mod attendance;
pub mod evidence;
pub mod explanation;
pub mod memory;
pub mod payroll;
pub mod salary;
pub mod shift;
pub mod user;
pub mod violation;

pub use attendance::PgAttendanceRepository;
pub use evidence::PgEvidenceRepository;
pub use explanation::PgExplanationRepository;
pub use memory::MemoryStore;
pub use payroll::PgPayrollRepository;
pub use salary::PgSalaryStructureRepository;
pub use shift::PgShiftRepository;
pub use user::PgUserDirectory;
pub use violation::PgViolationRepository;

#[async_trait]
pub trait ShiftRepository: Send + Sync {
    async fn create_shift(&self, input: WorkShiftInput) -> Result<WorkShift>;

    async fn find_shift(&self, id: Uuid) -> Result<Option<WorkShift>>;

    async fn set_shift_active(&self, id: Uuid, is_active: bool) -> Result<Option<WorkShift>>;

    /// Insert unless the user already has an active assignment overlapping the range.
    /// Returns `None` on overlap.
    async fn create_assignment_if_no_overlap(
        &self,
        input: ShiftAssignmentInput,
    ) -> Result<Option<ShiftAssignment>>;

    async fn find_assignment(&self, id: Uuid) -> Result<Option<ShiftAssignment>>;

    async fn deactivate_assignment(&self, id: Uuid) -> Result<Option<ShiftAssignment>>;

    async fn list_assignments_for_user(&self, user_id: Uuid) -> Result<Vec<ShiftAssignment>>;

    /// Active assignments covering `date`, joined with their shift window
    async fn scheduled_shifts_on(&self, date: NaiveDate) -> Result<Vec<ScheduledShift>>;

    async fn scheduled_shift_for_user_on(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<ScheduledShift>>;
}

#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    /// Returns `None` when the user already has a log for that date
    async fn insert_if_absent(&self, input: AttendanceLogInput) -> Result<Option<AttendanceLog>>;

    /// Fill the check-out of a log that does not have one yet
    async fn set_check_out(
        &self,
        id: Uuid,
        check_out: NaiveDateTime,
    ) -> Result<Option<AttendanceLog>>;

    async fn find(&self, id: Uuid) -> Result<Option<AttendanceLog>>;

    async fn find_for_user_on(&self, user_id: Uuid, date: NaiveDate)
    -> Result<Option<AttendanceLog>>;

    async fn list_for_user_between(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceLog>>;
}

#[async_trait]
pub trait ViolationRepository: Send + Sync {
    /// Returns `None` when (user, date, type) already exists
    async fn insert_if_absent(&self, input: NewViolation) -> Result<Option<Violation>>;

    async fn exists(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        violation_type: ViolationType,
    ) -> Result<bool>;

    async fn find(&self, id: Uuid) -> Result<Option<Violation>>;

    /// Newest violation date first
    async fn list(&self, filter: &ViolationFilter) -> Result<Vec<Violation>>;

    /// Persist status and resolution fields if the stored status is still `expected`
    async fn save_transition(
        &self,
        violation: &Violation,
        expected: ViolationStatus,
    ) -> Result<Option<Violation>>;
}

/// A violation change to apply in the same unit of work as an explanation change.
pub type ViolationUpdate<'a> = Option<(&'a Violation, ViolationStatus)>;

#[async_trait]
pub trait ExplanationRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Explanation>>;

    /// Most recently submitted first
    async fn list(&self, filter: &ExplanationFilter) -> Result<Vec<Explanation>>;

    /// Create the explanation and move its violation atomically.
    /// Returns `None` if the violation's status was no longer `expected`.
    async fn create_with_violation(
        &self,
        input: NewExplanation,
        violation: &Violation,
        expected: ViolationStatus,
    ) -> Result<Option<Explanation>>;

    /// Persist an explanation change guarded on its prior status, together with an optional
    /// guarded violation change. Returns `None` and writes nothing if either guard fails.
    async fn save_with_violation(
        &self,
        explanation: &Explanation,
        expected: ExplanationStatus,
        violation: ViolationUpdate<'_>,
    ) -> Result<Option<Explanation>>;

    /// Delete an explanation still in `expected` status together with its evidence rows.
    /// The violation change is only applied when no other explanation for the violation
    /// remains.
    ///
    /// Returns `None` and removes nothing if the explanation changed underneath.
    async fn delete_with_violation(
        &self,
        explanation: &Explanation,
        expected: ExplanationStatus,
        violation: ViolationUpdate<'_>,
    ) -> Result<Option<RemovedExplanation>>;
}

#[async_trait]
pub trait EvidenceRepository: Send + Sync {
    /// Insert unless the explanation's stored total plus this file would exceed the cap
    async fn create_within_cap(
        &self,
        input: NewEvidence,
        max_total_bytes: i64,
    ) -> Result<Option<Evidence>>;

    async fn find(&self, id: Uuid) -> Result<Option<Evidence>>;

    async fn list_for_explanation(&self, explanation_id: Uuid) -> Result<Vec<Evidence>>;

    async fn total_size_for_explanation(&self, explanation_id: Uuid) -> Result<i64>;

    async fn mark_verified(
        &self,
        id: Uuid,
        verifier_id: Uuid,
        verified_at: DateTime<Utc>,
    ) -> Result<Option<Evidence>>;

    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Remove all evidence rows of an explanation, returning what was removed
    async fn delete_for_explanation(&self, explanation_id: Uuid) -> Result<Vec<Evidence>>;

    async fn list_unverified(&self) -> Result<Vec<Evidence>>;
}

#[async_trait]
pub trait SalaryStructureRepository: Send + Sync {
    /// Returns `None` when an active structure of the same user overlaps the window
    async fn create_if_no_overlap(
        &self,
        input: SalaryStructureInput,
    ) -> Result<Option<SalaryStructure>>;

    async fn find(&self, id: Uuid) -> Result<Option<SalaryStructure>>;

    async fn active_for(&self, user_id: Uuid, date: NaiveDate)
    -> Result<Option<SalaryStructure>>;

    /// Latest effective date first
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<SalaryStructure>>;

    async fn deactivate(&self, id: Uuid) -> Result<Option<SalaryStructure>>;
}

#[async_trait]
pub trait PayrollRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Payroll>>;

    async fn find_for_period(
        &self,
        user_id: Uuid,
        period: PayrollPeriod,
    ) -> Result<Option<Payroll>>;

    /// Insert the payroll for its period, or overwrite the existing one only while it is Draft
    async fn save_calculated(&self, payroll: &Payroll) -> Result<PayrollWrite>;

    /// Persist every mutable column if the stored status is still `expected`
    async fn save_transition(
        &self,
        payroll: &Payroll,
        expected: PayrollStatus,
    ) -> Result<Option<Payroll>>;

    async fn list(&self, filter: &PayrollFilter) -> Result<Vec<Payroll>>;
}

#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn get_user(&self, id: Uuid) -> Result<Option<UserProfile>>;

    async fn list_users(&self) -> Result<Vec<UserProfile>>;
}
