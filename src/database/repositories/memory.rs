use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    AttendanceRepository, EvidenceRepository, ExplanationRepository, IdentityDirectory,
    PayrollRepository, SalaryStructureRepository, ShiftRepository, ViolationRepository,
    ViolationUpdate,
};
use crate::database::models::{
    AttendanceLog, AttendanceLogInput, Evidence, Explanation, ExplanationFilter,
    ExplanationStatus, NewEvidence, NewExplanation, NewViolation, Payroll, PayrollFilter,
    PayrollPeriod, PayrollStatus, PayrollWrite, RemovedExplanation, SalaryStructure,
    SalaryStructureInput, ScheduledShift, ShiftAssignment, ShiftAssignmentInput, UserProfile,
    Violation, ViolationFilter, ViolationStatus, ViolationType, WorkShift, WorkShiftInput,
};

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, UserProfile>,
    shifts: HashMap<Uuid, WorkShift>,
    assignments: HashMap<Uuid, ShiftAssignment>,
    attendance: HashMap<Uuid, AttendanceLog>,
    violations: HashMap<Uuid, Violation>,
    explanations: HashMap<Uuid, Explanation>,
    evidence: HashMap<Uuid, Evidence>,
    structures: HashMap<Uuid, SalaryStructure>,
    payrolls: HashMap<Uuid, Payroll>,
}

impl MemoryState {
    /// Apply a guarded violation change, reporting whether the guard held
    fn apply_violation(&mut self, update: ViolationUpdate<'_>) -> bool {
        let Some((violation, expected)) = update else {
            return true;
        };
        match self.violations.get_mut(&violation.id) {
            Some(stored) if stored.status == expected => {
                *stored = violation.clone();
                stored.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }

    fn violation_guard_holds(&self, update: ViolationUpdate<'_>) -> bool {
        match update {
            None => true,
            Some((violation, expected)) => self
                .violations
                .get(&violation.id)
                .is_some_and(|stored| stored.status == expected),
        }
    }
}

/// Process-local store implementing every repository trait behind one lock.
///
/// Each trait method holds the lock for its whole check-then-write, which gives the same
/// atomicity the Postgres implementations get from constraints and transactions.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: UserProfile) {
        self.state.lock().await.users.insert(user.id, user);
    }

    pub async fn violation_count(&self) -> usize {
        self.state.lock().await.violations.len()
    }
}

fn sorted_by<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by_key(|item| key(item));
    items
}

#[async_trait]
impl IdentityDirectory for MemoryStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<UserProfile>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserProfile>> {
        let users = self.state.lock().await.users.values().cloned().collect();
        Ok(sorted_by(users, |u: &UserProfile| u.full_name.clone()))
    }
}

#[async_trait]
impl ShiftRepository for MemoryStore {
    async fn create_shift(&self, input: WorkShiftInput) -> Result<WorkShift> {
        let now = Utc::now();
        let shift = WorkShift {
            id: Uuid::new_v4(),
            name: input.name,
            start_time: input.start_time,
            end_time: input.end_time,
            break_minutes: input.break_minutes.unwrap_or(0),
            description: input.description,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let mut state = self.state.lock().await;
        if state.shifts.values().any(|s| s.name == shift.name) {
            anyhow::bail!("duplicate key value violates unique constraint on work_shifts.name");
        }
        state.shifts.insert(shift.id, shift.clone());
        Ok(shift)
    }

    async fn find_shift(&self, id: Uuid) -> Result<Option<WorkShift>> {
        Ok(self.state.lock().await.shifts.get(&id).cloned())
    }

    async fn set_shift_active(&self, id: Uuid, is_active: bool) -> Result<Option<WorkShift>> {
        let mut state = self.state.lock().await;
        Ok(state.shifts.get_mut(&id).map(|shift| {
            shift.is_active = is_active;
            shift.updated_at = Utc::now();
            shift.clone()
        }))
    }

    async fn create_assignment_if_no_overlap(
        &self,
        input: ShiftAssignmentInput,
    ) -> Result<Option<ShiftAssignment>> {
        let mut state = self.state.lock().await;

        let overlapping = state.assignments.values().any(|a| {
            a.user_id == input.user_id
                && a.is_active
                && a.overlaps_with(input.start_date, input.end_date)
        });
        if overlapping {
            return Ok(None);
        }

        let now = Utc::now();
        let assignment = ShiftAssignment {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            shift_id: input.shift_id,
            start_date: input.start_date,
            end_date: input.end_date,
            is_active: true,
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
        };
        state.assignments.insert(assignment.id, assignment.clone());
        Ok(Some(assignment))
    }

    async fn find_assignment(&self, id: Uuid) -> Result<Option<ShiftAssignment>> {
        Ok(self.state.lock().await.assignments.get(&id).cloned())
    }

    async fn deactivate_assignment(&self, id: Uuid) -> Result<Option<ShiftAssignment>> {
        let mut state = self.state.lock().await;
        Ok(state.assignments.get_mut(&id).map(|assignment| {
            assignment.is_active = false;
            assignment.updated_at = Utc::now();
            assignment.clone()
        }))
    }

    async fn list_assignments_for_user(&self, user_id: Uuid) -> Result<Vec<ShiftAssignment>> {
        let state = self.state.lock().await;
        let mut assignments: Vec<_> = state
            .assignments
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        assignments.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(assignments)
    }

    async fn scheduled_shifts_on(&self, date: NaiveDate) -> Result<Vec<ScheduledShift>> {
        let state = self.state.lock().await;
        let scheduled = state
            .assignments
            .values()
            .filter(|a| a.covers(date))
            .filter_map(|a| {
                state
                    .shifts
                    .get(&a.shift_id)
                    .filter(|shift| shift.is_active)
                    .map(|shift| ScheduledShift::from_parts(a, shift))
            })
            .collect();
        Ok(sorted_by(scheduled, |s: &ScheduledShift| s.user_id))
    }

    async fn scheduled_shift_for_user_on(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<ScheduledShift>> {
        let state = self.state.lock().await;
        Ok(state
            .assignments
            .values()
            .filter(|a| a.user_id == user_id && a.covers(date))
            .max_by_key(|a| a.start_date)
            .and_then(|a| {
                state
                    .shifts
                    .get(&a.shift_id)
                    .filter(|shift| shift.is_active)
                    .map(|shift| ScheduledShift::from_parts(a, shift))
            }))
    }
}

#[async_trait]
impl AttendanceRepository for MemoryStore {
    async fn insert_if_absent(&self, input: AttendanceLogInput) -> Result<Option<AttendanceLog>> {
        let mut state = self.state.lock().await;
        let exists = state
            .attendance
            .values()
            .any(|log| log.user_id == input.user_id && log.log_date == input.log_date);
        if exists {
            return Ok(None);
        }

        let now = Utc::now();
        let log = AttendanceLog {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            log_date: input.log_date,
            check_in: input.check_in,
            check_out: input.check_out,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };
        state.attendance.insert(log.id, log.clone());
        Ok(Some(log))
    }

    async fn set_check_out(
        &self,
        id: Uuid,
        check_out: NaiveDateTime,
    ) -> Result<Option<AttendanceLog>> {
        let mut state = self.state.lock().await;
        Ok(state
            .attendance
            .get_mut(&id)
            .filter(|log| log.check_out.is_none())
            .map(|log| {
                log.check_out = Some(check_out);
                log.updated_at = Utc::now();
                log.clone()
            }))
    }

    async fn find(&self, id: Uuid) -> Result<Option<AttendanceLog>> {
        Ok(self.state.lock().await.attendance.get(&id).cloned())
    }

    async fn find_for_user_on(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AttendanceLog>> {
        let state = self.state.lock().await;
        Ok(state
            .attendance
            .values()
            .find(|log| log.user_id == user_id && log.log_date == date)
            .cloned())
    }

    async fn list_for_user_between(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceLog>> {
        let state = self.state.lock().await;
        let logs = state
            .attendance
            .values()
            .filter(|log| log.user_id == user_id && log.log_date >= start && log.log_date <= end)
            .cloned()
            .collect();
        Ok(sorted_by(logs, |log: &AttendanceLog| log.log_date))
    }
}

#[async_trait]
impl ViolationRepository for MemoryStore {
    async fn insert_if_absent(&self, input: NewViolation) -> Result<Option<Violation>> {
        let mut state = self.state.lock().await;
        let duplicate = state.violations.values().any(|v| {
            v.user_id == input.user_id
                && v.violation_date == input.violation_date
                && v.violation_type == input.violation_type
        });
        if duplicate {
            return Ok(None);
        }

        let now = Utc::now();
        let violation = Violation {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            shift_assignment_id: input.shift_assignment_id,
            attendance_log_id: input.attendance_log_id,
            violation_date: input.violation_date,
            violation_type: input.violation_type,
            severity: input.severity,
            expected_time: input.expected_time,
            actual_time: input.actual_time,
            deviation_minutes: input.deviation_minutes,
            status: ViolationStatus::PendingExplanation,
            auto_detected: input.auto_detected,
            description: input.description,
            resolved_by: None,
            resolved_at: None,
            resolution_notes: None,
            created_at: now,
            updated_at: now,
        };
        state.violations.insert(violation.id, violation.clone());
        Ok(Some(violation))
    }

    async fn exists(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        violation_type: ViolationType,
    ) -> Result<bool> {
        let state = self.state.lock().await;
        Ok(state.violations.values().any(|v| {
            v.user_id == user_id && v.violation_date == date && v.violation_type == violation_type
        }))
    }

    async fn find(&self, id: Uuid) -> Result<Option<Violation>> {
        Ok(self.state.lock().await.violations.get(&id).cloned())
    }

    async fn list(&self, filter: &ViolationFilter) -> Result<Vec<Violation>> {
        let state = self.state.lock().await;
        let mut violations: Vec<_> = state
            .violations
            .values()
            .filter(|v| filter.matches(v))
            .cloned()
            .collect();
        violations.sort_by(|a, b| {
            b.violation_date
                .cmp(&a.violation_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(violations)
    }

    async fn save_transition(
        &self,
        violation: &Violation,
        expected: ViolationStatus,
    ) -> Result<Option<Violation>> {
        let mut state = self.state.lock().await;
        if !state.apply_violation(Some((violation, expected))) {
            return Ok(None);
        }
        Ok(state.violations.get(&violation.id).cloned())
    }
}

#[async_trait]
impl ExplanationRepository for MemoryStore {
    async fn find(&self, id: Uuid) -> Result<Option<Explanation>> {
        Ok(self.state.lock().await.explanations.get(&id).cloned())
    }

    async fn list(&self, filter: &ExplanationFilter) -> Result<Vec<Explanation>> {
        let state = self.state.lock().await;
        let mut explanations: Vec<_> = state
            .explanations
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        explanations.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(explanations)
    }

    async fn create_with_violation(
        &self,
        input: NewExplanation,
        violation: &Violation,
        expected: ViolationStatus,
    ) -> Result<Option<Explanation>> {
        let mut state = self.state.lock().await;
        if !state.apply_violation(Some((violation, expected))) {
            return Ok(None);
        }

        let now = Utc::now();
        let explanation = Explanation {
            id: Uuid::new_v4(),
            violation_id: input.violation_id,
            submitted_by: input.submitted_by,
            explanation_text: input.explanation_text,
            status: ExplanationStatus::Submitted,
            submitted_at: now,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            is_valid: None,
            updated_at: now,
        };
        state
            .explanations
            .insert(explanation.id, explanation.clone());
        Ok(Some(explanation))
    }

    async fn save_with_violation(
        &self,
        explanation: &Explanation,
        expected: ExplanationStatus,
        violation: ViolationUpdate<'_>,
    ) -> Result<Option<Explanation>> {
        let mut state = self.state.lock().await;

        let explanation_guard = state
            .explanations
            .get(&explanation.id)
            .is_some_and(|stored| stored.status == expected);
        if !explanation_guard || !state.violation_guard_holds(violation) {
            return Ok(None);
        }

        state.apply_violation(violation);
        let mut saved = explanation.clone();
        saved.updated_at = Utc::now();
        state.explanations.insert(saved.id, saved.clone());
        Ok(Some(saved))
    }

    async fn delete_with_violation(
        &self,
        explanation: &Explanation,
        expected: ExplanationStatus,
        violation: ViolationUpdate<'_>,
    ) -> Result<Option<RemovedExplanation>> {
        let mut state = self.state.lock().await;

        let guard = state
            .explanations
            .get(&explanation.id)
            .is_some_and(|stored| stored.status == expected);
        if !guard {
            return Ok(None);
        }

        state.explanations.remove(&explanation.id);
        let evidence_ids: Vec<Uuid> = state
            .evidence
            .values()
            .filter(|e| e.explanation_id == explanation.id)
            .map(|e| e.id)
            .collect();
        let evidence = evidence_ids
            .iter()
            .filter_map(|id| state.evidence.remove(id))
            .collect();

        let remaining = state
            .explanations
            .values()
            .any(|e| e.violation_id == explanation.violation_id);
        let violation_reopened =
            !remaining && violation.is_some() && state.apply_violation(violation);
        Ok(Some(RemovedExplanation {
            evidence,
            violation_reopened,
        }))
    }
}

#[async_trait]
impl EvidenceRepository for MemoryStore {
    async fn create_within_cap(
        &self,
        input: NewEvidence,
        max_total_bytes: i64,
    ) -> Result<Option<Evidence>> {
        let mut state = self.state.lock().await;
        let current_total: i64 = state
            .evidence
            .values()
            .filter(|e| e.explanation_id == input.explanation_id)
            .map(|e| e.file_size)
            .sum();
        if current_total + input.file_size > max_total_bytes {
            return Ok(None);
        }

        let evidence = Evidence {
            id: Uuid::new_v4(),
            explanation_id: input.explanation_id,
            original_filename: input.original_filename,
            stored_filename: input.stored_filename,
            storage_path: input.storage_path,
            file_url: input.file_url,
            file_size: input.file_size,
            content_type: input.content_type,
            kind: input.kind,
            description: input.description,
            is_verified: false,
            verified_by: None,
            verified_at: None,
            uploaded_at: Utc::now(),
        };
        state.evidence.insert(evidence.id, evidence.clone());
        Ok(Some(evidence))
    }

    async fn find(&self, id: Uuid) -> Result<Option<Evidence>> {
        Ok(self.state.lock().await.evidence.get(&id).cloned())
    }

    async fn list_for_explanation(&self, explanation_id: Uuid) -> Result<Vec<Evidence>> {
        let state = self.state.lock().await;
        let evidence = state
            .evidence
            .values()
            .filter(|e| e.explanation_id == explanation_id)
            .cloned()
            .collect();
        Ok(sorted_by(evidence, |e: &Evidence| e.uploaded_at))
    }

    async fn total_size_for_explanation(&self, explanation_id: Uuid) -> Result<i64> {
        let state = self.state.lock().await;
        Ok(state
            .evidence
            .values()
            .filter(|e| e.explanation_id == explanation_id)
            .map(|e| e.file_size)
            .sum())
    }

    async fn mark_verified(
        &self,
        id: Uuid,
        verifier_id: Uuid,
        verified_at: DateTime<Utc>,
    ) -> Result<Option<Evidence>> {
        let mut state = self.state.lock().await;
        Ok(state.evidence.get_mut(&id).map(|evidence| {
            evidence.is_verified = true;
            evidence.verified_by = Some(verifier_id);
            evidence.verified_at = Some(verified_at);
            evidence.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.lock().await.evidence.remove(&id).is_some())
    }

    async fn delete_for_explanation(&self, explanation_id: Uuid) -> Result<Vec<Evidence>> {
        let mut state = self.state.lock().await;
        let ids: Vec<Uuid> = state
            .evidence
            .values()
            .filter(|e| e.explanation_id == explanation_id)
            .map(|e| e.id)
            .collect();
        Ok(ids
            .iter()
            .filter_map(|id| state.evidence.remove(id))
            .collect())
    }

    async fn list_unverified(&self) -> Result<Vec<Evidence>> {
        let state = self.state.lock().await;
        let evidence = state
            .evidence
            .values()
            .filter(|e| !e.is_verified)
            .cloned()
            .collect();
        Ok(sorted_by(evidence, |e: &Evidence| e.uploaded_at))
    }
}

#[async_trait]
impl SalaryStructureRepository for MemoryStore {
    async fn create_if_no_overlap(
        &self,
        input: SalaryStructureInput,
    ) -> Result<Option<SalaryStructure>> {
        let mut state = self.state.lock().await;
        let overlapping = state
            .structures
            .values()
            .any(|s| s.user_id == input.user_id && input.overlaps_with(s));
        if overlapping {
            return Ok(None);
        }

        let now = Utc::now();
        let structure = SalaryStructure {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            salary_type: input.salary_type,
            base_salary: input.base_salary,
            hourly_rate: input.hourly_rate,
            overtime_rate: input.overtime_rate,
            holiday_rate: input.holiday_rate,
            weekend_rate: input.weekend_rate,
            transport_allowance: input.transport_allowance,
            meal_allowance: input.meal_allowance,
            phone_allowance: input.phone_allowance,
            other_allowances: input.other_allowances,
            social_insurance_rate: input.social_insurance_rate.unwrap_or_default(),
            health_insurance_rate: input.health_insurance_rate.unwrap_or_default(),
            unemployment_insurance_rate: input.unemployment_insurance_rate.unwrap_or_default(),
            personal_income_tax: input.personal_income_tax,
            other_deductions: input.other_deductions,
            effective_date: input.effective_date,
            end_date: input.end_date,
            is_active: true,
            notes: input.notes,
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
        };
        state.structures.insert(structure.id, structure.clone());
        Ok(Some(structure))
    }

    async fn find(&self, id: Uuid) -> Result<Option<SalaryStructure>> {
        Ok(self.state.lock().await.structures.get(&id).cloned())
    }

    async fn active_for(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<SalaryStructure>> {
        let state = self.state.lock().await;
        Ok(state
            .structures
            .values()
            .filter(|s| s.user_id == user_id && s.covers(date))
            .max_by_key(|s| s.effective_date)
            .cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<SalaryStructure>> {
        let state = self.state.lock().await;
        let mut structures: Vec<_> = state
            .structures
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        structures.sort_by(|a, b| b.effective_date.cmp(&a.effective_date));
        Ok(structures)
    }

    async fn deactivate(&self, id: Uuid) -> Result<Option<SalaryStructure>> {
        let mut state = self.state.lock().await;
        Ok(state.structures.get_mut(&id).map(|structure| {
            structure.is_active = false;
            structure.updated_at = Utc::now();
            structure.clone()
        }))
    }
}

#[async_trait]
impl PayrollRepository for MemoryStore {
    async fn find(&self, id: Uuid) -> Result<Option<Payroll>> {
        Ok(self.state.lock().await.payrolls.get(&id).cloned())
    }

    async fn find_for_period(
        &self,
        user_id: Uuid,
        period: PayrollPeriod,
    ) -> Result<Option<Payroll>> {
        let state = self.state.lock().await;
        Ok(state
            .payrolls
            .values()
            .find(|p| p.user_id == user_id && p.period() == period)
            .cloned())
    }

    async fn save_calculated(&self, payroll: &Payroll) -> Result<PayrollWrite> {
        let mut state = self.state.lock().await;

        let existing = state
            .payrolls
            .values()
            .find(|p| p.user_id == payroll.user_id && p.period() == payroll.period())
            .cloned();

        match existing {
            Some(existing) if existing.status != PayrollStatus::Draft => {
                Ok(PayrollWrite::Existing(existing))
            }
            Some(draft) => {
                let mut written = payroll.clone();
                written.id = draft.id;
                written.created_at = draft.created_at;
                state.payrolls.insert(written.id, written.clone());
                Ok(PayrollWrite::Written(written))
            }
            None => {
                state.payrolls.insert(payroll.id, payroll.clone());
                Ok(PayrollWrite::Written(payroll.clone()))
            }
        }
    }

    async fn save_transition(
        &self,
        payroll: &Payroll,
        expected: PayrollStatus,
    ) -> Result<Option<Payroll>> {
        let mut state = self.state.lock().await;
        match state.payrolls.get_mut(&payroll.id) {
            Some(stored) if stored.status == expected => {
                *stored = payroll.clone();
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list(&self, filter: &PayrollFilter) -> Result<Vec<Payroll>> {
        let state = self.state.lock().await;
        let mut payrolls: Vec<_> = state
            .payrolls
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        payrolls.sort_by(|a, b| {
            b.period()
                .cmp(&a.period())
                .then(b.net_salary.cmp(&a.net_salary))
        });
        Ok(payrolls)
    }
}
