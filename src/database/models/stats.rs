use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    Explanation, PayrollPeriod, PayrollStatus, ViolationSeverity, ViolationStatus, ViolationType,
    ViolationView,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub key: String,
    pub error: String,
}

/// Aggregate outcome of a batch where every item is attempted independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<BatchFailure>,
}

impl<T> Default for BatchResult<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BatchResult<T> {
    pub fn record_failure(&mut self, key: impl ToString, error: impl ToString) {
        self.failed.push(BatchFailure {
            key: key.to_string(),
            error: error.to_string(),
        });
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSummary {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub late_arrivals: u32,
    pub early_departures: u32,
    pub missing_check_ins: u32,
    pub missing_check_outs: u32,
    pub absent_without_leave: u32,
    pub total_violations_detected: u32,
    pub duplicates_skipped: u32,
    pub failures: Vec<BatchFailure>,
    pub processing_time_ms: u64,
}

impl DetectionSummary {
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            start_date: Some(date),
            end_date: Some(date),
            ..Self::default()
        }
    }

    pub fn record(&mut self, violation_type: ViolationType) {
        match violation_type {
            ViolationType::LateArrival => self.late_arrivals += 1,
            ViolationType::EarlyDeparture => self.early_departures += 1,
            ViolationType::MissingCheckIn => self.missing_check_ins += 1,
            ViolationType::MissingCheckOut => self.missing_check_outs += 1,
            ViolationType::AbsentWithoutLeave => self.absent_without_leave += 1,
        }
        self.total_violations_detected += 1;
    }

    /// Fold another run's counts into this one
    pub fn absorb(&mut self, other: DetectionSummary) {
        self.late_arrivals += other.late_arrivals;
        self.early_departures += other.early_departures;
        self.missing_check_ins += other.missing_check_ins;
        self.missing_check_outs += other.missing_check_outs;
        self.absent_without_leave += other.absent_without_leave;
        self.total_violations_detected += other.total_violations_detected;
        self.duplicates_skipped += other.duplicates_skipped;
        self.failures.extend(other.failures);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationDashboard {
    pub user_id: Uuid,
    pub counts_by_status: BTreeMap<ViolationStatus, usize>,
    pub total: usize,
    pub recent: Vec<ViolationView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerDashboard {
    pub pending_explanation: Vec<ViolationView>,
    pub pending_review: Vec<ViolationView>,
    pub overdue: Vec<ViolationView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationStatistics {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total: usize,
    pub by_type: BTreeMap<ViolationType, usize>,
    pub by_severity: BTreeMap<ViolationSeverity, usize>,
    pub by_user: BTreeMap<Uuid, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationWithEvidence {
    pub explanation: Explanation,
    pub evidence: Vec<super::Evidence>,
    pub evidence_failures: Vec<BatchFailure>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollValidation {
    pub payroll_id: Option<Uuid>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl PayrollValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollStatistics {
    pub period: PayrollPeriod,
    pub total_payrolls: usize,
    pub counts_by_status: BTreeMap<String, usize>,
    pub total_gross: BigDecimal,
    pub total_deductions: BigDecimal,
    pub total_net: BigDecimal,
    pub average_net: BigDecimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentPayrollSummary {
    pub department: String,
    pub employee_count: usize,
    pub total_gross: BigDecimal,
    pub total_net: BigDecimal,
    pub average_net: BigDecimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyPayrollSummary {
    pub user_id: Uuid,
    pub year: i32,
    pub months_paid: usize,
    pub total_gross: BigDecimal,
    pub total_deductions: BigDecimal,
    pub total_net: BigDecimal,
    pub total_overtime_hours: BigDecimal,
    pub total_late_arrivals: i32,
    pub total_absent_days: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnerSummary {
    pub user_id: Uuid,
    pub payroll_id: Uuid,
    pub net_salary: BigDecimal,
    pub gross_salary: BigDecimal,
    pub status: PayrollStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodComparison {
    pub current: PayrollStatistics,
    pub previous: PayrollStatistics,
    /// Percentage change of total net, absent when the previous total is zero
    pub net_change_percent: Option<BigDecimal>,
    pub gross_change_percent: Option<BigDecimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrend {
    pub period: PayrollPeriod,
    pub payroll_count: usize,
    pub total_gross: BigDecimal,
    pub total_net: BigDecimal,
}
