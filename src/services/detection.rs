//! Violation detection: compares each day's shift assignments against attendance logs.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::config::DetectionConfig;
use crate::database::models::{
    AttendanceLog, BatchFailure, DetectionSummary, NewViolation, ScheduledShift, Violation, ViolationSeverity,
    ViolationType,
};
use crate::database::repositories::{AttendanceRepository, ShiftRepository, ViolationRepository};
use crate::error::AppError;

/// Severity of a late arrival or early departure of `deviation_minutes`
pub fn severity_for(deviation_minutes: i64, config: &DetectionConfig) -> ViolationSeverity {
    if deviation_minutes >= config.major_threshold_minutes {
        ViolationSeverity::Major
    } else if deviation_minutes >= config.moderate_threshold_minutes {
        ViolationSeverity::Moderate
    } else {
        ViolationSeverity::Minor
    }
}

#[allow(clippy::too_many_arguments)]
fn candidate(
    shift: &ScheduledShift,
    log: Option<&AttendanceLog>,
    date: NaiveDate,
    violation_type: ViolationType,
    severity: ViolationSeverity,
    expected: NaiveDateTime,
    actual: Option<NaiveDateTime>,
    deviation_minutes: i64,
    description: String,
) -> NewViolation {
    NewViolation {
        user_id: shift.user_id,
        shift_assignment_id: shift.assignment_id,
        attendance_log_id: log.map(|l| l.id),
        violation_date: date,
        violation_type,
        severity,
        expected_time: expected.time(),
        actual_time: actual.map(|a| a.time()),
        deviation_minutes: i32::try_from(deviation_minutes).unwrap_or(i32::MAX),
        description,
        auto_detected: true,
    }
}

/// Every violation one scheduled shift produces on `date`, before deduplication.
pub fn evaluate_shift(
    shift: &ScheduledShift,
    log: Option<&AttendanceLog>,
    date: NaiveDate,
    config: &DetectionConfig,
) -> Vec<NewViolation> {
    let expected_start = shift.expected_start(date);
    let expected_end = shift.expected_end(date);

    let Some(log) = log else {
        return vec![candidate(
            shift,
            None,
            date,
            ViolationType::AbsentWithoutLeave,
            ViolationSeverity::Major,
            expected_start,
            None,
            0,
            format!(
                "No attendance recorded for {} on {}",
                shift.shift_name, date
            ),
        )];
    };

    let mut found = Vec::new();

    match log.check_in {
        None => found.push(candidate(
            shift,
            Some(log),
            date,
            ViolationType::MissingCheckIn,
            ViolationSeverity::Moderate,
            expected_start,
            None,
            0,
            format!(
                "No check-in recorded for {} (expected {})",
                shift.shift_name,
                expected_start.format("%H:%M")
            ),
        )),
        Some(check_in) if log.is_late(expected_start, config.late_tolerance_minutes) => {
            let deviation = (check_in - expected_start).num_minutes();
            found.push(candidate(
                shift,
                Some(log),
                date,
                ViolationType::LateArrival,
                severity_for(deviation, config),
                expected_start,
                Some(check_in),
                deviation,
                format!(
                    "Arrived {} minutes late for {} (expected {}, checked in {})",
                    deviation,
                    shift.shift_name,
                    expected_start.format("%H:%M"),
                    check_in.format("%H:%M")
                ),
            ));
        }
        Some(_) => {}
    }

    match log.check_out {
        None => found.push(candidate(
            shift,
            Some(log),
            date,
            ViolationType::MissingCheckOut,
            ViolationSeverity::Moderate,
            expected_end,
            None,
            0,
            format!(
                "No check-out recorded for {} (expected {})",
                shift.shift_name,
                expected_end.format("%H:%M")
            ),
        )),
        Some(check_out) if log.is_early_departure(expected_end, config.early_tolerance_minutes) => {
            let deviation = (expected_end - check_out).num_minutes();
            found.push(candidate(
                shift,
                Some(log),
                date,
                ViolationType::EarlyDeparture,
                severity_for(deviation, config),
                expected_end,
                Some(check_out),
                deviation,
                format!(
                    "Left {} minutes early from {} (expected {}, checked out {})",
                    deviation,
                    shift.shift_name,
                    expected_end.format("%H:%M"),
                    check_out.format("%H:%M")
                ),
            ));
        }
        Some(_) => {}
    }

    found
}

#[derive(Clone)]
pub struct ViolationDetectionService {
    shifts: Arc<dyn ShiftRepository>,
    attendance: Arc<dyn AttendanceRepository>,
    violations: Arc<dyn ViolationRepository>,
    config: DetectionConfig,
}

impl ViolationDetectionService {
    pub fn new(
        shifts: Arc<dyn ShiftRepository>,
        attendance: Arc<dyn AttendanceRepository>,
        violations: Arc<dyn ViolationRepository>,
        config: DetectionConfig,
    ) -> Self {
        Self {
            shifts,
            attendance,
            violations,
            config,
        }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Detect for every active assignment covering `date`, returning only new violations
    pub async fn detect_for_date(&self, date: NaiveDate) -> Result<Vec<Violation>, AppError> {
        let scheduled = self.shifts.scheduled_shifts_on(date).await?;
        let mut summary = DetectionSummary::for_date(date);
        Ok(self.detect_scheduled(&scheduled, date, &mut summary).await)
    }

    pub async fn detect_for_user(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Violation>, AppError> {
        let scheduled: Vec<_> = self
            .shifts
            .scheduled_shift_for_user_on(user_id, date)
            .await?
            .into_iter()
            .collect();
        let mut summary = DetectionSummary::for_date(date);
        Ok(self.detect_scheduled(&scheduled, date, &mut summary).await)
    }

    pub async fn run_daily_detection(&self, date: NaiveDate) -> Result<DetectionSummary, AppError> {
        let started = Instant::now();
        log::info!("Starting violation detection for {}", date);

        let scheduled = self.shifts.scheduled_shifts_on(date).await?;
        let mut summary = DetectionSummary::for_date(date);
        self.detect_scheduled(&scheduled, date, &mut summary).await;
        summary.processing_time_ms = started.elapsed().as_millis() as u64;

        log::info!(
            "Violation detection for {} finished: {} new, {} duplicates skipped, {} failures in {}ms",
            date,
            summary.total_violations_detected,
            summary.duplicates_skipped,
            summary.failures.len(),
            summary.processing_time_ms
        );

        Ok(summary)
    }

    /// Re-run detection for each day from `start` to `end` inclusive
    pub async fn reprocess(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DetectionSummary, AppError> {
        if start > end {
            return Err(AppError::BadRequest(format!(
                "Start date {} is after end date {}",
                start, end
            )));
        }

        let started = Instant::now();
        let mut summary = DetectionSummary {
            start_date: Some(start),
            end_date: Some(end),
            ..DetectionSummary::default()
        };

        let mut date = start;
        while date <= end {
            match self.run_daily_detection(date).await {
                Ok(daily) => summary.absorb(daily),
                Err(e) => {
                    log::error!("Violation detection for {} failed: {}", date, e);
                    summary.failures.push(BatchFailure {
                        key: date.to_string(),
                        error: e.to_string(),
                    });
                }
            }
            date += Duration::days(1);
        }

        summary.processing_time_ms = started.elapsed().as_millis() as u64;
        Ok(summary)
    }

    async fn detect_scheduled(
        &self,
        scheduled: &[ScheduledShift],
        date: NaiveDate,
        summary: &mut DetectionSummary,
    ) -> Vec<Violation> {
        let mut created = Vec::new();

        for shift in scheduled {
            let key = format!("{}:{}", shift.user_id, date);

            let log = match self.attendance.find_for_user_on(shift.user_id, date).await {
                Ok(log) => log,
                Err(e) => {
                    log::warn!("Skipping {}: failed to load attendance: {}", key, e);
                    summary.failures.push(BatchFailure {
                        key,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            for candidate in evaluate_shift(shift, log.as_ref(), date, &self.config) {
                let violation_type = candidate.violation_type;
                match self.violations.insert_if_absent(candidate).await {
                    Ok(Some(violation)) => {
                        summary.record(violation_type);
                        created.push(violation);
                    }
                    Ok(None) => {
                        log::debug!("{} already has a {} violation", key, violation_type);
                        summary.duplicates_skipped += 1;
                    }
                    Err(e) => {
                        log::error!("Failed to record {} violation for {}: {}", violation_type, key, e);
                        summary.failures.push(BatchFailure {
                            key: format!("{}:{}", key, violation_type),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        created
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Utc};

    fn shift(start: (u32, u32), end: (u32, u32)) -> ScheduledShift {
        ScheduledShift {
            assignment_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            shift_id: Uuid::new_v4(),
            shift_name: "Day".to_string(),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            break_minutes: 60,
        }
    }

    fn log(date: NaiveDate, check_in: Option<&str>, check_out: Option<&str>) -> AttendanceLog {
        let at = |t: &str| date.and_time(NaiveTime::parse_from_str(t, "%H:%M").unwrap());
        AttendanceLog {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            log_date: date,
            check_in: check_in.map(at),
            check_out: check_out.map(at),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    #[test]
    fn severity_steps_up_at_each_threshold() {
        let config = DetectionConfig::default();

        assert_eq!(severity_for(16, &config), ViolationSeverity::Minor);
        assert_eq!(severity_for(29, &config), ViolationSeverity::Minor);
        assert_eq!(severity_for(30, &config), ViolationSeverity::Moderate);
        assert_eq!(severity_for(59, &config), ViolationSeverity::Moderate);
        assert_eq!(severity_for(60, &config), ViolationSeverity::Major);
        assert_eq!(severity_for(240, &config), ViolationSeverity::Major);
    }

    #[test]
    fn on_time_attendance_is_clean() {
        let found = evaluate_shift(
            &shift((8, 0), (17, 0)),
            Some(&log(day(), Some("08:10"), Some("16:50"))),
            day(),
            &DetectionConfig::default(),
        );
        assert!(found.is_empty());
    }

    #[test]
    fn check_in_before_start_is_never_late() {
        let found = evaluate_shift(
            &shift((8, 0), (17, 0)),
            Some(&log(day(), Some("07:30"), Some("17:00"))),
            day(),
            &DetectionConfig::default(),
        );
        assert!(found.is_empty());
    }

    #[test]
    fn late_deviation_is_measured_from_shift_start() {
        let found = evaluate_shift(
            &shift((8, 0), (17, 0)),
            Some(&log(day(), Some("08:45"), Some("17:00"))),
            day(),
            &DetectionConfig::default(),
        );

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].violation_type, ViolationType::LateArrival);
        assert_eq!(found[0].deviation_minutes, 45);
        assert_eq!(found[0].severity, ViolationSeverity::Moderate);
        assert!(found[0].description.contains("45 minutes late"));
    }

    #[test]
    fn overnight_shift_ends_next_day() {
        let date = day();
        let mut entry = log(date, Some("22:00"), None);
        entry.check_out = Some(
            (date + Duration::days(1)).and_time(NaiveTime::from_hms_opt(5, 0, 0).unwrap()),
        );

        let found = evaluate_shift(
            &shift((22, 0), (6, 0)),
            Some(&entry),
            date,
            &DetectionConfig::default(),
        );

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].violation_type, ViolationType::EarlyDeparture);
        assert_eq!(found[0].deviation_minutes, 60);
        assert_eq!(found[0].severity, ViolationSeverity::Major);
    }

    #[test]
    fn missing_log_is_absence() {
        let found = evaluate_shift(
            &shift((8, 0), (17, 0)),
            None,
            day(),
            &DetectionConfig::default(),
        );

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].violation_type, ViolationType::AbsentWithoutLeave);
        assert_eq!(found[0].severity, ViolationSeverity::Major);
        assert_eq!(
            found[0].expected_time,
            NaiveTime::from_hms_opt(8, 0, 0).unwrap()
        );
    }

    #[test]
    fn oversized_deviation_saturates() {
        let date = day();
        let mut entry = log(date, None, Some("17:00"));
        entry.check_in = Some((date + Duration::days(1_500_000)).and_hms_opt(8, 0, 0).unwrap());

        let found = evaluate_shift(
            &shift((8, 0), (17, 0)),
            Some(&entry),
            date,
            &DetectionConfig::default(),
        );

        assert_eq!(found[0].violation_type, ViolationType::LateArrival);
        assert_eq!(found[0].deviation_minutes, i32::MAX);
    }
}
