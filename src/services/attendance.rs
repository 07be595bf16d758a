use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use uuid::Uuid;

use super::violations::require_manager;
use crate::database::models::{AttendanceLog, AttendanceLogInput, UserProfile};
use crate::database::repositories::AttendanceRepository;
use crate::error::AppError;

#[derive(Clone)]
pub struct AttendanceService {
    attendance: Arc<dyn AttendanceRepository>,
}

impl AttendanceService {
    pub fn new(attendance: Arc<dyn AttendanceRepository>) -> Self {
        Self { attendance }
    }

    fn check_self_or_manager(user_id: Uuid, actor: &UserProfile) -> Result<(), AppError> {
        if actor.can_access_user_resource(user_id) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(
                "You can only record your own attendance".to_string(),
            ))
        }
    }

    pub async fn check_in(
        &self,
        user_id: Uuid,
        at: NaiveDateTime,
        actor: &UserProfile,
    ) -> Result<AttendanceLog, AppError> {
        Self::check_self_or_manager(user_id, actor)?;

        let log_date = at.date();
        self.attendance
            .insert_if_absent(AttendanceLogInput {
                user_id,
                log_date,
                check_in: Some(at),
                check_out: None,
                notes: None,
            })
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!(
                    "User {} already checked in on {}",
                    user_id, log_date
                ))
            })
    }

    /// Close the open log of `at`'s day, or of the previous day for overnight shifts
    pub async fn check_out(
        &self,
        user_id: Uuid,
        at: NaiveDateTime,
        actor: &UserProfile,
    ) -> Result<AttendanceLog, AppError> {
        Self::check_self_or_manager(user_id, actor)?;

        let today = self.attendance.find_for_user_on(user_id, at.date()).await?;
        let log = match today {
            Some(log) => log,
            None => self
                .attendance
                .find_for_user_on(user_id, at.date() - Duration::days(1))
                .await?
                .filter(|log| log.check_out.is_none())
                .ok_or_else(|| {
                    AppError::NotFound(format!(
                        "No check-in found for user {} on {}",
                        user_id,
                        at.date()
                    ))
                })?,
        };

        if log.check_out.is_some() {
            return Err(AppError::Conflict(format!(
                "User {} already checked out on {}",
                user_id, log.log_date
            )));
        }
        if log.check_in.is_some_and(|check_in| at < check_in) {
            return Err(AppError::BadRequest(
                "Check-out cannot be before check-in".to_string(),
            ));
        }

        self.attendance
            .set_check_out(log.id, at)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!(
                    "User {} already checked out on {}",
                    user_id, log.log_date
                ))
            })
    }

    /// Import a complete log, for example from a badge reader
    pub async fn record(
        &self,
        input: AttendanceLogInput,
        actor: &UserProfile,
    ) -> Result<AttendanceLog, AppError> {
        require_manager(actor)?;

        if let (Some(check_in), Some(check_out)) = (input.check_in, input.check_out) {
            if check_out <= check_in {
                return Err(AppError::BadRequest(
                    "Check-out must be after check-in".to_string(),
                ));
            }
        }

        let (user_id, log_date) = (input.user_id, input.log_date);
        self.attendance
            .insert_if_absent(input)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!(
                    "User {} already has an attendance log on {}",
                    user_id, log_date
                ))
            })
    }

    pub async fn get(&self, id: Uuid, actor: &UserProfile) -> Result<AttendanceLog, AppError> {
        let log = self
            .attendance
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Attendance log", id))?;
        Self::check_self_or_manager(log.user_id, actor)?;
        Ok(log)
    }

    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        actor: &UserProfile,
    ) -> Result<Vec<AttendanceLog>, AppError> {
        Self::check_self_or_manager(user_id, actor)?;
        if start > end {
            return Err(AppError::BadRequest(format!(
                "Start date {} is after end date {}",
                start, end
            )));
        }

        Ok(self
            .attendance
            .list_for_user_between(user_id, start, end)
            .await?)
    }
}
